//! Text normalization shared by indexing and querying.
//!
//! Whatever is stored as an alias's normalized/phonetic form must come out of
//! these same functions at query time, otherwise exact and phonetic layers
//! silently stop matching.

use deunicode::deunicode;
use once_cell::sync::Lazy;
use rphonetic::{DoubleMetaphone, Encoder};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static DOUBLE_METAPHONE: Lazy<DoubleMetaphone> = Lazy::new(DoubleMetaphone::default);

/// Lowercase ASCII canonical form of `text`.
///
/// Compatibility-decomposes, drops combining marks, then transliterates what
/// is left ("ß" → "ss", "Верста" → "versta", "北亰" → "bei jing") and
/// lowercases. Leading/trailing whitespace is removed; inner whitespace is
/// kept.
pub fn normalize(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let stripped: String = trimmed.nfkd().filter(|ch| !is_combining_mark(*ch)).collect();
    let mut out = deunicode(&stripped);
    out.make_ascii_lowercase();

    let end = out.trim_end().len();
    out.truncate(end);
    let start = out.len() - out.trim_start().len();
    out.drain(..start);
    out
}

/// Primary Double Metaphone code of `normalize(text)`.
///
/// Always a single string: the alternate code is discarded so the stored key
/// and the query key compare with plain equality. Returns "" for input with
/// nothing to encode.
pub fn phonetic_key(text: &str) -> String {
    let normalized = normalize(text);
    if !normalized.chars().any(|c| c.is_ascii_alphabetic()) {
        return String::new();
    }

    let upper = normalized.to_ascii_uppercase();
    match std::panic::catch_unwind(|| DOUBLE_METAPHONE.encode(&upper)) {
        Ok(code) => code,
        Err(_) => {
            tracing::warn!(input = %text, "double metaphone panicked; using empty phonetic key");
            String::new()
        }
    }
}

/// Split an authored alias list on `,`, `;` or `|`, trimming and dropping
/// empty entries.
pub fn parse_aliases(text: &str) -> Vec<String> {
    text.split([',', ';', '|'])
        .map(str::trim)
        .filter(|alias| !alias.is_empty())
        .map(str::to_string)
        .collect()
}

/// Strip anything that looks like an HTML tag and trim.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('<') {
        match rest[open..].find('>') {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + close + 1..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_strips_macrons() {
        assert_eq!(normalize("Tōlā"), "tola");
    }

    #[test]
    fn test_lowercases_and_trims() {
        assert_eq!(normalize("  Cubic Meter \t"), "cubic meter");
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_letters_without_decomposition() {
        assert_eq!(normalize("Maß"), "mass");
        assert_eq!(normalize("Øre"), "ore");
        assert_eq!(normalize("Łokieć"), "lokiec");
    }

    #[test]
    fn test_dotted_capital_i() {
        assert_eq!(normalize("İnç"), "inc");
    }

    #[test]
    fn test_cyrillic_transliterated() {
        assert_eq!(normalize("Верста"), "versta");
        assert!(normalize("Сажень").starts_with("sazhen"));
        assert_eq!(normalize("ВЕРСТА"), normalize("верста"));
    }

    #[test]
    fn test_cjk_transliterated() {
        let chi = normalize("尺");
        assert!(!chi.is_empty());
        assert!(chi.is_ascii());
        assert_eq!(normalize("北亰"), "bei jing");
    }

    #[test]
    fn test_non_latin_gets_phonetic_key() {
        assert_eq!(phonetic_key("Верста"), phonetic_key("versta"));
        assert!(!phonetic_key("Сажень").is_empty());
    }

    #[test]
    fn test_digits_and_symbols_kept() {
        assert_eq!(normalize("m²"), "m2");
        assert_eq!(normalize("#42"), "#42");
    }

    #[test]
    fn test_phonetic_key_is_single_code() {
        let key = phonetic_key("tola");
        assert!(!key.is_empty());
        assert_eq!(key, "TL");
    }

    #[test]
    fn test_phonetic_key_matches_misspelling() {
        assert_eq!(phonetic_key("toolah"), phonetic_key("Tola"));
        assert_eq!(phonetic_key("Tōlā"), phonetic_key("tola"));
    }

    #[test]
    fn test_phonetic_key_empty_inputs() {
        assert_eq!(phonetic_key(""), "");
        assert_eq!(phonetic_key("  "), "");
        assert_eq!(phonetic_key("123"), "");
    }

    #[test]
    fn test_phonetic_key_primary_for_ambiguous_input() {
        // "smith" has primary SM0 and alternate XMT; only the primary is kept.
        assert_eq!(phonetic_key("Smith"), "SM0");
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(
            parse_aliases("tolah, bhori;  | Tolā"),
            vec!["tolah", "bhori", "Tolā"]
        );
        assert!(parse_aliases("").is_empty());
        assert!(parse_aliases(" ,;| ").is_empty());
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("  <b>Tola</b> unit "), "Tola unit");
        assert_eq!(sanitize("<script>x</script>"), "x");
        assert_eq!(sanitize("a < b"), "a < b");
    }

    proptest! {
        #[test]
        fn prop_normalize_idempotent(s in "[a-zA-ZÀ-ÿĀ-ſА-я0-9 ]{0,24}") {
            let once = normalize(&s);
            prop_assert!(once.is_ascii());
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn prop_phonetic_key_stable_under_normalize(s in "[a-zA-ZÀ-ÿ ]{0,16}") {
            prop_assert_eq!(phonetic_key(&normalize(&s)), phonetic_key(&s));
        }
    }
}
