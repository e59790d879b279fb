use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use unit_decoder::config::SearchConfig;
use unit_decoder::{NewUnit, UnitDecoderApi, UnitStore, CATEGORIES};

const SYNTHETIC_UNITS: usize = 5_000;

fn synthetic_name(rng: &mut StdRng) -> String {
    const SYLLABLES: &[&str] = &["to", "la", "se", "er", "ma", "und", "ku", "bi", "gha", "ra", "ti", "sha"];
    let len = rng.gen_range(2..=4);
    let mut name: String = (0..len).map(|_| SYLLABLES[rng.gen_range(0..SYLLABLES.len())]).collect();
    if let Some(first) = name.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    name
}

/// Bundled catalog plus generated units, with caching off so every
/// iteration reaches SQLite.
fn setup_store() -> UnitStore {
    let store = UnitStore::in_memory_with_config(SearchConfig::without_cache()).expect("Failed to create store");
    let mut units: Vec<NewUnit> = seed_data::seed_units().iter().map(NewUnit::from).collect();

    let mut rng = StdRng::seed_from_u64(42);
    for i in 0..SYNTHETIC_UNITS {
        let name = format!("{} {}", synthetic_name(&mut rng), i);
        let category = CATEGORIES[rng.gen_range(0..CATEGORIES.len())];
        units.push(NewUnit {
            description: format!("Synthetic {} unit number {}", category.to_lowercase(), i),
            category: category.to_string(),
            base_unit: "unit".to_string(),
            conversion_factor: rng.gen_range(0.001..1000.0),
            region: "Synthetic".to_string(),
            era: "Modern".to_string(),
            source_url: format!("https://example.org/units/{}", i),
            aliases: vec![synthetic_name(&mut rng), synthetic_name(&mut rng)],
            name,
        });
    }

    store.seed(units).expect("Failed to seed store");
    store
}

fn bench_search(c: &mut Criterion) {
    let store = setup_store();

    let queries = vec![
        ("exact", "tola"),
        ("diacritics", "Tōlā"),
        ("phonetic_typo", "toolah"),
        ("substring", "gram"),
        ("short_2char", "se"),
        ("no_match", "zzzzqx"),
        ("multi_word", "square meter"),
    ];

    let mut group = c.benchmark_group("search");
    group.sample_size(20);

    for (name, query) in queries {
        group.bench_function(name, |b| b.iter(|| store.search(query)));
    }
    group.finish();

    c.bench_function("search_by_category", |b| b.iter(|| store.search_by_category("ma", "Mass")));
    c.bench_function("suggestions", |b| b.iter(|| store.suggestions("ki", 10)));
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    group.bench_function("normalize", |b| b.iter(|| unit_decoder::normalize::normalize("  Tōlā Bhorī  ")));
    group.bench_function("phonetic_key", |b| b.iter(|| unit_decoder::normalize::phonetic_key("Tōlā")));
    group.finish();
}

criterion_group!(benches, bench_search, bench_normalize);
criterion_main!(benches);
