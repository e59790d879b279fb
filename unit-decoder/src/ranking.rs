//! Layered match ranking.
//!
//! Every candidate alias is tagged with the layer that found it. Candidates
//! collapse per unit to the best layer, then sort on a lexicographic key:
//! layer priority, unit name length, unit name, unit id. Exact ALWAYS beats
//! phonetic, phonetic ALWAYS beats fuzzy; name length only orders within a
//! layer.

use std::collections::HashMap;

use serde::Serialize;

use crate::index::AliasHit;
use crate::interface::SearchFilter;
use crate::normalize::{normalize, phonetic_key};

/// Which probe produced a match. Lower priority value = better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchLayer {
    Exact,
    Phonetic,
    Fuzzy,
}

impl MatchLayer {
    pub fn priority(self) -> u8 {
        match self {
            MatchLayer::Exact => 1,
            MatchLayer::Phonetic => 2,
            MatchLayer::Fuzzy => 3,
        }
    }
}

/// A query reduced to the two forms the index is keyed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryForms {
    pub normalized: String,
    pub phonetic: String,
}

impl QueryForms {
    /// `None` for empty or whitespace-only input.
    pub fn new(query: &str) -> Option<Self> {
        let normalized = normalize(query);
        if normalized.is_empty() {
            return None;
        }
        Some(Self {
            phonetic: phonetic_key(query),
            normalized,
        })
    }
}

/// A unit that matched, with the best layer across all of its aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedUnit {
    pub unit_id: i64,
    pub unit_name: String,
    pub layer: MatchLayer,
}

impl RankedUnit {
    pub fn priority(&self) -> u8 {
        self.layer.priority()
    }

    fn sort_key(&self) -> (u8, usize, &str, i64) {
        (
            self.priority(),
            self.unit_name.chars().count(),
            self.unit_name.as_str(),
            self.unit_id,
        )
    }
}

/// Whether `hit` really satisfies `layer` for `forms`.
///
/// Storage already filtered on the key, but rows with a missing or empty form
/// are rejected here so a malformed alias can never match everything.
fn hit_satisfies(layer: MatchLayer, hit: &AliasHit, forms: &QueryForms) -> bool {
    match layer {
        MatchLayer::Exact => hit.alias.normalized.as_deref() == Some(forms.normalized.as_str()),
        MatchLayer::Phonetic => match hit.alias.phonetic.as_deref() {
            Some(key) => !key.is_empty() && key == forms.phonetic,
            None => false,
        },
        MatchLayer::Fuzzy => match hit.alias.normalized.as_deref() {
            Some(n) => !n.is_empty() && n.contains(forms.normalized.as_str()),
            None => false,
        },
    }
}

/// Merge per-layer candidates into a deduplicated, fully ordered list.
///
/// Only the category part of `filter` is applied here; region and era need
/// the full unit and are checked during assembly.
pub fn rank_hits<I>(layers: I, forms: &QueryForms, filter: &SearchFilter) -> Vec<RankedUnit>
where
    I: IntoIterator<Item = (MatchLayer, Vec<AliasHit>)>,
{
    let mut best: HashMap<i64, RankedUnit> = HashMap::new();

    for (layer, hits) in layers {
        for hit in hits {
            if !hit_satisfies(layer, &hit, forms) || !filter.matches_category(&hit.category) {
                continue;
            }
            best.entry(hit.unit_id)
                .and_modify(|ranked| {
                    if layer < ranked.layer {
                        ranked.layer = layer;
                    }
                })
                .or_insert(RankedUnit {
                    unit_id: hit.unit_id,
                    unit_name: hit.unit_name,
                    layer,
                });
        }
    }

    let mut ranked: Vec<RankedUnit> = best.into_values().collect();
    ranked.sort_unstable_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    ranked
}
