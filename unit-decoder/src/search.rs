//! Search Engine (three-layer alias lookup + direct-scan fallback)
//!
//! The query is reduced to its normalized and phonetic forms once, then the
//! alias index is probed in priority order: exact, phonetic, substring.
//! `ranking::rank_hits` merges the layers; assembly loads full units in rank
//! order and re-checks that each one is still verified.
//! An index with no aliases at all is never probed: units are scanned directly
//! on name and description instead.

use std::collections::HashSet;

use crate::config::{MAX_RESULTS, MIN_SUGGESTION_QUERY_LEN};
use crate::index::{AliasIndex, IndexResult, UnitSource};
use crate::interface::{SearchFilter, Suggestion, Unit};
use crate::normalize::normalize;
use crate::ranking::{rank_hits, MatchLayer, QueryForms, RankedUnit};

/// Ranked ids are resolved to units this many at a time.
const ASSEMBLY_CHUNK: usize = 64;

/// Read-only search over anything that exposes both storage contracts.
pub struct SearchEngine<'a, S: AliasIndex + UnitSource + ?Sized> {
    catalog: &'a S,
    max_results: usize,
}

impl<'a, S: AliasIndex + UnitSource + ?Sized> SearchEngine<'a, S> {
    pub fn new(catalog: &'a S) -> Self {
        Self::with_max_results(catalog, MAX_RESULTS)
    }

    /// `max_results` is clamped to `1..=MAX_RESULTS`.
    pub fn with_max_results(catalog: &'a S, max_results: usize) -> Self {
        Self {
            catalog,
            max_results: max_results.clamp(1, MAX_RESULTS),
        }
    }

    pub fn search(&self, query: &str) -> IndexResult<Vec<Unit>> {
        self.search_filtered(query, &SearchFilter::default())
    }

    pub fn search_filtered(&self, query: &str, filter: &SearchFilter) -> IndexResult<Vec<Unit>> {
        let forms = match QueryForms::new(query) {
            Some(forms) => forms,
            None => return Ok(Vec::new()),
        };

        if self.catalog.alias_count()? == 0 {
            tracing::debug!(query = %forms.normalized, "alias index empty, scanning units");
            return self.direct_scan(&forms, filter);
        }

        let ranked = self.rank(&forms, filter)?;
        self.assemble(&ranked, filter)
    }

    /// Probe all layers and return every matching unit in rank order.
    pub fn rank(&self, forms: &QueryForms, filter: &SearchFilter) -> IndexResult<Vec<RankedUnit>> {
        let mut layers = Vec::with_capacity(3);
        layers.push((MatchLayer::Exact, self.catalog.find_by_exact_normalized(&forms.normalized)?));
        // An empty key would match every alias with an empty key
        if !forms.phonetic.is_empty() {
            layers.push((MatchLayer::Phonetic, self.catalog.find_by_phonetic_key(&forms.phonetic)?));
        }
        layers.push((MatchLayer::Fuzzy, self.catalog.find_by_normalized_substring(&forms.normalized)?));

        Ok(rank_hits(layers, forms, filter))
    }

    /// Resolve ranked ids in order, keeping verified units that pass the
    /// filter, until `max_results` are collected.
    fn assemble(&self, ranked: &[RankedUnit], filter: &SearchFilter) -> IndexResult<Vec<Unit>> {
        let mut results = Vec::with_capacity(self.max_results.min(ranked.len()));

        for chunk in ranked.chunks(ASSEMBLY_CHUNK) {
            let ids: Vec<i64> = chunk.iter().map(|r| r.unit_id).collect();
            let mut fetched = self.catalog.fetch_units(&ids)?;

            for rank in chunk {
                let Some(pos) = fetched.iter().position(|u| u.id == rank.unit_id) else {
                    continue;
                };
                let unit = fetched.swap_remove(pos);
                if !unit.status.is_verified() || !filter.matches(&unit) {
                    continue;
                }
                results.push(unit);
                if results.len() == self.max_results {
                    return Ok(results);
                }
            }
        }

        Ok(results)
    }

    fn direct_scan(&self, forms: &QueryForms, filter: &SearchFilter) -> IndexResult<Vec<Unit>> {
        let needle = forms.normalized.as_str();
        let mut units: Vec<Unit> = self
            .catalog
            .verified_units(filter.category.as_deref())?
            .into_iter()
            .filter(|u| filter.matches(u))
            .filter(|u| normalize(&u.name).contains(needle) || normalize(&u.description).contains(needle))
            .collect();

        units.sort_by(|a, b| {
            a.name
                .chars()
                .count()
                .cmp(&b.name.chars().count())
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        units.truncate(self.max_results);
        Ok(units)
    }

    /// Autocomplete over alias text.
    ///
    /// Exact normalized matches first, then shorter aliases. One entry per
    /// (alias, unit) pair.
    pub fn suggestions(&self, query: &str, limit: usize) -> IndexResult<Vec<Suggestion>> {
        let normalized = normalize(query);
        if normalized.chars().count() < MIN_SUGGESTION_QUERY_LEN || limit == 0 {
            return Ok(Vec::new());
        }

        let mut hits = self.catalog.find_by_normalized_substring(&normalized)?;
        hits.retain(|hit| {
            hit.alias
                .normalized
                .as_deref()
                .map_or(false, |n| n.contains(normalized.as_str()))
        });
        hits.sort_by_cached_key(|hit| {
            (
                hit.alias.normalized.as_deref() != Some(normalized.as_str()),
                hit.alias.alias.chars().count(),
                hit.alias.alias.clone(),
                hit.unit_id,
            )
        });

        let mut seen = HashSet::new();
        Ok(hits
            .into_iter()
            .filter(|hit| seen.insert((hit.alias.alias.clone(), hit.unit_id)))
            .take(limit)
            .map(|hit| Suggestion {
                alias: hit.alias.alias,
                unit_name: hit.unit_name,
                category: hit.category,
            })
            .collect())
    }
}
