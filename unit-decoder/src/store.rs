//! UnitStore - Main API consumed by the HTTP layer
//!
//! Owns the SQLite database, the query cache and the search configuration.
//! Search paths never fail: a storage error is logged and yields no results.
//! Every write clears the cache.

use crate::cache::{CacheKey, QueryCache};
use crate::config::SearchConfig;
use crate::convert;
use crate::database::Database;
use crate::interface::{
    Conversion, SearchFilter, SeedReport, Suggestion, Unit, UnitDecoderApi, UnitDecoderError, UnitDetail,
    UnitStatus,
};
use crate::models::{AliasRecord, NewUnit};
use crate::normalize::normalize;
use crate::search::SearchEngine;
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;
use validator::Validate;

/// Thread-safe unit store over SQLite
///
/// Concurrency Model:
/// - Database uses r2d2 connection pool (concurrent reads, no mutex blocking)
/// - Searches borrow the database through a short-lived `SearchEngine`
/// - Cache is behind its own mutex and never held across a query
pub struct UnitStore {
    db: Arc<Database>,
    cache: QueryCache,
    config: SearchConfig,
}

impl UnitStore {
    /// Open or create a store with a database at the given path
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, UnitDecoderError> {
        Self::open_with_config(db_path, SearchConfig::default())
    }

    pub fn open_with_config<P: AsRef<Path>>(db_path: P, config: SearchConfig) -> Result<Self, UnitDecoderError> {
        let db = Database::open(db_path, config.pool_size)?;
        Ok(Self::from_database(db, config))
    }

    /// Create a store with an in-memory database
    pub fn new_in_memory() -> Result<Self, UnitDecoderError> {
        Self::in_memory_with_config(SearchConfig::default())
    }

    pub fn in_memory_with_config(config: SearchConfig) -> Result<Self, UnitDecoderError> {
        let db = Database::open_in_memory()?;
        Ok(Self::from_database(db, config))
    }

    fn from_database(db: Database, config: SearchConfig) -> Self {
        Self {
            db: Arc::new(db),
            cache: QueryCache::new(config.cache_ttl, config.cache_capacity),
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Number of stored units, any status
    pub fn unit_count(&self) -> Result<u64, UnitDecoderError> {
        Ok(self.db.count_units()?)
    }

    fn engine(&self) -> SearchEngine<'_, Database> {
        SearchEngine::with_max_results(self.db.as_ref(), self.config.effective_max_results())
    }

    /// Fetch a unit that conversion and detail views may expose.
    fn verified_unit(&self, id: i64) -> Result<Unit, UnitDecoderError> {
        match self.db.fetch_unit(id)? {
            Some(unit) if unit.status.is_verified() => Ok(unit),
            _ => Err(UnitDecoderError::UnitNotFound(id)),
        }
    }

    fn invalidate(&self) {
        self.cache.clear();
    }
}

impl UnitDecoderApi for UnitStore {
    fn search(&self, query: &str) -> Vec<Unit> {
        self.search_filtered(query, &SearchFilter::default())
    }

    fn search_by_category(&self, query: &str, category: &str) -> Vec<Unit> {
        self.search_filtered(query, &SearchFilter::category(category))
    }

    fn search_filtered(&self, query: &str, filter: &SearchFilter) -> Vec<Unit> {
        let normalized = normalize(query);
        if normalized.is_empty() {
            return Vec::new();
        }

        let key = CacheKey {
            normalized_query: normalized,
            filter: filter.clone(),
        };
        if let Some(units) = self.cache.get(&key) {
            tracing::debug!(query = %key.normalized_query, "search cache hit");
            return units;
        }

        // Read before searching so a write that lands mid-search keeps this
        // result out of the cache.
        let generation = self.cache.generation();
        match self.engine().search_filtered(query, filter) {
            Ok(units) => {
                self.cache.insert(key, units.clone(), generation);
                units
            }
            Err(e) => {
                tracing::warn!(query = %key.normalized_query, error = %e, "search failed, returning no results");
                Vec::new()
            }
        }
    }

    fn suggestions(&self, query: &str, limit: usize) -> Vec<Suggestion> {
        self.engine().suggestions(query, limit).unwrap_or_else(|e| {
            tracing::warn!(query, error = %e, "suggestions failed, returning none");
            Vec::new()
        })
    }

    fn unit(&self, id: i64) -> Result<Option<UnitDetail>, UnitDecoderError> {
        let unit = match self.db.fetch_unit(id)? {
            Some(unit) if unit.status.is_verified() => unit,
            _ => return Ok(None),
        };
        let aliases = self.db.aliases_for_unit(id)?;
        Ok(Some(UnitDetail { unit, aliases }))
    }

    fn units_by_category(&self, category: &str) -> Result<Vec<Unit>, UnitDecoderError> {
        Ok(self.db.fetch_verified_units(Some(category))?)
    }

    fn convert(&self, from_id: i64, to_id: i64, value: f64) -> Result<Conversion, UnitDecoderError> {
        let from = self.verified_unit(from_id)?;
        let to = self.verified_unit(to_id)?;
        convert::convert(&from, &to, value)
    }

    fn submit(&self, unit: NewUnit) -> Result<i64, UnitDecoderError> {
        let unit = unit.sanitized();
        unit.validate()?;
        let id = self.db.insert_unit(&unit, UnitStatus::Pending)?;
        self.invalidate();
        tracing::info!(id, name = %unit.name, "unit submitted for review");
        Ok(id)
    }

    fn set_status(&self, id: i64, status: UnitStatus) -> Result<(), UnitDecoderError> {
        if !self.db.set_status(id, status)? {
            return Err(UnitDecoderError::UnitNotFound(id));
        }
        self.invalidate();
        tracing::info!(id, status = status.to_database_str(), "unit status changed");
        Ok(())
    }

    fn seed(&self, units: Vec<NewUnit>) -> Result<SeedReport, UnitDecoderError> {
        let total = units.len();

        // Sanitize, validate and compute alias forms off the write path
        let prepared: Vec<(NewUnit, Vec<AliasRecord>)> = units
            .into_par_iter()
            .filter_map(|unit| {
                let unit = unit.sanitized();
                match unit.validate() {
                    Ok(()) => {
                        let aliases = unit.alias_records();
                        Some((unit, aliases))
                    }
                    Err(e) => {
                        tracing::warn!(name = %unit.name, error = %e, "skipping invalid seed unit");
                        None
                    }
                }
            })
            .collect();
        let invalid = total - prepared.len();

        let mut report = self.db.insert_units_batch(&prepared, UnitStatus::Verified)?;
        report.failed += invalid;
        self.invalidate();

        tracing::info!(inserted = report.inserted, failed = report.failed, "seed complete");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_unit;
    use std::time::Duration;

    fn seeded_store() -> UnitStore {
        let store = UnitStore::new_in_memory().unwrap();
        let mut tola = sample_unit("Tola", "Mass", "gram", 11.6638038);
        tola.aliases = vec!["tolah".to_string(), "bhori".to_string()];
        let report = store
            .seed(vec![
                tola,
                sample_unit("Gram", "Mass", "gram", 1.0),
                sample_unit("Meter", "Length", "meter", 1.0),
                sample_unit("Foot", "Length", "meter", 0.3048),
                sample_unit("Pound", "Mass", "kilogram", 0.45359237),
            ])
            .unwrap();
        assert_eq!(report, SeedReport { inserted: 5, failed: 0 });
        store
    }

    fn id_of(store: &UnitStore, name: &str) -> i64 {
        store.search(name)[0].id
    }

    #[test]
    fn test_store_creation() {
        let store = UnitStore::new_in_memory().unwrap();
        assert_eq!(store.unit_count().unwrap(), 0);
        assert!(store.search("tola").is_empty());
    }

    #[test]
    fn test_search_through_store() {
        let store = seeded_store();
        assert_eq!(store.search("Tōlā")[0].name, "Tola");
        assert_eq!(store.search("toolah")[0].name, "Tola");
        assert!(store.search("   ").is_empty());
    }

    #[test]
    fn test_search_by_category() {
        let store = seeded_store();
        assert!(store.search_by_category("foot", "Mass").is_empty());
        assert_eq!(store.search_by_category("foot", "Length")[0].name, "Foot");
        assert!(store.search_by_category("", "Length").is_empty());
    }

    #[test]
    fn test_seed_counts_invalid_units() {
        let store = UnitStore::new_in_memory().unwrap();
        let mut bad = sample_unit("Bad", "Weight", "gram", 1.0);
        bad.description = "short".to_string();
        let report = store
            .seed(vec![sample_unit("Tola", "Mass", "gram", 11.66), bad])
            .unwrap();
        assert_eq!(report, SeedReport { inserted: 1, failed: 1 });
        assert_eq!(store.unit_count().unwrap(), 1);
    }

    #[test]
    fn test_submission_pending_until_verified() {
        let store = seeded_store();
        let id = store.submit(sample_unit("Ratti", "Mass", "gram", 0.1215)).unwrap();
        assert!(store.search("ratti").is_empty());
        assert!(store.unit(id).unwrap().is_none());

        store.set_status(id, UnitStatus::Verified).unwrap();
        assert_eq!(store.search("ratti")[0].id, id);

        store.set_status(id, UnitStatus::FlaggedForReview).unwrap();
        assert!(store.search("ratti").is_empty());
    }

    #[test]
    fn test_submit_rejects_invalid() {
        let store = UnitStore::new_in_memory().unwrap();
        let mut unit = sample_unit("Ratti", "Mass", "gram", 0.1215);
        unit.source_url = "nowhere".to_string();
        assert!(matches!(store.submit(unit), Err(UnitDecoderError::InvalidInput(_))));
        assert_eq!(store.unit_count().unwrap(), 0);
    }

    #[test]
    fn test_set_status_unknown_unit() {
        let store = UnitStore::new_in_memory().unwrap();
        assert!(matches!(
            store.set_status(7, UnitStatus::Verified),
            Err(UnitDecoderError::UnitNotFound(7))
        ));
    }

    #[test]
    fn test_unit_detail_includes_aliases() {
        let store = seeded_store();
        let id = id_of(&store, "tola");
        let detail = store.unit(id).unwrap().unwrap();
        assert_eq!(detail.unit.name, "Tola");
        assert_eq!(detail.aliases, vec!["Tola", "tolah", "bhori"]);
        assert!(store.unit(id + 1000).unwrap().is_none());
    }

    #[test]
    fn test_units_by_category() {
        let store = seeded_store();
        let names: Vec<_> = store
            .units_by_category("Mass")
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["Gram", "Pound", "Tola"]);
        assert!(store.units_by_category("Time").unwrap().is_empty());
    }

    #[test]
    fn test_convert() {
        let store = seeded_store();
        let tola = id_of(&store, "tola");
        let gram = id_of(&store, "gram");
        let conversion = store.convert(tola, gram, 1.0).unwrap();
        assert!((conversion.result - 11.663804).abs() < 1e-9);

        let meter = id_of(&store, "meter");
        assert!(matches!(
            store.convert(tola, meter, 1.0),
            Err(UnitDecoderError::IncompatibleCategory { .. })
        ));
        let pound = id_of(&store, "pound");
        assert!(matches!(
            store.convert(tola, pound, 1.0),
            Err(UnitDecoderError::IncompatibleBaseUnit { .. })
        ));
    }

    #[test]
    fn test_convert_rejects_unverified() {
        let store = seeded_store();
        let gram = id_of(&store, "gram");
        let ratti = store.submit(sample_unit("Ratti", "Mass", "gram", 0.1215)).unwrap();
        assert!(matches!(
            store.convert(ratti, gram, 1.0),
            Err(UnitDecoderError::UnitNotFound(id)) if id == ratti
        ));
    }

    #[test]
    fn test_suggestions() {
        let store = seeded_store();
        let suggestions = store.suggestions("tol", 5);
        assert_eq!(suggestions[0].alias, "Tola");
        assert_eq!(suggestions[0].category, "Mass");
        assert!(store.suggestions("t", 5).is_empty());
    }

    #[test]
    fn test_cache_populated_and_cleared_on_write() {
        let store = seeded_store();
        assert!(store.cache.is_empty());
        store.search("tola");
        store.search(" TOLA ");
        assert_eq!(store.cache.len(), 1);

        store.submit(sample_unit("Ratti", "Mass", "gram", 0.1215)).unwrap();
        assert!(store.cache.is_empty());
    }

    #[test]
    fn test_status_change_not_hidden_by_cache() {
        let store = seeded_store();
        let tola = id_of(&store, "tola");
        assert_eq!(store.search("tola").len(), 1);
        store.set_status(tola, UnitStatus::Rejected).unwrap();
        assert!(store.search("tola").is_empty());
    }

    #[test]
    fn test_write_during_search_keeps_result_out_of_cache() {
        let store = seeded_store();
        let tola = id_of(&store, "tola");
        store.invalidate();

        // Interleave a search with a status change the way two threads could.
        let generation = store.cache.generation();
        let stale = store.engine().search("tola").unwrap();
        assert_eq!(stale[0].id, tola);
        store.set_status(tola, UnitStatus::Rejected).unwrap();
        let key = CacheKey {
            normalized_query: "tola".to_string(),
            filter: SearchFilter::default(),
        };
        store.cache.insert(key.clone(), stale, generation);

        assert!(store.cache.get(&key).is_none());
        assert!(store.search("tola").is_empty());
    }

    #[test]
    fn test_cache_expiry() {
        let config = SearchConfig {
            cache_ttl: Duration::from_millis(20),
            ..SearchConfig::default()
        };
        let store = UnitStore::in_memory_with_config(config).unwrap();
        store.seed(vec![sample_unit("Tola", "Mass", "gram", 11.66)]).unwrap();
        assert_eq!(store.search("tola").len(), 1);
        std::thread::sleep(Duration::from_millis(40));
        assert!(store.cache.get(&CacheKey {
            normalized_query: "tola".to_string(),
            filter: SearchFilter::default(),
        }).is_none());
        assert_eq!(store.search("tola").len(), 1);
    }

    #[test]
    fn test_disabled_cache_same_results() {
        let cached = seeded_store();
        let uncached = UnitStore::in_memory_with_config(SearchConfig::without_cache()).unwrap();
        let mut tola = sample_unit("Tola", "Mass", "gram", 11.6638038);
        tola.aliases = vec!["tolah".to_string(), "bhori".to_string()];
        uncached.seed(vec![tola]).unwrap();

        for _ in 0..2 {
            assert_eq!(cached.search("tola")[0].name, uncached.search("tola")[0].name);
        }
        assert!(uncached.cache.is_empty());
    }

    #[test]
    fn test_concurrent_searches() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(UnitStore::open(dir.path().join("units.sqlite")).unwrap());
        store
            .seed(vec![
                sample_unit("Tola", "Mass", "gram", 11.66),
                sample_unit("Seer", "Mass", "gram", 933.1),
            ])
            .unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let q = if i % 2 == 0 { "tola" } else { "seer" };
                    store.search(q).len()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }
    }
}
