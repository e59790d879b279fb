//! Storage contract consumed by the search engine, plus an in-memory catalog.
//!
//! The engine only ever sees `AliasIndex` and `UnitSource`. `Database`
//! implements both over SQLite; `MemoryCatalog` implements both over a
//! `RwLock`ed map and is what the engine tests run against.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

use crate::interface::{Unit, UnitStatus};
use crate::models::NewUnit;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Storage error: {0}")]
    Storage(#[from] crate::database::DatabaseError),
}

pub type IndexResult<T> = Result<T, IndexError>;

/// An alias row as read back from storage.
///
/// Forms are optional because rows written by older tooling may lack them;
/// a probe that needs a missing form skips the row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAlias {
    pub alias: String,
    pub normalized: Option<String>,
    pub phonetic: Option<String>,
}

/// One alias match joined with the fields of its unit that ranking needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasHit {
    pub unit_id: i64,
    pub unit_name: String,
    pub category: String,
    pub alias: StoredAlias,
}

/// Alias lookups. Implementations only return aliases of verified units and
/// must allow concurrent readers.
pub trait AliasIndex: Send + Sync {
    fn find_by_exact_normalized(&self, normalized: &str) -> IndexResult<Vec<AliasHit>>;

    fn find_by_phonetic_key(&self, key: &str) -> IndexResult<Vec<AliasHit>>;

    /// Aliases whose normalized form contains `fragment`.
    fn find_by_normalized_substring(&self, fragment: &str) -> IndexResult<Vec<AliasHit>>;

    /// Number of aliases stored, any status. Zero selects the direct-scan path.
    fn alias_count(&self) -> IndexResult<u64>;
}

/// Unit record access for result assembly and the direct-scan path.
pub trait UnitSource: Send + Sync {
    /// Units with the given ids, any status, in no particular order.
    fn fetch_units(&self, ids: &[i64]) -> IndexResult<Vec<Unit>>;

    /// All verified units, optionally limited to one category.
    fn verified_units(&self, category: Option<&str>) -> IndexResult<Vec<Unit>>;
}

// ─────────────────────────────────────────────────────────────────────────────
// IN-MEMORY CATALOG
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct CatalogState {
    units: HashMap<i64, Unit>,
    aliases: Vec<(i64, StoredAlias)>,
    next_id: i64,
}

impl CatalogState {
    fn hits_where(&self, pred: impl Fn(&StoredAlias) -> bool) -> Vec<AliasHit> {
        self.aliases
            .iter()
            .filter(|(_, alias)| pred(alias))
            .filter_map(|(unit_id, alias)| {
                let unit = self.units.get(unit_id)?;
                if !unit.status.is_verified() {
                    return None;
                }
                Some(AliasHit {
                    unit_id: *unit_id,
                    unit_name: unit.name.clone(),
                    category: unit.category.clone(),
                    alias: alias.clone(),
                })
            })
            .collect()
    }
}

/// Thread-safe in-memory unit and alias store.
#[derive(Default)]
pub struct MemoryCatalog {
    state: RwLock<CatalogState>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a unit with its alias set. Returns the assigned id.
    pub fn insert(&self, unit: &NewUnit, status: UnitStatus) -> i64 {
        let records = unit.alias_records();
        let mut state = self.state.write();
        state.next_id += 1;
        let id = state.next_id;
        state.units.insert(
            id,
            Unit {
                id,
                name: unit.name.clone(),
                category: unit.category.clone(),
                base_unit: unit.base_unit.clone(),
                conversion_factor: unit.conversion_factor,
                description: unit.description.clone(),
                region: unit.region.clone(),
                era: unit.era.clone(),
                source_url: unit.source_url.clone(),
                status,
            },
        );
        state.aliases.extend(records.into_iter().map(|r| {
            (
                id,
                StoredAlias {
                    alias: r.alias,
                    normalized: Some(r.normalized),
                    phonetic: Some(r.phonetic),
                },
            )
        }));
        id
    }

    /// Insert a unit without any alias rows.
    pub fn insert_without_aliases(&self, unit: &NewUnit, status: UnitStatus) -> i64 {
        let id = self.insert(unit, status);
        self.state.write().aliases.retain(|(unit_id, _)| *unit_id != id);
        id
    }

    /// Append a raw alias row, bypassing normalization.
    pub fn insert_alias_row(&self, unit_id: i64, alias: StoredAlias) {
        self.state.write().aliases.push((unit_id, alias));
    }

    /// Returns false if the unit does not exist.
    pub fn set_status(&self, id: i64, status: UnitStatus) -> bool {
        match self.state.write().units.get_mut(&id) {
            Some(unit) => {
                unit.status = status;
                true
            }
            None => false,
        }
    }
}

impl AliasIndex for MemoryCatalog {
    fn find_by_exact_normalized(&self, normalized: &str) -> IndexResult<Vec<AliasHit>> {
        let state = self.state.read();
        Ok(state.hits_where(|a| a.normalized.as_deref() == Some(normalized)))
    }

    fn find_by_phonetic_key(&self, key: &str) -> IndexResult<Vec<AliasHit>> {
        let state = self.state.read();
        Ok(state.hits_where(|a| a.phonetic.as_deref() == Some(key)))
    }

    fn find_by_normalized_substring(&self, fragment: &str) -> IndexResult<Vec<AliasHit>> {
        let state = self.state.read();
        Ok(state.hits_where(|a| a.normalized.as_deref().map_or(false, |n| n.contains(fragment))))
    }

    fn alias_count(&self) -> IndexResult<u64> {
        Ok(self.state.read().aliases.len() as u64)
    }
}

impl UnitSource for MemoryCatalog {
    fn fetch_units(&self, ids: &[i64]) -> IndexResult<Vec<Unit>> {
        let state = self.state.read();
        Ok(ids.iter().filter_map(|id| state.units.get(id).cloned()).collect())
    }

    fn verified_units(&self, category: Option<&str>) -> IndexResult<Vec<Unit>> {
        let state = self.state.read();
        Ok(state
            .units
            .values()
            .filter(|u| u.status.is_verified())
            .filter(|u| category.map_or(true, |c| c == u.category))
            .cloned()
            .collect())
    }
}
