//! Unit Decoder public interface
//!
//! Types handed to the HTTP layer and the trait it programs against.
//! `UnitStore` is the only implementation in this crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ENUMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Moderation state of a unit. Only `Verified` units are searchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Verified,
    Pending,
    FlaggedForReview,
    Rejected,
}

impl UnitStatus {
    pub fn to_database_str(self) -> &'static str {
        match self {
            UnitStatus::Verified => "verified",
            UnitStatus::Pending => "pending",
            UnitStatus::FlaggedForReview => "flagged_for_review",
            UnitStatus::Rejected => "rejected",
        }
    }

    /// Unknown strings map to `Pending` so they stay out of search.
    pub fn from_database_str(s: &str) -> Self {
        match s {
            "verified" => UnitStatus::Verified,
            "flagged_for_review" => UnitStatus::FlaggedForReview,
            "rejected" => UnitStatus::Rejected,
            _ => UnitStatus::Pending,
        }
    }

    pub fn is_verified(self) -> bool {
        self == UnitStatus::Verified
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS (Structs)
// ═══════════════════════════════════════════════════════════════════════════════

/// A measurement unit: `1 <name> = conversion_factor <base_unit>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub base_unit: String,
    pub conversion_factor: f64,
    pub description: String,
    pub region: String,
    pub era: String,
    pub source_url: String,
    pub status: UnitStatus,
}

/// Unit plus the raw text of every alias bound to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitDetail {
    #[serde(flatten)]
    pub unit: Unit,
    pub aliases: Vec<String>,
}

/// Optional exact-match constraints applied on top of ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SearchFilter {
    pub category: Option<String>,
    pub region: Option<String>,
    pub era: Option<String>,
}

impl SearchFilter {
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, unit: &Unit) -> bool {
        self.category.as_deref().map_or(true, |c| c == unit.category)
            && self.region.as_deref().map_or(true, |r| r == unit.region)
            && self.era.as_deref().map_or(true, |e| e == unit.era)
    }

    /// Category-only check, usable before the full unit is loaded.
    pub fn matches_category(&self, category: &str) -> bool {
        self.category.as_deref().map_or(true, |c| c == category)
    }
}

/// Autocomplete entry: the alias as authored and the unit it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub alias: String,
    pub unit_name: String,
    pub category: String,
}

/// Outcome of converting `input_value` from one unit to another.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    pub input_value: f64,
    pub result: f64,
    pub formula: String,
    pub from_unit: Unit,
    pub to_unit: Unit,
}

/// Counts reported after a bulk seed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub inserted: usize,
    pub failed: usize,
}

/// Error type for Unit Decoder operations
#[derive(Debug, Error)]
pub enum UnitDecoderError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unit not found: {0}")]
    UnitNotFound(i64),
    #[error("Cannot convert between {from} and {to} units")]
    IncompatibleCategory { from: String, to: String },
    #[error("Cannot convert between units with different base units: {from} and {to}")]
    IncompatibleBaseUnit { from: String, to: String },
    #[error("Invalid value: {0}")]
    InvalidValue(f64),
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// What the HTTP layer calls. Search methods never fail: storage problems
/// degrade to an empty list.
pub trait UnitDecoderApi: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────────
    // Read Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Ranked verified units for a free-text query. Empty query returns nothing.
    fn search(&self, query: &str) -> Vec<Unit>;

    /// `search` restricted to one category.
    fn search_by_category(&self, query: &str, category: &str) -> Vec<Unit>;

    /// `search` with category/region/era constraints.
    fn search_filtered(&self, query: &str, filter: &SearchFilter) -> Vec<Unit>;

    /// Autocomplete entries for a partial query (at least 2 characters).
    fn suggestions(&self, query: &str, limit: usize) -> Vec<Suggestion>;

    /// A verified unit with its aliases.
    fn unit(&self, id: i64) -> Result<Option<UnitDetail>, UnitDecoderError>;

    /// Every verified unit in a category, by name.
    fn units_by_category(&self, category: &str) -> Result<Vec<Unit>, UnitDecoderError>;

    /// Convert `value` between two verified, compatible units.
    fn convert(&self, from_id: i64, to_id: i64, value: f64) -> Result<Conversion, UnitDecoderError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Write Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Store a proposal as `pending`. Returns the new unit id.
    fn submit(&self, unit: crate::models::NewUnit) -> Result<i64, UnitDecoderError>;

    /// Move a unit to a new moderation state.
    fn set_status(&self, id: i64, status: UnitStatus) -> Result<(), UnitDecoderError>;

    /// Bulk insert units as `verified`. Bad rows are counted, not fatal.
    fn seed(&self, units: Vec<crate::models::NewUnit>) -> Result<SeedReport, UnitDecoderError>;
}

impl From<crate::database::DatabaseError> for UnitDecoderError {
    fn from(e: crate::database::DatabaseError) -> Self {
        UnitDecoderError::DatabaseError(e.to_string())
    }
}

impl From<crate::index::IndexError> for UnitDecoderError {
    fn from(e: crate::index::IndexError) -> Self {
        UnitDecoderError::DatabaseError(e.to_string())
    }
}

impl From<validator::ValidationErrors> for UnitDecoderError {
    fn from(e: validator::ValidationErrors) -> Self {
        UnitDecoderError::InvalidInput(e.to_string())
    }
}
