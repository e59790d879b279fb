//! Write-side data models
//!
//! `NewUnit` is what submissions and seeding hand in; `AliasRecord` is the
//! precomputed row stored per searchable string.

use std::collections::HashSet;

use seed_data::SeedUnit;
use validator::{Validate, ValidationError};

use crate::normalize::{normalize, parse_aliases, phonetic_key, sanitize};

/// Categories a unit may belong to.
pub const CATEGORIES: &[&str] = &[
    "Length",
    "Mass",
    "Volume",
    "Area",
    "Time",
    "Temperature",
    "Speed",
    "Counting",
    "Currency (Historical)",
    "Other",
];

// ─────────────────────────────────────────────────────────────────────────────
// ALIAS RECORD
// ─────────────────────────────────────────────────────────────────────────────

/// A searchable string with its normalized and phonetic forms.
///
/// Forms are computed once, here, and never recomputed from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRecord {
    pub alias: String,
    pub normalized: String,
    pub phonetic: String,
}

impl AliasRecord {
    pub fn new(alias: &str) -> Self {
        Self {
            alias: alias.to_string(),
            normalized: normalize(alias),
            phonetic: phonetic_key(alias),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// NEW UNIT
// ─────────────────────────────────────────────────────────────────────────────

/// A unit proposal or seed row, before it has an id.
#[derive(Debug, Clone, PartialEq, Validate)]
#[validate(schema(function = "validate_new_unit", skip_on_field_errors = false))]
pub struct NewUnit {
    #[validate(length(min = 1, message = "Unit name is required"))]
    pub name: String,
    pub category: String,
    #[validate(length(min = 1, message = "Base unit is required"))]
    pub base_unit: String,
    pub conversion_factor: f64,
    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: String,
    pub region: String,
    pub era: String,
    #[validate(url(message = "Valid source URL is required"))]
    pub source_url: String,
    /// Alternate names and abbreviations; the unit's own name is implied.
    pub aliases: Vec<String>,
}

fn validate_new_unit(unit: &NewUnit) -> Result<(), ValidationError> {
    if !CATEGORIES.contains(&unit.category.as_str()) {
        let mut err = ValidationError::new("category");
        err.message = Some("Valid category is required".into());
        return Err(err);
    }
    if !unit.conversion_factor.is_finite() || unit.conversion_factor <= 0.0 {
        let mut err = ValidationError::new("conversion_factor");
        err.message = Some("Valid conversion factor is required".into());
        return Err(err);
    }
    Ok(())
}

impl NewUnit {
    /// Strip markup and surrounding whitespace from every text field.
    pub fn sanitized(self) -> Self {
        Self {
            name: sanitize(&self.name),
            category: self.category.trim().to_string(),
            base_unit: sanitize(&self.base_unit),
            conversion_factor: self.conversion_factor,
            description: sanitize(&self.description),
            region: sanitize(&self.region),
            era: sanitize(&self.era),
            source_url: self.source_url.trim().to_string(),
            aliases: self
                .aliases
                .iter()
                .map(|a| sanitize(a))
                .filter(|a| !a.is_empty())
                .collect(),
        }
    }

    /// The self-alias followed by declared aliases, one per normalized form.
    /// Strings that normalize to nothing are dropped.
    pub fn alias_records(&self) -> Vec<AliasRecord> {
        let mut seen = HashSet::new();
        std::iter::once(&self.name)
            .chain(self.aliases.iter())
            .map(|alias| AliasRecord::new(alias))
            .filter(|record| !record.normalized.is_empty())
            .filter(|record| seen.insert(record.normalized.clone()))
            .collect()
    }
}

impl From<&SeedUnit> for NewUnit {
    fn from(seed: &SeedUnit) -> Self {
        Self {
            name: seed.name.clone(),
            category: seed.category.clone(),
            base_unit: seed.base_unit.clone(),
            conversion_factor: seed.conversion_factor,
            description: seed.description.clone(),
            region: seed.region.clone(),
            era: seed.era.clone(),
            source_url: seed.source_url.clone(),
            aliases: parse_aliases(&seed.aliases),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_unit(name: &str, category: &str, base_unit: &str, factor: f64) -> NewUnit {
    NewUnit {
        name: name.to_string(),
        category: category.to_string(),
        base_unit: base_unit.to_string(),
        conversion_factor: factor,
        description: format!("{} is a unit of {}", name, category.to_lowercase()),
        region: "International".to_string(),
        era: "Modern".to_string(),
        source_url: format!("https://en.wikipedia.org/wiki/{}", name),
        aliases: Vec::new(),
    }
}
