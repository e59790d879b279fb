//! Bundled unit catalog used to seed a fresh database.
//!
//! The CSV ships inside the crate so tests, benches and the CLI `seed`
//! command all see the same data.

use once_cell::sync::Lazy;
use serde::Deserialize;

const UNITS_CSV: &str = include_str!("../data/units.csv");

/// One row of the bundled catalog. `aliases` is kept as the raw
/// separator-delimited string; callers split it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeedUnit {
    pub name: String,
    pub category: String,
    pub base_unit: String,
    pub conversion_factor: f64,
    pub description: String,
    pub region: String,
    pub era: String,
    pub source_url: String,
    #[serde(default)]
    pub aliases: String,
}

pub static SEED_UNITS: Lazy<Vec<SeedUnit>> =
    Lazy::new(|| parse_units(UNITS_CSV.as_bytes()).expect("bundled units.csv must parse"));

/// Parse a catalog CSV with the same header as the bundled file.
pub fn parse_units<R: std::io::Read>(reader: R) -> Result<Vec<SeedUnit>, csv::Error> {
    csv::Reader::from_reader(reader)
        .deserialize()
        .collect()
}

/// All bundled units, in file order.
pub fn seed_units() -> &'static [SeedUnit] {
    &SEED_UNITS
}
