//! Unit Decoder Core - search and conversion for historical and regional units
//!
//! Finds measurement units by free-text query, tolerating diacritics and
//! misspellings, over a SQLite catalog of units and their aliases.
//!
//! Ranking is layered: exact alias matches, then phonetic matches, then
//! substring matches, shorter unit names first within each layer.

pub mod cache;
pub mod config;
pub mod convert;
pub mod database;
pub mod index;
pub mod interface;
pub mod models;
pub mod normalize;
pub mod ranking;
pub mod search;
mod store;

pub use interface::*;
pub use models::{NewUnit, CATEGORIES};
pub use store::UnitStore;
