//! SQLite database layer for units and aliases
//!
//! Two tables: `units` and `aliases` (FK to units, cascade delete), with the
//! alias table indexed on its normalized and phonetic columns.
//! Uses r2d2 connection pooling to allow concurrent reads without mutex blocking.

use crate::index::{AliasHit, AliasIndex, IndexResult, StoredAlias, UnitSource};
use crate::interface::{SeedReport, Unit, UnitStatus};
use crate::models::{AliasRecord, NewUnit};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

const UNIT_COLUMNS: &str =
    "u.id, u.name, u.category, u.base_unit, u.conversion_factor, u.description, u.region, u.era, u.source_url, u.status";

const HIT_COLUMNS: &str =
    "u.id, u.name, u.category, a.alias, a.normalized_alias, a.phonetic_key";

/// Thread-safe database wrapper using connection pooling
///
/// Uses r2d2 connection pool for concurrent read access.
/// WAL mode enables readers to proceed without blocking each other.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open or create a database at the given path with connection pooling
    pub fn open<P: AsRef<Path>>(path: P, pool_size: u32) -> DatabaseResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| {
                conn.execute_batch("
                    PRAGMA journal_mode=WAL;
                    PRAGMA synchronous=NORMAL;
                    PRAGMA foreign_keys=ON;
                    PRAGMA temp_store=MEMORY;
                    PRAGMA mmap_size=134217728;
                    PRAGMA cache_size=-32000;
                ")?;
                Ok(())
            });

        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (tests, benches, throwaway catalogs)
    pub fn open_in_memory() -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::memory()
            .with_init(|conn| {
                conn.execute_batch("
                    PRAGMA foreign_keys=ON;
                ")?;
                Ok(())
            });

        // In-memory needs single connection to maintain state, never recycled
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Get a connection from the pool
    fn get_conn(&self) -> DatabaseResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    fn setup_schema(&self) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS units (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                base_unit TEXT NOT NULL,
                conversion_factor REAL NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                region TEXT NOT NULL DEFAULT '',
                era TEXT NOT NULL DEFAULT '',
                source_url TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'pending'
            );

            CREATE TABLE IF NOT EXISTS aliases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                unit_id INTEGER NOT NULL REFERENCES units(id) ON DELETE CASCADE,
                alias TEXT NOT NULL,
                normalized_alias TEXT,
                phonetic_key TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_units_category_status ON units(category, status);
            CREATE INDEX IF NOT EXISTS idx_aliases_normalized ON aliases(normalized_alias);
            CREATE INDEX IF NOT EXISTS idx_aliases_phonetic ON aliases(phonetic_key);
            CREATE INDEX IF NOT EXISTS idx_aliases_unit_id ON aliases(unit_id);
        "#)?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    fn insert_unit_rows(
        conn: &rusqlite::Connection,
        unit: &NewUnit,
        aliases: &[AliasRecord],
        status: UnitStatus,
    ) -> DatabaseResult<i64> {
        conn.execute(
            r#"INSERT INTO units (name, category, base_unit, conversion_factor, description, region, era, source_url, status)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
            params![
                unit.name,
                unit.category,
                unit.base_unit,
                unit.conversion_factor,
                unit.description,
                unit.region,
                unit.era,
                unit.source_url,
                status.to_database_str(),
            ],
        )?;
        let unit_id = conn.last_insert_rowid();
        Self::insert_alias_rows(conn, unit_id, aliases)?;
        Ok(unit_id)
    }

    fn insert_alias_rows(conn: &rusqlite::Connection, unit_id: i64, aliases: &[AliasRecord]) -> DatabaseResult<()> {
        let mut stmt = conn.prepare_cached(
            "INSERT INTO aliases (unit_id, alias, normalized_alias, phonetic_key) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for record in aliases {
            stmt.execute(params![unit_id, record.alias, record.normalized, record.phonetic])?;
        }
        Ok(())
    }

    /// Insert one unit and its alias set in a single transaction
    pub fn insert_unit(&self, unit: &NewUnit, status: UnitStatus) -> DatabaseResult<i64> {
        let aliases = unit.alias_records();
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let unit_id = Self::insert_unit_rows(&tx, unit, &aliases, status)?;
        tx.commit()?;
        Ok(unit_id)
    }

    /// Insert many units with precomputed aliases in one transaction.
    /// Each unit gets its own savepoint: a failing row is rolled back and
    /// counted, the rest still commit.
    pub fn insert_units_batch(
        &self,
        units: &[(NewUnit, Vec<AliasRecord>)],
        status: UnitStatus,
    ) -> DatabaseResult<SeedReport> {
        let mut report = SeedReport::default();
        let mut conn = self.get_conn()?;
        let mut tx = conn.transaction()?;
        for (unit, aliases) in units {
            let sp = tx.savepoint()?;
            match Self::insert_unit_rows(&sp, unit, aliases, status) {
                Ok(_) => {
                    sp.commit()?;
                    report.inserted += 1;
                }
                Err(e) => {
                    tracing::warn!(unit = %unit.name, error = %e, "failed to insert unit");
                    report.failed += 1;
                }
            }
        }
        tx.commit()?;
        Ok(report)
    }

    /// Replace a unit's alias set as a whole
    pub fn replace_aliases(&self, unit_id: i64, aliases: &[AliasRecord]) -> DatabaseResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM aliases WHERE unit_id = ?1", [unit_id])?;
        Self::insert_alias_rows(&tx, unit_id, aliases)?;
        tx.commit()?;
        Ok(())
    }

    /// Append a raw alias row without computing any forms
    pub fn insert_alias_row(&self, unit_id: i64, alias: &StoredAlias) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO aliases (unit_id, alias, normalized_alias, phonetic_key) VALUES (?1, ?2, ?3, ?4)",
            params![unit_id, alias.alias, alias.normalized, alias.phonetic],
        )?;
        Ok(())
    }

    /// Update moderation status. Returns false if no such unit.
    pub fn set_status(&self, id: i64, status: UnitStatus) -> DatabaseResult<bool> {
        let conn = self.get_conn()?;
        let changed = conn.execute(
            "UPDATE units SET status = ?1 WHERE id = ?2",
            params![status.to_database_str(), id],
        )?;
        Ok(changed > 0)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    pub fn count_units(&self) -> DatabaseResult<u64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM units", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn count_aliases(&self) -> DatabaseResult<u64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM aliases", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Fetch a unit by id, any status
    pub fn fetch_unit(&self, id: i64) -> DatabaseResult<Option<Unit>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM units u WHERE u.id = ?1", UNIT_COLUMNS);
        match conn.query_row(&sql, [id], Self::row_to_unit) {
            Ok(unit) => Ok(Some(unit)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch units by ids, any status, in id order
    pub fn fetch_units_by_ids(&self, ids: &[i64]) -> DatabaseResult<Vec<Unit>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.get_conn()?;
        let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "SELECT {} FROM units u WHERE u.id IN ({}) ORDER BY u.id",
            UNIT_COLUMNS,
            placeholders.join(",")
        );
        let mut stmt = conn.prepare(&sql)?;
        let units = stmt
            .query_map(rusqlite::params_from_iter(ids.iter()), Self::row_to_unit)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(units)
    }

    /// Raw alias text for a unit, in insertion order
    pub fn aliases_for_unit(&self, unit_id: i64) -> DatabaseResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT alias FROM aliases WHERE unit_id = ?1 ORDER BY id")?;
        let aliases = stmt
            .query_map([unit_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(aliases)
    }

    /// Verified units, optionally in one category, by name
    pub fn fetch_verified_units(&self, category: Option<&str>) -> DatabaseResult<Vec<Unit>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"SELECT {} FROM units u
               WHERE u.status = 'verified' AND (?1 IS NULL OR u.category = ?1)
               ORDER BY u.name, u.id"#,
            UNIT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let units = stmt
            .query_map(params![category], Self::row_to_unit)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(units)
    }

    /// Alias rows of verified units matching `condition` (bound to ?1)
    fn find_alias_hits(&self, condition: &str, value: &str) -> DatabaseResult<Vec<AliasHit>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"SELECT {} FROM aliases a
               JOIN units u ON u.id = a.unit_id
               WHERE u.status = 'verified' AND {}
               ORDER BY a.id"#,
            HIT_COLUMNS, condition
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let hits = stmt
            .query_map([value], Self::row_to_hit)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(hits)
    }

    fn row_to_unit(row: &rusqlite::Row) -> rusqlite::Result<Unit> {
        let status: String = row.get(9)?;
        Ok(Unit {
            id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            base_unit: row.get(3)?,
            conversion_factor: row.get(4)?,
            description: row.get(5)?,
            region: row.get(6)?,
            era: row.get(7)?,
            source_url: row.get(8)?,
            status: UnitStatus::from_database_str(&status),
        })
    }

    fn row_to_hit(row: &rusqlite::Row) -> rusqlite::Result<AliasHit> {
        Ok(AliasHit {
            unit_id: row.get(0)?,
            unit_name: row.get(1)?,
            category: row.get(2)?,
            alias: StoredAlias {
                alias: row.get(3)?,
                normalized: row.get(4)?,
                phonetic: row.get(5)?,
            },
        })
    }
}

impl AliasIndex for Database {
    fn find_by_exact_normalized(&self, normalized: &str) -> IndexResult<Vec<AliasHit>> {
        Ok(self.find_alias_hits("a.normalized_alias = ?1", normalized)?)
    }

    fn find_by_phonetic_key(&self, key: &str) -> IndexResult<Vec<AliasHit>> {
        Ok(self.find_alias_hits("a.phonetic_key = ?1", key)?)
    }

    fn find_by_normalized_substring(&self, fragment: &str) -> IndexResult<Vec<AliasHit>> {
        // instr rather than LIKE: no wildcard escaping, byte-exact like str::contains
        Ok(self.find_alias_hits("instr(a.normalized_alias, ?1) > 0", fragment)?)
    }

    fn alias_count(&self) -> IndexResult<u64> {
        Ok(self.count_aliases()?)
    }
}

impl UnitSource for Database {
    fn fetch_units(&self, ids: &[i64]) -> IndexResult<Vec<Unit>> {
        Ok(self.fetch_units_by_ids(ids)?)
    }

    fn verified_units(&self, category: Option<&str>) -> IndexResult<Vec<Unit>> {
        Ok(self.fetch_verified_units(category)?)
    }
}
