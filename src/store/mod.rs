//! SQLite experiment store.
//!
//! Persists the two artifacts an experiment produces before replay, next to
//! the dataset table in the same database file:
//!
//! ```text
//! attr_sets(attr_code TEXT PRIMARY KEY, cardinality INTEGER)   catalog rows
//! workloads(id INTEGER PRIMARY KEY, attr_code TEXT)            arrival order
//! meta(key TEXT PRIMARY KEY, value TEXT)                       version, universe
//! ```
//!
//! The store is versioned and clears its own tables when the stored version
//! does not match.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, warn};

use crate::attribute::AttributeUniverse;
use crate::catalog::{CardinalityCatalog, CatalogError};
use crate::workload::{Workload, WorkloadError};

/// Current store schema version. Bump this when the table layout changes.
const STORE_VERSION: i32 = 1;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Workload(#[from] WorkloadError),

    #[error("stored catalog was built for universe {stored}, expected {expected}")]
    UniverseMismatch { stored: String, expected: String },

    #[error("stored cardinality {value} for \"{code}\" is negative")]
    InvalidCardinality { code: String, value: i64 },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Row counts of the stored artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub catalog_rows: usize,
    pub workload_rows: usize,
}

/// Catalog and workload persistence.
pub struct ExperimentStore {
    conn: Connection,
}

impl ExperimentStore {
    /// Open or create the store at `path`, creating parent directories.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), "opening experiment store");
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS attr_sets (
                attr_code TEXT PRIMARY KEY,
                cardinality INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS workloads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                attr_code TEXT NOT NULL
            );
            ",
        )?;

        let store = Self { conn };
        match store.meta("version")? {
            Some(v) if v == STORE_VERSION.to_string() => {}
            Some(v) => {
                warn!(stored = %v, current = STORE_VERSION, "store version changed, clearing");
                store.clear_all()?;
                store.set_meta("version", &STORE_VERSION.to_string())?;
            }
            None => store.set_meta("version", &STORE_VERSION.to_string())?,
        }
        Ok(store)
    }

    fn meta(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self
            .conn
            .query_row("SELECT value FROM meta WHERE key = ?", params![key], |row| {
                row.get(0)
            })
            .optional()?)
    }

    fn set_meta(&self, key: &str, value: &str) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }

    /// The underlying connection, for the dataset table and its source.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Replace the stored catalog.
    pub fn save_catalog(&mut self, catalog: &CardinalityCatalog) -> StoreResult<()> {
        let universe = serde_json::to_string(catalog.universe())?;
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM attr_sets", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO attr_sets (attr_code, cardinality) VALUES (?, ?)",
            )?;
            for entry in catalog.entries() {
                stmt.execute(params![entry.code, entry.cardinality as i64])?;
            }
        }
        tx.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('universe', ?)",
            params![universe],
        )?;
        tx.commit()?;
        info!(rows = catalog.len(), "stored catalog");
        Ok(())
    }

    /// Load the stored catalog for `universe`, if one was saved.
    pub fn load_catalog(
        &self,
        universe: &AttributeUniverse,
    ) -> StoreResult<Option<CardinalityCatalog>> {
        let mut stmt = self
            .conn
            .prepare("SELECT attr_code, cardinality FROM attr_sets")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        if rows.is_empty() {
            return Ok(None);
        }

        self.check_universe(universe)?;
        let mut entries = Vec::with_capacity(rows.len());
        for (code, value) in rows {
            let cardinality = u64::try_from(value).map_err(|_| StoreError::InvalidCardinality {
                code: code.clone(),
                value,
            })?;
            let key = universe.parse(&code).map_err(CatalogError::from)?;
            entries.push((key, cardinality));
        }
        Ok(Some(CardinalityCatalog::from_entries(
            universe.clone(),
            entries,
        )?))
    }

    fn check_universe(&self, universe: &AttributeUniverse) -> StoreResult<()> {
        let Some(stored) = self.meta("universe")? else {
            return Ok(());
        };
        let stored: AttributeUniverse = serde_json::from_str(&stored)?;
        if &stored != universe {
            return Err(StoreError::UniverseMismatch {
                stored: describe(&stored),
                expected: describe(universe),
            });
        }
        Ok(())
    }

    /// Replace the stored workload.
    pub fn save_workload(
        &mut self,
        universe: &AttributeUniverse,
        workload: &Workload,
    ) -> StoreResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM workloads", [])?;
        {
            let mut stmt = tx.prepare("INSERT INTO workloads (attr_code) VALUES (?)")?;
            for code in workload.codes(universe) {
                stmt.execute(params![code])?;
            }
        }
        tx.commit()?;
        info!(queries = workload.len(), "stored workload");
        Ok(())
    }

    /// Load the stored workload in arrival order, if one was saved.
    pub fn load_workload(&self, universe: &AttributeUniverse) -> StoreResult<Option<Workload>> {
        let mut stmt = self
            .conn
            .prepare("SELECT attr_code FROM workloads ORDER BY id")?;
        let codes = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        if codes.is_empty() {
            return Ok(None);
        }
        let workload = Workload::parse(universe, codes.iter().map(String::as_str))?;
        Ok(Some(workload))
    }

    pub fn stats(&self) -> StoreResult<StoreStats> {
        let catalog_rows: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM attr_sets", [], |row| row.get(0))?;
        let workload_rows: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM workloads", [], |row| row.get(0))?;
        Ok(StoreStats {
            catalog_rows: catalog_rows as usize,
            workload_rows: workload_rows as usize,
        })
    }

    /// Clear the catalog and workload (but keep the version).
    pub fn clear_all(&self) -> StoreResult<()> {
        self.conn.execute_batch(
            "
            DELETE FROM attr_sets;
            DELETE FROM workloads;
            DELETE FROM meta WHERE key = 'universe';
            ",
        )?;
        Ok(())
    }
}

fn describe(universe: &AttributeUniverse) -> String {
    let attrs: Vec<String> = universe
        .attributes()
        .iter()
        .map(|a| format!("{}={}", a.symbol, a.column))
        .collect();
    format!("[{}]", attrs.join(", "))
}
