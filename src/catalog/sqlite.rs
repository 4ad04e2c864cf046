//! SQLite-backed cardinality source.

use rusqlite::Connection;
use tracing::debug;

use super::{CardinalitySource, CatalogError, CatalogResult};
use crate::attribute::{AttributeUniverse, GroupingKey};
use crate::sql;

/// Counts distinct groups by running `GROUP BY` against a dataset table.
pub struct SqliteSource<'a> {
    conn: &'a Connection,
    table: String,
}

impl<'a> SqliteSource<'a> {
    pub fn new(conn: &'a Connection, table: impl Into<String>) -> Self {
        Self {
            conn,
            table: table.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl CardinalitySource for SqliteSource<'_> {
    fn distinct_count(
        &self,
        universe: &AttributeUniverse,
        key: &GroupingKey,
    ) -> CatalogResult<u64> {
        universe.check(key)?;
        let query = sql::distinct_groups_query(&self.table, &universe.columns(key));
        debug!(%query, "counting distinct groups");

        let count: i64 = self.conn.query_row(&query, [], |row| row.get(0))?;
        u64::try_from(count).map_err(|_| CatalogError::InvalidCount {
            code: universe.code(key),
            count,
        })
    }
}
