//! Synthetic grouping datasets.
//!
//! Generates a table of integer attribute columns, each drawn uniformly from
//! `1..=domain`, so that the column's domain bounds its own cardinality and
//! wider groupings refine narrower ones.

use rand::Rng;
use rusqlite::{params_from_iter, Connection};
use tracing::{debug, info};

use crate::attribute::{Attribute, AttributeUniverse};
use crate::sql;

/// Errors raised while generating a dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("invalid dataset: {0}")]
    Invalid(String),
}

pub type DatasetResult<T> = Result<T, DatasetError>;

/// A generated column and the size of its value domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub attribute: Attribute,
    pub domain: u32,
}

/// Layout of a synthetic table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticTable {
    pub table: String,
    pub columns: Vec<ColumnSpec>,
}

impl SyntheticTable {
    pub fn new(table: impl Into<String>, columns: Vec<ColumnSpec>) -> DatasetResult<Self> {
        let table = table.into();
        if table.is_empty() {
            return Err(DatasetError::Invalid("table name is empty".to_string()));
        }
        if columns.is_empty() {
            return Err(DatasetError::Invalid("no columns defined".to_string()));
        }
        if let Some(c) = columns.iter().find(|c| c.domain == 0) {
            return Err(DatasetError::Invalid(format!(
                "column {} has an empty domain",
                c.attribute.column
            )));
        }
        Ok(Self { table, columns })
    }

    /// The universe of groupable attributes this table exposes.
    pub fn universe(&self) -> DatasetResult<AttributeUniverse> {
        AttributeUniverse::new(self.columns.iter().map(|c| c.attribute.clone()).collect())
            .map_err(|e| DatasetError::Invalid(e.to_string()))
    }

    fn column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|c| c.attribute.column.as_str())
            .collect()
    }

    /// Recreate the table and fill it with `rows` random rows.
    ///
    /// Runs in a single transaction; on error the previous table is kept.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        conn: &mut Connection,
        rows: u64,
        rng: &mut R,
    ) -> DatasetResult<u64> {
        let columns = self.column_names();
        info!(table = %self.table, rows, "generating dataset");

        let tx = conn.transaction()?;
        tx.execute(
            &format!("DROP TABLE IF EXISTS {}", sql::quote_ident(&self.table)),
            [],
        )?;
        tx.execute(&sql::create_integer_table(&self.table, &columns), [])?;
        {
            let mut stmt = tx.prepare(&sql::insert_row(&self.table, &columns))?;
            let mut values = vec![0i64; self.columns.len()];
            for row in 0..rows {
                for (value, column) in values.iter_mut().zip(&self.columns) {
                    *value = i64::from(rng.random_range(1..=column.domain));
                }
                stmt.execute(params_from_iter(values.iter()))?;
                if (row + 1) % 100_000 == 0 {
                    debug!(inserted = row + 1, "generating dataset");
                }
            }
        }
        tx.commit()?;
        Ok(rows)
    }
}

/// Draw a row count from `[min, max)`, or exactly `min` when they are equal.
pub fn draw_row_count<R: Rng + ?Sized>(min: u64, max: u64, rng: &mut R) -> DatasetResult<u64> {
    match min.cmp(&max) {
        std::cmp::Ordering::Less => Ok(rng.random_range(min..max)),
        std::cmp::Ordering::Equal => Ok(min),
        std::cmp::Ordering::Greater => Err(DatasetError::Invalid(format!(
            "row range {min}..{max} is empty"
        ))),
    }
}

/// Number of rows currently in `table`.
pub fn row_count(conn: &Connection, table: &str) -> DatasetResult<u64> {
    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", sql::quote_ident(table)),
        [],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}
