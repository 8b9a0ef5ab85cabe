//! Chunked inventory snapshot lookup.
//!
//! Part numbers are sent to the warehouse in bounded `IN (...)` batches and
//! the per-batch results concatenated. A CSV snapshot of the result can be
//! reused across runs.

use crate::loader::{read_csv_table, save_csv_table};
use duckdb::Connection;
use rfq_core::config::InventoryConfig;
use rfq_core::{Error, Result, Table};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// One bounded inventory request.
pub trait InventoryQuery {
    /// Fetch snapshot rows for a batch of part numbers.
    fn fetch_chunk(&mut self, part_numbers: &[String]) -> Result<Table>;
}

/// Fetches inventory for many part numbers through an [`InventoryQuery`].
pub struct InventoryFetcher<Q> {
    query: Q,
    config: InventoryConfig,
}

impl<Q: InventoryQuery> InventoryFetcher<Q> {
    /// Create a fetcher.
    pub fn new(query: Q, config: InventoryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { query, config })
    }

    /// Configuration in use.
    pub fn config(&self) -> &InventoryConfig {
        &self.config
    }

    /// Distinct, trimmed, non-empty part numbers of `column`, sorted.
    pub fn unique_part_numbers(table: &Table, column: &str) -> Result<Vec<String>> {
        let col = table.column_index(column)?;
        let parts: BTreeSet<&str> = table
            .column_values(col)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        Ok(parts.into_iter().map(str::to_string).collect())
    }

    /// Fetch inventory rows for `part_numbers`, chunk by chunk.
    pub fn fetch(&mut self, part_numbers: &[String]) -> Result<Table> {
        let mut result = Table::empty(self.config.select_columns.clone())?;
        let total = part_numbers.len();
        let mut done = 0;

        for chunk in part_numbers.chunks(self.config.chunk_size) {
            let part = self.query.fetch_chunk(chunk)?;
            if part.columns() != result.columns() {
                return Err(Error::data(format!(
                    "inventory chunk columns {:?} do not match {:?}",
                    part.columns(),
                    result.columns()
                )));
            }
            result.extend(part)?;
            done += chunk.len();
            debug!(fetched = done, total, "inventory chunk complete");
        }

        info!(
            parts = total,
            rows = result.len(),
            cols = result.columns().len(),
            "loaded inventory"
        );
        Ok(result)
    }

    /// Load `dir/filename` when it holds a readable snapshot, otherwise fetch
    /// and save one.
    pub fn fetch_cached(
        &mut self,
        part_numbers: &[String],
        dir: impl AsRef<Path>,
        filename: &str,
    ) -> Result<Table> {
        let dir = dir.as_ref();
        let path = dir.join(filename);

        if path.exists() {
            match read_csv_table(&path) {
                Ok(table) => {
                    info!(path = %path.display(), rows = table.len(), "using cached inventory");
                    return Ok(table);
                }
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "unable to load cached inventory, querying instead"
                    );
                }
            }
        }

        let table = self.fetch(part_numbers)?;
        if let Err(e) = save_csv_table(&table, dir, filename) {
            warn!(path = %path.display(), error = %e, "failed to save inventory snapshot");
        }
        Ok(table)
    }
}

/// Build the snapshot query for one chunk of part numbers.
pub fn build_inventory_sql(config: &InventoryConfig, part_numbers: &[String]) -> String {
    let select = config
        .select_columns
        .iter()
        .map(|c| format!("CAST({} AS VARCHAR) AS {}", quote_ident(c), quote_ident(c)))
        .collect::<Vec<_>>()
        .join(", ");
    let parts = part_numbers
        .iter()
        .map(|p| quote_literal(p))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "SELECT {select} FROM {table} WHERE {date} >= {min_date} AND {part} IN ({parts})",
        table = config.table,
        date = quote_ident(&config.snapshot_date_column),
        min_date = quote_literal(&config.min_snapshot_date),
        part = quote_ident(&config.part_column),
    )
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// [`InventoryQuery`] over a DuckDB connection.
pub struct DuckDbInventoryQuery {
    conn: Connection,
    config: InventoryConfig,
}

impl DuckDbInventoryQuery {
    /// Open the configured database file, or an in-memory database.
    pub fn open(config: InventoryConfig) -> Result<Self> {
        let conn = match &config.database_path {
            Some(path) => Connection::open(path),
            None => Connection::open_in_memory(),
        }
        .map_err(|e| Error::database(e.to_string()))?;
        Ok(Self::with_connection(conn, config))
    }

    /// Wrap an existing connection.
    pub fn with_connection(conn: Connection, config: InventoryConfig) -> Self {
        Self { conn, config }
    }

    /// Underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl InventoryQuery for DuckDbInventoryQuery {
    fn fetch_chunk(&mut self, part_numbers: &[String]) -> Result<Table> {
        let columns = self.config.select_columns.clone();
        if part_numbers.is_empty() {
            return Table::empty(columns);
        }

        let sql = build_inventory_sql(&self.config, part_numbers);
        let width = columns.len();

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| Error::database(e.to_string()))?;
        let rows = stmt
            .query_map(duckdb::params![], |row| {
                (0..width)
                    .map(|i| row.get::<_, Option<String>>(i).map(Option::unwrap_or_default))
                    .collect::<duckdb::Result<Vec<String>>>()
            })
            .map_err(|e| Error::database(e.to_string()))?
            .collect::<duckdb::Result<Vec<_>>>()
            .map_err(|e| Error::database(e.to_string()))?;

        Table::new(columns, rows)
    }
}
