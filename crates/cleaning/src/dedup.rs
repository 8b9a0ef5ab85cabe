//! Time-windowed deduplication of repeated submissions.
//!
//! Records sharing a business key are clustered by time: the earliest record
//! of a cluster is kept and any record within the window of the last kept
//! record is discarded.
//!
//! Ordering within a group is ascending by timestamp with undated records
//! placed after every dated record. The sort is stable, so ties and undated
//! records keep their input order. An undated record is therefore kept only
//! when its group has no dated record at all, and then only the first one.

use chrono::Duration;
use rfq_core::config::DedupConfig;
use rfq_core::{parse_timestamp, DedupReport, Error, Result, Table, Timestamp};
use std::collections::HashMap;
use tracing::{debug, info};

/// Collapses near-duplicate records per business key.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    key_columns: Vec<String>,
    timestamp_column: String,
    window: Duration,
}

impl Deduplicator {
    /// Create a deduplicator from configuration.
    pub fn new(config: &DedupConfig) -> Self {
        Self {
            key_columns: config.key_columns.clone(),
            timestamp_column: config.timestamp_column.clone(),
            window: config.window(),
        }
    }

    /// Create a deduplicator with explicit columns and window.
    pub fn with_columns(
        key_columns: &[String],
        timestamp_column: &str,
        window: Duration,
    ) -> Result<Self> {
        if key_columns.is_empty() {
            return Err(Error::config("deduplication needs at least one key column"));
        }
        if window <= Duration::zero() {
            return Err(Error::config(format!("dedup window must be positive, got {window}")));
        }
        Ok(Self {
            key_columns: key_columns.to_vec(),
            timestamp_column: timestamp_column.to_string(),
            window,
        })
    }

    /// Clustering window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Check that the table carries every column this deduplicator reads.
    pub fn check_schema(&self, table: &Table) -> Result<()> {
        self.resolve_columns(table).map(|_| ())
    }

    fn resolve_columns(&self, table: &Table) -> Result<(Vec<usize>, usize)> {
        let keys = self
            .key_columns
            .iter()
            .map(|c| table.column_index(c))
            .collect::<Result<Vec<_>>>()?;
        let ts = table.column_index(&self.timestamp_column)?;
        Ok((keys, ts))
    }

    /// Deduplicate a table.
    pub fn deduplicate(&self, table: &Table) -> Result<Table> {
        self.deduplicate_with_report(table).map(|(t, _)| t)
    }

    /// Deduplicate a table and report counts.
    pub fn deduplicate_with_report(&self, table: &Table) -> Result<(Table, DedupReport)> {
        let (key_cols, ts_col) = self.resolve_columns(table)?;

        let parsed: Vec<Option<Timestamp>> =
            table.column_values(ts_col).map(parse_timestamp).collect();

        let groups = group_rows(table, &key_cols);

        let mut kept = Vec::with_capacity(groups.len());
        for members in &groups {
            kept.extend(cluster_anchors(members, &parsed, self.window));
        }
        // Emit in input order
        kept.sort_unstable();

        let report = DedupReport {
            total_rows: table.len(),
            kept_rows: kept.len(),
            removed_rows: table.len() - kept.len(),
            groups: groups.len(),
            undated_rows: parsed.iter().filter(|p| p.is_none()).count(),
        };

        info!(
            total = report.total_rows,
            kept = report.kept_rows,
            removed = report.removed_rows,
            groups = report.groups,
            window_hours = self.window.num_hours(),
            "deduplication complete"
        );
        if report.undated_rows > 0 {
            debug!(undated = report.undated_rows, "rows without a parseable timestamp");
        }

        Ok((table.select_rows(&kept), report))
    }
}

/// Deduplicate `table` by `key_columns` within `window` of `timestamp_column`.
pub fn deduplicate(
    table: &Table,
    key_columns: &[String],
    timestamp_column: &str,
    window: Duration,
) -> Result<Table> {
    Deduplicator::with_columns(key_columns, timestamp_column, window)?.deduplicate(table)
}

/// Partition row indices by business key, groups in first-appearance order.
fn group_rows(table: &Table, key_cols: &[usize]) -> Vec<Vec<usize>> {
    let mut index: HashMap<Vec<&str>, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for row in 0..table.len() {
        let key: Vec<&str> = key_cols.iter().map(|&c| table.cell(row, c)).collect();
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(row);
    }

    groups
}

/// Select the rows kept from one business-key group.
fn cluster_anchors(members: &[usize], parsed: &[Option<Timestamp>], window: Duration) -> Vec<usize> {
    let mut order = members.to_vec();
    order.sort_by_key(|&i| (parsed[i].is_none(), parsed[i]));

    let mut kept = Vec::new();
    let mut last_kept: Option<Timestamp> = None;

    for row in order {
        match parsed[row] {
            None => {
                if kept.is_empty() {
                    kept.push(row);
                }
            }
            Some(ts) => match last_kept {
                Some(last) if ts - last <= window => {}
                _ => {
                    kept.push(row);
                    last_kept = Some(ts);
                }
            },
        }
    }

    kept
}
