//! Dedup-then-outlier cleaning pipeline.

use crate::dedup::Deduplicator;
use crate::outliers::QuantityOutlierFilter;
use rfq_core::{Config, DedupReport, Error, OutlierReport, Result, Table};
use serde::Serialize;
use tracing::info;

/// Result of a pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct CleaningOutcome {
    /// Cleaned table.
    #[serde(skip)]
    pub table: Table,
    /// Deduplication report, when the stage ran.
    pub dedup: Option<DedupReport>,
    /// Outlier report, when the stage ran.
    pub outliers: Option<OutlierReport>,
}

impl CleaningOutcome {
    /// Rows in the input table.
    pub fn input_rows(&self) -> usize {
        match (&self.dedup, &self.outliers) {
            (Some(d), _) => d.total_rows,
            (None, Some(o)) => o.original_rows,
            (None, None) => self.table.len(),
        }
    }
}

/// Runs the enabled cleaning stages in order.
#[derive(Debug, Clone)]
pub struct CleaningPipeline {
    dedup: Option<Deduplicator>,
    outliers: Option<QuantityOutlierFilter>,
}

impl CleaningPipeline {
    /// Build the pipeline described by `config`.
    ///
    /// `outlier_columns` names the entity and quantity columns. They are only
    /// read when outlier removal is enabled, and are required then.
    pub fn new(config: &Config, outlier_columns: Option<(&str, &str)>) -> Result<Self> {
        let dedup = config
            .pipeline
            .deduplicate
            .then(|| Deduplicator::new(&config.dedup));

        let outliers = match (config.pipeline.remove_outliers, outlier_columns) {
            (false, _) => None,
            (true, Some((entity, quantity))) => Some(QuantityOutlierFilter::new(
                config.outliers.clone(),
                entity,
                quantity,
            )),
            (true, None) => {
                return Err(Error::config(
                    "outlier removal needs entity and quantity columns",
                ))
            }
        };

        Ok(Self { dedup, outliers })
    }

    /// Whether any stage is enabled.
    pub fn is_noop(&self) -> bool {
        self.dedup.is_none() && self.outliers.is_none()
    }

    /// Check every enabled stage against the table's columns.
    pub fn check_schema(&self, table: &Table) -> Result<()> {
        if let Some(dedup) = &self.dedup {
            dedup.check_schema(table)?;
        }
        if let Some(filter) = &self.outliers {
            filter.check_schema(table)?;
        }
        Ok(())
    }

    /// Run the pipeline.
    ///
    /// The schema is checked before any stage runs, so a missing column
    /// fails the run without partial output.
    pub fn run(&self, table: &Table) -> Result<CleaningOutcome> {
        self.check_schema(table)?;

        let mut current = table.clone();

        let dedup = match &self.dedup {
            Some(dedup) => {
                let (out, report) = dedup.deduplicate_with_report(&current)?;
                current = out;
                Some(report)
            }
            None => None,
        };

        let outliers = match &self.outliers {
            Some(filter) => {
                let (out, report) = filter.remove_quantity_outliers_with_report(&current)?;
                current = out;
                Some(report)
            }
            None => None,
        };

        info!(
            input = table.len(),
            output = current.len(),
            "cleaning pipeline complete"
        );

        Ok(CleaningOutcome {
            table: current,
            dedup,
            outliers,
        })
    }
}
