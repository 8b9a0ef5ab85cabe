//! Configuration structures for the RFQ cleaning system.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration for the cleaning pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Column naming and candidate lists.
    pub columns: ColumnConfig,
    /// Deduplication configuration.
    pub dedup: DedupConfig,
    /// Quantity outlier configuration.
    pub outliers: OutlierConfig,
    /// Inventory fetch configuration.
    pub inventory: InventoryConfig,
    /// Stage toggles.
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Parse a configuration from TOML text. Missing sections take defaults.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Config = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.dedup.validate()?;
        self.outliers.validate()?;
        self.inventory.validate()?;
        Ok(())
    }
}

/// Column names used by the pipeline.
///
/// Explicit names win; candidate lists are probed in order when a name is
/// not given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    /// Explicit entity (part) column.
    pub entity_column: Option<String>,
    /// Explicit quantity column.
    pub quantity_column: Option<String>,
    /// Entity column candidates.
    pub entity_candidates: Vec<String>,
    /// Quantity column candidates.
    pub quantity_candidates: Vec<String>,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            entity_column: None,
            quantity_column: None,
            entity_candidates: vec![
                "Part Number".to_string(),
                "P/N".to_string(),
                "Part".to_string(),
            ],
            quantity_candidates: vec![
                "Quantity".to_string(),
                "Qty".to_string(),
                "Quantity Received".to_string(),
                "Qty Received".to_string(),
                "Qty Received (EA)".to_string(),
            ],
        }
    }
}

/// Deduplication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Columns forming the business key.
    pub key_columns: Vec<String>,
    /// Column holding the submission timestamp.
    pub timestamp_column: String,
    /// Clustering window in days (inclusive).
    pub window_days: f64,
}

impl DedupConfig {
    /// Clustering window as a duration.
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::milliseconds((self.window_days * 86_400_000.0).round() as i64)
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.key_columns.is_empty() {
            return Err(Error::config("dedup.key_columns must not be empty"));
        }
        if !(self.window_days.is_finite() && self.window_days > 0.0) {
            return Err(Error::config(format!(
                "dedup.window_days must be positive, got {}",
                self.window_days
            )));
        }
        Ok(())
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            key_columns: vec![
                "Buyer Company Name".to_string(),
                "Part Number".to_string(),
                "Condition Code".to_string(),
            ],
            timestamp_column: "Received At (UTC)".to_string(),
            window_days: 2.0,
        }
    }
}

/// Quantity outlier configuration.
///
/// The constants are empirically tuned; each is exposed so it can be tuned
/// independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Minimum valid quantities before an entity is analyzed.
    pub min_values: usize,
    /// Highest median in the LOW tier.
    pub low_tier_max_median: f64,
    /// Highest median in the MEDIUM tier.
    pub medium_tier_max_median: f64,

    /// LOW: threshold multiplier of the median when IQR is zero.
    pub low_flat_median_mult: f64,
    /// LOW: minimum threshold when IQR is zero.
    pub low_flat_floor: f64,
    /// LOW: IQR multiplier above Q3.
    pub low_iqr_mult: f64,
    /// LOW: minimum threshold when IQR is positive.
    pub low_iqr_floor: f64,
    /// LOW: cap applies when max exceeds this multiple of global p99.
    pub low_global_p99_trigger: f64,
    /// LOW: cap value as a multiple of global p99.
    pub low_global_p99_cap: f64,

    /// MEDIUM: threshold multiplier of the median when IQR is zero.
    pub medium_flat_median_mult: f64,
    /// MEDIUM: IQR multiplier above Q3.
    pub medium_iqr_mult: f64,
    /// MEDIUM: minimum threshold as a multiple of the median.
    pub medium_floor_median_mult: f64,
    /// MEDIUM: cap applies when max exceeds this multiple of global p99.9.
    pub medium_global_p999_trigger: f64,
    /// MEDIUM: cap value as a multiple of global p99.9.
    pub medium_global_p999_cap: f64,

    /// HIGH: threshold multiplier of the median when IQR is zero.
    pub high_flat_median_mult: f64,
    /// HIGH: IQR multiplier above Q3.
    pub high_iqr_mult: f64,
    /// HIGH: minimum threshold as a multiple of the median.
    pub high_floor_median_mult: f64,
    /// HIGH: cap applies when max exceeds this multiple of global p99.9.
    pub high_global_p999_trigger: f64,
    /// HIGH: cap value as a multiple of global p99.9.
    pub high_global_p999_cap: f64,

    /// Entities whose minimum exceeds this are candidates for the
    /// consistent high-volume guard.
    pub consistent_min_quantity: f64,
    /// Consistent high-volume guard: max must be within this multiple of median.
    pub consistent_max_median_ratio: f64,
    /// Variation guard: max within this multiple of median skips removal.
    pub legitimate_max_median_ratio: f64,

    /// Minimum valid quantities for spike sharpening.
    pub spike_min_values: usize,
    /// Highest / second-highest ratio that marks a spike.
    pub spike_ratio: f64,
    /// Threshold tightens to this multiple of the second-highest value.
    pub spike_second_mult: f64,

    /// Optional hard cap on every entity threshold.
    pub absolute_ceiling: Option<f64>,
}

impl OutlierConfig {
    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.min_values < 2 {
            return Err(Error::config("outliers.min_values must be at least 2"));
        }
        if self.spike_min_values < 2 {
            return Err(Error::config("outliers.spike_min_values must be at least 2"));
        }
        if self.low_tier_max_median > self.medium_tier_max_median {
            return Err(Error::config(format!(
                "outliers tier ceilings out of order: low {} > medium {}",
                self.low_tier_max_median, self.medium_tier_max_median
            )));
        }
        if let Some(ceiling) = self.absolute_ceiling {
            if !(ceiling.is_finite() && ceiling > 0.0) {
                return Err(Error::config(format!(
                    "outliers.absolute_ceiling must be positive, got {ceiling}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            min_values: 2,
            low_tier_max_median: 10.0,
            medium_tier_max_median: 100.0,

            low_flat_median_mult: 20.0,
            low_flat_floor: 100.0,
            low_iqr_mult: 5.0,
            low_iqr_floor: 50.0,
            low_global_p99_trigger: 2.0,
            low_global_p99_cap: 1.0,

            medium_flat_median_mult: 10.0,
            medium_iqr_mult: 4.0,
            medium_floor_median_mult: 3.0,
            medium_global_p999_trigger: 1.0,
            medium_global_p999_cap: 1.0,

            high_flat_median_mult: 3.0,
            high_iqr_mult: 6.0,
            high_floor_median_mult: 2.0,
            high_global_p999_trigger: 3.0,
            high_global_p999_cap: 2.0,

            consistent_min_quantity: 1000.0,
            consistent_max_median_ratio: 2.0,
            legitimate_max_median_ratio: 50.0,

            spike_min_values: 3,
            spike_ratio: 10.0,
            spike_second_mult: 5.0,

            absolute_ceiling: None,
        }
    }
}

/// Inventory snapshot query configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Fully qualified snapshot table.
    pub table: String,
    /// Part number column in the snapshot table.
    pub part_column: String,
    /// Snapshot date column.
    pub snapshot_date_column: String,
    /// Earliest snapshot date to fetch.
    pub min_snapshot_date: String,
    /// Columns to select.
    pub select_columns: Vec<String>,
    /// Maximum part numbers per query.
    pub chunk_size: usize,
    /// Database file; in-memory when absent.
    pub database_path: Option<String>,
}

impl InventoryConfig {
    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::config("inventory.chunk_size must be positive"));
        }
        if self.select_columns.is_empty() {
            return Err(Error::config("inventory.select_columns must not be empty"));
        }
        Ok(())
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            table: "DW_PROD.DW.SNAP_STOCK_DAILY".to_string(),
            part_column: "P/N".to_string(),
            snapshot_date_column: "SNAP_DATE".to_string(),
            min_snapshot_date: "2024-08-01 00:00:00".to_string(),
            select_columns: vec![
                "P/N".to_string(),
                "Condition Code".to_string(),
                "Qty Available".to_string(),
                "SNAP_DATE".to_string(),
                "Unit Cost".to_string(),
                "Unit Price".to_string(),
                "List Price".to_string(),
                "P/N Type Code Simple".to_string(),
            ],
            chunk_size: 1000,
            database_path: None,
        }
    }
}

/// Pipeline stage toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Run deduplication.
    pub deduplicate: bool,
    /// Run quantity outlier removal.
    pub remove_outliers: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            deduplicate: true,
            remove_outliers: true,
        }
    }
}
