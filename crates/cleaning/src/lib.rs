//! Record cleaning for RFQ tables.
//!
//! This crate handles:
//! - Time-windowed deduplication of repeated submissions
//! - Per-entity quantity outlier removal
//! - Quantity distribution statistics and entity profiles
//! - The dedup-then-outlier cleaning pipeline

pub mod dedup;
pub mod outliers;
pub mod pipeline;
pub mod profile;
pub mod stats;

pub use dedup::{deduplicate, Deduplicator};
pub use outliers::{remove_quantity_outliers, EntityThreshold, EntityVerdict, QuantityOutlierFilter};
pub use pipeline::{CleaningOutcome, CleaningPipeline};
pub use profile::{profile_entities, EntityQuantityProfile};
pub use stats::{quantile_sorted, QuantityDistribution};
