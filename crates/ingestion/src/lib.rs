//! Data ingestion for the RFQ cleaning system.
//!
//! This crate handles:
//! - CSV / XLSX loading with existence and extension checks
//! - Skip-if-exists saving
//! - Candidate-list column resolution
//! - Chunked inventory snapshot lookup

pub mod columns;
pub mod inventory;
pub mod loader;

pub use columns::{resolve_column, resolve_entity_column, resolve_quantity_column};
pub use inventory::{build_inventory_sql, DuckDbInventoryQuery, InventoryFetcher, InventoryQuery};
pub use loader::{
    read_csv_table, read_table, read_xlsx_table, save_csv_table, save_table, save_xlsx_table,
    SaveOutcome, TableFormat,
};
