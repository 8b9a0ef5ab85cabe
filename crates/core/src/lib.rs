//! Core types and configuration for the RFQ cleaning system.
//!
//! This crate provides shared types used across all other crates:
//! - The in-memory `Table`
//! - Timestamp and quantity coercion
//! - Configuration structures
//! - Report types and the common error type

pub mod config;
pub mod error;
pub mod table;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use table::Table;
pub use types::*;
