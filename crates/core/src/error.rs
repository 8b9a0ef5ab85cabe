//! Error types for the RFQ cleaning system.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the RFQ cleaning system.
#[derive(Error, Debug)]
pub enum Error {
    /// A column required by an operation is absent from the table.
    #[error("Missing expected column: {0}")]
    MissingColumn(String),

    /// None of the candidate column names exist in the table.
    #[error("No {role} column found (checked: {})", candidates.join(", "))]
    UnresolvedColumn {
        role: String,
        candidates: Vec<String>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data error (malformed table shape).
    #[error("Data error: {0}")]
    Data(String),

    /// Input file does not exist.
    #[error("File not found: {}\nDirectory contents: [{}]", path.display(), listing.join(", "))]
    FileNotFound { path: PathBuf, listing: Vec<String> },

    /// Input file has the wrong extension for the reader.
    #[error("Unsupported file extension: {found:?} for {} (only .{expected} supported)", path.display())]
    UnsupportedExtension {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// CSV / XLSX codec error.
    #[error("Format error: {0}")]
    Format(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration parse error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Create a missing column error.
    pub fn missing_column(name: impl Into<String>) -> Self {
        Error::MissingColumn(name.into())
    }

    /// Create an unresolved column error.
    pub fn unresolved_column(role: impl Into<String>, candidates: &[String]) -> Self {
        Error::UnresolvedColumn {
            role: role.into(),
            candidates: candidates.to_vec(),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create a data error.
    pub fn data(msg: impl Into<String>) -> Self {
        Error::Data(msg.into())
    }

    /// Create a format error.
    pub fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    /// Create a database error.
    pub fn database(msg: impl Into<String>) -> Self {
        Error::Database(msg.into())
    }

    /// Create a file-not-found error, listing the parent directory.
    pub fn file_not_found(path: &Path) -> Self {
        let listing = path
            .parent()
            .and_then(|dir| std::fs::read_dir(dir).ok())
            .map(|entries| {
                let mut names: Vec<String> = entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect();
                names.sort();
                names
            })
            .unwrap_or_default();

        Error::FileNotFound {
            path: path.to_path_buf(),
            listing,
        }
    }

    /// Whether this error is a schema problem (missing or unresolvable column).
    pub fn is_schema(&self) -> bool {
        matches!(self, Error::MissingColumn(_) | Error::UnresolvedColumn { .. })
    }
}
