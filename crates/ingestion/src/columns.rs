//! Candidate-list column resolution.
//!
//! Source files name the same field differently ("Quantity", "Qty", ...).
//! These helpers pick the concrete column before the cleaning stages run.

use rfq_core::config::ColumnConfig;
use rfq_core::{Error, Result, Table};
use tracing::debug;

/// Return the first candidate present in the table.
pub fn resolve_column(table: &Table, candidates: &[String]) -> Result<String> {
    resolve_role(table, "candidate", candidates)
}

/// Entity (part) column: the explicit name when set, otherwise the first
/// matching candidate.
pub fn resolve_entity_column(table: &Table, config: &ColumnConfig) -> Result<String> {
    resolve_with(table, "entity", config.entity_column.as_deref(), &config.entity_candidates)
}

/// Quantity column: the explicit name when set, otherwise the first matching
/// candidate.
pub fn resolve_quantity_column(table: &Table, config: &ColumnConfig) -> Result<String> {
    resolve_with(
        table,
        "quantity",
        config.quantity_column.as_deref(),
        &config.quantity_candidates,
    )
}

fn resolve_with(
    table: &Table,
    role: &str,
    explicit: Option<&str>,
    candidates: &[String],
) -> Result<String> {
    match explicit {
        Some(name) => {
            table.column_index(name)?;
            Ok(name.to_string())
        }
        None => resolve_role(table, role, candidates),
    }
}

fn resolve_role(table: &Table, role: &str, candidates: &[String]) -> Result<String> {
    let found = candidates
        .iter()
        .find(|c| table.has_column(c))
        .cloned()
        .ok_or_else(|| Error::unresolved_column(role, candidates))?;
    debug!(role, column = %found, "resolved column");
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str]) -> Table {
        Table::empty(columns.iter().map(|c| c.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_first_candidate_wins() {
        let t = table(&["Qty", "Quantity Received", "Part Number"]);
        let config = ColumnConfig::default();

        assert_eq!(resolve_quantity_column(&t, &config).unwrap(), "Qty");
        assert_eq!(resolve_entity_column(&t, &config).unwrap(), "Part Number");
    }

    #[test]
    fn test_explicit_name_wins() {
        let t = table(&["Quantity", "Qty (EA)", "P/N"]);
        let config = ColumnConfig {
            quantity_column: Some("Qty (EA)".to_string()),
            ..Default::default()
        };

        assert_eq!(resolve_quantity_column(&t, &config).unwrap(), "Qty (EA)");
        assert_eq!(resolve_entity_column(&t, &config).unwrap(), "P/N");
    }

    #[test]
    fn test_explicit_name_must_exist() {
        let t = table(&["Quantity"]);
        let config = ColumnConfig {
            quantity_column: Some("Units".to_string()),
            ..Default::default()
        };
        let err = resolve_quantity_column(&t, &config).unwrap_err();
        assert!(matches!(err, Error::MissingColumn(c) if c == "Units"));
    }

    #[test]
    fn test_unresolved_lists_candidates() {
        let t = table(&["Amount"]);
        let err = resolve_quantity_column(&t, &ColumnConfig::default()).unwrap_err();
        match err {
            Error::UnresolvedColumn { role, candidates } => {
                assert_eq!(role, "quantity");
                assert_eq!(candidates.len(), 5);
            }
            other => panic!("unexpected error: {other}"),
        }

        let err = resolve_column(&t, &["A".to_string(), "B".to_string()]).unwrap_err();
        assert!(err.is_schema());
    }
}
