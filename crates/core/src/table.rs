//! In-memory tabular data.
//!
//! A `Table` is an ordered list of rows sharing a named column set. Cells are
//! kept as text; typed views are produced by coercion where they are used.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An ordered, rectangular table of text cells.
///
/// Deserialization goes through [`Table::new`], so the shape checks hold for
/// tables read from JSON too.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct RawTable {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<String>>,
}

impl TryFrom<RawTable> for Table {
    type Error = Error;

    fn try_from(raw: RawTable) -> Result<Self> {
        Table::new(raw.columns, raw.rows)
    }
}

impl Table {
    /// Create a table, validating column uniqueness and row width.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(Error::data(format!("duplicate column name: {name}")));
            }
        }

        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(Error::data(format!(
                    "row {idx} has {} cells, expected {}",
                    row.len(),
                    columns.len()
                )));
            }
        }

        Ok(Self { columns, rows })
    }

    /// Create an empty table with the given columns.
    pub fn empty(columns: Vec<String>) -> Result<Self> {
        Self::new(columns, Vec::new())
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether a column exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Position of a column, or `MissingColumn`.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| Error::missing_column(name))
    }

    /// Cell at (row, col).
    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> &str {
        &self.rows[row][col]
    }

    /// Iterate over the values of one column.
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(move |r| r[col].as_str())
    }

    /// Append a row, validating its width.
    pub fn push_row(&mut self, row: Vec<String>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::data(format!(
                "row has {} cells, expected {}",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Build a new table holding copies of the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Append all rows of another table with the same columns.
    pub fn extend(&mut self, other: Table) -> Result<()> {
        if other.columns != self.columns {
            return Err(Error::data(format!(
                "cannot concatenate tables with different columns: {:?} vs {:?}",
                self.columns, other.columns
            )));
        }
        self.rows.extend(other.rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(
            vec!["Part Number".into(), "Quantity".into()],
            vec![
                vec!["A".into(), "1".into()],
                vec!["B".into(), "2".into()],
                vec!["C".into(), "3".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let result = Table::new(vec!["a".into(), "b".into()], vec![vec!["1".into()]]);
        assert!(matches!(result, Err(Error::Data(_))));
    }

    #[test]
    fn test_rejects_duplicate_columns() {
        let result = Table::new(vec!["a".into(), "a".into()], vec![]);
        assert!(matches!(result, Err(Error::Data(_))));
    }

    #[test]
    fn test_column_index() {
        let table = sample();
        assert_eq!(table.column_index("Quantity").unwrap(), 1);
        assert!(matches!(
            table.column_index("Qty"),
            Err(Error::MissingColumn(name)) if name == "Qty"
        ));
    }

    #[test]
    fn test_select_rows_copies_in_order() {
        let table = sample();
        let picked = table.select_rows(&[2, 0]);
        assert_eq!(picked.columns(), table.columns());
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.cell(0, 0), "C");
        assert_eq!(picked.cell(1, 0), "A");
        // Source is untouched
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_deserialize_validates_shape() {
        let json = serde_json::to_string(&sample()).unwrap();
        let back: Table = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample());

        let ragged = r#"{"columns": ["a", "b"], "rows": [["1"]]}"#;
        assert!(serde_json::from_str::<Table>(ragged).is_err());

        let duplicate = r#"{"columns": ["a", "a"], "rows": []}"#;
        assert!(serde_json::from_str::<Table>(duplicate).is_err());
    }

    #[test]
    fn test_extend_requires_same_columns() {
        let mut table = sample();
        let other = Table::empty(vec!["x".into()]).unwrap();
        assert!(table.extend(other).is_err());

        let same = sample();
        table.extend(same).unwrap();
        assert_eq!(table.len(), 6);
    }
}
