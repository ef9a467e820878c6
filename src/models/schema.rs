//! Schema-related data models.
//!
//! This module defines the uniform shapes every explorer returns, regardless of
//! which dialect produced them.

use serde::{Deserialize, Serialize};

/// Schema name reported for SQLite tables, which have no schema concept.
pub const SQLITE_SCHEMA: &str = "main";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    /// Catalog/schema for MySQL and PostgreSQL, `"main"` for SQLite
    pub schema: String,
}

impl Table {
    pub fn new(name: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
        }
    }
}

/// Rows and columns of a result set with every cell already rendered as text.
///
/// Every row holds exactly `columns.len()` cells, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TabularResult {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row. Rows of the wrong width are rejected.
    pub fn push_row(&mut self, row: Vec<String>) -> bool {
        if row.len() != self.columns.len() {
            return false;
        }
        self.rows.push(row);
        true
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Check the row-width invariant.
    pub fn is_rectangular(&self) -> bool {
        self.rows.iter().all(|r| r.len() == self.columns.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_row_rejects_wrong_width() {
        let mut result = TabularResult::new(vec!["id".into(), "name".into()]);
        assert!(result.push_row(vec!["1".into(), "alice".into()]));
        assert!(!result.push_row(vec!["2".into()]));
        assert_eq!(result.row_count(), 1);
        assert!(result.is_rectangular());
    }

    #[test]
    fn test_column_index() {
        let result = TabularResult::new(vec!["cid".into(), "name".into(), "pk".into()]);
        assert_eq!(result.column_index("pk"), Some(2));
        assert_eq!(result.column_index("missing"), None);
    }
}
