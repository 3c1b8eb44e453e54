use anyhow::{bail, Result};
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::warn;

use crate::config::ID_COLUMN;

/// Marker distinguishing "value absent or unparseable" from a genuine empty
/// string. Rendered verbatim in JSON projections and CSV snapshots.
pub const NOT_AVAILABLE: &str = "Not Available";

/// One cell of an employee record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    NotAvailable,
}

impl FieldValue {
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// One fully-constructed generation of the dataset: column names, typed
/// rows, and an index from the raw stored key to its row.
///
/// Keys are stored exactly as they appear in the source (trimmed, never
/// zero-padded); leading-zero tolerance lives in the query-time candidate
/// set, not here.
#[derive(Debug)]
pub struct EmployeeTable {
    columns: Vec<String>,
    rows: Vec<Vec<FieldValue>>,
    by_id: HashMap<String, usize>,
    key_col: usize,
}

impl EmployeeTable {
    /// Build a table and its key index. Rows with a missing or empty key
    /// cell are dropped; on duplicate keys the first row wins. Both are
    /// logged, neither aborts construction.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<FieldValue>>) -> Result<Self> {
        let key_col = match columns.iter().position(|c| c == ID_COLUMN) {
            Some(i) => i,
            None => bail!("table has no `{}` column", ID_COLUMN),
        };

        let mut kept: Vec<Vec<FieldValue>> = Vec::with_capacity(rows.len());
        let mut by_id: HashMap<String, usize> = HashMap::with_capacity(rows.len());

        for row in rows {
            let key = match row.get(key_col).and_then(FieldValue::as_text) {
                Some(k) if !k.trim().is_empty() => k.trim().to_string(),
                _ => {
                    warn!("dropping row without employee id");
                    continue;
                }
            };
            if let Some(&existing) = by_id.get(&key) {
                warn!(key = %key, row = existing, "duplicate employee id, keeping first row");
                continue;
            }
            by_id.insert(key, kept.len());
            kept.push(row);
        }

        Ok(EmployeeTable {
            columns,
            rows: kept,
            by_id,
            key_col,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<FieldValue>] {
        &self.rows
    }

    /// Row index for an exact stored key.
    pub fn get(&self, key: &str) -> Option<usize> {
        self.by_id.get(key).copied()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.by_id.contains_key(key)
    }

    /// The stored key of a row.
    pub fn key_of(&self, row: usize) -> &str {
        self.rows[row][self.key_col]
            .as_text()
            .expect("indexed rows always carry a text key")
    }

    /// Named field of a row, if the column exists.
    pub fn field(&self, row: usize, column: &str) -> Option<&FieldValue> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows[row].get(idx)
    }

    /// (column, value) pairs of one row, in column order.
    pub fn record(&self, row: usize) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.columns
            .iter()
            .map(|c| c.as_str())
            .zip(self.rows[row].iter())
    }
}
