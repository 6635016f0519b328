//! Tabular listing records
//!
//! A [`RecordSet`] is an ordered header plus rows of untyped [`Value`]s. It is
//! the hand-off format between the record store, the cleaner, the encoder and
//! batch inference.

use crate::errors::RecordError;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashSet};

/// One untyped cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Number(f64),
}

impl Value {
    /// Build a text cell
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    /// Null, blank text, or a non-finite number.
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.trim().is_empty(),
            Value::Number(n) => !n.is_finite(),
        }
    }

    /// Numeric coercion: finite numbers pass through, text is trimmed and parsed.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            Value::Null => return None,
            Value::Number(n) => *n,
            Value::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        n.is_finite().then_some(n)
    }

    /// Categorical view of the cell, `None` when missing.
    pub fn as_category(&self) -> Option<Cow<'_, str>> {
        if self.is_missing() {
            return None;
        }
        match self {
            Value::Text(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Null => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<Option<f64>> for Value {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Value::Null, Value::Number)
    }
}

/// A single row keyed by column name.
pub type Record = BTreeMap<String, Value>;

/// Ordered header plus rows; every row has exactly one value per column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RecordSet {
    /// Create an empty record set with the given header
    pub fn new<I, S>(columns: I) -> Result<Self, RecordError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(RecordError::DuplicateColumn(column.clone()));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Append a row
    pub fn push(&mut self, row: Vec<Value>) -> Result<(), RecordError> {
        if row.len() != self.columns.len() {
            return Err(RecordError::WidthMismatch {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at `(row, column)`, `None` if either is out of range
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Row `idx` as a name-keyed record
    pub fn record(&self, idx: usize) -> Option<Record> {
        let row = self.rows.get(idx)?;
        Some(
            self.columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect(),
        )
    }

    /// Set a column to the given values, appending it if absent.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), RecordError> {
        if values.len() != self.rows.len() {
            return Err(RecordError::WidthMismatch {
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    /// Keep only the columns for which `keep` returns true.
    pub(crate) fn retain_columns<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        let mask: Vec<bool> = self.columns.iter().map(|c| keep(c)).collect();
        if mask.iter().all(|&k| k) {
            return;
        }
        let mut idx = 0;
        self.columns.retain(|_| {
            idx += 1;
            mask[idx - 1]
        });
        for row in &mut self.rows {
            let mut idx = 0;
            row.retain(|_| {
                idx += 1;
                mask[idx - 1]
            });
        }
    }

    /// Keep only the rows for which `keep` returns true.
    pub(crate) fn retain_rows<F>(&mut self, keep: F)
    where
        F: FnMut(&Vec<Value>) -> bool,
    {
        self.rows.retain(keep);
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Vec<Value>] {
        &mut self.rows
    }
}
