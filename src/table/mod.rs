//! Named-column tabular data shared by every pipeline stage.

pub mod csv;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use csv::read_csv;

/// Input that could not be interpreted as a table.
#[derive(Debug, Error, PartialEq)]
pub enum SchemaMismatchError {
    #[error("input is empty; expected a header line")]
    Empty,

    #[error("column {index} has an empty name")]
    EmptyColumnName { index: usize },

    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("line {line}: expected {expected} fields, found {found}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: unterminated quoted field")]
    UnterminatedQuote { line: usize },

    #[error("column '{column}' has {found} values but the table has {expected} rows")]
    ColumnLength {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("record {index} has fields {found:?}, expected {expected:?}")]
    InconsistentRecord {
        index: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Numeric view of the cell. Text never coerces.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => Some(*v),
            Cell::Text(_) => None,
        }
    }

    /// Classify a raw field: integer, then float, then text. Empty is NaN.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Float(f64::NAN);
        }
        if let Ok(v) = trimmed.parse::<i64>() {
            return Cell::Int(v);
        }
        if let Ok(v) = trimmed.parse::<f64>() {
            return Cell::Float(v);
        }
        Cell::Text(raw.to_string())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Float(v) if v.is_nan() => f.write_str("nan"),
            // Integral floats keep a trailing ".0" so 1.0 and 1 stay distinguishable.
            Cell::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 => {
                write!(f, "{v:.1}")
            }
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// A manually entered row: field name to numeric value, in entry order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputRecord {
    fields: Vec<(String, f64)>,
}

impl InputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing an earlier value with the same name.
    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        let name = name.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| *value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Result<Self, SchemaMismatchError> {
        for (index, name) in columns.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(SchemaMismatchError::EmptyColumnName { index });
            }
            if columns[..index].contains(name) {
                return Err(SchemaMismatchError::DuplicateColumn(name.clone()));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    /// Build a table from manually entered records sharing one field list.
    pub fn from_records(records: &[InputRecord]) -> Result<Self, SchemaMismatchError> {
        let Some(first) = records.first() else {
            return Ok(Self {
                columns: Vec::new(),
                rows: Vec::new(),
            });
        };

        let columns: Vec<String> = first.names().map(str::to_string).collect();
        let mut table = Self::new(columns)?;
        for (index, record) in records.iter().enumerate() {
            let found: Vec<String> = record.names().map(str::to_string).collect();
            if found != table.columns {
                return Err(SchemaMismatchError::InconsistentRecord {
                    index,
                    expected: table.columns.clone(),
                    found,
                });
            }
            let row = record.fields.iter().map(|(_, v)| Cell::Float(*v)).collect();
            table.rows.push(row);
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), SchemaMismatchError> {
        if row.len() != self.columns.len() {
            return Err(SchemaMismatchError::RaggedRow {
                line: self.rows.len() + 2,
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Append a column at the right edge.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        cells: Vec<Cell>,
    ) -> Result<(), SchemaMismatchError> {
        let name = name.into();
        if self.columns.contains(&name) {
            return Err(SchemaMismatchError::DuplicateColumn(name));
        }
        // A header-only table takes its row count from the first column.
        if self.columns.is_empty() && self.rows.is_empty() {
            self.rows = cells.into_iter().map(|cell| vec![cell]).collect();
            self.columns.push(name);
            return Ok(());
        }
        if cells.len() != self.rows.len() {
            return Err(SchemaMismatchError::ColumnLength {
                column: name,
                expected: self.rows.len(),
                found: cells.len(),
            });
        }
        for (row, cell) in self.rows.iter_mut().zip(cells) {
            row.push(cell);
        }
        self.columns.push(name);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// First `n` rows, for previews.
    pub fn head(&self, n: usize) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Replace NaN cells in column `idx`; returns how many were replaced.
    pub(crate) fn replace_nan(&mut self, idx: usize, with: &Cell) -> usize {
        let mut replaced = 0;
        for row in &mut self.rows {
            if matches!(row[idx], Cell::Float(v) if v.is_nan()) {
                row[idx] = with.clone();
                replaced += 1;
            }
        }
        replaced
    }

    /// Rebuild the table with columns in `order` (indices into the current columns).
    pub(crate) fn reorder(&self, order: &[usize]) -> Table {
        Table {
            columns: order.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| order.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }
}
