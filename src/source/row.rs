//! Positional result rows.

use crate::source::SourceError;

/// A single column value as returned by the data source.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Widen to `f64`. Text is parsed, `NULL` has no numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Null => None,
            Self::Int(v) => Some(*v as f64),
            Self::UInt(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Render as text. Numbers are formatted, `NULL` has no text value.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Int(v) => Some(v.to_string()),
            Self::UInt(v) => Some(v.to_string()),
            Self::Float(v) => Some(v.to_string()),
            Self::Text(s) => Some(s.clone()),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// One result row with columns addressed by position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<Value>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.columns.get(index)
    }

    /// Read column `index` widened to `f64`.
    ///
    /// # Errors
    /// Returns `SourceError::Scan` if the column is missing, `NULL`, or not numeric.
    pub fn f64(&self, index: usize) -> Result<f64, SourceError> {
        let value = self.column(index)?;
        value.as_f64().ok_or_else(|| SourceError::Scan {
            index,
            reason: format!("cannot convert {value:?} to a number"),
        })
    }

    /// Read column `index` as text.
    ///
    /// # Errors
    /// Returns `SourceError::Scan` if the column is missing or `NULL`.
    pub fn text(&self, index: usize) -> Result<String, SourceError> {
        self.column(index)?
            .as_text()
            .ok_or_else(|| SourceError::Scan {
                index,
                reason: "unexpected NULL".to_string(),
            })
    }

    fn column(&self, index: usize) -> Result<&Value, SourceError> {
        self.columns.get(index).ok_or_else(|| SourceError::Scan {
            index,
            reason: format!("row has only {} columns", self.columns.len()),
        })
    }
}

impl From<Vec<Value>> for Row {
    fn from(columns: Vec<Value>) -> Self {
        Self::new(columns)
    }
}
