/// Query Values Module
///
/// This module provides the immutable `Query` value used by transactions and
/// the caller-owned `Rows` cursor returned by query execution.

pub use rusqlite::types::Value;
use std::collections::VecDeque;

/// A statement and its positional arguments.
///
/// Arguments are bound to the text by the driver in order; nothing here
/// inspects or validates them.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    text: String,
    args: Vec<Value>,
}

impl Query {
    /// Creates a query from its text and positional arguments
    pub fn new<I, V>(text: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Query {
            text: text.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a query that takes no arguments
    pub fn text_only(text: impl Into<String>) -> Self {
        Query {
            text: text.into(),
            args: Vec::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

/// A single result row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Row { values }
    }

    /// Returns the value in column `idx`, if present
    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Result cursor handed back to the caller of a query.
///
/// The caller owns it; iterating consumes rows and dropping it releases
/// whatever is left. All rows are fetched before the cursor is returned, so
/// it does not stream: large result sets are held in memory in full.
#[derive(Debug, Default)]
pub struct Rows {
    columns: Vec<String>,
    rows: VecDeque<Row>,
}

impl Rows {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Rows {
            columns,
            rows: rows.into(),
        }
    }

    /// Cursor with no columns and no rows, as produced by statements that
    /// return nothing
    pub fn empty() -> Self {
        Rows::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows not yet consumed
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl Iterator for Rows {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.rows.len(), Some(self.rows.len()))
    }
}

/// Formats a value for display
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(t) => t.clone(),
        Value::Blob(b) => format!("<BLOB: {} bytes>", b.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_keeps_text_and_args_in_order() {
        let query = Query::new("INSERT INTO t VALUES ($1, $2)", [Value::Integer(42), Value::Text("x".into())]);
        assert_eq!(query.text(), "INSERT INTO t VALUES ($1, $2)");
        assert_eq!(query.args(), &[Value::Integer(42), Value::Text("x".into())]);
    }

    #[test]
    fn test_query_converts_arguments() {
        let query = Query::new("SELECT ?1, ?2", vec![7i64, 8i64]);
        assert_eq!(query.args(), &[Value::Integer(7), Value::Integer(8)]);

        let bare = Query::text_only("SELECT 1");
        assert!(bare.args().is_empty());
    }

    #[test]
    fn test_rows_cursor_yields_rows_in_order() {
        let mut rows = Rows::new(
            vec!["id".to_string()],
            vec![Row::new(vec![Value::Integer(1)]), Row::new(vec![Value::Integer(2)])],
        );
        assert_eq!(rows.columns(), &["id".to_string()]);
        assert_eq!(rows.remaining(), 2);
        assert_eq!(rows.next().unwrap().get(0), Some(&Value::Integer(1)));
        assert_eq!(rows.next().unwrap().get(0), Some(&Value::Integer(2)));
        assert!(rows.next().is_none());
        assert!(Rows::empty().next().is_none());
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&Value::Null), "NULL");
        assert_eq!(format_value(&Value::Integer(42)), "42");
        assert_eq!(format_value(&Value::Real(1.5)), "1.5");
        assert_eq!(format_value(&Value::Text("hi".into())), "hi");
        assert_eq!(format_value(&Value::Blob(vec![1, 2, 3])), "<BLOB: 3 bytes>");
    }
}
