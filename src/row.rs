//! Typed row model for stage output.
//!
//! Every stage emits rows with a fixed, statically declared schema: an
//! ordered list of named, typed fields. Cell count and cell kinds are
//! checked once, when the row is built, so downstream consumers can read
//! cells by field name instead of guessing at positional indexes.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// The kind of value a cell can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Text,
    Int,
    Bool,
    TextList,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Text => "text",
            Kind::Int => "int",
            Kind::Bool => "bool",
            Kind::TextList => "text list",
        };
        write!(f, "{}", name)
    }
}

/// A single cell value.
///
/// Booleans render as `"true"`/`"false"` text and lists as comma-joined
/// text, matching the wire representation downstream engines expect.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Int(i64),
    Bool(bool),
    TextList(Vec<String>),
}

impl Value {
    /// The kind of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Text(_) => Kind::Text,
            Value::Int(_) => Kind::Int,
            Value::Bool(_) => Kind::Bool,
            Value::TextList(_) => Kind::TextList,
        }
    }

    /// Borrow the text content, if this is a text cell.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The integer content, if this is an int cell.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The boolean content, if this is a bool cell.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow the list content, if this is a text-list cell.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::TextList(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::TextList(items) => write!(f, "{}", items.join(",")),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::TextList(items)
    }
}

/// A named, typed field in a stage schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
}

impl Field {
    pub const fn new(name: &'static str, kind: Kind) -> Self {
        Self { name, kind }
    }
}

/// The fixed, ordered schema of one stage's rows.
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    fields: &'static [Field],
}

impl Schema {
    pub const fn new(fields: &'static [Field]) -> Self {
        Self { fields }
    }

    /// The fields, in emission order.
    pub fn fields(&self) -> &'static [Field] {
        self.fields
    }

    /// The ordered field names (the stage's header row).
    pub fn names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.name).collect()
    }

    /// Number of cells in each row.
    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// Build a row from cells, validating arity and cell kinds.
    ///
    /// The row is stamped with the current time as its emission timestamp.
    pub fn row(&'static self, cells: Vec<Value>) -> Result<Row, SchemaError> {
        if cells.len() != self.fields.len() {
            return Err(SchemaError::Arity {
                expected: self.fields.len(),
                got: cells.len(),
            });
        }

        for (field, cell) in self.fields.iter().zip(&cells) {
            if cell.kind() != field.kind {
                return Err(SchemaError::KindMismatch {
                    field: field.name,
                    expected: field.kind,
                    got: cell.kind(),
                });
            }
        }

        Ok(Row {
            schema: self,
            cells,
            emitted_at: Utc::now(),
        })
    }
}

/// A row violated its stage schema at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("row has {got} cells, schema expects {expected}")]
    Arity { expected: usize, got: usize },

    #[error("field '{field}' expects a {expected} cell, got {got}")]
    KindMismatch {
        field: &'static str,
        expected: Kind,
        got: Kind,
    },
}

/// One emitted row: schema-checked cells plus an emission timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    schema: &'static Schema,
    cells: Vec<Value>,
    emitted_at: DateTime<Utc>,
}

impl Row {
    /// The schema this row was built against.
    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// All cells, in schema order.
    pub fn cells(&self) -> &[Value] {
        &self.cells
    }

    /// Look up a cell by field name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema
            .fields
            .iter()
            .position(|f| f.name == name)
            .map(|i| &self.cells[i])
    }

    /// When this row was emitted.
    pub fn emitted_at(&self) -> DateTime<Utc> {
        self.emitted_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static PAIR: Schema = Schema::new(&[
        Field::new("name", Kind::Text),
        Field::new("count", Kind::Int),
    ]);

    #[test]
    fn test_row_by_name() {
        let row = PAIR.row(vec!["alice".into(), Value::Int(3)]).unwrap();
        assert_eq!(row.get("name").and_then(Value::as_text), Some("alice"));
        assert_eq!(row.get("count").and_then(Value::as_int), Some(3));
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn test_arity_checked() {
        let result = PAIR.row(vec!["alice".into()]);
        assert_eq!(result.unwrap_err(), SchemaError::Arity { expected: 2, got: 1 });
    }

    #[test]
    fn test_kind_checked() {
        let result = PAIR.row(vec!["alice".into(), "three".into()]);
        assert!(matches!(
            result,
            Err(SchemaError::KindMismatch { field: "count", .. })
        ));
    }

    #[test]
    fn test_bool_renders_as_text() {
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Bool(false).to_string(), "false");
    }

    #[test]
    fn test_list_renders_joined() {
        let v = Value::TextList(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(v.to_string(), "a,b");
    }
}
