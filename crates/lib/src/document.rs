//! Ordered document tree for manifest files.
//!
//! A [`Document`] models the nested-table configuration format the manifest
//! is written in: ordered key/value maps, arrays, and nested tables. Key
//! order is the order of first insertion (for parsed documents, document
//! order) and is preserved through merge and render.
//!
//! Nested tables live in an arena indexed by [`TableId`], so every table has
//! an explicit identity. The renderer uses those identities for ancestor
//! tracking, and tests can build pathological self-referencing documents
//! that an owned tree could not express.

use thiserror::Error;

/// Identity of a table within one [`Document`].
///
/// Ids are only meaningful for the document that allocated them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableId(usize);

/// A single manifest value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  String(String),
  Integer(i64),
  Float(f64),
  Boolean(bool),
  /// Date-time values are carried as their source text; the tool never
  /// interprets them.
  Datetime(String),
  Array(Vec<Value>),
  Table(TableId),
}

impl Value {
  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_array(&self) -> Option<&[Value]> {
    match self {
      Value::Array(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_table(&self) -> Option<TableId> {
    match self {
      Value::Table(id) => Some(*id),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct TableData {
  entries: Vec<(String, Value)>,
}

/// Malformed manifest text.
#[derive(Debug, Error)]
#[error("invalid manifest text: {0}")]
pub struct ParseError(#[from] toml::de::Error);

/// An ordered tree of tables, arrays, and scalars.
///
/// Each load produces an independent instance; ids never cross documents
/// (use [`Document::import_value`] to copy values between documents).
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
  tables: Vec<TableData>,
}

impl Document {
  /// Create an empty document (a root table with no entries).
  pub fn new() -> Self {
    Self {
      tables: vec![TableData::default()],
    }
  }

  /// Parse manifest text into a document.
  ///
  /// Table ids are allocated depth-first in entry order, so two parses of
  /// the same text produce structurally equal documents.
  pub fn parse(text: &str) -> Result<Self, ParseError> {
    let table: toml::Table = text.parse()?;
    let mut doc = Self::new();
    let root = doc.root();
    doc.lower_table(root, table);
    Ok(doc)
  }

  pub fn root(&self) -> TableId {
    TableId(0)
  }

  /// Allocate a new empty table and return its id.
  pub fn add_table(&mut self) -> TableId {
    self.tables.push(TableData::default());
    TableId(self.tables.len() - 1)
  }

  /// Insert a key into a table, replacing the value if the key exists.
  pub fn insert(&mut self, table: TableId, key: impl Into<String>, value: Value) {
    let key = key.into();
    let data = &mut self.tables[table.0];
    match data.entries.iter_mut().find(|(k, _)| *k == key) {
      Some(slot) => slot.1 = value,
      None => data.entries.push((key, value)),
    }
  }

  pub fn get(&self, table: TableId, key: &str) -> Option<&Value> {
    self
      .tables
      .get(table.0)?
      .entries
      .iter()
      .find(|(k, _)| k.as_str() == key)
      .map(|(_, v)| v)
  }

  /// Entries of a table in declaration order.
  pub fn entries(&self, table: TableId) -> impl Iterator<Item = (&str, &Value)> {
    self
      .tables
      .get(table.0)
      .into_iter()
      .flat_map(|t| t.entries.iter().map(|(k, v)| (k.as_str(), v)))
  }

  /// Look up a value by key chain from the root.
  ///
  /// Returns `None` when any link of the chain is missing or is not a
  /// table; a failed lookup is not an error.
  pub fn get_path(&self, path: &[&str]) -> Option<&Value> {
    let (last, parents) = path.split_last()?;
    let table = self.resolve_table(parents)?;
    self.get(table, last)
  }

  /// Mutable variant of [`Document::get_path`].
  pub fn get_path_mut(&mut self, path: &[&str]) -> Option<&mut Value> {
    let (last, parents) = path.split_last()?;
    let table = self.resolve_table(parents)?;
    self
      .tables
      .get_mut(table.0)?
      .entries
      .iter_mut()
      .find(|(k, _)| k.as_str() == *last)
      .map(|(_, v)| v)
  }

  fn resolve_table(&self, path: &[&str]) -> Option<TableId> {
    let mut table = self.root();
    for key in path {
      table = self.get(table, key)?.as_table()?;
    }
    Some(table)
  }

  /// Structural equality of two values, resolving table ids in their
  /// respective documents. Key order is significant.
  pub fn value_eq(&self, a: &Value, other: &Document, b: &Value) -> bool {
    match (a, b) {
      (Value::Table(x), Value::Table(y)) => {
        let mut xs = self.entries(*x);
        let mut ys = other.entries(*y);
        loop {
          match (xs.next(), ys.next()) {
            (None, None) => return true,
            (Some((ka, va)), Some((kb, vb))) if ka == kb => {
              if !self.value_eq(va, other, vb) {
                return false;
              }
            }
            _ => return false,
          }
        }
      }
      (Value::Array(xs), Value::Array(ys)) => {
        xs.len() == ys.len()
          && xs
            .iter()
            .zip(ys.iter())
            .all(|(va, vb)| self.value_eq(va, other, vb))
      }
      (Value::String(x), Value::String(y)) => x == y,
      (Value::Integer(x), Value::Integer(y)) => x == y,
      (Value::Float(x), Value::Float(y)) => x == y,
      (Value::Boolean(x), Value::Boolean(y)) => x == y,
      (Value::Datetime(x), Value::Datetime(y)) => x == y,
      _ => false,
    }
  }

  /// Deep-copy a value from another document into this one, allocating
  /// fresh table ids for any nested tables. The source must be acyclic.
  pub fn import_value(&mut self, src: &Document, value: &Value) -> Value {
    match value {
      Value::Table(id) => {
        let copied: Vec<(String, Value)> = src
          .tables
          .get(id.0)
          .map(|t| t.entries.clone())
          .unwrap_or_default();
        let new_id = self.add_table();
        for (key, v) in copied {
          let imported = self.import_value(src, &v);
          self.insert(new_id, key, imported);
        }
        Value::Table(new_id)
      }
      Value::Array(items) => Value::Array(items.iter().map(|v| self.import_value(src, v)).collect()),
      other => other.clone(),
    }
  }

  fn lower_table(&mut self, id: TableId, src: toml::Table) {
    for (key, value) in src {
      let lowered = self.lower_value(value);
      self.insert(id, key, lowered);
    }
  }

  fn lower_value(&mut self, value: toml::Value) -> Value {
    match value {
      toml::Value::String(s) => Value::String(s),
      toml::Value::Integer(i) => Value::Integer(i),
      toml::Value::Float(f) => Value::Float(f),
      toml::Value::Boolean(b) => Value::Boolean(b),
      toml::Value::Datetime(d) => Value::Datetime(d.to_string()),
      toml::Value::Array(items) => {
        Value::Array(items.into_iter().map(|v| self.lower_value(v)).collect())
      }
      toml::Value::Table(t) => {
        let id = self.add_table();
        self.lower_table(id, t);
        Value::Table(id)
      }
    }
  }
}

impl Default for Document {
  fn default() -> Self {
    Self::new()
  }
}
