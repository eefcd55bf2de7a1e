//! Deterministic manifest rendering.
//!
//! The stock serializer for the manifest format groups all sibling sections
//! together and defers nested tables to the end of the file. That produces
//! noisy diffs when a manifest is regenerated, so stencil renders documents
//! itself: sections are emitted in first-encounter order, depth-first — a
//! nested table's header and scalar body are written the moment the table is
//! first visited, before its sibling sections.
//!
//! Arrays render as bracketed blocks with one element per line and a
//! trailing separator, which keeps dependency-list diffs one-line-per-change.
//! Nested arrays are flattened into the same per-line list.

use thiserror::Error;

use crate::document::{Document, TableId, Value};

/// Default array element separator: comma, one element per line.
pub const DEFAULT_SEPARATOR: &str = ",\n";

const ARRAY_INDENT: &str = "    ";

/// Rendering failures.
#[derive(Debug, Error)]
pub enum RenderError {
  /// The array separator may only consist of whitespace and commas.
  #[error("invalid array separator {separator:?}: only whitespace and commas are allowed")]
  InvalidSeparator { separator: String },

  /// A table re-appeared as its own descendant.
  #[error("circular reference detected at {path}")]
  CircularReference { path: String },
}

/// Renders a [`Document`] to manifest text.
///
/// Output is byte-identical across calls for the same document. The text
/// stays parseable by any compliant parser for the format.
#[derive(Debug, Clone)]
pub struct Serializer {
  separator: String,
}

impl Serializer {
  /// Create a serializer with the given array element separator.
  ///
  /// A separator that is all whitespace gains a leading comma; anything
  /// containing a character other than whitespace or a comma is rejected.
  pub fn new(separator: &str) -> Result<Self, RenderError> {
    let separator = if separator.trim().is_empty() {
      format!(",{separator}")
    } else if separator.chars().all(|c| c.is_whitespace() || c == ',') {
      separator.to_string()
    } else {
      return Err(RenderError::InvalidSeparator {
        separator: separator.to_string(),
      });
    };
    Ok(Self { separator })
  }

  /// Render the whole document.
  ///
  /// On error no partial output is observable; the caller only ever sees
  /// the complete rendering.
  pub fn render(&self, doc: &Document) -> Result<String, RenderError> {
    let mut out = String::new();
    let mut ancestors = Vec::new();
    self.render_table(doc, doc.root(), "", &mut ancestors, &mut out)?;
    Ok(out)
  }

  fn render_table(
    &self,
    doc: &Document,
    id: TableId,
    prefix: &str,
    ancestors: &mut Vec<TableId>,
    out: &mut String,
  ) -> Result<(), RenderError> {
    if ancestors.contains(&id) {
      return Err(RenderError::CircularReference {
        path: display_path(prefix),
      });
    }
    ancestors.push(id);

    let mut body = String::new();
    let mut sections: Vec<(&str, TableId)> = Vec::new();
    for (key, value) in doc.entries(id) {
      match value {
        Value::Table(child) => sections.push((key, *child)),
        other => {
          let at = join_path(prefix, key);
          body.push_str(&render_key(key));
          body.push_str(" = ");
          self.render_value(doc, other, &at, ancestors, &mut body)?;
          body.push('\n');
        }
      }
    }

    if prefix.is_empty() {
      out.push_str(&body);
    } else if !body.is_empty() || sections.is_empty() {
      // A table whose only entries are nested sections needs no header of
      // its own; an entirely empty table still gets one.
      if !out.is_empty() && !out.ends_with("\n\n") {
        out.push('\n');
      }
      out.push('[');
      out.push_str(prefix);
      out.push_str("]\n");
      out.push_str(&body);
    }

    for (key, child) in sections {
      let child_prefix = join_path(prefix, key);
      self.render_table(doc, child, &child_prefix, ancestors, out)?;
    }

    ancestors.pop();
    Ok(())
  }

  fn render_value(
    &self,
    doc: &Document,
    value: &Value,
    at: &str,
    ancestors: &mut Vec<TableId>,
    out: &mut String,
  ) -> Result<(), RenderError> {
    match value {
      Value::String(s) => out.push_str(&render_string(s)),
      Value::Integer(i) => out.push_str(&i.to_string()),
      Value::Float(f) => out.push_str(&render_float(*f)),
      Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
      Value::Datetime(d) => out.push_str(d),
      Value::Array(items) => {
        out.push_str("[\n");
        self.render_array_items(doc, items, at, ancestors, out)?;
        out.push(']');
      }
      Value::Table(id) => self.render_inline_table(doc, *id, at, ancestors, out)?,
    }
    Ok(())
  }

  /// One element per line regardless of nesting depth: arrays-of-arrays are
  /// flattened into a single sequential list in document order.
  fn render_array_items(
    &self,
    doc: &Document,
    items: &[Value],
    at: &str,
    ancestors: &mut Vec<TableId>,
    out: &mut String,
  ) -> Result<(), RenderError> {
    for item in items {
      match item {
        Value::Array(nested) => self.render_array_items(doc, nested, at, ancestors, out)?,
        other => {
          out.push_str(ARRAY_INDENT);
          self.render_value(doc, other, at, ancestors, out)?;
          out.push_str(&self.separator);
        }
      }
    }
    Ok(())
  }

  fn render_inline_table(
    &self,
    doc: &Document,
    id: TableId,
    at: &str,
    ancestors: &mut Vec<TableId>,
    out: &mut String,
  ) -> Result<(), RenderError> {
    if ancestors.contains(&id) {
      return Err(RenderError::CircularReference {
        path: display_path(at),
      });
    }
    ancestors.push(id);

    out.push('{');
    for (i, (key, value)) in doc.entries(id).enumerate() {
      out.push_str(if i == 0 { " " } else { ", " });
      out.push_str(&render_key(key));
      out.push_str(" = ");
      self.render_value(doc, value, at, ancestors, out)?;
    }
    if out.ends_with('{') {
      out.push('}');
    } else {
      out.push_str(" }");
    }

    ancestors.pop();
    Ok(())
  }
}

impl Default for Serializer {
  fn default() -> Self {
    Self::new(DEFAULT_SEPARATOR).expect("default separator is valid")
  }
}

fn join_path(prefix: &str, key: &str) -> String {
  let key = render_key(key);
  if prefix.is_empty() {
    key
  } else {
    format!("{prefix}.{key}")
  }
}

fn display_path(path: &str) -> String {
  if path.is_empty() {
    "the document root".to_string()
  } else {
    format!("[{path}]")
  }
}

fn render_key(key: &str) -> String {
  let bare = !key.is_empty()
    && key
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
  if bare { key.to_string() } else { render_string(key) }
}

fn render_string(s: &str) -> String {
  let mut out = String::with_capacity(s.len() + 2);
  out.push('"');
  for c in s.chars() {
    match c {
      '"' => out.push_str("\\\""),
      '\\' => out.push_str("\\\\"),
      '\n' => out.push_str("\\n"),
      '\t' => out.push_str("\\t"),
      '\r' => out.push_str("\\r"),
      '\u{8}' => out.push_str("\\b"),
      '\u{c}' => out.push_str("\\f"),
      c if (c as u32) < 0x20 || c == '\u{7f}' => {
        out.push_str(&format!("\\u{:04X}", c as u32));
      }
      c => out.push(c),
    }
  }
  out.push('"');
  out
}

/// Floats must stay floats on re-parse, so bare integral values get a
/// trailing `.0`.
fn render_float(f: f64) -> String {
  if f.is_nan() {
    return "nan".to_string();
  }
  if f.is_infinite() {
    return if f < 0.0 { "-inf" } else { "inf" }.to_string();
  }
  let s = f.to_string();
  if s.contains('.') || s.contains('e') || s.contains('E') {
    s
  } else {
    format!("{s}.0")
  }
}
