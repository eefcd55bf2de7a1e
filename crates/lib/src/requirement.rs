//! Dependency specifier parsing.
//!
//! A manifest dependency entry is a full specifier string such as
//! `requests[security]>=2.28; python_version >= "3.8"`. For merge purposes
//! only the package name matters, normalized the way package indexes do it:
//! lowercase, with runs of `-`, `_`, and `.` collapsed to a single `-`.
//! Everything after the name (extras, constraints, markers) is opaque
//! payload and travels with the original text.

use thiserror::Error;

/// The specifier did not start with a package name.
#[derive(Debug, Error)]
#[error("invalid dependency specifier {spec:?}")]
pub struct RequirementError {
  pub spec: String,
}

/// One parsed dependency entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
  name: String,
  spec: String,
}

impl Requirement {
  /// Parse a specifier string.
  ///
  /// The name is the leading run of alphanumerics, `.`, `_`, and `-`; it
  /// must start with an alphanumeric. Whatever follows is not validated.
  pub fn parse(spec: &str) -> Result<Self, RequirementError> {
    let trimmed = spec.trim_start();
    if !trimmed.starts_with(|c: char| c.is_ascii_alphanumeric()) {
      return Err(RequirementError {
        spec: spec.to_string(),
      });
    }
    let raw_name: String = trimmed
      .chars()
      .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
      .collect();

    Ok(Self {
      name: canonical_name(&raw_name),
      spec: spec.to_string(),
    })
  }

  /// Canonical package name; the merge identity.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// The original specifier text, untouched.
  pub fn spec(&self) -> &str {
    &self.spec
  }
}

/// Normalize a package name: lowercase, `-`/`_`/`.` runs become `-`.
pub fn canonical_name(raw: &str) -> String {
  let mut out = String::with_capacity(raw.len());
  let mut pending_sep = false;
  for c in raw.chars() {
    if matches!(c, '-' | '_' | '.') {
      pending_sep = true;
      continue;
    }
    if pending_sep && !out.is_empty() {
      out.push('-');
    }
    pending_sep = false;
    out.push(c.to_ascii_lowercase());
  }
  out
}
