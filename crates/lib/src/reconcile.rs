//! Manifest reconciliation.
//!
//! Regenerating a project from its template rewrites the manifest, which
//! would clobber every hand edit the developer made since the last run.
//! [`reconcile`] takes the manifest as it was before regeneration (OLD) and
//! the freshly generated one (NEW) and restores the edits worth keeping:
//!
//! - dependency lists are merged by canonical package name: entries the
//!   developer removed stay removed, entries the developer added come back;
//! - console-script declarations are restored from OLD wholesale.
//!
//! The merge is a pure transform: neither input document is mutated, and
//! the returned change count tells the caller whether persisting the result
//! is worthwhile.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::debug;

use crate::document::{Document, Value};
use crate::requirement::{Requirement, RequirementError};

/// Dependency-list fields merged by canonical package name.
pub const DEPENDENCY_FIELDS: &[&[&str]] = &[
  &["project", "dependencies"],
  &["project", "optional-dependencies", "dev"],
  &["project", "optional-dependencies", "docs"],
];

/// Console-script fields restored from OLD wholesale. Two locations carry
/// the same logical concept, depending on template version.
pub const SCRIPT_FIELDS: &[&[&str]] = &[
  &["xsetup", "entry_points", "console_scripts"],
  &["xsetup", "console_scripts"],
];

/// Reconciliation failures.
///
/// A missing field path is not an error (the field simply does not apply to
/// this template version); a dependency entry that does not parse is.
#[derive(Debug, Error)]
pub enum ReconcileError {
  #[error("field {field}: {source}")]
  InvalidRequirement {
    field: String,
    source: RequirementError,
  },
}

/// Result of a reconciliation: the merged document and how many dependency
/// entries were restored or rewritten.
#[derive(Debug, Clone)]
pub struct Merge {
  pub document: Document,
  pub changes: usize,
}

/// Merge OLD's surviving edits into a copy of NEW.
///
/// Script-entry restoration deliberately does not count toward `changes`;
/// only dependency work does.
pub fn reconcile(old: &Document, new: &Document) -> Result<Merge, ReconcileError> {
  let mut merged = new.clone();
  let mut changes = 0;

  for path in DEPENDENCY_FIELDS {
    changes += merge_dependency_field(old, &mut merged, path)?;
  }
  for path in SCRIPT_FIELDS {
    restore_script_field(old, &mut merged, path);
  }

  Ok(Merge {
    document: merged,
    changes,
  })
}

/// Merge one dependency list.
///
/// A package present in NEW but missing from OLD was removed by the
/// developer: when that happens the whole list is replaced by the surviving
/// NEW entries (each counted). A package present in OLD but missing from
/// NEW was added by the developer and is appended in OLD's order.
///
/// The replace-then-append shape means canonical-name collisions (same
/// package with different extras or markers) collapse to one entry; that
/// matches the historical behavior and is kept as-is.
fn merge_dependency_field(
  old: &Document,
  merged: &mut Document,
  path: &[&str],
) -> Result<usize, ReconcileError> {
  let Some(old_specs) = dependency_list(old, path) else {
    return Ok(0);
  };
  let Some(new_specs) = dependency_list(merged, path) else {
    return Ok(0);
  };

  let old_reqs = parse_list(&old_specs, path)?;
  let new_reqs = parse_list(&new_specs, path)?;

  let old_names: BTreeSet<&str> = old_reqs.iter().map(|r| r.name()).collect();
  let new_names: BTreeSet<&str> = new_reqs.iter().map(|r| r.name()).collect();

  let keep: Vec<&Requirement> = new_reqs
    .iter()
    .filter(|r| old_names.contains(r.name()))
    .collect();

  // The keep-filter dropping anything rewrites the field even when keep is
  // empty and contributes nothing to the change count.
  let filtered = keep.len() != new_reqs.len();
  let mut changes = 0;
  let mut result: Vec<String> = if filtered {
    changes += keep.len();
    keep.iter().map(|r| r.spec().to_string()).collect()
  } else {
    new_reqs.iter().map(|r| r.spec().to_string()).collect()
  };

  let mut appended = false;
  for req in &old_reqs {
    if !new_names.contains(req.name()) {
      result.push(req.spec().to_string());
      changes += 1;
      appended = true;
    }
  }

  if filtered || appended {
    if let Some(slot) = merged.get_path_mut(path) {
      *slot = Value::Array(result.into_iter().map(Value::String).collect());
    }
    debug!(field = %path.join("."), changes, "merged dependency field");
  }

  Ok(changes)
}

/// Restore a console-script field from OLD when both documents carry it
/// and the values differ. Replacement is wholesale; the entries are never
/// merged element by element.
fn restore_script_field(old: &Document, merged: &mut Document, path: &[&str]) {
  let (Some(old_value), Some(new_value)) = (old.get_path(path), merged.get_path(path)) else {
    return;
  };
  if merged.value_eq(new_value, old, old_value) {
    return;
  }

  let restored = merged.import_value(old, old_value);
  if let Some(slot) = merged.get_path_mut(path) {
    *slot = restored;
  }
  debug!(field = %path.join("."), "restored script entries");
}

/// Read a field as a list of specifier strings.
///
/// `None` when the field is absent, is not an array, or holds non-string
/// elements; such a field does not participate in the merge.
fn dependency_list(doc: &Document, path: &[&str]) -> Option<Vec<String>> {
  doc
    .get_path(path)?
    .as_array()?
    .iter()
    .map(|v| v.as_str().map(str::to_string))
    .collect()
}

fn parse_list(specs: &[String], path: &[&str]) -> Result<Vec<Requirement>, ReconcileError> {
  specs
    .iter()
    .map(|spec| {
      Requirement::parse(spec).map_err(|source| ReconcileError::InvalidRequirement {
        field: path.join("."),
        source,
      })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn doc(text: &str) -> Document {
    Document::parse(text).unwrap()
  }

  fn dependency_strings(doc: &Document, path: &[&str]) -> Vec<String> {
    dependency_list(doc, path).unwrap()
  }

  #[test]
  fn divergent_lists_replace_then_append() {
    let old = doc("[project]\ndependencies = [\"a==1\", \"b==2\"]\n");
    let new = doc("[project]\ndependencies = [\"a==2\", \"c==3\"]\n");

    let merge = reconcile(&old, &new).unwrap();
    assert_eq!(
      dependency_strings(&merge.document, &["project", "dependencies"]),
      vec!["a==2", "b==1"]
    );
    // One survivor counted by the replace, one appended from OLD.
    assert_eq!(merge.changes, 2);
  }

  #[test]
  fn manual_addition_is_appended() {
    let old = doc("[project]\ndependencies = [\"a==1\", \"extra>=2\"]\n");
    let new = doc("[project]\ndependencies = [\"a==1\"]\n");

    let merge = reconcile(&old, &new).unwrap();
    assert_eq!(
      dependency_strings(&merge.document, &["project", "dependencies"]),
      vec!["a==1", "extra>=2"]
    );
    assert_eq!(merge.changes, 1);
  }

  #[test]
  fn removal_by_developer_is_respected() {
    let old = doc("[project]\ndependencies = [\"a==1\"]\n");
    let new = doc("[project]\ndependencies = [\"a==1\", \"dropped==5\"]\n");

    let merge = reconcile(&old, &new).unwrap();
    assert_eq!(
      dependency_strings(&merge.document, &["project", "dependencies"]),
      vec!["a==1"]
    );
    assert_eq!(merge.changes, 1);
  }

  #[test]
  fn template_constraint_bumps_survive() {
    // Same package set, newer constraint in the template: NEW wins and no
    // change is reported.
    let old = doc("[project]\ndependencies = [\"click>=7\"]\n");
    let new = doc("[project]\ndependencies = [\"click>=8\"]\n");

    let merge = reconcile(&old, &new).unwrap();
    assert_eq!(
      dependency_strings(&merge.document, &["project", "dependencies"]),
      vec!["click>=8"]
    );
    assert_eq!(merge.changes, 0);
  }

  #[test]
  fn identity_ignores_case_and_separators() {
    let old = doc("[project]\ndependencies = [\"Flask_Login==0.6\"]\n");
    let new = doc("[project]\ndependencies = [\"flask-login==0.7\"]\n");

    let merge = reconcile(&old, &new).unwrap();
    assert_eq!(
      dependency_strings(&merge.document, &["project", "dependencies"]),
      vec!["flask-login==0.7"]
    );
    assert_eq!(merge.changes, 0);
  }

  #[test]
  fn optional_dependency_groups_merge_independently() {
    let old = doc(
      r#"
[project]
dependencies = ["a==1"]

[project.optional-dependencies]
dev = ["pytest", "mydevtool==1"]
docs = ["sphinx"]
"#,
    );
    let new = doc(
      r#"
[project]
dependencies = ["a==1"]

[project.optional-dependencies]
dev = ["pytest"]
docs = ["sphinx", "furo"]
"#,
    );

    let merge = reconcile(&old, &new).unwrap();
    assert_eq!(
      dependency_strings(&merge.document, &["project", "optional-dependencies", "dev"]),
      vec!["pytest", "mydevtool==1"]
    );
    // "furo" is new-only while old lacks it: the docs list shortens to the
    // survivors.
    assert_eq!(
      dependency_strings(&merge.document, &["project", "optional-dependencies", "docs"]),
      vec!["sphinx"]
    );
    assert_eq!(merge.changes, 1 + 1);
  }

  #[test]
  fn empty_old_list_drops_every_new_entry() {
    let old = doc("[project]\ndependencies = []\n");
    let new = doc("[project]\ndependencies = [\"a==1\"]\n");

    let merge = reconcile(&old, &new).unwrap();
    assert_eq!(
      dependency_strings(&merge.document, &["project", "dependencies"]),
      Vec::<String>::new()
    );
    // Nothing was kept and nothing appended, so no change is counted even
    // though the field was rewritten; the caller sees an in-sync manifest.
    assert_eq!(merge.changes, 0);
  }

  #[test]
  fn missing_field_is_skipped_silently() {
    let old = doc("[project]\nname = \"demo\"\n");
    let new = doc("[project]\ndependencies = [\"a==1\"]\n");

    let merge = reconcile(&old, &new).unwrap();
    assert_eq!(
      dependency_strings(&merge.document, &["project", "dependencies"]),
      vec!["a==1"]
    );
    assert_eq!(merge.changes, 0);
  }

  #[test]
  fn reconcile_with_self_is_a_no_op() {
    let text = r#"
[project]
dependencies = ["a==1", "b==2"]

[project.optional-dependencies]
dev = ["pytest"]

[xsetup]
console_scripts = ["cmd=pkg:main"]
"#;
    let old = doc(text);
    let new = doc(text);

    let merge = reconcile(&old, &new).unwrap();
    assert_eq!(merge.changes, 0);
    assert_eq!(merge.document, new);
  }

  #[test]
  fn inputs_are_not_mutated() {
    let old = doc("[project]\ndependencies = [\"a==1\", \"b==2\"]\n");
    let new = doc("[project]\ndependencies = [\"a==2\", \"c==3\"]\n");
    let old_before = old.clone();
    let new_before = new.clone();

    reconcile(&old, &new).unwrap();
    assert_eq!(old, old_before);
    assert_eq!(new, new_before);
  }

  #[test]
  fn scripts_are_restored_wholesale() {
    let old = doc("[xsetup]\nconsole_scripts = [\"cmd=pkg:main\"]\n");
    let new = doc("[xsetup]\nconsole_scripts = [\"cmd2=pkg:other\"]\n");

    let merge = reconcile(&old, &new).unwrap();
    assert_eq!(
      dependency_strings(&merge.document, &["xsetup", "console_scripts"]),
      vec!["cmd=pkg:main"]
    );
    // Script restoration never counts as a change.
    assert_eq!(merge.changes, 0);
  }

  #[test]
  fn nested_script_location_is_restored() {
    let old = doc("[xsetup.entry_points]\nconsole_scripts = [\"cmd=pkg:main\", \"aux=pkg:aux\"]\n");
    let new = doc("[xsetup.entry_points]\nconsole_scripts = [\"cmd=pkg:new\"]\n");

    let merge = reconcile(&old, &new).unwrap();
    assert_eq!(
      dependency_strings(&merge.document, &["xsetup", "entry_points", "console_scripts"]),
      vec!["cmd=pkg:main", "aux=pkg:aux"]
    );
    assert_eq!(merge.changes, 0);
  }

  #[test]
  fn script_field_present_on_one_side_is_left_alone() {
    let old = doc("[project]\nname = \"demo\"\n");
    let new = doc("[xsetup]\nconsole_scripts = [\"cmd=pkg:main\"]\n");

    let merge = reconcile(&old, &new).unwrap();
    assert_eq!(
      dependency_strings(&merge.document, &["xsetup", "console_scripts"]),
      vec!["cmd=pkg:main"]
    );
  }

  #[test]
  fn unparseable_dependency_is_an_error() {
    let old = doc("[project]\ndependencies = [\"==broken\"]\n");
    let new = doc("[project]\ndependencies = [\"a==1\"]\n");

    let err = reconcile(&old, &new).unwrap_err();
    assert!(err.to_string().contains("project.dependencies"));
  }

  #[test]
  fn non_list_dependency_field_does_not_participate() {
    let old = doc("[project]\ndependencies = \"not-a-list\"\n");
    let new = doc("[project]\ndependencies = [\"a==1\"]\n");

    let merge = reconcile(&old, &new).unwrap();
    assert_eq!(merge.changes, 0);
  }
}
