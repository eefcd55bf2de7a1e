//! Manifest loading and the reconcile-and-write flow.
//!
//! All filesystem access for the manifest lives here. Reads and writes are
//! whole-buffer operations against the same path, so other readers never
//! observe a partially written manifest.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::document::{Document, ParseError};
use crate::reconcile::{self, ReconcileError};
use crate::render::{RenderError, Serializer};

/// The manifest file name, relative to a project directory.
pub const MANIFEST_FILENAME: &str = "pyproject.toml";

/// Key chain of the marker naming the template a project was built from.
const TEMPLATE_MARKER: &[&str] = &["tool", "stencil", "template"];

/// Manifest access failures.
#[derive(Debug, Error)]
pub enum ManifestError {
  /// The project has no manifest; `provision` creates one.
  #[error("no {MANIFEST_FILENAME} found in {dir}; try 'stencil provision' first")]
  Absent { dir: PathBuf },

  /// The project already has a manifest; `update` maintains it.
  #[error("{path} already exists; try 'stencil update', or delete it first")]
  AlreadyExists { path: PathBuf },

  #[error("failed to read {path}: {source}")]
  Read { path: PathBuf, source: io::Error },

  #[error("failed to write {path}: {source}")]
  Write { path: PathBuf, source: io::Error },

  #[error("{path}: {source}")]
  Parse { path: PathBuf, source: ParseError },

  #[error(transparent)]
  Reconcile(#[from] ReconcileError),

  #[error(transparent)]
  Render(#[from] RenderError),
}

/// A manifest loaded from disk: its path plus the parsed document.
#[derive(Debug, Clone)]
pub struct Manifest {
  path: PathBuf,
  document: Document,
}

impl Manifest {
  /// Path of the manifest inside a project directory.
  pub fn path_in(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_FILENAME)
  }

  /// Load the manifest of a project directory.
  pub fn load(dir: &Path) -> Result<Self, ManifestError> {
    let path = Self::path_in(dir);
    if !path.exists() {
      return Err(ManifestError::Absent {
        dir: dir.to_path_buf(),
      });
    }
    let text = fs::read_to_string(&path).map_err(|source| ManifestError::Read {
      path: path.clone(),
      source,
    })?;
    let document = Document::parse(&text).map_err(|source| ManifestError::Parse {
      path: path.clone(),
      source,
    })?;
    Ok(Self { path, document })
  }

  /// Fail if the project already has a manifest; returns the path a new
  /// one should be written to.
  pub fn ensure_absent(dir: &Path) -> Result<PathBuf, ManifestError> {
    let path = Self::path_in(dir);
    if path.exists() {
      return Err(ManifestError::AlreadyExists { path });
    }
    Ok(path)
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn document(&self) -> &Document {
    &self.document
  }

  /// Template named by the `[tool.stencil]` marker, if any.
  pub fn template(&self) -> Option<&str> {
    self.document.get_path(TEMPLATE_MARKER)?.as_str()
  }
}

/// Reconcile the pre-regeneration manifest with the regenerated one on
/// disk, writing the merged rendering back only when something changed.
///
/// `old` is the manifest as loaded before the template engine ran;
/// `project_dir` holds the freshly regenerated file at the same path.
/// Skipping the write when nothing changed keeps any comments the
/// developer left in the file.
pub fn sync(old: &Manifest, project_dir: &Path) -> Result<usize, ManifestError> {
  let new = Manifest::load(project_dir)?;
  let merge = reconcile::reconcile(old.document(), new.document())?;

  if merge.changes > 0 {
    let text = Serializer::default().render(&merge.document)?;
    fs::write(&new.path, text).map_err(|source| ManifestError::Write {
      path: new.path.clone(),
      source,
    })?;
    info!(path = %new.path.display(), changes = merge.changes, "manifest reconciled");
  } else {
    debug!(path = %new.path.display(), "manifest already in sync");
  }

  Ok(merge.changes)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn write_manifest(dir: &Path, text: &str) {
    fs::write(Manifest::path_in(dir), text).unwrap();
  }

  #[test]
  fn load_missing_manifest_is_absent() {
    let temp = TempDir::new().unwrap();
    assert!(matches!(
      Manifest::load(temp.path()),
      Err(ManifestError::Absent { .. })
    ));
  }

  #[test]
  fn load_malformed_manifest_is_a_parse_error() {
    let temp = TempDir::new().unwrap();
    write_manifest(temp.path(), "not [ valid");
    assert!(matches!(
      Manifest::load(temp.path()),
      Err(ManifestError::Parse { .. })
    ));
  }

  #[test]
  fn ensure_absent_rejects_existing_manifest() {
    let temp = TempDir::new().unwrap();
    write_manifest(temp.path(), "[project]\nname = \"demo\"\n");
    assert!(matches!(
      Manifest::ensure_absent(temp.path()),
      Err(ManifestError::AlreadyExists { .. })
    ));
  }

  #[test]
  fn template_marker_is_read() {
    let temp = TempDir::new().unwrap();
    write_manifest(
      temp.path(),
      "[tool.stencil]\ntemplate = \"python_package\"\n",
    );
    let manifest = Manifest::load(temp.path()).unwrap();
    assert_eq!(manifest.template(), Some("python_package"));
  }

  #[test]
  fn template_marker_absent_is_none() {
    let temp = TempDir::new().unwrap();
    write_manifest(temp.path(), "[project]\nname = \"demo\"\n");
    let manifest = Manifest::load(temp.path()).unwrap();
    assert_eq!(manifest.template(), None);
  }

  #[test]
  fn sync_restores_manual_edits_after_regeneration() {
    let temp = TempDir::new().unwrap();
    write_manifest(
      temp.path(),
      r#"
[project]
name = "demo"
dependencies = [
    "click>=8",
    "mytool==1",
]
"#,
    );
    let old = Manifest::load(temp.path()).unwrap();

    // Simulate the template engine rewriting the manifest.
    write_manifest(
      temp.path(),
      r#"
[project]
name = "demo"
dependencies = [
    "click>=8",
]
"#,
    );

    let changes = sync(&old, temp.path()).unwrap();
    assert_eq!(changes, 1);

    let merged = Manifest::load(temp.path()).unwrap();
    let deps = merged
      .document()
      .get_path(&["project", "dependencies"])
      .unwrap()
      .as_array()
      .unwrap()
      .to_vec();
    assert_eq!(deps.len(), 2);
  }

  #[test]
  fn sync_without_changes_leaves_the_file_untouched() {
    let temp = TempDir::new().unwrap();
    let text = "# hand-written comment\n[project]\ndependencies = [\"click>=8\"]\n";
    write_manifest(temp.path(), text);
    let old = Manifest::load(temp.path()).unwrap();

    let changes = sync(&old, temp.path()).unwrap();
    assert_eq!(changes, 0);
    // No rewrite happened, so the comment survives.
    let on_disk = fs::read_to_string(Manifest::path_in(temp.path())).unwrap();
    assert_eq!(on_disk, text);
  }
}
