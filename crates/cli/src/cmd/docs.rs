//! Implementation of the `stencil docs` command.

use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};

use stencil_lib::manifest::{Manifest, ManifestError};

use crate::output::print_success;

/// Execute the docs command.
///
/// Rebuilds the Sphinx documentation into `.docs`. Must be run from the
/// project root.
pub fn cmd_docs() -> Result<()> {
  if let Err(err) = Manifest::load(Path::new(".")) {
    match err {
      ManifestError::Absent { .. } => {
        bail!("run this from the root directory of a project (no pyproject.toml here)")
      }
      other => return Err(other.into()),
    }
  }

  let status = Command::new("sphinx-build")
    .args(["docs", ".docs"])
    .status()
    .context("failed to run sphinx-build; is it installed?")?;
  if !status.success() {
    bail!("sphinx-build exited with {status}");
  }

  print_success("Documentation rebuilt into .docs");
  Ok(())
}
