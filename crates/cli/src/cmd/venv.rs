//! Implementation of the `stencil setup-virtualenv` command.
//!
//! Creates `.venv`, installs the project with its dev and docs extras,
//! and installs the pre-commit hooks.

use std::path::Path;

use anyhow::Result;
use owo_colors::OwoColorize;

use stencil_lib::manifest::Manifest;
use stencil_lib::venv;

use crate::output::print_success;

/// Execute the setup-virtualenv command.
///
/// # Errors
///
/// Returns an error if the folder has no manifest, `.venv` already exists
/// (without `--force`), or one of the install steps fails.
pub fn cmd_setup_virtualenv(folder: &Path, force: bool) -> Result<()> {
  Manifest::load(folder)?;
  venv::ensure_clean(folder, force)?;
  venv::install(folder)?;
  venv::setup_pre_commit(folder)?;

  print_success(&format!(
    "Virtualenv ready in {}/{}",
    folder.display(),
    venv::VENV_DIR
  ));
  println!();
  println!("{}", "If anything went wrong, the manual steps are:".bold());
  println!("  cd {}", folder.display());
  println!("  source .venv/bin/activate");
  println!("  pip install .[dev] .[docs]");
  println!("  pip install -e .");
  Ok(())
}
