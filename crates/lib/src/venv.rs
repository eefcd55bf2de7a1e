//! Virtualenv and pre-commit bootstrap.
//!
//! Process glue around the `virtualenv`, `pip`, and `pre-commit`
//! executables. Every external binary is probed before use; a missing tool
//! downgrades to a warning rather than failing the whole command.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;
use tracing::{debug, warn};

/// Virtualenv directory inside a project.
pub const VENV_DIR: &str = ".venv";

/// Bootstrap failures.
#[derive(Debug, Error)]
pub enum VenvError {
  #[error("{path} already exists; use --force to continue")]
  AlreadyExists { path: PathBuf },

  #[error("failed to run '{command}': {source}")]
  Launch { command: String, source: io::Error },

  #[error("'{command}' exited with {status}")]
  CommandFailed { command: String, status: ExitStatus },
}

/// Refuse to touch an existing virtualenv unless forced.
pub fn ensure_clean(project_dir: &Path, force: bool) -> Result<(), VenvError> {
  let path = project_dir.join(VENV_DIR);
  if path.exists() && !force {
    return Err(VenvError::AlreadyExists { path });
  }
  Ok(())
}

/// Create the virtualenv and install the project into it.
///
/// The editable install runs last so console scripts end up pointing into
/// the virtualenv.
pub fn install(project_dir: &Path) -> Result<(), VenvError> {
  if !command_exists("virtualenv", None) {
    warn!("virtualenv is not installed; skipping environment setup");
    return Ok(());
  }

  run(
    Command::new("virtualenv").arg(VENV_DIR).current_dir(project_dir),
    "virtualenv",
  )?;
  pip(project_dir, &["install", ".[dev]"])?;
  pip(project_dir, &["install", ".[docs]"])?;
  pip(project_dir, &["install", "-e", "."])?;
  Ok(())
}

/// Install the pre-commit hooks, preferring the venv-local binary.
pub fn setup_pre_commit(project_dir: &Path) -> Result<(), VenvError> {
  let local = venv_bin(project_dir, "pre-commit");
  let program: PathBuf = if command_exists(&local, Some(project_dir)) {
    local
  } else if command_exists("pre-commit", Some(project_dir)) {
    PathBuf::from("pre-commit")
  } else {
    warn!("pre-commit is not installed; skipping hook setup");
    return Ok(());
  };

  run(
    Command::new(&program).arg("install").current_dir(project_dir),
    "pre-commit install",
  )?;
  run(
    Command::new(&program)
      .args(["install", "--hook-type", "commit-msg"])
      .current_dir(project_dir),
    "pre-commit install --hook-type commit-msg",
  )?;
  Ok(())
}

/// Probe for a runnable command by asking it for help.
pub fn command_exists(program: impl AsRef<OsStr>, cwd: Option<&Path>) -> bool {
  let mut cmd = Command::new(program);
  cmd.arg("-h").stdout(Stdio::null()).stderr(Stdio::null());
  if let Some(dir) = cwd {
    cmd.current_dir(dir);
  }
  cmd.status().map(|s| s.success()).unwrap_or(false)
}

fn pip(project_dir: &Path, args: &[&str]) -> Result<(), VenvError> {
  let python = venv_bin(project_dir, "python");
  let command = format!("pip {}", args.join(" "));
  run(
    Command::new(&python)
      .args(["-m", "pip"])
      .args(args)
      .current_dir(project_dir),
    &command,
  )
}

fn venv_bin(project_dir: &Path, name: &str) -> PathBuf {
  let venv = project_dir.join(VENV_DIR);
  if cfg!(windows) {
    venv.join("Scripts").join(format!("{name}.exe"))
  } else {
    venv.join("bin").join(name)
  }
}

fn run(cmd: &mut Command, command: &str) -> Result<(), VenvError> {
  debug!(command, "running");
  let status = cmd.status().map_err(|source| VenvError::Launch {
    command: command.to_string(),
    source,
  })?;
  if !status.success() {
    return Err(VenvError::CommandFailed {
      command: command.to_string(),
      status,
    });
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn ensure_clean_accepts_fresh_project() {
    let temp = TempDir::new().unwrap();
    assert!(ensure_clean(temp.path(), false).is_ok());
  }

  #[test]
  fn ensure_clean_rejects_existing_venv() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir(temp.path().join(VENV_DIR)).unwrap();

    assert!(matches!(
      ensure_clean(temp.path(), false),
      Err(VenvError::AlreadyExists { .. })
    ));
    assert!(ensure_clean(temp.path(), true).is_ok());
  }

  #[test]
  fn command_exists_is_false_for_missing_binaries() {
    assert!(!command_exists("definitely-not-a-real-binary-4af1", None));
  }
}
