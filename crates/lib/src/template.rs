//! Template engine glue.
//!
//! Scaffolding is delegated to the external `cookiecutter` executable; this
//! module resolves template directories under the templates root, reads the
//! template's metadata file, and maps [`GenerateOptions`] onto the engine's
//! command line.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use thiserror::Error;
use tracing::debug;

use crate::context::TemplateContext;

/// The external scaffolding engine.
pub const ENGINE_BIN: &str = "cookiecutter";

/// Flat key/value metadata file inside a template directory.
pub const METADATA_FILENAME: &str = "cookiecutter.json";

/// Template resolution and engine failures.
#[derive(Debug, Error)]
pub enum TemplateError {
  #[error("template '{name}' not found under {root}")]
  TemplateNotFound { name: String, root: PathBuf },

  #[error("failed to read template metadata {path}: {source}")]
  MetadataRead { path: PathBuf, source: io::Error },

  #[error("failed to parse template metadata {path}: {source}")]
  MetadataParse {
    path: PathBuf,
    source: serde_json::Error,
  },

  #[error("template engine '{ENGINE_BIN}' is not installed or not on PATH")]
  EngineMissing(#[source] io::Error),

  #[error("failed to run template engine: {0}")]
  Engine(#[source] io::Error),

  #[error("template engine exited with {status}")]
  EngineFailed { status: ExitStatus },
}

/// A resolved template directory.
#[derive(Debug, Clone)]
pub struct TemplateDir {
  name: String,
  path: PathBuf,
}

impl TemplateDir {
  /// Resolve a template by name under the templates root.
  pub fn resolve(root: &Path, name: &str) -> Result<Self, TemplateError> {
    let path = root.join(name);
    if !path.is_dir() {
      return Err(TemplateError::TemplateNotFound {
        name: name.to_string(),
        root: root.to_path_buf(),
      });
    }
    Ok(Self {
      name: name.to_string(),
      path,
    })
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Default context values from the template metadata file.
  ///
  /// Only string values participate; list and object values are prompt
  /// configuration the engine interprets itself.
  pub fn defaults(&self) -> Result<TemplateDefaults, TemplateError> {
    let path = self.path.join(METADATA_FILENAME);
    let text = fs::read_to_string(&path).map_err(|source| TemplateError::MetadataRead {
      path: path.clone(),
      source,
    })?;
    let value: serde_json::Value =
      serde_json::from_str(&text).map_err(|source| TemplateError::MetadataParse {
        path: path.clone(),
        source,
      })?;

    let mut map = BTreeMap::new();
    if let serde_json::Value::Object(entries) = value {
      for (key, entry) in entries {
        if let serde_json::Value::String(s) = entry {
          map.insert(key, s);
        }
      }
    }
    Ok(TemplateDefaults(map))
  }
}

/// String-valued defaults from a template's metadata file.
#[derive(Debug, Clone, Default)]
pub struct TemplateDefaults(BTreeMap<String, String>);

impl TemplateDefaults {
  pub fn get(&self, key: &str) -> Option<&str> {
    self.0.get(key).map(String::as_str)
  }
}

impl From<BTreeMap<String, String>> for TemplateDefaults {
  fn from(map: BTreeMap<String, String>) -> Self {
    Self(map)
  }
}

/// How to run the engine.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
  /// Run fully scripted instead of prompting.
  pub no_input: bool,
  pub context: TemplateContext,
  /// Allow the engine to write into an existing output tree.
  pub overwrite: bool,
  pub output_dir: PathBuf,
}

/// Run the template engine and return the generated tree's path.
///
/// Templates root their output tree at the `project_name` context
/// variable, so the result is `output_dir/<project_name>`.
pub fn generate(template: &TemplateDir, options: &GenerateOptions) -> Result<PathBuf, TemplateError> {
  let mut cmd = Command::new(ENGINE_BIN);
  cmd.arg(template.path());
  if options.no_input {
    cmd.arg("--no-input");
  }
  if options.overwrite {
    cmd.arg("--overwrite-if-exists");
  }
  cmd.arg("--output-dir").arg(&options.output_dir);
  let context_args = options.context.to_args();
  for arg in &context_args {
    cmd.arg(arg);
  }

  debug!(template = template.name(), args = ?context_args, "running template engine");
  let status = cmd.status().map_err(|source| match source.kind() {
    io::ErrorKind::NotFound => TemplateError::EngineMissing(source),
    _ => TemplateError::Engine(source),
  })?;
  if !status.success() {
    return Err(TemplateError::EngineFailed { status });
  }

  let project_name = options.context.project_name.as_deref().unwrap_or_default();
  Ok(options.output_dir.join(project_name))
}
