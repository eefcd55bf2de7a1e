//! Implementation of the `stencil provision` command.
//!
//! Generates a manifest for a repository that does not have one. The
//! template engine runs into a scratch directory and only the generated
//! manifest is copied over, so the repository itself stays untouched.
//! After this succeeds, `stencil update` takes over maintenance.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use stencil_lib::context::TemplateContext;
use stencil_lib::manifest::{MANIFEST_FILENAME, Manifest};
use stencil_lib::template::{self, GenerateOptions, TemplateDir};

use crate::output::{print_info, print_success, print_warning};

/// Execute the provision command.
///
/// # Errors
///
/// Returns an error if the folder is missing or already has a manifest,
/// the template cannot be resolved, or the engine fails.
pub fn cmd_provision(folder: &Path, template: &str, templates_root: &Path) -> Result<()> {
  if !folder.is_dir() {
    bail!("{} is not a directory", folder.display());
  }
  let target = Manifest::ensure_absent(folder)?;

  let folder_abs = std::path::absolute(folder)
    .with_context(|| format!("failed to resolve {}", folder.display()))?;
  let project_name = folder_abs
    .file_name()
    .and_then(|n| n.to_str())
    .context("folder name is not valid UTF-8")?
    .to_string();

  let template = TemplateDir::resolve(templates_root, template)?;
  print_info("Generating a fresh skeleton first; answer the template questions (the repository itself stays untouched)");

  let scratch = tempfile::tempdir().context("failed to create scratch directory")?;
  let options = GenerateOptions {
    no_input: false,
    context: TemplateContext::for_provision(&project_name),
    overwrite: true,
    output_dir: scratch.path().to_path_buf(),
  };
  let generated = template::generate(&template, &options)?;

  let source = generated.join(MANIFEST_FILENAME);
  if source.exists() {
    fs::copy(&source, &target).with_context(|| {
      format!(
        "failed to copy {} to {}",
        source.display(),
        target.display()
      )
    })?;
    print_success(&format!("New manifest written to {}", target.display()));
  } else {
    print_warning("Generation was interrupted; no manifest produced");
  }
  Ok(())
}
