//! Implementation of the `stencil update` command.
//!
//! Regenerates a project from the template it was created with, then
//! restores the manifest edits the regeneration clobbered (dependencies
//! the developer added or removed, console-script entries).

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};

use stencil_lib::context::TemplateContext;
use stencil_lib::manifest::{self, Manifest};
use stencil_lib::template::{self, GenerateOptions, TemplateDir};

use crate::output::{
  format_duration, print_info, print_json, print_stat, print_success, print_warning,
};

/// Execute the update command.
///
/// The template is taken from the manifest's `[tool.stencil]` marker,
/// falling back to `--template`; a mismatch between the two needs
/// `--force`. With `--dry-run` the engine invocation is printed instead
/// of executed.
///
/// # Errors
///
/// Returns an error if the folder has no manifest, the template cannot be
/// resolved, the engine fails, or reconciliation fails.
pub fn cmd_update(
  folder: &Path,
  dry_run: bool,
  template: &str,
  force: bool,
  templates_root: &Path,
) -> Result<()> {
  let start = Instant::now();
  let old = Manifest::load(folder)?;

  let mut template_name = old.template().unwrap_or(template).to_string();
  if template_name.is_empty() {
    bail!("the [tool.stencil] marker does not name a template; pass --template");
  }
  if template_name != template {
    if force {
      template_name = template.to_string();
    } else {
      bail!(
        "the project was built from template '{template_name}', not '{template}'; use --force to override"
      );
    }
  }

  let template_dir = TemplateDir::resolve(templates_root, &template_name)?;
  let defaults = template_dir.defaults()?;
  let mut context = TemplateContext::from_manifest(old.document(), &defaults);

  let folder_abs = std::path::absolute(folder)
    .with_context(|| format!("failed to resolve {}", folder.display()))?;
  let basename = folder_abs
    .file_name()
    .and_then(|n| n.to_str())
    .context("folder name is not valid UTF-8")?
    .to_string();
  if context.project_name.as_deref() != Some(basename.as_str()) {
    if let Some(declared) = context.project_name.as_deref() {
      print_info(&format!(
        "project_name '{declared}' differs from the folder on disk; using '{basename}'"
      ));
    }
    context.project_name = Some(basename);
  }
  let output_dir = folder_abs.parent().unwrap_or(Path::new(".")).to_path_buf();

  if dry_run {
    print_info("Dry run - the template engine would be called with:");
    print_stat("Template", &template_dir.path().display().to_string());
    print_stat("Output", &output_dir.display().to_string());
    print_json(&context)?;
    return Ok(());
  }

  let options = GenerateOptions {
    no_input: true,
    context,
    overwrite: true,
    output_dir,
  };
  template::generate(&template_dir, &options)?;

  let changes = manifest::sync(&old, folder)?;
  if changes > 0 {
    print_success(&format!(
      "Restored {changes} manifest entries after regeneration"
    ));
  } else {
    print_info("Manifest already in sync with the template");
  }
  print_stat("Duration", &format_duration(start.elapsed()));
  print_warning("Review the regenerated files; use 'git checkout -- <path>' to revert unwanted changes");
  Ok(())
}
