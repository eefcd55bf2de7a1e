//! Implementation of the `stencil create` command.
//!
//! Creates a new project inside a new folder by running the template
//! engine interactively; the folder's basename becomes the project name.

use std::path::Path;

use anyhow::{Context, Result, bail};
use owo_colors::OwoColorize;

use stencil_lib::context::TemplateContext;
use stencil_lib::template::{self, GenerateOptions, TemplateDir};

use crate::output::print_success;

/// Execute the create command.
///
/// # Errors
///
/// Returns an error if the folder already exists (without `--force`), the
/// template cannot be resolved, or the engine fails.
pub fn cmd_create(folder: &Path, force: bool, template: &str, templates_root: &Path) -> Result<()> {
  if folder.exists() && !force {
    bail!(
      "{} already exists; use --force to create into it anyway",
      folder.display()
    );
  }

  let folder = std::path::absolute(folder)
    .with_context(|| format!("failed to resolve {}", folder.display()))?;
  let project_name = folder
    .file_name()
    .and_then(|n| n.to_str())
    .context("folder name is not valid UTF-8")?
    .to_string();
  let output_dir = folder.parent().unwrap_or(Path::new(".")).to_path_buf();

  let template = TemplateDir::resolve(templates_root, template)?;
  let options = GenerateOptions {
    no_input: false,
    context: TemplateContext::for_create(&project_name),
    overwrite: force,
    output_dir,
  };
  let generated = template::generate(&template, &options)?;

  print_success(&format!("Project created at {}", generated.display()));
  println!();
  println!("{}", "Next steps:".bold());
  println!("  1. cd {}", generated.display());
  println!(
    "  2. Run: {}",
    format!("stencil setup-virtualenv {}", generated.display()).cyan()
  );
  Ok(())
}
