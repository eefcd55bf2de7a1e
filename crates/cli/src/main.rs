use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

/// stencil - Python project scaffolding and manifest upkeep
#[derive(Parser)]
#[command(name = "stencil")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Templates root directory (default: $STENCIL_TEMPLATES or ./templates)
  #[arg(long, global = true, value_name = "DIR")]
  templates: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Rebuild the project documentation (run from the project root)
  Docs,

  /// Create a new project inside a new folder
  Create {
    /// Folder to create; its basename becomes the project name
    folder: PathBuf,

    /// Create even if the folder already exists
    #[arg(short, long)]
    force: bool,

    /// Project template to use
    #[arg(long, default_value = "python_package")]
    template: String,
  },

  /// Generate a manifest for a repository that does not have one
  Provision {
    /// Existing repository to provision
    folder: PathBuf,

    /// Project template to use
    #[arg(long, default_value = "python_package")]
    template: String,
  },

  /// Regenerate a project from its template, keeping manifest edits
  Update {
    /// Project to update
    folder: PathBuf,

    /// Show what would run without touching anything
    #[arg(long)]
    dry_run: bool,

    /// Project template to use
    #[arg(long, default_value = "python_package")]
    template: String,

    /// Update even when the project was built from a different template
    #[arg(long)]
    force: bool,
  },

  /// Set up a project virtualenv with dependencies and hooks
  SetupVirtualenv {
    /// Project to set up
    folder: PathBuf,

    /// Continue even if .venv already exists
    #[arg(long)]
    force: bool,
  },
}

fn main() {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::from_default_env()
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .without_time()
    .init();

  if let Err(err) = run(cli) {
    output::print_error(&format!("{err:#}"));
    std::process::exit(1);
  }
}

fn run(cli: Cli) -> Result<()> {
  let templates = templates_root(cli.templates);

  match cli.command {
    Commands::Docs => cmd::cmd_docs(),
    Commands::Create {
      folder,
      force,
      template,
    } => cmd::cmd_create(&folder, force, &template, &templates),
    Commands::Provision { folder, template } => cmd::cmd_provision(&folder, &template, &templates),
    Commands::Update {
      folder,
      dry_run,
      template,
      force,
    } => cmd::cmd_update(&folder, dry_run, &template, force, &templates),
    Commands::SetupVirtualenv { folder, force } => cmd::cmd_setup_virtualenv(&folder, force),
  }
}

/// Resolve the templates root: flag, then environment, then ./templates.
fn templates_root(flag: Option<PathBuf>) -> PathBuf {
  flag
    .or_else(|| std::env::var_os("STENCIL_TEMPLATES").map(PathBuf::from))
    .unwrap_or_else(|| PathBuf::from("templates"))
}
