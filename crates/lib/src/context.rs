//! Template context extraction.
//!
//! The template engine is driven by a fixed set of context variables. For a
//! fresh project most of them come from interactive prompts; when updating
//! an existing project they are rebuilt from the manifest so regeneration
//! runs fully scripted, with the template's metadata file filling any gaps.

use serde::Serialize;

use crate::document::{Document, Value};
use crate::template::TemplateDefaults;

/// The context variable mapping passed to the template engine.
///
/// Unset fields are omitted from the engine invocation, which makes the
/// engine fall back to prompting (interactive runs) or to its metadata
/// defaults (scripted runs).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TemplateContext {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub initial_commit: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub setup_github: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub setup_pre_commit: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub private_or_public: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub run_virtualenv_install: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub full_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub github_username: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub project_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub package_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub project_slug: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub open_source_license: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub project_short_description: Option<String>,
}

impl TemplateContext {
  /// Pinned answers for scripted runs against an existing repository:
  /// nothing that would touch git, hooks, or a virtualenv.
  pub fn scripted() -> Self {
    Self {
      initial_commit: Some("n".to_string()),
      setup_github: Some("n".to_string()),
      setup_pre_commit: Some("n".to_string()),
      private_or_public: Some("private".to_string()),
      run_virtualenv_install: Some("n".to_string()),
      ..Self::default()
    }
  }

  /// Context for creating a brand new project interactively.
  pub fn for_create(project_name: &str) -> Self {
    Self {
      initial_commit: Some("y".to_string()),
      setup_github: Some("n".to_string()),
      setup_pre_commit: Some("y".to_string()),
      private_or_public: Some("public".to_string()),
      run_virtualenv_install: Some("y".to_string()),
      project_name: Some(project_name.to_string()),
      ..Self::default()
    }
  }

  /// Context for provisioning a manifest into an existing repository.
  pub fn for_provision(project_name: &str) -> Self {
    let mut ctx = Self::scripted();
    ctx.project_name = Some(project_name.to_string());
    ctx
  }

  /// Rebuild the context from an existing manifest, falling back to the
  /// template metadata defaults for anything the manifest does not carry.
  pub fn from_manifest(document: &Document, defaults: &TemplateDefaults) -> Self {
    let mut ctx = Self::scripted();

    let author = document
      .get_path(&["project", "authors"])
      .and_then(|v| v.as_array())
      .and_then(|a| a.first())
      .and_then(|v| v.as_table());
    ctx.email = author
      .and_then(|id| document.get(id, "email"))
      .and_then(|v| v.as_str())
      .map(str::to_string)
      .or_else(|| defaults.get("email").map(str::to_string));
    ctx.full_name = author
      .and_then(|id| document.get(id, "name"))
      .and_then(|v| v.as_str())
      .map(str::to_string)
      .or_else(|| defaults.get("full_name").map(str::to_string));

    if let Some(repository) = document
      .get_path(&["project", "repository"])
      .and_then(|v| v.as_str())
    {
      let mut parts = repository.rsplitn(3, '/');
      let repo = parts.next();
      let user = parts.next();
      if let (Some(repo), Some(user)) = (repo, user) {
        ctx.github_username = Some(user.to_string());
        ctx.project_name = Some(repo.strip_suffix(".git").unwrap_or(repo).to_string());
      }

      let declared_package = document
        .get_path(&["project", "packages"])
        .and_then(|v| v.as_array())
        .and_then(|a| a.first())
        .and_then(|v| match v {
          Value::String(s) => Some(s.clone()),
          // Older manifests declare packages as { include = "name" }.
          Value::Table(id) => document
            .get(*id, "include")
            .and_then(|v| v.as_str())
            .map(str::to_string),
          _ => None,
        });
      ctx.package_name = declared_package.or_else(|| ctx.project_name.as_deref().map(slugify));
      ctx.project_slug = ctx.package_name.clone();
    }

    ctx.open_source_license = Some(
      document
        .get_path(&["project", "license", "text"])
        .and_then(|v| v.as_str())
        .unwrap_or("Not open source")
        .to_string(),
    );
    ctx.version = document
      .get_path(&["project", "version"])
      .and_then(|v| v.as_str())
      .map(str::to_string)
      .or_else(|| defaults.get("version").map(str::to_string));
    ctx.project_short_description = document
      .get_path(&["project", "description"])
      .and_then(|v| v.as_str())
      .map(str::to_string)
      .or_else(|| defaults.get("project_short_description").map(str::to_string));

    ctx
  }

  /// `key=value` arguments for the engine, set fields only, fixed order.
  pub fn to_args(&self) -> Vec<String> {
    let fields: [(&str, &Option<String>); 14] = [
      ("initial_commit", &self.initial_commit),
      ("setup_github", &self.setup_github),
      ("setup_pre_commit", &self.setup_pre_commit),
      ("private_or_public", &self.private_or_public),
      ("run_virtualenv_install", &self.run_virtualenv_install),
      ("email", &self.email),
      ("full_name", &self.full_name),
      ("github_username", &self.github_username),
      ("project_name", &self.project_name),
      ("package_name", &self.package_name),
      ("project_slug", &self.project_slug),
      ("open_source_license", &self.open_source_license),
      ("version", &self.version),
      ("project_short_description", &self.project_short_description),
    ];
    fields
      .iter()
      .filter_map(|(key, value)| value.as_ref().map(|v| format!("{key}={v}")))
      .collect()
  }
}

fn slugify(name: &str) -> String {
  let mut out = String::with_capacity(name.len());
  let mut pending = false;
  for c in name.chars() {
    if c.is_ascii_alphanumeric() {
      if pending && !out.is_empty() {
        out.push('-');
      }
      pending = false;
      out.push(c.to_ascii_lowercase());
    } else {
      pending = true;
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::BTreeMap;

  const MANIFEST: &str = r#"
[project]
name = "my-project"
version = "1.2.3"
description = "A demo project"
repository = "https://github.com/octocat/my-project.git"
authors = [
    { name = "Ada Lovelace", email = "ada@example.com" },
]
packages = [
    "my_project",
]

[project.license]
text = "MIT"
"#;

  fn defaults() -> TemplateDefaults {
    let mut map = BTreeMap::new();
    map.insert("email".to_string(), "default@example.com".to_string());
    map.insert("full_name".to_string(), "Default Name".to_string());
    map.insert("version".to_string(), "0.1.0".to_string());
    map.insert(
      "project_short_description".to_string(),
      "A python package".to_string(),
    );
    TemplateDefaults::from(map)
  }

  #[test]
  fn manifest_values_win_over_defaults() {
    let doc = Document::parse(MANIFEST).unwrap();
    let ctx = TemplateContext::from_manifest(&doc, &defaults());

    assert_eq!(ctx.email.as_deref(), Some("ada@example.com"));
    assert_eq!(ctx.full_name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(ctx.github_username.as_deref(), Some("octocat"));
    assert_eq!(ctx.project_name.as_deref(), Some("my-project"));
    assert_eq!(ctx.package_name.as_deref(), Some("my_project"));
    assert_eq!(ctx.project_slug.as_deref(), Some("my_project"));
    assert_eq!(ctx.open_source_license.as_deref(), Some("MIT"));
    assert_eq!(ctx.version.as_deref(), Some("1.2.3"));
    assert_eq!(ctx.project_short_description.as_deref(), Some("A demo project"));
  }

  #[test]
  fn scripted_answers_are_pinned() {
    let doc = Document::parse(MANIFEST).unwrap();
    let ctx = TemplateContext::from_manifest(&doc, &defaults());

    assert_eq!(ctx.initial_commit.as_deref(), Some("n"));
    assert_eq!(ctx.setup_github.as_deref(), Some("n"));
    assert_eq!(ctx.private_or_public.as_deref(), Some("private"));
    assert_eq!(ctx.run_virtualenv_install.as_deref(), Some("n"));
  }

  #[test]
  fn defaults_fill_missing_fields() {
    let doc = Document::parse("[project]\nname = \"bare\"\n").unwrap();
    let ctx = TemplateContext::from_manifest(&doc, &defaults());

    assert_eq!(ctx.email.as_deref(), Some("default@example.com"));
    assert_eq!(ctx.full_name.as_deref(), Some("Default Name"));
    assert_eq!(ctx.version.as_deref(), Some("0.1.0"));
    assert_eq!(ctx.open_source_license.as_deref(), Some("Not open source"));
    assert_eq!(ctx.github_username, None);
    assert_eq!(ctx.project_name, None);
  }

  #[test]
  fn packages_as_include_tables_are_accepted() {
    let doc = Document::parse(
      r#"
[project]
repository = "https://github.com/octocat/demo"
packages = [
    { include = "demo_pkg" },
]
"#,
    )
    .unwrap();
    let ctx = TemplateContext::from_manifest(&doc, &defaults());
    assert_eq!(ctx.project_name.as_deref(), Some("demo"));
    assert_eq!(ctx.package_name.as_deref(), Some("demo_pkg"));
  }

  #[test]
  fn missing_packages_fall_back_to_slugified_project_name() {
    let doc = Document::parse(
      "[project]\nrepository = \"https://github.com/octocat/My Project.git\"\n",
    )
    .unwrap();
    let ctx = TemplateContext::from_manifest(&doc, &defaults());
    assert_eq!(ctx.package_name.as_deref(), Some("my-project"));
  }

  #[test]
  fn to_args_skips_unset_fields_and_keeps_order() {
    let ctx = TemplateContext::for_create("demo");
    let args = ctx.to_args();
    assert_eq!(
      args,
      vec![
        "initial_commit=y",
        "setup_github=n",
        "setup_pre_commit=y",
        "private_or_public=public",
        "run_virtualenv_install=y",
        "project_name=demo",
      ]
    );
  }

  #[test]
  fn slugify_collapses_separator_runs() {
    assert_eq!(slugify("My  Fancy--Project"), "my-fancy-project");
    assert_eq!(slugify("already-slugged"), "already-slugged");
  }
}
