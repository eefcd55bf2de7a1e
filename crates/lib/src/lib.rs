//! stencil-lib: core types and logic for stencil
//!
//! This crate provides the pieces behind the `stencil` CLI:
//! - `Document`: the ordered tree model of a project manifest
//! - `reconcile`: merges a hand-edited manifest with a regenerated one
//! - `render`: the deterministic manifest serializer
//! - `template`: glue around the external scaffolding engine
//! - `venv`: virtualenv and pre-commit bootstrap helpers

pub mod context;
pub mod document;
pub mod manifest;
pub mod reconcile;
pub mod render;
pub mod requirement;
pub mod template;
pub mod venv;
