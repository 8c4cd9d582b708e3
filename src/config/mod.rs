// src/config/mod.rs

//! Configuration loading and validation for dagmaster.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate per-field rules and clamp timeouts (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_str};
pub use model::{
    Directive, ExecCommand, ExecutionConfig, MainSection, RawConfigFile, TaskConfig, TaskSection,
};
pub use validate::effective_timeout;
