// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{ExecutionConfig, RawConfigFile};
use crate::errors::{MasterError, Result};

/// Load a configuration file from a given path and return the raw model.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| MasterError::BadFile {
        path: path.to_path_buf(),
        source,
    })?;

    parse_str(&contents)
}

/// Parse TOML text into the raw model.
pub fn parse_str(contents: &str) -> Result<RawConfigFile> {
    let config: RawConfigFile = toml::from_str(contents)?;
    Ok(config)
}

/// Load a configuration file and validate it.
///
/// - An unreadable file is [`MasterError::BadFile`].
/// - TOML errors and field-level problems are configuration errors.
/// - Task logs will be written to `log_dir/<name>.log`.
pub fn load_and_validate(
    path: impl AsRef<Path>,
    log_dir: impl AsRef<Path>,
) -> Result<ExecutionConfig> {
    let path = path.as_ref();
    let raw = load_from_path(path)?;
    let config = raw.into_execution_config(log_dir.as_ref())?;

    debug!(
        config = ?path,
        tasks = config.num_tasks(),
        max_concurrent_tasks = config.max_concurrent_tasks,
        default_timeout = config.default_timeout_secs,
        "configuration loaded"
    );

    Ok(config)
}
