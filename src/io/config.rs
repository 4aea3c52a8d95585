//! Read/write run configuration JSON files.
//!
//! The schema is defined by `domain::RunConfig`; missing fields take their
//! defaults, so a config file only needs the values it changes.

use std::fs::File;
use std::path::Path;

use crate::domain::RunConfig;
use crate::error::AppError;

/// Read a run configuration JSON file.
pub fn read_config_json(path: &Path) -> Result<RunConfig, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open config '{}': {e}", path.display())))?;
    let config: RunConfig = serde_json::from_reader(file)
        .map_err(|e| AppError::input(format!("Invalid config JSON '{}': {e}", path.display())))?;
    Ok(config)
}

/// Write a run configuration JSON file.
pub fn write_config_json(path: &Path, config: &RunConfig) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::output(format!("Failed to create config '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, config)
        .map_err(|e| AppError::output(format!("Failed to write config JSON: {e}")))?;
    Ok(())
}

/// The default configuration as pretty JSON.
pub fn default_config_json() -> Result<String, AppError> {
    serde_json::to_string_pretty(&RunConfig::default())
        .map_err(|e| AppError::output(format!("Failed to serialize config: {e}")))
}
