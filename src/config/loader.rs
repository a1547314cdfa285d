use anyhow::{Context, Result, anyhow};
use schemars::{Schema, schema_for};
use serde_valid::Validate;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

use super::models::{ScriptDocument, Settings};

/// Load settings from a string slice.
pub fn load_from_str(s: &str) -> Result<Settings> {
    let settings: Settings =
        serde_json::from_str(s).context("Failed to parse JSON settings string into Settings")?;
    validate_settings(&settings)?;
    Ok(settings)
}

/// Load settings from any reader (e.g., a file).
pub fn load_from_reader<R: Read>(reader: R) -> Result<Settings> {
    let settings: Settings =
        serde_json::from_reader(reader).context("Failed to parse JSON settings from reader")?;
    validate_settings(&settings)?;
    Ok(settings)
}

/// Load settings from a file path synchronously.
pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open settings file {}", path_ref.display()))?;
    let settings = load_from_reader(file)
        .with_context(|| format!("Invalid settings file {}", path_ref.display()))?;
    debug!(target: "replaybot::config", "Loaded settings from {}", path_ref.display());
    Ok(settings)
}

/// Load settings from a file path asynchronously (Tokio).
pub async fn load_from_path_async<P: AsRef<Path>>(path: P) -> Result<Settings> {
    use tokio::fs;
    let path_ref = path.as_ref();
    let bytes = fs::read(path_ref)
        .await
        .with_context(|| format!("Failed to read settings file {}", path_ref.display()))?;
    let settings: Settings = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse JSON settings from {}", path_ref.display()))?;
    validate_settings(&settings)?;
    debug!(target: "replaybot::config", "Loaded settings from {}", path_ref.display());
    Ok(settings)
}

/// Settings from `path` when the file exists, defaults otherwise.
/// A file that exists but does not parse is still an error.
pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        debug!(target: "replaybot::config", "No settings at {}; using defaults", path_ref.display());
        return Ok(Settings::default());
    }
    load_from_path(path_ref)
}

/// Write settings as pretty JSON, creating parent directories.
pub fn save_to_path<P: AsRef<Path>>(settings: &Settings, path: P) -> Result<()> {
    let path_ref = path.as_ref();
    validate_settings(settings)?;
    if let Some(parent) = path_ref.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(settings).context("Failed to serialize settings")?;
    fs::write(path_ref, json)
        .with_context(|| format!("Failed to write settings file {}", path_ref.display()))?;
    Ok(())
}

/// Range checks declared on the `Settings` fields.
pub fn validate_settings(settings: &Settings) -> Result<()> {
    settings
        .validate()
        .map_err(|e| anyhow!("Invalid settings: {e}"))
}

/// Generate the JSON Schema for the Settings model (for external validation or tooling).
pub fn generate_schema() -> Schema {
    schema_for!(Settings)
}

/// Generate the JSON Schema of the script document format.
pub fn generate_document_schema() -> Schema {
    schema_for!(ScriptDocument)
}

/// Write a schema to any writer (pretty-printed).
pub fn write_schema_to_writer<W: Write>(schema: &Schema, mut writer: W) -> Result<()> {
    let json = serde_json::to_string_pretty(schema).context("Failed to serialize schema")?;
    writer
        .write_all(json.as_bytes())
        .context("Failed to write schema to writer")?;
    Ok(())
}
