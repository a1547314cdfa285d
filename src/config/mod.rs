//! Configuration module for ReplayBot.
//!
//! This module wires together the settings/document models and the
//! loading/validation helpers used throughout the crate. Import from here for
//! a convenient, stable API.
//!
//! Example:
//! use replaybot::config::{Settings, load_or_default};
//!
//! let settings = load_or_default("replaybot.json")?;

pub mod loader;
pub mod models;

// Re-export core data models
pub use models::{DOCUMENT_VERSION, LogLevel, ScriptDocument, Settings};

// Re-export loader utilities
pub use loader::{
    generate_document_schema, generate_schema, load_from_path, load_from_path_async,
    load_from_reader, load_from_str, load_or_default, save_to_path, validate_settings,
    write_schema_to_writer,
};
