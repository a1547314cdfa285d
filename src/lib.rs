#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! ReplayBot: record-and-replay desktop automation on top of Enigo.
//!
//! The crate is the playback engine: a typed action model, a small condition
//! language over a shared variable store, reusable action groups resolved by
//! name, and a player that runs an action list on a worker thread with
//! pause/resume/stop, speed, repeat and timeout control.
//! - `actions`: action kinds, parameter registry, conditions, descriptions.
//! - `groups`: action groups and their local/global scopes.
//! - `executor`: input collaborators and the action runtime.
//! - `player`: the playback state machine and its observers.
//! - `document`: JSON script import/export.
//! - `config`: settings model, loader, and schema helpers.
//! - `utils`: interruptible sleeps, image embedding, window helpers.
//!
//! Use `replaybot::prelude::*` to bring commonly used items into scope quickly.

/// Public module: the action model.
pub mod actions;
/// Public module: settings and document models, loader, schema helpers.
pub mod config;
/// Public module: script document import/export.
pub mod document;
/// Public module: error taxonomy.
pub mod error;
/// Public module: execution engine (input collaborators and runtime).
pub mod executor;
/// Public module: action groups and resolvers.
pub mod groups;
/// Public module: playback engine.
pub mod player;
/// Public module: utilities (sleep, images, window helpers).
pub mod utils;
/// Public module: shared variable store.
pub mod variables;

#[cfg(test)]
pub(crate) mod testing;

/// Crate-level constants for consumers that want to inspect package metadata at runtime.
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the crate version (e.g., "0.1.0").
#[inline]
pub const fn version() -> &'static str {
    PKG_VERSION
}

/// Parse a plain level name (trace|debug|info|warn|error).
pub fn parse_level(name: &str) -> Option<tracing::Level> {
    use tracing::Level;
    match name.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Initialize tracing (logging) with a reasonable default.
/// - Honors the `RUST_LOG` environment variable if set.
/// - Falls back to `info` level.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init_tracing() {
    init_tracing_with(None);
}

/// Like [`init_tracing`], but an explicit `level` wins over `RUST_LOG`.
pub fn init_tracing_with(level: Option<tracing::Level>) {
    let level = level
        .or_else(|| std::env::var("RUST_LOG").ok().and_then(|s| parse_level(&s)))
        .unwrap_or(tracing::Level::INFO);

    // Ignore the error if the global subscriber was already set.
    let _ = tracing_subscriber::fmt().with_max_level(level).try_init();
}

/// A convenient set of exports for most consumers.
///
/// Bring this into scope with:
/// `use replaybot::prelude::*;`
pub mod prelude {
    // Common result/error handling
    pub use anyhow::{Context, Error, Result, anyhow, bail, ensure};

    // Serialization
    pub use serde::{Deserialize, Serialize};

    // Tracing macros
    pub use tracing::{debug, error, info, instrument, trace, warn};

    // Timing helpers
    pub use std::time::Duration;

    // External crates (namespaced) if callers want direct access
    pub use crate as replaybot;
    pub use enigo;

    // Frequently used items
    pub use crate::actions::{Action, ActionKind};
    pub use crate::groups::{ActionGroup, GlobalGroups, GroupResolver, LocalGroups};
    pub use crate::player::{Player, PlayerContext, PlayerEvent, PlayerObserver, PlayerState};
    pub use crate::variables::{VarValue, VariableStore};
    pub use crate::{config, document, executor, utils};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names() {
        assert_eq!(parse_level("DEBUG"), Some(tracing::Level::DEBUG));
        assert_eq!(parse_level("warning"), Some(tracing::Level::WARN));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn init_twice_is_harmless() {
        init_tracing();
        init_tracing_with(Some(tracing::Level::TRACE));
        assert_eq!(version(), PKG_VERSION);
    }
}
