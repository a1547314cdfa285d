use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_valid::Validate;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::actions::Action;
use crate::groups::{ActionGroup, GlobalGroups};
use crate::player::Player;

/// Document format version written by this crate.
pub const DOCUMENT_VERSION: &str = "2.0";

/// Application settings for ReplayBot.
///
/// Deserialized from a JSON file; every field is optional and falls back to
/// its default. Ranges are checked with `serde_valid` when loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(default)]
pub struct Settings {
    /// Playback speed multiplier; delays are divided by it.
    #[validate(minimum = 0.1)]
    #[validate(maximum = 10.0)]
    pub default_speed: f64,

    /// How many times the whole script runs.
    #[validate(minimum = 1)]
    pub default_repeat_count: u32,

    /// Repeat until stopped, ignoring `default_repeat_count`.
    pub infinite_loop: bool,

    /// Run time limit in seconds; 0 disables it.
    #[validate(minimum = 0.0)]
    pub timeout_seconds: f64,

    /// Directory of the shared (global) action groups.
    /// Defaults to `<home>/.replaybot/groups`.
    pub groups_dir: Option<PathBuf>,

    /// Directory, next to an imported document, that embedded images are
    /// decoded into.
    pub images_dir_name: String,

    /// Log input effects instead of performing them.
    pub dry_run: bool,

    /// Log level used when neither `RUST_LOG` nor `--log-level` is given.
    pub log_level: Option<LogLevel>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_speed: 1.0,
            default_repeat_count: 1,
            infinite_loop: false,
            timeout_seconds: 0.0,
            groups_dir: None,
            images_dir_name: ".images".to_string(),
            dry_run: false,
            log_level: None,
        }
    }
}

impl Settings {
    pub fn groups_dir(&self) -> PathBuf {
        self.groups_dir
            .clone()
            .unwrap_or_else(GlobalGroups::default_dir)
    }

    pub fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_seconds).unwrap_or(Duration::ZERO)
    }

    /// Push the playback defaults into `player`.
    pub fn apply_to(&self, player: &Player) {
        player.set_speed(self.default_speed);
        player.set_repeat_count(i64::from(self.default_repeat_count));
        player.set_infinite_loop(self.infinite_loop);
        player.set_timeout(self.timeout());
    }
}

/// Logging level for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// A saved script: actions plus everything needed to replay them elsewhere.
///
/// Group maps stay as raw JSON so one malformed group does not reject the
/// whole document; they are parsed entry by entry on import.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScriptDocument {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub description: String,

    /// Creation time, RFC 3339.
    #[serde(default)]
    pub created: String,

    #[serde(default = "default_version")]
    pub version: String,

    /// Top-level actions, in playback order.
    #[serde(default)]
    pub actions: Vec<Action>,

    /// Every group referenced (directly or transitively) by `actions`.
    #[serde(default)]
    #[schemars(with = "BTreeMap<String, ActionGroup>")]
    pub action_groups: Map<String, Value>,

    /// Snapshot of the document's local group scope. Preferred over
    /// `action_groups` on import when present and non-empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(with = "Option<BTreeMap<String, ActionGroup>>")]
    pub local_action_groups: Option<Map<String, Value>>,

    /// Sanitized image base name -> base64 file contents.
    #[serde(default)]
    pub embedded_images: BTreeMap<String, String>,
}

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

impl Default for ScriptDocument {
    fn default() -> Self {
        Self {
            name: String::new(),
            author: String::new(),
            description: String::new(),
            created: String::new(),
            version: default_version(),
            actions: Vec::new(),
            action_groups: Map::new(),
            local_action_groups: None,
            embedded_images: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn settings_default_from_empty_object() {
        let s: Settings = serde_json::from_value(json!({})).unwrap();
        assert_eq!(s, Settings::default());
        assert_eq!(s.images_dir_name, ".images");
        assert!(s.validate().is_ok());
    }

    #[test]
    fn settings_ranges_are_validated() {
        for bad in [
            json!({"default_speed": 0.0}),
            json!({"default_speed": 11.0}),
            json!({"default_repeat_count": 0}),
            json!({"timeout_seconds": -1.0}),
        ] {
            let s: Settings = serde_json::from_value(bad.clone()).unwrap();
            assert!(s.validate().is_err(), "{bad}");
        }
    }

    #[test]
    fn timeout_zero_means_none() {
        let mut s = Settings::default();
        assert_eq!(s.timeout(), Duration::ZERO);
        s.timeout_seconds = 1.5;
        assert_eq!(s.timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn document_defaults() {
        let doc: ScriptDocument = serde_json::from_value(json!({"actions": []})).unwrap();
        assert_eq!(doc.version, DOCUMENT_VERSION);
        assert!(doc.local_action_groups.is_none());
        let v = serde_json::to_value(&doc).unwrap();
        assert!(v.get("local_action_groups").is_none());
        assert!(v["embedded_images"].as_object().unwrap().is_empty());
    }
}
