//! Error types shared across the crate.
//!
//! - `ValidationError`: structural problems found before anything runs.
//! - `ResolutionError`: a group reference that cannot be followed.
//! - `ActionError`: anything that goes wrong while an action executes.
//! - `PersistenceError` / `GroupError`: disk I/O around groups and documents.
//! - `PlayerError`: misuse of the player's single-step entry point.

use std::path::PathBuf;

use thiserror::Error;

/// Structural validation failure for an action or a group.
///
/// `index` is the 0-based position of the failing action when the error
/// comes from a list (a group); it is `None` for a single action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.render())]
pub struct ValidationError {
    pub reason: String,
    pub index: Option<usize>,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            index: None,
        }
    }

    /// Attach the position of the failing action inside its list.
    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    fn render(&self) -> String {
        match self.index {
            Some(i) => format!("action {} is invalid: {}", i + 1, self.reason),
            None => self.reason.clone(),
        }
    }
}

/// A group reference that could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("action group not found: {0}")]
    NotFound(String),
    #[error("action group cycle detected: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
    #[error("action group nesting deeper than {0} levels")]
    TooDeep(usize),
}

/// Failure while executing an action.
#[derive(Debug, Error)]
pub enum ActionError {
    /// The OS-level effect could not be produced.
    #[error("{0}")]
    Execution(String),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Any of the above, wrapped with the description of the action that failed.
    #[error("[{description}] {source}")]
    Failed {
        description: String,
        #[source]
        source: Box<ActionError>,
    },
}

impl ActionError {
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Wrap with the human-readable description of the failing action.
    pub fn wrap(self, description: impl Into<String>) -> Self {
        Self::Failed {
            description: description.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping every `Failed` wrapper.
    pub fn root(&self) -> &ActionError {
        let mut current = self;
        while let ActionError::Failed { source, .. } = current {
            current = source;
        }
        current
    }

    pub fn is_resolution(&self) -> bool {
        matches!(self.root(), ActionError::Resolution(_))
    }
}

/// Disk I/O or decoding failure while saving/loading groups or documents.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode embedded image '{name}': {source}")]
    Decode {
        name: String,
        #[source]
        source: base64::DecodeError,
    },
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

/// Failure of a mutating operation on a group scope.
#[derive(Debug, Error)]
pub enum GroupError {
    #[error("invalid action group: {0}")]
    Invalid(#[from] ValidationError),

    #[error("action group '{0}' already exists")]
    Exists(String),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Misuse of the player's direct-execution entry point.
#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("player is busy; single-step execution requires the idle state")]
    Busy,

    #[error("action index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Action(#[from] ActionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_mentions_one_based_position() {
        let err = ValidationError::new("missing image_path").at(2);
        assert_eq!(err.to_string(), "action 3 is invalid: missing image_path");
        assert_eq!(ValidationError::new("x").to_string(), "x");
    }

    #[test]
    fn wrapped_errors_keep_their_root() {
        let err = ActionError::from(ResolutionError::NotFound("login".into()))
            .wrap("Group: login")
            .wrap("Group: outer");
        assert!(err.is_resolution());
        assert_eq!(
            err.to_string(),
            "[Group: outer] [Group: login] action group not found: login"
        );
        assert!(!ActionError::execution("boom").wrap("Click").is_resolution());
    }

    #[test]
    fn cycle_renders_the_chain() {
        let err = ResolutionError::Cycle(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(err.to_string(), "action group cycle detected: a -> b -> a");
    }
}
