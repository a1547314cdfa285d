//! Collaborator interfaces consumed by the runtime.
//!
//! The runtime decodes an action's parameters into a typed [`InputCommand`]
//! and hands it to an [`InputDriver`]; template matching goes through a
//! [`ScreenLocator`]. Both are implemented outside the core (see
//! `executor::driver` for the Enigo-backed driver).

use std::path::Path;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Screen position in pixels.
pub type Point = (i32, i32);

/// A rectangle region on screen.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn center(&self) -> Point {
        (self.x + self.width / 2, self.y + self.height / 2)
    }
}

/// Mouse button enumeration.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

impl MouseButton {
    /// Parse a button name; unknown names fall back to `Left`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "right" => MouseButton::Right,
            "middle" => MouseButton::Middle,
            _ => MouseButton::Left,
        }
    }
}

/// A single OS-level input effect, already translated to absolute
/// coordinates. `None` positions mean "where the cursor is".
#[derive(Debug, Clone, PartialEq)]
pub enum InputCommand {
    MoveTo {
        to: Point,
        duration_secs: f64,
    },
    Click {
        at: Option<Point>,
        button: MouseButton,
        clicks: u32,
    },
    Drag {
        from: Point,
        to: Point,
        duration_secs: f64,
    },
    /// Positive `clicks` scroll up.
    Scroll {
        at: Option<Point>,
        clicks: i32,
    },
    KeyPress {
        key: String,
    },
    TypeText {
        text: String,
        interval_secs: f64,
    },
    Hotkey {
        keys: Vec<String>,
    },
    Screenshot {
        path: String,
        region: Option<Rect>,
    },
}

/// Synthesizes mouse/keyboard/screenshot effects.
pub trait InputDriver: Send {
    fn perform(&mut self, command: &InputCommand) -> Result<()>;
}

/// Template matching against the current screen.
pub trait ScreenLocator: Send + Sync {
    /// `Ok(None)` means the template is not visible at `confidence`.
    fn locate(&self, image: &Path, confidence: f64) -> Result<Option<Rect>>;
}

/// Locator used when no template matcher is available.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedLocator;

impl ScreenLocator for UnsupportedLocator {
    fn locate(&self, image: &Path, _confidence: f64) -> Result<Option<Rect>> {
        bail!(
            "image matching is not available in this build (template {})",
            image.display()
        )
    }
}
