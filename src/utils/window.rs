use anyhow::Result;
use tracing::{debug, warn};

use crate::executor::{Point, Rect};

/// A top-level window matched by title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub title: String,
    pub bounds: Rect,
}

impl WindowInfo {
    /// Top-left corner, the offset window-relative actions are translated by.
    pub fn offset(&self) -> Point {
        (self.bounds.x, self.bounds.y)
    }
}

/// Find a window whose title contains `title_contains` (case-insensitive).
///
/// Returns:
/// - Ok(Some(_)) with the window's title and screen bounds.
/// - Ok(None) if no window matched (or on unsupported platforms).
/// - Err(_) only for unexpected internal errors.
///
/// Notes:
/// - Window enumeration is not linked into this build; every platform
///   reports no match and logs a warning, so callers fall back to absolute
///   coordinates.
pub fn find_window(title_contains: &str) -> Result<Option<WindowInfo>> {
    debug!(target: "replaybot::window", %title_contains, "find_window requested");
    find_window_impl(title_contains)
}

/// Bring `window` to the foreground. Ok(false) when it could not be activated.
pub fn activate_window(window: &WindowInfo) -> Result<bool> {
    debug!(target: "replaybot::window", title = %window.title, "activate_window requested");
    activate_window_impl(window)
}

/// Offset of the first window matching `title_contains`, activating it on the way.
pub fn window_offset(title_contains: &str) -> Result<Option<Point>> {
    let Some(window) = find_window(title_contains)? else {
        return Ok(None);
    };
    if !activate_window(&window)? {
        warn!(target: "replaybot::window", title = %window.title, "window found but could not be activated");
    }
    Ok(Some(window.offset()))
}

#[cfg(windows)]
fn find_window_impl(title_contains: &str) -> Result<Option<WindowInfo>> {
    // Needs EnumWindows + GetWindowTextW + GetWindowRect.
    warn!(
        target: "replaybot::window",
        %title_contains,
        "window lookup is not implemented yet on Windows; returning Ok(None)"
    );
    Ok(None)
}

#[cfg(not(windows))]
fn find_window_impl(_title_contains: &str) -> Result<Option<WindowInfo>> {
    warn!(
        target: "replaybot::window",
        "window lookup is not supported on this platform; returning Ok(None)"
    );
    Ok(None)
}

#[cfg(windows)]
fn activate_window_impl(window: &WindowInfo) -> Result<bool> {
    warn!(
        target: "replaybot::window",
        title = %window.title,
        "window activation is not implemented yet on Windows; returning Ok(false)"
    );
    Ok(false)
}

#[cfg(not(windows))]
fn activate_window_impl(_window: &WindowInfo) -> Result<bool> {
    warn!(
        target: "replaybot::window",
        "window activation is not supported on this platform; returning Ok(false)"
    );
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_top_left_corner() {
        let w = WindowInfo {
            title: "Editor".into(),
            bounds: Rect {
                x: 40,
                y: 30,
                width: 800,
                height: 600,
            },
        };
        assert_eq!(w.offset(), (40, 30));
    }

    #[test]
    fn unsupported_lookup_yields_none() {
        assert_eq!(window_offset("definitely-not-a-window").unwrap(), None);
    }
}
