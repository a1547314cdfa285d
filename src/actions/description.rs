//! Derived, human-readable action descriptions.
//!
//! Layout: `[name] [wait 0.50s] <body> (xN)`. Each segment depends on one
//! input only, so changing e.g. the name only changes the prefix.

use std::path::Path;

use serde_json::Value;

use super::{ActionKind, Params};

/// Pure description derivation.
pub fn derive_description(
    kind: ActionKind,
    params: &Params,
    name: &str,
    delay_before: f64,
    repeat_count: u32,
) -> String {
    let mut out = String::new();
    if !name.is_empty() {
        out.push_str(&format!("[{name}] "));
    }
    if delay_before > 0.05 {
        out.push_str(&format!("[wait {delay_before:.2}s] "));
    }
    out.push_str(&body(kind, params));
    if repeat_count > 1 {
        out.push_str(&format!(" (x{repeat_count})"));
    }
    out
}

fn body(kind: ActionKind, p: &Params) -> String {
    match kind {
        ActionKind::MouseClick => format!("Click ({}, {})", num(p, "x"), num(p, "y")),
        ActionKind::MouseDoubleClick => {
            format!("Double-click ({}, {})", num(p, "x"), num(p, "y"))
        }
        ActionKind::MouseRightClick => {
            format!("Right-click ({}, {})", num(p, "x"), num(p, "y"))
        }
        ActionKind::MouseMove => format!("Move to ({}, {})", num(p, "x"), num(p, "y")),
        ActionKind::MouseDrag => format!(
            "Drag ({}, {}) -> ({}, {})",
            num(p, "start_x"),
            num(p, "start_y"),
            num(p, "end_x"),
            num(p, "end_y")
        ),
        ActionKind::MouseScroll => format!("Scroll {} notches", num(p, "clicks")),
        ActionKind::KeyPress => format!("Press key: {}", text(p, "key", "")),
        ActionKind::KeyType => format!("Type text: {}", text(p, "text", "")),
        ActionKind::Hotkey => {
            let keys: Vec<&str> = p
                .get("keys")
                .and_then(Value::as_array)
                .map(|keys| keys.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            format!("Hotkey: {}", keys.join("+"))
        }
        ActionKind::Wait => format!("Wait {} s", num(p, "seconds")),
        ActionKind::Screenshot => {
            format!("Screenshot: {}", text(p, "filename", "screenshot.png"))
        }
        ActionKind::MouseMoveRelative => {
            format!("Move in window to ({}, {})", num(p, "x"), num(p, "y"))
        }
        ActionKind::MouseClickRelative => {
            format!("Click in window ({}, {})", num(p, "x"), num(p, "y"))
        }
        ActionKind::ImageClick => format!("Click image: {}", image_name(p)),
        ActionKind::ImageWaitClick => format!("Wait for image and click: {}", image_name(p)),
        ActionKind::ImageCheck => format!("Check image: {}", image_name(p)),
        ActionKind::ActionGroupRef => format!("Group: {}", text(p, "group_name", "unknown")),
    }
}

/// Numbers render as they appear in JSON; missing values as `0`.
fn num(p: &Params, key: &str) -> String {
    match p.get(key) {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => "0".to_string(),
    }
}

fn text<'a>(p: &'a Params, key: &str, fallback: &'a str) -> &'a str {
    p.get(key).and_then(Value::as_str).unwrap_or(fallback)
}

fn image_name(p: &Params) -> String {
    let path = text(p, "image_path", "");
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
