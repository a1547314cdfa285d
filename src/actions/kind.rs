//! Action kinds and their parameter schema registry.
//!
//! The registry is plain data: one `KindSpec` per kind listing its parameters
//! in display order. Validation reads it, and so does any editor that needs
//! to render a property form.

use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Params;

/// Closed set of action kinds. Serialized names match the document format.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    MouseClick,
    MouseDoubleClick,
    MouseRightClick,
    MouseMove,
    MouseDrag,
    MouseScroll,
    KeyPress,
    KeyType,
    Hotkey,
    Wait,
    Screenshot,
    MouseMoveRelative,
    MouseClickRelative,
    ImageClick,
    ImageWaitClick,
    ImageCheck,
    ActionGroupRef,
}

impl ActionKind {
    pub const ALL: [ActionKind; 17] = [
        ActionKind::MouseClick,
        ActionKind::MouseDoubleClick,
        ActionKind::MouseRightClick,
        ActionKind::MouseMove,
        ActionKind::MouseDrag,
        ActionKind::MouseScroll,
        ActionKind::KeyPress,
        ActionKind::KeyType,
        ActionKind::Hotkey,
        ActionKind::Wait,
        ActionKind::Screenshot,
        ActionKind::MouseMoveRelative,
        ActionKind::MouseClickRelative,
        ActionKind::ImageClick,
        ActionKind::ImageWaitClick,
        ActionKind::ImageCheck,
        ActionKind::ActionGroupRef,
    ];

    /// Wire name, e.g. `"mouse_click"`.
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::MouseClick => "mouse_click",
            ActionKind::MouseDoubleClick => "mouse_double_click",
            ActionKind::MouseRightClick => "mouse_right_click",
            ActionKind::MouseMove => "mouse_move",
            ActionKind::MouseDrag => "mouse_drag",
            ActionKind::MouseScroll => "mouse_scroll",
            ActionKind::KeyPress => "key_press",
            ActionKind::KeyType => "key_type",
            ActionKind::Hotkey => "hotkey",
            ActionKind::Wait => "wait",
            ActionKind::Screenshot => "screenshot",
            ActionKind::MouseMoveRelative => "mouse_move_relative",
            ActionKind::MouseClickRelative => "mouse_click_relative",
            ActionKind::ImageClick => "image_click",
            ActionKind::ImageWaitClick => "image_wait_click",
            ActionKind::ImageCheck => "image_check",
            ActionKind::ActionGroupRef => "action_group_ref",
        }
    }

    /// Kinds whose target is located by template matching.
    pub fn is_image_based(self) -> bool {
        matches!(
            self,
            ActionKind::ImageClick | ActionKind::ImageWaitClick | ActionKind::ImageCheck
        )
    }

    /// Kinds whose `x`/`y` must lie in `[0, 10000]`.
    pub fn has_bounded_point(self) -> bool {
        matches!(
            self,
            ActionKind::MouseClick
                | ActionKind::MouseDoubleClick
                | ActionKind::MouseRightClick
                | ActionKind::MouseMove
        )
    }

    /// Kinds that are window-relative regardless of the action's flag.
    pub fn is_window_relative(self) -> bool {
        matches!(
            self,
            ActionKind::MouseMoveRelative | ActionKind::MouseClickRelative
        )
    }

    pub fn spec(self) -> &'static KindSpec {
        // REGISTRY is laid out in `ALL` order.
        &REGISTRY[self as usize]
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a parameter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParamType {
    Int,
    Float,
    Str,
    /// List of strings (hotkey combos).
    List,
    /// `null` or `[x, y, width, height]`.
    Region,
}

impl ParamType {
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ParamType::Int | ParamType::Float => value.is_number(),
            ParamType::Str => value.is_string(),
            ParamType::List => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            ParamType::Region => {
                value.is_null()
                    || value
                        .as_array()
                        .is_some_and(|items| items.len() == 4 && items.iter().all(Value::is_number))
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::Str => "str",
            ParamType::List => "list",
            ParamType::Region => "region",
        }
    }
}

/// Compile-time default for a parameter.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ParamDefault {
    Int(i64),
    Float(f64),
    Str(&'static str),
    EmptyList,
    Null,
}

impl ParamDefault {
    pub fn to_value(self) -> Value {
        match self {
            ParamDefault::Int(i) => Value::from(i),
            ParamDefault::Float(f) => Value::from(f),
            ParamDefault::Str(s) => Value::from(s),
            ParamDefault::EmptyList => Value::Array(Vec::new()),
            ParamDefault::Null => Value::Null,
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub ty: ParamType,
    pub default: ParamDefault,
    pub required: bool,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct KindSpec {
    pub kind: ActionKind,
    pub label: &'static str,
    pub category: &'static str,
    pub params: &'static [ParamSpec],
}

impl KindSpec {
    pub fn param(&self, name: &str) -> Option<&'static ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }
}

const fn opt(
    name: &'static str,
    ty: ParamType,
    default: ParamDefault,
    description: &'static str,
) -> ParamSpec {
    ParamSpec {
        name,
        ty,
        default,
        required: false,
        description,
    }
}

const fn req(
    name: &'static str,
    ty: ParamType,
    default: ParamDefault,
    description: &'static str,
) -> ParamSpec {
    ParamSpec {
        name,
        ty,
        default,
        required: true,
        description,
    }
}

use ParamDefault as D;
use ParamType as T;

const POINT: [ParamSpec; 2] = [
    opt("x", T::Int, D::Int(0), "X coordinate"),
    opt("y", T::Int, D::Int(0), "Y coordinate"),
];

const MOUSE: &str = "Mouse";
const KEYBOARD: &str = "Keyboard";
const CONTROL: &str = "Control";
const WINDOW: &str = "Window";
const IMAGE: &str = "Image recognition";
const FLOW: &str = "Flow";
const OTHER: &str = "Other";

pub static REGISTRY: [KindSpec; 17] = [
    KindSpec {
        kind: ActionKind::MouseClick,
        label: "Mouse click",
        category: MOUSE,
        params: &[
            POINT[0],
            POINT[1],
            opt("button", T::Str, D::Str("left"), "Mouse button (left, middle, right)"),
            opt("clicks", T::Int, D::Int(1), "Number of clicks"),
        ],
    },
    KindSpec {
        kind: ActionKind::MouseDoubleClick,
        label: "Mouse double-click",
        category: MOUSE,
        params: &POINT,
    },
    KindSpec {
        kind: ActionKind::MouseRightClick,
        label: "Mouse right-click",
        category: MOUSE,
        params: &POINT,
    },
    KindSpec {
        kind: ActionKind::MouseMove,
        label: "Mouse move",
        category: MOUSE,
        params: &[
            POINT[0],
            POINT[1],
            opt("duration", T::Float, D::Float(0.0), "Movement duration (seconds)"),
        ],
    },
    KindSpec {
        kind: ActionKind::MouseDrag,
        label: "Mouse drag",
        category: MOUSE,
        params: &[
            opt("start_x", T::Int, D::Int(0), "Start X coordinate"),
            opt("start_y", T::Int, D::Int(0), "Start Y coordinate"),
            opt("end_x", T::Int, D::Int(0), "End X coordinate"),
            opt("end_y", T::Int, D::Int(0), "End Y coordinate"),
            opt("duration", T::Float, D::Float(0.5), "Drag duration (seconds)"),
        ],
    },
    KindSpec {
        kind: ActionKind::MouseScroll,
        label: "Mouse scroll",
        category: MOUSE,
        params: &[
            opt("clicks", T::Int, D::Int(0), "Scroll amount (positive up, negative down)"),
            POINT[0],
            POINT[1],
        ],
    },
    KindSpec {
        kind: ActionKind::KeyPress,
        label: "Key press",
        category: KEYBOARD,
        params: &[opt("key", T::Str, D::Str(""), "Key name")],
    },
    KindSpec {
        kind: ActionKind::KeyType,
        label: "Type text",
        category: KEYBOARD,
        params: &[
            opt("text", T::Str, D::Str(""), "Text to type"),
            opt("interval", T::Float, D::Float(0.0), "Delay between keystrokes (seconds)"),
        ],
    },
    KindSpec {
        kind: ActionKind::Hotkey,
        label: "Hotkey",
        category: KEYBOARD,
        params: &[opt("keys", T::List, D::EmptyList, "Keys pressed together")],
    },
    KindSpec {
        kind: ActionKind::Wait,
        label: "Wait",
        category: CONTROL,
        params: &[opt("seconds", T::Float, D::Float(1.0), "Wait time (seconds)")],
    },
    KindSpec {
        kind: ActionKind::Screenshot,
        label: "Screenshot",
        category: OTHER,
        params: &[
            opt("filename", T::Str, D::Str("screenshot.png"), "Output file"),
            opt("region", T::Region, D::Null, "Capture region (x, y, width, height)"),
        ],
    },
    KindSpec {
        kind: ActionKind::MouseMoveRelative,
        label: "Move in window",
        category: WINDOW,
        params: &[
            opt("x", T::Int, D::Int(0), "X relative to the window"),
            opt("y", T::Int, D::Int(0), "Y relative to the window"),
            opt("duration", T::Float, D::Float(0.0), "Movement duration (seconds)"),
        ],
    },
    KindSpec {
        kind: ActionKind::MouseClickRelative,
        label: "Click in window",
        category: WINDOW,
        params: &[
            opt("x", T::Int, D::Int(0), "X relative to the window"),
            opt("y", T::Int, D::Int(0), "Y relative to the window"),
        ],
    },
    KindSpec {
        kind: ActionKind::ImageClick,
        label: "Click image",
        category: IMAGE,
        params: &[
            req("image_path", T::Str, D::Str(""), "Template image path"),
            opt("confidence", T::Float, D::Float(0.9), "Match confidence (0-1)"),
        ],
    },
    KindSpec {
        kind: ActionKind::ImageWaitClick,
        label: "Wait for image and click",
        category: IMAGE,
        params: &[
            req("image_path", T::Str, D::Str(""), "Template image path"),
            opt("confidence", T::Float, D::Float(0.9), "Match confidence (0-1)"),
            opt("timeout", T::Float, D::Float(10.0), "Timeout (seconds)"),
        ],
    },
    KindSpec {
        kind: ActionKind::ImageCheck,
        label: "Check image",
        category: IMAGE,
        params: &[
            req("image_path", T::Str, D::Str(""), "Template image path"),
            opt("confidence", T::Float, D::Float(0.9), "Match confidence (0-1)"),
        ],
    },
    KindSpec {
        kind: ActionKind::ActionGroupRef,
        label: "Action group",
        category: FLOW,
        params: &[req("group_name", T::Str, D::Str(""), "Referenced group name")],
    },
];

/// Default parameter map for a kind, as an editor would create it.
pub fn default_params(kind: ActionKind) -> Params {
    kind.spec()
        .params
        .iter()
        .map(|p| (p.name.to_string(), p.default.to_value()))
        .collect()
}

/// Kinds grouped by category, in registry order within each category.
pub fn categories() -> BTreeMap<&'static str, Vec<ActionKind>> {
    let mut out: BTreeMap<&'static str, Vec<ActionKind>> = BTreeMap::new();
    for spec in &REGISTRY {
        out.entry(spec.category).or_default().push(spec.kind);
    }
    out
}
