//! The action model.
//!
//! An `Action` is one typed, parameterized automation step. Fields are
//! private so the derived description can never go stale: every setter that
//! touches an input of [`derive_description`] recomputes it, unless the
//! description was set explicitly.
//!
//! On the wire an action is an [`ActionRecord`]; `Action` converts to and
//! from it through serde.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::executor::Point;
use crate::variables::VariableStore;

pub mod condition;
pub mod description;
pub mod kind;

pub use description::derive_description;
pub use kind::{ActionKind, KindSpec, ParamSpec, ParamType, categories, default_params};

/// Parameter map of an action. Keys and value shapes are declared per kind
/// in [`kind::REGISTRY`].
pub type Params = BTreeMap<String, Value>;

/// Inclusive bound for absolute click/move coordinates.
pub const MAX_COORDINATE: f64 = 10_000.0;

/// JSON shape of an action inside a script document or a group file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActionRecord {
    /// Action kind, e.g. `"mouse_click"`.
    pub action_type: ActionKind,
    /// Kind-specific parameters.
    #[serde(default)]
    pub params: Params,
    /// Human-readable description. Empty means "derive it".
    #[serde(default)]
    pub description: String,
    /// Seconds to wait before the effect.
    #[serde(default)]
    pub delay_before: f64,
    /// Seconds to wait after the effect.
    #[serde(default)]
    pub delay_after: f64,
    /// Title of the window the action was recorded against.
    #[serde(default)]
    pub window_title: Option<String>,
    /// Translate coordinates by the target window's offset.
    #[serde(default)]
    pub use_relative_coords: bool,
    /// Optional user label.
    #[serde(default)]
    pub name: String,
    /// Guard condition (see the condition grammar).
    #[serde(default)]
    pub condition: String,
    /// Number of repetitions; values below 1 are read as 1.
    #[serde(default = "default_repeat_count")]
    pub repeat_count: i64,
    /// Set when the action was materialized from a group expansion.
    #[serde(default, rename = "_is_from_group", skip_serializing_if = "is_false")]
    pub is_from_group: bool,
    /// Group the action was materialized from.
    #[serde(default, rename = "_group_name", skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
}

fn default_repeat_count() -> i64 {
    1
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// One automation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ActionRecord", into = "ActionRecord")]
pub struct Action {
    kind: ActionKind,
    params: Params,
    description: String,
    custom_description: bool,
    delay_before: f64,
    delay_after: f64,
    window_title: Option<String>,
    window_relative: bool,
    name: String,
    condition: String,
    repeat_count: u32,
    origin_group: Option<String>,
}

impl Action {
    /// New action with the kind's default parameters.
    pub fn new(kind: ActionKind) -> Self {
        Self::with_params(kind, default_params(kind))
    }

    pub fn with_params(kind: ActionKind, params: Params) -> Self {
        let mut action = Self {
            kind,
            params,
            description: String::new(),
            custom_description: false,
            delay_before: 0.0,
            delay_after: 0.0,
            window_title: None,
            window_relative: false,
            name: String::new(),
            condition: String::new(),
            repeat_count: 1,
            origin_group: None,
        };
        action.refresh_description();
        action
    }

    // --- construction helpers ---

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set_param(key, value);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.set_name(name);
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.set_condition(condition);
        self
    }

    pub fn with_delay_before(mut self, seconds: f64) -> Self {
        self.set_delay_before(seconds);
        self
    }

    pub fn with_delay_after(mut self, seconds: f64) -> Self {
        self.set_delay_after(seconds);
        self
    }

    pub fn with_repeat_count(mut self, count: i64) -> Self {
        self.set_repeat_count(count);
        self
    }

    pub fn with_window_relative(mut self, relative: bool) -> Self {
        self.set_window_relative(relative);
        self
    }

    // --- accessors ---

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key).filter(|v| !v.is_null())
    }

    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.param(key).and_then(Value::as_f64)
    }

    /// Integer parameter; floats are rounded.
    pub fn param_i32(&self, key: &str) -> Option<i32> {
        let v = self.param(key)?;
        match v.as_i64() {
            Some(i) => i32::try_from(i).ok(),
            None => v.as_f64().map(|f| f.round() as i32),
        }
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.param(key).and_then(Value::as_str)
    }

    pub fn param_strings(&self, key: &str) -> Vec<String> {
        self.param(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn has_custom_description(&self) -> bool {
        self.custom_description
    }

    pub fn delay_before(&self) -> Duration {
        crate::utils::sleep::secs(self.delay_before)
    }

    pub fn delay_after(&self) -> Duration {
        crate::utils::sleep::secs(self.delay_after)
    }

    pub fn window_title(&self) -> Option<&str> {
        self.window_title.as_deref()
    }

    /// Whether coordinates get translated by a window offset.
    pub fn is_window_relative(&self) -> bool {
        self.window_relative || self.kind.is_window_relative()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn condition(&self) -> &str {
        &self.condition
    }

    pub fn repeat_count(&self) -> u32 {
        self.repeat_count
    }

    /// Group this action was materialized from, if any.
    pub fn origin_group(&self) -> Option<&str> {
        self.origin_group.as_deref()
    }

    /// Target group of an `action_group_ref`.
    pub fn group_ref(&self) -> Option<&str> {
        match self.kind {
            ActionKind::ActionGroupRef => self.param_str("group_name").filter(|n| !n.is_empty()),
            _ => None,
        }
    }

    // --- mutation ---

    /// Switch kind; parameters are reset to the new kind's defaults.
    pub fn set_kind(&mut self, kind: ActionKind) {
        if kind != self.kind {
            self.kind = kind;
            self.params = default_params(kind);
            self.refresh_description();
        }
    }

    pub fn set_params(&mut self, params: Params) {
        self.params = params;
        self.refresh_description();
    }

    pub fn set_param(&mut self, key: &str, value: impl Into<Value>) {
        self.params.insert(key.to_string(), value.into());
        self.refresh_description();
    }

    /// Edit parameters in place; the description is refreshed afterwards.
    pub fn update_params(&mut self, f: impl FnOnce(&mut Params)) {
        f(&mut self.params);
        self.refresh_description();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.refresh_description();
    }

    pub fn set_condition(&mut self, condition: impl Into<String>) {
        self.condition = condition.into();
    }

    /// Negative or non-finite values are stored as zero.
    pub fn set_delay_before(&mut self, seconds: f64) {
        self.delay_before = non_negative(seconds);
        self.refresh_description();
    }

    pub fn set_delay_after(&mut self, seconds: f64) {
        self.delay_after = non_negative(seconds);
    }

    /// Stores `max(1, count)`.
    pub fn set_repeat_count(&mut self, count: i64) {
        self.repeat_count = u32::try_from(count.max(1)).unwrap_or(u32::MAX);
        self.refresh_description();
    }

    pub fn set_window_title(&mut self, title: Option<String>) {
        self.window_title = title;
    }

    pub fn set_window_relative(&mut self, relative: bool) {
        self.window_relative = relative;
    }

    /// `Some` pins a custom description; `None` goes back to the derived one.
    pub fn set_description(&mut self, description: Option<String>) {
        match description {
            Some(text) if !text.is_empty() => {
                self.description = text;
                self.custom_description = true;
            }
            _ => {
                self.custom_description = false;
                self.refresh_description();
            }
        }
    }

    pub fn set_origin_group(&mut self, group: Option<String>) {
        self.origin_group = group;
    }

    pub fn derived_description(&self) -> String {
        derive_description(
            self.kind,
            &self.params,
            &self.name,
            self.delay_before,
            self.repeat_count,
        )
    }

    fn refresh_description(&mut self) {
        if !self.custom_description {
            self.description = self.derived_description();
        }
    }

    // --- behavior ---

    /// Structural validation; touches the filesystem only to check image paths.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let spec = self.kind.spec();
        for p in spec.params {
            match self.params.get(p.name) {
                None | Some(Value::Null) if p.required => {
                    return Err(ValidationError::new(format!(
                        "missing required parameter '{}'",
                        p.name
                    )));
                }
                Some(v) if !v.is_null() && !p.ty.accepts(v) => {
                    return Err(ValidationError::new(format!(
                        "parameter '{}' must be of type {}",
                        p.name,
                        p.ty.name()
                    )));
                }
                _ => {}
            }
        }

        if self.kind.is_image_based() {
            let path = self.param_str("image_path").unwrap_or_default();
            if path.trim().is_empty() {
                return Err(ValidationError::new("image path is not set"));
            }
            if !Path::new(path).exists() {
                return Err(ValidationError::new(format!(
                    "image file does not exist: {path}"
                )));
            }
        }

        if self.kind == ActionKind::Wait && self.param_f64("seconds").unwrap_or(0.0) < 0.0 {
            return Err(ValidationError::new("wait time cannot be negative"));
        }

        if self.kind.has_bounded_point() {
            for axis in ["x", "y"] {
                match self.param_f64(axis) {
                    Some(v) if !(0.0..=MAX_COORDINATE).contains(&v) => {
                        return Err(ValidationError::new(format!(
                            "{} coordinate out of range: {v}",
                            axis.to_uppercase()
                        )));
                    }
                    _ => {}
                }
            }
        }

        let has_target = self.group_ref().is_some_and(|n| !n.trim().is_empty());
        if self.kind == ActionKind::ActionGroupRef && !has_target {
            return Err(ValidationError::new("no action group name given"));
        }

        Ok(())
    }

    /// Evaluate the guard condition against the variable store.
    pub fn evaluate_condition(&self, store: &VariableStore) -> bool {
        condition::evaluate(&self.condition, store)
    }

    /// Variable name an `image_check` writes its result to.
    pub fn condition_marker(&self) -> Option<String> {
        match self.kind {
            ActionKind::ImageCheck => marker_for_image(self.param_str("image_path")?),
            _ => None,
        }
    }

    /// `(x_key, y_key)` as a point, translated by `offset` when the action is
    /// window-relative. `None` when either coordinate is unset.
    pub fn point(&self, x_key: &str, y_key: &str, offset: Option<Point>) -> Option<Point> {
        let x = self.param_i32(x_key)?;
        let y = self.param_i32(y_key)?;
        Some(self.translate((x, y), offset))
    }

    pub fn translate(&self, (x, y): Point, offset: Option<Point>) -> Point {
        match offset {
            Some((dx, dy)) if self.is_window_relative() => {
                (x.saturating_add(dx), y.saturating_add(dy))
            }
            _ => (x, y),
        }
    }
}

/// Marker name for an image file: its stem with spaces and hyphens replaced.
pub fn marker_for_image(path: &str) -> Option<String> {
    let stem = Path::new(path).file_stem()?.to_string_lossy();
    let marker = stem.replace([' ', '-'], "_");
    (!marker.is_empty()).then_some(marker)
}

fn non_negative(seconds: f64) -> f64 {
    if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    }
}

impl From<ActionRecord> for Action {
    fn from(r: ActionRecord) -> Self {
        let mut action = Action {
            kind: r.action_type,
            params: r.params,
            description: String::new(),
            custom_description: false,
            delay_before: non_negative(r.delay_before),
            delay_after: non_negative(r.delay_after),
            window_title: r.window_title,
            window_relative: r.use_relative_coords,
            name: r.name,
            condition: r.condition,
            repeat_count: 1,
            origin_group: r
                .is_from_group
                .then(|| r.group_name.unwrap_or_default()),
        };
        action.repeat_count = u32::try_from(r.repeat_count.max(1)).unwrap_or(u32::MAX);
        // A stored description equal to the derived one is not a customization.
        let derived = action.derived_description();
        if r.description.is_empty() || r.description == derived {
            action.description = derived;
        } else {
            action.description = r.description;
            action.custom_description = true;
        }
        action
    }
}

impl From<Action> for ActionRecord {
    fn from(a: Action) -> Self {
        ActionRecord {
            action_type: a.kind,
            params: a.params,
            description: a.description,
            delay_before: a.delay_before,
            delay_after: a.delay_after,
            window_title: a.window_title,
            use_relative_coords: a.window_relative,
            name: a.name,
            condition: a.condition,
            repeat_count: i64::from(a.repeat_count),
            is_from_group: a.origin_group.is_some(),
            group_name: a.origin_group,
        }
    }
}

impl JsonSchema for Action {
    fn schema_name() -> std::borrow::Cow<'static, str> {
        ActionRecord::schema_name()
    }

    fn json_schema(generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
        ActionRecord::json_schema(generator)
    }
}
