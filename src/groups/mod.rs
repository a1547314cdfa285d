//! Action groups: named, reusable action sequences.
//!
//! Groups live in two scopes:
//! - `LocalGroups`: bound to one open document, memory only.
//! - `GlobalGroups`: shared, persisted as one JSON file per group.
//!
//! A `GroupResolver` looks names up Local-first, then Global. A hit in
//! Global is cached into Local as a deep copy, so a document keeps resolving
//! to the same definition even if the shared one changes later.

use std::collections::BTreeSet;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::actions::Action;
use crate::error::ValidationError;

pub mod global;
pub mod local;

pub use global::GlobalGroups;
pub use local::LocalGroups;

/// A named, ordered list of actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActionGroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl ActionGroup {
    pub fn new(name: impl Into<String>, actions: Vec<Action>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            actions,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Name non-empty, at least one action, every action valid. The error
    /// carries the index of the first failing action.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("action group name cannot be empty"));
        }
        if self.actions.is_empty() {
            return Err(ValidationError::new(
                "action group must contain at least one action",
            ));
        }
        for (i, action) in self.actions.iter().enumerate() {
            action.validate().map_err(|e| e.at(i))?;
        }
        Ok(())
    }

    /// Names of groups referenced directly by this group's actions.
    pub fn dependencies(&self) -> BTreeSet<String> {
        self.actions
            .iter()
            .filter_map(|a| a.group_ref())
            .map(str::to_string)
            .collect()
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }
}

/// Local-then-Global name lookup used while executing group references.
#[derive(Clone)]
pub struct GroupResolver {
    local: Arc<LocalGroups>,
    global: Option<Arc<GlobalGroups>>,
}

impl GroupResolver {
    pub fn new(local: Arc<LocalGroups>, global: Option<Arc<GlobalGroups>>) -> Self {
        Self { local, global }
    }

    pub fn local(&self) -> &Arc<LocalGroups> {
        &self.local
    }

    pub fn global(&self) -> Option<&Arc<GlobalGroups>> {
        self.global.as_ref()
    }

    /// Snapshot of the group called `name`.
    ///
    /// The returned copy is what a running reference executes; edits or
    /// deletions made while it runs only affect later lookups.
    pub fn resolve(&self, name: &str) -> Option<ActionGroup> {
        let group = self.local.ensure_available(name, self.global.as_deref());
        trace!(target: "replaybot::groups", group = %name, found = group.is_some(), "resolve");
        group
    }

    /// Deep copies of the group's actions, tagged with the group they came from.
    pub fn expand(&self, name: &str) -> Option<Vec<Action>> {
        let group = self.resolve(name)?;
        Some(
            group
                .actions
                .into_iter()
                .map(|mut action| {
                    action.set_origin_group(Some(group.name.clone()));
                    action
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionKind;
    use crate::testing::{click, group_ref};

    #[test]
    fn validate_reports_first_failing_index() {
        assert!(ActionGroup::new("", vec![click(1, 1)]).validate().is_err());
        assert!(ActionGroup::new("  ", vec![click(1, 1)]).validate().is_err());
        assert!(ActionGroup::new("g", vec![]).validate().is_err());

        let bad = ActionGroup::new(
            "g",
            vec![click(1, 1), click(2, 2), click(1, 99_999)],
        );
        let err = bad.validate().unwrap_err();
        assert_eq!(err.index, Some(2));
        assert!(err.to_string().starts_with("action 3 is invalid"), "{err}");

        assert!(ActionGroup::new("g", vec![click(1, 1)]).validate().is_ok());
    }

    #[test]
    fn dependencies_are_direct_references() {
        let g = ActionGroup::new(
            "outer",
            vec![group_ref("b"), click(1, 1), group_ref("a"), group_ref("b")],
        );
        let deps: Vec<_> = g.dependencies().into_iter().collect();
        assert_eq!(deps, vec!["a", "b"]);
        assert_eq!(g.action_count(), 4);
    }

    #[test]
    fn group_json_shape() {
        let g = ActionGroup::new("login", vec![click(5, 6)]).with_description("sign in");
        let v = serde_json::to_value(&g).unwrap();
        assert_eq!(v["name"], "login");
        assert_eq!(v["description"], "sign in");
        assert_eq!(v["actions"][0]["action_type"], "mouse_click");
        let back: ActionGroup = serde_json::from_value(v).unwrap();
        assert_eq!(back, g);
    }

    #[test]
    fn expand_tags_provenance_with_deep_copies() {
        let local = Arc::new(LocalGroups::new());
        local
            .save(ActionGroup::new("g", vec![click(1, 1)]))
            .unwrap();
        let resolver = GroupResolver::new(Arc::clone(&local), None);

        let mut expanded = resolver.expand("g").unwrap();
        assert_eq!(expanded[0].origin_group(), Some("g"));
        expanded[0].set_param("x", 999);
        assert_eq!(local.get("g").unwrap().actions[0].param_i32("x"), Some(1));

        let v = serde_json::to_value(&expanded[0]).unwrap();
        assert_eq!(v["_is_from_group"], true);
        assert_eq!(v["_group_name"], "g");
        assert!(resolver.expand("missing").is_none());
    }

    #[test]
    fn resolve_prefers_local_then_caches_global() {
        let dir = tempfile::tempdir().unwrap();
        let global = Arc::new(GlobalGroups::open(dir.path()).unwrap());
        global
            .save(ActionGroup::new("shared", vec![click(1, 1)]).with_description("global"))
            .unwrap();
        global
            .save(ActionGroup::new("both", vec![click(1, 1)]).with_description("global"))
            .unwrap();

        let local = Arc::new(LocalGroups::new());
        local
            .save(ActionGroup::new("both", vec![click(2, 2)]).with_description("local"))
            .unwrap();

        let resolver = GroupResolver::new(Arc::clone(&local), Some(Arc::clone(&global)));
        assert_eq!(resolver.resolve("both").unwrap().description, "local");
        assert!(!local.has("shared"));
        assert_eq!(resolver.resolve("shared").unwrap().description, "global");
        assert!(local.has("shared"));

        // Later global edits do not leak into the cached local copy.
        global
            .save(
                ActionGroup::new("shared", vec![Action::new(ActionKind::Wait)])
                    .with_description("changed"),
            )
            .unwrap();
        assert_eq!(resolver.resolve("shared").unwrap().description, "global");
    }
}
