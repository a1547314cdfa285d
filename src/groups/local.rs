use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use serde_json::Value;
use tracing::{debug, warn};

use super::{ActionGroup, GlobalGroups};
use crate::actions::Action;
use crate::error::ValidationError;

/// Document-bound, in-memory group scope.
///
/// Every read hands out a clone and every write stores one, so no caller
/// ever shares a group's actions with the store.
#[derive(Debug, Default)]
pub struct LocalGroups {
    groups: RwLock<BTreeMap<String, ActionGroup>>,
}

impl LocalGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<ActionGroup> {
        self.read().get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Store `group` under its name after validating it. Saving an existing
    /// name replaces the earlier group.
    pub fn save(&self, group: ActionGroup) -> Result<(), ValidationError> {
        group.validate()?;
        debug!(target: "replaybot::groups", group = %group.name, scope = "local", "save");
        self.write().insert(group.name.clone(), group);
        Ok(())
    }

    pub fn delete(&self, name: &str) -> bool {
        self.write().remove(name).is_some()
    }

    /// Build a group from copies of `actions` and save it.
    pub fn create_from_actions(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        actions: &[Action],
    ) -> Result<ActionGroup, ValidationError> {
        let group = ActionGroup::new(name, actions.to_vec()).with_description(description);
        self.save(group.clone())?;
        Ok(group)
    }

    /// Deep copies of the group's actions; empty when the group is unknown.
    pub fn actions_copy(&self, name: &str) -> Vec<Action> {
        self.get(name).map(|g| g.actions).unwrap_or_default()
    }

    pub fn all(&self) -> Vec<ActionGroup> {
        self.read().values().cloned().collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Name → group JSON, the shape stored in a document's group maps.
    pub fn to_map(&self) -> BTreeMap<String, ActionGroup> {
        self.read().clone()
    }

    /// Replace the scope's contents with the groups in `data` (a JSON object
    /// of name → group). Entries that fail to parse or validate are skipped.
    /// Returns `(loaded, failed)`.
    pub fn load_from_map(&self, data: &serde_json::Map<String, Value>) -> (usize, usize) {
        let mut loaded = BTreeMap::new();
        let mut failed = 0;
        for (name, raw) in data {
            let group = match serde_json::from_value::<ActionGroup>(raw.clone()) {
                Ok(group) => group,
                Err(err) => {
                    warn!(target: "replaybot::groups", group = %name, error = %err, "failed to parse action group");
                    failed += 1;
                    continue;
                }
            };
            if let Err(err) = group.validate() {
                warn!(target: "replaybot::groups", group = %name, error = %err, "skipping invalid action group");
                failed += 1;
                continue;
            }
            if group.name != *name {
                warn!(
                    target: "replaybot::groups",
                    key = %name, group = %group.name,
                    "group stored under a different key; using its own name"
                );
            }
            loaded.insert(group.name.clone(), group);
        }
        let count = loaded.len();
        *self.write() = loaded;
        debug!(target: "replaybot::groups", loaded = count, failed, scope = "local", "groups loaded");
        (count, failed)
    }

    /// The group called `name`, importing and caching a deep copy from
    /// `fallback` when it is not in this scope yet.
    pub fn ensure_available(
        &self,
        name: &str,
        fallback: Option<&GlobalGroups>,
    ) -> Option<ActionGroup> {
        if let Some(group) = self.get(name) {
            return Some(group);
        }
        let group = fallback?.get(name)?;
        debug!(target: "replaybot::groups", group = %name, "caching global group in local scope");
        // Another resolver may have cached it in between; keep the first copy.
        let mut groups = self.write();
        Some(groups.entry(name.to_string()).or_insert(group).clone())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, ActionGroup>> {
        self.groups.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, ActionGroup>> {
        self.groups.write().unwrap_or_else(PoisonError::into_inner)
    }
}
