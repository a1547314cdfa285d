use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use super::ActionGroup;
use crate::actions::Action;
use crate::error::{GroupError, PersistenceError, ValidationError};

/// Shared group scope persisted as one pretty-printed JSON file per group.
///
/// Lookups that miss the in-memory map fall through to the group's file
/// before reporting not-found.
#[derive(Debug)]
pub struct GlobalGroups {
    dir: PathBuf,
    groups: RwLock<BTreeMap<String, ActionGroup>>,
}

impl GlobalGroups {
    /// `<home>/.replaybot/groups`.
    pub fn default_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".replaybot")
            .join("groups")
    }

    /// Open (creating if needed) the group directory and load every group in it.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| PersistenceError::io(&dir, e))?;
        let this = Self {
            dir,
            groups: RwLock::new(BTreeMap::new()),
        };
        this.reload();
        Ok(this)
    }

    pub fn open_default() -> Result<Self, PersistenceError> {
        Self::open(Self::default_dir())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Discard the in-memory map and re-read the directory.
    /// Returns `(loaded, failed)`.
    pub fn reload(&self) -> (usize, usize) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(target: "replaybot::groups", dir = %self.dir.display(), error = %err, "cannot read group directory");
                self.write().clear();
                return (0, 0);
            }
        };

        let mut loaded = BTreeMap::new();
        let mut failed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match read_group(&path) {
                Ok(group) => {
                    loaded.insert(group.name.clone(), group);
                }
                Err(err) => {
                    warn!(target: "replaybot::groups", path = %path.display(), error = %err, "skipping group file");
                    failed += 1;
                }
            }
        }
        let count = loaded.len();
        *self.write() = loaded;
        info!(target: "replaybot::groups", dir = %self.dir.display(), loaded = count, failed, "global groups loaded");
        (count, failed)
    }

    pub fn get(&self, name: &str) -> Option<ActionGroup> {
        if let Some(group) = self.read().get(name) {
            return Some(group.clone());
        }
        self.ensure_loaded(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Load `name` from its file into memory if it is not there yet.
    pub fn ensure_loaded(&self, name: &str) -> Option<ActionGroup> {
        if let Some(group) = self.read().get(name) {
            return Some(group.clone());
        }
        let path = self.path_for(name);
        if !path.is_file() {
            return None;
        }
        match read_group(&path) {
            Ok(group) => {
                trace!(target: "replaybot::groups", group = %name, "lazily loaded from disk");
                self.write().insert(name.to_string(), group.clone());
                Some(group)
            }
            Err(err) => {
                warn!(target: "replaybot::groups", group = %name, error = %err, "failed to load group file");
                None
            }
        }
    }

    /// Validate, write the group's file, then store it in memory.
    pub fn save(&self, group: ActionGroup) -> Result<(), GroupError> {
        group.validate()?;
        let path = self.path_for(&group.name);
        let json = serde_json::to_string_pretty(&group)
            .map_err(|e| PersistenceError::json(&path, e))?;
        fs::write(&path, json).map_err(|e| PersistenceError::io(&path, e))?;
        debug!(target: "replaybot::groups", group = %group.name, path = %path.display(), "saved global group");
        self.write().insert(group.name.clone(), group);
        Ok(())
    }

    /// Remove the group from memory and disk. `Ok(false)` when it existed in neither.
    pub fn delete(&self, name: &str) -> Result<bool, GroupError> {
        let in_memory = self.write().remove(name).is_some();
        let path = self.path_for(name);
        let on_disk = path.is_file();
        if on_disk {
            fs::remove_file(&path).map_err(|e| PersistenceError::io(&path, e))?;
            debug!(target: "replaybot::groups", group = %name, "deleted global group");
        }
        Ok(in_memory || on_disk)
    }

    pub fn create_from_actions(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        actions: &[Action],
    ) -> Result<ActionGroup, GroupError> {
        let group = ActionGroup::new(name, actions.to_vec()).with_description(description);
        self.save(group.clone())?;
        Ok(group)
    }

    pub fn actions_copy(&self, name: &str) -> Vec<Action> {
        self.get(name).map(|g| g.actions).unwrap_or_default()
    }

    pub fn all(&self) -> Vec<ActionGroup> {
        self.read().values().cloned().collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Import a group from its JSON object. Refuses an existing name unless
    /// `overwrite` is set.
    pub fn import_group(&self, data: Value, overwrite: bool) -> Result<ActionGroup, GroupError> {
        let group: ActionGroup = serde_json::from_value(data).map_err(|e| {
            GroupError::Invalid(ValidationError::new(format!("malformed action group: {e}")))
        })?;
        group.validate()?;
        if !overwrite && self.has(&group.name) {
            return Err(GroupError::Exists(group.name));
        }
        self.save(group.clone())?;
        info!(target: "replaybot::groups", group = %group.name, overwrite, "imported action group");
        Ok(group)
    }

    /// Watch the group directory and reload whenever a file is created,
    /// modified or removed. Watching stops when the returned watcher is
    /// dropped or the store itself is dropped.
    pub fn watch(self: &Arc<Self>) -> notify::Result<RecommendedWatcher> {
        let store = Arc::downgrade(self);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    return;
                }
                if let Some(store) = store.upgrade() {
                    trace!(target: "replaybot::groups", paths = ?event.paths, "group directory changed");
                    store.reload();
                }
            }
            Err(err) => {
                warn!(target: "replaybot::groups", error = %err, "group directory watch error");
            }
        })?;
        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;
        Ok(watcher)
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(name)))
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, ActionGroup>> {
        self.groups.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, ActionGroup>> {
        self.groups.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// File stem for a group name. Alphanumerics (any script) and `-` are kept;
/// every other UTF-8 byte is written as `_XX`, so distinct names never share
/// a file.
fn file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() || c == '-' {
            stem.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                stem.push_str(&format!("_{byte:02X}"));
            }
        }
    }
    if stem.is_empty() {
        stem.push('_');
    }
    stem
}

fn read_group(path: &Path) -> Result<ActionGroup, GroupError> {
    let bytes = fs::read(path).map_err(|e| PersistenceError::io(path, e))?;
    let group: ActionGroup =
        serde_json::from_slice(&bytes).map_err(|e| PersistenceError::json(path, e))?;
    group.validate()?;
    Ok(group)
}
