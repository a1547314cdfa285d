//! Script documents: JSON export and import.
//!
//! Export embeds everything a script needs to replay on another machine:
//! the groups it references (transitively, each once), the document's local
//! group scope, and the image files its image actions point at.
//!
//! Import reverses that: images are decoded next to the document, image
//! paths are rewritten to the decoded copies, and groups are loaded into the
//! target local scope before the actions are returned, so references
//! resolve immediately.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::actions::Action;
use crate::config::{DOCUMENT_VERSION, ScriptDocument};
use crate::error::PersistenceError;
use crate::groups::{ActionGroup, GroupResolver, LocalGroups};
use crate::utils::images::{decode_to_file, embed_key, encode_file, sanitize_file_name};

/// Descriptive fields of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptInfo {
    pub name: String,
    pub author: String,
    pub description: String,
}

/// Result of importing a document.
#[derive(Debug, Clone)]
pub struct ImportedScript {
    pub info: ScriptInfo,
    pub created: String,
    pub actions: Vec<Action>,
    /// Groups loaded into the local scope / entries that were skipped.
    pub groups_loaded: usize,
    pub groups_failed: usize,
    /// Embedded images written to disk.
    pub images: usize,
}

/// Builds documents from an action list, resolving groups through `groups`.
pub struct Exporter<'a> {
    groups: &'a GroupResolver,
    info: ScriptInfo,
}

impl<'a> Exporter<'a> {
    pub fn new(groups: &'a GroupResolver) -> Self {
        Self {
            groups,
            info: ScriptInfo::default(),
        }
    }

    pub fn with_info(mut self, info: ScriptInfo) -> Self {
        self.info = info;
        self
    }

    pub fn export(&self, actions: &[Action]) -> Result<ScriptDocument, PersistenceError> {
        let mut used = self.collect_groups(actions);
        let mut local = self.groups.local().to_map();
        let mut actions = actions.to_vec();

        let mut images = ImageEmbedder::default();
        images.embed_all(&mut actions)?;
        for group in used.values_mut().chain(local.values_mut()) {
            images.embed_all(&mut group.actions)?;
        }

        let doc = ScriptDocument {
            name: self.info.name.clone(),
            author: self.info.author.clone(),
            description: self.info.description.clone(),
            created: Utc::now().to_rfc3339(),
            version: DOCUMENT_VERSION.to_string(),
            actions,
            action_groups: to_json_map(&used)?,
            local_action_groups: if local.is_empty() {
                None
            } else {
                Some(to_json_map(&local)?)
            },
            embedded_images: images.embedded,
        };
        debug!(
            target: "replaybot::document",
            actions = doc.actions.len(),
            groups = doc.action_groups.len(),
            images = doc.embedded_images.len(),
            "document exported"
        );
        Ok(doc)
    }

    /// Export and write pretty JSON to `path`.
    pub fn export_to_path(
        &self,
        actions: &[Action],
        path: &Path,
    ) -> Result<ScriptDocument, PersistenceError> {
        let doc = self.export(actions)?;
        save_document(&doc, path)?;
        info!(target: "replaybot::document", path = %path.display(), "document saved");
        Ok(doc)
    }

    /// Groups referenced from `actions`, following references inside
    /// groups. Unresolvable names are logged and left out.
    fn collect_groups(&self, actions: &[Action]) -> BTreeMap<String, ActionGroup> {
        let mut found = BTreeMap::new();
        let mut seen = HashSet::new();
        let mut pending: Vec<String> = actions
            .iter()
            .filter_map(|a| a.group_ref())
            .map(str::to_string)
            .collect();
        while let Some(name) = pending.pop() {
            if !seen.insert(name.clone()) {
                continue;
            }
            match self.groups.resolve(&name) {
                Some(group) => {
                    pending.extend(group.dependencies());
                    found.insert(name, group);
                }
                None => {
                    warn!(target: "replaybot::document", group = %name, "referenced group not found; not embedded");
                }
            }
        }
        found
    }
}

fn to_json_map(groups: &BTreeMap<String, ActionGroup>) -> Result<Map<String, Value>, PersistenceError> {
    groups
        .iter()
        .map(|(name, group)| {
            serde_json::to_value(group)
                .map(|v| (name.clone(), v))
                .map_err(|e| PersistenceError::json(name, e))
        })
        .collect()
}

/// Images embedded so far, keyed by sanitized base name, and the key chosen
/// for each source path.
#[derive(Default)]
struct ImageEmbedder {
    embedded: BTreeMap<String, String>,
    keys: HashMap<String, String>,
}

impl ImageEmbedder {
    /// Embed the image of every image action in `actions`. A file whose base
    /// name is already taken by different bytes gets a numbered key, and the
    /// action's path is renamed to that key so import maps it back.
    fn embed_all(&mut self, actions: &mut [Action]) -> Result<(), PersistenceError> {
        for action in actions.iter_mut().filter(|a| a.kind().is_image_based()) {
            let Some(path) = action
                .param_str("image_path")
                .filter(|p| !p.is_empty())
                .map(str::to_string)
            else {
                continue;
            };
            let Some(key) = self.key_for(&path)? else {
                continue;
            };
            if embed_key(&path).as_deref() != Some(key.as_str()) {
                let renamed = Path::new(&path).with_file_name(&key);
                action.set_param("image_path", renamed.to_string_lossy().into_owned());
            }
        }
        Ok(())
    }

    /// Key of the image at `path`, embedding it on first use. Missing files
    /// are logged and skipped.
    fn key_for(&mut self, path: &str) -> Result<Option<String>, PersistenceError> {
        if let Some(key) = self.keys.get(path) {
            return Ok(Some(key.clone()));
        }
        let Some(base) = embed_key(path) else {
            return Ok(None);
        };
        let file = Path::new(path);
        if !file.is_file() {
            warn!(target: "replaybot::document", path = %path, "image file missing; not embedded");
            return Ok(None);
        }
        let data = encode_file(file)?;
        let key = self.free_key(&base, &data);
        if key != base {
            debug!(target: "replaybot::document", path = %path, %key, "image name taken; renamed");
        }
        self.embedded.entry(key.clone()).or_insert(data);
        self.keys.insert(path.to_string(), key.clone());
        Ok(Some(key))
    }

    /// `base`, then `stem_2.ext`, `stem_3.ext`, ...: the first key that is
    /// free or already holds `data`.
    fn free_key(&self, base: &str, data: &str) -> String {
        let (stem, ext) = match base.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (base, None),
        };
        let mut n = 1u32;
        loop {
            let key = match (n, ext) {
                (1, _) => base.to_string(),
                (_, Some(ext)) => format!("{stem}_{n}.{ext}"),
                (_, None) => format!("{stem}_{n}"),
            };
            match self.embedded.get(&key) {
                Some(existing) if existing != data => n += 1,
                _ => return key,
            }
        }
    }
}

pub fn save_document(doc: &ScriptDocument, path: &Path) -> Result<(), PersistenceError> {
    let json = serde_json::to_string_pretty(doc).map_err(|e| PersistenceError::json(path, e))?;
    fs::write(path, json).map_err(|e| PersistenceError::io(path, e))
}

pub fn read_document(path: &Path) -> Result<ScriptDocument, PersistenceError> {
    let bytes = fs::read(path).map_err(|e| PersistenceError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| PersistenceError::json(path, e))
}

/// Read the document at `path` and import it, decoding images into
/// `<document dir>/<images_dir_name>`.
pub fn import_path(
    path: &Path,
    images_dir_name: &str,
    local: &LocalGroups,
) -> Result<ImportedScript, PersistenceError> {
    let doc = read_document(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let imported = import_document(doc, &base.join(images_dir_name), local)?;
    info!(
        target: "replaybot::document",
        path = %path.display(),
        actions = imported.actions.len(),
        groups = imported.groups_loaded,
        images = imported.images,
        "document imported"
    );
    Ok(imported)
}

/// Import `doc`: decode its images into `images_dir`, replace `local`'s
/// contents with the document's groups, and return its actions with image
/// paths rewritten.
pub fn import_document(
    doc: ScriptDocument,
    images_dir: &Path,
    local: &LocalGroups,
) -> Result<ImportedScript, PersistenceError> {
    let mut decoded: HashMap<String, PathBuf> = HashMap::new();
    for (name, data) in &doc.embedded_images {
        let target = images_dir.join(sanitize_file_name(name));
        decode_to_file(name, data, &target)?;
        decoded.insert(name.clone(), target);
    }

    let groups = match doc.local_action_groups {
        Some(local_groups) if !local_groups.is_empty() => local_groups,
        _ => doc.action_groups,
    };
    let groups: Map<String, Value> = groups
        .into_iter()
        .map(|(name, mut raw)| {
            rewrite_group_images(&mut raw, &decoded);
            (name, raw)
        })
        .collect();
    let (groups_loaded, groups_failed) = local.load_from_map(&groups);

    let mut actions = doc.actions;
    for action in &mut actions {
        rewrite_image_path(action, &decoded);
    }

    Ok(ImportedScript {
        info: ScriptInfo {
            name: doc.name,
            author: doc.author,
            description: doc.description,
        },
        created: doc.created,
        actions,
        groups_loaded,
        groups_failed,
        images: decoded.len(),
    })
}

fn rewrite_image_path(action: &mut Action, decoded: &HashMap<String, PathBuf>) {
    if !action.kind().is_image_based() {
        return;
    }
    let Some(target) = action
        .param_str("image_path")
        .and_then(embed_key)
        .and_then(|key| decoded.get(&key))
    else {
        return;
    };
    let target = target.to_string_lossy().into_owned();
    action.set_param("image_path", target);
}

/// Rewrite image paths inside a raw group object before it is parsed.
fn rewrite_group_images(raw: &mut Value, decoded: &HashMap<String, PathBuf>) {
    let Some(actions) = raw.get_mut("actions").and_then(Value::as_array_mut) else {
        return;
    };
    for action in actions {
        let Ok(mut parsed) = serde_json::from_value::<Action>(action.clone()) else {
            continue;
        };
        rewrite_image_path(&mut parsed, decoded);
        if let Ok(value) = serde_json::to_value(&parsed) {
            *action = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionKind;
    use crate::groups::GlobalGroups;
    use crate::testing::{click, group_ref};
    use std::sync::Arc;

    fn image_action(kind: ActionKind, path: &Path) -> Action {
        Action::new(kind).with_param("image_path", path.to_string_lossy().into_owned())
    }

    #[test]
    fn export_collects_groups_transitively() {
        let dir = tempfile::tempdir().unwrap();
        let global = Arc::new(GlobalGroups::open(dir.path()).unwrap());
        global
            .save(ActionGroup::new("leaf", vec![click(1, 1)]))
            .unwrap();
        global
            .save(ActionGroup::new("mid", vec![group_ref("leaf"), group_ref("leaf")]))
            .unwrap();
        global
            .save(ActionGroup::new("unused", vec![click(9, 9)]))
            .unwrap();

        let local = Arc::new(LocalGroups::new());
        let resolver = GroupResolver::new(Arc::clone(&local), Some(global));
        let doc = Exporter::new(&resolver)
            .with_info(ScriptInfo {
                name: "demo".into(),
                ..ScriptInfo::default()
            })
            .export(&[group_ref("mid"), group_ref("ghost")])
            .unwrap();

        let names: Vec<_> = doc.action_groups.keys().cloned().collect();
        assert_eq!(names, vec!["leaf", "mid"]);
        assert_eq!(doc.version, "2.0");
        assert_eq!(doc.name, "demo");
        assert!(chrono::DateTime::parse_from_rfc3339(&doc.created).is_ok());
        // Resolving cached the global groups locally, so a snapshot is included.
        assert!(doc.local_action_groups.is_some());
    }

    #[test]
    fn images_travel_with_the_document() {
        let src = tempfile::tempdir().unwrap();
        let top = src.path().join("ok button.png");
        let nested = src.path().join("inner.png");
        fs::write(&top, b"top-bytes").unwrap();
        fs::write(&nested, b"inner-bytes").unwrap();

        let local = Arc::new(LocalGroups::new());
        local
            .save(ActionGroup::new(
                "g",
                vec![image_action(ActionKind::ImageClick, &nested)],
            ))
            .unwrap();
        let resolver = GroupResolver::new(Arc::clone(&local), None);
        let doc_path = src.path().join("script.json");
        Exporter::new(&resolver)
            .export_to_path(
                &[image_action(ActionKind::ImageCheck, &top), group_ref("g")],
                &doc_path,
            )
            .unwrap();

        // Move the document somewhere the original images do not exist.
        let dst = tempfile::tempdir().unwrap();
        let moved = dst.path().join("script.json");
        fs::copy(&doc_path, &moved).unwrap();

        let target = LocalGroups::new();
        let imported = import_path(&moved, ".images", &target).unwrap();
        assert_eq!(imported.images, 2);
        assert_eq!(imported.groups_loaded, 1);

        let top_path = imported.actions[0].param_str("image_path").unwrap();
        assert_eq!(Path::new(top_path), dst.path().join(".images/ok_button.png"));
        assert_eq!(fs::read(top_path).unwrap(), b"top-bytes");

        let group = target.get("g").unwrap();
        let inner_path = group.actions[0].param_str("image_path").unwrap();
        assert_eq!(Path::new(inner_path), dst.path().join(".images/inner.png"));
        assert_eq!(fs::read(inner_path).unwrap(), b"inner-bytes");
    }

    #[test]
    fn same_named_images_keep_their_own_bytes() {
        let src = tempfile::tempdir().unwrap();
        fs::create_dir_all(src.path().join("a")).unwrap();
        fs::create_dir_all(src.path().join("b")).unwrap();
        let first = src.path().join("a/icon.png");
        let second = src.path().join("b/icon.png");
        let button = src.path().join("按钮.png");
        let logo = src.path().join("图标.png");
        fs::write(&first, b"AAAA").unwrap();
        fs::write(&second, b"BBBB").unwrap();
        fs::write(&button, b"CCCC").unwrap();
        fs::write(&logo, b"DDDD").unwrap();

        let resolver = GroupResolver::new(Arc::new(LocalGroups::new()), None);
        let originals = [
            image_action(ActionKind::ImageClick, &first),
            image_action(ActionKind::ImageClick, &second),
            image_action(ActionKind::ImageCheck, &first),
            image_action(ActionKind::ImageClick, &button),
            image_action(ActionKind::ImageClick, &logo),
        ];
        let doc = Exporter::new(&resolver).export(&originals).unwrap();
        let keys: Vec<_> = doc.embedded_images.keys().cloned().collect();
        assert_eq!(keys.len(), 4, "{keys:?}");
        assert!(keys.contains(&"icon_2.png".to_string()), "{keys:?}");
        // The caller's actions are left untouched.
        assert_eq!(
            originals[1].param_str("image_path").map(Path::new),
            Some(second.as_path())
        );

        let dst = tempfile::tempdir().unwrap();
        let imported = import_document(doc, dst.path(), &LocalGroups::new()).unwrap();
        let bytes: Vec<Vec<u8>> = imported
            .actions
            .iter()
            .map(|a| fs::read(a.param_str("image_path").unwrap()).unwrap())
            .collect();
        assert_eq!(
            bytes,
            vec![
                b"AAAA".to_vec(),
                b"BBBB".to_vec(),
                b"AAAA".to_vec(),
                b"CCCC".to_vec(),
                b"DDDD".to_vec()
            ]
        );
    }

    #[test]
    fn local_snapshot_is_preferred_on_import() {
        let doc: ScriptDocument = serde_json::from_value(serde_json::json!({
            "actions": [serde_json::to_value(group_ref("g")).unwrap()],
            "action_groups": {
                "g": serde_json::to_value(ActionGroup::new("g", vec![click(1, 1)]).with_description("shared")).unwrap()
            },
            "local_action_groups": {
                "g": serde_json::to_value(ActionGroup::new("g", vec![click(1, 1)]).with_description("local")).unwrap()
            }
        }))
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let local = LocalGroups::new();
        let imported = import_document(doc.clone(), dir.path(), &local).unwrap();
        assert_eq!(local.get("g").unwrap().description, "local");
        assert_eq!(imported.actions[0].group_ref(), Some("g"));

        // An empty snapshot falls back to the shared map.
        let mut doc = doc;
        doc.local_action_groups = Some(Map::new());
        import_document(doc, dir.path(), &local).unwrap();
        assert_eq!(local.get("g").unwrap().description, "shared");
    }

    #[test]
    fn corrupt_image_data_fails_the_import() {
        let doc = ScriptDocument {
            embedded_images: BTreeMap::from([("x.png".to_string(), "***".to_string())]),
            ..ScriptDocument::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let err = import_document(doc, dir.path(), &LocalGroups::new()).unwrap_err();
        assert!(matches!(err, PersistenceError::Decode { .. }));
    }

    #[test]
    fn unreadable_document_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{").unwrap();
        assert!(matches!(
            import_path(&path, ".images", &LocalGroups::new()),
            Err(PersistenceError::Json { .. })
        ));
        assert!(matches!(
            read_document(&dir.path().join("none.json")),
            Err(PersistenceError::Io { .. })
        ));
    }
}
