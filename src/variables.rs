//! Process-scoped variable store used for signalling between actions.
//!
//! Image checks write markers here; conditions on any action read them.
//! The store is shared between the playback worker and UI readers, so every
//! access goes through an `RwLock`. Create one per process (or per test) and
//! hand it around as `Arc<VariableStore>`.

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// A variable value: boolean, number or string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl VarValue {
    /// Truthiness used by `$name` conditions.
    pub fn is_truthy(&self) -> bool {
        match self {
            VarValue::Bool(b) => *b,
            VarValue::Int(i) => *i != 0,
            VarValue::Float(f) => *f != 0.0,
            VarValue::Text(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarValue::Bool(b) => write!(f, "{b}"),
            VarValue::Int(i) => write!(f, "{i}"),
            VarValue::Float(x) => write!(f, "{x}"),
            VarValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for VarValue {
    fn from(v: bool) -> Self {
        VarValue::Bool(v)
    }
}

impl From<i64> for VarValue {
    fn from(v: i64) -> Self {
        VarValue::Int(v)
    }
}

impl From<i32> for VarValue {
    fn from(v: i32) -> Self {
        VarValue::Int(v.into())
    }
}

impl From<f64> for VarValue {
    fn from(v: f64) -> Self {
        VarValue::Float(v)
    }
}

impl From<&str> for VarValue {
    fn from(v: &str) -> Self {
        VarValue::Text(v.to_string())
    }
}

impl From<String> for VarValue {
    fn from(v: String) -> Self {
        VarValue::Text(v)
    }
}

/// Thread-safe key/value table. No persistence.
#[derive(Debug, Default)]
pub struct VariableStore {
    vars: RwLock<HashMap<String, VarValue>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<VarValue>) {
        self.vars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<VarValue> {
        self.vars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn get_or(&self, name: &str, default: impl Into<VarValue>) -> VarValue {
        self.get(name).unwrap_or_else(|| default.into())
    }

    pub fn has(&self, name: &str) -> bool {
        self.vars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    pub fn remove(&self, name: &str) -> Option<VarValue> {
        self.vars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn clear(&self) {
        self.vars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Snapshot of every variable (e.g. to populate a condition picker).
    pub fn get_all(&self) -> HashMap<String, VarValue> {
        self.vars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn set_get_has_clear() {
        let store = VariableStore::new();
        assert!(!store.has("found"));
        assert_eq!(store.get_or("found", false), VarValue::Bool(false));

        store.set("found", true);
        store.set("found_x", 12);
        assert!(store.has("found"));
        assert_eq!(store.get("found"), Some(VarValue::Bool(true)));
        assert_eq!(store.get_all().len(), 2);

        store.clear();
        assert!(store.get_all().is_empty());
    }

    #[test]
    fn truthiness_and_rendering() {
        assert!(VarValue::from("ready").is_truthy());
        assert!(!VarValue::from("").is_truthy());
        assert!(!VarValue::from(0).is_truthy());
        assert!(VarValue::from(0.5).is_truthy());
        assert_eq!(VarValue::from(true).to_string(), "true");
        assert_eq!(VarValue::from(42).to_string(), "42");
        assert_eq!(VarValue::from("ok").to_string(), "ok");
    }

    #[test]
    fn concurrent_writers_do_not_lose_updates() {
        let store = Arc::new(VariableStore::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..50 {
                        store.set(format!("t{t}_{i}"), i);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.get_all().len(), 400);
    }
}
