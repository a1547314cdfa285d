//! Test doubles shared by the unit tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, bail};

use crate::actions::{Action, ActionKind};
use crate::executor::{InputCommand, InputDriver, Rect, ScreenLocator};
use crate::player::{EventObserver, PlayerEvent, PlayerObserver, PlayerState};

pub fn click(x: i32, y: i32) -> Action {
    Action::new(ActionKind::MouseClick)
        .with_param("x", x)
        .with_param("y", y)
}

pub fn group_ref(name: &str) -> Action {
    Action::new(ActionKind::ActionGroupRef).with_param("group_name", name)
}

/// Records every command; clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingDriver {
    log: Arc<Mutex<Vec<InputCommand>>>,
    fail_on_key: Option<String>,
}

impl RecordingDriver {
    /// Fails (after recording) on a key press of `key`.
    pub fn failing_on_key(key: &str) -> Self {
        Self {
            fail_on_key: Some(key.to_string()),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> Vec<InputCommand> {
        self.log.lock().unwrap().clone()
    }

    pub fn wait_for_commands(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.log.lock().unwrap().len() >= count {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }
}

impl InputDriver for RecordingDriver {
    fn perform(&mut self, command: &InputCommand) -> Result<()> {
        self.log.lock().unwrap().push(command.clone());
        if let InputCommand::KeyPress { key } = command {
            if self.fail_on_key.as_deref() == Some(key.as_str()) {
                bail!("simulated failure pressing {key}");
            }
        }
        Ok(())
    }
}

enum Scripted {
    Found(Rect),
    Fails,
}

/// Locator answering from a table keyed by image file name; unknown images
/// are not found.
#[derive(Default)]
pub struct ScriptedLocator {
    table: Mutex<HashMap<String, Scripted>>,
    lookups: AtomicUsize,
}

impl ScriptedLocator {
    pub fn place(&self, file_name: &str, region: Rect) {
        self.table
            .lock()
            .unwrap()
            .insert(file_name.to_string(), Scripted::Found(region));
    }

    pub fn hide(&self, file_name: &str) {
        self.table.lock().unwrap().remove(file_name);
    }

    pub fn fail(&self, file_name: &str) {
        self.table
            .lock()
            .unwrap()
            .insert(file_name.to_string(), Scripted::Fails);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl ScreenLocator for ScriptedLocator {
    fn locate(&self, image: &Path, _confidence: f64) -> Result<Option<Rect>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match self.table.lock().unwrap().get(&name) {
            Some(Scripted::Found(region)) => Ok(Some(*region)),
            Some(Scripted::Fails) => bail!("matcher crashed on {name}"),
            None => Ok(None),
        }
    }
}

/// Collects player events in order.
#[derive(Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<PlayerEvent>>>,
}

impl EventLog {
    pub fn observer(&self) -> Arc<dyn PlayerObserver> {
        let events = Arc::clone(&self.events);
        Arc::new(EventObserver::new(move |event| {
            events.lock().unwrap().push(event);
        }))
    }

    pub fn events(&self) -> Vec<PlayerEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PlayerEvent::ActionStarted { index, .. } => Some(index),
                _ => None,
            })
            .collect()
    }

    pub fn finished(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PlayerEvent::Finished { success } => Some(success),
                _ => None,
            })
            .collect()
    }

    pub fn states(&self) -> Vec<PlayerState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PlayerEvent::StateChanged { state } => Some(state),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<(usize, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PlayerEvent::Error { index, message, .. } => Some((index, message)),
                _ => None,
            })
            .collect()
    }

    pub fn wait_finished(&self, timeout: Duration) -> bool {
        self.wait_finished_count(1, timeout)
    }

    pub fn wait_finished_count(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.finished().len() >= count {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }
}
