//! Player notifications.
//!
//! Observers are called synchronously on the thread that produced the
//! notification (the player's worker thread for runs). Handing events to
//! another thread is the observer's job; [`channel`] does that with a tokio
//! channel.

use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tracing::{debug, error, info};

use crate::actions::Action;

/// Playback state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerState {
    Idle,
    Playing,
    Paused,
    /// A stop was requested; the worker has not unwound yet.
    Stopped,
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlayerState::Idle => "idle",
            PlayerState::Playing => "playing",
            PlayerState::Paused => "paused",
            PlayerState::Stopped => "stopped",
        })
    }
}

/// Receives player notifications. Every method defaults to a no-op.
///
/// `index` is the 0-based position in the player's action list; `repeat`
/// is the 1-based repeat number.
pub trait PlayerObserver: Send + Sync {
    fn on_action_started(&self, _action: &Action, _index: usize) {}
    fn on_action_ended(&self, _action: &Action, _index: usize, _success: bool) {}
    /// The action's condition was false; it was not executed.
    fn on_action_skipped(&self, _action: &Action, _index: usize) {}
    fn on_state_changed(&self, _state: PlayerState) {}
    fn on_progress(&self, _index: usize, _repeat: u32) {}
    fn on_error(&self, _action: &Action, _index: usize, _message: &str) {}
    fn on_finished(&self, _success: bool) {}
    fn on_repeat_changed(&self, _repeat: u32) {}
}

/// Owned form of a notification, for sending across threads.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    ActionStarted {
        index: usize,
        description: String,
    },
    ActionEnded {
        index: usize,
        description: String,
        success: bool,
    },
    ActionSkipped {
        index: usize,
        description: String,
    },
    StateChanged {
        state: PlayerState,
    },
    Progress {
        index: usize,
        repeat: u32,
    },
    Error {
        index: usize,
        description: String,
        message: String,
    },
    Finished {
        success: bool,
    },
    RepeatChanged {
        repeat: u32,
    },
}

/// Observer that converts every notification into a [`PlayerEvent`] and
/// hands it to `sink`.
pub struct EventObserver<F> {
    sink: F,
}

impl<F> EventObserver<F>
where
    F: Fn(PlayerEvent) + Send + Sync,
{
    pub fn new(sink: F) -> Self {
        Self { sink }
    }
}

impl<F> PlayerObserver for EventObserver<F>
where
    F: Fn(PlayerEvent) + Send + Sync,
{
    fn on_action_started(&self, action: &Action, index: usize) {
        (self.sink)(PlayerEvent::ActionStarted {
            index,
            description: action.description().to_string(),
        });
    }

    fn on_action_ended(&self, action: &Action, index: usize, success: bool) {
        (self.sink)(PlayerEvent::ActionEnded {
            index,
            description: action.description().to_string(),
            success,
        });
    }

    fn on_action_skipped(&self, action: &Action, index: usize) {
        (self.sink)(PlayerEvent::ActionSkipped {
            index,
            description: action.description().to_string(),
        });
    }

    fn on_state_changed(&self, state: PlayerState) {
        (self.sink)(PlayerEvent::StateChanged { state });
    }

    fn on_progress(&self, index: usize, repeat: u32) {
        (self.sink)(PlayerEvent::Progress { index, repeat });
    }

    fn on_error(&self, action: &Action, index: usize, message: &str) {
        (self.sink)(PlayerEvent::Error {
            index,
            description: action.description().to_string(),
            message: message.to_string(),
        });
    }

    fn on_finished(&self, success: bool) {
        (self.sink)(PlayerEvent::Finished { success });
    }

    fn on_repeat_changed(&self, repeat: u32) {
        (self.sink)(PlayerEvent::RepeatChanged { repeat });
    }
}

/// An observer forwarding events into an unbounded tokio channel, and the
/// receiving end. Events sent after the receiver is dropped are discarded.
pub fn channel() -> (
    EventObserver<impl Fn(PlayerEvent) + Send + Sync>,
    UnboundedReceiver<PlayerEvent>,
) {
    let (tx, rx) = unbounded_channel();
    let observer = EventObserver::new(move |event| {
        let _ = tx.send(event);
    });
    (observer, rx)
}

/// Turns notifications into tracing events under `replaybot::player`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl PlayerObserver for LoggingObserver {
    fn on_action_started(&self, action: &Action, index: usize) {
        info!(target: "replaybot::player", index, action = %action.description(), "action started");
    }

    fn on_action_ended(&self, action: &Action, index: usize, success: bool) {
        debug!(target: "replaybot::player", index, action = %action.description(), success, "action ended");
    }

    fn on_action_skipped(&self, action: &Action, index: usize) {
        info!(
            target: "replaybot::player",
            index, action = %action.description(), condition = %action.condition(),
            "action skipped"
        );
    }

    fn on_state_changed(&self, state: PlayerState) {
        debug!(target: "replaybot::player", %state, "state changed");
    }

    fn on_error(&self, _action: &Action, index: usize, message: &str) {
        error!(target: "replaybot::player", index, error = %message, "action failed");
    }

    fn on_finished(&self, success: bool) {
        info!(target: "replaybot::player", success, "playback finished");
    }

    fn on_repeat_changed(&self, repeat: u32) {
        info!(target: "replaybot::player", repeat, "repeat started");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::click;

    #[test]
    fn channel_observer_forwards_owned_events() {
        let (observer, mut rx) = channel();
        let action = click(3, 4);
        observer.on_action_started(&action, 2);
        observer.on_progress(2, 1);
        observer.on_finished(true);

        assert_eq!(
            rx.try_recv().unwrap(),
            PlayerEvent::ActionStarted {
                index: 2,
                description: "Click (3, 4)".into()
            }
        );
        assert_eq!(rx.try_recv().unwrap(), PlayerEvent::Progress { index: 2, repeat: 1 });
        assert_eq!(rx.try_recv().unwrap(), PlayerEvent::Finished { success: true });
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn sending_after_receiver_dropped_is_harmless() {
        let (observer, rx) = channel();
        drop(rx);
        observer.on_state_changed(PlayerState::Playing);
    }

    #[test]
    fn events_serialize_with_a_tag() {
        let v = serde_json::to_value(PlayerEvent::StateChanged {
            state: PlayerState::Paused,
        })
        .unwrap();
        assert_eq!(v, serde_json::json!({"event": "state_changed", "state": "paused"}));
    }
}
