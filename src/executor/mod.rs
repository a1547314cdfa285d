#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

/*!
Executor module for ReplayBot.

This module wires together:
- `input`: the collaborator interfaces (`InputDriver`, `ScreenLocator`) and the typed `InputCommand`
- `driver`: the Enigo-backed input driver (respects dry-run)
- `runtime`: action execution with repeats, speed-scaled delays, image polling and group expansion

Typical usage:
- Build a `Runtime` around a driver, a locator, the variable store and a `GroupResolver`.
- Call `Action::execute` (or `Runtime::execute`) for each action.

Example:
```no_run
use std::sync::Arc;
use replaybot::actions::{Action, ActionKind};
use replaybot::executor::{EnigoDriver, Runtime, UnsupportedLocator};
use replaybot::groups::{GroupResolver, LocalGroups};
use replaybot::variables::VariableStore;

let mut driver = EnigoDriver::new(true); // dry-run mode
let vars = VariableStore::new();
let groups = GroupResolver::new(Arc::new(LocalGroups::new()), None);
let mut rt = Runtime::new(&mut driver, &UnsupportedLocator, &vars, &groups);
let click = Action::new(ActionKind::MouseClick).with_param("x", 10).with_param("y", 20);
click.execute(&mut rt)?;
# Ok::<(), replaybot::error::ActionError>(())
```
*/

pub mod driver;
pub mod input;
pub mod runtime;

// Re-exports for convenient access from `replaybot::executor::*`
pub use driver::EnigoDriver;
pub use input::{InputCommand, InputDriver, MouseButton, Point, Rect, ScreenLocator, UnsupportedLocator};
pub use runtime::{Outcome, Runtime, clamp_speed};
