use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::actions::{Action, ActionKind};
use crate::error::{ActionError, ResolutionError};
use crate::executor::input::{InputCommand, InputDriver, MouseButton, Point, Rect, ScreenLocator};
use crate::groups::{ActionGroup, GroupResolver};
use crate::utils::sleep::{secs, sleep_interruptible};
use crate::variables::VariableStore;

/// Maximum nesting depth of group references.
pub const MAX_DEPTH: usize = 64;

/// Pause between repetitions of a single action (before speed scaling).
pub const REPEAT_GAP: Duration = Duration::from_millis(100);

/// Poll interval while waiting for an image to appear.
pub const IMAGE_POLL: Duration = Duration::from_millis(500);

pub const MIN_SPEED: f64 = 0.1;
pub const MAX_SPEED: f64 = 10.0;

/// Clamp a playback speed into `[MIN_SPEED, MAX_SPEED]`; NaN means normal speed.
pub fn clamp_speed(speed: f64) -> f64 {
    if speed.is_nan() {
        1.0
    } else {
        speed.clamp(MIN_SPEED, MAX_SPEED)
    }
}

/// How an execution ended when it did not fail.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    /// The stop predicate fired before the action finished.
    Interrupted,
}

fn never_stop() -> bool {
    false
}

static NEVER_STOP: fn() -> bool = never_stop;

/// Execution context for actions:
/// - dispatches OS effects to the `InputDriver`
/// - resolves group references through the `GroupResolver`, recursing on
///   the same thread with a stack of the groups being expanded
/// - applies speed-scaled, interruptible delays
/// - threads the stop predicate into every wait
pub struct Runtime<'a> {
    driver: &'a mut dyn InputDriver,
    locator: &'a dyn ScreenLocator,
    variables: &'a VariableStore,
    groups: &'a GroupResolver,
    window_offset: Option<Point>,
    speed: f64,
    should_stop: &'a dyn Fn() -> bool,
}

impl<'a> Runtime<'a> {
    pub fn new(
        driver: &'a mut dyn InputDriver,
        locator: &'a dyn ScreenLocator,
        variables: &'a VariableStore,
        groups: &'a GroupResolver,
    ) -> Self {
        Self {
            driver,
            locator,
            variables,
            groups,
            window_offset: None,
            speed: 1.0,
            should_stop: &NEVER_STOP,
        }
    }

    pub fn with_window_offset(mut self, offset: Option<Point>) -> Self {
        self.window_offset = offset;
        self
    }

    /// Delays are divided by `speed` (clamped).
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = clamp_speed(speed);
        self
    }

    pub fn with_stop_check(mut self, should_stop: &'a dyn Fn() -> bool) -> Self {
        self.should_stop = should_stop;
        self
    }

    pub fn is_stopped(&self) -> bool {
        (self.should_stop)()
    }

    /// Execute `action` with all its repetitions.
    pub fn execute(&mut self, action: &Action) -> Result<Outcome, ActionError> {
        let mut stack = Vec::new();
        self.execute_action(action, &mut stack)
    }

    /// `repeat_count` sequential repetitions; the first failure aborts the
    /// rest and is wrapped with the action's description.
    fn execute_action(
        &mut self,
        action: &Action,
        stack: &mut Vec<String>,
    ) -> Result<Outcome, ActionError> {
        for i in 0..action.repeat_count().max(1) {
            if self.is_stopped() {
                return Ok(Outcome::Interrupted);
            }
            if i > 0 && !self.sleep(REPEAT_GAP) {
                return Ok(Outcome::Interrupted);
            }
            trace!(
                target: "replaybot::runtime",
                kind = %action.kind(), repetition = i + 1, depth = stack.len(),
                "Executing action"
            );
            match self.execute_once(action, stack) {
                Ok(Outcome::Completed) => {}
                Ok(Outcome::Interrupted) => return Ok(Outcome::Interrupted),
                Err(err) => return Err(err.wrap(action.description())),
            }
        }
        Ok(Outcome::Completed)
    }

    fn execute_once(
        &mut self,
        action: &Action,
        stack: &mut Vec<String>,
    ) -> Result<Outcome, ActionError> {
        if !self.sleep(action.delay_before()) {
            return Ok(Outcome::Interrupted);
        }
        if self.dispatch(action, stack)? == Outcome::Interrupted {
            return Ok(Outcome::Interrupted);
        }
        if !self.sleep(action.delay_after()) {
            return Ok(Outcome::Interrupted);
        }
        Ok(Outcome::Completed)
    }

    fn dispatch(
        &mut self,
        action: &Action,
        stack: &mut Vec<String>,
    ) -> Result<Outcome, ActionError> {
        let offset = self.window_offset;
        match action.kind() {
            // Mouse
            ActionKind::MouseClick => self.input(InputCommand::Click {
                at: action.point("x", "y", offset),
                button: MouseButton::parse(action.param_str("button").unwrap_or("left")),
                clicks: u32::try_from(action.param_i32("clicks").unwrap_or(1).max(1)).unwrap_or(1),
            }),
            ActionKind::MouseDoubleClick => self.input(InputCommand::Click {
                at: action.point("x", "y", offset),
                button: MouseButton::Left,
                clicks: 2,
            }),
            ActionKind::MouseRightClick => self.input(InputCommand::Click {
                at: action.point("x", "y", offset),
                button: MouseButton::Right,
                clicks: 1,
            }),
            ActionKind::MouseMove => {
                let to = action
                    .point("x", "y", offset)
                    .ok_or_else(|| ActionError::execution("mouse move target is not set"))?;
                self.input(InputCommand::MoveTo {
                    to,
                    duration_secs: action.param_f64("duration").unwrap_or(0.0),
                })
            }
            ActionKind::MouseDrag => {
                let corner = |kx: &str, ky: &str| {
                    action.translate(
                        (
                            action.param_i32(kx).unwrap_or(0),
                            action.param_i32(ky).unwrap_or(0),
                        ),
                        offset,
                    )
                };
                self.input(InputCommand::Drag {
                    from: corner("start_x", "start_y"),
                    to: corner("end_x", "end_y"),
                    duration_secs: action.param_f64("duration").unwrap_or(0.5),
                })
            }
            ActionKind::MouseScroll => self.input(InputCommand::Scroll {
                at: action.point("x", "y", offset),
                clicks: action.param_i32("clicks").unwrap_or(0),
            }),

            // Keyboard
            ActionKind::KeyPress => {
                let key = action
                    .param_str("key")
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| ActionError::execution("no key given"))?;
                self.input(InputCommand::KeyPress {
                    key: key.to_string(),
                })
            }
            ActionKind::KeyType => self.input(InputCommand::TypeText {
                text: action.param_str("text").unwrap_or_default().to_string(),
                interval_secs: action.param_f64("interval").unwrap_or(0.0),
            }),
            ActionKind::Hotkey => {
                let keys = action.param_strings("keys");
                if keys.is_empty() {
                    return Ok(Outcome::Completed);
                }
                self.input(InputCommand::Hotkey { keys })
            }

            // Timing
            ActionKind::Wait => {
                if self.sleep(secs(action.param_f64("seconds").unwrap_or(1.0))) {
                    Ok(Outcome::Completed)
                } else {
                    Ok(Outcome::Interrupted)
                }
            }

            ActionKind::Screenshot => self.input(InputCommand::Screenshot {
                path: action
                    .param_str("filename")
                    .unwrap_or("screenshot.png")
                    .to_string(),
                region: region_param(action),
            }),

            // Window-relative
            ActionKind::MouseMoveRelative => self.input(InputCommand::MoveTo {
                to: relative_point(action, offset),
                duration_secs: action.param_f64("duration").unwrap_or(0.0),
            }),
            ActionKind::MouseClickRelative => self.input(InputCommand::Click {
                at: Some(relative_point(action, offset)),
                button: MouseButton::Left,
                clicks: 1,
            }),

            // Image recognition
            ActionKind::ImageClick => {
                let path = image_path(action)?;
                match self.locator.locate(&path, confidence(action)) {
                    Ok(Some(region)) => self.click_center(region),
                    Ok(None) => Err(ActionError::execution("image not found on screen")),
                    Err(err) => Err(ActionError::execution(format!(
                        "image recognition failed: {err:#}"
                    ))),
                }
            }
            ActionKind::ImageWaitClick => self.wait_and_click(action),
            ActionKind::ImageCheck => self.check_image(action),

            ActionKind::ActionGroupRef => self.run_group(action, stack),
        }
    }

    fn input(&mut self, command: InputCommand) -> Result<Outcome, ActionError> {
        self.driver
            .perform(&command)
            .map_err(|err| ActionError::execution(format!("{err:#}")))?;
        Ok(Outcome::Completed)
    }

    fn click_center(&mut self, region: Rect) -> Result<Outcome, ActionError> {
        self.input(InputCommand::Click {
            at: Some(region.center()),
            button: MouseButton::Left,
            clicks: 1,
        })
    }

    fn wait_and_click(&mut self, action: &Action) -> Result<Outcome, ActionError> {
        let path = image_path(action)?;
        let confidence = confidence(action);
        let timeout = secs(action.param_f64("timeout").unwrap_or(10.0));
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if self.is_stopped() {
                return Ok(Outcome::Interrupted);
            }
            match self.locator.locate(&path, confidence) {
                Ok(Some(region)) => return self.click_center(region),
                Ok(None) => {}
                Err(err) => {
                    debug!(target: "replaybot::runtime", error = %err, "image lookup failed; retrying");
                }
            }
            let left = match deadline {
                Some(d) => d.saturating_duration_since(Instant::now()),
                None => IMAGE_POLL,
            };
            if left.is_zero() {
                break;
            }
            if !sleep_interruptible(left.min(IMAGE_POLL), self.should_stop) {
                return Ok(Outcome::Interrupted);
            }
        }
        Err(ActionError::execution(format!(
            "timed out after {:.1}s waiting for the image to appear",
            timeout.as_secs_f64()
        )))
    }

    /// On a match sets `<marker>=true` and the matched region as
    /// `<marker>_x/_y/_width/_height`; otherwise (including lookup errors)
    /// sets only `<marker>=false`, leaving earlier geometry untouched.
    fn check_image(&mut self, action: &Action) -> Result<Outcome, ActionError> {
        let path = image_path(action)?;
        let marker = action.condition_marker().ok_or_else(|| {
            ActionError::execution("cannot derive a condition marker from the image path")
        })?;
        match self.locator.locate(&path, confidence(action)) {
            Ok(Some(region)) => {
                debug!(target: "replaybot::runtime", %marker, ?region, "image found");
                self.variables.set(marker.as_str(), true);
                self.variables.set(format!("{marker}_x"), region.x);
                self.variables.set(format!("{marker}_y"), region.y);
                self.variables.set(format!("{marker}_width"), region.width);
                self.variables.set(format!("{marker}_height"), region.height);
            }
            Ok(None) => {
                debug!(target: "replaybot::runtime", %marker, "image not found");
                self.variables.set(marker, false);
            }
            Err(err) => {
                debug!(target: "replaybot::runtime", %marker, error = %err, "image check failed");
                self.variables.set(marker, false);
            }
        }
        Ok(Outcome::Completed)
    }

    fn run_group(
        &mut self,
        action: &Action,
        stack: &mut Vec<String>,
    ) -> Result<Outcome, ActionError> {
        let name = action
            .group_ref()
            .ok_or_else(|| ActionError::execution("no action group name given"))?;
        if stack.iter().any(|n| n == name) {
            let mut chain = stack.clone();
            chain.push(name.to_string());
            return Err(ResolutionError::Cycle(chain).into());
        }
        if stack.len() >= MAX_DEPTH {
            return Err(ResolutionError::TooDeep(MAX_DEPTH).into());
        }
        let group = self
            .groups
            .resolve(name)
            .ok_or_else(|| ResolutionError::NotFound(name.to_string()))?;

        debug!(
            target: "replaybot::runtime",
            group = %name, depth = stack.len(), actions = group.actions.len(),
            "Entering action group"
        );
        stack.push(name.to_string());
        let result = self.run_children(&group, stack);
        stack.pop();
        result
    }

    fn run_children(
        &mut self,
        group: &ActionGroup,
        stack: &mut Vec<String>,
    ) -> Result<Outcome, ActionError> {
        for (index, child) in group.actions.iter().enumerate() {
            if self.is_stopped() {
                return Ok(Outcome::Interrupted);
            }
            if !child.evaluate_condition(self.variables) {
                debug!(
                    target: "replaybot::runtime",
                    group = %group.name, index, condition = %child.condition(),
                    "Condition not met; skipping group action"
                );
                continue;
            }
            if self.execute_action(child, stack)? == Outcome::Interrupted {
                return Ok(Outcome::Interrupted);
            }
        }
        Ok(Outcome::Completed)
    }

    fn sleep(&self, duration: Duration) -> bool {
        sleep_interruptible(secs(duration.as_secs_f64() / self.speed), self.should_stop)
    }
}

impl Action {
    /// Execute this action in `runtime`. See [`Runtime::execute`].
    pub fn execute(&self, runtime: &mut Runtime<'_>) -> Result<Outcome, ActionError> {
        runtime.execute(self)
    }
}

fn relative_point(action: &Action, offset: Option<Point>) -> Point {
    action.translate(
        (
            action.param_i32("x").unwrap_or(0),
            action.param_i32("y").unwrap_or(0),
        ),
        offset,
    )
}

fn confidence(action: &Action) -> f64 {
    action.param_f64("confidence").unwrap_or(0.9)
}

fn image_path(action: &Action) -> Result<PathBuf, ActionError> {
    let raw = action.param_str("image_path").unwrap_or_default();
    if raw.trim().is_empty() {
        return Err(ActionError::execution("image path is not set"));
    }
    let path = PathBuf::from(raw);
    if !path.exists() {
        return Err(ActionError::execution(format!(
            "image file does not exist: {raw}"
        )));
    }
    Ok(path)
}

fn region_param(action: &Action) -> Option<Rect> {
    let items = action.param("region")?.as_array()?;
    let n = |i: usize| items.get(i).and_then(|v| v.as_f64()).map(|f| f.round() as i32);
    Some(Rect {
        x: n(0)?,
        y: n(1)?,
        width: n(2)?,
        height: n(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::{ActionGroup, GlobalGroups, LocalGroups};
    use crate::testing::{RecordingDriver, ScriptedLocator, click, group_ref};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Fixture {
        driver: RecordingDriver,
        locator: ScriptedLocator,
        vars: VariableStore,
        local: Arc<LocalGroups>,
        global: Option<Arc<GlobalGroups>>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                driver: RecordingDriver::default(),
                locator: ScriptedLocator::default(),
                vars: VariableStore::new(),
                local: Arc::new(LocalGroups::new()),
                global: None,
            }
        }

        fn run(&mut self, action: &Action) -> Result<Outcome, ActionError> {
            self.run_with(action, None, &|| false)
        }

        fn run_with(
            &mut self,
            action: &Action,
            offset: Option<Point>,
            stop: &dyn Fn() -> bool,
        ) -> Result<Outcome, ActionError> {
            let resolver = GroupResolver::new(Arc::clone(&self.local), self.global.clone());
            let mut rt = Runtime::new(&mut self.driver, &self.locator, &self.vars, &resolver)
                .with_window_offset(offset)
                .with_speed(10.0)
                .with_stop_check(stop);
            action.execute(&mut rt)
        }
    }

    #[test]
    fn click_dispatches_one_command_per_repetition() {
        let mut fx = Fixture::new();
        let action = click(10, 20).with_repeat_count(3);
        assert_eq!(fx.run(&action).unwrap(), Outcome::Completed);
        let cmds = fx.driver.commands();
        assert_eq!(cmds.len(), 3);
        assert_eq!(
            cmds[0],
            InputCommand::Click {
                at: Some((10, 20)),
                button: MouseButton::Left,
                clicks: 1
            }
        );
    }

    #[test]
    fn window_offset_applies_only_to_relative_actions() {
        let mut fx = Fixture::new();
        let offset = Some((100, 200));
        fx.run_with(&click(1, 2), offset, &|| false).unwrap();
        fx.run_with(&click(1, 2).with_window_relative(true), offset, &|| false)
            .unwrap();
        let drag = Action::new(ActionKind::MouseDrag)
            .with_param("start_x", 1)
            .with_param("start_y", 1)
            .with_param("end_x", 5)
            .with_param("end_y", 5)
            .with_window_relative(true);
        fx.run_with(&drag, offset, &|| false).unwrap();

        let cmds = fx.driver.commands();
        assert!(matches!(cmds[0], InputCommand::Click { at: Some((1, 2)), .. }));
        assert!(matches!(cmds[1], InputCommand::Click { at: Some((101, 202)), .. }));
        assert!(matches!(
            cmds[2],
            InputCommand::Drag {
                from: (101, 201),
                to: (105, 205),
                ..
            }
        ));
    }

    #[test]
    fn failure_aborts_remaining_repeats_and_is_wrapped() {
        let mut fx = Fixture::new();
        fx.driver = RecordingDriver::failing_on_key("boom");
        let action = Action::new(ActionKind::KeyPress)
            .with_param("key", "boom")
            .with_repeat_count(5);
        let err = fx.run(&action).unwrap_err();
        assert_eq!(fx.driver.commands().len(), 1);
        assert!(err.to_string().starts_with("[Press key: boom (x5)]"), "{err}");
    }

    #[test]
    fn stop_before_start_interrupts() {
        let mut fx = Fixture::new();
        let out = fx.run_with(&click(1, 1), None, &|| true).unwrap();
        assert_eq!(out, Outcome::Interrupted);
        assert!(fx.driver.commands().is_empty());
    }

    #[test]
    fn wait_is_interruptible() {
        let mut fx = Fixture::new();
        let stop = AtomicBool::new(false);
        let wait = Action::new(ActionKind::Wait).with_param("seconds", 600.0);
        let started = Instant::now();
        std::thread::scope(|s| {
            s.spawn(|| {
                std::thread::sleep(Duration::from_millis(50));
                stop.store(true, Ordering::SeqCst);
            });
            let out = fx
                .run_with(&wait, None, &|| stop.load(Ordering::SeqCst))
                .unwrap();
            assert_eq!(out, Outcome::Interrupted);
        });
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn image_check_sets_marker_and_geometry() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("ok-button.png");
        std::fs::write(&image, b"png").unwrap();
        let check = Action::new(ActionKind::ImageCheck)
            .with_param("image_path", image.to_string_lossy().into_owned());

        let mut fx = Fixture::new();
        fx.locator.place(
            "ok-button.png",
            Rect {
                x: 5,
                y: 6,
                width: 7,
                height: 8,
            },
        );
        fx.run(&check).unwrap();
        assert_eq!(fx.vars.get("ok_button"), Some(true.into()));
        assert_eq!(fx.vars.get("ok_button_width"), Some(7.into()));

        // Not found: only the flag changes; geometry stays from the last hit.
        fx.locator.hide("ok-button.png");
        fx.run(&check).unwrap();
        assert_eq!(fx.vars.get("ok_button"), Some(false.into()));
        assert_eq!(fx.vars.get("ok_button_x"), Some(5.into()));

        // Lookup errors count as not found.
        fx.locator.fail("ok-button.png");
        fx.vars.set("ok_button", true);
        fx.run(&check).unwrap();
        assert_eq!(fx.vars.get("ok_button"), Some(false.into()));
    }

    #[test]
    fn image_click_targets_the_center() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("go.png");
        std::fs::write(&image, b"png").unwrap();
        let mut fx = Fixture::new();
        fx.locator.place(
            "go.png",
            Rect {
                x: 10,
                y: 10,
                width: 20,
                height: 10,
            },
        );
        let action = Action::new(ActionKind::ImageClick)
            .with_param("image_path", image.to_string_lossy().into_owned());
        fx.run(&action).unwrap();
        assert!(matches!(
            fx.driver.commands()[0],
            InputCommand::Click { at: Some((20, 15)), .. }
        ));

        fx.locator.hide("go.png");
        let err = fx.run(&action).unwrap_err();
        assert!(err.to_string().contains("image not found on screen"));
    }

    #[test]
    fn image_wait_click_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("late.png");
        std::fs::write(&image, b"png").unwrap();
        let mut fx = Fixture::new();
        let action = Action::new(ActionKind::ImageWaitClick)
            .with_param("image_path", image.to_string_lossy().into_owned())
            .with_param("timeout", 0.1);
        let err = fx.run(&action).unwrap_err();
        assert!(err.to_string().contains("timed out"), "{err}");
        assert!(fx.locator.lookups() >= 1);
    }

    #[test]
    fn missing_image_file_is_an_execution_failure() {
        let mut fx = Fixture::new();
        let action = Action::new(ActionKind::ImageClick).with_param("image_path", "/nope/x.png");
        let err = fx.run(&action).unwrap_err();
        assert!(matches!(err.root(), ActionError::Execution(_)));
    }

    #[test]
    fn group_children_run_in_order_with_conditions() {
        let mut fx = Fixture::new();
        fx.vars.set("ready", false);
        fx.local
            .save(ActionGroup::new(
                "inner",
                vec![
                    click(1, 1),
                    click(2, 2).with_condition("$ready"),
                    click(3, 3).with_repeat_count(2),
                ],
            ))
            .unwrap();
        fx.run(&group_ref("inner")).unwrap();
        let points: Vec<_> = fx
            .driver
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                InputCommand::Click { at, .. } => at,
                _ => None,
            })
            .collect();
        assert_eq!(points, vec![(1, 1), (3, 3), (3, 3)]);
    }

    #[test]
    fn nested_groups_resolve_recursively() {
        let mut fx = Fixture::new();
        fx.local
            .save(ActionGroup::new("leaf", vec![click(9, 9)]))
            .unwrap();
        fx.local
            .save(ActionGroup::new("mid", vec![click(1, 1), group_ref("leaf")]))
            .unwrap();
        fx.run(&group_ref("mid")).unwrap();
        assert_eq!(fx.driver.commands().len(), 2);
    }

    #[test]
    fn missing_group_is_a_resolution_failure() {
        let mut fx = Fixture::new();
        let err = fx.run(&group_ref("ghost")).unwrap_err();
        assert!(err.is_resolution());
        assert!(err.to_string().contains("action group not found: ghost"));
    }

    #[test]
    fn cycles_are_detected_instead_of_recursing_forever() {
        let mut fx = Fixture::new();
        fx.local
            .save(ActionGroup::new("a", vec![click(1, 1), group_ref("b")]))
            .unwrap();
        fx.local
            .save(ActionGroup::new("b", vec![group_ref("a")]))
            .unwrap();
        let err = fx.run(&group_ref("a")).unwrap_err();
        assert!(matches!(
            err.root(),
            ActionError::Resolution(ResolutionError::Cycle(chain)) if chain == &["a", "b", "a"]
        ));
        // The first click ran before the cycle was found.
        assert_eq!(fx.driver.commands().len(), 1);
    }

    #[test]
    fn speed_divides_delays() {
        let mut fx = Fixture::new();
        let slow = click(1, 1).with_delay_before(1.0).with_delay_after(1.0);
        let started = Instant::now();
        fx.run(&slow).unwrap();
        // 2s of delays at 10x speed.
        assert!(started.elapsed() < Duration::from_millis(800));
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[test]
    fn speed_is_clamped() {
        assert_eq!(clamp_speed(0.0), MIN_SPEED);
        assert_eq!(clamp_speed(-4.0), MIN_SPEED);
        assert_eq!(clamp_speed(2.5), 2.5);
        assert_eq!(clamp_speed(1e9), MAX_SPEED);
        assert_eq!(clamp_speed(f64::NAN), 1.0);
    }

    #[test]
    fn screenshot_region_is_parsed() {
        let mut fx = Fixture::new();
        let shot = Action::new(ActionKind::Screenshot)
            .with_param("filename", "out.png")
            .with_param("region", serde_json::json!([1, 2, 3, 4]));
        fx.run(&shot).unwrap();
        assert_eq!(
            fx.driver.commands()[0],
            InputCommand::Screenshot {
                path: "out.png".into(),
                region: Some(Rect {
                    x: 1,
                    y: 2,
                    width: 3,
                    height: 4
                })
            }
        );
    }
}
