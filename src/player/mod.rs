//! The playback engine.
//!
//! A `Player` owns an action list and playback settings, runs the list on a
//! dedicated worker thread and reports through [`PlayerObserver`]s.
//!
//! States: `Idle -> Playing <-> Paused`, `Playing|Paused -> Stopped -> Idle`.
//! `Stopped` lasts until the worker notices the cancellation and unwinds;
//! every run ends in `Idle`, after which the player can be played again.
//!
//! Cancellation is cooperative: the worker checks the run's
//! `CancellationToken` and the timeout before each action, after the pause
//! gate, and in every sleep slice. An input effect that blocks inside the
//! OS (a long glide, say) delays a stop until it returns.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::actions::Action;
use crate::error::{ActionError, PlayerError};
use crate::executor::{
    InputDriver, Outcome, Point, Runtime, ScreenLocator, UnsupportedLocator, clamp_speed,
};
use crate::groups::{GlobalGroups, GroupResolver, LocalGroups};
use crate::variables::VariableStore;

pub mod observer;

pub use observer::{EventObserver, LoggingObserver, PlayerEvent, PlayerObserver, PlayerState, channel};

/// How long `play()` waits for a stopped run to unwind before giving up.
pub const RESTART_WAIT: Duration = Duration::from_secs(2);

/// Everything a player executes against, supplied at construction.
pub struct PlayerContext {
    pub variables: Arc<VariableStore>,
    pub groups: GroupResolver,
    pub driver: Box<dyn InputDriver>,
    pub locator: Arc<dyn ScreenLocator>,
}

impl PlayerContext {
    /// Fresh variable store, empty Local scope, no Global scope, and no
    /// image matching.
    pub fn new(driver: Box<dyn InputDriver>) -> Self {
        Self {
            variables: Arc::new(VariableStore::new()),
            groups: GroupResolver::new(Arc::new(LocalGroups::new()), None),
            driver,
            locator: Arc::new(UnsupportedLocator),
        }
    }

    pub fn with_variables(mut self, variables: Arc<VariableStore>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_groups(mut self, local: Arc<LocalGroups>, global: Option<Arc<GlobalGroups>>) -> Self {
        self.groups = GroupResolver::new(local, global);
        self
    }

    pub fn with_locator(mut self, locator: Arc<dyn ScreenLocator>) -> Self {
        self.locator = locator;
        self
    }
}

/// Snapshot of where a run is.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Progress {
    /// 0-based index of the current action.
    pub index: usize,
    pub total: usize,
    /// 1-based repeat number; 0 before the first repeat starts.
    pub repeat: u32,
}

#[derive(Debug, Clone, Copy)]
struct PlaybackSettings {
    speed: f64,
    repeat_count: u32,
    infinite_loop: bool,
    timeout: Option<Duration>,
    window_offset: Option<Point>,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            speed: 1.0,
            repeat_count: 1,
            infinite_loop: false,
            timeout: None,
            window_offset: None,
        }
    }
}

struct Control {
    state: PlayerState,
    /// Bumped on every `play()` from idle so a worker from an earlier run
    /// cannot reset the state of a newer one.
    generation: u64,
    token: CancellationToken,
    /// A single-step execution is in progress.
    busy: bool,
}

/// Pause gate: the worker blocks in `wait` while the gate is closed.
struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    fn new() -> Self {
        Self {
            open: Mutex::new(true),
            cond: Condvar::new(),
        }
    }

    fn open(&self) {
        *self.open.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.cond.notify_all();
    }

    fn close(&self) {
        *self.open.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    fn wait(&self) {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        while !*open {
            open = self.cond.wait(open).unwrap_or_else(PoisonError::into_inner);
        }
    }
}

struct Shared {
    control: Mutex<Control>,
    gate: Gate,
    settings: Mutex<PlaybackSettings>,
    actions: RwLock<Arc<Vec<Action>>>,
    observers: RwLock<Vec<Arc<dyn PlayerObserver>>>,
    current_index: AtomicUsize,
    current_repeat: AtomicU32,
    variables: Arc<VariableStore>,
    groups: GroupResolver,
    driver: Mutex<Box<dyn InputDriver>>,
    locator: Arc<dyn ScreenLocator>,
}

/// Plays an action list on a worker thread. See the module docs.
pub struct Player {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Player {
    pub fn new(context: PlayerContext) -> Self {
        Self {
            shared: Arc::new(Shared {
                control: Mutex::new(Control {
                    state: PlayerState::Idle,
                    generation: 0,
                    token: CancellationToken::new(),
                    busy: false,
                }),
                gate: Gate::new(),
                settings: Mutex::new(PlaybackSettings::default()),
                actions: RwLock::new(Arc::new(Vec::new())),
                observers: RwLock::new(Vec::new()),
                current_index: AtomicUsize::new(0),
                current_repeat: AtomicU32::new(0),
                variables: context.variables,
                groups: context.groups,
                driver: Mutex::new(context.driver),
                locator: context.locator,
            }),
            worker: Mutex::new(None),
        }
    }

    // --- observers ---

    pub fn add_observer(&self, observer: Arc<dyn PlayerObserver>) {
        self.shared
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    pub fn clear_observers(&self) {
        self.shared
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    // --- configuration ---

    /// Replace the action list. Refused (returns `false`) unless idle.
    pub fn set_actions(&self, actions: Vec<Action>) -> bool {
        let control = self.shared.lock_control();
        if control.state != PlayerState::Idle || control.busy {
            warn!(target: "replaybot::player", state = %control.state, "cannot replace actions while running");
            return false;
        }
        *self
            .shared
            .actions
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(actions);
        true
    }

    pub fn actions(&self) -> Vec<Action> {
        self.shared.actions_snapshot().as_ref().clone()
    }

    /// Clamped to `[0.1, 10.0]`. Takes effect from the next action.
    pub fn set_speed(&self, speed: f64) {
        self.shared.lock_settings().speed = clamp_speed(speed);
    }

    pub fn speed(&self) -> f64 {
        self.shared.settings().speed
    }

    /// Stored as `max(1, count)`.
    pub fn set_repeat_count(&self, count: i64) {
        self.shared.lock_settings().repeat_count =
            u32::try_from(count.max(1)).unwrap_or(u32::MAX);
    }

    pub fn repeat_count(&self) -> u32 {
        self.shared.settings().repeat_count
    }

    pub fn set_infinite_loop(&self, enabled: bool) {
        self.shared.lock_settings().infinite_loop = enabled;
    }

    pub fn infinite_loop(&self) -> bool {
        self.shared.settings().infinite_loop
    }

    /// Run time limit; zero disables it. Read when a run starts.
    pub fn set_timeout(&self, timeout: Duration) {
        self.shared.lock_settings().timeout = (!timeout.is_zero()).then_some(timeout);
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.shared.settings().timeout
    }

    /// Offset added to the coordinates of window-relative actions.
    pub fn set_window_offset(&self, offset: Option<Point>) {
        self.shared.lock_settings().window_offset = offset;
    }

    pub fn window_offset(&self) -> Option<Point> {
        self.shared.settings().window_offset
    }

    pub fn variables(&self) -> &Arc<VariableStore> {
        &self.shared.variables
    }

    pub fn groups(&self) -> &GroupResolver {
        &self.shared.groups
    }

    // --- state ---

    pub fn state(&self) -> PlayerState {
        self.shared.lock_control().state
    }

    pub fn is_playing(&self) -> bool {
        self.state() == PlayerState::Playing
    }

    pub fn is_paused(&self) -> bool {
        self.state() == PlayerState::Paused
    }

    pub fn progress(&self) -> Progress {
        Progress {
            index: self.shared.current_index.load(Ordering::SeqCst),
            total: self.shared.actions_snapshot().len(),
            repeat: self.shared.current_repeat.load(Ordering::SeqCst),
        }
    }

    // --- transitions ---

    /// Start a run, or resume a paused one. Returns whether anything changed.
    ///
    /// No-op while playing, while a single step executes, or when the
    /// action list is empty. After `stop()` it first waits (up to
    /// [`RESTART_WAIT`]) for the stopped run's worker to exit.
    pub fn play(&self) -> bool {
        match self.state() {
            PlayerState::Playing => return false,
            PlayerState::Paused => return self.resume(),
            PlayerState::Idle | PlayerState::Stopped => {}
        }
        // A stopped run must unwind and emit `finished` before the next one
        // starts, so runs never overlap.
        if !self.wait(RESTART_WAIT) {
            warn!(target: "replaybot::player", "previous run is still stopping; play ignored");
            return false;
        }

        let mut control = self.shared.lock_control();
        if control.state != PlayerState::Idle {
            // Raced with another `play()`.
            return false;
        }
        if control.busy {
            warn!(target: "replaybot::player", "single-step execution in progress; play ignored");
            return false;
        }
        let actions = self.shared.actions_snapshot();
        if actions.is_empty() {
            warn!(target: "replaybot::player", "no actions to play");
            return false;
        }

        control.generation += 1;
        control.token = CancellationToken::new();
        control.state = PlayerState::Playing;
        let generation = control.generation;
        let token = control.token.clone();
        drop(control);

        self.shared.current_index.store(0, Ordering::SeqCst);
        self.shared.current_repeat.store(0, Ordering::SeqCst);
        self.shared.gate.open();
        self.shared.emit(|o| o.on_state_changed(PlayerState::Playing));

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("replaybot-player".into())
            .spawn(move || shared.run(generation, &token, &actions));
        match spawned {
            Ok(handle) => {
                *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
                true
            }
            Err(err) => {
                error!(target: "replaybot::player", error = %err, "failed to spawn player thread");
                self.shared.finish(generation, false, Duration::ZERO);
                false
            }
        }
    }

    pub fn pause(&self) -> bool {
        let mut control = self.shared.lock_control();
        if control.state != PlayerState::Playing {
            return false;
        }
        control.state = PlayerState::Paused;
        self.shared.gate.close();
        drop(control);
        info!(target: "replaybot::player", "paused");
        self.shared.emit(|o| o.on_state_changed(PlayerState::Paused));
        true
    }

    pub fn resume(&self) -> bool {
        let mut control = self.shared.lock_control();
        if control.state != PlayerState::Paused {
            return false;
        }
        control.state = PlayerState::Playing;
        drop(control);
        self.shared.gate.open();
        info!(target: "replaybot::player", "resumed");
        self.shared.emit(|o| o.on_state_changed(PlayerState::Playing));
        true
    }

    /// Pause when playing, resume when paused. Returns the resulting state.
    pub fn toggle_pause(&self) -> PlayerState {
        match self.state() {
            PlayerState::Playing => {
                self.pause();
            }
            PlayerState::Paused => {
                self.resume();
            }
            _ => {}
        }
        self.state()
    }

    /// Request cancellation of the active run (or single step).
    ///
    /// The state becomes `Stopped` at once; the worker moves it to `Idle`
    /// and emits `finished(false)` when it unwinds.
    pub fn stop(&self) -> bool {
        let mut control = self.shared.lock_control();
        if control.busy {
            control.token.cancel();
        }
        if !matches!(control.state, PlayerState::Playing | PlayerState::Paused) {
            return control.busy;
        }
        control.token.cancel();
        control.state = PlayerState::Stopped;
        drop(control);
        // Wake a paused worker so it can observe the cancellation.
        self.shared.gate.open();
        info!(target: "replaybot::player", "stop requested");
        self.shared.emit(|o| o.on_state_changed(PlayerState::Stopped));
        true
    }

    /// `stop()`, then wait up to `timeout` for the worker thread to exit.
    /// Returns whether it exited in time.
    pub fn stop_and_wait(&self, timeout: Duration) -> bool {
        self.stop();
        self.wait(timeout)
    }

    /// Wait up to `timeout` for the worker thread to exit. `true` when no
    /// worker is running.
    pub fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
            let finished = worker.as_ref().is_none_or(JoinHandle::is_finished);
            if finished {
                if let Some(handle) = worker.take() {
                    if handle.join().is_err() {
                        error!(target: "replaybot::player", "player thread panicked");
                    }
                }
                return true;
            }
            drop(worker);
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Execute the action at `index` once, outside of a run, on the calling
    /// thread. Delays, speed, window offset and notifications apply as in a
    /// run; the action's condition is not evaluated.
    ///
    /// Only valid while idle. Returns `Ok(false)` when interrupted by
    /// `stop()`.
    pub fn execute_single(&self, index: usize) -> Result<bool, PlayerError> {
        let actions = self.shared.actions_snapshot();
        let action = actions.get(index).ok_or(PlayerError::IndexOutOfRange {
            index,
            len: actions.len(),
        })?;
        let token = {
            let mut control = self.shared.lock_control();
            if control.state != PlayerState::Idle || control.busy {
                return Err(PlayerError::Busy);
            }
            control.busy = true;
            control.token = CancellationToken::new();
            control.token.clone()
        };

        self.shared.current_index.store(index, Ordering::SeqCst);
        debug!(target: "replaybot::player", index, action = %action.description(), "single-step");
        self.shared.emit(|o| o.on_action_started(action, index));
        let should_stop = || token.is_cancelled();
        let result = self.shared.execute(action, &should_stop);
        self.shared.lock_control().busy = false;

        match result {
            Ok(outcome) => {
                let completed = outcome == Outcome::Completed;
                self.shared.emit(|o| o.on_action_ended(action, index, completed));
                Ok(completed)
            }
            Err(err) => {
                let message = err.to_string();
                error!(target: "replaybot::player", index, error = %message, "single-step failed");
                self.shared.emit(|o| o.on_error(action, index, &message));
                self.shared.emit(|o| o.on_action_ended(action, index, false));
                Err(err.into())
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        // The worker holds its own `Arc<Shared>` and unwinds on its own.
        self.stop();
    }
}

impl Shared {
    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_settings(&self) -> MutexGuard<'_, PlaybackSettings> {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settings(&self) -> PlaybackSettings {
        *self.lock_settings()
    }

    fn actions_snapshot(&self) -> Arc<Vec<Action>> {
        Arc::clone(&self.actions.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Call `f` for every observer, without holding the observer lock.
    fn emit(&self, f: impl Fn(&dyn PlayerObserver)) {
        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in &observers {
            f(observer.as_ref());
        }
    }

    fn execute(
        &self,
        action: &Action,
        should_stop: &dyn Fn() -> bool,
    ) -> Result<Outcome, ActionError> {
        let settings = self.settings();
        let mut driver = self.driver.lock().unwrap_or_else(PoisonError::into_inner);
        let mut runtime = Runtime::new(
            &mut **driver,
            self.locator.as_ref(),
            &self.variables,
            &self.groups,
        )
        .with_window_offset(settings.window_offset)
        .with_speed(settings.speed)
        .with_stop_check(should_stop);
        action.execute(&mut runtime)
    }

    /// Worker thread body.
    fn run(&self, generation: u64, token: &CancellationToken, actions: &[Action]) {
        let started = Instant::now();
        let initial = self.settings();
        let timeout = initial.timeout;
        let timed_out = || timeout.is_some_and(|limit| started.elapsed() >= limit);
        let should_stop = || token.is_cancelled() || timed_out();

        info!(
            target: "replaybot::player",
            actions = actions.len(),
            repeats = initial.repeat_count,
            infinite = initial.infinite_loop,
            speed = initial.speed,
            timeout_secs = timeout.map(|t| t.as_secs_f64()),
            "playback started"
        );

        let mut completed: u32 = 0;
        let success = 'run: loop {
            let settings = self.settings();
            if !settings.infinite_loop && completed >= settings.repeat_count {
                break true;
            }
            if should_stop() {
                break false;
            }
            let repeat = completed.saturating_add(1);
            self.current_repeat.store(repeat, Ordering::SeqCst);
            debug!(target: "replaybot::player", repeat, "repeat started");
            self.emit(|o| o.on_repeat_changed(repeat));

            for (index, action) in actions.iter().enumerate() {
                if should_stop() {
                    break 'run false;
                }
                self.gate.wait();
                // A stop issued while paused must not run one more action.
                if should_stop() {
                    break 'run false;
                }
                self.current_index.store(index, Ordering::SeqCst);

                if !action.evaluate_condition(&self.variables) {
                    debug!(
                        target: "replaybot::player",
                        index, repeat, condition = %action.condition(),
                        "condition not met; skipping"
                    );
                    self.emit(|o| o.on_action_skipped(action, index));
                    self.emit(|o| o.on_progress(index, repeat));
                    continue;
                }

                self.emit(|o| o.on_action_started(action, index));
                match self.execute(action, &should_stop) {
                    Ok(Outcome::Completed) => {
                        self.emit(|o| o.on_action_ended(action, index, true));
                    }
                    Ok(Outcome::Interrupted) => {
                        self.emit(|o| o.on_action_ended(action, index, false));
                        break 'run false;
                    }
                    Err(err) => {
                        // One failing action does not end the run.
                        let message = err.to_string();
                        error!(target: "replaybot::player", index, repeat, error = %message, "action failed");
                        self.emit(|o| o.on_error(action, index, &message));
                        self.emit(|o| o.on_action_ended(action, index, false));
                    }
                }
                self.emit(|o| o.on_progress(index, repeat));
            }
            completed = repeat;
        };

        if !success && timed_out() && !token.is_cancelled() {
            warn!(target: "replaybot::player", elapsed_ms = started.elapsed().as_millis() as u64, "playback timed out");
        }
        self.finish(generation, success, started.elapsed());
    }

    fn finish(&self, generation: u64, success: bool, elapsed: Duration) {
        let current = {
            let mut control = self.lock_control();
            let current = control.generation == generation;
            if current {
                control.state = PlayerState::Idle;
            }
            current
        };
        if current {
            self.emit(|o| o.on_state_changed(PlayerState::Idle));
        }
        info!(
            target: "replaybot::player",
            success,
            elapsed_ms = elapsed.as_millis() as u64,
            "playback finished"
        );
        self.emit(|o| o.on_finished(success));
    }
}
