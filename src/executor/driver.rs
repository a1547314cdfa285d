use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result, anyhow, bail};
use enigo::{Axis, Button, Coordinate, Direction, Enigo, Key, Keyboard as _, Mouse as _, Settings};
use tracing::{info, trace};

use super::input::{InputCommand, InputDriver, MouseButton, Point};
use crate::utils::sleep::secs;

/// Cursor updates per second when gliding over a duration.
const GLIDE_STEPS_PER_SEC: f64 = 60.0;

type Request = (InputCommand, mpsc::Sender<Result<()>>);

/// Synthesizes input with Enigo, with optional dry-run mode.
/// In dry-run mode, commands are only logged and no real input is simulated.
///
/// Enigo is created lazily on a dedicated input thread that owns it for the
/// driver's lifetime; the driver itself only holds a channel to that thread.
pub struct EnigoDriver {
    dry_run: bool,
    worker: Option<mpsc::Sender<Request>>,
}

impl EnigoDriver {
    /// Create a new driver.
    /// - dry_run: when true, only logs instead of simulating real input.
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            worker: None,
        }
    }

    /// Returns whether the driver is currently in dry-run mode.
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Enable or disable dry-run mode dynamically.
    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    fn ensure_worker(&mut self) -> Result<&mpsc::Sender<Request>> {
        if self.worker.is_none() {
            trace!(target: "replaybot::actions", "Initializing Enigo input thread");
            self.worker = Some(spawn_input_thread()?);
        }
        self.worker
            .as_ref()
            .ok_or_else(|| anyhow!("Enigo input thread unavailable"))
    }
}

impl InputDriver for EnigoDriver {
    fn perform(&mut self, command: &InputCommand) -> Result<()> {
        if self.dry_run {
            info!(target: "replaybot::actions", ?command, "DRY-RUN input");
            return Ok(());
        }
        if let InputCommand::Screenshot { path, .. } = command {
            bail!("screen capture is not available in this build (target {path})");
        }
        let (reply_tx, reply_rx) = mpsc::channel();
        let sent = self
            .ensure_worker()?
            .send((command.clone(), reply_tx))
            .is_ok();
        if !sent {
            // The input thread died; start a fresh one next time.
            self.worker = None;
            bail!("Enigo input thread stopped");
        }
        reply_rx
            .recv()
            .context("Enigo input thread dropped the request")?
    }
}

fn spawn_input_thread() -> Result<mpsc::Sender<Request>> {
    let (tx, rx) = mpsc::channel::<Request>();
    let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

    thread::Builder::new()
        .name("replaybot-input".into())
        .spawn(move || {
            let mut enigo = match Enigo::new(&Settings::default()) {
                Ok(enigo) => {
                    let _ = ready_tx.send(Ok(()));
                    enigo
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(anyhow!("Failed to initialize Enigo: {e}")));
                    return;
                }
            };
            for (command, reply) in rx {
                let _ = reply.send(apply(&mut enigo, &command));
            }
            trace!(target: "replaybot::actions", "Enigo input thread exiting");
        })
        .context("Failed to spawn input thread")?;

    ready_rx
        .recv()
        .context("Input thread exited during initialization")??;
    Ok(tx)
}

fn apply(enigo: &mut Enigo, command: &InputCommand) -> Result<()> {
    trace!(target: "replaybot::actions", ?command, "input");
    match command {
        InputCommand::MoveTo { to, duration_secs } => glide(enigo, *to, *duration_secs),
        InputCommand::Click { at, button, clicks } => {
            if let Some((x, y)) = at {
                enigo.move_mouse(*x, *y, Coordinate::Abs)?;
            }
            let btn = map_mouse_button(*button);
            for _ in 0..(*clicks).max(1) {
                enigo.button(btn, Direction::Click)?;
            }
            Ok(())
        }
        InputCommand::Drag {
            from,
            to,
            duration_secs,
        } => {
            enigo.move_mouse(from.0, from.1, Coordinate::Abs)?;
            enigo.button(Button::Left, Direction::Press)?;
            let moved = glide(enigo, *to, *duration_secs);
            // Always release, even if the glide failed halfway.
            enigo.button(Button::Left, Direction::Release)?;
            moved
        }
        InputCommand::Scroll { at, clicks } => {
            if let Some((x, y)) = at {
                enigo.move_mouse(*x, *y, Coordinate::Abs)?;
            }
            // Enigo scrolls down for positive lengths.
            if *clicks != 0 {
                enigo.scroll(-*clicks, Axis::Vertical)?;
            }
            Ok(())
        }
        InputCommand::KeyPress { key } => {
            enigo.key(map_key(key)?, Direction::Click)?;
            Ok(())
        }
        InputCommand::TypeText {
            text,
            interval_secs,
        } => {
            if *interval_secs <= 0.0 {
                enigo.text(text)?;
                return Ok(());
            }
            let pause = secs(*interval_secs);
            let mut buf = [0u8; 4];
            for ch in text.chars() {
                enigo.text(ch.encode_utf8(&mut buf))?;
                thread::sleep(pause);
            }
            Ok(())
        }
        InputCommand::Hotkey { keys } => {
            let keys = keys
                .iter()
                .map(|k| map_key(k))
                .collect::<Result<Vec<_>>>()?;
            for key in &keys {
                enigo.key(*key, Direction::Press)?;
            }
            for key in keys.iter().rev() {
                enigo.key(*key, Direction::Release)?;
            }
            Ok(())
        }
        InputCommand::Screenshot { path, .. } => {
            bail!("screen capture is not available in this build (target {path})")
        }
    }
}

/// Move to `to` in evenly spaced steps over `duration_secs` (blocking).
fn glide(enigo: &mut Enigo, to: Point, duration_secs: f64) -> Result<()> {
    if duration_secs <= 0.0 {
        enigo.move_mouse(to.0, to.1, Coordinate::Abs)?;
        return Ok(());
    }
    let (sx, sy) = enigo.location()?;
    let steps = ((duration_secs * GLIDE_STEPS_PER_SEC).ceil() as u32).max(1);
    let pause = secs(duration_secs / f64::from(steps));
    for i in 1..=steps {
        let t = f64::from(i) / f64::from(steps);
        let x = sx + ((to.0 - sx) as f64 * t).round() as i32;
        let y = sy + ((to.1 - sy) as f64 * t).round() as i32;
        enigo.move_mouse(x, y, Coordinate::Abs)?;
        thread::sleep(pause);
    }
    Ok(())
}

fn map_mouse_button(btn: MouseButton) -> Button {
    match btn {
        MouseButton::Left => Button::Left,
        MouseButton::Middle => Button::Middle,
        MouseButton::Right => Button::Right,
    }
}

/// Map a key name (as recorded, e.g. `"enter"`, `"ctrl"`, `"a"`) to an Enigo key.
fn map_key(name: &str) -> Result<Key> {
    let lower = name.trim().to_ascii_lowercase();
    let key = match lower.as_str() {
        "enter" | "return" => Key::Return,
        "tab" => Key::Tab,
        "esc" | "escape" => Key::Escape,
        "space" => Key::Space,
        "backspace" => Key::Backspace,
        "delete" | "del" => Key::Delete,
        "up" => Key::UpArrow,
        "down" => Key::DownArrow,
        "left" => Key::LeftArrow,
        "right" => Key::RightArrow,
        "home" => Key::Home,
        "end" => Key::End,
        "pageup" | "pgup" => Key::PageUp,
        "pagedown" | "pgdn" => Key::PageDown,
        "ctrl" | "control" | "ctrlleft" | "ctrlright" => Key::Control,
        "shift" | "shiftleft" | "shiftright" => Key::Shift,
        "alt" | "altleft" | "altright" | "option" => Key::Alt,
        "win" | "winleft" | "winright" | "super" | "command" | "cmd" | "meta" => Key::Meta,
        "capslock" => Key::CapsLock,
        "f1" => Key::F1,
        "f2" => Key::F2,
        "f3" => Key::F3,
        "f4" => Key::F4,
        "f5" => Key::F5,
        "f6" => Key::F6,
        "f7" => Key::F7,
        "f8" => Key::F8,
        "f9" => Key::F9,
        "f10" => Key::F10,
        "f11" => Key::F11,
        "f12" => Key::F12,
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Unicode(c),
                _ => bail!("unknown key name '{name}'"),
            }
        }
    };
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_never_touches_the_os() {
        let mut driver = EnigoDriver::new(true);
        assert!(driver.is_dry_run());
        driver
            .perform(&InputCommand::Click {
                at: Some((10, 10)),
                button: MouseButton::Left,
                clicks: 1,
            })
            .unwrap();
        assert!(driver.worker.is_none());
    }

    #[test]
    fn screenshot_is_refused_without_touching_enigo() {
        let mut driver = EnigoDriver::new(false);
        let err = driver
            .perform(&InputCommand::Screenshot {
                path: "shot.png".into(),
                region: None,
            })
            .unwrap_err();
        assert!(err.to_string().contains("screen capture"), "{err}");
        assert!(driver.worker.is_none());
    }

    #[test]
    fn key_names() {
        assert_eq!(map_key("Enter").unwrap(), Key::Return);
        assert_eq!(map_key("ctrl").unwrap(), Key::Control);
        assert_eq!(map_key("a").unwrap(), Key::Unicode('a'));
        assert_eq!(map_key("F5").unwrap(), Key::F5);
        assert!(map_key("hyperdrive").is_err());
    }
}
