use std::thread;
use std::time::{Duration, Instant};

/// Granularity at which sleeps poll their stop predicate.
pub const SLEEP_SLICE: Duration = Duration::from_millis(20);

/// Non-negative seconds as a `Duration`; negative or NaN is zero, overflow
/// saturates.
pub fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

/// Sleep for `duration` in slices of at most [`SLEEP_SLICE`], checking
/// `should_stop` before each slice.
///
/// Returns `true` when the full duration elapsed and `false` when the sleep
/// was cut short (including when `should_stop` is already true on entry).
pub fn sleep_interruptible(duration: Duration, should_stop: &dyn Fn() -> bool) -> bool {
    // `None` when the deadline is beyond what `Instant` can represent.
    let deadline = Instant::now().checked_add(duration);
    loop {
        if should_stop() {
            return false;
        }
        let now = Instant::now();
        let left = match deadline {
            Some(d) if now >= d => return true,
            Some(d) => d - now,
            None => SLEEP_SLICE,
        };
        thread::sleep(left.min(SLEEP_SLICE));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn completes_when_not_stopped() {
        let start = Instant::now();
        assert!(sleep_interruptible(Duration::from_millis(60), &|| false));
        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[test]
    fn seconds_are_saturated() {
        assert_eq!(secs(1.5), Duration::from_millis(1500));
        assert_eq!(secs(-2.0), Duration::ZERO);
        assert_eq!(secs(f64::NAN), Duration::ZERO);
        assert_eq!(secs(f64::INFINITY), Duration::MAX);
    }

    #[test]
    fn already_stopped_returns_immediately() {
        let start = Instant::now();
        assert!(!sleep_interruptible(Duration::from_secs(5), &|| true));
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn wakes_up_shortly_after_stop() {
        let flag = Arc::new(AtomicBool::new(false));
        let setter = Arc::clone(&flag);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            setter.store(true, Ordering::SeqCst);
        });
        let start = Instant::now();
        let completed = sleep_interruptible(Duration::from_secs(10), &|| flag.load(Ordering::SeqCst));
        handle.join().unwrap();
        assert!(!completed);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
