use std::cell::{Cell, RefCell};
use std::sync::LazyLock;
use std::thread::sleep;
use std::time::Duration;
use std::time::Instant;

static START: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Get the time in 100ns units
pub fn get_time_100ns() -> i64 {
    let duration = START.elapsed();

    let seconds = duration.as_secs() as i64;
    let nanos = duration.subsec_nanos() as i64;

    (seconds * 10_000_000) + (nanos / 100)
}

/// Delay the thread execution using 100ns units
pub fn delay_execution_100ns(delay_in_100ns: i64) {
    if delay_in_100ns <= 0 {
        return;
    }

    let secs = delay_in_100ns / 10_000_000;
    let nanos = (delay_in_100ns % 10_000_000) * 100;

    let duration = Duration::new(secs as u64, nanos as u32);
    sleep(duration);
}

/// Time source and sleeper used by the pacer, in 100ns units.
pub trait Clock {
    fn now_100ns(&self) -> i64;
    fn sleep_100ns(&self, delay: i64);
}

/// Monotonic wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_100ns(&self) -> i64 {
        get_time_100ns()
    }

    fn sleep_100ns(&self, delay: i64) {
        delay_execution_100ns(delay);
    }
}

/// A clock that only moves when slept on or advanced by hand.
///
/// Lets the player render a file without waiting for it.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<i64>,
    sleeps: RefCell<Vec<i64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward without sleeping, e.g. to simulate a stall.
    pub fn advance(&self, by: i64) {
        self.now.set(self.now.get() + by);
    }

    /// Every delay requested so far.
    pub fn sleeps(&self) -> Vec<i64> {
        self.sleeps.borrow().clone()
    }
}

impl Clock for ManualClock {
    fn now_100ns(&self) -> i64 {
        self.now.get()
    }

    fn sleep_100ns(&self, delay: i64) {
        if delay > 0 {
            self.sleeps.borrow_mut().push(delay);
            self.advance(delay);
        }
    }
}
