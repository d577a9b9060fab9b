use crate::midi::utils::Clock;

/// Largest lag the pacer carries after a stall: 10ms in 100ns units.
pub const MAX_DRIFT_100NS: i64 = 100_000;

/// Converts tick deltas into sleeps, feeding back the time the loop really took.
#[derive(Debug, Clone)]
pub struct DriftPacer {
    /// Sleep expected for the previous step.
    old: i64,
    /// Accumulated lag behind the ideal timeline.
    delta: i64,
    max_drift: i64,
    last_time: i64,
}

impl DriftPacer {
    pub fn new(now: i64) -> Self {
        Self::with_max_drift(now, MAX_DRIFT_100NS)
    }

    pub fn with_max_drift(now: i64, max_drift: i64) -> Self {
        DriftPacer {
            old: 0,
            delta: 0,
            max_drift,
            last_time: now,
        }
    }

    pub fn drift(&self) -> i64 {
        self.delta
    }

    /// Calculate how long to sleep for the next event, with drift correction.
    /// - `delta_tick`: ticks since the last event
    /// - `multiplier`: 100ns units per tick
    ///
    /// Returns how long to sleep in 100ns units.
    pub fn calc_sleep_time(&mut self, delta_tick: u64, multiplier: f64, now: i64) -> i64 {
        let expected_100ns = (delta_tick as f64 * multiplier) as i64;

        let elapsed = now - self.last_time;
        self.last_time = now;

        let work_time = elapsed - self.old;
        self.old = expected_100ns;

        self.delta = self.delta.saturating_add(work_time);

        if self.delta > 0 {
            let sleep_time = self.old - self.delta;
            if sleep_time <= 0 {
                self.delta = self.delta.min(self.max_drift);
                0
            } else {
                sleep_time
            }
        } else {
            self.old
        }
    }

    /// Block until `delta_tick` ticks have passed on `clock`.
    pub fn pace<C: Clock>(&mut self, delta_tick: u64, multiplier: f64, clock: &C) {
        let sleep_time = self.calc_sleep_time(delta_tick, multiplier, clock.now_100ns());
        if sleep_time > 0 {
            clock.sleep_100ns(sleep_time);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::utils::ManualClock;

    #[test]
    fn sleeps_expected_time_when_on_schedule() {
        let clock = ManualClock::new();
        let mut pacer = DriftPacer::new(clock.now_100ns());
        pacer.pace(10, 1_000.0, &clock);
        pacer.pace(20, 1_000.0, &clock);
        assert_eq!(clock.sleeps(), vec![10_000, 20_000]);
        assert_eq!(pacer.drift(), 0);
    }

    #[test]
    fn processing_time_is_subtracted() {
        let clock = ManualClock::new();
        let mut pacer = DriftPacer::new(0);
        pacer.pace(10, 1_000.0, &clock);
        clock.advance(2_000);
        pacer.pace(10, 1_000.0, &clock);
        assert_eq!(clock.sleeps(), vec![10_000, 8_000]);
        assert_eq!(pacer.drift(), 2_000);
    }

    #[test]
    fn stall_is_clamped_to_max_lag() {
        let clock = ManualClock::new();
        let mut pacer = DriftPacer::new(0);
        pacer.pace(10, 10.0, &clock);
        // 50ms stall
        clock.advance(500_000);
        pacer.pace(10, 10.0, &clock);
        assert!(pacer.drift() <= MAX_DRIFT_100NS);
        assert_eq!(clock.sleeps(), vec![100]);

        // The clamped lag, less the unslept 100 of the stalled step, is worked off next
        pacer.pace(20_000, 10.0, &clock);
        assert_eq!(clock.sleeps(), vec![100, 200_000 - (MAX_DRIFT_100NS - 100)]);
    }

    #[test]
    fn zero_delta_never_sleeps() {
        let clock = ManualClock::new();
        let mut pacer = DriftPacer::new(0);
        pacer.pace(0, 10_416.0, &clock);
        assert!(clock.sleeps().is_empty());
    }
}
