/// Default tempo: 120 BPM.
pub const DEFAULT_TEMPO: u32 = 500_000;

/// Tempo and time division, plus the derived tick-to-time multiplier.
#[derive(Debug, Clone, Copy)]
pub struct Tempo {
    us_per_quarter: u32,
    time_div: u16,
    multiplier: f64,
}

impl Tempo {
    pub fn new(time_div: u16) -> Self {
        let mut tempo = Tempo {
            us_per_quarter: DEFAULT_TEMPO,
            time_div,
            multiplier: 1.0,
        };
        tempo.set(DEFAULT_TEMPO);
        tempo
    }

    /// Set microseconds per quarter note and recompute the multiplier.
    pub fn set(&mut self, us_per_quarter: u32) {
        self.us_per_quarter = us_per_quarter;
        // 1 microsecond = 10 * 100ns, so (t * 10)/time_div = 100ns units per tick
        let m = (f64::from(us_per_quarter) * 10.0) / f64::from(self.time_div.max(1));
        self.multiplier = m.max(1.0);
    }

    pub fn us_per_quarter(&self) -> u32 {
        self.us_per_quarter
    }

    pub fn time_div(&self) -> u16 {
        self.time_div
    }

    /// 100ns units per MIDI tick, never below 1.0.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn bpm(&self) -> f64 {
        60_000_000.0 / f64::from(self.us_per_quarter.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_120_bpm() {
        let tempo = Tempo::new(480);
        assert_eq!(tempo.us_per_quarter(), DEFAULT_TEMPO);
        assert!((tempo.bpm() - 120.0).abs() < f64::EPSILON);
        assert!((tempo.multiplier() - 10_416.666_666).abs() < 0.001);
    }

    #[test]
    fn multiplier_floors_at_one() {
        let mut tempo = Tempo::new(0x7FFF);
        tempo.set(1);
        assert_eq!(tempo.multiplier(), 1.0);
        tempo.set(0);
        assert_eq!(tempo.multiplier(), 1.0);
    }
}
