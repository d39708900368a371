//! Stationary drift correction.
//!
//! A joint held still should read exactly the accelerometer angle, so after a run of
//! ticks with near-zero rate the filter is snapped onto it. This bounds accumulated
//! gyro drift to one stationary timeout.

use crate::config::Config;

pub struct DriftCorrector {
    rate_threshold: f32,
    cycle_threshold: u32,
    stationary_cycles: u32,
}

impl DriftCorrector {
    pub fn new(config: &Config) -> Self {
        Self {
            rate_threshold: config.stationary_rate_threshold,
            cycle_threshold: config.stationary_cycle_threshold,
            stationary_cycles: 0,
        }
    }

    /// Feed the bias corrected, unfiltered gyro rate of this tick.
    ///
    /// Returns `true` when the filter has to be forced onto the accelerometer angle.
    pub fn observe(&mut self, gyro_rate: f32) -> bool {
        if gyro_rate.abs() >= self.rate_threshold {
            self.stationary_cycles = 0;
            return false;
        }

        self.stationary_cycles += 1;
        if self.stationary_cycles > self.cycle_threshold {
            self.stationary_cycles = 0;
            return true;
        }

        false
    }

    pub fn reset(&mut self) {
        self.stationary_cycles = 0;
    }

    pub fn stationary_cycles(&self) -> u32 {
        self.stationary_cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corrector() -> DriftCorrector {
        DriftCorrector::new(&Config {
            stationary_rate_threshold: 0.5,
            stationary_cycle_threshold: 3,
            ..Config::default()
        })
    }

    #[test]
    fn snaps_after_threshold_is_exceeded() {
        let mut drift = corrector();
        assert!(!drift.observe(0.1));
        assert!(!drift.observe(-0.2));
        assert!(!drift.observe(0.));
        assert!(drift.observe(0.4));
        assert_eq!(drift.stationary_cycles(), 0);
    }

    #[test]
    fn motion_resets_counter_immediately() {
        let mut drift = corrector();
        drift.observe(0.1);
        drift.observe(0.1);
        assert!(!drift.observe(0.5));
        assert_eq!(drift.stationary_cycles(), 0);
        assert!(!drift.observe(0.1));
        assert!(!drift.observe(0.1));
        assert!(!drift.observe(0.1));
        assert!(drift.observe(0.1));
    }

    #[test]
    fn negative_motion_counts_as_motion() {
        let mut drift = corrector();
        drift.observe(0.1);
        assert!(!drift.observe(-3.));
        assert_eq!(drift.stationary_cycles(), 0);
    }
}
