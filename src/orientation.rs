//! Complementary filter fusing the accelerometer tilt with the integrated gyro rate.
//!
//! `pitch = alpha * (pitch + rate * dt) + (1 - alpha) * accel_angle`
//!
//! The gyro term follows fast motion without picking up accelerometer vibration, the
//! accelerometer term anchors the absolute angle and bleeds off integration drift.
//! `alpha` close to 1 favours the gyro.

use crate::config::Config;

pub struct ComplementaryFilter {
    alpha: f32,
    flexion_limit: f32,
    dt_min: f32,
    dt_max: f32,
    pitch: f32,
    last_timestamp_ms: Option<u64>,
}

impl ComplementaryFilter {
    pub fn new(config: &Config) -> Self {
        Self {
            alpha: config.alpha,
            flexion_limit: config.flexion_limit,
            dt_min: config.dt_min,
            dt_max: config.dt_max,
            pitch: 0.,
            last_timestamp_ms: None,
        }
    }

    /// Seconds elapsed since the previous update, clamped to `[dt_min, dt_max]`.
    ///
    /// A clock that steps backwards counts as zero elapsed time.
    pub fn dt(&self, now_ms: u64) -> f32 {
        let elapsed_ms = match self.last_timestamp_ms {
            Some(last) => now_ms.saturating_sub(last),
            None => 0,
        };

        (elapsed_ms as f32 / 1000.).clamp(self.dt_min, self.dt_max)
    }

    pub fn update(&mut self, accel_angle: f32, gyro_rate: f32, now_ms: u64) -> f32 {
        let dt = self.dt(now_ms);
        self.last_timestamp_ms = Some(now_ms);

        let fused =
            self.alpha * (self.pitch + gyro_rate * dt) + (1. - self.alpha) * accel_angle;
        self.pitch = self.clamp(fused);

        self.pitch
    }

    /// Hard override of the estimate, still kept inside the valid range.
    pub fn snap_to(&mut self, angle: f32) {
        self.pitch = self.clamp(angle);
    }

    /// Zero the estimate and restart the time base at `now_ms`.
    pub fn reset(&mut self, now_ms: u64) {
        self.pitch = 0.;
        self.last_timestamp_ms = Some(now_ms);
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    fn clamp(&self, angle: f32) -> f32 {
        angle.clamp(0., self.flexion_limit)
    }
}
