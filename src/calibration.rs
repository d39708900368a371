//! Gyro bias and zero reference calibration.
//!
//! Runs as a step machine driven by the same ticks as tracking: one raw sample per
//! tick while `Sampling`, then `Computing` and `Done` on the tick that delivers the
//! last sample. `Done` is kept until the next run starts. The engine runs nothing
//! else while the calibrator is busy.
//!
//! Samples are averaged unconditionally. Moving the joint while calibrating yields a
//! wrong bias.

use log::info;

use crate::config::Config;
use crate::sensor::{self, RawSample};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CalibrationState {
    pub is_calibrated: bool,
    /// deg/s
    pub gyro_bias: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    Idle,
    Sampling { collected: u32 },
    Computing,
    Done,
}

/// Outcome of one calibration run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationReport {
    pub gyro_bias: f32,
    /// Mean accelerometer angle while sampling. Logged only: the current position
    /// becomes the logical zero by resetting the filter, accelerometer angles stay unshifted.
    pub reference_angle: f32,
    pub samples: u32,
    pub started_ms: u64,
    pub finished_ms: u64,
}

/// Result of feeding one tick to the calibrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationStep {
    /// Still sampling. `progress` is set on every progress interval boundary.
    Sampling { progress: Option<u32> },
    Finished(CalibrationReport),
}

pub struct Calibrator {
    samples: u32,
    progress_interval: u32,
    phase: CalibrationPhase,
    sum_gyro: f32,
    sum_accel: f32,
    started_ms: u64,
}

impl Calibrator {
    pub fn new(config: &Config) -> Self {
        Self {
            samples: config.calibration_samples,
            progress_interval: config.calibration_progress_interval,
            phase: CalibrationPhase::Idle,
            sum_gyro: 0.,
            sum_accel: 0.,
            started_ms: 0,
        }
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        matches!(
            self.phase,
            CalibrationPhase::Sampling { .. } | CalibrationPhase::Computing
        )
    }

    /// Upper bound on the progress markers of one run. Zero when progress is disabled.
    pub fn progress_steps(&self) -> u32 {
        match self.progress_interval {
            0 => 0,
            interval => self.samples.div_ceil(interval),
        }
    }

    /// Enter `Sampling`. Returns `false` and changes nothing if a run is already active.
    pub fn start(&mut self, now_ms: u64) -> bool {
        if self.is_active() {
            return false;
        }

        info!("Starting calibration, {} samples...", self.samples);
        self.phase = CalibrationPhase::Sampling { collected: 0 };
        self.sum_gyro = 0.;
        self.sum_accel = 0.;
        self.started_ms = now_ms;
        true
    }

    /// Accumulate one raw sample. Must only be called while active.
    pub fn step(&mut self, sample: &RawSample, now_ms: u64) -> CalibrationStep {
        let index = match self.phase {
            CalibrationPhase::Sampling { collected } => collected,
            _ => 0,
        };

        self.sum_gyro += sample.gyro_rate;
        self.sum_accel += sensor::accel_angle(&sample.accel);

        let progress = (index.checked_rem(self.progress_interval) == Some(0))
            .then(|| index / self.progress_interval);
        let collected = index + 1;

        if collected < self.samples {
            self.phase = CalibrationPhase::Sampling { collected };
            return CalibrationStep::Sampling { progress };
        }

        self.phase = CalibrationPhase::Computing;
        let report = self.compute(now_ms);
        self.phase = CalibrationPhase::Done;

        info!(
            "Finished calibration, gyro bias {:.3}deg/s, reference angle {:.1}deg, {}ms",
            report.gyro_bias,
            report.reference_angle,
            report.finished_ms.saturating_sub(report.started_ms)
        );

        CalibrationStep::Finished(report)
    }

    fn compute(&self, now_ms: u64) -> CalibrationReport {
        CalibrationReport {
            gyro_bias: self.sum_gyro / self.samples as f32,
            reference_angle: self.sum_accel / self.samples as f32,
            samples: self.samples,
            started_ms: self.started_ms,
            finished_ms: now_ms,
        }
    }
}
