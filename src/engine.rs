//! Per-tick estimation and tracking pipeline.
//!
//! All state lives in one [`Engine`] owned by the main loop. Each tick runs, in order:
//! external triggers, the calibration step (exclusive while a run is active), the
//! sensor guard, the uncalibrated gate and finally
//! filter -> drift correction -> smoothing -> ROM tracking.

use log::{debug, info, warn};

use crate::calibration::{
    CalibrationPhase, CalibrationReport, CalibrationState, CalibrationStep, Calibrator,
};
use crate::config::Config;
use crate::drift::DriftCorrector;
use crate::feedback::{AudioCue, DisplayDirective, Event, TelemetryFrame, TelemetryThrottle};
use crate::orientation::ComplementaryFilter;
use crate::rom::{RomState, RomTracker};
use crate::sensor::{self, RawSample, SensorGuard};
use crate::smoothing::SmoothingBuffer;
use crate::Result;

/// Discrete button events delivered at the tick boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Triggers {
    pub calibrate: bool,
    /// Clears the ROM counters, calibration is kept.
    pub reset_rom: bool,
}

impl Triggers {
    /// Combine presses collected over several polls.
    pub fn merge(self, other: Triggers) -> Triggers {
        Triggers {
            calibrate: self.calibrate || other.calibrate,
            reset_rom: self.reset_rom || other.reset_rom,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    pub sample: RawSample,
    /// Monotonic timestamp.
    pub now_ms: u64,
    pub triggers: Triggers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    Uncalibrated,
    Calibrating,
    /// Acceleration out of the plausible range, tick skipped.
    SensorFault,
    Tracking,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    pub status: EngineStatus,
    /// Smoothed angle, only set while tracking.
    pub angle: Option<f32>,
    pub events: Vec<Event>,
}

impl TickOutput {
    fn new(status: EngineStatus, events: Vec<Event>) -> Self {
        Self {
            status,
            angle: None,
            events,
        }
    }
}

pub struct Engine {
    config: Config,
    guard: SensorGuard,
    calibration: CalibrationState,
    calibrator: Calibrator,
    last_calibration: Option<CalibrationReport>,
    filter: ComplementaryFilter,
    drift: DriftCorrector,
    smoothing: SmoothingBuffer,
    rom: RomTracker,
    telemetry: TelemetryThrottle,
    sensor_fault: bool,
}

impl Engine {
    pub fn new(config: Config) -> Result<Self> {
        let config = config.validate()?;

        Ok(Self {
            guard: SensorGuard::new(config.accel_max_magnitude),
            calibration: CalibrationState::default(),
            calibrator: Calibrator::new(&config),
            last_calibration: None,
            filter: ComplementaryFilter::new(&config),
            drift: DriftCorrector::new(&config),
            smoothing: SmoothingBuffer::new(config.smoothing_window),
            rom: RomTracker::new(&config),
            telemetry: TelemetryThrottle::new(config.telemetry_period_ms),
            sensor_fault: false,
            config,
        })
    }

    pub fn update(&mut self, input: TickInput) -> TickOutput {
        let mut events = Vec::new();

        if input.triggers.calibrate {
            self.start_calibration(input.now_ms, &mut events);
        }
        if input.triggers.reset_rom {
            if self.calibrator.is_active() {
                debug!("Ignoring ROM reset while calibrating");
            } else {
                self.reset_rom();
                events.push(Event::Audio(AudioCue::RomReset));
                events.push(Event::Display(DisplayDirective::ResetAcknowledged));
            }
        }

        if self.calibrator.is_active() {
            self.calibration_step(&input, &mut events);
            return TickOutput::new(EngineStatus::Calibrating, events);
        }

        if !self.check_sensor(&input.sample) {
            events.push(Event::Display(DisplayDirective::SensorError));
            return TickOutput::new(EngineStatus::SensorFault, events);
        }

        if !self.calibration.is_calibrated {
            events.push(Event::Display(DisplayDirective::WaitingForCalibration));
            return TickOutput::new(EngineStatus::Uncalibrated, events);
        }

        let angle = self.track(&input, &mut events);

        TickOutput {
            status: EngineStatus::Tracking,
            angle: Some(angle),
            events,
        }
    }

    /// Clear max flexion, max extension and ROM. Calibration and filter state are untouched.
    pub fn reset_rom(&mut self) {
        self.rom.reset();
        info!("ROM counters reset");
    }

    fn start_calibration(&mut self, now_ms: u64, events: &mut Vec<Event>) {
        if !self.calibrator.start(now_ms) {
            debug!("Calibration already running, trigger ignored");
            return;
        }

        events.push(Event::Display(DisplayDirective::Calibrating));
        events.push(Event::Audio(AudioCue::CalibrationStart));
    }

    fn calibration_step(&mut self, input: &TickInput, events: &mut Vec<Event>) {
        match self.calibrator.step(&input.sample, input.now_ms) {
            CalibrationStep::Sampling { progress } => {
                if let Some(step) = progress {
                    let steps = self.calibrator.progress_steps();
                    events.push(Event::Display(DisplayDirective::progress(step, steps)));
                }
            }
            CalibrationStep::Finished(report) => {
                self.calibration = CalibrationState {
                    is_calibrated: true,
                    gyro_bias: report.gyro_bias,
                };
                self.filter.reset(input.now_ms);
                self.drift.reset();
                self.smoothing.clear();
                self.rom.reset_all();
                self.last_calibration = Some(report);

                events.push(Event::Display(DisplayDirective::CalibrationSuccess));
                events.push(Event::Audio(AudioCue::CalibrationSuccess));
            }
        }
    }

    fn check_sensor(&mut self, sample: &RawSample) -> bool {
        let valid = self.guard.is_valid(&sample.accel);

        if !valid && !self.sensor_fault {
            warn!(
                "Accelerometer out of range: ({:.0}, {:.0}, {:.0})",
                sample.accel.x, sample.accel.y, sample.accel.z
            );
        } else if valid && self.sensor_fault {
            info!("Accelerometer back in range");
        }
        self.sensor_fault = !valid;

        valid
    }

    fn track(&mut self, input: &TickInput, events: &mut Vec<Event>) -> f32 {
        let accel_angle = sensor::accel_angle(&input.sample.accel);
        let gyro_rate = sensor::gyro_rate(input.sample.gyro_rate, &self.calibration);

        self.filter.update(accel_angle, gyro_rate, input.now_ms);
        if self.drift.observe(gyro_rate) {
            debug!(
                "Stationary, snapping {:.1}deg to accelerometer {:.1}deg",
                self.filter.pitch(),
                accel_angle
            );
            self.filter.snap_to(accel_angle);
        }

        let angle = self.smoothing.push(self.filter.pitch());

        if let Some(rep) = self.rom.update(angle) {
            events.push(Event::Rep(rep));
            events.push(Event::Audio(AudioCue::RepCompleted));
        }

        events.push(Event::Display(DisplayDirective::angle(
            angle,
            self.config.flexion_limit,
        )));

        if self.telemetry.ready(input.now_ms) {
            let rom = self.rom.state();
            events.push(Event::Telemetry(TelemetryFrame {
                angle: rom.current_angle,
                rom: rom.rom,
                max_flexion: rom.max_flexion,
            }));
        }

        angle
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn calibration(&self) -> CalibrationState {
        self.calibration
    }

    pub fn calibration_phase(&self) -> CalibrationPhase {
        self.calibrator.phase()
    }

    pub fn last_calibration(&self) -> Option<CalibrationReport> {
        self.last_calibration
    }

    pub fn pitch(&self) -> f32 {
        self.filter.pitch()
    }

    pub fn rom(&self) -> RomState {
        self.rom.state()
    }

    pub fn smoothing_len(&self) -> usize {
        self.smoothing.len()
    }

    pub fn stationary_cycles(&self) -> u32 {
        self.drift.stationary_cycles()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::Accel;
    use approx::assert_relative_eq;

    const LEVEL: Accel = Accel {
        x: 0.,
        y: 0.,
        z: 1024.,
    };

    fn tick(now_ms: u64, accel: Accel, gyro_rate: f32) -> TickInput {
        TickInput {
            sample: RawSample { accel, gyro_rate },
            now_ms,
            triggers: Triggers::default(),
        }
    }

    fn calibrate_trigger(now_ms: u64) -> TickInput {
        TickInput {
            triggers: Triggers {
                calibrate: true,
                reset_rom: false,
            },
            ..tick(now_ms, LEVEL, 0.)
        }
    }

    fn engine(samples: u32) -> Engine {
        Engine::new(Config {
            calibration_samples: samples,
            ..Config::default()
        })
        .unwrap()
    }

    fn calibrated(samples: u32, bias: f32) -> (Engine, u64) {
        let mut engine = engine(samples);
        let mut now = 0;
        let mut input = calibrate_trigger(now);
        input.sample.gyro_rate = bias;
        engine.update(input);
        for _ in 1..samples {
            now += 20;
            engine.update(tick(now, LEVEL, bias));
        }
        assert!(engine.calibration().is_calibrated);
        (engine, now)
    }

    #[test]
    fn rejects_invalid_config() {
        let config = Config {
            alpha: 1.2,
            ..Config::default()
        };
        assert!(Engine::new(config).is_err());
    }

    #[test]
    fn waits_for_calibration() {
        let mut engine = engine(10);
        let out = engine.update(tick(0, LEVEL, 5.));
        assert_eq!(out.status, EngineStatus::Uncalibrated);
        assert_eq!(out.angle, None);
        assert_eq!(
            out.events,
            vec![Event::Display(DisplayDirective::WaitingForCalibration)]
        );
        assert_eq!(engine.smoothing_len(), 0);
    }

    #[test]
    fn sensor_fault_skips_tick() {
        let (mut engine, now) = calibrated(3, 0.);
        let out = engine.update(tick(now + 20, Accel::new(1501., 0., 0.), 0.));
        assert_eq!(out.status, EngineStatus::SensorFault);
        assert_eq!(out.events, vec![Event::Display(DisplayDirective::SensorError)]);
        assert_eq!(engine.smoothing_len(), 0);

        let out = engine.update(tick(now + 40, LEVEL, 0.));
        assert_eq!(out.status, EngineStatus::Tracking);
    }

    #[test]
    fn sensor_fault_precedes_calibration_gate() {
        let mut engine = engine(3);
        let out = engine.update(tick(0, Accel::new(0., 2000., 0.), 0.));
        assert_eq!(out.status, EngineStatus::SensorFault);
    }

    #[test]
    fn calibration_blocks_tracking() {
        let mut engine = engine(3);
        let out = engine.update(calibrate_trigger(0));
        assert_eq!(out.status, EngineStatus::Calibrating);
        assert_eq!(
            out.events,
            vec![
                Event::Display(DisplayDirective::Calibrating),
                Event::Audio(AudioCue::CalibrationStart),
                Event::Display(DisplayDirective::CalibrationProgress(0)),
            ]
        );

        // out of range samples are still taken while calibrating
        let out = engine.update(tick(20, Accel::new(5000., 0., 0.), 0.));
        assert_eq!(out.status, EngineStatus::Calibrating);
        assert_eq!(out.angle, None);

        let out = engine.update(tick(40, LEVEL, 0.));
        assert_eq!(out.status, EngineStatus::Calibrating);
        assert!(out
            .events
            .contains(&Event::Audio(AudioCue::CalibrationSuccess)));
        assert_eq!(engine.calibration_phase(), CalibrationPhase::Done);

        let out = engine.update(tick(60, LEVEL, 0.));
        assert_eq!(out.status, EngineStatus::Tracking);
    }

    #[test]
    fn calibration_resets_downstream_state() {
        let (mut engine, mut now) = calibrated(2, 0.);
        let tilted = Accel::new(-724., 0., 724.);
        for _ in 0..30 {
            now += 20;
            engine.update(tick(now, tilted, 40.));
        }
        assert!(engine.rom().max_flexion > 0.);

        now += 20;
        engine.update(calibrate_trigger(now));
        now += 20;
        engine.update(tick(now, LEVEL, 2.));

        let rom = engine.rom();
        assert!(engine.calibration().is_calibrated);
        assert_relative_eq!(engine.calibration().gyro_bias, 1.);
        assert_eq!(rom.max_flexion, 0.);
        assert_eq!(rom.max_extension, 180.);
        assert_eq!(rom.rom, 0.);
        assert_eq!(engine.pitch(), 0.);
        assert_eq!(engine.smoothing_len(), 0);
        assert_eq!(engine.stationary_cycles(), 0);
    }

    #[test]
    fn long_calibration_progress_stays_on_strip() {
        let mut engine = engine(400);
        let mut pixels = Vec::new();
        let mut now = 0;
        let mut input = calibrate_trigger(now);
        while engine.calibration_phase() != CalibrationPhase::Done {
            for event in engine.update(input).events {
                if let Event::Display(DisplayDirective::CalibrationProgress(n)) = event {
                    pixels.push(DisplayDirective::CalibrationProgress(n).pixel());
                }
            }
            now += 20;
            input = tick(now, LEVEL, 0.);
        }

        assert_eq!(pixels.len(), 16);
        assert!(pixels.iter().all(|p| matches!(p, Some(0..=9))), "{pixels:?}");
        assert_eq!(pixels.first(), Some(&Some(0)));
        assert_eq!(pixels.last(), Some(&Some(9)));
        assert!(pixels.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn merged_triggers_keep_every_press() {
        let calibrate = Triggers {
            calibrate: true,
            reset_rom: false,
        };
        let reset = Triggers {
            calibrate: false,
            reset_rom: true,
        };
        let pending = Triggers::default().merge(calibrate).merge(Triggers::default());
        assert_eq!(pending, calibrate);
        assert_eq!(
            pending.merge(reset),
            Triggers {
                calibrate: true,
                reset_rom: true,
            }
        );
    }

    #[test]
    fn second_calibrate_trigger_is_ignored() {
        let mut engine = engine(3);
        engine.update(calibrate_trigger(0));
        let out = engine.update(calibrate_trigger(20));
        assert!(!out
            .events
            .contains(&Event::Audio(AudioCue::CalibrationStart)));
        assert_eq!(
            engine.calibration_phase(),
            CalibrationPhase::Sampling { collected: 2 }
        );
    }

    #[test]
    fn bias_is_removed_from_rate() {
        let (mut engine, mut now) = calibrated(5, 3.);
        for _ in 0..10 {
            now += 20;
            engine.update(tick(now, LEVEL, 3.));
        }
        assert_relative_eq!(engine.pitch(), 0.);
    }

    #[test]
    fn reset_rom_trigger_is_idempotent() {
        let (mut engine, mut now) = calibrated(2, 0.5);
        let tilted = Accel::new(-724., 0., 724.);
        for _ in 0..20 {
            now += 20;
            engine.update(tick(now, tilted, 0.5));
        }

        let reset = |now| TickInput {
            triggers: Triggers {
                calibrate: false,
                reset_rom: true,
            },
            ..tick(now, Accel::new(0., 0., 9000.), 0.)
        };

        let out = engine.update(reset(now + 20));
        assert!(out.events.contains(&Event::Audio(AudioCue::RomReset)));
        let once = engine.rom();
        engine.update(reset(now + 40));
        let twice = engine.rom();

        assert_eq!(once, twice);
        assert_eq!(twice.max_flexion, 0.);
        assert_eq!(twice.max_extension, 180.);
        assert_eq!(twice.rom, 0.);
        assert_eq!(
            engine.calibration(),
            CalibrationState {
                is_calibrated: true,
                gyro_bias: 0.5,
            }
        );
    }
}
