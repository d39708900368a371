use derive_more::Display;

const SAMPLE_PERIOD_MS: u32 = 20;
const ALPHA: f32 = 0.98;
const CALIBRATION_SAMPLES: u32 = 100;
const CALIBRATION_PROGRESS_INTERVAL: u32 = 25;
const SMOOTHING_WINDOW: usize = 5;
const FLEXION_LIMIT: f32 = 135.;
const FULL_EXTENSION: f32 = 180.;
const ACCEL_MAX_MAGNITUDE: f32 = 1500.; // CPX scale: +/-1024 is 2g
const STATIONARY_RATE_THRESHOLD: f32 = 0.5;
const STATIONARY_CYCLE_THRESHOLD: u32 = 50;
const REP_EXTENSION_THRESHOLD: f32 = 10.;
const REP_FLEXION_THRESHOLD: f32 = 30.;
const TELEMETRY_PERIOD_MS: u64 = 100;
const DT_MIN: f32 = 0.001;
const DT_MAX: f32 = 0.1;

#[derive(Debug, Display, PartialEq)]
pub enum Error {
    #[display("Invalid value {value} for `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        value: f32,
        reason: &'static str,
    },
}

impl std::error::Error for Error {}

/// Tuning of the whole estimation pipeline. Built once at startup and only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Nominal tick period, also the spacing of calibration samples.
    pub sample_period_ms: u32,
    /// Complementary filter weight of the gyro-integrated term.
    pub alpha: f32,
    pub calibration_samples: u32,
    /// A progress directive is emitted every this many calibration samples.
    pub calibration_progress_interval: u32,
    pub smoothing_window: usize,
    /// Upper clamp of the tracked angle, in degrees. The lower clamp is 0.
    pub flexion_limit: f32,
    /// Initial value of the extension minimum, in degrees.
    pub full_extension: f32,
    /// Per-axis plausibility bound for raw acceleration, device units.
    pub accel_max_magnitude: f32,
    /// deg/s
    pub stationary_rate_threshold: f32,
    pub stationary_cycle_threshold: u32,
    pub rep_extension_threshold: f32,
    pub rep_flexion_threshold: f32,
    pub telemetry_period_ms: u64,
    /// Bounds applied to the filter time step, in seconds.
    pub dt_min: f32,
    pub dt_max: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_period_ms: SAMPLE_PERIOD_MS,
            alpha: ALPHA,
            calibration_samples: CALIBRATION_SAMPLES,
            calibration_progress_interval: CALIBRATION_PROGRESS_INTERVAL,
            smoothing_window: SMOOTHING_WINDOW,
            flexion_limit: FLEXION_LIMIT,
            full_extension: FULL_EXTENSION,
            accel_max_magnitude: ACCEL_MAX_MAGNITUDE,
            stationary_rate_threshold: STATIONARY_RATE_THRESHOLD,
            stationary_cycle_threshold: STATIONARY_CYCLE_THRESHOLD,
            rep_extension_threshold: REP_EXTENSION_THRESHOLD,
            rep_flexion_threshold: REP_FLEXION_THRESHOLD,
            telemetry_period_ms: TELEMETRY_PERIOD_MS,
            dt_min: DT_MIN,
            dt_max: DT_MAX,
        }
    }
}

fn invalid(field: &'static str, value: f32, reason: &'static str) -> Error {
    Error::Invalid {
        field,
        value,
        reason,
    }
}

impl Config {
    pub fn validate(self) -> Result<Self, Error> {
        if !(self.alpha > 0. && self.alpha < 1.) {
            return Err(invalid("alpha", self.alpha, "must lie in (0, 1)"));
        }
        if self.sample_period_ms == 0 {
            return Err(invalid("sample_period_ms", 0., "must be positive"));
        }
        if self.calibration_samples == 0 {
            return Err(invalid("calibration_samples", 0., "must be positive"));
        }
        if self.calibration_progress_interval == 0 {
            return Err(invalid(
                "calibration_progress_interval",
                0.,
                "must be positive",
            ));
        }
        if self.smoothing_window == 0 {
            return Err(invalid("smoothing_window", 0., "must be positive"));
        }
        if !(self.flexion_limit > 0.) {
            return Err(invalid(
                "flexion_limit",
                self.flexion_limit,
                "must be positive",
            ));
        }
        if !(self.full_extension >= self.flexion_limit) {
            return Err(invalid(
                "full_extension",
                self.full_extension,
                "must not be below flexion_limit",
            ));
        }
        if !(self.accel_max_magnitude > 0.) {
            return Err(invalid(
                "accel_max_magnitude",
                self.accel_max_magnitude,
                "must be positive",
            ));
        }
        if !(self.stationary_rate_threshold >= 0.) {
            return Err(invalid(
                "stationary_rate_threshold",
                self.stationary_rate_threshold,
                "must not be negative",
            ));
        }
        if !(self.rep_extension_threshold < self.rep_flexion_threshold) {
            return Err(invalid(
                "rep_extension_threshold",
                self.rep_extension_threshold,
                "must be below rep_flexion_threshold",
            ));
        }
        if self.telemetry_period_ms == 0 {
            return Err(invalid("telemetry_period_ms", 0., "must be positive"));
        }
        if !(self.dt_min > 0. && self.dt_min <= self.dt_max) {
            return Err(invalid("dt_min", self.dt_min, "must lie in (0, dt_max]"));
        }

        Ok(self)
    }
}
