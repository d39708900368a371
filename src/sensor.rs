//! Per-tick sensor front end: plausibility gate and the two angle sources fed to the filter.

use crate::calibration::CalibrationState;

/// Raw three axis acceleration in device-native units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accel {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Accel {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// One raw reading of every sensor the engine consumes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawSample {
    pub accel: Accel,
    /// Angular rate around the tracked axis, deg/s, bias not removed.
    pub gyro_rate: f32,
}

/// Rejects samples with any axis beyond `max_magnitude`. A reading exactly at the bound is valid.
pub struct SensorGuard {
    max_magnitude: f32,
}

impl SensorGuard {
    pub fn new(max_magnitude: f32) -> Self {
        Self { max_magnitude }
    }

    pub fn is_valid(&self, accel: &Accel) -> bool {
        [accel.x, accel.y, accel.z]
            .iter()
            .all(|axis| axis.abs() <= self.max_magnitude)
    }
}

/// Tilt angle of the accelerometer in degrees, `atan2(-x, sqrt(y² + z²))`.
///
/// With `y = z = 0` this follows `atan2` and yields ±90°; such a reading is outside
/// the normal operating envelope and is not guarded separately.
pub fn accel_angle(accel: &Accel) -> f32 {
    (-accel.x)
        .atan2((accel.y * accel.y + accel.z * accel.z).sqrt())
        .to_degrees()
}

/// Bias corrected angular rate. Only meaningful once `calibration` is calibrated.
pub fn gyro_rate(raw_rate: f32, calibration: &CalibrationState) -> f32 {
    raw_rate - calibration.gyro_bias
}
