use derive_more::Display;
use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use mpu6050::device::{AccelRange, GyroRange};
use mpu6050::Mpu6050;

use crate::sensor::{Accel, RawSample};

/// Device units per g handed to the engine, matching the default plausibility bound.
const ACCEL_UNITS_PER_G: f32 = 1024.;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display)]
pub enum Error {
    #[display("Can not wake up MPU6050")]
    MpuWakeup,
    #[display("Can not toggle MPU6050 temperature sensor")]
    TemperatureToggle,
    #[display("Can not set gyroscope range")]
    SetGyroRange,
    #[display("Can not set accelerometer range")]
    SetAccelRange,
    #[display("Can not read gyroscope")]
    GyroRead,
    #[display("Can not read accelerometer")]
    AccelRead,
}

impl std::error::Error for Error {}

/// Source of raw readings, polled once per tick.
pub trait ImuSource {
    fn read(&mut self) -> Result<RawSample>;
}

/// Gyro axis carrying the joint's flexion rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

pub struct Mpu6050Imu<I> {
    mpu: Mpu6050<I>,
    pitch_axis: Axis,
}

impl<I: I2c> Mpu6050Imu<I> {
    pub fn new<D: DelayNs>(delay: &mut D, i2c: I, pitch_axis: Axis) -> Result<Self> {
        let mut mpu = Mpu6050::new(i2c);

        log::info!("Starting Mpu set up...");
        mpu.init(delay).map_err(|_| Error::MpuWakeup)?;

        mpu.set_temp_enabled(false)
            .map_err(|_| Error::TemperatureToggle)?;
        mpu.set_gyro_range(GyroRange::D500)
            .map_err(|_| Error::SetGyroRange)?;
        mpu.set_accel_range(AccelRange::G8)
            .map_err(|_| Error::SetAccelRange)?;
        log::info!("Finished Mpu set up.");

        Ok(Self { mpu, pitch_axis })
    }
}

impl<I: I2c> ImuSource for Mpu6050Imu<I> {
    fn read(&mut self) -> Result<RawSample> {
        let gyro = self.mpu.get_gyro().map_err(|_| Error::GyroRead)?;
        let acc = self.mpu.get_acc().map_err(|_| Error::AccelRead)?;

        let rate = match self.pitch_axis {
            Axis::X => gyro.x,
            Axis::Y => gyro.y,
            Axis::Z => gyro.z,
        };

        Ok(RawSample {
            accel: Accel::new(
                acc.x * ACCEL_UNITS_PER_G,
                acc.y * ACCEL_UNITS_PER_G,
                acc.z * ACCEL_UNITS_PER_G,
            ),
            gyro_rate: rate.to_degrees(),
        })
    }
}
