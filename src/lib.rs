//! Knee flexion angle estimation and range of motion tracking from a single
//! accelerometer and gyroscope axis.

pub mod calibration;
pub mod config;
pub mod drift;
pub mod engine;
mod error;
pub mod feedback;
pub mod imu;
pub mod orientation;
pub mod rom;
pub mod sensor;
pub mod smoothing;

pub use config::Config;
pub use engine::{Engine, EngineStatus, TickInput, TickOutput, Triggers};
pub use error::{Error, Result};
pub use feedback::{AudioCue, DisplayDirective, Event};
pub use sensor::{Accel, RawSample};
