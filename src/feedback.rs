//! Values handed to the display, buzzer and telemetry collaborators.

use crate::rom::RepEvent;

const LED_COUNT: u8 = 10;
const YELLOW_ABOVE_DEG: f32 = 45.;
const RED_ABOVE_DEG: f32 = 90.;

const GREEN: u32 = 0x00FF00;
const YELLOW: u32 = 0xFFFF00;
const RED: u32 = 0xFF0000;
const BLUE: u32 = 0x0000FF;
const CYAN: u32 = 0x00FFFF;
const WHITE: u32 = 0xFFFFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorBand {
    Green,
    Yellow,
    Red,
}

impl ColorBand {
    pub fn for_angle(angle: f32) -> Self {
        if angle > RED_ABOVE_DEG {
            Self::Red
        } else if angle > YELLOW_ABOVE_DEG {
            Self::Yellow
        } else {
            Self::Green
        }
    }

    pub fn rgb(self) -> u32 {
        match self {
            Self::Green => GREEN,
            Self::Yellow => YELLOW,
            Self::Red => RED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisplayDirective {
    /// Single lit pixel showing the current angle.
    Angle { led: u8, band: ColorBand },
    /// All pixels red.
    SensorError,
    /// Pixel 0 yellow, blinking.
    WaitingForCalibration,
    /// All pixels blue.
    Calibrating,
    /// Pixel `n` cyan.
    CalibrationProgress(u8),
    /// All pixels green.
    CalibrationSuccess,
    /// All pixels white.
    ResetAcknowledged,
}

impl DisplayDirective {
    /// Map `[0, flexion_limit]` linearly onto the ten pixels.
    pub fn angle(angle: f32, flexion_limit: f32) -> Self {
        let index = (angle / flexion_limit * LED_COUNT as f32).floor();
        let led = index.clamp(0., (LED_COUNT - 1) as f32) as u8;

        Self::Angle {
            led,
            band: ColorBand::for_angle(angle),
        }
    }

    /// Progress marker `step` out of `steps`, spread over the strip when there are
    /// more markers than pixels.
    pub fn progress(step: u32, steps: u32) -> Self {
        let leds = LED_COUNT as u32;
        let pixel = if steps > leds {
            step.saturating_mul(leds) / steps
        } else {
            step
        };

        Self::CalibrationProgress(pixel.min(leds - 1) as u8)
    }

    /// Pixel to light, `None` when every pixel takes the color.
    pub fn pixel(&self) -> Option<u8> {
        match self {
            Self::Angle { led, .. } => Some(*led),
            Self::WaitingForCalibration => Some(0),
            Self::CalibrationProgress(n) => Some(*n),
            _ => None,
        }
    }

    pub fn rgb(&self) -> u32 {
        match self {
            Self::Angle { band, .. } => band.rgb(),
            Self::SensorError => RED,
            Self::WaitingForCalibration => YELLOW,
            Self::Calibrating => BLUE,
            Self::CalibrationProgress(_) => CYAN,
            Self::CalibrationSuccess => GREEN,
            Self::ResetAcknowledged => WHITE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCue {
    CalibrationStart,
    CalibrationSuccess,
    RepCompleted,
    RomReset,
}

impl AudioCue {
    /// (frequency Hz, duration ms)
    pub fn tone(self) -> (u32, u32) {
        match self {
            Self::CalibrationStart => (440, 200),
            Self::CalibrationSuccess => (880, 500),
            Self::RepCompleted => (523, 100),
            Self::RomReset => (600, 200),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryFrame {
    pub angle: f32,
    pub rom: f32,
    pub max_flexion: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    Display(DisplayDirective),
    Audio(AudioCue),
    Telemetry(TelemetryFrame),
    Rep(RepEvent),
}

/// Limits periodic telemetry to one frame per `period_ms`, independent of the tick period.
pub struct TelemetryThrottle {
    period_ms: u64,
    last_ms: Option<u64>,
}

impl TelemetryThrottle {
    pub fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            last_ms: None,
        }
    }

    pub fn ready(&mut self, now_ms: u64) -> bool {
        let due = match self.last_ms {
            Some(last) => now_ms.saturating_sub(last) >= self.period_ms,
            None => true,
        };
        if due {
            self.last_ms = Some(now_ms);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_maps_onto_ten_pixels() {
        let led = |angle| DisplayDirective::angle(angle, 135.).pixel();
        assert_eq!(led(0.), Some(0));
        assert_eq!(led(13.4), Some(0));
        assert_eq!(led(13.5), Some(1));
        assert_eq!(led(67.5), Some(5));
        assert_eq!(led(134.), Some(9));
        assert_eq!(led(135.), Some(9));
        assert_eq!(led(-3.), Some(0));
    }

    #[test]
    fn bands_break_at_45_and_90() {
        assert_eq!(ColorBand::for_angle(45.), ColorBand::Green);
        assert_eq!(ColorBand::for_angle(45.5), ColorBand::Yellow);
        assert_eq!(ColorBand::for_angle(90.), ColorBand::Yellow);
        assert_eq!(ColorBand::for_angle(91.), ColorBand::Red);
        assert_eq!(DisplayDirective::angle(100., 135.).rgb(), RED);
    }

    #[test]
    fn state_directives_light_whole_strip() {
        assert_eq!(DisplayDirective::Calibrating.pixel(), None);
        assert_eq!(DisplayDirective::Calibrating.rgb(), BLUE);
        assert_eq!(DisplayDirective::CalibrationProgress(3).pixel(), Some(3));
        assert_eq!(DisplayDirective::WaitingForCalibration.pixel(), Some(0));
    }

    #[test]
    fn progress_stays_on_strip() {
        let pixels: Vec<_> = (0..16)
            .map(|step| DisplayDirective::progress(step, 16).pixel())
            .collect();
        assert!(pixels.iter().all(|p| matches!(p, Some(0..=9))));
        assert_eq!(pixels.first(), Some(&Some(0)));
        assert_eq!(pixels.last(), Some(&Some(9)));

        assert_eq!(DisplayDirective::progress(3, 4).pixel(), Some(3));
        assert_eq!(DisplayDirective::progress(40, 4).pixel(), Some(9));
    }

    #[test]
    fn throttle_emits_once_per_period() {
        let mut throttle = TelemetryThrottle::new(100);
        let emitted: Vec<u64> = (0..15u64)
            .map(|tick| 1_000 + tick * 20)
            .filter(|now| throttle.ready(*now))
            .collect();
        assert_eq!(emitted, vec![1_000, 1_100, 1_200]);
    }
}
