//! Range of motion tracking and repetition detection.
//!
//! A rep closes when the angle drops under the extension threshold after the flexion
//! maximum went over the flexion threshold. This is a two-threshold hysteresis, not a
//! peak detector: an excursion that never clears the flexion threshold is never closed
//! and its partial range stays in the counters until the next qualifying rep.

use log::debug;

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RomState {
    pub current_angle: f32,
    pub max_flexion: f32,
    pub max_extension: f32,
    pub rom: f32,
}

/// A completed flexion/extension cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepEvent {
    pub rom: f32,
    pub max_flexion: f32,
    pub max_extension: f32,
}

pub struct RomTracker {
    full_extension: f32,
    extension_threshold: f32,
    flexion_threshold: f32,
    state: RomState,
}

impl RomTracker {
    pub fn new(config: &Config) -> Self {
        Self {
            full_extension: config.full_extension,
            extension_threshold: config.rep_extension_threshold,
            flexion_threshold: config.rep_flexion_threshold,
            state: RomState {
                current_angle: 0.,
                max_flexion: 0.,
                max_extension: config.full_extension,
                rom: 0.,
            },
        }
    }

    pub fn update(&mut self, angle: f32) -> Option<RepEvent> {
        let state = &mut self.state;
        state.current_angle = angle;
        state.max_flexion = state.max_flexion.max(angle);
        state.max_extension = state.max_extension.min(angle);
        state.rom = state.max_flexion - state.max_extension;

        if angle < self.extension_threshold && state.max_flexion > self.flexion_threshold {
            let rep = RepEvent {
                rom: state.rom,
                max_flexion: state.max_flexion,
                max_extension: state.max_extension,
            };
            debug!(
                "Rep completed: rom {:.1}, flexion {:.1}, extension {:.1}",
                rep.rom, rep.max_flexion, rep.max_extension
            );

            state.max_flexion = 0.;
            state.max_extension = self.full_extension;
            return Some(rep);
        }

        None
    }

    /// Clear the counters. The current angle is kept.
    pub fn reset(&mut self) {
        self.state.max_flexion = 0.;
        self.state.max_extension = self.full_extension;
        self.state.rom = 0.;
    }

    /// Clear the counters and the current angle.
    pub fn reset_all(&mut self) {
        self.reset();
        self.state.current_angle = 0.;
    }

    pub fn state(&self) -> RomState {
        self.state
    }
}
