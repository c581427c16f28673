//! One-shot learning of the stick's rest position
//!
//! The first sample the resolver sees is taken as the origin and kept for
//! the rest of the session. An off-center first sample biases every later
//! reading; the only way out is an explicit [`CalibrationState::reset`],
//! issued either by an external recalibrate request or by the optional
//! [`ButtonHoldTrigger`].

use crate::acquisition::RawSample;
use tracing::{debug, info};

/// Learned rest position in raw ADC units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationOrigin {
    pub origin_x: i32,
    pub origin_y: i32,
}

#[derive(Debug, Default)]
pub struct CalibrationState {
    origin: Option<CalibrationOrigin>,
    calibrations: u64,
}

impl CalibrationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the fixed origin, capturing it from `sample` if none is set yet
    pub fn observe(&mut self, sample: &RawSample) -> CalibrationOrigin {
        if let Some(origin) = self.origin {
            return origin;
        }

        let origin = CalibrationOrigin {
            origin_x: i32::from(sample.x_raw()),
            origin_y: i32::from(sample.y_raw()),
        };
        self.origin = Some(origin);
        self.calibrations += 1;
        info!(
            "Calibrated origin at ({}, {}) from sample #{}",
            origin.origin_x,
            origin.origin_y,
            sample.sequence()
        );
        origin
    }

    pub fn origin(&self) -> Option<CalibrationOrigin> {
        self.origin
    }

    pub fn is_calibrated(&self) -> bool {
        self.origin.is_some()
    }

    /// Forgets the origin; the next observed sample becomes the new one
    pub fn reset(&mut self) {
        if let Some(previous) = self.origin.take() {
            info!(
                "Calibration reset (previous origin ({}, {}))",
                previous.origin_x, previous.origin_y
            );
        } else {
            debug!("Calibration reset requested before first calibration");
        }
    }

    /// Number of origins captured so far
    pub fn calibrations(&self) -> u64 {
        self.calibrations
    }
}

/// Fires once when the switch stays pressed for `required` consecutive
/// samples. Re-arms only after the switch is released.
#[derive(Debug, Clone)]
pub struct ButtonHoldTrigger {
    required: u32,
    streak: u32,
    armed: bool,
}

impl ButtonHoldTrigger {
    /// `None` for a zero threshold, which means the trigger is disabled
    pub fn new(required: u32) -> Option<Self> {
        if required == 0 {
            return None;
        }
        Some(Self {
            required,
            streak: 0,
            armed: true,
        })
    }

    pub fn update(&mut self, button_pressed: bool) -> bool {
        if !button_pressed {
            self.streak = 0;
            self.armed = true;
            return false;
        }

        self.streak = self.streak.saturating_add(1);
        if self.armed && self.streak >= self.required {
            self.armed = false;
            debug!("Button held for {} samples", self.streak);
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::sample::sample;

    #[test]
    fn first_sample_becomes_origin() {
        let mut state = CalibrationState::new();
        assert!(!state.is_calibrated());

        let origin = state.observe(&sample(2010, 2075, false));

        assert_eq!(
            origin,
            CalibrationOrigin {
                origin_x: 2010,
                origin_y: 2075
            }
        );
        assert!(state.is_calibrated());
        assert_eq!(state.calibrations(), 1);
    }

    #[test]
    fn later_samples_never_move_the_origin() {
        let mut state = CalibrationState::new();
        let first = state.observe(&sample(1990, 2100, false));

        for (x, y) in [(0, 0), (4095, 4095), (3000, 10), (1990, 2100)] {
            assert_eq!(state.observe(&sample(x, y, true)), first);
        }
        assert_eq!(state.origin(), Some(first));
        assert_eq!(state.calibrations(), 1);
    }

    #[test]
    fn reset_recaptures_from_next_sample() {
        let mut state = CalibrationState::new();
        state.observe(&sample(100, 100, false));

        state.reset();
        assert!(!state.is_calibrated());

        let origin = state.observe(&sample(2048, 2000, false));
        assert_eq!(origin.origin_x, 2048);
        assert_eq!(origin.origin_y, 2000);
        assert_eq!(state.calibrations(), 2);
    }

    #[test]
    fn hold_trigger_disabled_at_zero() {
        assert!(ButtonHoldTrigger::new(0).is_none());
    }

    #[test]
    fn hold_trigger_fires_once_per_hold() {
        let mut trigger = ButtonHoldTrigger::new(3).unwrap();

        let fired: Vec<bool> = [true, true, true, true, true, false, true, true, true]
            .into_iter()
            .map(|pressed| trigger.update(pressed))
            .collect();

        assert_eq!(
            fired,
            vec![false, false, true, false, false, false, false, false, true]
        );
    }

    #[test]
    fn hold_trigger_needs_consecutive_presses() {
        let mut trigger = ButtonHoldTrigger::new(2).unwrap();
        assert!(!trigger.update(true));
        assert!(!trigger.update(false));
        assert!(!trigger.update(true));
        assert!(trigger.update(true));
    }
}
