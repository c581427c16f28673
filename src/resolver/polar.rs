//! Angle/power resolution relative to the calibrated origin
//!
//! Angles are compass style: 0 deg along +x, increasing clockwise, so a
//! stick pushed up reads 270 deg. The y axis is inverted before the angle is
//! taken because a larger raw y means the stick is pushed down on the
//! reference hardware.

use crate::acquisition::RawSample;
use crate::calibration::CalibrationOrigin;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarSettings {
    /// Radius in raw units that maps to 100% power. Mechanical travel stops
    /// short of the theoretical half range, hence a tuned value.
    pub max_radius: f64,
    /// Power below this percentage is reported as zero
    pub dead_zone_percent: u8,
}

impl Default for PolarSettings {
    fn default() -> Self {
        Self {
            max_radius: 1400.0,
            dead_zone_percent: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolarCommand {
    /// In `[0, 360)`; zero whenever `power_percent` is zero
    pub angle_deg: f64,
    /// In `[0, 100]`
    pub power_percent: u8,
    pub button: bool,
}

pub fn resolve_polar(
    sample: &RawSample,
    origin: &CalibrationOrigin,
    settings: &PolarSettings,
) -> PolarCommand {
    let dx = f64::from(i32::from(sample.x_raw()) - origin.origin_x);
    let dy = -f64::from(i32::from(sample.y_raw()) - origin.origin_y);

    let power_percent = power_percent(dx.hypot(dy), settings.max_radius);
    if power_percent < settings.dead_zone_percent {
        return PolarCommand {
            angle_deg: 0.0,
            power_percent: 0,
            button: sample.button_pressed(),
        };
    }

    PolarCommand {
        angle_deg: compass_angle(dx, dy),
        power_percent,
        button: sample.button_pressed(),
    }
}

/// Clockwise angle in degrees, `[0, 360)`. `(0, 0)` maps to 0.
pub fn compass_angle(dx: f64, dy: f64) -> f64 {
    if dx == 0.0 && dy == 0.0 {
        return 0.0;
    }

    let mut counter_clockwise = dy.atan2(dx).to_degrees();
    if counter_clockwise < 0.0 {
        counter_clockwise += 360.0;
    }

    let clockwise = 360.0 - counter_clockwise;
    if clockwise >= 360.0 {
        0.0
    } else {
        clockwise
    }
}

/// `round(100 * magnitude / max_radius)`, saturated at 100
pub fn power_percent(magnitude: f64, max_radius: f64) -> u8 {
    let scaled = (100.0 * magnitude / max_radius).round();
    scaled.clamp(0.0, 100.0) as u8
}
