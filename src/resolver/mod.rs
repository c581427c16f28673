//! Turns calibrated raw samples into [`ResolvedCommand`]s
//!
//! The mode is fixed when the [`DirectionResolver`] is built:
//!
//! - [`ResolverMode::Discrete`] classifies each axis against fixed raw
//!   thresholds ([`discrete`]), ignoring the calibration origin.
//! - [`ResolverMode::Polar`] centers on the origin and reports a clockwise
//!   angle and a dead-zoned, saturating power percentage ([`polar`]).

pub mod discrete;
pub mod polar;

pub use discrete::{DiscreteCommand, DiscreteThresholds, Direction8, Horizontal, Vertical};
pub use polar::{PolarCommand, PolarSettings};

use crate::acquisition::RawSample;
use crate::calibration::CalibrationOrigin;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolverMode {
    Discrete,
    #[default]
    Polar,
}

impl fmt::Display for ResolverMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverMode::Discrete => write!(f, "discrete"),
            ResolverMode::Polar => write!(f, "polar"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedCommand {
    Discrete(DiscreteCommand),
    Polar(PolarCommand),
}

impl ResolvedCommand {
    pub fn button(&self) -> bool {
        match self {
            ResolvedCommand::Discrete(cmd) => cmd.button,
            ResolvedCommand::Polar(cmd) => cmd.button,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectionResolver {
    mode: ResolverMode,
    thresholds: DiscreteThresholds,
    polar: PolarSettings,
}

impl DirectionResolver {
    pub fn new(mode: ResolverMode, thresholds: DiscreteThresholds, polar: PolarSettings) -> Self {
        Self {
            mode,
            thresholds,
            polar,
        }
    }

    pub fn mode(&self) -> ResolverMode {
        self.mode
    }

    pub fn resolve(&self, sample: &RawSample, origin: &CalibrationOrigin) -> ResolvedCommand {
        match self.mode {
            ResolverMode::Discrete => {
                ResolvedCommand::Discrete(discrete::classify(sample, &self.thresholds))
            }
            ResolverMode::Polar => {
                ResolvedCommand::Polar(polar::resolve_polar(sample, origin, &self.polar))
            }
        }
    }
}

fn button_label(pressed: bool) -> &'static str {
    if pressed {
        "pressed"
    } else {
        "released"
    }
}

impl fmt::Display for ResolvedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedCommand::Discrete(cmd) => write!(
                f,
                "discrete x={} y={} dir={} button={}",
                cmd.horizontal,
                cmd.vertical,
                cmd.direction(),
                button_label(cmd.button)
            ),
            ResolvedCommand::Polar(cmd) => write!(
                f,
                "polar angle={:.1} power={}% button={}",
                cmd.angle_deg,
                cmd.power_percent,
                button_label(cmd.button)
            ),
        }
    }
}
