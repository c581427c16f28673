//! Threshold classification into 3x3 positions (8 directions plus center)

use crate::acquisition::RawSample;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw-value thresholds, exclusive on the center side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscreteThresholds {
    pub low: u16,
    pub high: u16,
}

impl Default for DiscreteThresholds {
    fn default() -> Self {
        Self {
            low: 1000,
            high: 3000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizontal {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vertical {
    Down,
    Center,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction8 {
    Center,
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscreteCommand {
    pub horizontal: Horizontal,
    pub vertical: Vertical,
    pub button: bool,
}

impl DiscreteCommand {
    pub fn direction(&self) -> Direction8 {
        match (self.vertical, self.horizontal) {
            (Vertical::Center, Horizontal::Center) => Direction8::Center,
            (Vertical::Up, Horizontal::Center) => Direction8::Up,
            (Vertical::Up, Horizontal::Right) => Direction8::UpRight,
            (Vertical::Center, Horizontal::Right) => Direction8::Right,
            (Vertical::Down, Horizontal::Right) => Direction8::DownRight,
            (Vertical::Down, Horizontal::Center) => Direction8::Down,
            (Vertical::Down, Horizontal::Left) => Direction8::DownLeft,
            (Vertical::Center, Horizontal::Left) => Direction8::Left,
            (Vertical::Up, Horizontal::Left) => Direction8::UpLeft,
        }
    }
}

pub fn classify(sample: &RawSample, thresholds: &DiscreteThresholds) -> DiscreteCommand {
    let horizontal = if sample.x_raw() > thresholds.high {
        Horizontal::Right
    } else if sample.x_raw() < thresholds.low {
        Horizontal::Left
    } else {
        Horizontal::Center
    };

    let vertical = if sample.y_raw() > thresholds.high {
        Vertical::Up
    } else if sample.y_raw() < thresholds.low {
        Vertical::Down
    } else {
        Vertical::Center
    };

    DiscreteCommand {
        horizontal,
        vertical,
        button: sample.button_pressed(),
    }
}

impl fmt::Display for Horizontal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Horizontal::Left => write!(f, "LEFT"),
            Horizontal::Center => write!(f, "CENTER"),
            Horizontal::Right => write!(f, "RIGHT"),
        }
    }
}

impl fmt::Display for Vertical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vertical::Down => write!(f, "DOWN"),
            Vertical::Center => write!(f, "CENTER"),
            Vertical::Up => write!(f, "UP"),
        }
    }
}

impl fmt::Display for Direction8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Direction8::Center => "CENTER",
            Direction8::Up => "UP",
            Direction8::UpRight => "UP-RIGHT",
            Direction8::Right => "RIGHT",
            Direction8::DownRight => "DOWN-RIGHT",
            Direction8::Down => "DOWN",
            Direction8::DownLeft => "DOWN-LEFT",
            Direction8::Left => "LEFT",
            Direction8::UpLeft => "UP-LEFT",
        };
        write!(f, "{}", label)
    }
}
