use std::time::Instant;

/// Full-scale value of the 12-bit analog inputs
pub const ADC_MAX: u16 = 4095;

/// One reading of both analog axes and the switch, as delivered by a reader.
///
/// The switch is already inverted here: `button_pressed == true` means the
/// active-low input was pulled to ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisReading {
    pub x_raw: u16,
    pub y_raw: u16,
    pub button_pressed: bool,
}

impl AxisReading {
    pub fn new(x_raw: u16, y_raw: u16, button_pressed: bool) -> Self {
        Self {
            x_raw,
            y_raw,
            button_pressed,
        }
    }
}

/// Immutable sample handed from the sampling task to the resolver.
///
/// Once built a sample cannot be changed; it is moved into the channel by
/// value and the producer keeps no reference to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSample {
    x_raw: u16,
    y_raw: u16,
    button_pressed: bool,
    timestamp: Instant,
    sequence: u64,
}

impl RawSample {
    pub fn new(reading: AxisReading, timestamp: Instant, sequence: u64) -> Self {
        Self {
            x_raw: reading.x_raw,
            y_raw: reading.y_raw,
            button_pressed: reading.button_pressed,
            timestamp,
            sequence,
        }
    }

    pub fn x_raw(&self) -> u16 {
        self.x_raw
    }

    pub fn y_raw(&self) -> u16 {
        self.y_raw
    }

    pub fn button_pressed(&self) -> bool {
        self.button_pressed
    }

    /// Monotonic capture time
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Position of this sample in the source's output, starting at 0
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

#[cfg(test)]
pub(crate) fn sample(x_raw: u16, y_raw: u16, button_pressed: bool) -> RawSample {
    RawSample::new(
        AxisReading::new(x_raw, y_raw, button_pressed),
        Instant::now(),
        0,
    )
}
