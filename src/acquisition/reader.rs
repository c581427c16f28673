use super::sample::AxisReading;
use tracing::debug;

/// Failures while reading the analog inputs.
///
/// All of these are transient from the sampling loop's point of view: the
/// tick is skipped and the next period tries again.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Failed to initialize reader: {0}")]
    InitializationError(String),

    #[error("ADC transfer failed: {0}")]
    TransferError(String),

    #[error("{channel} reading {value} exceeds ADC range 0..={max}")]
    OutOfRange {
        channel: &'static str,
        value: u16,
        max: u16,
    },

    #[error("No scripted readings left")]
    Exhausted,
}

/// Source of raw axis readings.
///
/// Implementations do the register or bus level work and invert the
/// active-low switch. They are polled once per sampling period from the
/// sampling task and must not block for longer than a period.
pub trait SampleReader: Send + 'static {
    fn read(&mut self) -> Result<AxisReading, ReadError>;

    fn name(&self) -> &str;
}

/// Replays a fixed list of readings.
///
/// Used on hosts without the joystick hardware and in tests. When `looping`
/// is false the reader reports [`ReadError::Exhausted`] after the last entry.
#[derive(Debug, Clone)]
pub struct ScriptedReader {
    readings: Vec<AxisReading>,
    cursor: usize,
    looping: bool,
}

impl ScriptedReader {
    pub fn new(readings: Vec<AxisReading>, looping: bool) -> Self {
        debug!(
            "Creating scripted reader with {} readings (looping: {})",
            readings.len(),
            looping
        );
        Self {
            readings,
            cursor: 0,
            looping,
        }
    }
}

impl SampleReader for ScriptedReader {
    fn read(&mut self) -> Result<AxisReading, ReadError> {
        if self.readings.is_empty() {
            return Err(ReadError::Exhausted);
        }
        if self.cursor >= self.readings.len() {
            if !self.looping {
                return Err(ReadError::Exhausted);
            }
            self.cursor = 0;
        }
        let reading = self.readings[self.cursor];
        self.cursor += 1;
        Ok(reading)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
