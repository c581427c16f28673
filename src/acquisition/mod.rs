//! Sensor side of the pipeline
//!
//! Raw axis/switch readers and the [`RawSample`] type they feed into the
//! sampling task.

pub mod mcp3208;
pub mod reader;
pub mod sample;

pub use reader::{ReadError, SampleReader, ScriptedReader};
pub use sample::{AxisReading, RawSample, ADC_MAX};

use crate::config::HardwareConfig;
use tracing::info;

/// Builds the reader selected by the `[hardware]` config section
pub fn build_reader(config: &HardwareConfig) -> Result<Box<dyn SampleReader>, ReadError> {
    match config {
        HardwareConfig::Scripted(settings) => {
            info!(
                "Using scripted reader with {} readings",
                settings.readings.len()
            );
            let readings = settings
                .readings
                .iter()
                .map(|r| AxisReading::new(r.x, r.y, r.pressed))
                .collect();
            Ok(Box::new(ScriptedReader::new(readings, settings.looping)))
        }
        HardwareConfig::Mcp3208(settings) => {
            info!("Using MCP3208 hardware reader");
            Ok(Box::new(mcp3208::Mcp3208Reader::open(settings)?))
        }
    }
}
