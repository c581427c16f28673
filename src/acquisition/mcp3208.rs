//! Raspberry Pi backend: MCP3208 12-bit SPI ADC for the two axes and an
//! active-low GPIO for the stick switch.

use super::reader::{ReadError, SampleReader};
use super::sample::AxisReading;
use crate::config::Mcp3208Settings;
use rppal::gpio::{Gpio, InputPin};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use tracing::{debug, info};

pub struct Mcp3208Reader {
    spi: Spi,
    switch: InputPin,
    x_channel: u8,
    y_channel: u8,
}

impl Mcp3208Reader {
    pub fn open(settings: &Mcp3208Settings) -> Result<Self, ReadError> {
        info!(
            "Opening MCP3208 on SPI{} CS{} at {} Hz (x: ch{}, y: ch{}, switch: GPIO{})",
            settings.spi_bus,
            settings.chip_select,
            settings.clock_hz,
            settings.x_channel,
            settings.y_channel,
            settings.switch_pin
        );

        if settings.x_channel > 7 || settings.y_channel > 7 {
            return Err(ReadError::InitializationError(format!(
                "MCP3208 has channels 0-7, got x={} y={}",
                settings.x_channel, settings.y_channel
            )));
        }

        let bus = match settings.spi_bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            2 => Bus::Spi2,
            other => {
                return Err(ReadError::InitializationError(format!(
                    "Unsupported SPI bus: {}",
                    other
                )))
            }
        };
        let slave_select = match settings.chip_select {
            0 => SlaveSelect::Ss0,
            1 => SlaveSelect::Ss1,
            2 => SlaveSelect::Ss2,
            other => {
                return Err(ReadError::InitializationError(format!(
                    "Unsupported chip select: {}",
                    other
                )))
            }
        };

        let spi = Spi::new(bus, slave_select, settings.clock_hz, Mode::Mode0)
            .map_err(|e| ReadError::InitializationError(e.to_string()))?;

        // Switch pulls to ground when pressed
        let switch = Gpio::new()
            .and_then(|gpio| gpio.get(settings.switch_pin))
            .map_err(|e| ReadError::InitializationError(e.to_string()))?
            .into_input_pullup();

        debug!("MCP3208 reader ready");
        Ok(Self {
            spi,
            switch,
            x_channel: settings.x_channel,
            y_channel: settings.y_channel,
        })
    }

    fn read_channel(&mut self, channel: u8) -> Result<u16, ReadError> {
        // Start bit, single-ended, D2 in the first byte; D1 D0 in the second
        let tx = [0x06 | (channel >> 2), (channel & 0x03) << 6, 0x00];
        let mut rx = [0u8; 3];
        self.spi
            .transfer(&mut rx, &tx)
            .map_err(|e| ReadError::TransferError(e.to_string()))?;
        Ok((u16::from(rx[1] & 0x0F) << 8) | u16::from(rx[2]))
    }
}

impl SampleReader for Mcp3208Reader {
    fn read(&mut self) -> Result<AxisReading, ReadError> {
        let x_raw = self.read_channel(self.x_channel)?;
        let y_raw = self.read_channel(self.y_channel)?;
        let button_pressed = self.switch.is_low();
        Ok(AxisReading::new(x_raw, y_raw, button_pressed))
    }

    fn name(&self) -> &str {
        "mcp3208"
    }
}
