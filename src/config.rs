//! Pipeline configuration
//!
//! Loaded once at startup from TOML. Every section has defaults matching the
//! reference hardware (10 Hz sampling, 50-sample queue, 1000/3000 thresholds,
//! 1400 raw-unit radius, 10% dead zone), so an empty or missing file yields a
//! working setup.

use crate::acquisition::ADC_MAX;
use crate::resolver::{DiscreteThresholds, PolarSettings, ResolverMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const CONFIG_DIR: &str = "openjoystick";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    InvalidValue(String),
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub sampling: SamplingConfig,
    pub resolver: ResolverConfig,
    pub calibration: CalibrationConfig,
    pub hardware: HardwareConfig,
    pub sink: SinkConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct SamplingConfig {
    pub period_ms: u64,
    pub channel_capacity: usize,
    /// Seconds between statistics log lines
    pub stats_interval_s: i64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            period_ms: 100,
            channel_capacity: 50,
            stats_interval_s: 10,
        }
    }
}

impl SamplingConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// Window between statistics log lines
    pub fn stats_interval(&self) -> Result<chrono::Duration, ConfigError> {
        if self.stats_interval_s <= 0 {
            return Err(ConfigError::InvalidValue(
                "sampling.stats_interval_s must be greater than zero".to_string(),
            ));
        }
        chrono::Duration::try_seconds(self.stats_interval_s).ok_or_else(|| {
            ConfigError::InvalidValue(format!(
                "sampling.stats_interval_s ({}) is out of range",
                self.stats_interval_s
            ))
        })
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct ResolverConfig {
    pub mode: ResolverMode,
    pub low_threshold: u16,
    pub high_threshold: u16,
    pub max_radius: f64,
    pub dead_zone_percent: u8,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let thresholds = DiscreteThresholds::default();
        let polar = PolarSettings::default();
        Self {
            mode: ResolverMode::default(),
            low_threshold: thresholds.low,
            high_threshold: thresholds.high,
            max_radius: polar.max_radius,
            dead_zone_percent: polar.dead_zone_percent,
        }
    }
}

impl ResolverConfig {
    pub fn thresholds(&self) -> DiscreteThresholds {
        DiscreteThresholds {
            low: self.low_threshold,
            high: self.high_threshold,
        }
    }

    pub fn polar(&self) -> PolarSettings {
        PolarSettings {
            max_radius: self.max_radius,
            dead_zone_percent: self.dead_zone_percent,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Consecutive pressed samples that reset calibration; 0 disables
    pub button_hold_samples: u32,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum HardwareConfig {
    Scripted(ScriptedSettings),
    Mcp3208(Mcp3208Settings),
}

impl Default for HardwareConfig {
    fn default() -> Self {
        HardwareConfig::Scripted(ScriptedSettings::default())
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct ScriptedSettings {
    pub readings: Vec<ScriptedReading>,
    pub looping: bool,
}

impl Default for ScriptedSettings {
    fn default() -> Self {
        Self {
            readings: vec![ScriptedReading {
                x: 2048,
                y: 2048,
                pressed: false,
            }],
            looping: true,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScriptedReading {
    pub x: u16,
    pub y: u16,
    #[serde(default)]
    pub pressed: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
#[serde(default)]
pub struct Mcp3208Settings {
    pub spi_bus: u8,
    pub chip_select: u8,
    pub clock_hz: u32,
    pub x_channel: u8,
    pub y_channel: u8,
    /// BCM pin number of the active-low switch
    pub switch_pin: u8,
}

impl Default for Mcp3208Settings {
    fn default() -> Self {
        Self {
            spi_bus: 0,
            chip_select: 0,
            clock_hz: 1_000_000,
            x_channel: 0,
            y_channel: 1,
            switch_pin: 17,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SinkKind {
    #[default]
    Log,
    Stdout,
    /// Latest-value watch channel, logged only when the command changes
    Watch,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(default)]
pub struct SinkConfig {
    pub kind: SinkKind,
}

impl PipelineConfig {
    /// Loads from `explicit` if given, else from the user config directory,
    /// else falls back to defaults. Only the implicit file may be absent.
    pub async fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path,
            None => match Self::default_path() {
                Some(path) if path.is_file() => path,
                _ => {
                    info!("No config file found, using defaults");
                    let config = Self::default();
                    config.validate()?;
                    return Ok(config);
                }
            },
        };

        let config = Self::from_file(&path).await?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub async fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::ReadError {
                    path: path.to_path_buf(),
                    source,
                })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        debug!("Parsed config: {:?}", config);
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sampling.period_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "sampling.period_ms must be greater than zero".to_string(),
            ));
        }
        if self.sampling.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "sampling.channel_capacity must be greater than zero".to_string(),
            ));
        }
        self.sampling.stats_interval()?;

        let resolver = &self.resolver;
        if resolver.low_threshold >= resolver.high_threshold {
            return Err(ConfigError::InvalidValue(format!(
                "resolver.low_threshold ({}) must be below resolver.high_threshold ({})",
                resolver.low_threshold, resolver.high_threshold
            )));
        }
        if resolver.high_threshold > ADC_MAX {
            return Err(ConfigError::InvalidValue(format!(
                "resolver.high_threshold ({}) exceeds ADC range {}",
                resolver.high_threshold, ADC_MAX
            )));
        }
        if !resolver.max_radius.is_finite() || resolver.max_radius <= 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "resolver.max_radius must be a positive number, got {}",
                resolver.max_radius
            )));
        }
        if resolver.dead_zone_percent > 100 {
            return Err(ConfigError::InvalidValue(format!(
                "resolver.dead_zone_percent must be at most 100, got {}",
                resolver.dead_zone_percent
            )));
        }

        if let HardwareConfig::Scripted(settings) = &self.hardware {
            if let Some(bad) = settings
                .readings
                .iter()
                .find(|r| r.x > ADC_MAX || r.y > ADC_MAX)
            {
                return Err(ConfigError::InvalidValue(format!(
                    "scripted reading ({}, {}) exceeds ADC range {}",
                    bad.x, bad.y, ADC_MAX
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_reference_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();

        assert_eq!(config.sampling.period(), Duration::from_millis(100));
        assert_eq!(config.sampling.channel_capacity, 50);
        assert_eq!(config.resolver.mode, ResolverMode::Polar);
        assert_eq!(config.resolver.thresholds(), DiscreteThresholds::default());
        assert_eq!(config.resolver.polar(), PolarSettings::default());
        assert_eq!(config.calibration.button_hold_samples, 0);
        assert_eq!(config.sink.kind, SinkKind::Log);
        assert!(matches!(config.hardware, HardwareConfig::Scripted(_)));
    }

    #[test]
    fn parses_full_file() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [sampling]
            period_ms = 20
            channel_capacity = 4

            [resolver]
            mode = "discrete"
            low_threshold = 900
            high_threshold = 3100

            [calibration]
            button_hold_samples = 30

            [hardware]
            backend = "mcp3208"
            spi_bus = 1
            switch_pin = 4

            [sink]
            kind = "stdout"
            "#,
        )
        .unwrap();

        assert_eq!(config.sampling.period_ms, 20);
        assert_eq!(config.sampling.channel_capacity, 4);
        assert_eq!(config.resolver.mode, ResolverMode::Discrete);
        assert_eq!(
            config.resolver.thresholds(),
            DiscreteThresholds {
                low: 900,
                high: 3100
            }
        );
        assert_eq!(config.resolver.max_radius, 1400.0);
        assert_eq!(config.calibration.button_hold_samples, 30);
        assert_eq!(config.sink.kind, SinkKind::Stdout);
        match config.hardware {
            HardwareConfig::Mcp3208(settings) => {
                assert_eq!(settings.spi_bus, 1);
                assert_eq!(settings.switch_pin, 4);
                assert_eq!(settings.y_channel, 1);
            }
            other => panic!("expected mcp3208 backend, got {:?}", other),
        }
    }

    #[test]
    fn parses_scripted_readings() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [hardware]
            backend = "scripted"
            looping = false
            readings = [
                { x = 2048, y = 2048 },
                { x = 2048, y = 1000, pressed = true },
            ]
            "#,
        )
        .unwrap();

        match config.hardware {
            HardwareConfig::Scripted(settings) => {
                assert!(!settings.looping);
                assert_eq!(
                    settings.readings,
                    vec![
                        ScriptedReading {
                            x: 2048,
                            y: 2048,
                            pressed: false
                        },
                        ScriptedReading {
                            x: 2048,
                            y: 1000,
                            pressed: true
                        },
                    ]
                );
            }
            other => panic!("expected scripted backend, got {:?}", other),
        }
    }

    #[test]
    fn rejects_invalid_values() {
        let cases = [
            "[sampling]\nperiod_ms = 0",
            "[sampling]\nchannel_capacity = 0",
            "[sampling]\nstats_interval_s = 0",
            "[sampling]\nstats_interval_s = 9223372036854775807",
            "[resolver]\nlow_threshold = 3000\nhigh_threshold = 3000",
            "[resolver]\nhigh_threshold = 5000",
            "[resolver]\nmax_radius = 0.0",
            "[resolver]\nmax_radius = -3.5",
            "[resolver]\ndead_zone_percent = 101",
            "[hardware]\nbackend = \"scripted\"\nreadings = [{ x = 4096, y = 0 }]",
        ];
        for case in cases {
            assert!(
                matches!(
                    PipelineConfig::from_toml_str(case),
                    Err(ConfigError::InvalidValue(_))
                ),
                "accepted: {}",
                case
            );
        }
    }

    #[test]
    fn parses_watch_sink() {
        let config = PipelineConfig::from_toml_str("[sink]\nkind = \"watch\"").unwrap();
        assert_eq!(config.sink.kind, SinkKind::Watch);
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(matches!(
            PipelineConfig::from_toml_str("[resolver]\nmode = \"spiral\""),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn missing_explicit_file_is_an_error() {
        let result =
            PipelineConfig::load(Some(PathBuf::from("/nonexistent/openjoystick.toml"))).await;
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }
}
