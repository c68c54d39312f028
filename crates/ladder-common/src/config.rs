//! Synthesis configuration.
//!
//! Every section is optional in TOML; missing values fall back to the
//! MELSEC-Q defaults (32 X/Y points, 100 of every other device type).

use crate::devices::{DeviceAddress, DeviceType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level synthesis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Program name written into the IR and export headers.
    pub program_name: String,

    /// Device allocation settings.
    pub devices: DeviceConfig,

    /// Oscillator timing.
    pub flicker: FlickerConfig,

    /// Export settings.
    pub export: ExportConfig,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            program_name: "MAIN".to_string(),
            devices: DeviceConfig::default(),
            flicker: FlickerConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

/// Device allocation settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Capacity per device type.
    pub limits: DeviceLimits,

    /// Initial allocation cursor per device type (e.g. `"X1"`).
    pub start: Vec<DeviceAddress>,

    /// Addresses never handed out by the allocator.
    pub reserved: Vec<DeviceAddress>,
}

/// Number of addressable devices per type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceLimits {
    /// Inputs.
    pub x: u32,
    /// Outputs.
    pub y: u32,
    /// Internal relays.
    pub m: u32,
    /// Timers.
    pub t: u32,
    /// Counters.
    pub c: u32,
    /// Data registers.
    pub d: u32,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            x: 32,
            y: 32,
            m: 100,
            t: 100,
            c: 100,
            d: 100,
        }
    }
}

impl DeviceLimits {
    /// Capacity for one device type.
    #[must_use]
    pub fn limit(&self, device_type: DeviceType) -> u32 {
        match device_type {
            DeviceType::X => self.x,
            DeviceType::Y => self.y,
            DeviceType::M => self.m,
            DeviceType::T => self.t,
            DeviceType::C => self.c,
            DeviceType::D => self.d,
        }
    }
}

/// Oscillator (flicker) timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlickerConfig {
    /// Half-period of a standalone flicker circuit when no step gives one.
    #[serde(with = "duration_text")]
    pub period: Duration,

    /// Half-period of the oscillator spawned at the end of a timer chain.
    #[serde(with = "duration_text")]
    pub chained_period: Duration,
}

impl Default for FlickerConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(1),
            chained_period: Duration::from_millis(500),
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// CPU model written into the spreadsheet header.
    pub cpu_type: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            cpu_type: "QCPU (Q mode) Q03UDV".to_string(),
        }
    }
}

impl SynthesisConfig {
    /// Read a `ladder.toml` file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file is unreadable, [`ConfigError::Parse`]
    /// if its contents are not a valid synthesis configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse a configuration; missing tables and keys take their defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] on malformed TOML, unknown device letters or
    /// unparseable durations.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Render the full configuration, defaults included.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Serialize`] if a value has no TOML form.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Failures loading or saving a [`SynthesisConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read synthesis config {path}: {source}")]
    Io {
        /// File that was opened.
        path: PathBuf,
        /// Cause.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid synthesis configuration.
    #[error("invalid synthesis config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration could not be rendered as TOML.
    #[error("cannot render synthesis config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Flicker half-periods as human-readable strings (`"500ms"`, `"1s"`).
mod duration_text {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(period: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*period))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SynthesisConfig::default();
        assert_eq!(config.program_name, "MAIN");
        assert_eq!(config.devices.limits.limit(DeviceType::X), 32);
        assert_eq!(config.devices.limits.limit(DeviceType::T), 100);
        assert_eq!(config.flicker.period, Duration::from_secs(1));
        assert_eq!(config.flicker.chained_period, Duration::from_millis(500));
        assert_eq!(config.export.cpu_type, "QCPU (Q mode) Q03UDV");
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            program_name = "CARWASH"

            [devices]
            start = ["X1", "M10"]
            reserved = ["Y0"]

            [devices.limits]
            x = 16
            t = 20

            [flicker]
            period = "2s"
        "#;

        let config = SynthesisConfig::from_toml(toml).unwrap();
        assert_eq!(config.program_name, "CARWASH");
        assert_eq!(config.devices.limits.x, 16);
        assert_eq!(config.devices.limits.y, 32);
        assert_eq!(config.devices.limits.t, 20);
        assert_eq!(
            config.devices.start,
            vec![
                DeviceAddress::new(DeviceType::X, 1),
                DeviceAddress::new(DeviceType::M, 10)
            ]
        );
        assert_eq!(config.devices.reserved.len(), 1);
        assert_eq!(config.flicker.period, Duration::from_secs(2));
        assert_eq!(config.flicker.chained_period, Duration::from_millis(500));
    }

    #[test]
    fn test_reject_bad_device() {
        let toml = r#"
            [devices]
            reserved = ["Q0"]
        "#;
        assert!(matches!(
            SynthesisConfig::from_toml(toml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = SynthesisConfig::default();
        let text = config.to_toml().unwrap();
        let back = SynthesisConfig::from_toml(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_periods_written_as_text() {
        let text = SynthesisConfig::default().to_toml().unwrap();
        assert!(text.contains("period = \"1s\""), "{text}");
        assert!(text.contains("chained_period = \"500ms\""), "{text}");
    }

    #[test]
    fn test_from_file_missing() {
        let err = SynthesisConfig::from_file(std::path::Path::new("/nonexistent/ladder.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
