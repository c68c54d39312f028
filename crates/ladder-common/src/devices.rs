//! MELSEC-Q device addressing and allocation records.
//!
//! X/Y devices are written in octal (X0..X7, X10..X17) while the allocator
//! works with a sequential internal index, so internal address 8 renders as
//! `X10`. All other device types use decimal addresses as-is.

use crate::error::{LadderError, LadderResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// MELSEC device families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeviceType {
    /// Input.
    X,
    /// Output.
    Y,
    /// Internal (auxiliary) relay.
    M,
    /// Timer.
    T,
    /// Counter.
    C,
    /// Data register.
    D,
}

impl DeviceType {
    /// Every device type, in canonical order.
    pub const ALL: [DeviceType; 6] = [
        DeviceType::X,
        DeviceType::Y,
        DeviceType::M,
        DeviceType::T,
        DeviceType::C,
        DeviceType::D,
    ];

    /// Device letter as written in IL.
    #[must_use]
    pub fn letter(self) -> char {
        match self {
            Self::X => 'X',
            Self::Y => 'Y',
            Self::M => 'M',
            Self::T => 'T',
            Self::C => 'C',
            Self::D => 'D',
        }
    }

    /// Look up a device type by its letter (case-insensitive).
    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'X' => Some(Self::X),
            'Y' => Some(Self::Y),
            'M' => Some(Self::M),
            'T' => Some(Self::T),
            'C' => Some(Self::C),
            'D' => Some(Self::D),
            _ => None,
        }
    }

    /// Returns true for device types written in octal.
    #[must_use]
    pub fn is_octal(self) -> bool {
        matches!(self, Self::X | Self::Y)
    }

    /// Returns true for timers and counters, whose OUT carries a K preset.
    #[must_use]
    pub fn takes_preset(self) -> bool {
        matches!(self, Self::T | Self::C)
    }

    fn radix(self) -> u32 {
        if self.is_octal() {
            8
        } else {
            10
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A device address with an internal sequential index.
///
/// # Example
///
/// ```
/// use ladder_common::devices::{DeviceAddress, DeviceType};
///
/// let input = DeviceAddress::new(DeviceType::X, 8);
/// assert_eq!(input.to_string(), "X10");
///
/// let parsed: DeviceAddress = "X10".parse().unwrap();
/// assert_eq!(parsed, input);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceAddress {
    /// Device family.
    pub device_type: DeviceType,
    /// Internal sequential address.
    pub address: u32,
}

impl DeviceAddress {
    /// Create a new device address.
    #[must_use]
    pub const fn new(device_type: DeviceType, address: u32) -> Self {
        Self {
            device_type,
            address,
        }
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.device_type.is_octal() {
            write!(f, "{}{:o}", self.device_type.letter(), self.address)
        } else {
            write!(f, "{}{}", self.device_type.letter(), self.address)
        }
    }
}

fn parse_error(input: &str, reason: impl Into<String>) -> LadderError {
    LadderError::DeviceParse {
        input: input.to_string(),
        reason: reason.into(),
    }
}

impl FromStr for DeviceAddress {
    type Err = LadderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let Some(letter) = chars.next() else {
            return Err(parse_error(s, "empty device string"));
        };
        let device_type = DeviceType::from_letter(letter)
            .ok_or_else(|| parse_error(s, format!("unknown device type '{letter}'")))?;

        let digits = chars.as_str();
        if digits.is_empty() {
            return Err(parse_error(s, "missing address digits"));
        }
        // from_str_radix tolerates a leading '+', which IL does not.
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(parse_error(s, "address must be numeric"));
        }

        let address = u32::from_str_radix(digits, device_type.radix()).map_err(|e| {
            let base = if device_type.is_octal() {
                "octal"
            } else {
                "decimal"
            };
            parse_error(s, format!("invalid {base} address: {e}"))
        })?;

        Ok(Self::new(device_type, address))
    }
}

impl Serialize for DeviceAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DeviceAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Timer preset derived from a duration in seconds (100 ms base).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerConfig {
    /// K value in 100 ms units.
    pub k_value: u32,
    /// Requested duration in seconds.
    pub seconds: f64,
    /// Device comment.
    #[serde(default)]
    pub comment: String,
}

impl TimerConfig {
    /// Derive the K value as `max(1, round(seconds * 10))`.
    ///
    /// Durations shorter than one tick are floored to a single tick rather
    /// than rejected.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_seconds(seconds: f64, comment: impl Into<String>) -> Self {
        let ticks = (seconds * 10.0).round();
        let k_value = if ticks.is_finite() && ticks >= 1.0 {
            ticks.min(f64::from(u32::MAX)) as u32
        } else {
            1
        };
        Self {
            k_value,
            seconds,
            comment: comment.into(),
        }
    }
}

/// Counter preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterConfig {
    /// Count preset.
    pub k_value: u32,
    /// Device comment.
    #[serde(default)]
    pub comment: String,
}

impl CounterConfig {
    /// Create a counter preset.
    ///
    /// # Errors
    ///
    /// Returns an error if `count` is zero.
    pub fn new(count: u32, comment: impl Into<String>) -> LadderResult<Self> {
        if count == 0 {
            return Err(LadderError::Config(
                "counter preset must be positive".to_string(),
            ));
        }
        Ok(Self {
            k_value: count,
            comment: comment.into(),
        })
    }
}

/// A single logical-name to device mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceAllocation {
    /// Logical name (e.g. `PB1`, `RL`, `M_HOLD`).
    pub logical_name: String,
    /// Assigned device.
    pub address: DeviceAddress,
    /// Device comment.
    #[serde(default)]
    pub comment: String,
    /// Timer preset, for T devices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timer: Option<TimerConfig>,
    /// Counter preset, for C devices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter: Option<CounterConfig>,
}

impl DeviceAllocation {
    /// The K preset carried by this allocation, if any.
    #[must_use]
    pub fn k_value(&self) -> Option<u32> {
        self.timer
            .as_ref()
            .map(|t| t.k_value)
            .or_else(|| self.counter.as_ref().map(|c| c.k_value))
    }
}

/// Ordered device allocations for one program.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceMap {
    /// Allocations in the order they were made.
    pub allocations: Vec<DeviceAllocation>,
}

impl DeviceMap {
    /// Find an allocation by logical name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&DeviceAllocation> {
        self.allocations.iter().find(|a| a.logical_name == name)
    }

    /// Find an allocation by device address.
    #[must_use]
    pub fn get_by_address(&self, address: DeviceAddress) -> Option<&DeviceAllocation> {
        self.allocations.iter().find(|a| a.address == address)
    }

    /// Rendered device string for a logical name.
    #[must_use]
    pub fn address_string(&self, name: &str) -> Option<String> {
        self.get_by_name(name).map(|a| a.address.to_string())
    }

    /// Number of allocations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    /// Returns true if nothing has been allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    /// Iterate allocations in order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceAllocation> {
        self.allocations.iter()
    }
}
