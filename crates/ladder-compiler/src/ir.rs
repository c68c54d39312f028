//! Ladder intermediate representation.
//!
//! A rung's input side is a value tree of series and parallel contact
//! networks; its output side is a non-empty list of coils, timers,
//! counters, set/reset and application instructions. Devices are held as
//! rendered device strings (`"X0"`, `"T3"`).

use crate::patterns::PatternKind;
use ladder_common::DeviceMap;
use serde::{Deserialize, Serialize};

/// Contact polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContactMode {
    /// Normally open (closed while the device is on).
    #[serde(rename = "NO")]
    NormallyOpen,
    /// Normally closed (closed while the device is off).
    #[serde(rename = "NC")]
    NormallyClosed,
}

/// A boolean read of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// Device string.
    pub device: String,
    /// Polarity.
    pub mode: ContactMode,
}

impl Contact {
    /// Normally-open contact.
    pub fn no(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            mode: ContactMode::NormallyOpen,
        }
    }

    /// Normally-closed contact.
    pub fn nc(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            mode: ContactMode::NormallyClosed,
        }
    }
}

/// Member of a series connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SeriesElement {
    /// Single contact.
    Contact(Contact),
    /// Nested parallel network.
    Parallel(ParallelBranch),
}

/// Contacts and sub-networks ANDed left to right.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesConnection {
    /// Elements in evaluation order.
    pub elements: Vec<SeriesElement>,
}

impl SeriesConnection {
    /// Series of the given elements.
    #[must_use]
    pub fn new(elements: Vec<SeriesElement>) -> Self {
        Self { elements }
    }

    /// Series of plain contacts.
    pub fn of_contacts(contacts: impl IntoIterator<Item = Contact>) -> Self {
        Self {
            elements: contacts.into_iter().map(SeriesElement::Contact).collect(),
        }
    }

    /// The contact, if this series is exactly one bare contact.
    #[must_use]
    pub fn single_contact(&self) -> Option<&Contact> {
        match self.elements.as_slice() {
            [SeriesElement::Contact(contact)] => Some(contact),
            _ => None,
        }
    }
}

/// Series legs ORed together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelBranch {
    /// Legs in evaluation order.
    pub branches: Vec<SeriesConnection>,
}

impl ParallelBranch {
    /// Parallel network of the given legs.
    #[must_use]
    pub fn new(branches: Vec<SeriesConnection>) -> Self {
        Self { branches }
    }
}

/// Root of a rung's input network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputSection {
    /// Series root.
    Series(SeriesConnection),
    /// Parallel root.
    Parallel(ParallelBranch),
}

impl InputSection {
    /// Returns true when the network holds no contacts at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Series(series) => series.elements.is_empty(),
            Self::Parallel(parallel) => parallel.branches.is_empty(),
        }
    }
}

impl From<SeriesConnection> for InputSection {
    fn from(series: SeriesConnection) -> Self {
        Self::Series(series)
    }
}

impl From<ParallelBranch> for InputSection {
    fn from(parallel: ParallelBranch) -> Self {
        Self::Parallel(parallel)
    }
}

/// SET or RST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetResetOp {
    /// Latch the device on.
    Set,
    /// Clear the device (or reset a timer/counter).
    Reset,
}

/// Output-side element of a rung.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputElement {
    /// Plain output coil.
    Coil {
        /// Device string.
        device: String,
    },
    /// Timer coil with preset in 100 ms units.
    Timer {
        /// Device string.
        device: String,
        /// Preset.
        k_value: u32,
    },
    /// Counter coil with count preset.
    Counter {
        /// Device string.
        device: String,
        /// Preset.
        k_value: u32,
    },
    /// SET or RST of a device.
    SetReset {
        /// Device string.
        device: String,
        /// Which instruction.
        op: SetResetOp,
    },
    /// Application instruction such as `MOV K100 D0`.
    Application {
        /// Mnemonic.
        opcode: String,
        /// Operands in order.
        operands: Vec<String>,
    },
}

impl OutputElement {
    /// The driven device, for elements that drive exactly one.
    #[must_use]
    pub fn device(&self) -> Option<&str> {
        match self {
            Self::Coil { device }
            | Self::Timer { device, .. }
            | Self::Counter { device, .. }
            | Self::SetReset { device, .. } => Some(device),
            Self::Application { .. } => None,
        }
    }
}

/// One input network driving one or more outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rung {
    /// Zero-based position in the program.
    pub index: usize,
    /// Rung comment.
    #[serde(default)]
    pub comment: String,
    /// Input network.
    pub input: InputSection,
    /// Outputs, all driven by the same condition.
    pub outputs: Vec<OutputElement>,
}

/// A complete ladder program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderProgram {
    /// Program name.
    pub name: String,
    /// Device allocations used by the rungs.
    pub device_map: DeviceMap,
    /// Rungs in scan order.
    pub rungs: Vec<Rung>,
    /// Patterns that contributed rungs, in the order they were recorded.
    pub detected_patterns: Vec<PatternKind>,
}
