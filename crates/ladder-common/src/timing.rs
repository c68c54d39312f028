//! Timing descriptions: the input to ladder synthesis.
//!
//! A [`TimingDescription`] declares inputs, outputs and an ordered list of
//! [`SequenceStep`]s. Step labels follow a small string convention: the
//! first whitespace-delimited token names a device, the next token carries
//! the intent keyword (`"RL ON"`, `"BZ FLICKER"`, `"ALL OFF"`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical kind of an input device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Push button.
    #[default]
    PushButton,
    /// Toggle switch.
    ToggleSwitch,
    /// Proximity or photoelectric sensor.
    Sensor,
    /// Limit switch.
    LimitSwitch,
}

/// Actuation mode of an input device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputMode {
    /// Contact closes only while actuated.
    #[default]
    Momentary,
    /// Contact stays in position after actuation.
    Maintained,
}

/// Physical kind of an output device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// Indicator lamp.
    #[default]
    Lamp,
    /// Motor.
    Motor,
    /// Buzzer.
    Buzzer,
    /// Solenoid valve.
    Solenoid,
    /// External relay.
    Relay,
    /// Pump.
    Pump,
}

/// A declared input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDevice {
    /// Logical name (e.g. `PB1`).
    pub name: String,
    /// Device kind.
    #[serde(rename = "type", default)]
    pub kind: InputKind,
    /// Actuation mode.
    #[serde(default)]
    pub mode: InputMode,
    /// Device comment.
    #[serde(default)]
    pub comment: String,
}

impl InputDevice {
    /// Create a momentary push-button input.
    pub fn new(name: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: InputKind::default(),
            mode: InputMode::default(),
            comment: comment.into(),
        }
    }
}

/// A declared output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDevice {
    /// Logical name (e.g. `RL`).
    pub name: String,
    /// Device kind.
    #[serde(rename = "type", default)]
    pub kind: OutputKind,
    /// Device comment.
    #[serde(default)]
    pub comment: String,
}

impl OutputDevice {
    /// Create a lamp output.
    pub fn new(name: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: OutputKind::default(),
            comment: comment.into(),
        }
    }
}

/// One step of the timing sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceStep {
    /// Trigger label (e.g. `PB1`, `RL ON`).
    pub trigger: String,
    /// Action label (e.g. `GL ON`, `ALL OFF`).
    pub action: String,
    /// Delay in seconds after the trigger.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
}

impl SequenceStep {
    /// A step that fires as soon as its trigger does.
    pub fn immediate(trigger: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            trigger: trigger.into(),
            action: action.into(),
            delay: None,
        }
    }

    /// A step that fires `seconds` after its trigger.
    pub fn delayed(trigger: impl Into<String>, action: impl Into<String>, seconds: f64) -> Self {
        Self {
            trigger: trigger.into(),
            action: action.into(),
            delay: Some(seconds),
        }
    }

    /// Parsed trigger label.
    #[must_use]
    pub fn trigger_label(&self) -> Label {
        Label::parse(&self.trigger)
    }

    /// Parsed action label.
    #[must_use]
    pub fn action_label(&self) -> Label {
        Label::parse(&self.action)
    }

    /// Returns true when the step carries no delay.
    #[must_use]
    pub fn is_immediate(&self) -> bool {
        self.delay.is_none()
    }

    /// The delay, when it is strictly positive.
    #[must_use]
    pub fn positive_delay(&self) -> Option<f64> {
        self.delay.filter(|d| *d > 0.0)
    }
}

/// Complete timing description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingDescription {
    /// Free-text description of the behaviour.
    #[serde(default)]
    pub description: String,
    /// Declared inputs, in order.
    #[serde(default)]
    pub inputs: Vec<InputDevice>,
    /// Declared outputs, in order.
    #[serde(default)]
    pub outputs: Vec<OutputDevice>,
    /// Sequence steps, in order.
    #[serde(default)]
    pub sequences: Vec<SequenceStep>,
}

impl TimingDescription {
    /// Look up a declared output by name.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&OutputDevice> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Look up a declared input by name.
    #[must_use]
    pub fn input(&self, name: &str) -> Option<&InputDevice> {
        self.inputs.iter().find(|i| i.name == name)
    }

    /// Steps with a strictly positive delay.
    pub fn delayed_steps(&self) -> impl Iterator<Item = &SequenceStep> {
        self.sequences
            .iter()
            .filter(|s| s.positive_delay().is_some())
    }

    /// Returns true when the free text asks for repetition or blinking.
    #[must_use]
    pub fn mentions_flicker(&self) -> bool {
        const KEYWORDS: [&str; 5] = ["점멸", "flicker", "blink", "반복", "깜빡"];
        let text = self.description.to_lowercase();
        KEYWORDS.iter().any(|kw| text.contains(kw))
    }
}

/// What a label asks its device to do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Energize.
    On,
    /// De-energize.
    Off,
    /// Blink on and off.
    Flicker,
    /// Unrecognized keyword, kept uppercased.
    Other(String),
}

impl Intent {
    fn from_keyword(keyword: &str) -> Self {
        let upper = keyword.to_uppercase();
        match upper.as_str() {
            "ON" => Self::On,
            "OFF" | "STOP" | "정지" => Self::Off,
            "FLICKER" | "BLINK" | "점멸" => Self::Flicker,
            _ => Self::Other(upper),
        }
    }

    /// Canonical keyword.
    #[must_use]
    pub fn keyword(&self) -> &str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
            Self::Flicker => "FLICKER",
            Self::Other(kw) => kw,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A tokenized trigger or action label.
///
/// # Example
///
/// ```
/// use ladder_common::timing::{Intent, Label};
///
/// let label = Label::parse("BZ FLICKER");
/// assert_eq!(label.device, "BZ");
/// assert_eq!(label.intent, Intent::Flicker);
///
/// // A bare device name means "on".
/// assert_eq!(Label::parse("RL").key(), "RL ON");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    /// Device token.
    pub device: String,
    /// Intent keyword.
    pub intent: Intent,
}

impl Label {
    /// Tokenize a label.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut tokens = text.split_whitespace();
        let device = tokens.next().unwrap_or_default().to_string();
        let intent = tokens.next().map_or(Intent::On, Intent::from_keyword);
        Self { device, intent }
    }

    /// Returns true when the label addresses every output.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.device.eq_ignore_ascii_case("ALL") || self.device == "전체"
    }

    /// Normalized `"NAME KEYWORD"` form.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{} {}", self.device, self.intent)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.device, self.intent)
    }
}
