//! Instruction List (IL) model.
//!
//! Each [`Instruction`] renders as `OPCODE [DEVICE] [K<value>]`, or as
//! `OPCODE operand operand...` for application instructions, and parses
//! back from the same text.

use ladder_common::{LadderError, LadderResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Known application instructions and their operand counts.
const APPLICATION_ARITY: [(&str, usize); 12] = [
    ("MOV", 2),
    ("DMOV", 2),
    ("+", 3),
    ("-", 3),
    ("*", 3),
    ("/", 3),
    ("INC", 1),
    ("DEC", 1),
    ("CMP", 3),
    ("BCD", 2),
    ("BIN", 2),
    ("SMOV", 2),
];

/// Operand count for a known application mnemonic.
#[must_use]
pub fn application_arity(mnemonic: &str) -> Option<usize> {
    APPLICATION_ARITY
        .iter()
        .find(|(name, _)| *name == mnemonic)
        .map(|&(_, arity)| arity)
}

/// IL mnemonics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Load normally-open contact.
    Ld,
    /// Load normally-closed contact.
    Ldi,
    /// AND normally-open contact.
    And,
    /// AND normally-closed contact.
    Ani,
    /// OR normally-open contact.
    Or,
    /// OR normally-closed contact.
    Ori,
    /// Drive coil, timer or counter.
    Out,
    /// Latch device on.
    Set,
    /// Reset device.
    Rst,
    /// OR two blocks.
    Orb,
    /// AND two blocks.
    Anb,
    /// Push branch stack.
    Mps,
    /// Read branch stack.
    Mrd,
    /// Pop branch stack.
    Mpp,
    /// End of program.
    End,
    /// Application instruction such as `MOV` or `+`.
    Application(String),
}

impl Opcode {
    /// Mnemonic text.
    #[must_use]
    pub fn mnemonic(&self) -> &str {
        match self {
            Self::Ld => "LD",
            Self::Ldi => "LDI",
            Self::And => "AND",
            Self::Ani => "ANI",
            Self::Or => "OR",
            Self::Ori => "ORI",
            Self::Out => "OUT",
            Self::Set => "SET",
            Self::Rst => "RST",
            Self::Orb => "ORB",
            Self::Anb => "ANB",
            Self::Mps => "MPS",
            Self::Mrd => "MRD",
            Self::Mpp => "MPP",
            Self::End => "END",
            Self::Application(name) => name,
        }
    }

    /// Contact instructions (LD through ORI).
    #[must_use]
    pub fn is_contact(&self) -> bool {
        matches!(
            self,
            Self::Ld | Self::Ldi | Self::And | Self::Ani | Self::Or | Self::Ori
        )
    }

    /// Instructions that drive a device (OUT, SET, RST).
    #[must_use]
    pub fn is_output(&self) -> bool {
        matches!(self, Self::Out | Self::Set | Self::Rst)
    }

    /// Instructions that take neither device nor operands.
    #[must_use]
    pub fn takes_no_operands(&self) -> bool {
        matches!(
            self,
            Self::Orb | Self::Anb | Self::Mps | Self::Mrd | Self::Mpp | Self::End
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl FromStr for Opcode {
    type Err = LadderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.is_empty() || token.contains(char::is_whitespace) {
            return Err(LadderError::InstructionParse {
                line: s.to_string(),
                reason: "expected a single mnemonic".to_string(),
            });
        }
        let upper = token.to_uppercase();
        Ok(match upper.as_str() {
            "LD" => Self::Ld,
            "LDI" => Self::Ldi,
            "AND" => Self::And,
            "ANI" => Self::Ani,
            "OR" => Self::Or,
            "ORI" => Self::Ori,
            "OUT" => Self::Out,
            "SET" => Self::Set,
            "RST" => Self::Rst,
            "ORB" => Self::Orb,
            "ANB" => Self::Anb,
            "MPS" => Self::Mps,
            "MRD" => Self::Mrd,
            "MPP" => Self::Mpp,
            "END" => Self::End,
            _ => Self::Application(upper),
        })
    }
}

impl Serialize for Opcode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.mnemonic())
    }
}

impl<'de> Deserialize<'de> for Opcode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A single IL instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// Mnemonic.
    pub opcode: Opcode,
    /// Device operand for contact and output instructions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// K literal for timer and counter outputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k_value: Option<u32>,
    /// Operands for application instructions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operands: Vec<String>,
}

impl Instruction {
    /// Instruction without operands (`ORB`, `MPS`, `END`, ...).
    #[must_use]
    pub fn bare(opcode: Opcode) -> Self {
        Self {
            opcode,
            device: None,
            k_value: None,
            operands: Vec::new(),
        }
    }

    /// Instruction with a device operand.
    pub fn with_device(opcode: Opcode, device: impl Into<String>) -> Self {
        Self {
            device: Some(device.into()),
            ..Self::bare(opcode)
        }
    }

    /// `OUT device K<value>`.
    pub fn out_preset(device: impl Into<String>, k_value: u32) -> Self {
        Self {
            device: Some(device.into()),
            k_value: Some(k_value),
            ..Self::bare(Opcode::Out)
        }
    }

    /// Application instruction with operands.
    pub fn application(mnemonic: &str, operands: Vec<String>) -> Self {
        Self {
            operands,
            ..Self::bare(Opcode::Application(mnemonic.to_string()))
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        if let Some(device) = &self.device {
            write!(f, " {device}")?;
        }
        if let Some(k) = self.k_value {
            write!(f, " K{k}")?;
        }
        for operand in &self.operands {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}

impl FromStr for Instruction {
    type Err = LadderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason: &str| LadderError::InstructionParse {
            line: s.to_string(),
            reason: reason.to_string(),
        };

        let mut tokens = s.split_whitespace();
        let opcode: Opcode = tokens.next().ok_or_else(|| fail("empty line"))?.parse()?;

        if let Opcode::Application(_) = opcode {
            return Ok(Self {
                operands: tokens.map(str::to_string).collect(),
                ..Self::bare(opcode)
            });
        }

        let mut instruction = Self::bare(opcode);
        instruction.device = tokens.next().map(str::to_string);
        if let Some(literal) = tokens.next() {
            let digits = literal
                .strip_prefix('K')
                .or_else(|| literal.strip_prefix('k'))
                .ok_or_else(|| fail("expected K literal after device"))?;
            let k = digits
                .parse::<u32>()
                .map_err(|_| fail("K literal is not a number"))?;
            instruction.k_value = Some(k);
        }
        if tokens.next().is_some() {
            return Err(fail("unexpected trailing tokens"));
        }
        Ok(instruction)
    }
}

/// An ordered IL program.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstructionSequence {
    instructions: Vec<Instruction>,
}

impl InstructionSequence {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn extend(&mut self, instructions: impl IntoIterator<Item = Instruction>) {
        self.instructions.extend(instructions);
    }

    pub(crate) fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Parse IL text, one instruction per line. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`LadderError::InstructionParse`] for the first malformed line.
    pub fn parse(text: &str) -> LadderResult<Self> {
        let instructions = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::parse::<Instruction>)
            .collect::<LadderResult<Vec<Instruction>>>()?;
        Ok(Self { instructions })
    }

    /// Instructions in order.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if the sequence holds no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Iterate instructions in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// Render as IL text, one instruction per line.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.instructions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<'a> IntoIterator for &'a InstructionSequence {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}
