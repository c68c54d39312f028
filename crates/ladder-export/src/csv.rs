//! GX Works2 spreadsheet export.
//!
//! The IDE's CSV import expects UTF-16LE with a byte-order mark, tab
//! separated fields that are always quoted, and CRLF line endings. Each row
//! carries the step number at which the instruction starts:
//!
//! ```text
//! "MAIN"
//! "PLC Information:"  "QCPU (Q mode) Q03UDV"
//! "Step No."  "Line Statement"  "Instruction"  "I/O(Device)"  ...
//! "0"  ""  "LD"   "X0"  ""  ""  ""
//! "1"  ""  "OUT"  "T0"  ""  ""  ""
//! ""   ""  ""     "K50" ""  ""  ""
//! "5"  ""  "END"  ""    ""  ""  ""
//! ```

use crate::ExportResult;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use ladder_common::{DeviceMap, DeviceType, SynthesisConfig};
use ladder_compiler::instructions::{Instruction, InstructionSequence, Opcode};
use std::path::Path;
use tracing::debug;

const COLUMNS: [&str; 7] = [
    "Step No.",
    "Line Statement",
    "Instruction",
    "I/O(Device)",
    "Blank",
    "PI Statement",
    "Note",
];

/// Spreadsheet header settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    /// Program name on the first line.
    pub program_name: String,
    /// CPU model on the PLC information line.
    pub cpu_type: String,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self::from_config(&SynthesisConfig::default())
    }
}

impl CsvOptions {
    /// Take the program name and CPU model from a synthesis configuration.
    #[must_use]
    pub fn from_config(config: &SynthesisConfig) -> Self {
        Self {
            program_name: config.program_name.clone(),
            cpu_type: config.export.cpu_type.clone(),
        }
    }
}

fn is_preset_out(instruction: &Instruction) -> bool {
    instruction.opcode == Opcode::Out
        && instruction
            .device
            .as_deref()
            .and_then(|d| d.chars().next())
            .and_then(DeviceType::from_letter)
            .is_some_and(DeviceType::takes_preset)
}

/// Number of program steps an instruction occupies.
#[must_use]
pub fn step_cost(instruction: &Instruction) -> usize {
    match &instruction.opcode {
        Opcode::End => 2,
        Opcode::Application(_) => instruction.operands.len() + 1,
        _ if is_preset_out(instruction) => 4,
        _ => 1,
    }
}

fn row(step: Option<usize>, mnemonic: &str, device: &str) -> [String; 7] {
    [
        step.map(|s| s.to_string()).unwrap_or_default(),
        String::new(),
        mnemonic.to_string(),
        device.to_string(),
        String::new(),
        String::new(),
        String::new(),
    ]
}

fn rows(step: usize, instruction: &Instruction) -> Vec<[String; 7]> {
    let mnemonic = instruction.opcode.mnemonic();
    if let Opcode::Application(_) = instruction.opcode {
        let mut operands = instruction.operands.iter();
        let first = operands.next().map_or("", String::as_str);
        let mut rows = vec![row(Some(step), mnemonic, first)];
        rows.extend(operands.map(|operand| row(None, "", operand)));
        return rows;
    }

    let device = instruction.device.as_deref().unwrap_or_default();
    if is_preset_out(instruction) {
        let k_value = instruction
            .k_value
            .map(|k| format!("K{k}"))
            .unwrap_or_default();
        return vec![row(Some(step), mnemonic, device), row(None, "", &k_value)];
    }
    vec![row(Some(step), mnemonic, device)]
}

/// Render IL as GX Works2 CSV import bytes (UTF-16LE with BOM).
///
/// # Errors
///
/// Returns an error if a record cannot be written.
pub fn to_csv(sequence: &InstructionSequence, options: &CsvOptions) -> ExportResult<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::CRLF)
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record([options.program_name.as_str()])?;
    writer.write_record(["PLC Information:", options.cpu_type.as_str()])?;
    writer.write_record(COLUMNS)?;

    let mut step = 0;
    for instruction in sequence {
        for record in rows(step, instruction) {
            writer.write_record(&record)?;
        }
        step += step_cost(instruction);
    }
    debug!(instructions = sequence.len(), steps = step, "wrote csv rows");

    let utf8 = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(encode_utf16le(&String::from_utf8_lossy(&utf8)))
}

fn encode_utf16le(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(2 + text.len() * 2);
    bytes.extend_from_slice(&[0xFF, 0xFE]);
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

/// Write [`to_csv`] output to `path`.
///
/// # Errors
///
/// Returns an error if formatting or writing fails.
pub fn write_csv(
    path: impl AsRef<Path>,
    sequence: &InstructionSequence,
    options: &CsvOptions,
) -> ExportResult<()> {
    let bytes = to_csv(sequence, options)?;
    std::fs::write(path.as_ref(), bytes)?;
    Ok(())
}

/// `Device,Comment` table for every allocation.
///
/// A timer comment that differs from the device comment is appended in
/// parentheses. An empty map produces an empty string.
///
/// # Errors
///
/// Returns an error if a record cannot be written.
pub fn device_comments(device_map: &DeviceMap) -> ExportResult<String> {
    if device_map.is_empty() {
        return Ok(String::new());
    }

    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(["Device", "Comment"])?;
    for allocation in device_map.iter() {
        let mut comment = if allocation.comment.is_empty() {
            allocation.logical_name.clone()
        } else {
            allocation.comment.clone()
        };
        if let Some(timer) = allocation
            .timer
            .as_ref()
            .filter(|t| !t.comment.is_empty() && t.comment != comment)
        {
            comment = format!("{comment} ({})", timer.comment);
        }
        writer.write_record([allocation.address.to_string(), comment])?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
