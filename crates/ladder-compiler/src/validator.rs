//! Structural checks on Instruction List programs.
//!
//! Diagnostics are returned as data: an empty list means the sequence is
//! well formed. Nothing here fails or panics on malformed input.

use crate::instructions::{application_arity, Instruction, Opcode};
use ladder_common::{DeviceAddress, DeviceType};

/// Validate an instruction sequence and collect every problem found.
///
/// # Example
///
/// ```
/// use ladder_compiler::instructions::InstructionSequence;
/// use ladder_compiler::validator::validate;
///
/// let ok = InstructionSequence::parse("LD X0\nOUT Y0\nEND").unwrap();
/// assert!(validate(ok.instructions()).is_empty());
///
/// let bad = InstructionSequence::parse("LD X0\nMPS\nOUT Y0").unwrap();
/// assert_eq!(validate(bad.instructions()).len(), 2);
/// ```
#[must_use]
pub fn validate(instructions: &[Instruction]) -> Vec<String> {
    if instructions.is_empty() {
        return vec!["Empty instruction sequence".to_string()];
    }

    let mut diagnostics = Vec::new();
    check_end(instructions, &mut diagnostics);
    check_branch_stack(instructions, &mut diagnostics);
    for (position, instruction) in instructions.iter().enumerate() {
        check_operands(position, instruction, &mut diagnostics);
    }
    diagnostics
}

fn check_end(instructions: &[Instruction], diagnostics: &mut Vec<String>) {
    let last = instructions.len() - 1;
    if instructions[last].opcode != Opcode::End {
        diagnostics.push("Program must end with END instruction".to_string());
    }
    for (position, instruction) in instructions[..last].iter().enumerate() {
        if instruction.opcode == Opcode::End {
            diagnostics.push(format!(
                "END instruction found at position {position} (not at end)"
            ));
        }
    }
}

fn check_branch_stack(instructions: &[Instruction], diagnostics: &mut Vec<String>) {
    let mut depth: usize = 0;
    for (position, instruction) in instructions.iter().enumerate() {
        match instruction.opcode {
            Opcode::Mps => depth += 1,
            Opcode::Mrd if depth == 0 => {
                diagnostics.push(format!("MRD at position {position} without matching MPS"));
            }
            Opcode::Mpp if depth == 0 => {
                diagnostics.push(format!("MPP at position {position} without matching MPS"));
            }
            Opcode::Mpp => depth -= 1,
            _ => {}
        }
    }
    if depth != 0 {
        diagnostics.push(format!("MPS/MPP stack imbalance: {depth} unmatched MPS"));
    }
}

fn check_operands(position: usize, instruction: &Instruction, diagnostics: &mut Vec<String>) {
    let opcode = &instruction.opcode;

    if let Opcode::Application(mnemonic) = opcode {
        let Some(arity) = application_arity(mnemonic) else {
            diagnostics.push(format!(
                "Unknown application instruction {mnemonic} at position {position}"
            ));
            return;
        };
        let got = instruction.operands.len();
        if got == 0 {
            diagnostics.push(format!("{mnemonic} at position {position} requires operands"));
        } else if got != arity {
            diagnostics.push(format!(
                "{mnemonic} at position {position} requires {arity} operands, got {got}"
            ));
        }
        return;
    }

    if opcode.takes_no_operands() {
        if instruction.device.is_some() {
            diagnostics.push(format!("{opcode} at position {position} should not have a device"));
        }
        return;
    }

    let Some(device_text) = instruction.device.as_deref() else {
        diagnostics.push(format!("{opcode} at position {position} requires a device"));
        return;
    };
    let device: DeviceAddress = match device_text.parse() {
        Ok(device) => device,
        Err(e) => {
            diagnostics.push(format!("Invalid device at position {position}: {e}"));
            return;
        }
    };

    let device_type = device.device_type;
    if *opcode == Opcode::Out && device_type.takes_preset() && instruction.k_value.is_none() {
        diagnostics.push(format!(
            "OUT {device_text} at position {position} requires K value"
        ));
    }
    if matches!(opcode, Opcode::Out | Opcode::Set) && device_type == DeviceType::X {
        diagnostics.push(format!(
            "{opcode} at position {position} cannot drive input device {device_text}"
        ));
    }
    if opcode.is_contact() && device_type == DeviceType::D {
        diagnostics.push(format!(
            "{opcode} at position {position} cannot use data register {device_text} as a contact"
        ));
    }
}
