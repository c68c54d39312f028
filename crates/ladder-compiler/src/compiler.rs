//! Ladder IR to Instruction List lowering.
//!
//! The target is a one-register contact machine with a block stack
//! (merged by `ORB`/`ANB`) and a branch stack (`MPS`/`MRD`/`MPP`) for
//! driving several outputs from one condition.

use crate::instructions::{Instruction, InstructionSequence, Opcode};
use crate::ir::{
    Contact, ContactMode, InputSection, LadderProgram, OutputElement, ParallelBranch, Rung,
    SeriesConnection, SeriesElement, SetResetOp,
};
use ladder_common::{LadderError, LadderResult};
use tracing::debug;

/// Lowers ladder programs to IL.
#[derive(Debug, Clone, Copy, Default)]
pub struct LadderCompiler;

impl LadderCompiler {
    /// Create a new compiler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compile every rung in order and append a single `END`.
    ///
    /// # Errors
    ///
    /// Returns [`LadderError::Compile`] for the first rung that cannot be
    /// lowered; no partial sequence is produced.
    pub fn compile(&self, program: &LadderProgram) -> LadderResult<InstructionSequence> {
        let mut sequence = InstructionSequence::new();
        for rung in &program.rungs {
            sequence.extend(self.compile_rung(rung)?);
        }
        sequence.push(Instruction::bare(Opcode::End));
        debug!(
            program = %program.name,
            instructions = sequence.len(),
            "compiled program"
        );
        Ok(sequence)
    }

    /// Lower one rung.
    ///
    /// # Errors
    ///
    /// Returns [`LadderError::Compile`] if the rung has no outputs, an
    /// empty contact network, or an application output named after a fixed
    /// mnemonic such as `END`.
    pub fn compile_rung(&self, rung: &Rung) -> LadderResult<Vec<Instruction>> {
        if rung.outputs.is_empty() {
            return Err(LadderError::Compile {
                rung: rung.index,
                reason: "rung has no outputs".to_string(),
            });
        }

        let mut lowerer = RungLowerer {
            rung: rung.index,
            body: Vec::new(),
        };
        match &rung.input {
            InputSection::Series(series) => lowerer.lower_series(series)?,
            InputSection::Parallel(parallel) => lowerer.lower_parallel(parallel)?,
        }
        lowerer.lower_outputs(&rung.outputs)?;

        debug!(rung = rung.index, instructions = lowerer.body.len(), "lowered rung");
        Ok(lowerer.body)
    }
}

/// Per-rung lowering state.
struct RungLowerer {
    rung: usize,
    body: Vec<Instruction>,
}

impl RungLowerer {
    fn error(&self, reason: &str) -> LadderError {
        LadderError::Compile {
            rung: self.rung,
            reason: reason.to_string(),
        }
    }

    fn load(&mut self, contact: &Contact) {
        let opcode = match contact.mode {
            ContactMode::NormallyOpen => Opcode::Ld,
            ContactMode::NormallyClosed => Opcode::Ldi,
        };
        self.body.push(Instruction::with_device(opcode, &contact.device));
    }

    fn and(&mut self, contact: &Contact) {
        let opcode = match contact.mode {
            ContactMode::NormallyOpen => Opcode::And,
            ContactMode::NormallyClosed => Opcode::Ani,
        };
        self.body.push(Instruction::with_device(opcode, &contact.device));
    }

    fn or(&mut self, contact: &Contact) {
        let opcode = match contact.mode {
            ContactMode::NormallyOpen => Opcode::Or,
            ContactMode::NormallyClosed => Opcode::Ori,
        };
        self.body.push(Instruction::with_device(opcode, &contact.device));
    }

    /// The first member loads; later contacts AND in, later sub-networks
    /// are evaluated as their own block and merged with ANB.
    fn lower_series(&mut self, series: &SeriesConnection) -> LadderResult<()> {
        if series.elements.is_empty() {
            return Err(self.error("empty series connection"));
        }
        for (i, element) in series.elements.iter().enumerate() {
            match element {
                SeriesElement::Contact(contact) if i == 0 => self.load(contact),
                SeriesElement::Contact(contact) => self.and(contact),
                SeriesElement::Parallel(parallel) => {
                    self.lower_parallel(parallel)?;
                    if i > 0 {
                        self.body.push(Instruction::bare(Opcode::Anb));
                    }
                }
            }
        }
        Ok(())
    }

    fn lower_parallel(&mut self, parallel: &ParallelBranch) -> LadderResult<()> {
        if parallel.branches.is_empty() {
            return Err(self.error("empty parallel branch"));
        }

        let singles: Option<Vec<&Contact>> = parallel
            .branches
            .iter()
            .map(SeriesConnection::single_contact)
            .collect();
        if let Some(contacts) = singles {
            for (i, contact) in contacts.into_iter().enumerate() {
                if i == 0 {
                    self.load(contact);
                } else {
                    self.or(contact);
                }
            }
            return Ok(());
        }

        for (i, branch) in parallel.branches.iter().enumerate() {
            self.lower_series(branch)?;
            if i > 0 {
                self.body.push(Instruction::bare(Opcode::Orb));
            }
        }
        Ok(())
    }

    fn lower_outputs(&mut self, outputs: &[OutputElement]) -> LadderResult<()> {
        let last = outputs.len() - 1;
        for (i, output) in outputs.iter().enumerate() {
            if last > 0 {
                let stack_op = match i {
                    0 => Opcode::Mps,
                    i if i == last => Opcode::Mpp,
                    _ => Opcode::Mrd,
                };
                self.body.push(Instruction::bare(stack_op));
            }
            let instruction = self.encode_output(output)?;
            self.body.push(instruction);
        }
        Ok(())
    }

    fn encode_output(&self, output: &OutputElement) -> LadderResult<Instruction> {
        Ok(match output {
            OutputElement::Coil { device } => Instruction::with_device(Opcode::Out, device),
            OutputElement::Timer { device, k_value }
            | OutputElement::Counter { device, k_value } => {
                Instruction::out_preset(device, *k_value)
            }
            OutputElement::SetReset { device, op } => {
                let opcode = match op {
                    SetResetOp::Set => Opcode::Set,
                    SetResetOp::Reset => Opcode::Rst,
                };
                Instruction::with_device(opcode, device)
            }
            OutputElement::Application { opcode, operands } => {
                // Same normalisation as IL text parsing, so rendered IL reads back equal.
                let Opcode::Application(mnemonic) = opcode.parse::<Opcode>()? else {
                    return Err(self.error("application opcode collides with a fixed mnemonic"));
                };
                Instruction::application(&mnemonic, operands.clone())
            }
        })
    }
}
