//! Rung assembly.
//!
//! [`LadderBuilder`] owns the rung list and the monotonic rung index.
//! Rungs are added through [`RungBuilder`] or through the convenience
//! methods for the common shapes (latch, contact-to-output, timer,
//! stage gate).

use crate::ir::{
    Contact, InputSection, LadderProgram, OutputElement, ParallelBranch, Rung, SeriesConnection,
    SeriesElement, SetResetOp,
};
use crate::patterns::PatternKind;
use ladder_common::{DeviceMap, LadderError, LadderResult};
use std::mem;
use tracing::info;

/// Accumulates rungs for one program.
#[derive(Debug, Clone)]
pub struct LadderBuilder {
    name: String,
    rungs: Vec<Rung>,
    next_index: usize,
    patterns: Vec<PatternKind>,
}

impl Default for LadderBuilder {
    fn default() -> Self {
        Self::new("MAIN")
    }
}

impl LadderBuilder {
    /// Create an empty builder for a program called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rungs: Vec::new(),
            next_index: 0,
            patterns: Vec::new(),
        }
    }

    /// Start a new rung.
    pub fn rung(&mut self, comment: impl Into<String>) -> RungBuilder<'_> {
        RungBuilder {
            builder: self,
            comment: comment.into(),
            elements: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Append a rung and return its index.
    ///
    /// # Errors
    ///
    /// Returns [`LadderError::Compile`] if `outputs` is empty or the input
    /// network has no contacts.
    pub fn add_rung(
        &mut self,
        input: InputSection,
        outputs: Vec<OutputElement>,
        comment: impl Into<String>,
    ) -> LadderResult<usize> {
        let index = self.next_index;
        if outputs.is_empty() {
            return Err(LadderError::Compile {
                rung: index,
                reason: "rung has no outputs".to_string(),
            });
        }
        if input.is_empty() {
            return Err(LadderError::Compile {
                rung: index,
                reason: "rung has no input contacts".to_string(),
            });
        }
        self.rungs.push(Rung {
            index,
            comment: comment.into(),
            input,
            outputs,
        });
        self.next_index += 1;
        Ok(index)
    }

    /// `(start OR relay) AND NOT stop -> relay`.
    ///
    /// # Errors
    ///
    /// Never fails for non-empty device strings; see [`Self::add_rung`].
    pub fn add_self_hold_rung(
        &mut self,
        start: &str,
        stop: &str,
        relay: &str,
        comment: &str,
    ) -> LadderResult<usize> {
        self.rung(comment)
            .contact(start)
            .or_contact(relay)
            .nc_contact(stop)
            .coil(relay)
            .commit()
    }

    /// `contact -> output`.
    ///
    /// # Errors
    ///
    /// See [`Self::add_rung`].
    pub fn add_output_rung(
        &mut self,
        contact: &str,
        output: &str,
        comment: &str,
    ) -> LadderResult<usize> {
        self.rung(comment).contact(contact).coil(output).commit()
    }

    /// `contact -> OUT timer K`.
    ///
    /// # Errors
    ///
    /// See [`Self::add_rung`].
    pub fn add_timer_rung(
        &mut self,
        contact: &str,
        timer: &str,
        k_value: u32,
        comment: &str,
    ) -> LadderResult<usize> {
        self.rung(comment)
            .contact(contact)
            .timer(timer, k_value)
            .commit()
    }

    /// `enable AND NOT gate -> output`: the output is on from the moment the
    /// stage is enabled until its own timer expires.
    ///
    /// # Errors
    ///
    /// See [`Self::add_rung`].
    pub fn add_stage_gated_rung(
        &mut self,
        enable: &str,
        gate: &str,
        output: &str,
        comment: &str,
    ) -> LadderResult<usize> {
        self.rung(comment)
            .contact(enable)
            .nc_contact(gate)
            .coil(output)
            .commit()
    }

    /// `contact -> OUT counter K`.
    ///
    /// # Errors
    ///
    /// See [`Self::add_rung`].
    pub fn add_counter_rung(
        &mut self,
        contact: &str,
        counter: &str,
        k_value: u32,
        comment: &str,
    ) -> LadderResult<usize> {
        self.rung(comment)
            .contact(contact)
            .counter(counter, k_value)
            .commit()
    }

    /// `contact -> RST counter`.
    ///
    /// # Errors
    ///
    /// See [`Self::add_rung`].
    pub fn add_counter_reset_rung(
        &mut self,
        contact: &str,
        counter: &str,
        comment: &str,
    ) -> LadderResult<usize> {
        self.rung(comment).contact(contact).reset(counter).commit()
    }

    /// `contact -> opcode operands...`.
    ///
    /// # Errors
    ///
    /// See [`Self::add_rung`].
    pub fn add_application_rung(
        &mut self,
        contact: &str,
        opcode: &str,
        operands: &[&str],
        comment: &str,
    ) -> LadderResult<usize> {
        self.rung(comment)
            .contact(contact)
            .application(opcode, operands.iter().copied())
            .commit()
    }

    /// Record a pattern tag. Repeated tags are ignored.
    pub fn add_pattern(&mut self, kind: PatternKind) {
        if !self.patterns.contains(&kind) {
            self.patterns.push(kind);
        }
    }

    /// Index the next rung will receive.
    #[must_use]
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Rungs added so far.
    #[must_use]
    pub fn rungs(&self) -> &[Rung] {
        &self.rungs
    }

    /// Finish the program.
    #[must_use]
    pub fn build(self, device_map: DeviceMap) -> LadderProgram {
        info!(
            program = %self.name,
            rungs = self.rungs.len(),
            devices = device_map.len(),
            "built ladder program"
        );
        LadderProgram {
            name: self.name,
            device_map,
            rungs: self.rungs,
            detected_patterns: self.patterns,
        }
    }
}

/// Fluent builder for a single rung.
///
/// Contacts accumulate left to right in series; [`RungBuilder::or_contact`]
/// puts everything so far in parallel with a new contact.
///
/// # Example
///
/// ```
/// use ladder_compiler::builder::LadderBuilder;
///
/// let mut builder = LadderBuilder::new("MAIN");
/// builder
///     .rung("latch")
///     .contact("X0")
///     .or_contact("M0")
///     .nc_contact("X1")
///     .coil("M0")
///     .commit()
///     .unwrap();
/// assert_eq!(builder.rungs().len(), 1);
/// ```
#[derive(Debug)]
pub struct RungBuilder<'a> {
    builder: &'a mut LadderBuilder,
    comment: String,
    elements: Vec<SeriesElement>,
    outputs: Vec<OutputElement>,
}

impl RungBuilder<'_> {
    /// AND a normally-open contact.
    #[must_use]
    pub fn contact(mut self, device: &str) -> Self {
        self.elements.push(SeriesElement::Contact(Contact::no(device)));
        self
    }

    /// AND a normally-closed contact.
    #[must_use]
    pub fn nc_contact(mut self, device: &str) -> Self {
        self.elements.push(SeriesElement::Contact(Contact::nc(device)));
        self
    }

    /// OR a normally-open contact with everything added so far.
    #[must_use]
    pub fn or_contact(mut self, device: &str) -> Self {
        let leg = SeriesConnection::of_contacts([Contact::no(device)]);
        let current = mem::take(&mut self.elements);
        let parallel = match <[SeriesElement; 1]>::try_from(current) {
            Ok([SeriesElement::Parallel(mut parallel)]) => {
                parallel.branches.push(leg);
                parallel
            }
            Ok([single]) => ParallelBranch::new(vec![SeriesConnection::new(vec![single]), leg]),
            Err(current) if current.is_empty() => ParallelBranch::new(vec![leg]),
            Err(current) => ParallelBranch::new(vec![SeriesConnection::new(current), leg]),
        };
        self.elements.push(SeriesElement::Parallel(parallel));
        self
    }

    /// AND a parallel sub-network.
    #[must_use]
    pub fn parallel(mut self, branches: Vec<SeriesConnection>) -> Self {
        self.elements
            .push(SeriesElement::Parallel(ParallelBranch::new(branches)));
        self
    }

    /// Drive an output coil.
    #[must_use]
    pub fn coil(mut self, device: &str) -> Self {
        self.outputs.push(OutputElement::Coil {
            device: device.to_string(),
        });
        self
    }

    /// Drive a timer.
    #[must_use]
    pub fn timer(mut self, device: &str, k_value: u32) -> Self {
        self.outputs.push(OutputElement::Timer {
            device: device.to_string(),
            k_value,
        });
        self
    }

    /// Drive a counter.
    #[must_use]
    pub fn counter(mut self, device: &str, k_value: u32) -> Self {
        self.outputs.push(OutputElement::Counter {
            device: device.to_string(),
            k_value,
        });
        self
    }

    /// SET a device.
    #[must_use]
    pub fn set(mut self, device: &str) -> Self {
        self.outputs.push(OutputElement::SetReset {
            device: device.to_string(),
            op: SetResetOp::Set,
        });
        self
    }

    /// RST a device.
    #[must_use]
    pub fn reset(mut self, device: &str) -> Self {
        self.outputs.push(OutputElement::SetReset {
            device: device.to_string(),
            op: SetResetOp::Reset,
        });
        self
    }

    /// Execute an application instruction.
    #[must_use]
    pub fn application<I, S>(mut self, opcode: &str, operands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs.push(OutputElement::Application {
            opcode: opcode.to_string(),
            operands: operands.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Append the rung to the program and return its index.
    ///
    /// # Errors
    ///
    /// Returns [`LadderError::Compile`] if no outputs or no contacts were
    /// added.
    pub fn commit(self) -> LadderResult<usize> {
        let input = InputSection::Series(SeriesConnection::new(self.elements));
        self.builder.add_rung(input, self.outputs, self.comment)
    }
}
