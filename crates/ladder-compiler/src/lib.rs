//! Timing description to MELSEC-Q ladder logic synthesis.
//!
//! This crate provides:
//! - [`allocator`] - First-fit device allocation
//! - [`ir`] - Ladder intermediate representation
//! - [`builder`] - Rung assembly
//! - [`patterns`] - Control idioms and the pattern registry
//! - [`analyzer`] - Pattern detection report
//! - [`compiler`] - Ladder IR to Instruction List lowering
//! - [`instructions`] - Instruction List model
//! - [`validator`] - Structural IL checks
//!
//! # Example
//!
//! ```
//! use ladder_common::{InputDevice, OutputDevice, SequenceStep, TimingDescription};
//! use ladder_compiler::Synthesizer;
//!
//! let timing = TimingDescription {
//!     description: "PB1 latches the lamp, PB2 stops".to_string(),
//!     inputs: vec![InputDevice::new("PB1", ""), InputDevice::new("PB2", "")],
//!     outputs: vec![OutputDevice::new("LAMP", "")],
//!     sequences: vec![
//!         SequenceStep::immediate("PB1", "LAMP ON"),
//!         SequenceStep::immediate("PB2", "ALL OFF"),
//!     ],
//! };
//!
//! let synthesis = Synthesizer::default().synthesize(&timing).expect("synthesis failed");
//! assert!(synthesis.diagnostics.is_empty());
//! assert_eq!(
//!     synthesis.instructions.to_text(),
//!     "LD X0\nOR M0\nANI X1\nOUT M0\nLD M0\nOUT Y0\nEND"
//! );
//! ```

pub mod allocator;
pub mod analyzer;
pub mod builder;
pub mod compiler;
pub mod instructions;
pub mod ir;
pub mod patterns;
pub mod validator;

use allocator::DeviceAllocator;
use analyzer::TimingAnalysis;
use builder::LadderBuilder;
use compiler::LadderCompiler;
use instructions::{Instruction, InstructionSequence};
use ir::LadderProgram;
use ladder_common::{LadderError, LadderResult, SynthesisConfig, TimingDescription};
use patterns::{PatternContext, PatternRegistry};
use serde::Serialize;
use tracing::{info, warn};

/// Synthesize a ladder program with default settings.
///
/// # Errors
///
/// Returns an error if no pattern matches or generation fails.
pub fn generate(timing: &TimingDescription) -> LadderResult<LadderProgram> {
    Synthesizer::default().generate(timing)
}

/// Output of a full synthesis run.
#[derive(Debug, Clone, Serialize)]
pub struct Synthesis {
    /// Generated ladder program.
    pub program: LadderProgram,
    /// Compiled IL.
    pub instructions: InstructionSequence,
    /// Validator diagnostics; empty means well formed.
    pub diagnostics: Vec<String>,
}

/// The synthesis driver: pattern selection, generation, compilation and
/// validation.
#[derive(Debug, Clone)]
pub struct Synthesizer {
    config: SynthesisConfig,
    registry: PatternRegistry,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(SynthesisConfig::default())
    }
}

impl Synthesizer {
    /// Create a synthesizer with the built-in pattern registry.
    #[must_use]
    pub fn new(config: SynthesisConfig) -> Self {
        Self::with_registry(config, patterns::default_registry())
    }

    /// Create a synthesizer with a custom registry.
    #[must_use]
    pub fn with_registry(config: SynthesisConfig, registry: PatternRegistry) -> Self {
        Self { config, registry }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Pattern registry.
    #[must_use]
    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    /// Pick the best pattern and generate its rungs.
    ///
    /// Each call uses a fresh allocator and builder.
    ///
    /// # Errors
    ///
    /// Returns [`LadderError::PatternNotFound`] if no pattern matches, or the
    /// generator's allocation or generation error.
    pub fn generate(&self, timing: &TimingDescription) -> LadderResult<LadderProgram> {
        let pattern = self.registry.find_best(timing).ok_or_else(|| {
            LadderError::PatternNotFound(summarize(&timing.description))
        })?;
        info!(pattern = %pattern.kind, "selected pattern");

        let mut allocator = DeviceAllocator::with_config(&self.config.devices)?;
        let mut builder = LadderBuilder::new(self.config.program_name.clone());
        let mut ctx = PatternContext::new(timing, &self.config, &mut allocator, &mut builder);
        (pattern.generate)(&mut ctx)?;

        Ok(builder.build(allocator.build_device_map()))
    }

    /// Report every idiom the description exhibits.
    #[must_use]
    pub fn analyze(&self, timing: &TimingDescription) -> TimingAnalysis {
        analyzer::analyze(&self.registry, timing)
    }

    /// Lower a program to IL.
    ///
    /// # Errors
    ///
    /// Returns [`LadderError::Compile`] if a rung cannot be lowered.
    pub fn compile(&self, program: &LadderProgram) -> LadderResult<InstructionSequence> {
        LadderCompiler::new().compile(program)
    }

    /// Check an IL sequence.
    #[must_use]
    pub fn validate(&self, instructions: &[Instruction]) -> Vec<String> {
        validator::validate(instructions)
    }

    /// Generate, compile and validate.
    ///
    /// # Errors
    ///
    /// Returns generation and compilation errors. Validator diagnostics are
    /// returned in [`Synthesis::diagnostics`], not as errors.
    pub fn synthesize(&self, timing: &TimingDescription) -> LadderResult<Synthesis> {
        let program = self.generate(timing)?;
        let instructions = self.compile(&program)?;
        let diagnostics = self.validate(instructions.instructions());
        for diagnostic in &diagnostics {
            warn!(%diagnostic, "validator diagnostic");
        }
        Ok(Synthesis {
            program,
            instructions,
            diagnostics,
        })
    }
}

fn summarize(description: &str) -> String {
    const MAX_CHARS: usize = 60;
    let trimmed = description.trim();
    if trimmed.chars().count() <= MAX_CHARS {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(MAX_CHARS).collect();
        format!("{head}...")
    }
}
