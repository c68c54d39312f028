use thiserror::Error;

/// Ladder synthesis error types covering allocation, compilation, and pattern selection.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LadderError {
    /// A device type ran out of addresses, or an address exceeds its capacity.
    #[error("device range error for {device_type}: {reason}")]
    DeviceRange {
        /// Device type letter (X, Y, M, T, C, D).
        device_type: String,
        /// Description of the violated limit.
        reason: String,
    },

    /// A manual reservation collided with an address already in use.
    #[error("device conflict: {address} is already allocated")]
    DeviceConflict {
        /// Rendered device address.
        address: String,
    },

    /// A device string could not be parsed.
    #[error("invalid device '{input}': {reason}")]
    DeviceParse {
        /// The offending text.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A line of Instruction List text could not be parsed.
    #[error("invalid instruction '{line}': {reason}")]
    InstructionParse {
        /// The offending line.
        line: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A rung could not be lowered to Instruction List.
    #[error("compile error in rung {rung}: {reason}")]
    Compile {
        /// Rung index.
        rung: usize,
        /// Description of the failure.
        reason: String,
    },

    /// No pattern in the registry claims the timing description.
    #[error("no matching pattern found for: {0}")]
    PatternNotFound(String),

    /// The selected pattern could not produce any rungs.
    #[error("pattern '{pattern}' could not generate rungs: {reason}")]
    Generation {
        /// Pattern name.
        pattern: String,
        /// Description of the failure.
        reason: String,
    },

    /// Configuration value rejected during synthesis.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for ladder operations.
pub type LadderResult<T> = Result<T, LadderError>;
