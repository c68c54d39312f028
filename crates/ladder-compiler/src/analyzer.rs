//! Pattern detection report for a timing description.
//!
//! Unlike generation, which commits to the single best pattern, analysis
//! reports every idiom the description exhibits along with input warnings.

use crate::patterns::{PatternKind, PatternRegistry};
use ladder_common::TimingDescription;
use serde::{Deserialize, Serialize};

/// One detected idiom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedPattern {
    /// Which idiom.
    pub kind: PatternKind,
    /// Heuristic confidence in `0.0..=1.0`.
    pub confidence: f64,
}

/// Result of [`analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingAnalysis {
    /// Detected idioms in priority order.
    pub detected: Vec<DetectedPattern>,
    /// Start/stop latch present.
    pub has_self_hold: bool,
    /// At least one positive delay.
    pub has_timer: bool,
    /// Repetition or blinking requested.
    pub has_flicker: bool,
    /// Latch plus timed stages.
    pub has_sequential: bool,
    /// An all-outputs-off action.
    pub has_full_reset: bool,
    /// Problems with the description itself.
    pub warnings: Vec<String>,
}

fn confidence(kind: PatternKind) -> f64 {
    match kind {
        PatternKind::TimerDelay | PatternKind::FullReset => 0.95,
        PatternKind::Sequential | PatternKind::SelfHold => 0.9,
        PatternKind::Flicker => 0.85,
    }
}

/// Detect every idiom in `timing` using the registry's match predicates.
#[must_use]
pub fn analyze(registry: &PatternRegistry, timing: &TimingDescription) -> TimingAnalysis {
    let detected: Vec<DetectedPattern> = registry
        .find_matching(timing)
        .into_iter()
        .map(|pattern| DetectedPattern {
            kind: pattern.kind,
            confidence: confidence(pattern.kind),
        })
        .collect();
    let has = |kind| detected.iter().any(|d| d.kind == kind);

    TimingAnalysis {
        has_self_hold: has(PatternKind::SelfHold),
        has_timer: has(PatternKind::TimerDelay),
        has_flicker: has(PatternKind::Flicker),
        has_sequential: has(PatternKind::Sequential),
        has_full_reset: has(PatternKind::FullReset),
        warnings: warnings(timing),
        detected,
    }
}

fn warnings(timing: &TimingDescription) -> Vec<String> {
    let mut warnings = Vec::new();
    if timing.inputs.is_empty() {
        warnings.push("no input devices declared".to_string());
    }
    if timing.outputs.is_empty() {
        warnings.push("no output devices declared".to_string());
    }
    if timing.sequences.is_empty() {
        warnings.push("no sequence steps declared".to_string());
    }
    for (i, step) in timing.sequences.iter().enumerate() {
        let action = step.action_label();
        if !action.is_all() && timing.output(&action.device).is_none() {
            warnings.push(format!(
                "step {i}: action '{}' names an undeclared output",
                step.action
            ));
        }
        if step.delay.is_some_and(|d| d <= 0.0) {
            warnings.push(format!("step {i}: delay must be positive"));
        }
    }
    warnings
}
