//! Start/stop latch.
//!
//! ```text
//! LD  X0    start
//! OR  M0    hold
//! ANI X1    stop
//! OUT M0
//! ```

use super::{Pattern, PatternContext, PatternKind};
use ladder_common::{Intent, LadderResult, TimingDescription};
use tracing::info;

pub(super) const PATTERN: Pattern = Pattern {
    kind: PatternKind::SelfHold,
    priority: 10,
    matches,
    generate,
};

fn matches(timing: &TimingDescription) -> bool {
    let has_start = timing.sequences.iter().any(|step| {
        let action = step.action_label();
        step.is_immediate() && action.intent == Intent::On && !action.is_all()
    });
    let has_stop = timing
        .sequences
        .iter()
        .any(|step| step.action_label().intent == Intent::Off);
    has_start && has_stop && timing.inputs.len() >= 2
}

fn generate(ctx: &mut PatternContext<'_>) -> LadderResult<()> {
    let start = &ctx.start_input(PatternKind::SelfHold)?.name;
    let relay = ctx.latch(&format!("M_{start}_HOLD"), &format!("{start} self-hold"))?;
    let outputs = ctx.immediate_outputs(start, &relay)?;
    info!(relay = %relay, outputs, "generated self-hold circuit");
    ctx.builder.add_pattern(PatternKind::SelfHold);
    Ok(())
}
