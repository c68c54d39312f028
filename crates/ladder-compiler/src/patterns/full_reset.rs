//! Stop turns every output off.
//!
//! Detection only: the reset is already expressed by the normally-closed
//! stop contact inside the latch, so no rungs are emitted.

use super::{Pattern, PatternContext, PatternKind};
use ladder_common::{Intent, LadderResult, TimingDescription};

pub(super) const PATTERN: Pattern = Pattern {
    kind: PatternKind::FullReset,
    priority: 3,
    matches,
    generate,
};

fn matches(timing: &TimingDescription) -> bool {
    timing.sequences.iter().any(|step| {
        let action = step.action_label();
        action.is_all() && action.intent == Intent::Off
    })
}

fn generate(ctx: &mut PatternContext<'_>) -> LadderResult<()> {
    ctx.builder.add_pattern(PatternKind::FullReset);
    Ok(())
}
