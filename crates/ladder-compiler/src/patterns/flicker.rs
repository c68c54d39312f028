//! Two-timer oscillator.
//!
//! ```text
//! LD  M0 / ANI T1 / OUT T0 Kn    on-phase timer
//! LD  T0 / OUT T1 Kn             off-phase timer
//! LD  T0 / ANI T1 / OUT Y0       output follows the on phase
//! ```

use super::{Pattern, PatternContext, PatternKind};
use ladder_common::{LadderError, LadderResult, TimingDescription};
use tracing::info;

pub(super) const PATTERN: Pattern = Pattern {
    kind: PatternKind::Flicker,
    priority: 15,
    matches,
    generate,
};

fn matches(timing: &TimingDescription) -> bool {
    timing.mentions_flicker()
}

fn generation_error(reason: &str) -> LadderError {
    LadderError::Generation {
        pattern: PatternKind::Flicker.to_string(),
        reason: reason.to_string(),
    }
}

fn generate(ctx: &mut PatternContext<'_>) -> LadderResult<()> {
    let timing = ctx.timing;

    // The last step naming a declared output picks the output, and the last
    // positive delay sets the half-period.
    let mut seconds = ctx.config.flicker.period.as_secs_f64();
    let mut target = None;
    for step in &timing.sequences {
        if let Some(delay) = step.positive_delay() {
            seconds = delay;
        }
        if let Some(output) = timing.output(&step.action_label().device) {
            target = Some(output);
        }
    }
    let target = target
        .or_else(|| timing.outputs.first())
        .ok_or_else(|| generation_error("no outputs declared"))?;

    let start = ctx.start_input(PatternKind::Flicker)?;
    let enable = if timing.inputs.len() >= 2 {
        ctx.latch(
            &format!("M_{}_HOLD", start.name),
            &format!("{} self-hold", start.name),
        )?
    } else {
        ctx.input(start, "start")?
    };

    let Some(output) = ctx.claim_output(&target.name)? else {
        return Err(generation_error("flicker output is already driven"));
    };
    ctx.oscillator(&enable, &output, "T_FLICKER", seconds, &target.name)?;

    info!(output = %target.name, seconds, "generated flicker circuit");
    ctx.builder.add_pattern(PatternKind::Flicker);
    Ok(())
}
