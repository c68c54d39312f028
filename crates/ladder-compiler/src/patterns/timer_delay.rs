//! Standalone on-delay timers.
//!
//! ```text
//! LD  M0        source
//! OUT T0 K50
//! LD  T0
//! OUT Y1
//! ```

use super::{Pattern, PatternContext, PatternKind};
use ladder_common::{LadderError, LadderResult, TimingDescription};
use tracing::{info, warn};

pub(super) const PATTERN: Pattern = Pattern {
    kind: PatternKind::TimerDelay,
    priority: 5,
    matches,
    generate,
};

fn matches(timing: &TimingDescription) -> bool {
    timing.delayed_steps().next().is_some()
}

/// Resolve a trigger to a device: a latch relay named after it, then any
/// allocation under its name, then a declared input.
fn resolve_source(ctx: &mut PatternContext<'_>, trigger: &str) -> LadderResult<Option<String>> {
    if let Some(relay) = ctx.allocator.get(&format!("M_{trigger}_HOLD")) {
        return Ok(Some(relay.address.to_string()));
    }
    if let Some(existing) = ctx.allocator.get(trigger) {
        return Ok(Some(existing.address.to_string()));
    }
    let timing = ctx.timing;
    match timing.input(trigger) {
        Some(input) => ctx.input(input, "trigger").map(Some),
        None => Ok(None),
    }
}

fn generate(ctx: &mut PatternContext<'_>) -> LadderResult<()> {
    let timing = ctx.timing;
    let mut timers = 0;

    for step in timing.sequences.iter() {
        let Some(delay) = step.positive_delay() else {
            continue;
        };
        let action = step.action_label();
        if action.is_all() {
            continue;
        }
        let trigger = step.trigger_label().device;
        let Some(source) = resolve_source(ctx, &trigger)? else {
            warn!(trigger = %trigger, "unresolvable trigger, skipping delayed step");
            continue;
        };
        let Some(output) = ctx.claim_output(&action.device)? else {
            continue;
        };

        let name = &action.device;
        let timer = ctx.allocator.allocate_timer(
            &format!("T_{name}"),
            delay,
            &format!("{delay}s delay ({name})"),
        )?;
        let timer_device = timer.address.to_string();
        ctx.builder.add_timer_rung(
            &source,
            &timer_device,
            timer.k_value().unwrap_or(1),
            &format!("{delay}s timer ({name})"),
        )?;
        ctx.builder
            .add_output_rung(&timer_device, &output, &format!("{name} output"))?;
        timers += 1;
    }

    if timers == 0 {
        return Err(LadderError::Generation {
            pattern: PatternKind::TimerDelay.to_string(),
            reason: "no delayed step resolves to a trigger and a declared output".to_string(),
        });
    }
    info!(timers, "generated timer delays");
    ctx.builder.add_pattern(PatternKind::TimerDelay);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::DeviceAllocator;
    use crate::builder::LadderBuilder;
    use crate::compiler::LadderCompiler;
    use ladder_common::{InputDevice, OutputDevice, SequenceStep, SynthesisConfig};

    fn delay_timing() -> TimingDescription {
        TimingDescription {
            description: "sensor starts the motor after 2.5 seconds".to_string(),
            inputs: vec![InputDevice::new("SEN", "")],
            outputs: vec![OutputDevice::new("MTR", "")],
            sequences: vec![SequenceStep::delayed("SEN", "MTR ON", 2.5)],
        }
    }

    #[test]
    fn test_matches_positive_delay_only() {
        assert!(matches(&delay_timing()));

        let mut zero = delay_timing();
        zero.sequences[0].delay = Some(0.0);
        assert!(!matches(&zero));
    }

    #[test]
    fn test_generate_from_input() {
        let timing = delay_timing();
        let config = SynthesisConfig::default();
        let mut allocator = DeviceAllocator::new();
        let mut builder = LadderBuilder::default();
        let mut ctx = PatternContext::new(&timing, &config, &mut allocator, &mut builder);
        generate(&mut ctx).unwrap();

        let program = builder.build(allocator.build_device_map());
        let il = LadderCompiler::new().compile(&program).unwrap();
        assert_eq!(il.to_text(), "LD X0\nOUT T0 K25\nLD T0\nOUT Y0\nEND");
    }

    #[test]
    fn test_second_coil_on_same_output_is_skipped() {
        let mut timing = delay_timing();
        timing
            .sequences
            .push(SequenceStep::delayed("SEN", "MTR ON", 4.0));
        let config = SynthesisConfig::default();
        let mut allocator = DeviceAllocator::new();
        let mut builder = LadderBuilder::default();
        let mut ctx = PatternContext::new(&timing, &config, &mut allocator, &mut builder);
        generate(&mut ctx).unwrap();
        assert_eq!(builder.rungs().len(), 2);
    }

    #[test]
    fn test_nothing_resolvable_is_an_error() {
        let mut timing = delay_timing();
        timing.sequences[0].trigger = "GHOST".to_string();
        let config = SynthesisConfig::default();
        let mut allocator = DeviceAllocator::new();
        let mut builder = LadderBuilder::default();
        let mut ctx = PatternContext::new(&timing, &config, &mut allocator, &mut builder);
        assert!(matches!(
            generate(&mut ctx),
            Err(LadderError::Generation { .. })
        ));
    }
}
