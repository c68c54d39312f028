//! Latch plus timed stages.
//!
//! Two layouts are generated depending on how the delayed steps are wired:
//!
//! * cumulative: every delayed step hangs off the latch relay, so all
//!   timers start together when the latch closes.
//!
//!   ```text
//!   LD M0 / OUT T0 K50      LD T0 / OUT Y1
//!   LD M0 / OUT T1 K100     LD T1 / OUT Y2
//!   ```
//!
//! * chained: each delayed step is triggered by the previous stage's output
//!   turning on, so each stage timer is enabled by the timer before it and
//!   each stage output runs only until its own timer expires.
//!
//!   ```text
//!   LD M0 / OUT T0 K50      LD M0 / ANI T0 / OUT Y1
//!   LD T0 / OUT T1 K30      LD T0 / ANI T1 / OUT Y2
//!   ```
//!
//!   Steps at the end of the chain (a flicker, or a plain output) hang off a
//!   completion relay fed by the last stage timer.

use super::{Pattern, PatternContext, PatternKind};
use ladder_common::{Intent, LadderResult, TimingDescription};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

pub(super) const PATTERN: Pattern = Pattern {
    kind: PatternKind::Sequential,
    priority: 20,
    matches,
    generate,
};

fn matches(timing: &TimingDescription) -> bool {
    let Some(start) = timing.inputs.first() else {
        return false;
    };
    let started_by_first_input = timing.sequences.iter().any(|step| {
        let action = step.action_label();
        step.is_immediate()
            && action.intent == Intent::On
            && !action.is_all()
            && step.trigger_label().device == start.name
    });
    timing.inputs.len() >= 2 && started_by_first_input && timing.delayed_steps().next().is_some()
}

/// Delayed steps with more than one distinct trigger form a chain; a single
/// shared trigger (or a single delayed step) is cumulative.
pub(crate) fn is_chained(timing: &TimingDescription) -> bool {
    let triggers: HashSet<String> = timing
        .delayed_steps()
        .map(|step| step.trigger_label().key())
        .collect();
    timing.delayed_steps().count() >= 2 && triggers.len() > 1
}

fn generate(ctx: &mut PatternContext<'_>) -> LadderResult<()> {
    let start = ctx.start_input(PatternKind::Sequential)?;
    let relay = ctx.latch("M_HOLD", "run self-hold")?;

    if is_chained(ctx.timing) {
        generate_chained(ctx, &start.name, &relay)?;
    } else {
        generate_cumulative(ctx, &start.name, &relay)?;
    }

    ctx.builder.add_pattern(PatternKind::SelfHold);
    ctx.builder.add_pattern(PatternKind::TimerDelay);
    ctx.builder.add_pattern(PatternKind::Sequential);
    Ok(())
}

fn generate_cumulative(ctx: &mut PatternContext<'_>, start: &str, relay: &str) -> LadderResult<()> {
    let timing = ctx.timing;
    ctx.immediate_outputs(start, relay)?;

    let mut timers = 0;
    for step in &timing.sequences {
        let Some(delay) = step.positive_delay() else {
            continue;
        };
        let action = step.action_label();
        if action.is_all() {
            continue;
        }
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
            relay,
            &timer_device,
            timer.k_value().unwrap_or(1),
            &format!("{delay}s timer ({name})"),
        )?;
        ctx.builder
            .add_output_rung(&timer_device, &output, &format!("{name} output"))?;
        timers += 1;
    }

    info!(timers, "generated cumulative sequence");
    Ok(())
}

/// One delayed step, keyed under the label that triggers it.
struct StageEntry {
    delay: f64,
    output: String,
    intent: Intent,
}

fn on_key(name: &str) -> String {
    format!("{name} {}", Intent::On)
}

fn generate_chained(ctx: &mut PatternContext<'_>, start: &str, relay: &str) -> LadderResult<()> {
    let timing = ctx.timing;

    let mut stages: HashMap<String, Vec<StageEntry>> = HashMap::new();
    for step in &timing.sequences {
        let Some(delay) = step.positive_delay() else {
            continue;
        };
        let action = step.action_label();
        if action.is_all() {
            continue;
        }
        stages
            .entry(step.trigger_label().key())
            .or_default()
            .push(StageEntry {
                delay,
                output: action.device,
                intent: action.intent,
            });
    }

    // The first immediate output whose own "ON" triggers a delayed step
    // starts the chain; the rest are driven straight from the latch.
    let mut starter: Option<String> = None;
    for step in timing.sequences.iter().filter(|s| s.is_immediate()) {
        let action = step.action_label();
        if step.trigger_label().device != start || action.is_all() || action.intent != Intent::On
        {
            continue;
        }
        if starter.is_none() && stages.contains_key(&action.key()) {
            starter = Some(action.device);
            continue;
        }
        if let Some(output) = ctx.claim_output(&action.device)? {
            ctx.builder
                .add_output_rung(relay, &output, &format!("{} output", action.device))?;
        }
    }

    let Some(starter) = starter else {
        warn!("no immediate output starts the timer chain");
        return Ok(());
    };

    let mut current = starter;
    let mut enable = relay.to_string();
    let mut last_timer: Option<String> = None;
    let mut visited = HashSet::new();
    let mut flickers = Vec::new();
    let mut completions = Vec::new();

    while let Some(entries) = stages.get(&on_key(&current)) {
        if !visited.insert(current.clone()) {
            warn!(stage = %current, "timer chain revisits a stage, stopping");
            break;
        }
        let Some(first) = entries.first() else {
            break;
        };

        let mut next = None;
        for entry in entries {
            match &entry.intent {
                Intent::Flicker => flickers.push(entry.output.clone()),
                Intent::On if stages.contains_key(&on_key(&entry.output)) => {
                    next = Some(entry.output.clone());
                }
                Intent::On => completions.push(entry.output.clone()),
                other => {
                    warn!(output = %entry.output, intent = %other, "unsupported action in chain, skipping");
                }
            }
        }

        let duration = first.delay;
        let timer = ctx.allocator.allocate_timer(
            &format!("T_{current}"),
            duration,
            &format!("{current} stage ({duration}s)"),
        )?;
        let timer_device = timer.address.to_string();
        ctx.builder.add_timer_rung(
            &enable,
            &timer_device,
            timer.k_value().unwrap_or(1),
            &format!("{duration}s timer ({current})"),
        )?;
        if let Some(output) = ctx.claim_output(&current)? {
            ctx.builder.add_stage_gated_rung(
                &enable,
                &timer_device,
                &output,
                &format!("{current} output"),
            )?;
        }
        debug!(stage = %current, timer = %timer_device, "chained stage");
        last_timer = Some(timer_device.clone());

        match next {
            Some(next) => {
                enable = timer_device;
                current = next;
            }
            None => break,
        }
    }

    let Some(last_timer) = last_timer else {
        return Ok(());
    };
    if flickers.is_empty() && completions.is_empty() {
        info!(stages = visited.len(), "generated chained sequence");
        return Ok(());
    }

    let complete = ctx
        .allocator
        .allocate_relay("M_COMPLETE", "sequence complete")?
        .address
        .to_string();
    ctx.builder
        .add_output_rung(&last_timer, &complete, "sequence complete")?;

    let seconds = ctx.config.flicker.chained_period.as_secs_f64();
    for name in &flickers {
        if let Some(output) = ctx.claim_output(name)? {
            ctx.oscillator(&complete, &output, &format!("T_FLICKER_{name}"), seconds, name)?;
        }
    }
    for name in &completions {
        if let Some(output) = ctx.claim_output(name)? {
            ctx.builder
                .add_output_rung(&complete, &output, &format!("{name} output"))?;
        }
    }

    info!(
        stages = visited.len(),
        flickers = flickers.len(),
        completions = completions.len(),
        "generated chained sequence"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::DeviceAllocator;
    use crate::builder::LadderBuilder;
    use crate::compiler::LadderCompiler;
    use crate::ir::LadderProgram;
    use ladder_common::{InputDevice, OutputDevice, SequenceStep, SynthesisConfig};

    fn inputs() -> Vec<InputDevice> {
        vec![InputDevice::new("PB1", "start"), InputDevice::new("PB2", "stop")]
    }

    fn outputs(names: &[&str]) -> Vec<OutputDevice> {
        names.iter().map(|n| OutputDevice::new(*n, "")).collect()
    }

    fn run(timing: &TimingDescription) -> LadderProgram {
        let config = SynthesisConfig::default();
        let mut allocator = DeviceAllocator::new();
        let mut builder = LadderBuilder::default();
        let mut ctx = PatternContext::new(timing, &config, &mut allocator, &mut builder);
        generate(&mut ctx).unwrap();
        builder.build(allocator.build_device_map())
    }

    fn cumulative_timing() -> TimingDescription {
        TimingDescription {
            description: "lamps in sequence".to_string(),
            inputs: inputs(),
            outputs: outputs(&["RL", "GL", "BZ"]),
            sequences: vec![
                SequenceStep::immediate("PB1", "RL ON"),
                SequenceStep::delayed("PB1", "GL ON", 5.0),
                SequenceStep::delayed("PB1", "BZ ON", 10.0),
                SequenceStep::immediate("PB2", "ALL OFF"),
            ],
        }
    }

    fn chained_timing() -> TimingDescription {
        TimingDescription {
            description: "three stage chain".to_string(),
            inputs: inputs(),
            outputs: outputs(&["RL", "A", "B", "C"]),
            sequences: vec![
                SequenceStep::immediate("PB1", "RL ON"),
                SequenceStep::immediate("PB1", "A ON"),
                SequenceStep::delayed("A ON", "B ON", 2.0),
                SequenceStep::delayed("B ON", "C ON", 3.0),
                SequenceStep::immediate("PB2", "ALL OFF"),
            ],
        }
    }

    #[test]
    fn test_matches() {
        assert!(matches(&cumulative_timing()));

        let mut no_delay = cumulative_timing();
        no_delay.sequences.retain(|s| s.delay.is_none());
        assert!(!matches(&no_delay));

        let mut other_trigger = cumulative_timing();
        other_trigger.sequences[0].trigger = "PB2".to_string();
        assert!(!matches(&other_trigger));
    }

    #[test]
    fn test_chain_detection() {
        assert!(!is_chained(&cumulative_timing()));
        assert!(is_chained(&chained_timing()));

        let single = TimingDescription {
            sequences: vec![SequenceStep::delayed("RL ON", "GL ON", 5.0)],
            ..cumulative_timing()
        };
        assert!(!is_chained(&single));
    }

    #[test]
    fn test_cumulative_il() {
        let program = run(&cumulative_timing());
        let il = LadderCompiler::new().compile(&program).unwrap();
        assert_eq!(
            il.to_text(),
            "LD X0\nOR M0\nANI X1\nOUT M0\n\
             LD M0\nOUT Y0\n\
             LD M0\nOUT T0 K50\nLD T0\nOUT Y1\n\
             LD M0\nOUT T1 K100\nLD T1\nOUT Y2\nEND"
        );
        assert_eq!(
            program.detected_patterns,
            vec![
                PatternKind::SelfHold,
                PatternKind::TimerDelay,
                PatternKind::Sequential
            ]
        );
    }

    #[test]
    fn test_chained_without_tail() {
        let program = run(&chained_timing());
        let il = LadderCompiler::new().compile(&program).unwrap();
        // C never triggers anything, so it is a completion output of stage B.
        assert_eq!(
            il.to_text(),
            "LD X0\nOR M0\nANI X1\nOUT M0\n\
             LD M0\nOUT Y0\n\
             LD M0\nOUT T0 K20\nLD M0\nANI T0\nOUT Y1\n\
             LD T0\nOUT T1 K30\nLD T0\nANI T1\nOUT Y2\n\
             LD T1\nOUT M1\n\
             LD M1\nOUT Y3\nEND"
        );
    }

    #[test]
    fn test_chain_revisit_stops() {
        let mut timing = chained_timing();
        timing
            .sequences
            .push(SequenceStep::delayed("C ON", "A ON", 1.0));
        let program = run(&timing);
        let timers: Vec<_> = program
            .device_map
            .iter()
            .filter(|a| a.logical_name.starts_with("T_"))
            .map(|a| a.logical_name.as_str())
            .collect();
        assert_eq!(timers, ["T_A", "T_B", "T_C"]);
        assert!(program.device_map.get_by_name("M_COMPLETE").is_none());
    }
}
