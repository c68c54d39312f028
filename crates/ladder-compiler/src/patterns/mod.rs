//! Control idioms and the registry that picks one for a timing description.
//!
//! A [`Pattern`] pairs a match predicate with a generator. The registry
//! keeps patterns sorted by descending priority (ties keep registration
//! order) and the first match wins.

mod flicker;
mod full_reset;
mod self_hold;
mod sequential;
mod timer_delay;

use crate::allocator::DeviceAllocator;
use crate::builder::LadderBuilder;
use ladder_common::{
    InputDevice, Intent, LadderError, LadderResult, SynthesisConfig, TimingDescription,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

/// Pattern identifiers, also used as program tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Latch plus timed stages.
    Sequential,
    /// Two-timer oscillator.
    Flicker,
    /// Start/stop latch.
    SelfHold,
    /// Standalone on-delay timers.
    TimerDelay,
    /// Stop turns every output off.
    FullReset,
}

impl PatternKind {
    /// Tag text.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Flicker => "flicker",
            Self::SelfHold => "self_hold",
            Self::TimerDelay => "timer_delay",
            Self::FullReset => "full_reset",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Predicate deciding whether a pattern applies.
pub type Matcher = fn(&TimingDescription) -> bool;

/// Emits rungs for a selected pattern.
pub type Generator = fn(&mut PatternContext<'_>) -> LadderResult<()>;

/// A control idiom.
#[derive(Clone, Copy)]
pub struct Pattern {
    /// Identifier.
    pub kind: PatternKind,
    /// Higher priorities are tried first.
    pub priority: i32,
    /// Applicability test.
    pub matches: Matcher,
    /// Rung generator.
    pub generate: Generator,
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("kind", &self.kind)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Everything a generator may touch during one synthesis run.
pub struct PatternContext<'a> {
    /// Description being synthesized.
    pub timing: &'a TimingDescription,
    /// Synthesis settings.
    pub config: &'a SynthesisConfig,
    /// Device allocator for this run.
    pub allocator: &'a mut DeviceAllocator,
    /// Rung builder for this run.
    pub builder: &'a mut LadderBuilder,
    driven: HashSet<String>,
}

impl<'a> PatternContext<'a> {
    /// Bundle the per-run state.
    pub fn new(
        timing: &'a TimingDescription,
        config: &'a SynthesisConfig,
        allocator: &'a mut DeviceAllocator,
        builder: &'a mut LadderBuilder,
    ) -> Self {
        Self {
            timing,
            config,
            allocator,
            builder,
            driven: HashSet::new(),
        }
    }

    /// The first declared input, which starts every latch.
    fn start_input(&self, pattern: PatternKind) -> LadderResult<&'a InputDevice> {
        self.timing
            .inputs
            .first()
            .ok_or_else(|| LadderError::Generation {
                pattern: pattern.to_string(),
                reason: "no inputs declared".to_string(),
            })
    }

    /// Allocate an input, defaulting its comment to `"{name} ({role})"`.
    fn input(&mut self, input: &InputDevice, role: &str) -> LadderResult<String> {
        let comment = if input.comment.is_empty() {
            format!("{} ({role})", input.name)
        } else {
            input.comment.clone()
        };
        Ok(self
            .allocator
            .allocate_input(&input.name, &comment)?
            .address
            .to_string())
    }

    /// Allocate a declared output that no coil drives yet.
    ///
    /// Returns `None` for undeclared names and for outputs that already
    /// have a coil, so no output ends up driven twice.
    fn claim_output(&mut self, name: &str) -> LadderResult<Option<String>> {
        let Some(output) = self.timing.output(name) else {
            warn!(output = name, "action names an undeclared output, skipping");
            return Ok(None);
        };
        if self.driven.contains(name) {
            warn!(output = name, "output already driven, skipping second coil");
            return Ok(None);
        }
        let comment = if output.comment.is_empty() {
            output.name.clone()
        } else {
            output.comment.clone()
        };
        let address = self
            .allocator
            .allocate_output(&output.name, &comment)?
            .address
            .to_string();
        self.driven.insert(name.to_string());
        Ok(Some(address))
    }

    /// Emit the start/stop latch on the first and last inputs.
    ///
    /// Returns the relay device.
    fn latch(&mut self, relay_name: &str, relay_comment: &str) -> LadderResult<String> {
        let timing = self.timing;
        let (Some(start), Some(stop)) = (timing.inputs.first(), timing.inputs.last()) else {
            return Err(LadderError::Generation {
                pattern: PatternKind::SelfHold.to_string(),
                reason: "a latch needs start and stop inputs".to_string(),
            });
        };
        let start_device = self.input(start, "start")?;
        let stop_device = self.input(stop, "stop")?;
        let relay = self
            .allocator
            .allocate_relay(relay_name, relay_comment)?
            .address
            .to_string();
        self.builder.add_self_hold_rung(
            &start_device,
            &stop_device,
            &relay,
            &format!("{} self-hold", start.name),
        )?;
        Ok(relay)
    }

    /// Contact-to-output rungs for every immediate "ON" step fired by
    /// `trigger`.
    fn immediate_outputs(&mut self, trigger: &str, contact: &str) -> LadderResult<usize> {
        let timing = self.timing;
        let mut emitted = 0;
        for step in timing.sequences.iter().filter(|s| s.is_immediate()) {
            let action = step.action_label();
            if step.trigger_label().device != trigger
                || action.is_all()
                || action.intent != Intent::On
            {
                continue;
            }
            if let Some(output) = self.claim_output(&action.device)? {
                self.builder.add_output_rung(
                    contact,
                    &output,
                    &format!("{} output", action.device),
                )?;
                emitted += 1;
            }
        }
        Ok(emitted)
    }

    /// Two equal-period timers in an astable loop driving `output`.
    fn oscillator(
        &mut self,
        enable: &str,
        output: &str,
        timer_prefix: &str,
        seconds: f64,
        label: &str,
    ) -> LadderResult<()> {
        let on = self.allocator.allocate_timer(
            &format!("{timer_prefix}_ON"),
            seconds,
            &format!("flicker on ({label})"),
        )?;
        let off = self.allocator.allocate_timer(
            &format!("{timer_prefix}_OFF"),
            seconds,
            &format!("flicker off ({label})"),
        )?;
        let k_value = on.k_value().unwrap_or(1);
        let t_on = on.address.to_string();
        let t_off = off.address.to_string();

        self.builder
            .rung(format!("flicker on timer ({label})"))
            .contact(enable)
            .nc_contact(&t_off)
            .timer(&t_on, k_value)
            .commit()?;
        self.builder
            .rung(format!("flicker off timer ({label})"))
            .contact(&t_on)
            .timer(&t_off, k_value)
            .commit()?;
        self.builder
            .rung(format!("{label} flicker output"))
            .contact(&t_on)
            .nc_contact(&t_off)
            .coil(output)
            .commit()?;
        Ok(())
    }
}

/// Patterns in priority order.
#[derive(Debug, Clone, Default)]
pub struct PatternRegistry {
    patterns: Vec<Pattern>,
}

impl PatternRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pattern, keeping the list sorted by descending priority.
    pub fn register(&mut self, pattern: Pattern) {
        self.patterns.push(pattern);
        self.patterns
            .sort_by_key(|p| std::cmp::Reverse(p.priority));
    }

    /// Highest-priority pattern that matches.
    #[must_use]
    pub fn find_best(&self, timing: &TimingDescription) -> Option<&Pattern> {
        self.patterns.iter().find(|p| (p.matches)(timing))
    }

    /// Every matching pattern, in priority order.
    #[must_use]
    pub fn find_matching(&self, timing: &TimingDescription) -> Vec<&Pattern> {
        self.patterns.iter().filter(|p| (p.matches)(timing)).collect()
    }

    /// Look up a pattern by kind.
    #[must_use]
    pub fn get(&self, kind: PatternKind) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.kind == kind)
    }

    /// All patterns in priority order.
    #[must_use]
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }
}

/// Registry holding the five built-in idioms.
#[must_use]
pub fn default_registry() -> PatternRegistry {
    let mut registry = PatternRegistry::new();
    registry.register(sequential::PATTERN);
    registry.register(self_hold::PATTERN);
    registry.register(timer_delay::PATTERN);
    registry.register(full_reset::PATTERN);
    registry.register(flicker::PATTERN);
    registry
}
