//! Fixture loading shared by the acceptance tests.

use ladder_common::TimingDescription;
use ladder_compiler::{Synthesis, Synthesizer};

/// Self-hold lamp.
pub const SELF_HOLD: &str = include_str!("../fixtures/self_hold.json");

/// Cumulative timers off the latch.
pub const CUMULATIVE: &str = include_str!("../fixtures/cumulative.json");

/// Eight-stage car wash with a flicker tail.
pub const CAR_WASH: &str = include_str!("../fixtures/car_wash.json");

/// Parse a fixture.
pub fn timing(fixture: &str) -> TimingDescription {
    serde_json::from_str(fixture).expect("fixture is valid JSON")
}

/// Synthesize a fixture with default settings.
pub fn synthesize(fixture: &str) -> Synthesis {
    Synthesizer::default()
        .synthesize(&timing(fixture))
        .expect("fixture synthesizes")
}

/// IL text split into lines.
pub fn il_lines(synthesis: &Synthesis) -> Vec<String> {
    synthesis
        .instructions
        .iter()
        .map(ToString::to_string)
        .collect()
}
