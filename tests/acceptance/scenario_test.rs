//! Pipeline scenarios.

use super::common::{il_lines, synthesize, timing, CAR_WASH, CUMULATIVE, SELF_HOLD};
use ladder_compiler::patterns::PatternKind;
use ladder_compiler::Synthesizer;

/// Test the self-hold scenario end to end.
#[test]
fn test_self_hold() {
    let synthesis = synthesize(SELF_HOLD);
    assert_eq!(
        il_lines(&synthesis),
        ["LD X0", "OR M0", "ANI X1", "OUT M0", "LD M0", "OUT Y0", "END"]
    );
    assert!(synthesis.diagnostics.is_empty());
    assert_eq!(synthesis.program.detected_patterns, [PatternKind::SelfHold]);
}

/// Test the cumulative timer scenario end to end.
#[test]
fn test_cumulative() {
    let synthesis = synthesize(CUMULATIVE);
    let lines = il_lines(&synthesis);

    assert_eq!(lines[..4], ["LD X0", "OR M0", "ANI X1", "OUT M0"]);
    let position = |needle: &str| {
        lines
            .iter()
            .position(|l| l == needle)
            .unwrap_or_else(|| panic!("{needle} missing from {lines:?}"))
    };
    assert!(position("OUT Y0") < position("OUT T0 K50"));
    assert!(position("OUT T0 K50") < position("OUT Y1"));
    assert!(position("OUT Y1") < position("OUT T1 K100"));
    assert!(position("OUT T1 K100") < position("OUT Y2"));
    assert_eq!(lines.last().map(String::as_str), Some("END"));
    assert!(synthesis.diagnostics.is_empty());
}

/// Test the chained car wash scenario end to end.
#[test]
fn test_car_wash_chain() {
    let synthesis = synthesize(CAR_WASH);
    assert!(synthesis.diagnostics.is_empty(), "{:?}", synthesis.diagnostics);

    // latch + direct RL, two rungs per stage, completion relay,
    // three oscillator rungs and the plain completion output
    let stages = 8;
    assert_eq!(synthesis.program.rungs.len(), 2 + 2 * stages + 1 + 3 + 1);

    let lines = il_lines(&synthesis);
    let presets: Vec<&str> = lines
        .iter()
        .filter(|l| l.starts_with("OUT T"))
        .map(String::as_str)
        .collect();
    assert_eq!(
        presets,
        [
            "OUT T0 K50",
            "OUT T1 K30",
            "OUT T2 K80",
            "OUT T3 K60",
            "OUT T4 K50",
            "OUT T5 K50",
            "OUT T6 K40",
            "OUT T7 K100",
            "OUT T8 K5",
            "OUT T9 K5",
        ]
    );

    let tail = &lines[lines.len() - 13..];
    assert_eq!(
        tail,
        [
            "LD T7", "OUT M1", "LD M1", "ANI T9", "OUT T8 K5", "LD T8", "OUT T9 K5", "LD T8",
            "ANI T9", "OUT Y11", "LD M1", "OUT Y12", "END",
        ]
    );

    let map = &synthesis.program.device_map;
    assert_eq!(map.address_string("BL").as_deref(), Some("Y10"));
    assert_eq!(
        map.get_by_name("PB1").map(|a| a.comment.as_str()),
        Some("운전")
    );
    assert_eq!(
        synthesis.program.detected_patterns,
        [
            PatternKind::SelfHold,
            PatternKind::TimerDelay,
            PatternKind::Sequential
        ]
    );
}

/// Test that no output is driven by more than one coil.
#[test]
fn test_no_double_coils() {
    for fixture in [SELF_HOLD, CUMULATIVE, CAR_WASH] {
        let synthesis = synthesize(fixture);
        let mut coils: Vec<String> = il_lines(&synthesis)
            .into_iter()
            .filter(|l| l.starts_with("OUT Y"))
            .collect();
        let total = coils.len();
        coils.sort();
        coils.dedup();
        assert_eq!(coils.len(), total);
    }
}

/// Test that analysis agrees with the generator's choice.
#[test]
fn test_analysis_matches_selection() {
    let synthesizer = Synthesizer::default();
    for (fixture, expected) in [
        (SELF_HOLD, PatternKind::SelfHold),
        (CUMULATIVE, PatternKind::Sequential),
        (CAR_WASH, PatternKind::Sequential),
    ] {
        let analysis = synthesizer.analyze(&timing(fixture));
        assert_eq!(analysis.detected.first().map(|d| d.kind), Some(expected));
        assert!(analysis.warnings.is_empty(), "{:?}", analysis.warnings);
    }
}

/// Test that synthesis is deterministic across runs.
#[test]
fn test_repeatable_output() {
    let first = synthesize(CAR_WASH);
    let second = synthesize(CAR_WASH);
    assert_eq!(first.instructions.to_text(), second.instructions.to_text());
    assert_eq!(
        serde_json::to_string(&first.program).unwrap(),
        serde_json::to_string(&second.program).unwrap()
    );
}
