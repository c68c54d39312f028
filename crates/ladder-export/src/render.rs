//! ASCII ladder diagrams.
//!
//! One line per output; every output of a rung repeats the rung's input
//! network.
//!
//! ```text
//! // Rung 0: PB1 self-hold
//! |--([ X0] | [ M0])--[/X1]--(M0)--|
//! ```

use ladder_common::DeviceMap;
use ladder_compiler::ir::{
    Contact, ContactMode, InputSection, LadderProgram, OutputElement, ParallelBranch,
    SeriesConnection, SeriesElement, SetResetOp,
};
use std::fmt::Write as _;

const RAIL_WIDTH: usize = 40;

/// Render every rung of `program`, closing with the END rail.
#[must_use]
pub fn render_text(program: &LadderProgram, show_comments: bool) -> String {
    let mut lines = Vec::new();
    for rung in &program.rungs {
        if show_comments && !rung.comment.is_empty() {
            lines.push(format!("// Rung {}: {}", rung.index, rung.comment));
        }
        let input = render_input(&rung.input);
        for output in &rung.outputs {
            lines.push(format!("|--{input}--{}--|", render_output(output)));
        }
        lines.push(format!("|{}|", " ".repeat(RAIL_WIDTH)));
    }
    lines.push(format!("|{}| END", "=".repeat(RAIL_WIDTH)));
    lines.join("\n")
}

/// Render the device map as an aligned table.
#[must_use]
pub fn render_device_table(device_map: &DeviceMap) -> String {
    let width = device_map
        .iter()
        .map(|a| a.logical_name.chars().count())
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for allocation in device_map.iter() {
        let _ = write!(
            out,
            "{:<6}{:<width$}  {}",
            allocation.address.to_string(),
            allocation.logical_name,
            allocation.comment
        );
        if let Some(k) = allocation.k_value() {
            let _ = write!(out, " K{k}");
        }
        out.push('\n');
    }
    out
}

fn render_input(section: &InputSection) -> String {
    match section {
        InputSection::Series(series) => render_series(series),
        InputSection::Parallel(parallel) => render_parallel(parallel),
    }
}

fn render_series(series: &SeriesConnection) -> String {
    if series.elements.is_empty() {
        return "---".to_string();
    }
    series
        .elements
        .iter()
        .map(|element| match element {
            SeriesElement::Contact(contact) => render_contact(contact),
            SeriesElement::Parallel(parallel) => render_parallel(parallel),
        })
        .collect::<Vec<_>>()
        .join("--")
}

fn render_parallel(parallel: &ParallelBranch) -> String {
    let branches: Vec<String> = parallel.branches.iter().map(render_series).collect();
    format!("({})", branches.join(" | "))
}

fn render_contact(contact: &Contact) -> String {
    match contact.mode {
        ContactMode::NormallyOpen => format!("[ {}]", contact.device),
        ContactMode::NormallyClosed => format!("[/{}]", contact.device),
    }
}

fn render_output(output: &OutputElement) -> String {
    match output {
        OutputElement::Coil { device } => format!("({device})"),
        OutputElement::Timer { device, k_value } => format!("[T {device} K{k_value}]"),
        OutputElement::Counter { device, k_value } => format!("[C {device} K{k_value}]"),
        OutputElement::SetReset { device, op } => match op {
            SetResetOp::Set => format!("(SET {device})"),
            SetResetOp::Reset => format!("(RST {device})"),
        },
        OutputElement::Application { opcode, operands } => {
            format!("[{opcode} {}]", operands.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ladder_compiler::builder::LadderBuilder;

    #[test]
    fn test_self_hold_rung() {
        let mut builder = LadderBuilder::default();
        builder
            .add_self_hold_rung("X0", "X1", "M0", "PB1 self-hold")
            .unwrap();
        let program = builder.build(DeviceMap::default());

        let text = render_text(&program, true);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "// Rung 0: PB1 self-hold");
        assert_eq!(lines[1], "|--([ X0] | [ M0])--[/X1]--(M0)--|");
        assert!(lines[3].ends_with("| END"));
    }

    #[test]
    fn test_device_table_alignment() {
        use ladder_common::{DeviceAddress, DeviceAllocation, DeviceType, TimerConfig};

        let map = DeviceMap {
            allocations: vec![
                DeviceAllocation {
                    logical_name: "PB1".to_string(),
                    address: DeviceAddress::new(DeviceType::X, 0),
                    comment: "start".to_string(),
                    timer: None,
                    counter: None,
                },
                DeviceAllocation {
                    logical_name: "T_GL".to_string(),
                    address: DeviceAddress::new(DeviceType::T, 0),
                    comment: "green lamp delay".to_string(),
                    timer: Some(TimerConfig::from_seconds(5.0, "5s")),
                    counter: None,
                },
            ],
        };
        assert_eq!(
            render_device_table(&map),
            "X0    PB1   start\nT0    T_GL  green lamp delay K50\n"
        );
        assert_eq!(render_device_table(&DeviceMap::default()), "");
    }

    #[test]
    fn test_one_line_per_output() {
        let mut builder = LadderBuilder::default();
        builder
            .rung("fan out")
            .contact("X0")
            .timer("T0", 50)
            .set("M0")
            .application("MOV", ["K100", "D0"])
            .commit()
            .unwrap();
        let program = builder.build(DeviceMap::default());

        let text = render_text(&program, false);
        assert_eq!(
            text.lines().take(3).collect::<Vec<_>>(),
            vec![
                "|--[ X0]--[T T0 K50]--|",
                "|--[ X0]--(SET M0)--|",
                "|--[ X0]--[MOV K100 D0]--|",
            ]
        );
        assert!(!text.contains("//"));
    }
}
