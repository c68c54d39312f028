//! Export of synthesized programs.

use super::common::{synthesize, CAR_WASH, SELF_HOLD};
use ladder_export::{device_comments, render_text, write_csv, CsvOptions};

/// Test writing the car wash spreadsheet.
#[test]
fn test_car_wash_csv() {
    let synthesis = synthesize(CAR_WASH);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("car_wash.csv");
    write_csv(&path, &synthesis.instructions, &CsvOptions::default()).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xFE]);
    let units: Vec<u16> = bytes[2..]
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let text = String::from_utf16(&units).unwrap();

    let rows: Vec<&str> = text.split("\r\n").filter(|r| !r.is_empty()).collect();
    // three header rows, one row per instruction, one extra per timer preset
    let timers = synthesis
        .instructions
        .iter()
        .filter(|i| i.k_value.is_some())
        .count();
    assert_eq!(rows.len(), 3 + synthesis.instructions.len() + timers);
    assert!(rows.last().unwrap().contains("\"END\""));
}

/// Test the device comment table keeps non-ASCII comments.
#[test]
fn test_device_comment_table() {
    let synthesis = synthesize(CAR_WASH);
    let table = device_comments(&synthesis.program.device_map).unwrap();
    assert!(table.starts_with("Device,Comment\n"));
    assert!(table.contains("X0,운전\n"));
    assert!(table.contains("Y10,송풍기\n"));
}

/// Test the ASCII diagram of the self-hold program.
#[test]
fn test_self_hold_diagram() {
    let synthesis = synthesize(SELF_HOLD);
    let text = render_text(&synthesis.program, false);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "|--([ X0] | [ M0])--[/X1]--(M0)--|");
    assert_eq!(lines[2], "|--[ M0]--(Y0)--|");
    assert!(lines.last().unwrap().ends_with("| END"));
}
