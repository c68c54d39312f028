//! Integration tests for spreadsheet export and text rendering.

use ladder_common::{InputDevice, OutputDevice, SequenceStep, SynthesisConfig, TimingDescription};
use ladder_compiler::Synthesizer;
use ladder_export::{device_comments, render_text, to_csv, write_csv, CsvOptions};

fn delayed_lamp() -> TimingDescription {
    TimingDescription {
        description: "Lamp on, green lamp after 5 seconds".to_string(),
        inputs: vec![
            InputDevice::new("PB1", "start button"),
            InputDevice::new("PB2", "stop button"),
        ],
        outputs: vec![
            OutputDevice::new("RL", "run lamp"),
            OutputDevice::new("GL", "green lamp"),
        ],
        sequences: vec![
            SequenceStep::immediate("PB1", "RL ON"),
            SequenceStep::delayed("PB1", "GL ON", 5.0),
            SequenceStep::immediate("PB2", "ALL OFF"),
        ],
    }
}

fn decode_utf16le(bytes: &[u8]) -> String {
    assert_eq!(&bytes[..2], &[0xFF, 0xFE], "missing byte-order mark");
    let units: Vec<u16> = bytes[2..]
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).unwrap()
}

/// Test writing the spreadsheet to disk.
#[test]
fn test_write_csv_file() {
    let synthesis = Synthesizer::default().synthesize(&delayed_lamp()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.csv");

    write_csv(&path, &synthesis.instructions, &CsvOptions::default()).unwrap();

    let text = decode_utf16le(&std::fs::read(&path).unwrap());
    assert!(text.ends_with("\r\n"));
    assert!(!text.replace("\r\n", "").contains('\n'));
    assert!(text.contains("\"OUT\"\t\"T0\""));
    assert!(text.contains("\"K50\""));

    // latch 4, RL 2, timer 1 + 4, GL 2
    let last = text.trim_end().lines().last().unwrap();
    assert!(last.starts_with("\"13\"\t\"\"\t\"END\""), "{last}");
}

/// Test that header settings come from configuration.
#[test]
fn test_csv_options_from_config() {
    let config = SynthesisConfig::from_toml(
        r#"
        program_name = "LINE1"

        [export]
        cpu_type = "QCPU (Q mode) Q06UDV"
        "#,
    )
    .unwrap();
    let synthesis = Synthesizer::new(config.clone())
        .synthesize(&delayed_lamp())
        .unwrap();
    let bytes = to_csv(&synthesis.instructions, &CsvOptions::from_config(&config)).unwrap();
    let text = decode_utf16le(&bytes);
    let mut lines = text.split("\r\n");
    assert_eq!(lines.next(), Some("\"LINE1\""));
    assert_eq!(
        lines.next(),
        Some("\"PLC Information:\"\t\"QCPU (Q mode) Q06UDV\"")
    );
}

/// Test the device comment table.
#[test]
fn test_device_comments() {
    let synthesis = Synthesizer::default().synthesize(&delayed_lamp()).unwrap();
    let table = device_comments(&synthesis.program.device_map).unwrap();
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines[0], "Device,Comment");
    assert!(lines.contains(&"X0,start button"));
    assert!(lines.contains(&"Y0,run lamp"));
    assert!(lines.contains(&"T0,5s delay (GL)"));
}

/// Test rendering a synthesized program.
#[test]
fn test_render_synthesized_program() {
    let synthesis = Synthesizer::default().synthesize(&delayed_lamp()).unwrap();
    let text = render_text(&synthesis.program, true);
    assert!(text.contains("|--([ X0] | [ M0])--[/X1]--(M0)--|"));
    assert!(text.contains("|--[ M0]--[T T0 K50]--|"));
    assert!(text.contains("|--[ T0]--(Y1)--|"));
    assert!(text.lines().last().unwrap().ends_with("| END"));
}
