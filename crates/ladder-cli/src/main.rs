//! `ladder` command-line entry point.
//!
//! Reads timing descriptions (JSON), synthesizes MELSEC-Q ladder programs
//! and writes them as IL text, JSON, an ASCII diagram or a GX Works2 CSV
//! import file.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ladder_common::{SynthesisConfig, TimingDescription};
use ladder_compiler::instructions::InstructionSequence;
use ladder_compiler::ir::LadderProgram;
use ladder_compiler::{validator, Synthesizer};
use ladder_export::CsvOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Ladder synthesis command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "ladder",
    about = "Synthesize MELSEC-Q ladder programs from timing descriptions",
    version,
    long_about = None
)]
struct Args {
    /// Path to a synthesis configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, short = 'l', default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report the control idioms found in a timing description.
    Analyze {
        /// Timing description (JSON).
        timing: PathBuf,
    },
    /// Synthesize a ladder program.
    Generate {
        /// Timing description (JSON).
        timing: PathBuf,

        /// Output format.
        #[arg(long, short = 'f', value_enum, default_value_t = Format::Il)]
        format: Format,

        /// Write to a file instead of stdout.
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// Check an IL program for structural problems.
    Validate {
        /// IL text, one instruction per line.
        program: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Instruction List text.
    Il,
    /// Program, IL and diagnostics as JSON.
    Json,
    /// ASCII ladder diagram followed by the device table.
    Text,
    /// GX Works2 CSV import file (UTF-16LE).
    Csv,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    let config = load_config(&args)?;
    let synthesizer = Synthesizer::new(config);

    match &args.command {
        Command::Analyze { timing } => {
            let timing = read_timing(timing)?;
            let analysis = synthesizer.analyze(&timing);
            let json = serde_json::to_string_pretty(&analysis)?;
            emit(None, json.as_bytes())
        }
        Command::Generate {
            timing,
            format,
            output,
        } => {
            let timing = read_timing(timing)?;
            generate(&synthesizer, &timing, *format, output.as_deref())
        }
        Command::Validate { program } => validate(program),
    }
}

/// Initialize logging with the specified log level.
fn init_logging(level: &str) {
    let filter = format!(
        "ladder={level},ladder_compiler={level},ladder_export={level},ladder_common={level}"
    );

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Resolution priority (first existing file wins):
/// 1. Command-line `--config` argument
/// 2. `LADDER_CONFIG_PATH` environment variable
/// 3. `ladder.toml` in the working directory
/// 4. Built-in defaults
fn load_config(args: &Args) -> Result<SynthesisConfig> {
    if let Some(config_path) = &args.config {
        info!(?config_path, "Loading config from command-line argument");
        return SynthesisConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"));
    }

    if let Ok(env_path) = std::env::var("LADDER_CONFIG_PATH") {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "Loading config from LADDER_CONFIG_PATH");
            return SynthesisConfig::from_file(&config_path).with_context(|| {
                format!("Failed to load config from LADDER_CONFIG_PATH={env_path:?}")
            });
        }
        warn!(
            path = %env_path,
            "LADDER_CONFIG_PATH set but file does not exist, checking other locations"
        );
    }

    let local_path = PathBuf::from("ladder.toml");
    if local_path.exists() {
        info!(?local_path, "Loading config from working directory");
        return SynthesisConfig::from_file(&local_path)
            .with_context(|| format!("Failed to load config from {local_path:?}"));
    }

    info!("No config file found, using built-in defaults");
    Ok(SynthesisConfig::default())
}

fn read_timing(path: &Path) -> Result<TimingDescription> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read timing description {path:?}"))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse timing description {path:?}"))
}

fn generate(
    synthesizer: &Synthesizer,
    timing: &TimingDescription,
    format: Format,
    output: Option<&Path>,
) -> Result<()> {
    let synthesis = synthesizer
        .synthesize(timing)
        .context("Failed to synthesize ladder program")?;
    info!(
        rungs = synthesis.program.rungs.len(),
        instructions = synthesis.instructions.len(),
        "Synthesized program"
    );

    let bytes = match format {
        Format::Il => with_newline(synthesis.instructions.to_text()),
        Format::Json => with_newline(serde_json::to_string_pretty(&synthesis)?),
        Format::Text => with_newline(text_report(&synthesis.program)),
        Format::Csv => {
            let options = CsvOptions::from_config(synthesizer.config());
            ladder_export::to_csv(&synthesis.instructions, &options)
                .context("Failed to build CSV export")?
        }
    };
    emit(output, &bytes)
}

fn text_report(program: &LadderProgram) -> String {
    let diagram = ladder_export::render_text(program, true);
    let devices = ladder_export::render_device_table(&program.device_map);
    if devices.is_empty() {
        return diagram;
    }
    format!("{diagram}\n\nDevices:\n{}", devices.trim_end())
}

fn validate(path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read IL program {path:?}"))?;
    let sequence = InstructionSequence::parse(&text)
        .with_context(|| format!("Failed to parse IL program {path:?}"))?;

    let diagnostics = validator::validate(sequence.instructions());
    if diagnostics.is_empty() {
        println!("OK: {} instructions", sequence.len());
        return Ok(());
    }
    for diagnostic in &diagnostics {
        println!("{diagnostic}");
    }
    bail!("{} validation problem(s) in {path:?}", diagnostics.len())
}

fn with_newline(mut text: String) -> Vec<u8> {
    text.push('\n');
    text.into_bytes()
}

fn emit(output: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, bytes).with_context(|| format!("Failed to write {path:?}"))?;
            info!(?path, bytes = bytes.len(), "Wrote output");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
        }
    }
    Ok(())
}
