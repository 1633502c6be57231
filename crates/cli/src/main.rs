use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};

use uirb_board::Uirb;
use uirb_config::{
    BoardOptions, BootManifest, BootOptions, ConsoleChannel, RunLimits, StopReason,
};
use uirb_core::board::Board;
use uirb_core::clock::WallClock;
use uirb_core::console::{Console, SerialConsole};
use uirb_core::runtime::{run_bounded, run_forever, RunReport};
use uirb_core::sequencer::BootSequencer;
use uirb_core::BootState;
use uirb_stub::DebugConsole;

const EXIT_OK: u8 = 0;
const EXIT_HALTED: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const REPORT_SCHEMA_VERSION: &str = "1.0";

/// Guard on `--max-beats`: one beat per second, so this is a full day.
const MAX_ALLOWED_BEATS: u64 = 86_400;

#[derive(Parser, Debug)]
#[command(author, version, about = "UIRB boot demo", long_about = None)]
struct Args {
    /// Path to the boot manifest (YAML)
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Attach the debug stub instead of the serial console
    #[arg(long)]
    debug: bool,

    /// Serial baud rate override (the MONITOR_SPEED of the original build)
    #[arg(long)]
    baud: Option<u32>,

    /// EEPROM image path; enables board support (overrides the manifest)
    #[arg(long)]
    eeprom: Option<PathBuf>,

    /// Stop after this many heartbeats instead of looping forever
    #[arg(long)]
    max_beats: Option<u64>,

    /// Wall-clock budget for a bounded run, in milliseconds
    #[arg(long)]
    wall_time_ms: Option<u64>,

    /// Write a JSON run report after a bounded run
    #[arg(long)]
    report: Option<PathBuf>,

    /// Enable verbose boot tracing
    #[arg(short, long)]
    trace: bool,
}

struct PreparedBoot {
    sequencer: BootSequencer,
    limits: Option<RunLimits>,
    eeprom_hash: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.trace {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    // Diagnostics go to stderr; stdout carries only the serial channel.
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let boot = match prepare(&args) {
        Ok(boot) => boot,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    match execute(&args, boot) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

fn resolve_options(args: &Args) -> Result<BootOptions> {
    let mut options = match &args.manifest {
        Some(path) => {
            info!("Loading boot manifest: {:?}", path);
            let manifest = BootManifest::from_file(path)?;
            let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
            BootOptions::from_manifest(&manifest, base_dir)?
        }
        None => {
            info!("Using default boot configuration");
            BootOptions::default()
        }
    };

    if let Some(baud) = args.baud {
        if baud == 0 {
            anyhow::bail!("--baud must be greater than zero");
        }
        if matches!(options.channel, ConsoleChannel::Serial { .. }) {
            options.channel = ConsoleChannel::Serial { baud };
        }
    }

    if args.debug {
        options.channel = ConsoleChannel::Debugger;
    }

    if let Some(path) = &args.eeprom {
        options.board = Some(BoardOptions {
            eeprom_image: path.clone(),
            eeprom_size: None,
        });
    }

    Ok(options)
}

fn prepare(args: &Args) -> Result<PreparedBoot> {
    let options = resolve_options(args)?;

    if args.wall_time_ms.is_some() && args.max_beats.is_none() {
        anyhow::bail!("--wall-time-ms requires --max-beats");
    }
    if args.report.is_some() && args.max_beats.is_none() {
        anyhow::bail!("--report requires --max-beats");
    }

    let limits = args.max_beats.map(|max_beats| RunLimits {
        max_beats,
        wall_time_ms: args.wall_time_ms,
    });
    if let Some(limits) = &limits {
        limits.validate()?;
        if limits.max_beats > MAX_ALLOWED_BEATS {
            anyhow::bail!(
                "--max-beats {} exceeds the allowed maximum of {}",
                limits.max_beats,
                MAX_ALLOWED_BEATS
            );
        }
    }

    let console: Box<dyn Console> = match options.channel {
        ConsoleChannel::Serial { baud } => Box::new(SerialConsole::stdout(baud)),
        ConsoleChannel::Debugger => Box::new(DebugConsole::new()),
    };

    let mut eeprom_hash = None;
    let board: Option<Box<dyn Board>> = match &options.board {
        Some(board_options) => {
            info!(
                "Board support enabled; EEPROM image {:?}",
                board_options.eeprom_image
            );
            eeprom_hash = Some(sha256_file(&board_options.eeprom_image)?);
            let board =
                Uirb::from_image_file(&board_options.eeprom_image, board_options.eeprom_size)?;
            Some(Box::new(board))
        }
        None => None,
    };

    let sequencer = BootSequencer::new(console, board, Box::new(WallClock));
    Ok(PreparedBoot {
        sequencer,
        limits,
        eeprom_hash,
    })
}

fn execute(args: &Args, boot: PreparedBoot) -> Result<ExitCode> {
    let PreparedBoot {
        mut sequencer,
        limits,
        eeprom_hash,
    } = boot;

    match limits {
        Some(limits) => {
            let report = run_bounded(&mut sequencer, &limits)?;
            info!(
                beats = report.beats,
                stop_reason = ?report.stop_reason,
                "Bounded run finished"
            );

            if let Some(path) = &args.report {
                write_report(path, &report, &limits, eeprom_hash, args)?;
            }

            let code = if report.stop_reason == StopReason::Halt {
                EXIT_HALTED
            } else {
                EXIT_OK
            };
            Ok(ExitCode::from(code))
        }
        None => {
            // Device semantics: never returns unless the console fails.
            run_forever(sequencer)?;
            Ok(ExitCode::from(EXIT_OK))
        }
    }
}

#[derive(Debug, Serialize)]
struct BootReport<'a> {
    report_schema_version: &'static str,
    state: BootState,
    beats: u64,
    stop_reason: StopReason,
    limits: &'a RunLimits,
    #[serde(skip_serializing_if = "Option::is_none")]
    eeprom_hash: Option<String>,
    config: ReportConfig<'a>,
}

#[derive(Debug, Serialize)]
struct ReportConfig<'a> {
    manifest: Option<&'a PathBuf>,
    eeprom: Option<&'a PathBuf>,
    debug: bool,
}

fn write_report(
    path: &Path,
    report: &RunReport,
    limits: &RunLimits,
    eeprom_hash: Option<String>,
    args: &Args,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let report = BootReport {
        report_schema_version: REPORT_SCHEMA_VERSION,
        state: report.state,
        beats: report.beats,
        stop_reason: report.stop_reason,
        limits,
        eeprom_hash,
        config: ReportConfig {
            manifest: args.manifest.as_ref(),
            eeprom: args.eeprom.as_ref(),
            debug: args.debug,
        },
    };

    std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
    info!("Run report written to {:?}", path);
    Ok(())
}

fn sha256_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("Failed to read EEPROM image {:?}: {}", path, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}
