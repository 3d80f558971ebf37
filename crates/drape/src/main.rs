//! drape: run one virtual try-on session from the command line.
//!
//! Stages a person image and a garment image, drives the pipeline
//! through every processing stage, and writes the composed result to
//! `<OUT>/virtual-tryon-result.<ext>`. Stage progress is logged through
//! `tracing`; set `RUST_LOG=debug` to see every transition.
//!
//! # Usage
//!
//! ```text
//! cargo run --bin drape -- --person me.png --garment shirt.jpg --out results/
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use drape_io::{
    FileShareTarget, PlaceholderCompositor, Session, SessionConfig, SharePayload,
    download_result, share_result,
};
use drape_pipeline::{CandidateFile, Role, Stage, StepStatus};
use tracing_subscriber::EnvFilter;

/// Run a virtual try-on session over two image files.
///
/// The composition step uses a placeholder backend that returns a flat
/// 400x600 canvas; the session logic around it is the real thing.
#[derive(Parser)]
#[command(name = "drape", version)]
struct Cli {
    /// Photo of the person.
    #[arg(long)]
    person: PathBuf,

    /// Photo of the garment.
    #[arg(long)]
    garment: PathBuf,

    /// Directory the result is written into.
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Wait spent in each processing stage, in milliseconds.
    #[arg(long, default_value_t = duration_ms(SessionConfig::DEFAULT_STAGE_DELAY))]
    stage_delay_ms: u64,

    /// Longest wait for the composition backend, in milliseconds.
    #[arg(long, default_value_t = duration_ms(SessionConfig::DEFAULT_COMPOSITION_TIMEOUT), value_parser = clap::builder::RangedU64ValueParser::<u64>::new().range(1..))]
    composition_timeout_ms: u64,

    /// Extra latency of the placeholder backend, in milliseconds.
    #[arg(long, default_value_t = 0)]
    backend_latency_ms: u64,

    /// Full session config as a JSON string.
    ///
    /// When provided, the timing flags above are ignored.
    #[arg(long)]
    config_json: Option<String>,

    /// Also write a share payload for this page reference to
    /// `<OUT>/share.json`.
    #[arg(long)]
    share_url: Option<String>,

    /// Print the final state summary as JSON on stdout.
    #[arg(long)]
    json: bool,
}

#[allow(clippy::cast_possible_truncation)]
const fn duration_ms(duration: Duration) -> u64 {
    duration.as_millis() as u64
}

/// Build a [`SessionConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual timing flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<SessionConfig, String> {
    if let Some(ref json) = cli.config_json {
        return SessionConfig::from_json(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let config = SessionConfig {
        stage_delay: Duration::from_millis(cli.stage_delay_ms),
        composition_timeout: Duration::from_millis(cli.composition_timeout_ms),
        ..SessionConfig::default()
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Read `path` into a candidate file named after its final component.
fn read_candidate(path: &Path) -> Result<CandidateFile, String> {
    let bytes =
        std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    Ok(CandidateFile::from_name(name, bytes))
}

/// Print the step list the way a progress panel would draw it.
fn print_steps(current: Stage) {
    for stage in Stage::PROCESSING {
        let marker = match stage.status_relative_to(current) {
            StepStatus::Complete => "[x]",
            StepStatus::Current => "[>]",
            StepStatus::Pending => "[ ]",
        };
        eprintln!(
            "{marker} {}. {:<20} {}",
            stage.step_number().unwrap_or_default(),
            stage.label(),
            stage.description(),
        );
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let compositor =
        PlaceholderCompositor::with_latency(Duration::from_millis(cli.backend_latency_ms));
    let session = Session::new(config, std::sync::Arc::new(compositor));

    for (role, path) in [(Role::Person, &cli.person), (Role::Garment, &cli.garment)] {
        let file = match read_candidate(path) {
            Ok(file) => file,
            Err(msg) => {
                eprintln!("{msg}");
                return ExitCode::FAILURE;
            }
        };
        let mime_type = file.mime_type.clone();
        if session.submit(role, file).is_none() {
            eprintln!(
                "{} is not an image ({mime_type}); the {role} slot stays empty",
                path.display()
            );
        }
    }

    let Some(run) = session.start() else {
        eprintln!("Both a person image and a garment image are required");
        return ExitCode::FAILURE;
    };
    let state = run.wait().await;
    print_steps(state.stage());

    if cli.json {
        match serde_json::to_string_pretty(&state.summary()) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing summary: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    if let Some(failure) = state.failure() {
        eprintln!("Try-on failed: {failure}");
        return ExitCode::FAILURE;
    }

    match download_result(&state, &cli.out).await {
        Ok(path) => eprintln!("Result written to {}", path.display()),
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    }

    if let Some(url) = cli.share_url {
        let target = FileShareTarget::new(cli.out.join("share.json"));
        if share_result(&target, &SharePayload::for_page(url)).await {
            eprintln!("Share payload written to {}", target.path().display());
        }
    }

    ExitCode::SUCCESS
}
