//! Background Removal CLI Tool
//!
//! File mode writes a PNG next to the input (or to the given path), stdin
//! mode reads a data URI or a path and prints the resulting data URI.

use crate::{
    adapter::{default_output_path, ImageConversionAdapter},
    config::RemovalConfig,
    remover::SegmentationRemover,
    tracing_config::{events, spans, TracingConfig, TracingFormat, LOG_ENV_VAR},
    types::{ImageInput, ImageOutput},
};
use anyhow::{Context, Result};
use clap::{error::ErrorKind, Parser};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Remove the background from an image
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "remove-bg", arg_required_else_help = true)]
pub struct Cli {
    /// Input image file
    #[arg(value_name = "INPUT_IMAGE", required_unless_present = "stdin")]
    pub input: Option<PathBuf>,

    /// Output PNG file [default: <INPUT_IMAGE stem>_no_bg.png]
    #[arg(value_name = "OUTPUT_IMAGE")]
    pub output: Option<PathBuf>,

    /// Read a base64 data URI from stdin and print the result as a data URI
    #[arg(long, conflicts_with_all = ["input", "output"])]
    pub stdin: bool,

    /// Enable verbose logging (-v: INFO, -vv: DEBUG, -vvv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Log output format (logs are always written to stderr)
    #[arg(long, value_enum, default_value_t = TracingFormat::Console)]
    pub log_format: TracingFormat,
}

/// Parse the process arguments, run and map the outcome to an exit code
#[must_use]
pub fn run() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout, everything else to stderr
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        },
    };

    match execute(&cli) {
        Ok(code) => code,
        Err(e) => {
            events::error_with_context(&*e, "remove-bg");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn execute(cli: &Cli) -> Result<ExitCode> {
    let session_id =
        init_tracing(cli.verbose, cli.log_format).context("Failed to initialize tracing")?;
    let mode = if cli.stdin { "stdin" } else { "file" };
    let _session = spans::session(&session_id, mode).entered();

    let config = RemovalConfig::from_env().context("Invalid configuration")?;
    tracing::debug!(
        backend = %config.backend,
        model_url = %config.model_url,
        offline = !config.auto_download,
        "Configuration loaded"
    );

    let mut adapter = ImageConversionAdapter::new(SegmentationRemover::new(config));

    if cli.stdin {
        return process_stdin(&mut adapter);
    }

    match &cli.input {
        Some(input) => Ok(exit_code(process_file(&mut adapter, input, cli.output.as_deref()))),
        None => anyhow::bail!("An input image or --stdin is required"),
    }
}

fn init_tracing(verbose_count: u8, format: TracingFormat) -> Result<String> {
    let session_id = uuid::Uuid::new_v4().to_string();

    let mut config = TracingConfig::new()
        .with_verbosity(verbose_count)
        .with_format(format)
        .with_session_id(session_id.clone());
    if let Some(filter) = std::env::var(LOG_ENV_VAR).ok().filter(|f| !f.is_empty()) {
        config = config.with_env_filter(filter);
    }
    config.init()?;

    Ok(session_id)
}

/// Process a single image file and report the outcome, `true` on success
fn process_file(
    adapter: &mut ImageConversionAdapter<SegmentationRemover>,
    input_path: &Path,
    output_path: Option<&Path>,
) -> bool {
    if !input_path.exists() {
        eprintln!("Error: Input file '{}' not found.", input_path.display());
        return false;
    }

    let output_path = output_path.map_or_else(|| default_output_path(input_path), Path::to_path_buf);
    tracing::info!(input = %input_path.display(), output = %output_path.display(), "Processing file");

    let input = ImageInput::FilePath(input_path.to_path_buf());
    match adapter.convert(&input, Some(&output_path)) {
        Some(ImageOutput::FileWritten(path)) => {
            println!("Background removed successfully. Output: {}", path.display());
            true
        },
        Some(ImageOutput::DataUri(_)) | None => {
            eprintln!("Failed to remove background.");
            false
        },
    }
}

/// Read an image reference from stdin and print the converted data URI
///
/// Trimmed text starting with `data:image` is a data URI, any other text an
/// image path. Input that is not UTF-8 is treated as raw encoded image bytes.
fn process_stdin(adapter: &mut ImageConversionAdapter<SegmentationRemover>) -> Result<ExitCode> {
    tracing::info!("Reading image from stdin");
    let data = read_stdin()?;

    let input = match String::from_utf8(data) {
        Ok(text) => ImageInput::from(text.trim()),
        Err(e) => {
            tracing::debug!("stdin is not UTF-8, treating it as raw image bytes");
            ImageInput::Bytes(e.into_bytes())
        },
    };

    match adapter.convert(&input, None) {
        Some(ImageOutput::DataUri(uri)) => {
            write_stdout(uri.as_bytes())?;
            Ok(ExitCode::SUCCESS)
        },
        Some(ImageOutput::FileWritten(path)) => {
            tracing::error!(path = %path.display(), "Unexpected file output in stdin mode");
            Ok(ExitCode::FAILURE)
        },
        None => Ok(ExitCode::FAILURE),
    }
}

/// Read all of stdin
fn read_stdin() -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    io::stdin()
        .read_to_end(&mut buffer)
        .context("Failed to read image data from stdin")?;
    Ok(buffer)
}

/// Write a result line to stdout
fn write_stdout(data: &[u8]) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(data)
        .and_then(|()| stdout.write_all(b"\n"))
        .context("Failed to write result to stdout")?;
    stdout.flush().context("Failed to flush stdout")?;
    Ok(())
}
