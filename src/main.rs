use anyhow::{Context as _, Result};
use clap::{Parser, ValueEnum};
use handlehints::config::Options;
use handlehints::driver::Context;
use handlehints::logging::{self, LogFormat, LogLevel, LogOptions};
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Ron,
}

#[derive(Parser, Debug)]
#[command(version, about = "Infers method handle types and memory layouts of a fixture unit")]
struct Args {
    input_file: PathBuf,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// RON file with analysis options.
    #[arg(long)]
    options: Option<PathBuf>,

    /// Byte size of `ADDRESS` layouts.
    #[arg(long)]
    address_size: Option<u64>,

    #[arg(long, value_parser = parse_log_level)]
    log_level: Option<LogLevel>,

    #[arg(long, value_parser = parse_log_format)]
    log_format: Option<LogFormat>,
}

fn parse_log_level(s: &str) -> Result<LogLevel, String> {
    LogLevel::parse(s).ok_or_else(|| format!("Invalid log level '{}'", s))
}

fn parse_log_format(s: &str) -> Result<LogFormat, String> {
    LogFormat::parse(s).ok_or_else(|| format!("Invalid log format '{}'", s))
}

fn main() -> Result<()> {
    let Args {
        input_file,
        format,
        options,
        address_size,
        log_level,
        log_format,
    } = Args::parse();

    logging::init(LogOptions::from_env_with(log_format, log_level));

    let mut options = match options {
        Some(path) => Options::load(&path)?,
        None => Options::default(),
    };

    if address_size.is_some() {
        options.address_size = address_size;
    }

    let source = fs::read_to_string(&input_file)
        .with_context(|| format!("Failed to read {}", input_file.display()))?;

    info!(file = %input_file.display(), ?options, "starting analysis");

    let report = Context::new()
        .report(&source, &options)
        .with_context(|| format!("Failed to analyze {}", input_file.display()))?;

    match format {
        OutputFormat::Text => print!("{}", report),
        OutputFormat::Ron => println!("{}", report.to_ron()?),
    }

    info!(
        bindings = report.bindings.len(),
        diagnostics = report.diagnostics.len(),
        "done"
    );

    Ok(())
}
