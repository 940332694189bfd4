//! retrotype - Hybrid static and runtime type inference for Python.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use retrotype::pipeline::{Analyses, BatchResult, Pipeline};
use retrotype::prelude::*;
use retrotype::utils::expand_inputs;

/// Command-line interface for retrotype.
#[derive(Parser, Debug)]
#[command(
    name = "retrotype",
    version,
    about = "Infer types for unannotated Python code, statically and at runtime",
    long_about = None
)]
struct Cli {
    /// Sets the verbosity level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Statically infer variable, parameter and return types
    Infer(CommonArgs),

    /// Report parameters and functions lacking annotations
    Check(CommonArgs),

    /// Execute each file under the runtime tracer
    Trace {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        tracer: TracerArgs,
    },

    /// Run every analyzer and emit one combined report
    Annotate {
        #[command(flatten)]
        common: CommonArgs,

        #[command(flatten)]
        tracer: TracerArgs,
    },
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Python files or directories to analyze
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Args, Debug)]
struct TracerArgs {
    /// Interpreter used to run targets (default: $RETROTYPE_PYTHON, $PYTHON, python3)
    #[arg(long)]
    python: Option<String>,

    /// Kill a traced run after this many seconds; 0 waits indefinitely
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl TracerArgs {
    fn config(&self) -> TracerConfig {
        let mut config = TracerConfig::from_env();
        if let Some(python) = &self.python {
            config = config.with_python(python.as_str());
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout_secs(secs);
        }
        config
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

fn setup_logging(level: &str) {
    let log_level = match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => LevelFilter::Info,
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let (common, analyses, config) = match &cli.command {
        Commands::Infer(common) => {
            (common, Analyses { infer: true, ..Analyses::default() }, TracerConfig::default())
        },
        Commands::Check(common) => {
            (common, Analyses { audit: true, ..Analyses::default() }, TracerConfig::default())
        },
        Commands::Trace { common, tracer } => {
            (common, Analyses { trace: true, ..Analyses::default() }, tracer.config())
        },
        Commands::Annotate { common, tracer } => (common, Analyses::all(), tracer.config()),
    };

    let paths = expand_inputs(&common.paths);
    let result = Pipeline::new(analyses, config).run(&paths);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match common.format {
        Format::Json => {
            let json = serde_json::to_string_pretty(&result).context("serializing report")?;
            writeln!(out, "{}", json)?;
        },
        Format::Text if matches!(cli.command, Commands::Check(_)) => print_audits(&mut out, &result)?,
        Format::Text => print_report(&mut out, &result)?,
    }

    for failure in &result.report.failures {
        eprintln!("{}: {}", failure.path.display(), failure.reason);
    }

    let flagged = result.audits.iter().any(|a| !a.diagnostics.is_empty());
    if matches!(cli.command, Commands::Check(_)) && flagged {
        out.flush()?;
        std::process::exit(1);
    }
    Ok(())
}

fn print_report<W: Write>(out: &mut W, result: &BatchResult) -> anyhow::Result<()> {
    for signature in &result.report.signatures {
        writeln!(out, "{}\n", signature)?;
    }
    result.report.write_table(&mut *out).context("writing report table")?;
    Ok(())
}

fn print_audits<W: Write>(out: &mut W, result: &BatchResult) -> anyhow::Result<()> {
    if result.audits.is_empty() {
        writeln!(out, "No Python files found or all analyses failed.")?;
        return Ok(());
    }
    for r in &result.audits {
        writeln!(out, "{}: functions={}, classes={}", r.path, r.function_count, r.class_count)?;
        for d in &r.diagnostics {
            writeln!(
                out,
                "  {}:{}:{}: {} {}",
                r.path,
                d.line + 1,
                d.column + 1,
                d.severity,
                d.message
            )?;
        }
    }
    Ok(())
}
