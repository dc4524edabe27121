//! otelwrap CLI: run the instrumented demo and format log events.
//!
//! # Commands
//! ```text
//! otelwrap demo   --x <N> --power <P> [--text] [--minimal] [--level <LEVEL>]
//! otelwrap format [--keys a,b,c] [--ascii] [--sort-keys] [--indent N] < event.json
//! otelwrap info
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use otelwrap_core::{DEFAULT_MAX_DEPTH, MAX_DEPTH_MARKER, UNENCODABLE};
use otelwrap_logging::{
    instrument_logging, shutdown, Instrumentation, LogConfig, TracingConfig, TruncationLimits,
    TRUNCATION_MARKER,
};
use std::path::PathBuf;

mod cmd_format;
mod demo;

#[derive(Parser)]
#[command(
    name = "otelwrap",
    about = "Structured JSON logging with OpenTelemetry trace correlation",
    long_about = "
otelwrap CLI: emit JSON log lines correlated with OpenTelemetry spans.
The demo logs to stderr and prints its result to stdout.
",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute x^power through a chain of instrumented async calls
    Demo {
        /// Base
        #[arg(long, default_value_t = -10, allow_hyphen_values = true)]
        x: i64,
        /// Non-negative exponent
        #[arg(long, default_value_t = 5)]
        power: i64,
        /// Text lines instead of JSON
        #[arg(long)]
        text: bool,
        /// With --text: the compact traceparent layout
        #[arg(long, requires = "text")]
        minimal: bool,
        /// Global log level
        #[arg(long, default_value = "debug")]
        level: String,
        /// Append to this file instead of stderr
        #[arg(long)]
        log_file: Option<PathBuf>,
        /// `service.name` of the emitted spans
        #[arg(long, default_value = "otelwrap-demo")]
        service: String,
    },

    /// Read a JSON event from stdin and print it as a formatted log line
    Format {
        /// Comma-separated attributes to keep, in output order
        #[arg(long, value_delimiter = ',')]
        keys: Vec<String>,
        /// Escape non-ASCII characters
        #[arg(long)]
        ascii: bool,
        /// Sort object keys
        #[arg(long)]
        sort_keys: bool,
        /// Pretty-print with this many spaces
        #[arg(long)]
        indent: Option<usize>,
        /// strftime format for `asctime`
        #[arg(long)]
        datefmt: Option<String>,
    },

    /// Show defaults and output fields
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Demo { x, power, text, minimal, level, log_file, service } => {
            let config = LogConfig {
                level,
                json: !text,
                verbose: !minimal,
                path: log_file,
                tracing: TracingConfig {
                    enabled: true,
                    service_name: service,
                },
                ..LogConfig::default()
            };
            cmd_demo(&config, x, power).await
        }

        Commands::Format { keys, ascii, sort_keys, indent, datefmt } => {
            cmd_format::run(&cmd_format::FormatOptions {
                keys,
                ascii,
                sort_keys,
                indent,
                datefmt,
            })
        }

        Commands::Info => cmd_info(),
    }
}

// ─── demo ─────────────────────────────────────────────────────────────────────

async fn cmd_demo(config: &LogConfig, x: i64, power: i64) -> Result<()> {
    if instrument_logging(config, false)? == Instrumentation::Unchanged {
        tracing::warn!("logging was already instrumented");
    }

    let started = std::time::Instant::now();
    let outcome = demo::exponentiate(x, power).await;
    let elapsed = started.elapsed();

    match &outcome {
        Ok(result) => tracing::info!(x, power, result, "done in {:.3}s", elapsed.as_secs_f64()),
        Err(e) => tracing::error!(x, power, error = %e, "demo failed"),
    }
    shutdown();

    let result = outcome?;
    println!("{x}^{power} = {result}");
    println!("elapsed: {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

// ─── info ─────────────────────────────────────────────────────────────────────

fn cmd_info() -> Result<()> {
    let config = LogConfig::default();
    let limits = TruncationLimits::default();

    println!("otelwrap v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Encoder:");
    println!("  max depth            {DEFAULT_MAX_DEPTH} (deeper nodes become \"{MAX_DEPTH_MARKER}\")");
    println!("  last resort          \"{UNENCODABLE}\"");
    println!();
    println!("Formatter:");
    println!(
        "  truncation           strings over {} chars keep {} + \"{TRUNCATION_MARKER}\"",
        limits.max_chars, limits.keep_chars
    );
    println!("  separators           \", \" and \": \"");
    println!("  timestamps           ISO 8601, local offset");
    println!();
    println!("Logging:");
    println!("  level                {}", config.level);
    println!("  output               {}", if config.json { "JSON lines" } else { "text" });
    println!("  destination          stderr");
    println!("  service.name         {}", config.tracing.service_name);
    println!();
    println!("Fields:");
    println!("  message asctime tz_name tz_utc_offset_seconds name msg args");
    println!("  levelname levelno pathname filename module lineno funcName created");
    println!("  thread threadName process");
    println!("  otelTraceID otelSpanID otelServiceName exc_text + event fields");
    Ok(())
}
