use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use opus_remux::{RemuxStats, Remuxer};

/// Remux an Ogg Opus file into a fast-start MP4 without re-encoding.
#[derive(Parser, Debug)]
#[command(name = "opus-remux", version, about, long_about = None)]
struct Cli {
    /// Ogg Opus input
    source: PathBuf,

    /// MP4 output, replaced if it exists
    destination: PathBuf,

    #[arg(
        long,
        value_enum,
        default_value = "info",
        help = "Log level (error, warn, info, debug, trace)"
    )]
    log_level: LogLevel,

    /// Print stats as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Read and lay out the input without writing the destination
    #[arg(long)]
    dry_run: bool,

    /// Creation time in Unix seconds, for reproducible output
    #[arg(long)]
    creation_time: Option<u64>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn init_tracing(level: LogLevel) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::builder().from_env_lossy()
    } else {
        EnvFilter::builder().parse_lossy(format!("opus_remux={}", level.as_str()))
    };

    let _ = tracing_subscriber::fmt::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
            "%Y-%m-%d %H:%M:%S%.3f".to_string(),
        ))
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level);

    let mut remuxer = Remuxer::new();
    if let Some(secs) = cli.creation_time {
        remuxer = remuxer.with_creation_time(secs);
    }

    let stats = if cli.dry_run {
        remuxer
            .plan_file(&cli.source)
            .with_context(|| format!("failed to read {}", cli.source.display()))?
    } else {
        remuxer
            .remux_file(&cli.source, &cli.destination)
            .with_context(|| {
                format!(
                    "failed to remux {} into {}",
                    cli.source.display(),
                    cli.destination.display()
                )
            })?
    };

    report(&cli, &stats)
}

fn report(cli: &Cli, stats: &RemuxStats) -> Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(stats)?);
        return Ok(());
    }

    if cli.dry_run {
        println!("Dry run, nothing written");
    } else {
        println!("Wrote {}", cli.destination.display());
    }
    println!("   Packets: {}", stats.audio_packets);
    println!("   Channels: {}", stats.channels);
    println!(
        "   Duration: {:.3}s ({} samples, {} pre-skip)",
        stats.playable_secs(),
        stats.playable_duration,
        stats.pre_skip
    );
    println!("   Size: {} bytes (audio at offset {})", stats.bytes_written, stats.data_offset);
    Ok(())
}
