//! # waterfall - Main Entry Point
//!
//! Two operational modes:
//! - **Load** (`waterfall load FILE`): aggregate a recorded dump once, static window
//! - **Live** (`waterfall live`): run a capture and re-aggregate the sliding
//!   window on every tick until Ctrl+C or `--duration`

#![allow(clippy::cast_precision_loss)]

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use waterfall::analysis::{Aggregate, WindowMode};
use waterfall::capture::{CaptureSession, SyntheticConfig, SyntheticProvider, TraceProvider};
use waterfall::cli::{Args, Command, ProviderKind};
use waterfall::config::WaterfallConfig;
use waterfall::domain::SessionError;
use waterfall::export::AggregateExport;
use waterfall::model::WaterfallModel;
use waterfall::source::{CsvSource, DataSource};

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

/// How often the live loop logs a summary line at info level
const STATUS_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct UsageError(String);

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<UsageError>().is_some() {
        return EXIT_USAGE;
    }
    match err.downcast_ref::<SessionError>() {
        Some(SessionError::PermissionDenied(_)) => EXIT_NOPERM,
        _ => EXIT_ERROR,
    }
}

fn display_width(width: usize) -> Result<NonZeroUsize> {
    NonZeroUsize::new(width).ok_or_else(|| UsageError("--width must be at least 1".into()).into())
}

struct RunOptions {
    config: WaterfallConfig,
    duration: u64,
    export: Option<PathBuf>,
    quiet: bool,
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    let quiet = args.quiet;

    match args.command {
        Command::Load { file, width, export } => {
            let options = RunOptions {
                config: WaterfallConfig::default().with_display_width(display_width(width)?),
                duration: 0,
                export,
                quiet,
            };
            let source: DataSource<SyntheticProvider> = DataSource::File(CsvSource::new(file));
            run_source(source, options).await
        }
        Command::Live {
            provider,
            pid,
            libc,
            duration,
            width,
            tick_ms,
            trim_watermark,
            seed,
            export,
        } => {
            if tick_ms == 0 {
                return Err(UsageError("--tick-ms must be at least 1".into()).into());
            }
            let options = RunOptions {
                config: WaterfallConfig::default()
                    .with_display_width(display_width(width)?)
                    .with_tick(Duration::from_millis(tick_ms))
                    .with_trim_watermark(trim_watermark),
                duration,
                export,
                quiet,
            };

            match provider {
                ProviderKind::Synthetic => {
                    let synthetic = SyntheticProvider::new(SyntheticConfig {
                        seed,
                        ..SyntheticConfig::default()
                    });
                    run_source(live_source(synthetic, &options.config), options).await
                }
                ProviderKind::Ebpf => run_ebpf(pid, &libc, options).await,
            }
        }
    }
}

fn live_source<P: TraceProvider>(provider: P, config: &WaterfallConfig) -> DataSource<P> {
    DataSource::Live(CaptureSession::with_trim_watermark(provider, config.trim_watermark))
}

#[cfg(feature = "ebpf")]
async fn run_ebpf(pid: Option<u32>, libc: &str, options: RunOptions) -> Result<()> {
    use waterfall::capture::EbpfProvider;
    use waterfall::domain::Pid;

    let provider = EbpfProvider::new(libc, pid.map(Pid));
    run_source(live_source(provider, &options.config), options).await
}

#[cfg(not(feature = "ebpf"))]
async fn run_ebpf(_pid: Option<u32>, _libc: &str, _options: RunOptions) -> Result<()> {
    Err(UsageError(
        "this build has no eBPF support; rebuild with `--features ebpf` (see `cargo xtask live`)"
            .into(),
    )
    .into())
}

async fn run_source<P: TraceProvider>(source: DataSource<P>, options: RunOptions) -> Result<()> {
    match source {
        DataSource::File(csv) => run_load(&csv, &options),
        DataSource::Live(session) => run_live(&session, options).await,
    }
}

fn run_load(source: &CsvSource, options: &RunOptions) -> Result<()> {
    let width = options.config.display_width;
    let events = source.load_once()?;

    let mut model = WaterfallModel::new(options.config.window_cap_ms);
    model.set_data(events);
    let result = model.refresh(width);

    if !options.quiet {
        print_summary("loaded", &result);
    }
    if let Some(ref export_path) = options.export {
        save_export(&result, model.mode(), width, export_path, options.quiet)?;
    }
    Ok(())
}

async fn run_live<P: TraceProvider>(
    session: &CaptureSession<P>,
    options: RunOptions,
) -> Result<()> {
    let RunOptions { config, duration, export, quiet } = options;

    session.start().context("Failed to start capture")?;

    if !quiet {
        println!("waterfall v{}", env!("CARGO_PKG_VERSION"));
        println!("width: {} buckets, tick: {:?}", config.display_width, config.tick);
        if let Some(ref export_path) = export {
            println!("export: {}", export_path.display());
        }
    }

    let mut model = WaterfallModel::new(config.window_cap_ms);
    model.set_live_mode(true);
    let mut last = Aggregate::default();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(config.tick);

    let capture_start = Instant::now();
    let duration_limit = (duration > 0).then(|| Duration::from_secs(duration));
    let mut status_timer = Instant::now();
    let exit_reason;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut ctrl_c => {
                exit_reason = "interrupted";
                break;
            }
        }

        model.poll(session);
        last = model.refresh(config.display_width);
        debug!(
            "tick t={:.1}ms events={} max_bucket={}",
            model.current_time_ms(),
            last.stats.total_allocations,
            last.stats.max_bucket_count
        );

        if status_timer.elapsed() >= STATUS_INTERVAL {
            let stats = session.stats();
            info!(
                "{} records seen, {} appended, {} filtered, {} undecodable, {} buffered",
                stats.records_seen,
                stats.events_appended,
                stats.records_filtered,
                stats.decode_failures,
                stats.buffered
            );
            status_timer = Instant::now();
        }

        if duration_limit.is_some_and(|limit| capture_start.elapsed() >= limit) {
            exit_reason = "duration limit reached";
            break;
        }
    }

    session.stop();

    if !quiet {
        let stats = session.stats();
        eprintln!(
            "\n{exit_reason}: {:.1}s, {} records \
             ({} appended, {} filtered, {} undecodable, {} trimmed)",
            capture_start.elapsed().as_secs_f64(),
            stats.records_seen,
            stats.events_appended,
            stats.records_filtered,
            stats.decode_failures,
            stats.events_trimmed,
        );
        print_summary("window", &last);
    }

    if let Some(export_path) = export {
        save_export(&last, model.mode(), config.display_width, &export_path, quiet)?;
    }
    Ok(())
}

fn print_summary(label: &str, result: &Aggregate) {
    let stats = &result.stats;
    println!(
        "{label}: {} allocations, {} bytes total, largest {} bytes, densest cell {}",
        stats.total_allocations,
        stats.total_size_bytes,
        stats.max_size_bytes,
        stats.max_bucket_count
    );
    if let Some(window) = result.window {
        println!(
            "span: {:.1}..{:.1} ms ({:.3} ms per column)",
            window.start_ms, window.end_ms, stats.time_bucket_width_ms
        );
    }
}

fn save_export(
    result: &Aggregate,
    mode: WindowMode,
    width: NonZeroUsize,
    path: &Path,
    quiet: bool,
) -> Result<()> {
    AggregateExport::new(result, mode, width.get())
        .write_to_path(path)
        .context("Failed to export aggregate")?;
    if !quiet {
        println!("saved: {}", path.display());
    }
    Ok(())
}

