//! CLI argument definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "waterfall",
    version,
    about = "Heap allocation waterfall: allocation counts by time and size",
    after_help = "\
EXAMPLES:
    waterfall load allocs.csv                       Aggregate a recorded dump
    waterfall load allocs.csv --export agg.json     ...and write the histogram
    waterfall live --duration 10                    Synthetic live capture
    sudo waterfall live --provider ebpf --pid 1234  Trace malloc in PID 1234"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Aggregate a `timestamp_ms,size_bytes` file once
    Load {
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Horizontal time buckets
        #[arg(short, long, default_value = "800")]
        width: usize,

        /// Write the aggregate as JSON
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
    },

    /// Capture allocations and refresh the waterfall on a timer
    Live {
        /// Event source
        #[arg(long, value_enum, default_value_t = ProviderKind::Synthetic)]
        provider: ProviderKind,

        /// Only trace this process (ebpf provider)
        #[arg(short, long)]
        pid: Option<u32>,

        /// Library whose `malloc` is probed (ebpf provider)
        #[arg(long, default_value = "libc")]
        libc: String,

        /// Stop after N seconds (0 = until Ctrl+C)
        #[arg(long, default_value = "0")]
        duration: u64,

        /// Horizontal time buckets
        #[arg(short, long, default_value = "800")]
        width: usize,

        /// Refresh interval in milliseconds
        #[arg(long, default_value = "50")]
        tick_ms: u64,

        /// Stale events tolerated before the store is trimmed
        #[arg(long, default_value = "524288")]
        trim_watermark: usize,

        /// Seed for the synthetic provider
        #[arg(long, default_value = "24301")]
        seed: u64,

        /// Write the final aggregate as JSON
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// Generated bursty traffic, no privileges needed
    Synthetic,
    /// libc `malloc` uprobe (needs root and the `ebpf` feature)
    Ebpf,
}
