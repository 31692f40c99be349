use anyhow::{Context, Result};
use clap::Parser;
use std::process::Command;

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Parser)]
enum Cmd {
    /// Build the malloc uprobe object that `--features ebpf` embeds
    BuildEbpf {
        #[arg(long, default_value = "bpfel-unknown-none")]
        target: String,
        #[arg(long)]
        release: bool,
    },
    /// Build the uprobe, then run a live capture with it
    Live {
        #[arg(long, default_value = "bpfel-unknown-none")]
        target: String,
        /// Extra arguments forwarded to `waterfall live`
        #[arg(last = true)]
        forward: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Cmd::BuildEbpf { target, release } => build_ebpf(&target, release)?,
        Cmd::Live { target, forward } => {
            build_ebpf(&target, true)?;
            run_live(&forward)?;
        }
    }

    Ok(())
}

fn build_ebpf(target: &str, _release: bool) -> Result<()> {
    // Debug builds pull in formatting code the BPF linker rejects, so the
    // object is always built in release mode.
    let mut cmd = Command::new("cargo");
    cmd.arg("+nightly")
        .arg("build")
        .arg("--package")
        .arg("waterfall-ebpf")
        .arg("--target")
        .arg(target)
        .arg("-Z")
        .arg("build-std=core")
        .arg("--release");

    let status = cmd.status().context("Failed to build eBPF program")?;

    if !status.success() {
        anyhow::bail!("Failed to build eBPF program");
    }

    println!("✓ malloc uprobe built");
    println!("  Target: {target}");
    println!("  Profile: release (always)");

    Ok(())
}

fn run_live(forward: &[String]) -> Result<()> {
    let status = Command::new("cargo")
        .args(["run", "--release", "--package", "waterfall", "--features", "ebpf", "--"])
        .args(["live", "--provider", "ebpf"])
        .args(forward)
        .status()
        .context("Failed to launch waterfall")?;

    if !status.success() {
        anyhow::bail!("waterfall exited with {status}");
    }
    Ok(())
}
