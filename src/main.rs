// foldersync binary
// CLI parsing, startup validation, and the polling pass loop

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;

use foldersync::logger::LogSink;
use foldersync::sync::{CancelToken, ExcludePatterns, SyncConfig, SyncEngine};

/// One-way folder mirroring on a polling interval.
#[derive(Debug, Parser)]
#[command(name = "foldersync", version, about)]
struct Cli {
    /// Source folder to mirror from
    source: PathBuf,

    /// Replica folder to mirror into (created if absent)
    replica: PathBuf,

    /// Append-only log file recording every copy and delete
    log_file: PathBuf,

    /// Seconds between passes
    #[arg(value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,

    /// Glob pattern to leave out of the mirror (repeatable)
    #[arg(long = "exclude", value_name = "GLOB")]
    exclude: Vec<String>,

    /// Plan and report without touching the filesystem
    #[arg(long)]
    dry_run: bool,

    /// Worker threads for file operations
    #[arg(long, default_value_t = num_cpus::get())]
    workers: usize,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if !cli.source.is_dir() {
        bail!(
            "Source folder does not exist or is not a directory: {}",
            cli.source.display()
        );
    }
    if cli.source == cli.replica {
        bail!("Source and replica must be different folders");
    }

    let patterns: Vec<&str> = cli.exclude.iter().map(String::as_str).collect();
    let exclude = ExcludePatterns::from_patterns(&patterns).context("Invalid exclude pattern")?;

    let sink = LogSink::new(&cli.log_file);
    let config = SyncConfig {
        exclude,
        dry_run: cli.dry_run,
        workers: cli.workers,
    };
    let engine = SyncEngine::with_config(&cli.source, &cli.replica, sink.clone(), config)?;

    println!(
        "Synchronization initiated. Source: {}, Replica: {}",
        cli.source.display().to_string().cyan(),
        cli.replica.display().to_string().cyan()
    );

    let token = CancelToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nSynchronization stopped by user.");
            signal_token.cancel();
        }
    });

    let interval = Duration::from_secs(cli.interval);
    let loop_token = token.clone();
    tokio::task::spawn_blocking(move || run_loop(&engine, interval, &loop_token))
        .await
        .context("Sync loop terminated abnormally")?;

    // Everything queued by the final pass is on disk before exit.
    sink.flush();
    Ok(())
}

/// Pass loop: run, report, sleep. Pass-level failures are reported and the
/// loop continues; only the cancel token stops it.
fn run_loop(engine: &SyncEngine, interval: Duration, token: &CancelToken) {
    while !token.is_cancelled() {
        match engine.run_pass() {
            Ok(stats) => {
                println!(
                    "Synchronization completed at {} ({} copied, {} removed, {} failed, {} ms)",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                    stats.files_copied,
                    stats.files_deleted,
                    stats.files_failed,
                    stats.duration_ms
                );
            }
            Err(err) => {
                eprintln!("{} {:#}", "Error during synchronization:".red(), err);
            }
        }

        if token.wait(interval) {
            break;
        }
    }
}
