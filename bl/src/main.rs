//! Beloader - ordered resource loading queue
//!
//! CLI entry point for running and checking manifests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use beloader::cli::{Cli, Command, get_log_path};
use beloader::{Config, Document, FailMode, FileFetcher, Manifest, QueueReport};

fn setup_logging(log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    let level = match log_level.map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.effective_log_level()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(fail_mode = %config.queue.fail_mode, "Beloader loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Run {
            manifest,
            fail_fast,
            root,
        } => {
            debug!(manifest = %manifest.display(), fail_fast, ?root, "main: matched Run command");
            cmd_run(config, &manifest, fail_fast, root).await
        }
        Command::Check { manifest } => {
            debug!(manifest = %manifest.display(), "main: matched Check command");
            cmd_check(&config, &manifest)
        }
    }
}

/// Directory relative URLs resolve against
fn fetch_root(config: &Config, manifest: &Path, root: Option<PathBuf>) -> PathBuf {
    root.or_else(|| config.fetch.root.clone())
        .unwrap_or_else(|| match manifest.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        })
}

/// Run a manifest to completion
async fn cmd_run(mut config: Config, manifest_path: &Path, fail_fast: bool, root: Option<PathBuf>) -> Result<()> {
    debug!(manifest = %manifest_path.display(), fail_fast, "cmd_run: called");
    let manifest = Manifest::load(manifest_path)?;

    if fail_fast {
        config.queue.fail_mode = FailMode::Fast;
    }
    let root = fetch_root(&config, manifest_path, root);
    info!(root = %root.display(), items = manifest.items.len(), "cmd_run: building queue");

    let document = Document::new();
    let mut queue = manifest
        .build_queue(config.queue.clone(), document.clone(), Arc::new(FileFetcher::new(root)))
        .context("Invalid manifest")?;
    let completion = queue.run().context("Invalid manifest")?;

    let result = completion.wait().await;
    match &result {
        Ok(report) => print_report(report),
        Err(e) => println!("{} {}", "✗".red(), e),
    }

    let markup = document.render().await;
    if !markup.is_empty() {
        println!("\n{}", markup);
    }

    let report = result?;
    let failed = report.failed().count();
    if failed > 0 {
        return Err(eyre::eyre!("{} of {} items failed", failed, report.len()));
    }
    Ok(())
}

fn print_report(report: &QueueReport) {
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(resource) => println!("{} {} ({} bytes)", "✓".green(), outcome.id.cyan(), resource.len()),
            Err(e) => println!("{} {}: {}", "✗".red(), outcome.id.cyan(), e),
        }
    }
}

/// Build a manifest's queue without running it
fn cmd_check(config: &Config, manifest_path: &Path) -> Result<()> {
    debug!(manifest = %manifest_path.display(), "cmd_check: called");
    let manifest = Manifest::load(manifest_path)?;

    let queue = manifest
        .build_queue(config.queue.clone(), Document::new(), Arc::new(FileFetcher::new(".")))
        .and_then(|queue| queue.validate().map(|()| queue));

    match queue {
        Ok(queue) => {
            println!("{} {} items OK", "✓".green(), queue.len());
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            Err(eyre::eyre!("Invalid manifest {}", manifest_path.display()))
        }
    }
}
