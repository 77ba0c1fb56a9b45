//! CLI binary for scout.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use scout::{RunOptions, Scout, ScoutConfig};
use scout_search::ProgressEvent;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Scout: adaptive, rate-aware profile discovery.
#[derive(Parser)]
#[command(name = "scout", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Run every phase and export accepted profiles.
    Run {
        /// Output directory, overriding the configured one.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the phase plan and exit without issuing requests.
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the phase plan.
    Plan,

    /// Check that the session returns search results.
    Check {
        /// Probe terms; defaults to the configured probe terms.
        terms: Vec<String>,
    },

    /// Write a default configuration file.
    InitConfig {
        /// Destination; defaults to the standard config path.
        path: Option<PathBuf>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("scout=info,scout_search=info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Command::Run { dry_run: true, .. } | Command::Plan => print_plan(&load(config_path)?),
        Command::Run { output, .. } => run(&load(config_path)?, output).await,
        Command::Check { terms } => check(&load(config_path)?, &terms).await,
        Command::InitConfig { path, force } => init_config(path, force),
    }
}

fn load(path: Option<&Path>) -> anyhow::Result<Scout> {
    let config = ScoutConfig::load(path).context("failed to load config")?;
    Scout::new(config).context("invalid configuration")
}

fn print_plan(scout: &Scout) -> anyhow::Result<()> {
    let plan = scout.plan().context("failed to build phase plan")?;
    let total: usize = plan.iter().map(|p| p.term_count).sum();
    for phase in &plan {
        println!("{phase}");
    }
    println!("{total} terms in {} phases", plan.len());
    Ok(())
}

async fn check(scout: &Scout, terms: &[String]) -> anyhow::Result<()> {
    if scout.check(terms).await.context("session check failed")? {
        println!("Session OK: search returned results.");
        Ok(())
    } else {
        anyhow::bail!("no probe term returned results; check the session credential")
    }
}

async fn run(scout: &Scout, output: Option<PathBuf>) -> anyhow::Result<()> {
    let total_terms: usize = scout.plan()?.iter().map(|p| p.term_count).sum();

    // Handle Ctrl+C
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, finishing current request...");
            cancel_clone.cancel();
        }
    });

    let pb = progress_bar(total_terms as u64);
    let bar = pb.clone();
    let options = RunOptions {
        output_dir: output,
        cancel,
        progress: Some(Box::new(move |event| on_progress(&bar, event))),
    };

    let outcome = scout.run(options).await;
    pb.finish_and_clear();
    let outcome = outcome.context("run failed")?;

    println!("{}", outcome.report);
    if outcome.report.cancelled {
        println!("Run cancelled; results so far were exported.");
    }
    for path in &outcome.exported {
        println!("Wrote {path}");
    }
    Ok(())
}

fn progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} {prefix:>10} [{bar:30.green/dim}] {pos}/{len} {msg}",
    ) {
        pb.set_style(style.progress_chars("█▓░"));
    }
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn on_progress(pb: &ProgressBar, event: ProgressEvent) {
    match event {
        ProgressEvent::PhaseStarted { name, .. } => pb.set_prefix(name),
        ProgressEvent::TermFinished {
            origin_label,
            accepted_total,
            ..
        } => {
            pb.inc(1);
            pb.set_message(format!("{accepted_total} accepted, last: {origin_label}"));
        }
        ProgressEvent::ProfileAccepted { identity, .. } => {
            pb.println(format!("  + {identity}"));
        }
        ProgressEvent::Cooldown { remaining } => {
            pb.set_message(format!("rate limited, cooling down {}s", remaining.as_secs()));
        }
        ProgressEvent::Pausing { duration } => {
            pb.set_message(format!("pausing {}s between phases", duration.as_secs()));
        }
        ProgressEvent::PhaseFinished { .. } => {}
    }
}

fn init_config(path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(ScoutConfig::default_config_path);
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    ScoutConfig::default()
        .save_to_file(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}
