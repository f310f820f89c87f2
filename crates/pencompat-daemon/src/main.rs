//! Pencompat - Main entry point
//!
//! Loads the compatibility dataset sources and either prints a view or a
//! diagnostics report, or serves the JSON API and browser page.

mod api;
mod config;
mod render;
mod server;
mod source;
mod state;

use anyhow::{Context, Result};
use clap::Parser;
use pencompat_core::ViewMode;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::render::{diagnostics_report, render, ViewRequest};
use crate::source::SourceLoader;

#[derive(Parser, Debug)]
#[command(name = "pencompat")]
#[command(about = "Tablet and pen compatibility browser")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "pencompat.toml")]
    config: PathBuf,

    /// Dataset source (file path or http(s) URL), repeatable; replaces the configured sources
    #[arg(short, long = "source")]
    sources: Vec<String>,

    /// Bind address for web server
    #[arg(short, long)]
    bind: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Render the view once to stdout and exit
    #[arg(long)]
    print: bool,

    /// Print dataset diagnostics and exit
    #[arg(long, conflicts_with = "print")]
    report: bool,

    /// View mode for --print (grouped, ungrouped, by-pen, by-tablet)
    #[arg(long)]
    view: Option<ViewMode>,

    /// Search query for --print
    #[arg(short, long, default_value = "")]
    query: String,

    /// Show device names for --print
    #[arg(long)]
    names: Option<bool>,

    /// Organize devices by family for --print
    #[arg(long)]
    families: Option<bool>,

    /// List each device on its own line for --print
    #[arg(long)]
    per_line: Option<bool>,

    /// Write a default configuration file to this path and exit
    #[arg(long)]
    init_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Keep stdout clean for --print and --report
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Pencompat v{}", env!("CARGO_PKG_VERSION"));

    if let Some(path) = &args.init_config {
        config::save_default_config(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Wrote default configuration");
        return Ok(());
    }

    // Load configuration
    let mut config = config::load_config(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;

    if !args.sources.is_empty() {
        config.dataset.sources = args.sources.clone();
    }
    if let Some(bind) = args.bind.clone() {
        config.daemon.bind = bind;
    }

    info!(
        sources = config.dataset.sources.len(),
        view = %config.display.view,
        "Configuration loaded"
    );

    if args.print || args.report {
        let loader = SourceLoader::new(&config.dataset.sources, config.dataset.fetch_timeout_secs)?;
        let snapshot = loader.load().await.context("Failed to load dataset")?;

        if args.report {
            print!("{}", diagnostics_report(&snapshot));
        } else {
            let mut options = config.display.format_options();
            if let Some(names) = args.names {
                options.show_names = names;
            }
            if let Some(families) = args.families {
                options.organize_by_family = families;
            }
            if let Some(per_line) = args.per_line {
                options.one_per_line = per_line;
            }
            let request = ViewRequest {
                view: args.view.unwrap_or(config.display.view),
                query: args.query.clone(),
                options,
            };
            let view = render(&snapshot.dataset, &request).context("Invalid search query")?;
            print!("{}", view.to_table());
        }
    } else {
        // Daemon mode - load once and serve
        let state = state::AppState::new(config.clone()).await?;
        server::run(state, &config.daemon.bind).await?;
    }

    Ok(())
}
