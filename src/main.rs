//! # snerge-search CLI
//!
//! Drives a search page headlessly against a configured endpoint.
//!
//! ## Usage
//!
//! ```bash
//! snerge-search --config ./config/snerge-search.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `snerge-search render <url>` | Load the page at `<url>`, run its search, print the document |
//! | `snerge-search watch <url>` | Feed stdin lines as keystrokes and print each render |
//!
//! In `watch`, every line is treated as the new content of the search box
//! after a keystroke. A line starting with `!` commits the rest immediately.
//!
//! Logs go to stderr; set `RUST_LOG=snerge_search=debug` to see scheduling.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use snerge_search::config::{self, Config};
use snerge_search::controller::{RenderEvent, SearchController};
use snerge_search::page::Page;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Headless driver for the snerge search and prediction pages.
#[derive(Parser)]
#[command(
    name = "snerge-search",
    about = "Debounced search page driver for the snerge predict and search endpoints",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/snerge-search.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a page, run the search carried in its URL, and print the document.
    Render {
        /// Page URL, e.g. `http://localhost:8080/whence/?search=cat`.
        url: String,
    },

    /// Read search-box input from stdin and print results as they render.
    ///
    /// Each line is a keystroke (debounced); a line starting with `!` is a
    /// commit (immediate). Exits at end of input once pending searches finish.
    Watch {
        /// Page URL, e.g. `http://localhost:8080/predict/`.
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Render { url } => run_render(&cfg, &url).await?,
        Commands::Watch { url } => run_watch(&cfg, &url).await?,
    }

    Ok(())
}

async fn run_render(cfg: &Config, url: &str) -> Result<()> {
    let controller = SearchController::from_config(cfg, Page::open(url)?)?;
    controller.initialize();
    controller.wait_idle().await;
    println!("{}", controller.with_page(|page| page.to_html()));
    Ok(())
}

async fn run_watch(cfg: &Config, url: &str) -> Result<()> {
    let controller = SearchController::from_config(cfg, Page::open(url)?)?;
    let mut renders = controller.subscribe_renders();
    controller.initialize();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) => match line.strip_prefix('!') {
                        Some(term) => controller.on_input_changed(term),
                        None => controller.on_keyup(&line),
                    },
                    None => break,
                }
            }
            event = renders.recv() => {
                match event {
                    Ok(event) => print_render(&event),
                    Err(RecvError::Lagged(missed)) => warn!(missed, "output fell behind, skipped renders"),
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    controller.wait_idle().await;
    loop {
        match renders.try_recv() {
            Ok(event) => print_render(&event),
            Err(TryRecvError::Lagged(missed)) => warn!(missed, "output fell behind, skipped renders"),
            Err(_) => break,
        }
    }
    Ok(())
}

fn print_render(event: &RenderEvent) {
    println!("{}\n{}", event.location, event.results.to_html());
}
