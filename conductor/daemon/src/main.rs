//! Output Daemon - Headless Presentation Output Driver
//!
//! Runs an [`OutputConductor`] without any renderer attached. Control
//! commands arrive as newline-delimited JSON on stdin; replies and the
//! transport messages renderers would receive are written as JSON lines to
//! stdout. Logs go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Start with defaults
//! output-daemon
//!
//! # With a show library and config file
//! output-daemon --library shows.json --config ~/.config/output-conductor/conductor.toml
//!
//! # Drive it from a script
//! echo '{"command":"set_output","update":{"layer":"background","value":{"path":"/media/loop.mp4"}}}' \
//!     | output-daemon --library shows.json
//!
//! # Verbose logging
//! RUST_LOG=debug output-daemon
//! ```
//!
//! # Signals
//!
//! - `SIGINT`: Stop reading commands and drain pending effects

mod commands;
mod server;
mod transport;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tracing::{error, info};

use output_core::{
    load_config_from_path, Collaborators, ConfigOverrides, EffectDispatcher, InMemoryShowStore,
    LoggingCollaborators, OutputConductor, ShowLibrary,
};

use server::ControlServer;
use transport::{JsonLineTransport, LineWriter};

/// Output Daemon - drive presentation outputs from JSON commands
#[derive(Parser, Debug)]
#[command(name = "output-daemon")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "OUTPUT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show library (JSON) backing the show store
    #[arg(short = 'L', long, env = "OUTPUT_LIBRARY", value_name = "FILE")]
    library: Option<PathBuf>,

    /// Name of the output created when none exists
    #[arg(long, value_name = "NAME")]
    primary_name: Option<String>,

    /// Keep other audio playing while video backgrounds play
    #[arg(long)]
    keep_audio: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "OUTPUT_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(name) = &self.primary_name {
            overrides = overrides.with_primary_output_name(name.clone());
        }
        if self.keep_audio {
            overrides = overrides.with_mute_audio_when_video_plays(false);
        }
        overrides
    }
}

/// Initialize logging with the specified level
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("output_daemon={level},output_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

/// Load the show library, an empty one when no path is given
async fn load_library(path: Option<&PathBuf>) -> Result<ShowLibrary> {
    let Some(path) = path else {
        info!("No show library given, starting empty");
        return Ok(ShowLibrary::default());
    };

    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read show library: {path:?}"))?;
    let library = ShowLibrary::from_json(&json)
        .with_context(|| format!("Invalid show library: {path:?}"))?;

    info!(
        path = ?path,
        shows = library.shows.len(),
        overlays = library.overlays.len(),
        styles = library.styles.len(),
        "Show library loaded"
    );
    Ok(library)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging first
    init_logging(&args.log_level);

    info!("Output daemon starting");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = args.config.clone().or_else(output_core::default_config_path);
    let mut config =
        load_config_from_path(config_path).context("Failed to load output configuration")?;
    args.overrides().apply(&mut config);
    info!(source = %config.source(), path = ?config.config_file_path, "Configuration loaded");

    let library = load_library(args.library.as_ref()).await?;
    let store = Arc::new(InMemoryShowStore::new(library));

    let writer = Arc::new(LineWriter::new(tokio::io::stdout()));
    let logging = Arc::new(LoggingCollaborators);
    let collaborators = Collaborators::new(
        Arc::new(JsonLineTransport::new(writer.clone())),
        logging.clone(),
        logging.clone(),
        logging,
    );

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let dispatcher = EffectDispatcher::new(collaborators).spawn(rx);
    let conductor = OutputConductor::new(config, store, tx);

    let server = ControlServer::new(conductor, writer);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };
    let result = server.run(BufReader::new(tokio::io::stdin()), shutdown).await;

    // Dropping the conductor closes the event channel once delayed effects
    // have been queued
    info!("Shutting down...");
    drop(server);
    let stats = dispatcher.await.context("Effect dispatcher panicked")?;
    info!(
        delivered = stats.delivered,
        failed = stats.failed,
        "Effects drained"
    );

    match result {
        Ok(session) => {
            info!(
                applied = session.applied,
                rejected = session.rejected,
                "Output daemon stopped cleanly"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Daemon stopped with error");
            Err(e)
        }
    }
}
