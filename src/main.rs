//! skeldraw - replay skeleton frames and commands through the drawing core.
//!
//! Reads one s-expression message per line from a file or stdin and prints
//! one response per message.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use skeldraw::config::AppConfig;
use skeldraw::gesture::Hand;
use skeldraw::ipc::{replay, Session};

#[derive(Parser, Debug)]
#[command(name = "skeldraw", about = "Gesture-driven 3D drawing core")]
struct Cli {
    /// Config plist (s-expression)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Message file to replay (default: stdin)
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Dominant hand: left or right (overrides config)
    #[arg(long)]
    dominant_hand: Option<String>,

    /// Ticks between drawn points (overrides config)
    #[arg(long)]
    frame_delay: Option<u32>,

    /// Also print host events (spawned points, indicators, zoom)
    #[arg(long)]
    events: bool,

    /// Log every message and response to stderr
    #[arg(long)]
    ipc_trace: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                if cli.ipc_trace {
                    "skeldraw=debug".into()
                } else {
                    "skeldraw=info".into()
                }
            }),
        )
        .init();

    info!("skeldraw v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(name) = &cli.dominant_hand {
        match Hand::parse(name) {
            Some(hand) => config.recognizer.dominant_hand = hand,
            None => bail!("unknown hand: {name}. Use: left or right"),
        }
    }
    if let Some(delay) = cli.frame_delay {
        config.machine.frame_delay = delay;
    }
    info!(config = %config.to_sexp(), "effective config");

    let mut session = Session::new(config);
    let stdout = io::stdout();
    let stats = match &cli.replay {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("opening replay {}", path.display()))?;
            replay(&mut session, BufReader::new(file), stdout.lock(), cli.events)
        }
        None => replay(&mut session, io::stdin().lock(), stdout.lock(), cli.events),
    }
    .context("replaying messages")?;

    if cli.ipc_trace {
        info!(status = %session.ctx.status_sexp(), "final state");
    }
    info!(
        messages = stats.messages,
        errors = stats.errors,
        "done"
    );
    Ok(())
}
