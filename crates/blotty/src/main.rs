//! blotty: share a terminal command with browsers over a websocket.
//!
//! `blotty serve` runs the command in a PTY per client and speaks the
//! webtty protocol; `blotty replay` plays back a recorded session.

mod cli;
mod replay;
mod server;
mod signals;
mod title;

use std::sync::Arc;

use blotty_common::BlottyError;
use blotty_config::BlottyConfig;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, ReplayArgs, ServeArgs};
use crate::replay::ReplayOptions;
use crate::server::SessionSettings;

const DEFAULT_LOG_DIRECTIVE: &str = "blotty=info";

#[tokio::main]
async fn main() {
    let args = cli::parse();
    init_tracing(args.log_level.as_deref());

    let result = match args.command {
        Command::Serve(serve) => run_serve(serve).await,
        Command::Replay(replay) => run_replay(replay).await,
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

/// Logs go to stderr so `replay` output on stdout stays clean.
fn init_tracing(log_level: Option<&str>) {
    let directive = log_level.unwrap_or(DEFAULT_LOG_DIRECTIVE);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(""));
    let filter = match directive.parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(e) => {
            eprintln!("invalid log level '{directive}': {e}");
            filter.add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_serve(args: ServeArgs) -> Result<(), BlottyError> {
    tracing::info!("blotty v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = blotty_config::load_config(args.config.as_deref(), |file| BlottyConfig {
        server: args.apply(file.server),
    })?;
    let server_config = config.server;

    let settings = SessionSettings::new(&server_config, args.program(), args.program_args())?;
    if settings.bridge.permit_write {
        tracing::warn!("clients can write to the terminal");
    }

    let addr = server_config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(
        command = %settings.command,
        "blotty listening on {}",
        listener.local_addr()?
    );

    let graceful = CancellationToken::new();
    let force = CancellationToken::new();
    let watcher = tokio::spawn(signals::watch(graceful.clone(), force.clone()));

    server::serve(listener, Arc::new(settings), graceful, force.clone()).await;

    force.cancel();
    watcher.abort();
    tracing::info!("shutdown complete");
    Ok(())
}

async fn run_replay(args: ReplayArgs) -> Result<(), BlottyError> {
    let options = ReplayOptions {
        speed: args.speed,
        no_delay: args.no_delay,
    };
    let mut stdout = tokio::io::stdout();
    let frames = replay::replay(&args.file, &mut stdout, options).await?;
    tracing::info!(frames, "replayed {}", args.file.display());
    Ok(())
}
