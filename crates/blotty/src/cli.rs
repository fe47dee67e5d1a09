use std::path::PathBuf;

use blotty_config::ServerConfig;
use clap::{Args as ClapArgs, Parser, Subcommand};

/// blotty: share a terminal over a websocket.
#[derive(Parser, Debug)]
#[command(name = "blotty", version, about)]
pub struct Args {
    /// Log level override (debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve a command over the webtty protocol.
    Serve(ServeArgs),
    /// Play back a session recording.
    Replay(ReplayArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ServeArgs {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable write access for clients.
    #[arg(short, long)]
    pub write: bool,

    /// IP address to listen on.
    #[arg(short, long)]
    pub address: Option<String>,

    /// Port to listen on.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Window title template.
    #[arg(long)]
    pub title_format: Option<String>,

    /// Ask clients to reconnect after this many seconds.
    #[arg(long, value_name = "SECONDS")]
    pub reconnect: Option<u32>,

    /// Fixed terminal columns.
    #[arg(long)]
    pub width: Option<u16>,

    /// Fixed terminal rows.
    #[arg(long)]
    pub height: Option<u16>,

    /// Record every session into this directory.
    #[arg(long, value_name = "DIR")]
    pub record: Option<PathBuf>,

    /// Command to run, followed by its arguments.
    #[arg(
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    pub command: Vec<String>,
}

impl ServeArgs {
    pub fn program(&self) -> &str {
        self.command.first().map(String::as_str).unwrap_or_default()
    }

    pub fn program_args(&self) -> &[String] {
        self.command.get(1..).unwrap_or_default()
    }

    /// Layer flags over the file config.
    pub fn apply(&self, mut config: ServerConfig) -> ServerConfig {
        if self.write {
            config.permit_write = true;
        }
        if let Some(address) = &self.address {
            config.address.clone_from(address);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(format) = &self.title_format {
            config.title_format.clone_from(format);
        }
        if let Some(seconds) = self.reconnect {
            config.reconnect = seconds > 0;
            config.reconnect_time = seconds;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(dir) = &self.record {
            config.record_dir = Some(dir.clone());
        }
        config
    }
}

#[derive(ClapArgs, Debug)]
pub struct ReplayArgs {
    /// Recording file to play.
    pub file: PathBuf,

    /// Playback speed multiplier.
    #[arg(long, default_value_t = 1.0)]
    pub speed: f64,

    /// Ignore recorded timing.
    #[arg(long)]
    pub no_delay: bool,
}

pub fn parse() -> Args {
    Args::parse()
}
