//! stream-command - A chat command dispatcher with access control and rate limiting.
//!
//! This is the main entry point of the bot. It reads message batches from
//! stdin, routes commands addressed to the bot handle, and writes replies and
//! refusal notices to stdout.
//!
//! # Overview
//!
//! A message such as `@bot ping hello` is parsed into the command `ping` with
//! the arguments `["hello"]`. Before the command runs:
//!
//! - **Aliases** are resolved, one hop only (`p` → `ping`)
//! - **Private commands** are refused to anyone but the bot account itself
//! - **Rate limits** are enforced per user and per command over expiring windows
//!
//! Messages created before the bot started are ignored, so replaying an old
//! feed never runs commands twice.
//!
//! # Configuration
//!
//! Create a `config.yaml` file:
//!
//! ```yaml
//! host:
//!   handle: "bot"
//!
//! commands:
//!   help: {}
//!   ping:
//!     rate_limit: 2
//!     rate_limit_reset: 1
//!   shutdown:
//!     private: true
//!
//! aliases:
//!   p: ping
//! ```
//!
//! Any value can be overridden with `STREAM_COMMAND_` environment variables,
//! e.g. `STREAM_COMMAND_HOST__HANDLE=bot`.
//!
//! # Usage
//!
//! ```bash
//! echo '{"id":"m1","created":"2030-01-01T00:00:00Z","sender":"alice","body":"@bot ping hi"}' \
//!   | stream-command --config config.yaml
//! ```
//!
//! # Architecture
//!
//! - [`bot`] - Feed loop, notice writer and window sweep tasks
//! - [`commands`] - Registry, rate limiter, authorization, dispatcher and actions
//! - [`config`] - YAML configuration with environment variable overrides
//! - [`host`] - JSON lines feed parsing and notice output
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (default: `info`)
//!   - `stream_command::dispatch`, `stream_command::unauthorized`,
//!     `stream_command::rate_limit` and `stream_command::registry` select
//!     a single category of decision records

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use crate::{bot::Bot, config::Config};

mod bot;
mod commands;
mod config;
mod host;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    ///
    /// See the [`config`] module for the expected format.
    #[arg(short, long)]
    config: String,
}

#[tokio::main]
async fn main() {
    // Put logger at info level by default, on stderr to keep stdout for notices
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::Builder::from_env(env)
        .target(env_logger::Target::Stderr)
        .init();

    info!("Starting stream-command {}...", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config file: {}", e);
            return;
        }
    };

    let bot = match Bot::new(config) {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to initialize bot: {}", e);
            return;
        }
    };

    if let Err(e) = bot.start().await {
        error!("Bot stopped with an error: {}", e);
    }
}
