//! Configuration file structures for the stream-command bot.
//!
//! The configuration is read from a YAML file and merged with environment
//! variables prefixed by `STREAM_COMMAND_`, nested keys being separated by `__`.
//!
//! # Configuration File Format
//!
//! ```yaml
//! host:
//!   # Handle of the bot account, commands are written `@bot <command> <args>`
//!   handle: "bot"
//!   # Seconds between two sweeps of expired rate-limit windows
//!   sweep_interval: 300
//!
//! commands:
//!   help: {}
//!   echo: {}
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
//! # Environment Variable Overrides
//!
//! ```bash
//! export STREAM_COMMAND_HOST__HANDLE="bot"
//! export STREAM_COMMAND_HOST__SWEEP_INTERVAL=60
//! ```

use std::collections::BTreeMap;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::Deserialize;

use crate::commands::{CommandOptions, Slug};

/// Default number of seconds between two sweeps of expired windows.
const DEFAULT_SWEEP_INTERVAL: u64 = 300; // 5 minutes

/// Root configuration structure.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Host account settings
    pub host: Host,
    /// Enabled commands and their options, keyed by slug
    #[serde(default)]
    pub commands: BTreeMap<Slug, CommandOptions>,
    /// Alias slug to target slug
    #[serde(default)]
    pub aliases: BTreeMap<Slug, Slug>,
}

/// Host account configuration.
#[derive(Debug, Deserialize)]
pub struct Host {
    /// Handle of the bot account, without the leading `@`.
    ///
    /// Messages must start with `@<handle>` to be treated as commands, and
    /// messages sent by this handle come from the operator.
    pub handle: String,

    /// Seconds between two sweeps of expired rate-limit windows.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: u64,
}

fn default_sweep_interval() -> u64 {
    DEFAULT_SWEEP_INTERVAL
}

impl Config {
    /// Loads the configuration from `path` and the environment.
    ///
    /// Environment variables take precedence over the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or a required field is
    /// missing from both sources.
    pub fn load(path: &str) -> Result<Self, figment::Error> {
        let mut config: Config = Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed("STREAM_COMMAND_").split("__"))
            .extract()?;

        config.host.handle = config.host.handle.trim_start_matches('@').to_owned();
        Ok(config)
    }
}
