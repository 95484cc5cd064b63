//! Built-in command handlers.
//!
//! Each action builds a [`Handler`] replying through the [`Outbox`]. Actions
//! only run once the dispatcher has authorized and rate-checked the call.
//!
//! # Available Actions
//!
//! - [`handle_help`] - List the enabled commands and aliases
//! - [`handle_ping`] - Answer `pong`
//! - [`handle_echo`] - Repeat the arguments
//! - [`handle_shutdown`] - Stop the bot, meant to be registered as private
//!
//! Which actions are enabled, and with which options, comes from the
//! `commands` section of the configuration.

use std::sync::Arc;

use log::warn;
use tokio::sync::Notify;

use crate::{
    commands::{CommandRegistry, Handler, Slug, category},
    config::Config,
    host::Outbox,
};

mod echo;
mod help;
mod ping;
mod shutdown;

pub use crate::commands::actions::{
    echo::handle_echo, help::handle_help, ping::handle_ping, shutdown::handle_shutdown,
};

const ACTIONS: [&str; 4] = ["echo", "help", "ping", "shutdown"];

/// Registers the actions and aliases enabled in `config`.
///
/// Commands without a built-in action are skipped with a warning.
pub fn build_registry(config: &Config, outbox: &Outbox, shutdown: &Arc<Notify>) -> CommandRegistry {
    let enabled: Vec<&Slug> = config
        .commands
        .keys()
        .filter(|slug| ACTIONS.contains(&slug.as_str()))
        .collect();
    let aliases: Vec<(&Slug, &Slug)> = config.aliases.iter().collect();

    let mut registry = CommandRegistry::new();
    for (slug, options) in &config.commands {
        let handler: Handler = match slug.as_str() {
            "echo" => handle_echo(outbox.clone()),
            "help" => handle_help(outbox.clone(), &enabled, &aliases),
            "ping" => handle_ping(outbox.clone()),
            "shutdown" => handle_shutdown(outbox.clone(), Arc::clone(shutdown)),
            _ => {
                warn!(
                    target: category::REGISTRY,
                    "no built-in action for slug={}, skipping", slug
                );
                continue;
            }
        };
        registry.define_command(slug.clone(), *options, handler);
    }

    for (alias, target) in &config.aliases {
        registry.define_alias(alias.clone(), target.clone());
    }

    registry
}
