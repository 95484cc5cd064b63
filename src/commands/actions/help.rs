//! Help command handler.
//!
//! Lists the commands enabled in the configuration and their aliases. The
//! listing is computed once at registration time.

use std::sync::Arc;

use log::debug;

use crate::{
    commands::{Handler, InboundMessage, Slug, notice::format_help},
    host::Outbox,
};

/// Returns a handler replying with the list of enabled commands.
pub fn handle_help(outbox: Outbox, commands: &[&Slug], aliases: &[(&Slug, &Slug)]) -> Handler {
    let commands: Vec<Slug> = commands.iter().map(|slug| (*slug).clone()).collect();
    let aliases: Vec<(Slug, Slug)> = aliases
        .iter()
        .map(|(alias, target)| ((*alias).clone(), (*target).clone()))
        .collect();

    Arc::new(move |message: &InboundMessage, _args: &[String]| {
        debug!("handling help command");

        let commands: Vec<&Slug> = commands.iter().collect();
        let aliases: Vec<(&Slug, &Slug)> = aliases.iter().map(|(a, t)| (a, t)).collect();
        outbox.reply(
            message,
            format_help(&message.sender.handle, &commands, &aliases),
        );
    })
}
