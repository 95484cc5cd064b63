//! Echo command handler.
//!
//! Repeats the arguments back to the caller, joined by single spaces.

use std::sync::Arc;

use log::debug;

use crate::{
    commands::{Handler, InboundMessage, notice::format_echo},
    host::Outbox,
};

pub fn handle_echo(outbox: Outbox) -> Handler {
    Arc::new(move |message: &InboundMessage, args: &[String]| {
        debug!("handling echo command with {} arguments", args.len());
        outbox.reply(message, format_echo(&message.sender.handle, args));
    })
}
