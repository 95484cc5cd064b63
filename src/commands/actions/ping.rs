//! Ping command handler.

use std::sync::Arc;

use log::debug;

use crate::{
    commands::{Handler, InboundMessage, notice::format_pong},
    host::Outbox,
};

/// Returns a handler answering `pong` to the caller. Arguments are ignored.
pub fn handle_ping(outbox: Outbox) -> Handler {
    Arc::new(move |message: &InboundMessage, _args: &[String]| {
        debug!("handling ping command");
        outbox.reply(message, format_pong(&message.sender.handle));
    })
}
