//! Shutdown command handler.
//!
//! Acknowledges the request and signals the feed loop to stop. The loop
//! finishes the current batch before exiting.

use std::sync::Arc;

use log::info;
use tokio::sync::Notify;

use crate::{
    commands::{Handler, InboundMessage, notice::format_shutdown},
    host::Outbox,
};

pub fn handle_shutdown(outbox: Outbox, shutdown: Arc<Notify>) -> Handler {
    Arc::new(move |message: &InboundMessage, _args: &[String]| {
        info!("shutdown requested by @{}", message.sender.handle);
        outbox.reply(message, format_shutdown(&message.sender.handle));
        // Stores a permit if the feed loop is not waiting yet
        shutdown.notify_one();
    })
}
