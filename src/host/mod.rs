//! Standard input/output host.
//!
//! Stands in for the message-processing host the dispatcher is embedded in:
//!
//! - [`feed`] - Reads inbound message batches as JSON lines
//! - [`outbox`] - Writes outbound notices as JSON lines

mod feed;
mod outbox;

pub use crate::host::{
    feed::Feed,
    outbox::{Outbox, spawn_writer},
};
