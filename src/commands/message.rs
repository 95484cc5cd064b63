//! Inbound message records handed over by the host.

use chrono::{DateTime, Utc};

/// Identity of the user who sent a message.
///
/// The host decides who the privileged operator is. The dispatcher only asks
/// [`Sender::is_operator`] and uses the handle for notices and rate-limit keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sender {
    /// Display handle without the leading `@`
    pub handle: String,
    /// Whether the sender is the host account itself
    pub operator: bool,
}

impl Sender {
    pub fn new(handle: &str, operator: bool) -> Self {
        Sender {
            handle: handle.to_owned(),
            operator,
        }
    }

    pub fn is_operator(&self) -> bool {
        self.operator
    }
}

/// A single message from the host's feed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    /// Host identifier of the message, used as the reply target of notices
    pub id: String,
    /// Creation timestamp reported by the host
    pub created: DateTime<Utc>,
    /// Author of the message
    pub sender: Sender,
    /// Raw text body
    pub body: String,
}
