//! Parsing of the inbound message feed.
//!
//! Each feed line is either one message object or an array of messages, the
//! array forming one batch:
//!
//! ```json
//! {"id": "m1", "created": "2026-01-01T12:00:00Z", "sender": "alice", "body": "@bot ping hi"}
//! [{"id": "m2", ...}, {"id": "m3", ...}]
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::commands::{InboundMessage, Sender};

#[derive(Debug, Deserialize)]
struct FeedMessage {
    id: String,
    created: DateTime<Utc>,
    sender: String,
    body: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeedLine {
    Batch(Vec<FeedMessage>),
    Single(FeedMessage),
}

/// Turns feed lines into message batches.
pub struct Feed {
    /// Handle of the host account, the only operator
    operator: String,
}

impl Feed {
    pub fn new(operator: &str) -> Self {
        Feed {
            operator: operator.to_owned(),
        }
    }

    /// Parses one feed line into a batch. Blank lines yield an empty batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is neither a message nor an array of messages.
    pub fn parse_line(&self, line: &str) -> Result<Vec<InboundMessage>, serde_json::Error> {
        if line.trim().is_empty() {
            return Ok(Vec::new());
        }

        let messages = match serde_json::from_str(line)? {
            FeedLine::Batch(messages) => messages,
            FeedLine::Single(message) => vec![message],
        };

        Ok(messages
            .into_iter()
            .map(|message| self.convert_message(message))
            .collect())
    }

    fn convert_message(&self, message: FeedMessage) -> InboundMessage {
        let handle = message.sender.trim_start_matches('@');
        InboundMessage {
            id: message.id,
            created: message.created,
            sender: Sender::new(handle, handle == self.operator),
            body: message.body,
        }
    }
}
