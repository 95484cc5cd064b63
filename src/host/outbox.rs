//! Outbound notices written as JSON lines.
//!
//! The [`Outbox`] is the host side of the [`Notifier`] trait. Notices are
//! pushed on an unbounded channel so dispatching never waits on I/O, and a
//! writer task drains the channel into any async writer.

use log::{error, warn};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

use crate::commands::{InboundMessage, Notice, Notifier};

/// Cloneable handle used by the dispatcher and the actions to send notices.
#[derive(Clone)]
pub struct Outbox {
    /// Handle of the host account, stamped on every notice
    service: String,
    sender: UnboundedSender<Notice>,
}

impl Outbox {
    /// Creates an outbox and the receiving end to pass to [`spawn_writer`].
    pub fn new(service: &str) -> (Self, UnboundedReceiver<Notice>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let outbox = Outbox {
            service: service.to_owned(),
            sender,
        };
        (outbox, receiver)
    }

    /// Answers `message` with `body`.
    pub fn reply(&self, message: &InboundMessage, body: String) {
        self.notify(Notice {
            service: self.service.clone(),
            reply_to: message.id.clone(),
            body,
        });
    }
}

impl Notifier for Outbox {
    fn notify(&self, notice: Notice) {
        if self.sender.send(notice).is_err() {
            warn!("outbox is closed, dropping notice");
        }
    }
}

/// Spawns the task writing every notice as one JSON line to `writer`.
///
/// The task ends once every [`Outbox`] clone is dropped and returns the writer.
pub fn spawn_writer<W>(mut receiver: UnboundedReceiver<Notice>, mut writer: W) -> JoinHandle<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(notice) = receiver.recv().await {
            let mut line = match serde_json::to_string(&notice) {
                Ok(line) => line,
                Err(err) => {
                    error!("failed to serialize notice: {err}");
                    continue;
                }
            };
            line.push('\n');

            if let Err(err) = writer.write_all(line.as_bytes()).await {
                error!("failed to write notice: {err}");
                continue;
            }
            if let Err(err) = writer.flush().await {
                error!("failed to flush notices: {err}");
            }
        }
        writer
    })
}
