//! Bot module wiring the command core to the standard input/output host.
//!
//! The [`Bot`] owns the dispatcher and the services it shares: the command
//! registry, the rate limiter and the outbox.
//!
//! # Architecture
//!
//! The bot runs three concurrent tasks:
//!
//! 1. **Feed Loop**: Reads message batches from stdin and dispatches them in
//!    order until the feed closes or a `shutdown` command is accepted.
//! 2. **Notice Writer**: Writes every outbound notice to stdout as a JSON line.
//! 3. **Sweep Task**: Periodically drops expired rate-limit windows so that
//!    windows of users who never come back do not accumulate.
//!
//! # Command Processing Flow
//!
//! ```text
//! stdin line → Feed → batch → Dispatcher → Handler / Notice → Outbox → stdout
//! ```

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use log::{debug, info, warn};
use tokio::{
    io::{self, AsyncBufReadExt, BufReader},
    sync::{Notify, mpsc::UnboundedReceiver},
    time,
};

use crate::{
    commands::{
        Dispatcher, Notice, RateLimiter, SystemClock, actions::build_registry, category,
    },
    config::Config,
    host::{Feed, Outbox, spawn_writer},
};

/// Main bot structure.
pub struct Bot {
    /// Routes message batches to the registered actions
    dispatcher: Dispatcher<Outbox, SystemClock>,

    /// Shared with the dispatcher, swept by the background task
    rate_limiter: Arc<RateLimiter<SystemClock>>,

    /// Parser of the stdin feed
    feed: Feed,

    /// Receiving end of the outbox, drained by the notice writer
    notices: UnboundedReceiver<Notice>,

    /// Signalled by the `shutdown` action
    shutdown: Arc<Notify>,

    /// Seconds between two sweeps of expired windows
    sweep_interval: u64,
}

impl Bot {
    /// Creates a new Bot from the configuration.
    ///
    /// Registers the enabled actions and aliases, warns about aliases pointing
    /// to unknown commands, and records the start time used to ignore older
    /// messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the command pattern cannot be built from the handle.
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let handle = config.host.handle.clone();
        let (outbox, notices) = Outbox::new(&handle);
        let shutdown = Arc::new(Notify::new());

        let registry = build_registry(&config, &outbox, &shutdown);
        for (alias, target) in registry.dangling_aliases() {
            warn!(
                target: category::REGISTRY,
                "alias {} points to unknown command {}, it will be ignored", alias, target
            );
        }
        info!(
            "registered {} commands for @{}",
            registry.slugs().len(),
            handle
        );

        let rate_limiter = Arc::new(RateLimiter::new(SystemClock));
        let dispatcher = Dispatcher::new(
            &handle,
            Arc::new(registry),
            Arc::clone(&rate_limiter),
            outbox,
            Utc::now(),
        )?;

        Ok(Bot {
            dispatcher,
            rate_limiter,
            feed: Feed::new(&handle),
            notices,
            shutdown,
            sweep_interval: config.host.sweep_interval.max(1),
        })
    }

    /// Runs the bot until stdin is closed or a shutdown is requested.
    ///
    /// Pending notices are flushed before returning.
    ///
    /// # Errors
    ///
    /// Returns an error if reading stdin fails or the notice writer panics.
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let Bot {
            dispatcher,
            rate_limiter,
            feed,
            notices,
            shutdown,
            sweep_interval,
        } = self;

        let writer = spawn_writer(notices, io::stdout());
        Self::start_sweep_task(rate_limiter, sweep_interval);

        info!("reading message batches from stdin");
        let mut lines = BufReader::new(io::stdin()).lines();
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    info!("shutdown requested, stopping");
                    break;
                }
                line = lines.next_line() => match line? {
                    Some(line) => Self::handle_line(&dispatcher, &feed, &line),
                    None => {
                        info!("feed closed, stopping");
                        break;
                    }
                },
            }
        }

        // Dropping the dispatcher drops every outbox, which ends the writer
        drop(dispatcher);
        writer.await?;

        Ok(())
    }

    /// Parses and dispatches one feed line.
    fn handle_line(dispatcher: &Dispatcher<Outbox, SystemClock>, feed: &Feed, line: &str) {
        let batch = match feed.parse_line(line) {
            Ok(batch) => batch,
            Err(err) => {
                warn!("ignoring malformed feed line: {err}");
                return;
            }
        };

        let outcomes = dispatcher.dispatch(&batch);
        debug!(
            "dispatched batch of {} messages, {} commands",
            batch.len(),
            outcomes.len()
        );
        for outcome in &outcomes {
            debug!("{}", outcome);
        }
    }

    /// Starts the task sweeping expired rate-limit windows in the background.
    fn start_sweep_task(rate_limiter: Arc<RateLimiter<SystemClock>>, sweep_interval: u64) {
        tokio::spawn(async move {
            info!(
                "sweeping expired rate-limit windows every {} seconds",
                sweep_interval
            );
            let mut interval = time::interval(Duration::from_secs(sweep_interval));

            loop {
                interval.tick().await;
                rate_limiter.sweep_expired();
            }
        });
    }
}
