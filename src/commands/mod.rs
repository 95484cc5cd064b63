//! Command routing, access control and rate limiting.
//!
//! This module turns messages such as `@bot ping hello` into handler calls.
//!
//! # Architecture
//!
//! ```text
//! InboundMessage batch
//!      │
//!      ▼
//! ┌────────────┐   resolve / lookup   ┌─────────────────┐
//! │ Dispatcher │ ───────────────────► │ CommandRegistry │
//! └────────────┘                      └─────────────────┘
//!      │
//!      ├── is_authorized ──► private command from a non-operator? → Notice
//!      │
//!      ├── RateLimiter::check_and_record ──► over the limit? → Notice
//!      │
//!      ▼
//! Handler(message, args)
//! ```
//!
//! # Logging
//!
//! Decisions are logged under the targets listed in [`category`], with fields
//! rendered as `key=value` pairs. Use `RUST_LOG=stream_command::rate_limit=debug`
//! to follow a single category.
//!
//! # Module Organization
//!
//! - [`registry`] - Command definitions, options and aliases
//! - [`rate_limiter`] - Expiring per-user, per-command windows
//! - [`authorizer`] - Private command check
//! - [`dispatcher`] - Message filtering, extraction and routing
//! - [`notice`] - Notice and reply bodies
//! - [`actions`] - Built-in command handlers

pub mod actions;
mod authorizer;
mod dispatcher;
mod message;
mod notice;
mod rate_limiter;
mod registry;
mod slug;

#[cfg(test)]
pub use crate::commands::rate_limiter::MockClock;
pub use crate::commands::{
    dispatcher::{Dispatcher, Invocation, Notice, Notifier, Outcome},
    message::{InboundMessage, Sender},
    rate_limiter::{Clock, RateLimitDecision, RateLimiter, SystemClock},
    registry::{CommandOptions, CommandRegistry, Handler, RateLimitPolicy},
    slug::Slug,
};

/// Log targets of the structured decision records.
pub mod category {
    /// Every handler invocation and every unresolved command
    pub const DISPATCH: &str = "stream_command::dispatch";
    /// Private commands refused to non-operators
    pub const UNAUTHORIZED: &str = "stream_command::unauthorized";
    /// Rate-limit decisions and window sweeps
    pub const RATE_LIMIT: &str = "stream_command::rate_limit";
    /// Command and alias registration
    pub const REGISTRY: &str = "stream_command::registry";
}
