//! Plain-text bodies of the notices and replies sent by the bot.

use chrono::{DateTime, Utc};

use crate::commands::Slug;

/// Refusal sent when a non-operator calls a private command.
///
/// # Examples
///
/// ```text
/// @alice this command can only be used by the operator. (2026-01-01 12:00:00 UTC)
/// ```
pub fn format_unauthorized(handle: &str, now: DateTime<Utc>) -> String {
    format!("@{handle} this command can only be used by the operator. ({now})")
}

/// Refusal sent when a call exceeds its rate limit.
pub fn format_rate_limited(
    handle: &str,
    count: u32,
    limit: u32,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> String {
    format!(
        "@{handle} requests are temporarily not accepted. (Limit: {count}/{limit}, Expires: {expires_at}, Now: {now})"
    )
}

/// Lists the enabled commands and their aliases.
pub fn format_help(handle: &str, commands: &[&Slug], aliases: &[(&Slug, &Slug)]) -> String {
    let commands = commands
        .iter()
        .map(|slug| format!("`{slug}`"))
        .collect::<Vec<String>>()
        .join(", ");

    let mut body = format!("@{handle} commands: {commands}");
    if !aliases.is_empty() {
        let aliases = aliases
            .iter()
            .map(|(alias, target)| format!("`{alias}` → `{target}`"))
            .collect::<Vec<String>>()
            .join(", ");
        body.push_str(&format!(", aliases: {aliases}"));
    }

    body
}

pub fn format_pong(handle: &str) -> String {
    format!("@{handle} pong")
}

pub fn format_echo(handle: &str, args: &[String]) -> String {
    format!("@{handle} {}", args.join(" "))
}

pub fn format_shutdown(handle: &str) -> String {
    format!("@{handle} shutting down")
}
