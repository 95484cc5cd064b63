//! Command definitions and the alias table.
//!
//! The [`CommandRegistry`] is filled once at startup through
//! [`CommandRegistry::define_command`] and [`CommandRegistry::define_alias`]
//! and is only read afterwards. It is shared with the dispatcher behind an `Arc`.

use std::{collections::HashMap, fmt, sync::Arc};

use log::{debug, warn};
use serde::Deserialize;

use crate::commands::{InboundMessage, Slug, category};

/// Callable executed when a command is dispatched.
///
/// Receives the triggering message and the whitespace-split arguments. Handlers
/// must not block: long running work is handed off to the runtime.
pub type Handler = Arc<dyn Fn(&InboundMessage, &[String]) + Send + Sync>;

/// Rate-limit policy attached to a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Calls allowed per window
    pub max_count: u32,
    /// Window length in minutes, counted from the first call
    pub window_minutes: u32,
}

/// Registration options of a command, as written in the configuration file.
///
/// # YAML
///
/// ```yaml
/// ping:
///   private: false
///   rate_limit: 2
///   rate_limit_reset: 1
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CommandOptions {
    /// Restrict the command to the operator
    pub private: bool,
    /// Calls allowed per window, requires `rate_limit_reset`
    pub rate_limit: Option<u32>,
    /// Window length in minutes, requires `rate_limit`
    pub rate_limit_reset: Option<u32>,
}

impl CommandOptions {
    /// Returns the rate-limit policy described by these options.
    ///
    /// A policy exists only when both fields are present. Zero values are kept:
    /// a `rate_limit` of 0 rejects every call, a `rate_limit_reset` of 0 opens
    /// a fresh window on every call.
    pub fn policy(&self) -> Option<RateLimitPolicy> {
        match (self.rate_limit, self.rate_limit_reset) {
            (Some(max_count), Some(window_minutes)) => Some(RateLimitPolicy {
                max_count,
                window_minutes,
            }),
            _ => None,
        }
    }

    fn is_partial_policy(&self) -> bool {
        (self.rate_limit.is_some() || self.rate_limit_reset.is_some()) && self.policy().is_none()
    }
}

/// A registered command.
#[derive(Clone)]
pub struct CommandDefinition {
    pub slug: Slug,
    pub handler: Handler,
    pub is_private: bool,
    pub policy: Option<RateLimitPolicy>,
}

impl fmt::Debug for CommandDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("slug", &self.slug)
            .field("is_private", &self.is_private)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Stores command definitions and aliases.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    definitions: HashMap<Slug, CommandDefinition>,
    aliases: HashMap<Slug, Slug>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        CommandRegistry::default()
    }

    /// Inserts the definition for `slug`, replacing any previous one.
    pub fn register(&mut self, slug: Slug, definition: CommandDefinition) {
        if self.definitions.contains_key(&slug) {
            warn!(target: category::REGISTRY, "overwriting command slug={}", slug);
        }
        debug!(
            target: category::REGISTRY,
            "registered command slug={} private={} policy={:?}",
            slug, definition.is_private, definition.policy
        );
        self.definitions.insert(slug, definition);
    }

    /// Maps `alias` to `target`. The target is not required to exist yet.
    pub fn register_alias(&mut self, alias: Slug, target: Slug) {
        debug!(target: category::REGISTRY, "registered alias {} -> {}", alias, target);
        self.aliases.insert(alias, target);
    }

    /// Returns the alias target of `slug`, or `slug` itself.
    ///
    /// Only one hop is followed: an alias pointing at another alias resolves to
    /// that second alias, not to its target.
    pub fn resolve(&self, slug: &Slug) -> Slug {
        self.aliases.get(slug).unwrap_or(slug).clone()
    }

    pub fn lookup(&self, slug: &Slug) -> Option<&CommandDefinition> {
        self.definitions.get(slug)
    }

    /// Builds and registers a command from its options.
    ///
    /// An incomplete rate limit is dropped with a warning and the
    /// command is registered without a policy.
    pub fn define_command(
        &mut self,
        slug: Slug,
        options: CommandOptions,
        handler: Handler,
    ) -> &mut Self {
        if options.is_partial_policy() {
            warn!(
                target: category::REGISTRY,
                "ignoring incomplete rate limit for slug={} rate_limit={:?} rate_limit_reset={:?}",
                slug, options.rate_limit, options.rate_limit_reset
            );
        }

        let definition = CommandDefinition {
            slug: slug.clone(),
            handler,
            is_private: options.private,
            policy: options.policy(),
        };
        self.register(slug, definition);
        self
    }

    pub fn define_alias(&mut self, alias: Slug, target: Slug) -> &mut Self {
        self.register_alias(alias, target);
        self
    }

    /// Whether `slug` names a private command. Unknown slugs are public.
    pub fn is_private(&self, slug: &Slug) -> bool {
        self.lookup(slug).is_some_and(|definition| definition.is_private)
    }

    pub fn policy(&self, slug: &Slug) -> Option<RateLimitPolicy> {
        self.lookup(slug).and_then(|definition| definition.policy)
    }

    /// Registered command slugs, sorted.
    pub fn slugs(&self) -> Vec<&Slug> {
        let mut slugs: Vec<&Slug> = self.definitions.keys().collect();
        slugs.sort();
        slugs
    }

    /// Aliases whose target has no definition, sorted by alias.
    ///
    /// Such aliases silently no-op at dispatch time.
    pub fn dangling_aliases(&self) -> Vec<(&Slug, &Slug)> {
        let mut dangling: Vec<(&Slug, &Slug)> = self
            .aliases
            .iter()
            .filter(|(_, target)| !self.definitions.contains_key(*target))
            .collect();
        dangling.sort();
        dangling
    }
}
