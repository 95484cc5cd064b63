//! Routing of inbound messages to command handlers.
//!
//! The [`Dispatcher`] takes a batch of messages from the host and, for each
//! message, runs one pass of:
//!
//! ```text
//! filter → extract → resolve alias → authorize → rate-check → invoke
//! ```
//!
//! Messages are handled sequentially in batch order. Every step that stops a
//! message is logged, and refusals send exactly one [`Notice`] to the caller.

use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use mockall::automock;
use regex::Regex;
use serde::Serialize;

use crate::commands::{
    Clock, CommandRegistry, InboundMessage, RateLimitDecision, RateLimiter, Slug,
    authorizer::is_authorized,
    category,
    notice::{format_rate_limited, format_unauthorized},
};

/// Outbound message requested by the core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notice {
    /// Handle of the host account sending the notice
    pub service: String,
    /// Id of the message being answered
    pub reply_to: String,
    pub body: String,
}

/// Sink for outbound notices.
///
/// Implemented by the host. Sending is fire-and-forget: the core never waits
/// for delivery.
#[automock]
pub trait Notifier {
    fn notify(&self, notice: Notice);
}

/// A handler call performed by the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub slug: Slug,
    pub message_id: String,
    pub args: Vec<String>,
}

/// What happened to a message that matched the command pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The handler was invoked
    Invoked(Invocation),
    /// Private command called by a non-operator
    Unauthorized { slug: Slug, caller: String },
    /// The caller exceeded the command's rate limit
    RateLimited {
        slug: Slug,
        caller: String,
        count: u32,
        limit: u32,
        expires_at: DateTime<Utc>,
    },
    /// No command is registered under the resolved slug
    Unresolved { slug: Slug },
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Invoked(invocation) => write!(
                f,
                "invoked slug={} message={} args={:?}",
                invocation.slug, invocation.message_id, invocation.args
            ),
            Outcome::Unauthorized { slug, caller } => {
                write!(f, "unauthorized slug={} caller=@{}", slug, caller)
            }
            Outcome::RateLimited {
                slug,
                caller,
                count,
                limit,
                expires_at,
            } => write!(
                f,
                "rate_limited slug={} caller=@{} count={}/{} expires_at={}",
                slug, caller, count, limit, expires_at
            ),
            Outcome::Unresolved { slug } => write!(f, "unresolved slug={}", slug),
        }
    }
}

pub struct Dispatcher<N: Notifier, C: Clock> {
    registry: Arc<CommandRegistry>,
    rate_limiter: Arc<RateLimiter<C>>,
    notifier: N,
    /// Host handle, used as the notice service and in the pattern
    service: String,
    /// Messages created at or before this instant are ignored
    started_at: DateTime<Utc>,
    /// `^@<handle> ([a-z_]+) (.+)$`, matched line by line
    pattern: Regex,
}

impl<N: Notifier, C: Clock> Dispatcher<N, C> {
    /// Creates a dispatcher answering to `@service`.
    ///
    /// # Errors
    ///
    /// Returns an error if the command pattern cannot be compiled. The handle
    /// is escaped, so this only happens when it exceeds the regex size limit.
    pub fn new(
        service: &str,
        registry: Arc<CommandRegistry>,
        rate_limiter: Arc<RateLimiter<C>>,
        notifier: N,
        started_at: DateTime<Utc>,
    ) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            r"(?m)^@{} ([a-z_]+) (.+)$",
            regex::escape(service)
        ))?;

        Ok(Dispatcher {
            registry,
            rate_limiter,
            notifier,
            service: service.to_owned(),
            started_at,
            pattern,
        })
    }

    /// Dispatches a batch of messages in order.
    ///
    /// Returns one [`Outcome`] per message addressed to the bot. Stale or
    /// non-matching messages are dropped without an outcome.
    pub fn dispatch(&self, messages: &[InboundMessage]) -> Vec<Outcome> {
        messages
            .iter()
            .filter_map(|message| self.dispatch_message(message))
            .collect()
    }

    fn dispatch_message(&self, message: &InboundMessage) -> Option<Outcome> {
        let (slug, args) = self.extract(message)?;
        let slug = self.registry.resolve(&slug);
        let caller = &message.sender.handle;

        if !is_authorized(&self.registry, &slug, &message.sender) {
            let body = format_unauthorized(caller, self.rate_limiter.now());
            self.reply(message, body);
            return Some(Outcome::Unauthorized {
                slug,
                caller: caller.clone(),
            });
        }

        // Commands without a policy never open a window
        if let Some(policy) = self.registry.policy(&slug) {
            let decision = self.rate_limiter.check_and_record(caller, &slug, policy);
            if let RateLimitDecision::Rejected {
                count,
                limit,
                expires_at,
            } = decision
            {
                let now = self.rate_limiter.now();
                self.reply(
                    message,
                    format_rate_limited(caller, count, limit, expires_at, now),
                );
                return Some(Outcome::RateLimited {
                    slug,
                    caller: caller.clone(),
                    count,
                    limit,
                    expires_at,
                });
            }
        }

        let Some(definition) = self.registry.lookup(&slug) else {
            warn!(
                target: category::DISPATCH,
                "no command registered slug={} caller=@{}",
                slug, caller
            );
            return Some(Outcome::Unresolved { slug });
        };

        info!(
            target: category::DISPATCH,
            "slug={} caller=@{} args={:?}",
            slug, caller, args
        );
        (definition.handler)(message, args.as_slice());

        Some(Outcome::Invoked(Invocation {
            slug,
            message_id: message.id.clone(),
            args,
        }))
    }

    /// Extracts the command word and arguments of a fresh, matching message.
    ///
    /// Any line of the body may carry the command; the first one wins and the
    /// arguments stop at the end of that line.
    fn extract(&self, message: &InboundMessage) -> Option<(Slug, Vec<String>)> {
        if message.created <= self.started_at {
            debug!(
                target: category::DISPATCH,
                "ignoring message {} created before startup", message.id
            );
            return None;
        }

        let captures = self.pattern.captures(&message.body)?;
        let slug = Slug::new(&captures[1]);
        let args = captures[2]
            .split_whitespace()
            .map(str::to_owned)
            .collect();

        Some((slug, args))
    }

    fn reply(&self, message: &InboundMessage, body: String) {
        self.notifier.notify(Notice {
            service: self.service.clone(),
            reply_to: message.id.clone(),
            body,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Duration;
    use mockall::predicate::eq;

    use super::*;
    use crate::commands::{
        CommandOptions, Handler, MockClock, Sender,
        rate_limiter::test_clock::{ManualClock, epoch},
    };

    type Calls = Arc<Mutex<Vec<(String, Vec<String>)>>>;

    /// Handler recording every call as (slug, args).
    fn recording(slug: &str, calls: &Calls) -> Handler {
        let slug = slug.to_owned();
        let calls = Arc::clone(calls);
        Arc::new(move |_: &InboundMessage, args: &[String]| {
            calls.lock().unwrap().push((slug.clone(), args.to_vec()));
        })
    }

    fn create_registry(calls: &Calls) -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry
            .define_command("echo".into(), CommandOptions::default(), recording("echo", calls))
            .define_command(
                "ping".into(),
                CommandOptions {
                    private: false,
                    rate_limit: Some(2),
                    rate_limit_reset: Some(1),
                },
                recording("ping", calls),
            )
            .define_command(
                "shutdown".into(),
                CommandOptions {
                    private: true,
                    ..Default::default()
                },
                recording("shutdown", calls),
            )
            .define_alias("p".into(), "ping".into())
            .define_alias("pp".into(), "p".into())
            .define_alias("q".into(), "quit".into());
        registry
    }

    fn fixed_clock() -> MockClock {
        let mut clock = MockClock::new();
        clock.expect_now().return_const(epoch());
        clock
    }

    fn create_dispatcher<N: Notifier, C: Clock>(
        calls: &Calls,
        notifier: N,
        clock: C,
    ) -> Dispatcher<N, C> {
        Dispatcher::new(
            "bot",
            Arc::new(create_registry(calls)),
            Arc::new(RateLimiter::new(clock)),
            notifier,
            epoch() - Duration::minutes(10),
        )
        .unwrap()
    }

    fn message(id: &str, sender: &str, body: &str) -> InboundMessage {
        InboundMessage {
            id: id.to_string(),
            created: epoch() - Duration::minutes(5),
            sender: Sender::new(sender, sender == "bot"),
            body: body.to_string(),
        }
    }

    fn silent_notifier() -> MockNotifier {
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();
        notifier
    }

    #[test]
    fn test_dispatch_public_command() {
        let calls = Calls::default();
        let dispatcher = create_dispatcher(&calls, silent_notifier(), fixed_clock());

        let outcomes = dispatcher.dispatch(&[message("m1", "alice", "@bot echo hello  world")]);

        assert_eq!(
            outcomes,
            vec![Outcome::Invoked(Invocation {
                slug: "echo".into(),
                message_id: "m1".to_string(),
                args: vec!["hello".to_string(), "world".to_string()],
            })]
        );
        assert_eq!(
            *calls.lock().unwrap(),
            vec![("echo".to_string(), vec!["hello".to_string(), "world".to_string()])]
        );
    }

    #[test]
    fn test_dispatch_each_message_exactly_once() {
        let calls = Calls::default();
        let dispatcher = create_dispatcher(&calls, silent_notifier(), fixed_clock());

        let outcomes = dispatcher.dispatch(&[
            message("m1", "alice", "@bot echo one"),
            message("m2", "bob", "@bot echo two"),
            message("m3", "alice", "@bot echo three"),
        ]);

        assert_eq!(outcomes.len(), 3);
        let args: Vec<String> = calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, args)| args.join(" "))
            .collect();
        assert_eq!(args, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_dispatch_alias() {
        let calls = Calls::default();
        let dispatcher = create_dispatcher(&calls, silent_notifier(), fixed_clock());

        dispatcher.dispatch(&[message("m1", "alice", "@bot p hello")]);

        assert_eq!(
            *calls.lock().unwrap(),
            vec![("ping".to_string(), vec!["hello".to_string()])]
        );
    }

    #[test]
    fn test_dispatch_alias_of_alias_is_not_chased() {
        let calls = Calls::default();
        let dispatcher = create_dispatcher(&calls, silent_notifier(), fixed_clock());

        let outcomes = dispatcher.dispatch(&[message("m1", "alice", "@bot pp hello")]);

        assert_eq!(outcomes, vec![Outcome::Unresolved { slug: "p".into() }]);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dispatch_dangling_alias_is_a_silent_noop() {
        let calls = Calls::default();
        let dispatcher = create_dispatcher(&calls, silent_notifier(), fixed_clock());

        let outcomes = dispatcher.dispatch(&[message("m1", "alice", "@bot q now")]);

        assert_eq!(outcomes, vec![Outcome::Unresolved { slug: "quit".into() }]);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dispatch_private_command_from_non_operator() {
        let calls = Calls::default();
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .with(eq(Notice {
                service: "bot".to_string(),
                reply_to: "m1".to_string(),
                body: "@alice this command can only be used by the operator. (2026-01-01 12:00:00 UTC)"
                    .to_string(),
            }))
            .times(1)
            .return_const(());
        let dispatcher = create_dispatcher(&calls, notifier, fixed_clock());

        let outcomes = dispatcher.dispatch(&[message("m1", "alice", "@bot shutdown now")]);

        assert_eq!(
            outcomes,
            vec![Outcome::Unauthorized {
                slug: "shutdown".into(),
                caller: "alice".to_string(),
            }]
        );
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dispatch_private_command_from_operator() {
        let calls = Calls::default();
        let dispatcher = create_dispatcher(&calls, silent_notifier(), fixed_clock());

        dispatcher.dispatch(&[message("m1", "bot", "@bot shutdown now")]);

        assert_eq!(
            *calls.lock().unwrap(),
            vec![("shutdown".to_string(), vec!["now".to_string()])]
        );
    }

    #[test]
    fn test_dispatch_rate_limit() {
        let calls = Calls::default();
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|notice| {
                notice.service == "bot"
                    && notice.body.starts_with("@alice requests are temporarily not accepted.")
                    && notice.body.contains("Limit: 3/2")
            })
            .times(2)
            .return_const(());
        let dispatcher = create_dispatcher(&calls, notifier, fixed_clock());

        let outcomes = dispatcher.dispatch(&[
            message("m1", "alice", "@bot ping a"),
            message("m2", "alice", "@bot ping b"),
            message("m3", "alice", "@bot ping c"),
            message("m4", "alice", "@bot p d"),
        ]);

        let rejected = Outcome::RateLimited {
            slug: "ping".into(),
            caller: "alice".to_string(),
            count: 3,
            limit: 2,
            expires_at: epoch() + Duration::minutes(1),
        };
        assert!(matches!(outcomes[0], Outcome::Invoked(_)));
        assert!(matches!(outcomes[1], Outcome::Invoked(_)));
        assert_eq!(outcomes[2], rejected);
        assert_eq!(outcomes[3], rejected);
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_dispatch_rate_limit_resets_after_window() {
        let calls = Calls::default();
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(1).return_const(());
        let clock = ManualClock::new();
        let dispatcher = create_dispatcher(&calls, notifier, clock.clone());

        dispatcher.dispatch(&[
            message("m1", "alice", "@bot ping a"),
            message("m2", "alice", "@bot ping b"),
            message("m3", "alice", "@bot ping c"),
        ]);
        clock.advance(Duration::minutes(1));
        let outcomes = dispatcher.dispatch(&[message("m4", "alice", "@bot ping d")]);

        assert!(matches!(outcomes[0], Outcome::Invoked(_)));
        assert_eq!(calls.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_dispatch_unauthorized_does_not_count_against_rate_limit() {
        let calls = Calls::default();
        let mut notifier = MockNotifier::new();
        notifier.expect_notify().times(1).return_const(());
        let rate_limiter = Arc::new(RateLimiter::new(fixed_clock()));

        let mut registry = CommandRegistry::new();
        registry.define_command(
            "shutdown".into(),
            CommandOptions {
                private: true,
                rate_limit: Some(1),
                rate_limit_reset: Some(1),
            },
            recording("shutdown", &calls),
        );
        let dispatcher = Dispatcher::new(
            "bot",
            Arc::new(registry),
            Arc::clone(&rate_limiter),
            notifier,
            epoch() - Duration::minutes(10),
        )
        .unwrap();

        dispatcher.dispatch(&[message("m1", "alice", "@bot shutdown now")]);

        assert!(rate_limiter.window("alice", &"shutdown".into()).is_none());
    }

    #[test]
    fn test_dispatch_zero_limit_rejects_every_call() {
        let calls = Calls::default();
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .withf(|notice| notice.body.contains("Limit: 1/0"))
            .times(2)
            .return_const(());

        let mut registry = CommandRegistry::new();
        registry.define_command(
            "vote".into(),
            CommandOptions {
                private: false,
                rate_limit: Some(0),
                rate_limit_reset: Some(1),
            },
            recording("vote", &calls),
        );
        let dispatcher = Dispatcher::new(
            "bot",
            Arc::new(registry),
            Arc::new(RateLimiter::new(fixed_clock())),
            notifier,
            epoch() - Duration::minutes(10),
        )
        .unwrap();

        let outcomes = dispatcher.dispatch(&[
            message("m1", "alice", "@bot vote yes"),
            message("m2", "bob", "@bot vote no"),
        ]);

        assert!(
            outcomes
                .iter()
                .all(|outcome| matches!(outcome, Outcome::RateLimited { limit: 0, .. }))
        );
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_outcome_display() {
        let rate_limited = Outcome::RateLimited {
            slug: "ping".into(),
            caller: "alice".to_string(),
            count: 3,
            limit: 2,
            expires_at: epoch(),
        };
        let unauthorized = Outcome::Unauthorized {
            slug: "shutdown".into(),
            caller: "bob".to_string(),
        };

        assert_eq!(
            rate_limited.to_string(),
            "rate_limited slug=ping caller=@alice count=3/2 expires_at=2026-01-01 12:00:00 UTC"
        );
        assert_eq!(unauthorized.to_string(), "unauthorized slug=shutdown caller=@bob");
        assert_eq!(
            Outcome::Unresolved { slug: "quit".into() }.to_string(),
            "unresolved slug=quit"
        );
    }

    #[test]
    fn test_dispatch_ignores_stale_messages() {
        let calls = Calls::default();
        let dispatcher = create_dispatcher(&calls, silent_notifier(), fixed_clock());

        let mut at_start = message("m1", "alice", "@bot echo hello");
        at_start.created = epoch() - Duration::minutes(10);
        let mut before_start = message("m2", "alice", "@bot echo hello");
        before_start.created = epoch() - Duration::minutes(11);

        assert!(dispatcher.dispatch(&[at_start, before_start]).is_empty());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dispatch_ignores_non_matching_messages() {
        let calls = Calls::default();
        let dispatcher = create_dispatcher(&calls, silent_notifier(), fixed_clock());

        let outcomes = dispatcher.dispatch(&[
            message("m1", "alice", "just chatting"),
            message("m2", "alice", "@bot echo"),
            message("m3", "alice", "@bot Echo hello"),
            message("m4", "alice", "@other echo hello"),
            message("m5", "alice", "hey @bot echo hello"),
            message("m6", "alice", "@botty echo hello"),
            message("m7", "alice", "@bot echo-it hello"),
        ]);

        assert!(outcomes.is_empty());
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dispatch_command_on_any_line() {
        let calls = Calls::default();
        let dispatcher = create_dispatcher(&calls, silent_notifier(), fixed_clock());

        let outcomes = dispatcher.dispatch(&[
            message("m1", "alice", "@bot echo hello\n"),
            message("m2", "alice", "@bot echo hello\nsecond line"),
            message("m3", "alice", "intro\n@bot echo hello"),
            message("m4", "alice", "@bot echo\n@bot echo first\n@bot echo second"),
        ]);

        let ids: Vec<String> = outcomes
            .iter()
            .map(|outcome| match outcome {
                Outcome::Invoked(invocation) => invocation.message_id.clone(),
                other => panic!("unexpected outcome {other:?}"),
            })
            .collect();
        assert_eq!(ids, vec!["m1", "m2", "m3", "m4"]);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                ("echo".to_string(), vec!["hello".to_string()]),
                ("echo".to_string(), vec!["hello".to_string()]),
                ("echo".to_string(), vec!["hello".to_string()]),
                ("echo".to_string(), vec!["first".to_string()]),
            ]
        );
    }

    #[test]
    fn test_dispatch_escapes_handle() {
        let calls = Calls::default();
        let dispatcher = Dispatcher::new(
            "bot.v2",
            Arc::new(create_registry(&calls)),
            Arc::new(RateLimiter::new(fixed_clock())),
            silent_notifier(),
            epoch() - Duration::minutes(10),
        )
        .unwrap();

        assert!(dispatcher.dispatch(&[message("m1", "alice", "@botxv2 echo hi")]).is_empty());
        assert_eq!(
            dispatcher.dispatch(&[message("m2", "alice", "@bot.v2 echo hi")]).len(),
            1
        );
    }
}
