//! Per-user, per-command rate limiting with expiring windows.
//!
//! Each (user, command) pair owns a [`RateWindow`] opened on the first call and
//! replaced by a fresh one once `now >= expires_at`. Asking whether a call is
//! allowed records it: the counter grows by one on every attempt until it
//! reaches `limit + 1`, and any count above the limit is a rejection.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use mockall::automock;

use crate::commands::{RateLimitPolicy, Slug, category};

/// Source of the current time.
///
/// Abstracted so windows can be expired deterministically in tests.
#[automock]
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock in UTC.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Counting bucket of one (user, command) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateWindow {
    pub expires_at: DateTime<Utc>,
    pub count: u32,
    /// Copied from the policy when the window is opened
    pub limit: u32,
}

impl RateWindow {
    fn open(now: DateTime<Utc>, policy: RateLimitPolicy) -> Self {
        RateWindow {
            expires_at: now + Duration::minutes(i64::from(policy.window_minutes)),
            count: 0,
            limit: policy.max_count,
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Counts one attempt. The counter stops one past the limit.
    fn record(&mut self) {
        if self.count < self.limit.saturating_add(1) {
            self.count += 1;
        }
    }
}

/// Result of [`RateLimiter::check_and_record`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Rejected {
        count: u32,
        limit: u32,
        expires_at: DateTime<Utc>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct WindowKey {
    user: String,
    slug: Slug,
}

impl WindowKey {
    fn new(user: &str, slug: &Slug) -> Self {
        WindowKey {
            user: user.to_owned(),
            slug: slug.clone(),
        }
    }
}

/// Owns every rate window of the process.
///
/// The window table sits behind a single mutex held for the whole
/// read-modify-write of [`RateLimiter::check_and_record`], so concurrent calls
/// for the same key are serialized and never lose an increment.
pub struct RateLimiter<C: Clock> {
    clock: C,
    windows: Mutex<HashMap<WindowKey, RateWindow>>,
}

impl<C: Clock> RateLimiter<C> {
    pub fn new(clock: C) -> Self {
        RateLimiter {
            clock,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Records a call of `slug` by `user` and decides whether it is allowed.
    ///
    /// Only meant for commands that carry a policy. Rejections are logged
    /// with the user, command, counters and expiry.
    pub fn check_and_record(
        &self,
        user: &str,
        slug: &Slug,
        policy: RateLimitPolicy,
    ) -> RateLimitDecision {
        let now = self.clock.now();

        let window = {
            let mut windows = self.lock_windows();
            let window = windows
                .entry(WindowKey::new(user, slug))
                .or_insert_with(|| RateWindow::open(now, policy));
            if window.is_expired(now) {
                *window = RateWindow::open(now, policy);
            }
            window.record();
            *window
        };

        if window.count > window.limit {
            info!(
                target: category::RATE_LIMIT,
                "rejected user=@{} slug={} count={}/{} expires_at={}",
                user, slug, window.count, window.limit, window.expires_at
            );
            return RateLimitDecision::Rejected {
                count: window.count,
                limit: window.limit,
                expires_at: window.expires_at,
            };
        }

        debug!(
            target: category::RATE_LIMIT,
            "allowed user=@{} slug={} count={}/{}",
            user, slug, window.count, window.limit
        );
        RateLimitDecision::Allowed
    }

    /// Returns a copy of the window of `user` for `slug`, expired or not.
    #[cfg(test)]
    pub fn window(&self, user: &str, slug: &Slug) -> Option<RateWindow> {
        self.lock_windows()
            .get(&WindowKey::new(user, slug))
            .copied()
    }

    /// Drops every expired window and returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut windows = self.lock_windows();
        let before = windows.len();
        windows.retain(|_, window| !window.is_expired(now));
        let removed = before - windows.len();

        debug!(
            target: category::RATE_LIMIT,
            "swept {} expired windows, {} remaining",
            removed,
            windows.len()
        );
        removed
    }

    // A panic while holding the lock cannot leave a window half written.
    fn lock_windows(&self) -> MutexGuard<'_, HashMap<WindowKey, RateWindow>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
