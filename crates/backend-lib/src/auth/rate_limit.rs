// ============================
// crates/backend-lib/src/auth/rate_limit.rs
// ============================
//! Lockout for clients that keep failing Basic authentication.

use dashmap::DashMap;
use metrics::counter;
use std::net::IpAddr;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::config::RateLimitSettings;
use crate::metrics::AUTH_LOCKED_OUT;

/// Default number of failed attempts before lockout
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default lockout duration (5 minutes)
const DEFAULT_LOCKOUT_DURATION: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
struct RateLimitEntry {
    failed_attempts: u32,
    last_failure: Instant,
    lockout_expiry: Option<Instant>,
}

/// Per-IP failed-attempt counter
#[derive(Debug, Clone)]
pub struct AuthRateLimiter {
    attempts: Arc<DashMap<IpAddr, RateLimitEntry>>,
    max_attempts: u32,
    lockout_duration: Duration,
}

impl Default for AuthRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_LOCKOUT_DURATION)
    }
}

impl AuthRateLimiter {
    pub fn new(max_attempts: u32, lockout_duration: Duration) -> Self {
        Self {
            attempts: Arc::new(DashMap::new()),
            max_attempts,
            lockout_duration,
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(
            settings.max_failed_attempts,
            Duration::from_secs(settings.lockout_secs),
        )
    }

    /// Record a failed attempt. Returns `true` if this attempt triggered a lockout.
    pub fn record_failed_attempt(&self, ip: IpAddr) -> bool {
        let now = Instant::now();

        let mut entry = self.attempts.entry(ip).or_insert_with(|| RateLimitEntry {
            failed_attempts: 0,
            last_failure: now,
            lockout_expiry: None,
        });

        // An expired lockout starts a fresh count
        if entry.lockout_expiry.is_some_and(|expiry| now >= expiry) {
            entry.failed_attempts = 0;
            entry.lockout_expiry = None;
        }

        entry.failed_attempts += 1;
        entry.last_failure = now;

        if entry.failed_attempts >= self.max_attempts && entry.lockout_expiry.is_none() {
            entry.lockout_expiry = Some(now + self.lockout_duration);
            counter!(AUTH_LOCKED_OUT).increment(1);
            tracing::warn!(%ip, attempts = entry.failed_attempts, "client locked out after failed authentication");
            return true;
        }
        false
    }

    /// Forget failures after a successful authentication
    pub fn record_success(&self, ip: IpAddr) {
        self.attempts.remove(&ip);
    }

    /// Whether the IP may attempt authentication now
    pub fn check_rate_limit(&self, ip: IpAddr) -> bool {
        match self.attempts.get(&ip) {
            Some(entry) => !entry
                .lockout_expiry
                .is_some_and(|expiry| Instant::now() < expiry),
            None => true,
        }
    }

    /// Drop expired lockouts, and failure counts idle for a lockout period
    pub fn cleanup(&self) {
        prune(&self.attempts, self.lockout_duration);
    }

    /// Prune the map every `every` on the current runtime. The task ends
    /// once every clone of this limiter has been dropped.
    pub fn spawn_cleanup(&self, every: Duration) -> JoinHandle<()> {
        let attempts = Arc::downgrade(&self.attempts);
        let lockout_duration = self.lockout_duration;
        tokio::spawn(cleanup_task(attempts, lockout_duration, every))
    }

    /// Number of tracked clients
    pub fn tracked(&self) -> usize {
        self.attempts.len()
    }
}

fn prune(attempts: &DashMap<IpAddr, RateLimitEntry>, lockout_duration: Duration) -> usize {
    let before = attempts.len();
    let now = Instant::now();
    attempts.retain(|_, entry| match entry.lockout_expiry {
        Some(expiry) => now < expiry,
        None => now.duration_since(entry.last_failure) < lockout_duration,
    });
    before.saturating_sub(attempts.len())
}

async fn cleanup_task(
    attempts: Weak<DashMap<IpAddr, RateLimitEntry>>,
    lockout_duration: Duration,
    every: Duration,
) {
    let mut ticker = tokio::time::interval(every);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let Some(attempts) = attempts.upgrade() else {
            break;
        };
        let removed = prune(&attempts, lockout_duration);
        if removed > 0 {
            tracing::debug!(removed, remaining = attempts.len(), "pruned rate limit entries");
        }
    }
}
