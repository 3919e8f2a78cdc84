//! Per-client rate limiting with suspicion escalation.
//!
//! DESIGN
//! ======
//! One fixed window per (endpoint, client identifier). Alongside the window
//! counter each entry carries a suspicion score over a sliding hour, kept as
//! one timestamp per point so old points fall off individually:
//! - every inbound call adds 1, a compliant success takes the newest point back
//! - denylist hits add [`SECURITY_PENALTY`]
//! - score above the soft threshold: denied for one full suspicion window
//!   from the moment the block starts
//! - score above the hard threshold: denied until cleared via [`RateLimiter::unblock`]
//!
//! Entries live behind [`RateLimitStore`] so the in-memory map used here can be
//! swapped for a shared store when running more than one instance.
//!
//! CONCURRENCY
//! ===========
//! The store trait is get/set, so each limiter serializes its
//! read-modify-write cycle with its own mutex. Entries for the same client on
//! the same endpoint are never updated concurrently.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

pub const DEFAULT_WINDOW_SECS: u64 = 60;
pub const DEFAULT_MESSAGE_LIMIT: u32 = 10;
pub const DEFAULT_IMAGE_LIMIT: u32 = 5;
pub const DEFAULT_CSP_LIMIT: u32 = 30;
pub const DEFAULT_SUSPICION_WINDOW_SECS: u64 = 3600;
pub const DEFAULT_SOFT_THRESHOLD: u32 = 50;
pub const DEFAULT_HARD_THRESHOLD: u32 = 200;

/// Suspicion added when a request trips the content denylist.
pub const SECURITY_PENALTY: u32 = 5;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

// =============================================================================
// POLICY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Requests allowed per window.
    pub limit: u32,
    pub window: Duration,
    pub suspicion_window: Duration,
    pub soft_threshold: u32,
    pub hard_threshold: u32,
}

impl RateLimitPolicy {
    #[must_use]
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit,
            window: Duration::from_secs(DEFAULT_WINDOW_SECS),
            suspicion_window: Duration::from_secs(DEFAULT_SUSPICION_WINDOW_SECS),
            soft_threshold: DEFAULT_SOFT_THRESHOLD,
            hard_threshold: DEFAULT_HARD_THRESHOLD,
        }
    }
}

// =============================================================================
// ENTRY + STORE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    None,
    /// Soft block; lifted at the given epoch millisecond.
    Until(i64),
    Permanent,
}

/// Per-client state. Times are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub window_reset_ms: i64,
    /// One timestamp per suspicion point, oldest first.
    pub suspicion_events: VecDeque<i64>,
    pub suspicion_window_ms: i64,
    pub block: Block,
}

impl RateLimitEntry {
    fn fresh(now_ms: i64, policy: &RateLimitPolicy) -> Self {
        Self {
            count: 0,
            window_reset_ms: now_ms + millis(policy.window),
            suspicion_events: VecDeque::new(),
            suspicion_window_ms: millis(policy.suspicion_window),
            block: Block::None,
        }
    }

    /// Points recorded within the last suspicion window.
    #[must_use]
    pub fn suspicion(&self) -> u32 {
        u32::try_from(self.suspicion_events.len()).unwrap_or(u32::MAX)
    }

    fn prune_suspicion(&mut self, now_ms: i64) {
        let cutoff = now_ms - self.suspicion_window_ms;
        while self.suspicion_events.front().is_some_and(|&at| at <= cutoff) {
            self.suspicion_events.pop_front();
        }
    }

    fn add_suspicion(&mut self, now_ms: i64, points: u32) {
        for _ in 0..points {
            self.suspicion_events.push_back(now_ms);
        }
    }

    /// An entry is dead once its window and every suspicion point have
    /// elapsed and nothing blocks it.
    #[must_use]
    pub fn is_expired(&self, now_ms: i64) -> bool {
        let blocked = match self.block {
            Block::None => false,
            Block::Until(until) => until > now_ms,
            Block::Permanent => true,
        };
        let calm = self
            .suspicion_events
            .back()
            .is_none_or(|&at| at + self.suspicion_window_ms <= now_ms);
        !blocked && self.window_reset_ms <= now_ms && calm
    }
}

/// Storage seam for limiter entries.
pub trait RateLimitStore: Send + Sync {
    fn get(&self, key: &str) -> Option<RateLimitEntry>;
    fn set(&self, key: &str, entry: RateLimitEntry);
    fn remove(&self, key: &str);
    /// Drop expired entries. Returns how many were removed.
    fn sweep(&self, now_ms: i64) -> usize;
}

#[derive(Default)]
pub struct MemoryRateLimitStore {
    entries: Mutex<HashMap<String, RateLimitEntry>>,
}

impl MemoryRateLimitStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    fn get(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, entry: RateLimitEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), entry);
    }

    fn remove(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn sweep(&self, now_ms: i64) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now_ms));
        before - entries.len()
    }
}

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("Too many requests (max {limit} per {window_secs}s). Try again in {retry_after_secs}s.")]
    WindowExceeded { limit: u32, window_secs: u64, retry_after_secs: u64 },
    #[error("Too many suspicious requests. Try again in {retry_after_secs}s.")]
    SoftBlocked { retry_after_secs: u64 },
    #[error("Access denied due to repeated abuse.")]
    HardBlocked,
}

impl RateLimitError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::WindowExceeded { .. } => "E_RATE_LIMITED",
            Self::SoftBlocked { .. } => "E_SOFT_BLOCKED",
            Self::HardBlocked => "E_HARD_BLOCKED",
        }
    }
}

/// How a request that passed [`RateLimiter::check`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Policy-compliant request; decays suspicion.
    Success,
    /// Rejected for shape or bounds; no decay.
    Rejected,
    /// Rejected by the content denylist; adds [`SECURITY_PENALTY`].
    SecurityViolation,
}

// =============================================================================
// RATE LIMITER
// =============================================================================

#[derive(Clone)]
pub struct RateLimiter {
    endpoint: &'static str,
    policy: RateLimitPolicy,
    store: Arc<dyn RateLimitStore>,
    guard: Arc<Mutex<()>>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(endpoint: &'static str, policy: RateLimitPolicy, store: Arc<dyn RateLimitStore>) -> Self {
        Self { endpoint, policy, store, guard: Arc::new(Mutex::new(())) }
    }

    #[must_use]
    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }

    #[must_use]
    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    fn key(&self, client_id: &str) -> String {
        format!("{}:{client_id}", self.endpoint)
    }

    /// Count the request against the client's window and suspicion score.
    ///
    /// # Errors
    ///
    /// Returns a [`RateLimitError`] when the window budget is spent or the
    /// client is soft/hard blocked.
    pub fn check(&self, client_id: &str) -> Result<(), RateLimitError> {
        self.check_at(client_id, now_ms())
    }

    fn check_at(&self, client_id: &str, now: i64) -> Result<(), RateLimitError> {
        let _lock = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let key = self.key(client_id);
        let policy = &self.policy;
        let mut entry = self
            .store
            .get(&key)
            .unwrap_or_else(|| RateLimitEntry::fresh(now, policy));

        entry.prune_suspicion(now);
        if let Block::Until(until) = entry.block {
            if now >= until {
                entry.block = Block::None;
            }
        }

        if entry.block == Block::Permanent {
            self.store.set(&key, entry);
            return Err(RateLimitError::HardBlocked);
        }

        entry.add_suspicion(now, 1);

        let result = self.evaluate(client_id, &mut entry, now);
        self.store.set(&key, entry);
        result
    }

    fn evaluate(&self, client_id: &str, entry: &mut RateLimitEntry, now: i64) -> Result<(), RateLimitError> {
        let policy = &self.policy;
        let suspicion = entry.suspicion();

        if suspicion > policy.hard_threshold {
            error!(endpoint = self.endpoint, %client_id, suspicion, "rate limit: hard block");
            entry.block = Block::Permanent;
            return Err(RateLimitError::HardBlocked);
        }

        if suspicion > policy.soft_threshold && entry.block == Block::None {
            warn!(endpoint = self.endpoint, %client_id, suspicion, "rate limit: soft block");
            entry.block = Block::Until(now + millis(policy.suspicion_window));
        }
        if let Block::Until(until) = entry.block {
            return Err(RateLimitError::SoftBlocked { retry_after_secs: secs_until(now, until) });
        }

        if now >= entry.window_reset_ms {
            entry.count = 0;
            entry.window_reset_ms = now + millis(policy.window);
        }
        if entry.count >= policy.limit {
            debug!(endpoint = self.endpoint, %client_id, count = entry.count, "rate limit: window exhausted");
            return Err(RateLimitError::WindowExceeded {
                limit: policy.limit,
                window_secs: policy.window.as_secs(),
                retry_after_secs: secs_until(now, entry.window_reset_ms),
            });
        }
        entry.count += 1;
        Ok(())
    }

    /// Adjust the suspicion score once the request's fate is known.
    pub fn record(&self, client_id: &str, outcome: Outcome) {
        self.record_at(client_id, outcome, now_ms());
    }

    fn record_at(&self, client_id: &str, outcome: Outcome, now: i64) {
        let _lock = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        let key = self.key(client_id);
        let Some(mut entry) = self.store.get(&key) else {
            return;
        };
        match outcome {
            Outcome::Success => {
                entry.suspicion_events.pop_back();
            }
            Outcome::Rejected => {}
            Outcome::SecurityViolation => entry.add_suspicion(now, SECURITY_PENALTY),
        }
        self.store.set(&key, entry);
    }

    /// Out-of-band clearing of every block and counter for a client.
    pub fn unblock(&self, client_id: &str) {
        let _lock = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.remove(&self.key(client_id));
    }

    #[must_use]
    pub fn entry(&self, client_id: &str) -> Option<RateLimitEntry> {
        self.store.get(&self.key(client_id))
    }
}

/// Spawn a background task that periodically sweeps expired entries.
/// Periods under one second are raised to one second.
pub fn spawn_sweeper(store: Arc<dyn RateLimitStore>, interval: Duration) -> JoinHandle<()> {
    let interval = interval.max(MIN_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let removed = store.sweep(now_ms());
            if removed > 0 {
                debug!(removed, "rate limit: swept expired entries");
            }
        }
    })
}

// =============================================================================
// HELPERS
// =============================================================================

#[must_use]
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

fn millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

fn secs_until(now: i64, until: i64) -> u64 {
    let ms = u64::try_from(until.saturating_sub(now)).unwrap_or(0);
    ms.div_ceil(1000)
}

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
