//! Per-session action rate limiting.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Token bucket parameters.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    pub interval_ms: u64,
    pub max_tokens: u32,
}

/// A lazily refilled token bucket.
///
/// Refill happens on use: elapsed whole intervals since the last
/// refill become tokens (capped at the maximum), and the refill stamp
/// advances by exactly those interval multiples. The stamp never
/// snaps to "now", so partial intervals are carried over instead of
/// drifting. No background task is involved, and the outcome is
/// deterministic given timestamps.
#[derive(Debug)]
pub struct TokenBucket {
    config: RateLimiterConfig,
    tokens: u32,
    last_refill_ms: u64,
}

impl TokenBucket {
    /// Create a full bucket stamped with the current wall clock.
    pub fn new(config: RateLimiterConfig) -> Self {
        Self::starting_at(config, epoch_ms())
    }

    /// Create a full bucket stamped with an explicit time.
    pub fn starting_at(config: RateLimiterConfig, now_ms: u64) -> Self {
        Self {
            tokens: config.max_tokens,
            last_refill_ms: now_ms,
            config,
        }
    }

    /// Spend one token against the current wall clock.
    pub fn take(&mut self) -> bool {
        self.take_at(epoch_ms())
    }

    /// Spend one token at an explicit time. Returns false when denied.
    pub fn take_at(&mut self, now_ms: u64) -> bool {
        self.refill_at(now_ms);
        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn refill_at(&mut self, now_ms: u64) {
        let elapsed = now_ms.saturating_sub(self.last_refill_ms);
        if elapsed < self.config.interval_ms {
            return;
        }
        let intervals = elapsed / self.config.interval_ms;
        let refilled = self.tokens as u64 + intervals;
        self.tokens = refilled.min(self.config.max_tokens as u64) as u32;
        self.last_refill_ms += intervals * self.config.interval_ms;
    }
}
