use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use parking_lot::RwLock;

use crate::http::{HttpHeaders, header_get};

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default proactive rate limits (requests per second).
pub mod rate_limits {
    /// GitHub: 5000 requests/hour = ~1.4/sec, we use 10/sec to allow bursts.
    pub const GITHUB_DEFAULT_RPS: u32 = 10;
}

/// Requests held back from background work so interactive lookups keep some quota.
const BACKGROUND_RESERVE: i64 = 250;

/// Extra seconds added to the reset window when pacing background work.
const RESET_WINDOW_SLACK_SECS: i64 = 180;

/// Point-in-time view of a connection's API quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSnapshot {
    /// False until the first API response carrying rate limit headers.
    pub known: bool,
    /// Requests remaining in the current window.
    pub remaining: i64,
    /// When the current window resets.
    pub reset_at: DateTime<Utc>,
}

impl Default for RateLimitSnapshot {
    fn default() -> Self {
        Self {
            known: false,
            remaining: 0,
            reset_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl RateLimitSnapshot {
    /// A known snapshot with the given remaining quota and reset time.
    pub fn known(remaining: i64, reset_at: DateTime<Utc>) -> Self {
        Self {
            known: true,
            remaining,
            reset_at,
        }
    }

    /// Signed time until reset; negative once the window has already reset.
    pub fn reset_after(&self, now: DateTime<Utc>) -> Duration {
        self.reset_at - now
    }
}

/// Tracks the quota reported by the code host.
///
/// Every API call on a connection updates the monitor; sync workers and the
/// resolver read it concurrently. The snapshot is a `Copy` value swapped whole
/// under the lock, so readers never see a half-updated state.
#[derive(Debug, Default)]
pub struct RateLimitMonitor {
    snapshot: RwLock<RateLimitSnapshot>,
}

impl RateLimitMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot.
    pub fn get(&self) -> RateLimitSnapshot {
        *self.snapshot.read()
    }

    /// Replace the snapshot.
    pub fn update(&self, snapshot: RateLimitSnapshot) {
        *self.snapshot.write() = snapshot;
    }

    /// Update from `X-RateLimit-Remaining` / `X-RateLimit-Reset` response headers.
    ///
    /// Returns false (and leaves the snapshot untouched) when either header is
    /// missing or malformed.
    pub fn update_from_headers(&self, headers: &HttpHeaders) -> bool {
        let Some(remaining) =
            header_get(headers, "x-ratelimit-remaining").and_then(|v| v.trim().parse::<i64>().ok())
        else {
            return false;
        };
        let Some(reset_at) = header_get(headers, "x-ratelimit-reset")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(|epoch| DateTime::from_timestamp(epoch, 0))
        else {
            return false;
        };

        self.update(RateLimitSnapshot::known(remaining, reset_at));
        true
    }

    /// How long a background operation of the given cost should wait before
    /// running, so that background work spreads over the reset window instead
    /// of exhausting the quota.
    pub fn recommended_wait_for_background_op(&self, cost: u32) -> StdDuration {
        self.recommended_wait_at(cost, Utc::now())
    }

    pub(crate) fn recommended_wait_at(&self, cost: u32, now: DateTime<Utc>) -> StdDuration {
        let snapshot = self.get();
        if !snapshot.known {
            return StdDuration::ZERO;
        }

        let reset_after = snapshot.reset_after(now);
        if reset_after <= Duration::zero() {
            // Window already reset; the next response will tell us the new quota.
            return StdDuration::ZERO;
        }

        let window = (reset_after + Duration::seconds(RESET_WINDOW_SLACK_SECS))
            .to_std()
            .unwrap_or(StdDuration::ZERO);
        let budget = (snapshot.remaining - BACKGROUND_RESERVE) as f64;
        let runs = budget / f64::from(cost.max(1));

        if runs < 1.0 {
            window
        } else if runs > 500.0 {
            StdDuration::ZERO
        } else if runs > 250.0 {
            StdDuration::from_millis(200)
        } else {
            window.div_f64(runs)
        }
    }
}

/// A standalone API rate limiter using the governor crate.
///
/// Applied before every request a client sends, independently of the quota the
/// server reports.
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter").finish_non_exhaustive()
    }
}

impl ApiRateLimiter {
    /// Create a new rate limiter with the specified requests per second.
    ///
    /// # Arguments
    ///
    /// * `requests_per_second` - Maximum requests per second (must be > 0, defaults to 1 if 0)
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rps));

        Self {
            inner: Arc::new(rate_limiter),
        }
    }

    /// Wait until a request is allowed by the rate limiter.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }
}
