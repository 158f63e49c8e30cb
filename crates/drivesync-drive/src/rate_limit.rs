//! Proactive rate limiting for the Drive API
//!
//! Each [`Endpoint`] class gets its own token bucket. A throttle response
//! halves the bucket's effective capacity; sustained success restores it in
//! 5% steps.
//!
//! ```rust,no_run
//! use drivesync_drive::rate_limit::{AdaptiveRateLimiter, Endpoint, RateLimitConfig};
//!
//! # async fn example() {
//! let limiter = AdaptiveRateLimiter::new(RateLimitConfig::default());
//! limiter.acquire(Endpoint::Changes).await;
//! // ... make API call ...
//! limiter.on_success(Endpoint::Changes);
//! # }
//! ```

use std::{
    collections::HashMap,
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use tracing::{debug, info, warn};

/// Successes needed before capacity is raised again
const RECOVERY_INTERVAL: u64 = 100;

/// Longest HTTP-date based Retry-After honoured
const MAX_RETRY_AFTER_SECS: u64 = 3600;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Endpoint classes
// ============================================================================

/// Request classes that are limited independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `/changes` and `/changes/startPageToken`
    Changes,
    /// `/files/{id}` metadata lookups
    Metadata,
    /// Downloads and exports
    Content,
}

impl Endpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Changes => "changes",
            Self::Metadata => "metadata",
            Self::Content => "content",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// TokenBucket
// ============================================================================

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
    effective_capacity: u32,
    successes: u64,
}

/// Token bucket for a single endpoint class
///
/// The bucket starts full. Tokens refill continuously at `refill_rate` per
/// second up to the current effective capacity.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    refill_rate: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    /// Creates a full bucket
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of tokens
    /// * `refill_rate` - Tokens added per second
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            state: Mutex::new(BucketState {
                tokens: f64::from(capacity),
                last_refill: Instant::now(),
                effective_capacity: capacity,
                successes: 0,
            }),
        }
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            state.tokens = (state.tokens + elapsed * self.refill_rate)
                .min(f64::from(state.effective_capacity));
            state.last_refill = now;
        }
    }

    /// Takes one token if available
    pub fn try_acquire(&self) -> bool {
        let mut state = lock(&self.state);
        self.refill(&mut state);
        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Seconds until one token is available; zero if one already is
    pub fn time_until_available(&self) -> f64 {
        let mut state = lock(&self.state);
        self.refill(&mut state);
        if state.tokens >= 1.0 {
            0.0
        } else if self.refill_rate > 0.0 {
            (1.0 - state.tokens) / self.refill_rate
        } else {
            f64::MAX
        }
    }

    pub fn available_tokens(&self) -> f64 {
        let mut state = lock(&self.state);
        self.refill(&mut state);
        state.tokens
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn effective_capacity(&self) -> u32 {
        lock(&self.state).effective_capacity
    }

    /// Record a successful call; every 100th raises capacity by 5%
    pub fn on_success(&self) {
        let mut state = lock(&self.state);
        state.successes += 1;
        if state.successes % RECOVERY_INTERVAL == 0 && state.effective_capacity < self.capacity {
            let old = state.effective_capacity;
            let increase = (f64::from(old) * 0.05).max(1.0) as u32;
            state.effective_capacity = (old + increase).min(self.capacity);
            debug!(
                old_capacity = old,
                new_capacity = state.effective_capacity,
                "Rate limit capacity recovering"
            );
        }
    }

    /// Record a throttle response: halve capacity (minimum 1), reset successes
    pub fn on_throttle(&self) {
        let mut state = lock(&self.state);
        let old = state.effective_capacity;
        state.effective_capacity = (old / 2).max(1);
        state.tokens = state.tokens.min(f64::from(state.effective_capacity));
        state.successes = 0;
        warn!(
            old_capacity = old,
            new_capacity = state.effective_capacity,
            "Throttled; halving bucket capacity"
        );
    }
}

// ============================================================================
// RateLimitConfig
// ============================================================================

/// Bucket parameters for each endpoint class
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// `(capacity, refill tokens per second)` per endpoint class
    pub buckets: HashMap<Endpoint, (u32, f64)>,
    /// Maximum number of retries on 429 and 5xx responses
    pub max_retries: u32,
}

impl RateLimitConfig {
    /// Build from per-minute request budgets
    ///
    /// Each bucket holds one minute's worth of tokens.
    pub fn from_requests_per_minute(changes: u32, metadata: u32, content: u32) -> Self {
        let bucket = |per_minute: u32| (per_minute.max(1), f64::from(per_minute.max(1)) / 60.0);
        Self {
            buckets: HashMap::from([
                (Endpoint::Changes, bucket(changes)),
                (Endpoint::Metadata, bucket(metadata)),
                (Endpoint::Content, bucket(content)),
            ]),
            max_retries: 5,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::from_requests_per_minute(60, 600, 300)
    }
}

// ============================================================================
// AdaptiveRateLimiter
// ============================================================================

/// Shared set of per-endpoint token buckets
pub struct AdaptiveRateLimiter {
    buckets: HashMap<Endpoint, TokenBucket>,
    config: RateLimitConfig,
}

impl fmt::Debug for AdaptiveRateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptiveRateLimiter")
            .field("config", &self.config)
            .finish()
    }
}

impl AdaptiveRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let buckets = [Endpoint::Changes, Endpoint::Metadata, Endpoint::Content]
            .into_iter()
            .map(|endpoint| {
                let (capacity, refill_rate) =
                    config.buckets.get(&endpoint).copied().unwrap_or((60, 1.0));
                (endpoint, TokenBucket::new(capacity, refill_rate))
            })
            .collect();
        Self { buckets, config }
    }

    pub fn max_retries(&self) -> u32 {
        self.config.max_retries
    }

    fn bucket(&self, endpoint: Endpoint) -> Option<&TokenBucket> {
        self.buckets.get(&endpoint)
    }

    /// Wait until a token for `endpoint` is available and take it
    pub async fn acquire(&self, endpoint: Endpoint) {
        let Some(bucket) = self.bucket(endpoint) else {
            return;
        };
        loop {
            if bucket.try_acquire() {
                return;
            }
            let wait = Duration::from_secs_f64(bucket.time_until_available().clamp(0.01, 60.0));
            debug!(
                endpoint = %endpoint,
                wait_ms = wait.as_millis() as u64,
                "No tokens available, waiting for refill"
            );
            tokio::time::sleep(wait).await;
        }
    }

    pub fn on_success(&self, endpoint: Endpoint) {
        if let Some(bucket) = self.bucket(endpoint) {
            bucket.on_success();
        }
    }

    pub fn on_throttle(&self, endpoint: Endpoint) {
        info!(endpoint = %endpoint, "Recording throttle event");
        if let Some(bucket) = self.bucket(endpoint) {
            bucket.on_throttle();
        }
    }

    pub fn effective_capacity(&self, endpoint: Endpoint) -> Option<u32> {
        self.bucket(endpoint).map(TokenBucket::effective_capacity)
    }
}

// ============================================================================
// Retry-After parsing
// ============================================================================

/// Parses a Retry-After header value
///
/// Accepts delta-seconds (`"30"`) or an HTTP-date no more than an hour in
/// the future. Anything else yields `default`.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value) {
        let remaining = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
        if let Ok(secs) = u64::try_from(remaining.num_seconds()) {
            if secs <= MAX_RETRY_AFTER_SECS {
                return Duration::from_secs(secs);
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}
