//! Webhook idempotency cache.
//!
//! Shopify may deliver the same event more than once. Each delivery carries
//! an `X-Shopify-Event-Id`; the first delivery of an id is processed and any
//! repeat within the TTL is acknowledged without side effects.
//!
//! Entries live in a `moka` cache keyed `webhook:{shop}:{event_id}`. Each
//! entry stores its own expiry, read from an injectable [`Clock`], so expiry
//! can be tested without sleeping.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use tracing::debug;

use embedded_admin_core::ShopDomain;

use crate::config::WebhookCacheConfig;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    #[must_use]
    pub const fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Remembers which webhook deliveries have been processed.
#[derive(Clone)]
pub struct WebhookCache {
    entries: Cache<String, DateTime<Utc>>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for WebhookCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookCache")
            .field("entries", &self.entries.entry_count())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl WebhookCache {
    /// Create a cache using the system clock.
    #[must_use]
    pub fn new(config: &WebhookCacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache reading time from `clock`.
    #[must_use]
    pub fn with_clock(config: &WebhookCacheConfig, clock: Arc<dyn Clock>) -> Self {
        // Entries carry their own expiry; the moka TTL only bounds memory.
        let entries = Cache::builder()
            .max_capacity(config.capacity)
            .time_to_live(config.ttl)
            .build();

        Self {
            entries,
            ttl: TimeDelta::from_std(config.ttl).unwrap_or(TimeDelta::MAX),
            clock,
        }
    }

    /// Cache key for one delivery.
    #[must_use]
    pub fn key(shop: &ShopDomain, event_id: &str) -> String {
        format!("webhook:{shop}:{event_id}")
    }

    /// Whether this delivery was already processed and has not expired.
    pub async fn is_processed(&self, shop: &ShopDomain, event_id: &str) -> bool {
        let key = Self::key(shop, event_id);
        self.live_entry(&key).await.is_some()
    }

    /// Record this delivery as processed for the configured TTL.
    pub async fn mark_processed(&self, shop: &ShopDomain, event_id: &str) {
        let key = Self::key(shop, event_id);
        let expires_at = self.expiry_from_now();
        self.entries.insert(key, expires_at).await;
    }

    /// Record the delivery and report whether this call was the first.
    ///
    /// The expiry check and the write happen under moka's per-key lock, so
    /// concurrent callers with the same key see exactly one `true`, also
    /// when the previous entry has just expired.
    pub async fn claim(&self, shop: &ShopDomain, event_id: &str) -> bool {
        let key = Self::key(shop, event_id);
        let now = self.clock.now();
        let expires_at = self.expiry_from(now);

        let result = self
            .entries
            .entry(key)
            .and_compute_with(|existing| {
                let op = match existing {
                    Some(entry) if *entry.value() > now => Op::Nop,
                    _ => Op::Put(expires_at),
                };
                std::future::ready(op)
            })
            .await;

        match result {
            CompResult::Inserted(_) | CompResult::ReplacedWith(_) => true,
            CompResult::Unchanged(entry) => {
                debug!(key = %entry.key(), "webhook delivery already processed");
                false
            }
            CompResult::Removed(_) | CompResult::StillNone(_) => false,
        }
    }

    /// Forget every recorded delivery.
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Returns the entry's expiry if it is still live.
    ///
    /// Expired entries are left for `claim` to overwrite and for moka's TTL
    /// to evict.
    async fn live_entry(&self, key: &str) -> Option<DateTime<Utc>> {
        let expires_at = self.entries.get(key).await?;
        (expires_at > self.clock.now()).then_some(expires_at)
    }

    fn expiry_from_now(&self) -> DateTime<Utc> {
        self.expiry_from(self.clock.now())
    }

    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// The configured TTL.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl.to_std().unwrap_or(Duration::MAX)
    }
}
