//! 准入限流
//!
//! Per-client token buckets on top of governor's keyed GCRA limiter. Refill
//! is continuous; idle buckets are dropped by `sweep`.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::middleware::NoOpMiddleware;
use governor::state::keyed::DashMapStateStore;
use governor::{Quota, RateLimiter};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::config::{BucketConfig, LimiterConfig};

type KeyedLimiter<C> =
    RateLimiter<String, DashMapStateStore<String>, C, NoOpMiddleware<<C as Clock>::Instant>>;

fn quota_for(bucket: &BucketConfig) -> Quota {
    let capacity = NonZeroU32::new(bucket.capacity).unwrap_or(NonZeroU32::MIN);
    let refill = NonZeroU32::new(bucket.refill_per_second).unwrap_or(NonZeroU32::MIN);
    Quota::per_second(refill).allow_burst(capacity)
}

pub struct AdmissionLimiter<C: Clock = DefaultClock> {
    name: &'static str,
    limiter: KeyedLimiter<C>,
}

impl AdmissionLimiter<DefaultClock> {
    pub fn new(name: &'static str, bucket: &BucketConfig) -> Self {
        Self::with_clock(name, bucket, DefaultClock::default())
    }
}

impl<C: Clock> AdmissionLimiter<C> {
    pub fn with_clock(name: &'static str, bucket: &BucketConfig, clock: C) -> Self {
        debug!(
            "{} limiter: capacity {}, refill {}/s",
            name, bucket.capacity, bucket.refill_per_second
        );
        Self {
            name,
            limiter: RateLimiter::dashmap_with_clock(quota_for(bucket), clock),
        }
    }

    /// Take one token for `identity`. The bucket is created full on first use.
    pub fn allow(&self, identity: &str) -> bool {
        let allowed = self.limiter.check_key(&identity.to_string()).is_ok();
        if !allowed {
            trace!("{} limiter rejected {}", self.name, identity);
        }
        allowed
    }

    /// Drop buckets that have refilled completely. Returns how many remain.
    pub fn sweep(&self) -> usize {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        self.limiter.len()
    }

    pub fn tracked(&self) -> usize {
        self.limiter.len()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Global and API-scoped limiters; a request under `/api` must pass both.
pub struct AdmissionGate<C: Clock = DefaultClock> {
    pub global: AdmissionLimiter<C>,
    pub api: AdmissionLimiter<C>,
}

impl AdmissionGate<DefaultClock> {
    pub fn from_config(config: &LimiterConfig) -> Self {
        Self {
            global: AdmissionLimiter::new("global", &config.global),
            api: AdmissionLimiter::new("api", &config.api),
        }
    }
}

impl<C: Clock> AdmissionGate<C> {
    pub fn with_clock(config: &LimiterConfig, clock: C) -> Self
    where
        C: Clone,
    {
        Self {
            global: AdmissionLimiter::with_clock("global", &config.global, clock.clone()),
            api: AdmissionLimiter::with_clock("api", &config.api, clock),
        }
    }

    /// Global bucket first; the API bucket is only charged when `api_scope`.
    pub fn admit(&self, identity: &str, api_scope: bool) -> bool {
        self.global.allow(identity) && (!api_scope || self.api.allow(identity))
    }

    pub fn sweep(&self) -> (usize, usize) {
        (self.global.sweep(), self.api.sweep())
    }
}

impl<C: Clock + Send + Sync + 'static> AdmissionGate<C>
where
    C::Instant: Send + Sync,
{
    /// 定期清理空闲的限流桶
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let gate = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let (global, api) = gate.sweep();
                debug!("Limiter sweep: {} global / {} api buckets retained", global, api);
            }
        })
    }
}
