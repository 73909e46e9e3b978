use std::time::Duration;
use tokio::time::sleep;
use rand::Rng;

use crate::fetcher::ProviderId;

/// Polite pacing between sequential provider calls. Not a correctness mechanism.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    base: Duration,
}

impl RateLimiter {
    pub fn new(base: Duration) -> Self {
        Self { base }
    }

    /// No delay at all; used by tests and offline runs.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Delay to apply before calling `provider`, with jitter on top of the base.
    pub fn delay_for(&self, provider: ProviderId) -> Duration {
        if self.base.is_zero() {
            return Duration::ZERO;
        }

        let base_ms = u64::try_from(self.base.as_millis()).unwrap_or(u64::MAX);
        let (floor, spread) = match provider {
            // FRED's WAF reacts to bursts; give it the most room.
            ProviderId::Fred => (base_ms.saturating_mul(2), base_ms.saturating_mul(2)),
            ProviderId::Stooq => (base_ms, base_ms),
            // CBOE is a static CDN file.
            ProviderId::Cboe => (base_ms / 2, base_ms / 2),
        };

        let jitter = if spread == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..spread)
        };
        Duration::from_millis(floor.saturating_add(jitter))
    }

    pub async fn wait(&self, provider: ProviderId) {
        let delay = self.delay_for(provider);
        if !delay.is_zero() {
            sleep(delay).await;
        }
    }
}
