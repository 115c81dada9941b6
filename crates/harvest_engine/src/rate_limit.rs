//! Process-wide politeness gate for archive requests.
//!
//! One [`RateLimiter`] is shared by every worker of a run and by both the
//! index client and the page fetcher.

use std::time::Duration;

use harvest_logging::harvest_warn;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitSettings {
    pub min_delay: Duration,
    pub backoff_factor: f64,
    pub max_delay: Duration,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_millis(100),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(360),
        }
    }
}

#[derive(Debug)]
struct GateState {
    last_request: Option<Instant>,
    current_delay: Duration,
}

#[derive(Debug)]
pub struct RateLimiter {
    settings: RateLimitSettings,
    state: Mutex<GateState>,
}

impl RateLimiter {
    pub fn new(settings: RateLimitSettings) -> Self {
        Self {
            state: Mutex::new(GateState {
                last_request: None,
                current_delay: settings.min_delay,
            }),
            settings,
        }
    }

    /// Suspends until the current delay has passed since the last granted
    /// request. The lock is held across the sleep, so concurrent callers are
    /// granted one at a time.
    pub async fn wait(&self) {
        let mut state = self.state.lock().await;
        if let Some(last) = state.last_request {
            let ready_at = last + state.current_delay;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        state.last_request = Some(Instant::now());
    }

    /// Grows the delay by the backoff factor, capped at the maximum, and
    /// returns the new delay.
    pub async fn backoff(&self) -> Duration {
        let mut state = self.state.lock().await;
        let grown = state
            .current_delay
            .mul_f64(self.settings.backoff_factor.max(1.0));
        state.current_delay = grown.min(self.settings.max_delay);
        harvest_warn!(
            "Rate limited by archive; delay now {:.1}s",
            state.current_delay.as_secs_f64()
        );
        state.current_delay
    }

    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        state.current_delay = self.settings.min_delay;
    }

    pub async fn current_delay(&self) -> Duration {
        self.state.lock().await.current_delay
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitSettings::default())
    }
}
