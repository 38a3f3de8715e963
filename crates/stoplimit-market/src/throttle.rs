//! Request throttling for the exchange REST API.
//!
//! One `RequestThrottle` is shared by every watch in the process. It bounds
//! in-flight requests with a semaphore and keeps the rolling request weight
//! under the exchange's per-minute budget.

use crate::error::{MarketDataError, MarketDataResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::warn;

/// Exchange request weight window.
pub const WEIGHT_WINDOW: Duration = Duration::from_secs(60);

/// Poll interval while waiting for window capacity.
const CAPACITY_POLL: Duration = Duration::from_millis(100);

/// Throttle limits.
#[derive(Debug, Clone, Copy)]
pub struct ThrottleConfig {
    /// Maximum request weight per [`WEIGHT_WINDOW`].
    pub max_weight_per_window: u32,
    /// Maximum concurrent in-flight requests.
    pub max_inflight: usize,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_weight_per_window: 1200,
            max_inflight: 8,
        }
    }
}

/// Sliding-window weight limiter with bounded concurrency.
pub struct RequestThrottle {
    max_weight: u32,
    window: Duration,
    /// (sent_at, weight) of requests inside the window.
    sent: Mutex<VecDeque<(Instant, u32)>>,
    max_inflight: usize,
    inflight: Arc<Semaphore>,
}

/// Held for the duration of one request; releases the in-flight slot on drop.
pub struct ThrottlePermit {
    _permit: OwnedSemaphorePermit,
}

impl RequestThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self::with_window(config, WEIGHT_WINDOW)
    }

    fn with_window(config: ThrottleConfig, window: Duration) -> Self {
        let max_inflight = config.max_inflight.max(1);
        Self {
            max_weight: config.max_weight_per_window.max(1),
            window,
            sent: Mutex::new(VecDeque::new()),
            max_inflight,
            inflight: Arc::new(Semaphore::new(max_inflight)),
        }
    }

    /// Check if a request of `weight` fits in the current window.
    pub fn can_send(&self, weight: u32) -> bool {
        self.current_weight().saturating_add(weight) <= self.max_weight
    }

    /// Total weight recorded in the current window.
    pub fn current_weight(&self) -> u32 {
        let mut sent = self.sent.lock();
        self.prune(&mut sent);
        window_weight(&sent)
    }

    /// Remaining weight in the current window.
    pub fn remaining_capacity(&self) -> u32 {
        self.max_weight.saturating_sub(self.current_weight())
    }

    /// Number of requests currently holding an in-flight slot.
    pub fn inflight_count(&self) -> usize {
        self.max_inflight
            .saturating_sub(self.inflight.available_permits())
    }

    /// Wait for an in-flight slot and window capacity, then record the request.
    ///
    /// The capacity check and the record happen under one lock, so concurrent
    /// callers cannot overshoot the budget. Weights above the window budget
    /// are clamped so a single heavy request can never wait forever.
    pub async fn acquire(&self, weight: u32) -> MarketDataResult<ThrottlePermit> {
        let weight = weight.min(self.max_weight);
        let permit = Arc::clone(&self.inflight)
            .acquire_owned()
            .await
            .map_err(|e| MarketDataError::HttpClient(format!("throttle closed: {e}")))?;

        let mut warned = false;
        loop {
            let current = {
                let mut sent = self.sent.lock();
                self.prune(&mut sent);
                let current = window_weight(&sent);
                if current.saturating_add(weight) <= self.max_weight {
                    sent.push_back((Instant::now(), weight));
                    break;
                }
                current
            };
            if !warned {
                warn!(
                    weight,
                    current,
                    max = self.max_weight,
                    "Request weight budget exhausted, waiting"
                );
                warned = true;
            }
            tokio::time::sleep(CAPACITY_POLL).await;
        }

        Ok(ThrottlePermit { _permit: permit })
    }

    fn prune(&self, sent: &mut VecDeque<(Instant, u32)>) {
        let now = Instant::now();
        while sent
            .front()
            .is_some_and(|(t, _)| now.duration_since(*t) >= self.window)
        {
            sent.pop_front();
        }
    }
}

fn window_weight(sent: &VecDeque<(Instant, u32)>) -> u32 {
    sent.iter().map(|(_, w)| *w).sum()
}

impl Default for RequestThrottle {
    fn default() -> Self {
        Self::new(ThrottleConfig::default())
    }
}
