use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Per-key sliding window state.
///
/// Each key keeps at most `max_calls` admission timestamps. A full window
/// admits again only once its oldest entry is more than `time_frame` old.
#[derive(Debug)]
pub struct SlidingWindow {
    max_calls: usize,
    time_frame: Duration,
    calls: HashMap<String, VecDeque<Instant>>,
}

impl SlidingWindow {
    pub fn new(max_calls: usize, time_frame: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            time_frame,
            calls: HashMap::new(),
        }
    }

    /// Decide whether a call for `key` at `now` is admitted, recording it if so.
    pub fn admit(&mut self, key: &str, now: Instant) -> bool {
        self.evict_idle(now);

        let Some(stamps) = self.calls.get_mut(key) else {
            self.calls.insert(key.to_string(), VecDeque::from([now]));
            debug!(key, "first call admitted");
            return true;
        };

        if stamps.len() < self.max_calls {
            stamps.push_back(now);
            debug!(key, count = stamps.len(), "call admitted");
            return true;
        }

        let oldest_expired = stamps
            .front()
            .is_some_and(|oldest| now.saturating_duration_since(*oldest) > self.time_frame);
        if oldest_expired {
            stamps.pop_front();
            stamps.push_back(now);
            debug!(key, "window slid, call admitted");
            true
        } else {
            warn!(key, max_calls = self.max_calls, window_secs = self.time_frame.as_secs(), "rate limit exceeded");
            false
        }
    }

    /// Time until `key` would be admitted again; zero if it would be now.
    pub fn retry_after(&self, key: &str, now: Instant) -> Duration {
        match self.calls.get(key) {
            Some(stamps) if stamps.len() >= self.max_calls => stamps
                .front()
                .map(|oldest| self.time_frame.saturating_sub(now.saturating_duration_since(*oldest)))
                .unwrap_or_default(),
            _ => Duration::ZERO,
        }
    }

    pub fn tracked_keys(&self) -> usize {
        self.calls.len()
    }

    // Drop keys whose newest call is older than the window.
    fn evict_idle(&mut self, now: Instant) {
        let frame = self.time_frame;
        self.calls.retain(|_, stamps| {
            stamps
                .back()
                .is_some_and(|newest| now.saturating_duration_since(*newest) <= frame)
        });
    }
}

/// Shared, lock-guarded sliding window limiter.
#[derive(Clone)]
pub struct RateLimiter {
    window: Arc<Mutex<SlidingWindow>>,
    enabled: bool,
}

impl RateLimiter {
    pub fn new(max_calls: usize, time_frame: Duration, enabled: bool) -> Self {
        Self {
            window: Arc::new(Mutex::new(SlidingWindow::new(max_calls, time_frame))),
            enabled,
        }
    }

    pub async fn is_allowed(&self, key: &str) -> bool {
        if !self.enabled {
            return true;
        }

        let mut window = self.window.lock().await;
        window.admit(key, Instant::now())
    }

    pub async fn retry_after(&self, key: &str) -> Duration {
        let window = self.window.lock().await;
        window.retry_after(key, Instant::now())
    }

    pub async fn tracked_keys(&self) -> usize {
        self.window.lock().await.tracked_keys()
    }
}
