use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Sliding-window request counter keyed by client address.
#[derive(Debug, Clone)]
pub struct IpRateLimiter {
    inner: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    window: Duration,
    max_requests: usize,
}

impl IpRateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            window,
            max_requests,
        }
    }

    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut guard = self.inner.lock();
        let queue = guard.entry(key.to_string()).or_default();

        while queue
            .front()
            .is_some_and(|front| now.duration_since(*front) > self.window)
        {
            queue.pop_front();
        }

        if queue.len() >= self.max_requests {
            return false;
        }

        queue.push_back(now);
        let window = self.window;
        // Forget clients whose last hit has left the window.
        guard.retain(|_, hits| {
            hits.back()
                .is_some_and(|last| now.duration_since(*last) <= window)
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_after_the_limit_within_the_window() {
        let limiter = IpRateLimiter::new(Duration::from_secs(60), 2);
        let start = Instant::now();

        assert!(limiter.allow_at("10.0.0.1", start));
        assert!(limiter.allow_at("10.0.0.1", start));
        assert!(!limiter.allow_at("10.0.0.1", start));
        assert!(limiter.allow_at("10.0.0.2", start));
    }

    #[test]
    fn window_expiry_frees_capacity() {
        let limiter = IpRateLimiter::new(Duration::from_secs(10), 1);
        let start = Instant::now();

        assert!(limiter.allow_at("client", start));
        assert!(!limiter.allow_at("client", start + Duration::from_secs(5)));
        assert!(limiter.allow_at("client", start + Duration::from_secs(11)));
    }
}
