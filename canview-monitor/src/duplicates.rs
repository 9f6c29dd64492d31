//! Suppression of repeated frames.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// `(can_id, data hex)` of a decoded frame.
pub type FrameKey = (String, String);

/// Remembers the last `window` distinct sightings. A key seen again within
/// `ttl` of a remembered sighting is a duplicate and is not remembered again.
#[derive(Debug)]
pub struct DuplicateFilter {
    ttl: Duration,
    window: usize,
    recent: VecDeque<(FrameKey, Instant)>,
}

impl DuplicateFilter {
    pub fn new(ttl: Duration, window: usize) -> Self {
        Self {
            ttl,
            window: window.max(1),
            recent: VecDeque::with_capacity(window.max(1)),
        }
    }

    pub fn is_duplicate(&mut self, key: &FrameKey, now: Instant) -> bool {
        let seen = self
            .recent
            .iter()
            .any(|(k, at)| k == key && now.saturating_duration_since(*at) < self.ttl);
        if seen {
            return true;
        }
        if self.recent.len() == self.window {
            self.recent.pop_front();
        }
        self.recent.push_back((key.clone(), now));
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(data: &str) -> FrameKey {
        ("0x12c".to_string(), data.to_string())
    }

    #[test]
    fn repeat_within_ttl_is_duplicate() {
        let mut filter = DuplicateFilter::new(Duration::from_millis(300), 20);
        let t0 = Instant::now();
        assert!(!filter.is_duplicate(&key("00"), t0));
        assert!(filter.is_duplicate(&key("00"), t0 + Duration::from_millis(299)));
        assert!(!filter.is_duplicate(&key("00"), t0 + Duration::from_millis(300)));
    }

    #[test]
    fn different_payloads_are_independent() {
        let mut filter = DuplicateFilter::new(Duration::from_millis(300), 20);
        let t0 = Instant::now();
        assert!(!filter.is_duplicate(&key("00"), t0));
        assert!(!filter.is_duplicate(&key("01"), t0));
    }

    #[test]
    fn evicted_keys_are_forgotten() {
        let mut filter = DuplicateFilter::new(Duration::from_millis(300), 2);
        let t0 = Instant::now();
        filter.is_duplicate(&key("00"), t0);
        filter.is_duplicate(&key("01"), t0);
        filter.is_duplicate(&key("02"), t0);
        assert!(!filter.is_duplicate(&key("00"), t0));
    }
}
