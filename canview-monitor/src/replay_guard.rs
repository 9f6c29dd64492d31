//! Counter-based replay detection.

use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayVerdict {
    Accepted,
    /// The counter did not advance past `last`.
    Replay { last: i64 },
}

/// Tracks the last accepted frame counter. Starts below every counter so
/// the first frame is always accepted.
#[derive(Debug, Clone)]
pub struct ReplayGuard {
    last: i64,
    reset_gap: i64,
    reset_floor: i64,
}

impl ReplayGuard {
    pub fn new(reset_gap: u64, reset_floor: u64) -> Self {
        Self {
            last: -1,
            reset_gap: i64::try_from(reset_gap).unwrap_or(i64::MAX),
            reset_floor: i64::try_from(reset_floor).unwrap_or(i64::MAX),
        }
    }

    pub fn last(&self) -> i64 {
        self.last
    }

    pub fn check(&mut self, counter: u16) -> ReplayVerdict {
        let counter = i64::from(counter);

        // A small counter far below the last one means the sender wrapped.
        if self.last - counter > self.reset_gap && counter < self.reset_floor {
            info!(from = self.last, to = counter, "Counter wrapped, resetting");
            self.last = counter - 1;
        }

        if counter <= self.last {
            return ReplayVerdict::Replay { last: self.last };
        }
        self.last = counter;
        ReplayVerdict::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> ReplayGuard {
        ReplayGuard::new(100, 20)
    }

    #[test]
    fn first_counter_is_accepted() {
        let mut guard = guard();
        assert_eq!(guard.last(), -1);
        assert_eq!(guard.check(0), ReplayVerdict::Accepted);
        assert_eq!(guard.last(), 0);
    }

    #[test]
    fn repeated_or_older_counter_is_replay() {
        let mut guard = guard();
        guard.check(41);
        assert_eq!(guard.check(41), ReplayVerdict::Replay { last: 41 });
        assert_eq!(guard.check(12), ReplayVerdict::Replay { last: 41 });
        assert_eq!(guard.last(), 41);
    }

    #[test]
    fn wrap_resets_below_new_counter() {
        let mut guard = guard();
        guard.check(500);
        assert_eq!(guard.check(3), ReplayVerdict::Accepted);
        assert_eq!(guard.last(), 3);
    }

    #[test]
    fn gap_must_be_exceeded_for_a_wrap() {
        let mut guard = guard();
        guard.check(110);
        assert_eq!(guard.check(10), ReplayVerdict::Replay { last: 110 });
        // 120 - 19 > 100 with 19 < 20 counts as a wrap.
        guard.check(120);
        assert_eq!(guard.check(19), ReplayVerdict::Accepted);
    }

    #[test]
    fn large_small_counter_is_not_a_wrap() {
        let mut guard = guard();
        guard.check(500);
        assert_eq!(guard.check(20), ReplayVerdict::Replay { last: 500 });
    }
}
