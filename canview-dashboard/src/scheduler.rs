//! ## canview-dashboard::scheduler
//! **Active animation set with a single owned clear deadline**
//!
//! A valid trigger replaces whatever is active and re-arms the clear
//! deadline; the previous deadline is dropped with the set it belonged to.
//! The clear window is fixed and does not depend on clip lengths.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use canview_core::events::AnimationTrigger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAnimationSet {
    pub names: Vec<String>,
    pub reverse: bool,
    pub expires_at: Instant,
}

#[derive(Debug)]
pub struct AnimationScheduler {
    clear_after: Duration,
    active: Option<ActiveAnimationSet>,
}

impl AnimationScheduler {
    pub fn new(clear_after: Duration) -> Self {
        Self {
            clear_after,
            active: None,
        }
    }

    /// Applies a trigger received at `now`.
    ///
    /// Returns the new active set, or `None` when the trigger carried no
    /// usable names, in which case nothing changes.
    pub fn on_trigger(
        &mut self,
        trigger: &AnimationTrigger,
        now: Instant,
    ) -> Option<&ActiveAnimationSet> {
        let names = trigger.normalized_names();
        if names.is_empty() {
            warn!("Received empty animation list");
            return None;
        }

        if let Some(previous) = self.active.take() {
            debug!(replaced = ?previous.names, "Replacing active animation set");
        }
        info!(animations = ?names, reverse = trigger.reverse, "Triggering animations");

        Some(self.active.insert(ActiveAnimationSet {
            names,
            reverse: trigger.reverse,
            expires_at: now + self.clear_after,
        }))
    }

    /// Clears the set once its deadline has passed. Returns true on clear.
    pub fn poll_expiry(&mut self, now: Instant) -> bool {
        match &self.active {
            Some(set) if set.expires_at <= now => {
                debug!(animations = ?set.names, "Animation window elapsed");
                self.active = None;
                true
            }
            _ => false,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.active.as_ref().map(|set| set.expires_at)
    }

    pub fn active(&self) -> Option<&ActiveAnimationSet> {
        self.active.as_ref()
    }

    /// Direction of the active set; false when nothing is active.
    pub fn reverse(&self) -> bool {
        self.active.as_ref().is_some_and(|set| set.reverse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canview_core::events::AnimationRef;
    use proptest::prelude::*;
    use serde_json::json;

    const WINDOW: Duration = Duration::from_millis(2000);

    #[test]
    fn valid_trigger_is_active_until_the_window_ends() {
        let mut scheduler = AnimationScheduler::new(WINDOW);
        let t0 = Instant::now();
        let trigger = AnimationTrigger::new(["hoodAction"], false);

        let set = scheduler.on_trigger(&trigger, t0).unwrap();
        assert_eq!(set.names, vec!["hoodAction"]);
        assert_eq!(scheduler.next_deadline(), Some(t0 + WINDOW));

        assert!(!scheduler.poll_expiry(t0 + WINDOW - Duration::from_millis(1)));
        assert!(scheduler.active().is_some());
        assert!(scheduler.poll_expiry(t0 + WINDOW));
        assert!(scheduler.active().is_none());
        assert!(!scheduler.reverse());
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn object_and_empty_refs_normalize() {
        let mut scheduler = AnimationScheduler::new(WINDOW);
        let trigger = AnimationTrigger::from_payload(&json!({
            "animations": [{"name": "doorOpen"}, ""],
            "reverse": true
        }));

        let set = scheduler.on_trigger(&trigger, Instant::now()).unwrap();
        assert_eq!(set.names, vec!["doorOpen"]);
        assert!(scheduler.reverse());
    }

    #[test]
    fn empty_trigger_changes_nothing() {
        let mut scheduler = AnimationScheduler::new(WINDOW);
        let trigger = AnimationTrigger {
            animations: vec![AnimationRef::Name(String::new()), AnimationRef::Object { name: None }],
            reverse: true,
            can_id: None,
            data: None,
        };
        assert!(scheduler.on_trigger(&trigger, Instant::now()).is_none());
        assert!(scheduler.active().is_none());
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn empty_trigger_keeps_previous_set_and_deadline() {
        let mut scheduler = AnimationScheduler::new(WINDOW);
        let t0 = Instant::now();
        scheduler.on_trigger(&AnimationTrigger::new(["hoodAction"], false), t0);
        scheduler.on_trigger(
            &AnimationTrigger::new(Vec::<String>::new(), true),
            t0 + Duration::from_millis(500),
        );
        assert_eq!(scheduler.next_deadline(), Some(t0 + WINDOW));
        assert!(!scheduler.reverse());
    }

    #[test]
    fn new_trigger_replaces_set_and_deadline() {
        let mut scheduler = AnimationScheduler::new(WINDOW);
        let t0 = Instant::now();
        let t1 = t0 + Duration::from_millis(1500);
        scheduler.on_trigger(&AnimationTrigger::new(["Doors_LAction"], false), t0);
        scheduler.on_trigger(&AnimationTrigger::new(["Doors_RAction"], true), t1);

        // The first deadline no longer clears anything.
        assert!(!scheduler.poll_expiry(t0 + WINDOW));
        assert_eq!(scheduler.active().unwrap().names, vec!["Doors_RAction"]);
        assert!(scheduler.poll_expiry(t1 + WINDOW));
    }

    proptest! {
        #[test]
        fn deadline_is_always_window_after_last_valid_trigger(
            offsets in proptest::collection::vec(0u64..5000, 1..10)
        ) {
            let mut scheduler = AnimationScheduler::new(WINDOW);
            let t0 = Instant::now();
            let mut at = t0;
            for offset in offsets {
                at += Duration::from_millis(offset);
                scheduler.poll_expiry(at);
                scheduler.on_trigger(&AnimationTrigger::new(["hoodAction"], false), at);
                prop_assert_eq!(scheduler.next_deadline(), Some(at + WINDOW));
            }
        }
    }
}
