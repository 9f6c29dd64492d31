//! Decoded frame to animation trigger table.

use std::collections::HashMap;

use canview_core::events::AnimationTrigger;

const DOORS: &[&str] = &["Doors_LAction", "Doors_RAction"];
const HOOD: &[&str] = &["hoodAction"];
const CHROME: &[&str] = &["chromeAction"];

const DOOR_IDS: [&str; 4] = ["0x12c", "0x258", "0x320", "0x356"];
const HOOD_IDS: [&str; 4] = ["0x354", "0x2bc", "0x1f4", "0x190"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedAnimation {
    pub names: Vec<String>,
    pub reverse: bool,
}

/// Keyed by `(can_id, data hex)`, both lowercase.
#[derive(Debug, Clone, Default)]
pub struct AnimationMap {
    entries: HashMap<(String, String), MappedAnimation>,
}

impl AnimationMap {
    /// Door, hood and chrome mappings of the vehicle model.
    pub fn vehicle_defaults() -> Self {
        let mut map = Self::default();
        for id in DOOR_IDS {
            map.insert(id, "0000008000000000", DOORS, false);
            map.insert(id, "0000000000000000", DOORS, true);
        }
        for id in HOOD_IDS {
            map.insert(id, "00000004", HOOD, false);
            map.insert(id, "00000000", HOOD, true);
        }
        map.insert("0x403", "5a00000000000100", CHROME, false);
        map
    }

    pub fn insert(&mut self, can_id: &str, data: &str, names: &[&str], reverse: bool) {
        self.entries.insert(
            (can_id.to_lowercase(), data.to_lowercase()),
            MappedAnimation {
                names: names.iter().map(|n| n.to_string()).collect(),
                reverse,
            },
        );
    }

    pub fn lookup(&self, can_id: &str, data: &str) -> Option<&MappedAnimation> {
        self.entries.get(&(can_id.to_lowercase(), data.to_lowercase()))
    }

    /// Trigger for a decoded frame, carrying the frame as its source.
    pub fn trigger_for(&self, can_id: &str, data: &str) -> Option<AnimationTrigger> {
        self.lookup(can_id, data).map(|mapped| {
            AnimationTrigger::new(mapped.names.iter().cloned(), mapped.reverse)
                .with_source(can_id, data)
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn door_open_and_close() {
        let map = AnimationMap::vehicle_defaults();
        let open = map.lookup("0x12c", "0000008000000000").unwrap();
        assert_eq!(open.names, vec!["Doors_LAction", "Doors_RAction"]);
        assert!(!open.reverse);
        assert!(map.lookup("0x356", "0000000000000000").unwrap().reverse);
    }

    #[test]
    fn hood_and_chrome() {
        let map = AnimationMap::vehicle_defaults();
        assert_eq!(map.lookup("0x1f4", "00000004").unwrap().names, vec!["hoodAction"]);
        assert_eq!(
            map.lookup("0x403", "5A00000000000100").unwrap().names,
            vec!["chromeAction"]
        );
        assert_eq!(map.len(), 17);
    }

    #[test]
    fn trigger_carries_source() {
        let trigger = AnimationMap::vehicle_defaults()
            .trigger_for("0x2bc", "00000000")
            .unwrap();
        assert!(trigger.reverse);
        assert_eq!(trigger.can_id.as_deref(), Some("0x2bc"));
        assert_eq!(trigger.normalized_names(), vec!["hoodAction"]);
    }

    #[test]
    fn unmapped_frame() {
        assert!(AnimationMap::vehicle_defaults()
            .lookup("0x12c", "ffff")
            .is_none());
    }
}
