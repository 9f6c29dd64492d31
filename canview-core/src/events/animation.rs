//! Animation trigger payloads and name normalization.

use std::collections::HashSet;

use serde_json::{json, Map, Value};

/// One entry of a trigger's `animations` list: a bare clip name or an
/// object exposing a `name` field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnimationRef {
    Name(String),
    Object { name: Option<String> },
}

impl AnimationRef {
    /// Returns `None` for entries that cannot name a clip (numbers, arrays, null).
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) => Some(Self::Name(name.clone())),
            Value::Object(map) => Some(Self::Object {
                name: map.get("name").and_then(Value::as_str).map(str::to_owned),
            }),
            _ => None,
        }
    }

    /// Clip name, if this entry carries a non-empty one.
    pub fn name(&self) -> Option<&str> {
        let name = match self {
            Self::Name(name) => Some(name.as_str()),
            Self::Object { name } => name.as_deref(),
        };
        name.filter(|n| !n.is_empty())
    }
}

impl From<&str> for AnimationRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// Unwraps object entries, drops empty ones and removes later duplicates,
/// keeping the order of first occurrence.
pub fn normalize_animation_names(refs: &[AnimationRef]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(refs.len());
    refs.iter()
        .filter_map(AnimationRef::name)
        .filter(|name| seen.insert(*name))
        .map(str::to_owned)
        .collect()
}

/// Request to play a set of clips in one direction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimationTrigger {
    pub animations: Vec<AnimationRef>,
    pub reverse: bool,
    /// CAN identifier of the frame that caused the trigger, when known.
    pub can_id: Option<String>,
    /// Hex payload of that frame.
    pub data: Option<String>,
}

impl AnimationTrigger {
    pub fn new<I, S>(names: I, reverse: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            animations: names
                .into_iter()
                .map(|n| AnimationRef::Name(n.into()))
                .collect(),
            reverse,
            can_id: None,
            data: None,
        }
    }

    pub fn with_source(mut self, can_id: impl Into<String>, data: impl Into<String>) -> Self {
        self.can_id = Some(can_id.into());
        self.data = Some(data.into());
        self
    }

    /// Lenient decode: a missing or non-list `animations` field yields an
    /// empty trigger, a non-bool `reverse` reads as `false`.
    pub fn from_payload(payload: &Value) -> Self {
        let animations = payload
            .get("animations")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(AnimationRef::from_value).collect())
            .unwrap_or_default();

        Self {
            animations,
            reverse: payload
                .get("reverse")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            can_id: payload
                .get("can_id")
                .and_then(Value::as_str)
                .map(str::to_owned),
            data: payload
                .get("data")
                .and_then(Value::as_str)
                .map(str::to_owned),
        }
    }

    pub fn to_payload(&self) -> Value {
        let animations: Vec<Value> = self
            .animations
            .iter()
            .map(|entry| match entry {
                AnimationRef::Name(name) => Value::String(name.clone()),
                AnimationRef::Object { name } => json!({ "name": name }),
            })
            .collect();

        let mut payload = Map::new();
        payload.insert("animations".into(), Value::Array(animations));
        payload.insert("reverse".into(), Value::Bool(self.reverse));
        if let Some(can_id) = &self.can_id {
            payload.insert("can_id".into(), Value::String(can_id.clone()));
        }
        if let Some(data) = &self.data {
            payload.insert("data".into(), Value::String(data.clone()));
        }
        Value::Object(payload)
    }

    pub fn normalized_names(&self) -> Vec<String> {
        normalize_animation_names(&self.animations)
    }
}
