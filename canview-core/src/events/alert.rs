//! Security alerts raised by the frame monitor.

use serde_json::{json, Value};

pub const REPLAY_ATTACK: &str = "replay_attack";
pub const TAMPER_DETECTED: &str = "tamper_detected";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SecurityAlert {
    /// A frame arrived with a counter at or below the last accepted one.
    ReplayAttack {
        can_id: String,
        counter: u64,
        data: Option<String>,
    },
    /// A frame failed authentication or decoding.
    TamperDetected { error: String },
    /// A known alert type whose fields could not be read. The raw payload
    /// is kept so consumers can still show what arrived.
    Malformed {
        kind: String,
        reason: String,
        payload: Value,
    },
    /// Any other `type`, including a missing one.
    Unrecognized { kind: Option<String> },
}

impl SecurityAlert {
    pub fn from_payload(payload: &Value) -> Self {
        let kind = payload.get("type").and_then(Value::as_str);
        match kind {
            Some(REPLAY_ATTACK) => {
                let can_id = payload.get("can_id").and_then(Value::as_str);
                let counter = payload.get("counter").and_then(Value::as_u64);
                match (can_id, counter) {
                    (Some(can_id), Some(counter)) => Self::ReplayAttack {
                        can_id: can_id.to_string(),
                        counter,
                        data: payload
                            .get("data")
                            .and_then(Value::as_str)
                            .map(str::to_owned),
                    },
                    _ => Self::Malformed {
                        kind: REPLAY_ATTACK.into(),
                        reason: "expected string `can_id` and unsigned `counter`".into(),
                        payload: payload.clone(),
                    },
                }
            }
            Some(TAMPER_DETECTED) => match payload.get("error") {
                Some(Value::String(error)) => Self::TamperDetected {
                    error: error.clone(),
                },
                Some(other) if !other.is_null() => Self::TamperDetected {
                    error: other.to_string(),
                },
                _ => Self::Malformed {
                    kind: TAMPER_DETECTED.into(),
                    reason: "missing `error`".into(),
                    payload: payload.clone(),
                },
            },
            other => Self::Unrecognized {
                kind: other.map(str::to_owned),
            },
        }
    }

    pub fn to_payload(&self) -> Value {
        match self {
            Self::ReplayAttack {
                can_id,
                counter,
                data,
            } => {
                let mut payload = json!({
                    "type": REPLAY_ATTACK,
                    "can_id": can_id,
                    "counter": counter,
                });
                if let Some(data) = data {
                    payload["data"] = Value::String(data.clone());
                }
                payload
            }
            Self::TamperDetected { error } => json!({ "type": TAMPER_DETECTED, "error": error }),
            Self::Malformed { payload, .. } => payload.clone(),
            Self::Unrecognized { kind } => json!({ "type": kind }),
        }
    }

    /// Display text of a payload field: strings verbatim, other JSON values
    /// serialized, `unknown` when absent or null.
    pub fn field_text(&self, key: &str) -> String {
        let value = match self {
            Self::ReplayAttack {
                can_id, counter, ..
            } => match key {
                "can_id" => return can_id.clone(),
                "counter" => return counter.to_string(),
                _ => None,
            },
            Self::TamperDetected { error } if key == "error" => return error.clone(),
            Self::Malformed { payload, .. } => payload.get(key),
            _ => None,
        };
        match value {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => "unknown".to_string(),
            Some(other) => other.to_string(),
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::ReplayAttack { .. } => REPLAY_ATTACK,
            Self::TamperDetected { .. } => TAMPER_DETECTED,
            Self::Malformed { kind, .. } => kind,
            Self::Unrecognized { kind } => kind.as_deref().unwrap_or("<none>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_replay_attack() {
        let alert = SecurityAlert::from_payload(&json!({
            "type": "replay_attack",
            "can_id": "0x12c",
            "data": "0000008000000000",
            "counter": 41
        }));
        assert_eq!(
            alert,
            SecurityAlert::ReplayAttack {
                can_id: "0x12c".into(),
                counter: 41,
                data: Some("0000008000000000".into()),
            }
        );
    }

    #[test]
    fn reads_tamper_detected() {
        let alert =
            SecurityAlert::from_payload(&json!({"type": "tamper_detected", "error": "CRC mismatch"}));
        assert_eq!(
            alert,
            SecurityAlert::TamperDetected {
                error: "CRC mismatch".into()
            }
        );
    }

    #[test]
    fn replay_without_counter_is_malformed() {
        let alert = SecurityAlert::from_payload(&json!({"type": "replay_attack", "can_id": "0x12c"}));
        assert!(matches!(alert, SecurityAlert::Malformed { .. }));
    }

    #[test]
    fn malformed_alert_keeps_readable_fields() {
        let alert = SecurityAlert::from_payload(&json!({
            "type": "replay_attack",
            "can_id": 300,
            "counter": "7"
        }));
        assert_eq!(alert.kind(), "replay_attack");
        assert_eq!(alert.field_text("can_id"), "300");
        assert_eq!(alert.field_text("counter"), "7");
        assert_eq!(alert.field_text("data"), "unknown");
    }

    #[test]
    fn unknown_and_missing_types_are_unrecognized() {
        assert_eq!(
            SecurityAlert::from_payload(&json!({"type": "dos"})),
            SecurityAlert::Unrecognized {
                kind: Some("dos".into())
            }
        );
        assert_eq!(
            SecurityAlert::from_payload(&json!({})),
            SecurityAlert::Unrecognized { kind: None }
        );
    }

    #[test]
    fn payload_roundtrip_preserves_alert() {
        let alert = SecurityAlert::ReplayAttack {
            can_id: "0x258".into(),
            counter: 3,
            data: None,
        };
        assert_eq!(SecurityAlert::from_payload(&alert.to_payload()), alert);
    }
}
