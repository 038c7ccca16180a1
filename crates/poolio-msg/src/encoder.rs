//! ---
//! poolio_section: "02-messaging-envelope"
//! poolio_subsection: "module"
//! poolio_type: "source"
//! poolio_scope: "code"
//! poolio_description: "Message envelope, payload schema, and validation primitives."
//! poolio_version: "v0.1.0"
//! poolio_owner: "tbd"
//! ---
//! Typed payload to wire JSON.
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::case::{translate_keys, KeyCase};
use crate::envelope::{create_envelope, EnvelopeHeader};
use crate::logging::{log_envelope, MessageDirection};
use crate::{MessagingError, Result};

/// Serialise `message` under `msg_type` into a compact envelope string.
///
/// Field names become camelCase except beneath opaque fields. `msg_type` is
/// not checked against the registry, so callers may send types this build
/// does not know yet. The timestamp defaults to the current local time.
pub fn encode_message<P>(
    message: &P,
    device_id: &str,
    msg_type: &str,
    timestamp: Option<&str>,
) -> Result<String>
where
    P: Serialize + ?Sized,
{
    if msg_type.is_empty() {
        return Err(MessagingError::EmptyMessageType);
    }
    let payload = match translate_keys(serde_json::to_value(message)?, KeyCase::Camel) {
        JsonValue::Object(map) => map,
        _ => {
            return Err(MessagingError::InvalidEnvelopeField {
                field: "payload",
                reason: "message must serialise to a JSON object".to_owned(),
            })
        }
    };
    let envelope = create_envelope(msg_type, device_id, payload, timestamp)?;
    log_envelope(MessageDirection::Outbound, envelope.header());
    envelope.to_json()
}

/// Header of an already-encoded message, for callers that want to log or route it.
pub fn peek_header(json: &str) -> Result<EnvelopeHeader> {
    crate::envelope::parse_envelope(json).map(|(header, _)| header)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;
    use serde_json::{json, Map};

    const TS: &str = "2026-01-20T14:30:00-08:00";

    fn pool_status() -> PoolStatus {
        PoolStatus {
            water_level: WaterLevel {
                float_switch: true,
                confidence: 0.95,
            },
            temperature: Temperature::fahrenheit(78.5),
            battery: Battery {
                voltage: 3.85,
                percentage: 72,
            },
            reporting_interval: 300,
        }
    }

    #[test]
    fn pool_status_wire_form() {
        let json = encode_message(&pool_status(), "pool-node-001", "pool_status", Some(TS))
            .expect("encode");
        insta::assert_snapshot!(json, @r#"{"version":2,"type":"pool_status","deviceId":"pool-node-001","timestamp":"2026-01-20T14:30:00-08:00","payload":{"waterLevel":{"floatSwitch":true,"confidence":0.95},"temperature":{"value":78.5,"unit":"fahrenheit"},"battery":{"voltage":3.85,"percentage":72},"reportingInterval":300}}"#);
    }

    #[test]
    fn command_parameters_keep_their_keys() {
        let mut parameters = Map::new();
        parameters.insert("retry_count".into(), json!(3));
        parameters.insert("maxDuration".into(), json!(540));
        let command = Command {
            command: "valve_start".into(),
            parameters,
            source: "cloud".into(),
        };
        let json = encode_message(&command, "valve-node-001", "command", Some(TS)).unwrap();
        let wire: JsonValue = serde_json::from_str(&json).unwrap();
        assert_eq!(
            wire["payload"]["parameters"],
            json!({"retry_count": 3, "maxDuration": 540})
        );
    }

    #[test]
    fn error_context_null_is_emitted() {
        let report = Error::new(ErrorCode::SensorReadFailure, "probe offline", Severity::Error);
        let json = encode_message(&report, "pool-node-001", "error", Some(TS)).unwrap();
        let wire: JsonValue = serde_json::from_str(&json).unwrap();
        let payload = wire["payload"].as_object().unwrap();
        assert_eq!(payload.get("context"), Some(&JsonValue::Null));
        assert_eq!(payload["errorCode"], json!("SENSOR_READ_FAILURE"));
    }

    #[test]
    fn payload_encode_uses_own_tag() {
        let payload: Payload = pool_status().into();
        let json = payload.encode("pool-node-001", Some(TS)).unwrap();
        let header = peek_header(&json).unwrap();
        assert_eq!(header.message_type(), "pool_status");
        assert_eq!(header.timestamp(), TS);
    }

    #[test]
    fn unregistered_type_tags_are_allowed() {
        let json = encode_message(&json!({"some_field": 1}), "pool-node-001", "future_type", Some(TS))
            .unwrap();
        assert!(json.contains(r#""type":"future_type""#));
        assert!(json.contains(r#""someField":1"#));
    }

    #[test]
    fn empty_type_and_bad_device_are_rejected() {
        assert!(matches!(
            encode_message(&pool_status(), "pool-node-001", "", Some(TS)),
            Err(MessagingError::EmptyMessageType)
        ));
        assert!(matches!(
            encode_message(&pool_status(), "Pool_Node", "pool_status", Some(TS)),
            Err(MessagingError::InvalidDeviceId { .. })
        ));
    }

    #[test]
    fn non_object_messages_are_rejected() {
        assert!(matches!(
            encode_message(&42, "pool-node-001", "pool_status", Some(TS)),
            Err(MessagingError::InvalidEnvelopeField { field: "payload", .. })
        ));
    }

    #[test]
    fn timestamp_defaults_to_now_without_fraction() {
        let json = encode_message(&pool_status(), "pool-node-001", "pool_status", None).unwrap();
        let header = peek_header(&json).unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(header.timestamp()).is_ok());
        assert!(!header.timestamp().contains('.'));
    }
}
