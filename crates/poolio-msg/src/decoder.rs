//! ---
//! poolio_section: "02-messaging-envelope"
//! poolio_subsection: "module"
//! poolio_type: "source"
//! poolio_scope: "code"
//! poolio_description: "Message envelope, payload schema, and validation primitives."
//! poolio_version: "v0.1.0"
//! poolio_owner: "tbd"
//! ---
//! Wire JSON back to typed payloads.
use serde_json::Value as JsonValue;

use crate::case::{translate_keys, KeyCase};
use crate::envelope::{parse_envelope, EnvelopeHeader};
use crate::logging::{log_envelope, MessageDirection};
use crate::registry;
use crate::types::Payload;
use crate::{MessagingError, Result};

/// Decode a wire message into its typed payload.
///
/// Fails on malformed JSON, missing envelope fields, an unregistered `type`,
/// or missing required payload fields (nested ones included). Timestamp
/// freshness is not checked; use the validator for that.
pub fn decode_message(json: &str) -> Result<Payload> {
    decode_envelope(json).map(|(_, payload)| payload)
}

/// Like [`decode_message`], also returning the envelope header.
pub fn decode_envelope(json: &str) -> Result<(EnvelopeHeader, Payload)> {
    let (header, raw) = parse_envelope(json)?;
    let (message_type, shape) = registry::lookup(header.message_type())?;
    log_envelope(MessageDirection::Inbound, &header);

    let data = translate_keys(JsonValue::Object(raw), KeyCase::Snake);
    if let JsonValue::Object(map) = &data {
        let missing = registry::missing_fields(shape, map);
        if !missing.is_empty() {
            return Err(MessagingError::MissingPayloadField {
                message_type,
                fields: missing,
            });
        }
    }
    let payload = registry::instantiate(message_type, data)?;
    Ok((header, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode_message;
    use crate::types::*;
    use serde_json::{json, Map};

    const TS: &str = "2026-01-20T14:30:00-08:00";

    fn round_trip(payload: Payload) {
        let json = payload.encode("pool-node-001", Some(TS)).expect("encode");
        let (header, decoded) = decode_envelope(&json).expect("decode");
        assert_eq!(header.message_type(), payload.message_type().as_str());
        assert_eq!(decoded, payload);
    }

    #[test]
    fn status_messages_round_trip() {
        round_trip(
            PoolStatus {
                water_level: WaterLevel {
                    float_switch: false,
                    confidence: 0.5,
                },
                temperature: Temperature::celsius(24.0),
                battery: Battery {
                    voltage: 3.3,
                    percentage: 10,
                },
                reporting_interval: 60,
            }
            .into(),
        );
        round_trip(
            ValveStatus {
                valve: ValveState {
                    state: ValvePosition::Open,
                    is_filling: true,
                    current_fill_duration: 120,
                    max_fill_duration: 540,
                },
                schedule: ScheduleInfo {
                    enabled: true,
                    start_time: "09:00".into(),
                    window_hours: 2,
                    next_scheduled_fill: Some("2026-01-21T09:00:00-08:00".into()),
                },
                temperature: Temperature::fahrenheit(71.2),
            }
            .into(),
        );
        round_trip(
            DisplayStatus {
                local_temperature: Temperature::fahrenheit(70.0),
                local_humidity: Humidity::percent(40.0),
            }
            .into(),
        );
    }

    #[test]
    fn event_and_control_messages_round_trip() {
        round_trip(
            FillStart {
                fill_start_time: TS.into(),
                scheduled_end_time: "2026-01-20T14:39:00-08:00".into(),
                max_duration: 540,
                trigger: FillTrigger::LowWater,
            }
            .into(),
        );
        round_trip(
            FillStop {
                fill_stop_time: TS.into(),
                actual_duration: 42,
                reason: FillStopReason::MaxDuration,
            }
            .into(),
        );
        let mut parameters = Map::new();
        parameters.insert("retry_count".into(), json!(2));
        round_trip(
            Command {
                command: "valve_start".into(),
                parameters: parameters.clone(),
                source: "cloud".into(),
            }
            .into(),
        );
        round_trip(
            CommandResponse::failure(
                TS,
                "valve_start",
                CommandStatus::Failed,
                ErrorCode::ValveHardwareFailure,
                "solenoid stuck",
            )
            .into(),
        );
        round_trip(
            Error::new(ErrorCode::BusI2cFailure, "bus hung", Severity::Critical)
                .with_context(parameters)
                .into(),
        );
        round_trip(
            ConfigUpdate {
                config_key: "window_hours".into(),
                config_value: json!({"weekday": 2, "weekend": 3}),
                source: ConfigSource::Local,
            }
            .into(),
        );
    }

    #[test]
    fn opaque_keys_survive_decoding() {
        let json = r#"{"version":2,"type":"error","deviceId":"pool-node-001","timestamp":"2026-01-20T14:30:00-08:00",
            "payload":{"errorCode":"SENSOR_READ_FAILURE","errorMessage":"x","severity":"error","context":{"sensorType":"temp"}}}"#;
        let Payload::Error(report) = decode_message(json).unwrap() else {
            panic!("expected error payload");
        };
        let context = report.context.expect("context");
        assert_eq!(context.get("sensorType"), Some(&json!("temp")));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let json = encode_message(&json!({}), "pool-node-001", "bogus_type", Some(TS)).unwrap();
        assert!(matches!(
            decode_message(&json),
            Err(MessagingError::UnknownMessageType(tag)) if tag == "bogus_type"
        ));
    }

    #[test]
    fn missing_nested_fields_are_listed_by_path() {
        let json = r#"{"version":2,"type":"pool_status","deviceId":"pool-node-001","timestamp":"2026-01-20T14:30:00-08:00",
            "payload":{"waterLevel":{"floatSwitch":true},"temperature":{"value":70},"battery":{"voltage":3.7,"percentage":50}}}"#;
        match decode_message(json).unwrap_err() {
            MessagingError::MissingPayloadField {
                message_type,
                fields,
            } => {
                assert_eq!(message_type, MessageType::PoolStatus);
                assert_eq!(fields, vec!["waterLevel.confidence", "reportingInterval"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn wide_integers_and_null_units_decode() {
        let json = r#"{"version":2,"type":"pool_status","deviceId":"pool-node-001","timestamp":"2026-01-20T14:30:00-08:00",
            "payload":{"waterLevel":{"floatSwitch":true,"confidence":0.9},"temperature":{"value":70,"unit":null},"battery":{"voltage":3.7,"percentage":300},"reportingInterval":300}}"#;
        let Payload::PoolStatus(status) = decode_message(json).unwrap() else {
            panic!("expected pool_status");
        };
        assert_eq!(status.battery.percentage, 300);
        assert_eq!(status.temperature.unit, "fahrenheit");
    }

    #[test]
    fn optional_fields_may_be_omitted() {
        let json = r#"{"version":2,"type":"command_response","deviceId":"valve-node-001","timestamp":"2026-01-20T14:30:00-08:00",
            "payload":{"commandTimestamp":"2026-01-20T14:29:58-08:00","command":"valve_stop","status":"success"}}"#;
        let Payload::CommandResponse(response) = decode_message(json).unwrap() else {
            panic!("expected command_response payload");
        };
        assert_eq!(response.status, CommandStatus::Success);
        assert!(response.error_code.is_none());
    }

    #[test]
    fn wrongly_typed_values_are_invalid_payloads() {
        let json = r#"{"version":2,"type":"fill_stop","deviceId":"valve-node-001","timestamp":"2026-01-20T14:30:00-08:00",
            "payload":{"fillStopTime":"2026-01-20T14:30:00-08:00","actualDuration":"long","reason":"manual"}}"#;
        assert!(matches!(
            decode_message(json),
            Err(MessagingError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn envelope_errors_surface_first() {
        assert!(matches!(
            decode_message("not json"),
            Err(MessagingError::MalformedJson(_))
        ));
        assert!(matches!(
            decode_message(r#"{"type":"command"}"#),
            Err(MessagingError::MissingEnvelopeField(_))
        ));
    }
}
