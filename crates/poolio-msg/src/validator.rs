//! ---
//! poolio_section: "02-messaging-envelope"
//! poolio_subsection: "module"
//! poolio_type: "source"
//! poolio_scope: "code"
//! poolio_description: "Message envelope, payload schema, and validation primitives."
//! poolio_version: "v0.1.0"
//! poolio_owner: "tbd"
//! ---
//! Screening of untrusted inbound messages.
//!
//! Every check returns a [`ValidationOutcome`] instead of failing fast so that a
//! caller can report all problems with a message at once. These checks keep
//! their own required-field table and never touch the typed registry.
use chrono::{DateTime, Datelike, Utc};
use poolio_common::config::ValidationConfig;
use serde_json::{Map, Value as JsonValue};
use std::time::Duration;

use crate::envelope::ENVELOPE_FIELDS;

/// Upper bound on the UTF-8 size of a wire message.
pub const MAX_MESSAGE_SIZE_BYTES: usize = 4096;
/// Maximum age of time-sensitive messages.
pub const COMMAND_MAX_AGE_SECONDS: i64 = 300;
/// Maximum age of reports and events.
pub const STATUS_MAX_AGE_SECONDS: i64 = 900;
/// Clock skew tolerated for timestamps ahead of the receiver.
pub const MAX_FUTURE_SECONDS: i64 = 60;

/// Types held to the shorter freshness window.
pub const COMMAND_TYPES: [&str; 3] = ["command", "command_response", "config_update"];

/// Required top-level wire fields per message type.
pub const PAYLOAD_REQUIRED_FIELDS: [(&str, &[&str]); 9] = [
    (
        "pool_status",
        &["waterLevel", "temperature", "battery", "reportingInterval"],
    ),
    ("valve_status", &["valve", "schedule", "temperature"]),
    ("display_status", &["localTemperature", "localHumidity"]),
    (
        "fill_start",
        &["fillStartTime", "scheduledEndTime", "maxDuration", "trigger"],
    ),
    ("fill_stop", &["fillStopTime", "actualDuration", "reason"]),
    ("command", &["command", "parameters", "source"]),
    ("command_response", &["commandTimestamp", "command", "status"]),
    ("error", &["errorCode", "errorMessage", "severity", "context"]),
    ("config_update", &["configKey", "configValue", "source"]),
];

const MIN_OFFSET_SECONDS: i32 = -12 * 3600;
const MAX_OFFSET_SECONDS: i32 = 14 * 3600;

/// `(valid, errors)`; `valid` is true exactly when `errors` is empty.
pub type ValidationOutcome = (bool, Vec<ValidationError>);

/// One reason a message failed screening.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Wire size above the limit.
    #[error("Message size {size} bytes exceeds maximum {limit} bytes")]
    MessageTooLarge {
        /// Observed UTF-8 length.
        size: usize,
        /// Configured limit.
        limit: usize,
    },
    /// Not parseable as JSON.
    #[error("Invalid JSON: {0}")]
    MalformedJson(String),
    /// A required envelope field is absent.
    #[error("Envelope missing required field: {0}")]
    MissingEnvelopeField(&'static str),
    /// An envelope field has the wrong JSON type.
    #[error("Envelope field '{field}' is invalid: {reason}")]
    InvalidEnvelopeField {
        /// Wire name of the field.
        field: &'static str,
        /// Expected shape.
        reason: &'static str,
    },
    /// The `type` tag has no required-field entry.
    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),
    /// A required top-level payload field is absent.
    #[error("Payload missing required field '{field}' for {message_type}")]
    MissingPayloadField {
        /// Declared type tag.
        message_type: String,
        /// Missing wire field.
        field: &'static str,
    },
    /// Timestamp is not ISO-8601 with an offset, predates 1970, or has an
    /// offset outside UTC-12:00..UTC+14:00.
    #[error("Invalid timestamp format: {0}")]
    InvalidTimestampFormat(String),
    /// Timestamp is ahead of the receiver by more than the skew tolerance.
    #[error("Message timestamp is {ahead_secs} seconds in the future (max allowed: {max_secs})")]
    MessageFromFuture {
        /// Seconds ahead of the receiver clock.
        ahead_secs: i64,
        /// Tolerance.
        max_secs: i64,
    },
    /// Timestamp is older than the type's freshness window.
    #[error("Message timestamp is {age_secs} seconds old (max allowed: {max_secs} seconds)")]
    MessageTooOld {
        /// Age at the receiver.
        age_secs: i64,
        /// Window for this type.
        max_secs: i64,
    },
}

impl ValidationError {
    /// Stable snake_case kind, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::MessageTooLarge { .. } => "message_too_large",
            ValidationError::MalformedJson(_) => "malformed_json",
            ValidationError::MissingEnvelopeField(_) => "missing_envelope_field",
            ValidationError::InvalidEnvelopeField { .. } => "invalid_envelope_field",
            ValidationError::UnknownMessageType(_) => "unknown_message_type",
            ValidationError::MissingPayloadField { .. } => "missing_payload_field",
            ValidationError::InvalidTimestampFormat(_) => "invalid_timestamp_format",
            ValidationError::MessageFromFuture { .. } => "message_from_future",
            ValidationError::MessageTooOld { .. } => "message_too_old",
        }
    }
}

fn outcome(errors: Vec<ValidationError>) -> ValidationOutcome {
    (errors.is_empty(), errors)
}

fn seconds(duration: Duration) -> i64 {
    i64::try_from(duration.as_secs()).unwrap_or(i64::MAX)
}

/// Required top-level wire fields for a type tag.
pub fn required_payload_fields(msg_type: &str) -> Option<&'static [&'static str]> {
    PAYLOAD_REQUIRED_FIELDS
        .iter()
        .find(|(tag, _)| *tag == msg_type)
        .map(|(_, fields)| *fields)
}

/// Parse an ISO-8601 timestamp with offset into Unix seconds.
///
/// Accepts `YYYY-MM-DDTHH:MM:SS[.fff](Z|±HH:MM)` only. Fractional seconds are
/// truncated. Instants before the Unix epoch, leap seconds and offsets outside
/// UTC-12:00..UTC+14:00 yield `None`.
pub fn parse_timestamp(timestamp: &str) -> Option<i64> {
    if !has_strict_shape(timestamp) {
        return None;
    }
    let parsed = DateTime::parse_from_rfc3339(timestamp).ok()?;
    if parsed.year() < 1970 || parsed.timestamp() < 0 {
        return None;
    }
    let offset = parsed.offset().local_minus_utc();
    if !(MIN_OFFSET_SECONDS..=MAX_OFFSET_SECONDS).contains(&offset) {
        return None;
    }
    Some(parsed.timestamp())
}

// Digits and separators in place, uppercase `T`/`Z`, second and offset minute below 60.
fn has_strict_shape(timestamp: &str) -> bool {
    let bytes = timestamp.as_bytes();
    if bytes.len() < 20 {
        return false;
    }
    let digits = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);
    let date_time = digits(0..4)
        && bytes[4] == b'-'
        && digits(5..7)
        && bytes[7] == b'-'
        && digits(8..10)
        && bytes[10] == b'T'
        && digits(11..13)
        && bytes[13] == b':'
        && digits(14..16)
        && bytes[16] == b':'
        && digits(17..19)
        && bytes[17] < b'6';
    if !date_time {
        return false;
    }

    let mut rest = &bytes[19..];
    if let Some(fraction) = rest.strip_prefix(b".") {
        let len = fraction.iter().take_while(|b| b.is_ascii_digit()).count();
        if len == 0 {
            return false;
        }
        rest = &fraction[len..];
    }
    match rest {
        [b'Z'] => true,
        [sign, h1, h2, b':', m1, m2] => {
            matches!(*sign, b'+' | b'-')
                && [h1, h2, m1, m2].iter().all(|b| b.is_ascii_digit())
                && *m1 < b'6'
        }
        _ => false,
    }
}

/// Screening policy. [`Validator::default`] applies the protocol limits.
#[derive(Debug, Clone)]
pub struct Validator {
    max_message_bytes: usize,
    command_max_age: i64,
    status_max_age: i64,
    max_future_skew: i64,
}

impl Default for Validator {
    fn default() -> Self {
        Self {
            max_message_bytes: MAX_MESSAGE_SIZE_BYTES,
            command_max_age: COMMAND_MAX_AGE_SECONDS,
            status_max_age: STATUS_MAX_AGE_SECONDS,
            max_future_skew: MAX_FUTURE_SECONDS,
        }
    }
}

impl Validator {
    /// Policy taken from configuration.
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            max_message_bytes: config.max_message_bytes,
            command_max_age: seconds(config.command_max_age),
            status_max_age: seconds(config.status_max_age),
            max_future_skew: seconds(config.max_future_skew),
        }
    }

    /// Freshness window applied to `msg_type`, in seconds.
    pub fn max_age_for(&self, msg_type: &str) -> i64 {
        if COMMAND_TYPES.contains(&msg_type) {
            self.command_max_age
        } else {
            self.status_max_age
        }
    }

    /// Byte-size bound.
    pub fn check_size(&self, json: &str) -> ValidationOutcome {
        let size = json.len();
        if size > self.max_message_bytes {
            return outcome(vec![ValidationError::MessageTooLarge {
                size,
                limit: self.max_message_bytes,
            }]);
        }
        outcome(Vec::new())
    }

    /// Presence of every envelope field; absence is the only failure.
    pub fn check_envelope(&self, envelope: &Map<String, JsonValue>) -> ValidationOutcome {
        outcome(
            ENVELOPE_FIELDS
                .iter()
                .copied()
                .filter(|field| !envelope.contains_key(*field))
                .map(|field| ValidationError::MissingEnvelopeField(field))
                .collect(),
        )
    }

    /// Presence of the top-level required fields for `msg_type`.
    pub fn check_payload(&self, msg_type: &str, payload: &Map<String, JsonValue>) -> ValidationOutcome {
        let Some(required) = required_payload_fields(msg_type) else {
            return outcome(vec![ValidationError::UnknownMessageType(msg_type.to_owned())]);
        };
        outcome(
            required
                .iter()
                .copied()
                .filter(|field| !payload.contains_key(*field))
                .map(|field| ValidationError::MissingPayloadField {
                    message_type: msg_type.to_owned(),
                    field,
                })
                .collect(),
        )
    }

    /// Replay and clock-skew screen. `current_time` defaults to now, in Unix seconds.
    pub fn check_freshness(
        &self,
        timestamp: &str,
        msg_type: &str,
        current_time: Option<i64>,
    ) -> ValidationOutcome {
        let Some(sent) = parse_timestamp(timestamp) else {
            return outcome(vec![ValidationError::InvalidTimestampFormat(
                timestamp.to_owned(),
            )]);
        };
        let now = current_time.unwrap_or_else(|| Utc::now().timestamp());
        let age = now.saturating_sub(sent);
        if age < -self.max_future_skew {
            return outcome(vec![ValidationError::MessageFromFuture {
                ahead_secs: age.saturating_neg(),
                max_secs: self.max_future_skew,
            }]);
        }
        let max_age = self.max_age_for(msg_type);
        if age > max_age {
            return outcome(vec![ValidationError::MessageTooOld {
                age_secs: age,
                max_secs: max_age,
            }]);
        }
        outcome(Vec::new())
    }

    /// Full screen of a raw message: size, JSON, envelope, payload, freshness.
    ///
    /// Stops after a size or JSON failure; otherwise every failure is collected.
    pub fn check(&self, json: &str, current_time: Option<i64>) -> ValidationOutcome {
        let (ok, errors) = self.check_size(json);
        if !ok {
            return (ok, errors);
        }
        let document: JsonValue = match serde_json::from_str(json) {
            Ok(document) => document,
            Err(err) => return outcome(vec![ValidationError::MalformedJson(err.to_string())]),
        };
        let empty = Map::new();
        let envelope = document.as_object().unwrap_or(&empty);

        let (_, mut errors) = self.check_envelope(envelope);
        let message_type = match envelope.get("type") {
            Some(JsonValue::String(tag)) => Some(tag.as_str()),
            Some(_) => {
                errors.push(ValidationError::InvalidEnvelopeField {
                    field: "type",
                    reason: "expected a string",
                });
                None
            }
            None => None,
        };
        match (message_type, envelope.get("payload")) {
            (Some(tag), Some(JsonValue::Object(payload))) => {
                errors.extend(self.check_payload(tag, payload).1)
            }
            (_, Some(JsonValue::Object(_))) | (_, None) => {}
            (_, Some(_)) => errors.push(ValidationError::InvalidEnvelopeField {
                field: "payload",
                reason: "expected an object",
            }),
        }
        match envelope.get("timestamp") {
            Some(JsonValue::String(ts)) => {
                errors.extend(self.check_freshness(ts, message_type.unwrap_or(""), current_time).1)
            }
            Some(_) => errors.push(ValidationError::InvalidEnvelopeField {
                field: "timestamp",
                reason: "expected a string",
            }),
            None => {}
        }
        outcome(errors)
    }
}

/// Fails when `json` exceeds 4096 UTF-8 bytes.
pub fn validate_message_size(json: &str) -> ValidationOutcome {
    Validator::default().check_size(json)
}

/// Reports every absent envelope field of an already-parsed map.
pub fn validate_envelope(envelope: &Map<String, JsonValue>) -> ValidationOutcome {
    Validator::default().check_envelope(envelope)
}

/// Reports every absent required top-level payload field (camelCase keys).
/// Present-but-null satisfies the check.
pub fn validate_payload(msg_type: &str, payload: &Map<String, JsonValue>) -> ValidationOutcome {
    Validator::default().check_payload(msg_type, payload)
}

/// Age and skew check against `current_time` (Unix seconds, default now).
pub fn validate_timestamp_freshness(
    timestamp: &str,
    msg_type: &str,
    current_time: Option<i64>,
) -> ValidationOutcome {
    Validator::default().check_freshness(timestamp, msg_type, current_time)
}

/// Every check in screening order under the protocol limits.
pub fn validate_message(json: &str, current_time: Option<i64>) -> ValidationOutcome {
    Validator::default().check(json, current_time)
}
