//! ---
//! poolio_section: "02-messaging-envelope"
//! poolio_subsection: "module"
//! poolio_type: "source"
//! poolio_scope: "code"
//! poolio_description: "Message envelope, payload schema, and validation primitives."
//! poolio_version: "v0.1.0"
//! poolio_owner: "tbd"
//! ---
//! The fixed five-field transport wrapper.
use poolio_common::time::{iso8601_seconds, Clock, SystemClock};
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::types::MessageType;
use crate::{MessagingError, Result};

/// Protocol version stamped on every outbound envelope.
pub const PROTOCOL_VERSION: u32 = 2;

/// Wire names of the envelope fields, in emission order.
pub const ENVELOPE_FIELDS: [&str; 5] = ["version", "type", "deviceId", "timestamp", "payload"];

/// Longest accepted device identifier.
pub const MAX_DEVICE_ID_LEN: usize = 64;

/// Check a device identifier against `^[a-z0-9-]{1,64}$`.
pub fn validate_device_id(device_id: &str) -> Result<()> {
    let reject = |reason| {
        Err(MessagingError::InvalidDeviceId {
            device_id: device_id.to_owned(),
            reason,
        })
    };
    if device_id.is_empty() || device_id.len() > MAX_DEVICE_ID_LEN {
        return reject("must be 1-64 characters");
    }
    if !device_id
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return reject("must contain only lowercase letters, digits, and hyphens");
    }
    Ok(())
}

/// Envelope metadata without the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeHeader {
    version: u32,
    message_type: String,
    device_id: String,
    timestamp: String,
}

impl EnvelopeHeader {
    /// Protocol version the sender used.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Raw `type` tag.
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// `type` tag resolved against the registry, if known.
    pub fn known_type(&self) -> Option<MessageType> {
        MessageType::from_tag(&self.message_type)
    }

    /// Sender identifier.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// ISO-8601 send time, verbatim.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

/// A complete envelope: header plus camelCase payload object.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    header: EnvelopeHeader,
    payload: Map<String, JsonValue>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope<'a> {
    version: u32,
    #[serde(rename = "type")]
    message_type: &'a str,
    device_id: &'a str,
    timestamp: &'a str,
    payload: &'a Map<String, JsonValue>,
}

impl Envelope {
    /// Metadata fields.
    pub fn header(&self) -> &EnvelopeHeader {
        &self.header
    }

    /// Payload object, keys already in wire casing.
    pub fn payload(&self) -> &Map<String, JsonValue> {
        &self.payload
    }

    /// Serialise with compact separators.
    pub fn to_json(&self) -> Result<String> {
        let wire = WireEnvelope {
            version: self.header.version,
            message_type: &self.header.message_type,
            device_id: &self.header.device_id,
            timestamp: &self.header.timestamp,
            payload: &self.payload,
        };
        Ok(serde_json::to_string(&wire)?)
    }
}

/// Build an envelope, stamping the current local time when `timestamp` is `None`.
pub fn create_envelope(
    message_type: &str,
    device_id: &str,
    payload: Map<String, JsonValue>,
    timestamp: Option<&str>,
) -> Result<Envelope> {
    create_envelope_at(message_type, device_id, payload, timestamp, &SystemClock)
}

/// Like [`create_envelope`], reading the default timestamp from `clock`.
pub fn create_envelope_at(
    message_type: &str,
    device_id: &str,
    payload: Map<String, JsonValue>,
    timestamp: Option<&str>,
    clock: &dyn Clock,
) -> Result<Envelope> {
    validate_device_id(device_id)?;
    let timestamp = match timestamp {
        Some(ts) => ts.to_owned(),
        None => iso8601_seconds(&clock.now()),
    };
    Ok(Envelope {
        header: EnvelopeHeader {
            version: PROTOCOL_VERSION,
            message_type: message_type.to_owned(),
            device_id: device_id.to_owned(),
            timestamp,
        },
        payload,
    })
}

/// Parse a wire message into its header and the raw (camelCase) payload object.
///
/// Every absent envelope field is reported at once. The payload's inner shape is
/// not checked here.
pub fn parse_envelope(json: &str) -> Result<(EnvelopeHeader, Map<String, JsonValue>)> {
    let value: JsonValue = serde_json::from_str(json).map_err(MessagingError::MalformedJson)?;
    let JsonValue::Object(mut data) = value else {
        return Err(MessagingError::MissingEnvelopeField(ENVELOPE_FIELDS.to_vec()));
    };

    let missing: Vec<&'static str> = ENVELOPE_FIELDS
        .iter()
        .copied()
        .filter(|field| !data.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        return Err(MessagingError::MissingEnvelopeField(missing));
    }

    let version = data
        .get("version")
        .and_then(JsonValue::as_u64)
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| invalid_field("version", "expected a non-negative integer"))?;
    let message_type = string_field(&data, "type")?;
    let device_id = string_field(&data, "deviceId")?;
    let timestamp = string_field(&data, "timestamp")?;
    let payload = match data.remove("payload") {
        Some(JsonValue::Object(payload)) => payload,
        _ => return Err(invalid_field("payload", "expected an object")),
    };

    Ok((
        EnvelopeHeader {
            version,
            message_type,
            device_id,
            timestamp,
        },
        payload,
    ))
}

fn string_field(data: &Map<String, JsonValue>, field: &'static str) -> Result<String> {
    data.get(field)
        .and_then(JsonValue::as_str)
        .map(str::to_owned)
        .ok_or_else(|| invalid_field(field, "expected a string"))
}

fn invalid_field(field: &'static str, reason: &str) -> MessagingError {
    MessagingError::InvalidEnvelopeField {
        field,
        reason: reason.to_owned(),
    }
}
