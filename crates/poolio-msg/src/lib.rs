//! ---
//! poolio_section: "02-messaging-envelope"
//! poolio_subsection: "module"
//! poolio_type: "source"
//! poolio_scope: "code"
//! poolio_description: "Message envelope, payload schema, and validation primitives."
//! poolio_version: "v0.1.0"
//! poolio_owner: "tbd"
//! ---
//! Wire protocol shared by every Poolio node.
//!
//! Outbound messages are built from typed payloads by [`encode_message`], which
//! renames fields to camelCase and wraps them in the five-field [`Envelope`].
//! Inbound messages are screened by the [`validator`] functions (cheap, batch,
//! non-throwing) and then turned back into typed payloads by [`decode_message`].
#![warn(missing_docs)]

pub mod case;
pub mod decoder;
pub mod encoder;
pub mod envelope;
pub mod inbound;
pub mod logging;
pub mod registry;
pub mod types;
pub mod validator;

/// Shared result type for the fail-fast codec paths.
pub type Result<T> = std::result::Result<T, MessagingError>;

/// Failures raised by the envelope codec, encoder, decoder and inbound pipeline.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    /// Input could not be parsed as JSON.
    #[error("invalid JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),
    /// One or more of the five envelope fields are absent.
    #[error("envelope missing required field(s): {}", .0.join(", "))]
    MissingEnvelopeField(Vec<&'static str>),
    /// An envelope field is present but holds the wrong JSON type.
    #[error("envelope field `{field}` is invalid: {reason}")]
    InvalidEnvelopeField {
        /// Wire name of the offending field.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },
    /// Device identifier does not match `^[a-z0-9-]{1,64}$`.
    #[error("invalid device ID {device_id:?}: {reason}")]
    InvalidDeviceId {
        /// Identifier supplied by the caller.
        device_id: String,
        /// Which rule it broke.
        reason: &'static str,
    },
    /// Encode was asked for an empty message type tag.
    #[error("message type cannot be empty")]
    EmptyMessageType,
    /// The `type` tag is not in the payload type registry.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),
    /// Required payload fields are absent, reported as dotted wire paths.
    #[error("payload missing required field(s) for {message_type}: {}", .fields.join(", "))]
    MissingPayloadField {
        /// Declared message type.
        message_type: MessageType,
        /// Every missing field.
        fields: Vec<String>,
    },
    /// Payload fields are present but do not fit the typed shape.
    #[error("payload for {message_type} does not match its schema: {source}")]
    InvalidPayload {
        /// Declared message type.
        message_type: MessageType,
        /// Underlying conversion failure.
        #[source]
        source: serde_json::Error,
    },
    /// JSON serialisation failed while encoding.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The inbound pipeline screened the message out.
    #[error("message rejected: {}", join_reasons(.0))]
    Rejected(Vec<ValidationError>),
}

fn join_reasons(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub use case::{camel_to_snake, snake_to_camel, translate_keys, KeyCase, OPAQUE_FIELDS};
pub use decoder::{decode_envelope, decode_message};
pub use encoder::{encode_message, peek_header};
pub use envelope::{
    create_envelope, create_envelope_at, parse_envelope, validate_device_id, Envelope,
    EnvelopeHeader, PROTOCOL_VERSION,
};
pub use inbound::{InboundPipeline, PipelineStats, ReceivedMessage};
pub use logging::{log_envelope, MessageDirection, MessagingMetricsExporter};
pub use registry::{FieldKind, FieldSpec, PayloadShape};
pub use types::{
    Battery, Command, CommandResponse, CommandStatus, ConfigSource, ConfigUpdate, DisplayStatus,
    Error, ErrorCategory, ErrorCode, FillStart, FillStop, FillStopReason, FillTrigger, Humidity,
    MessageType, OpaqueMap, Payload, PoolStatus, ScheduleInfo, Severity, Temperature,
    ValvePosition, ValveState, ValveStatus, WaterLevel,
};
pub use validator::{
    validate_envelope, validate_message, validate_message_size, validate_payload,
    validate_timestamp_freshness, ValidationError, ValidationOutcome, Validator,
    MAX_MESSAGE_SIZE_BYTES,
};
