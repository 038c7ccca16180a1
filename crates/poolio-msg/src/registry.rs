//! ---
//! poolio_section: "02-messaging-envelope"
//! poolio_subsection: "module"
//! poolio_type: "source"
//! poolio_scope: "code"
//! poolio_description: "Message envelope, payload schema, and validation primitives."
//! poolio_version: "v0.1.0"
//! poolio_owner: "tbd"
//! ---
//! Payload type registry: `type` tag to shape descriptor and constructor.
//!
//! Adding a message type means one [`MessageType`] variant, one payload struct,
//! one shape here and one arm in [`instantiate`].
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

use crate::case::snake_to_camel;
use crate::types::{
    Command, CommandResponse, ConfigUpdate, DisplayStatus, Error, FillStart, FillStop,
    MessageType, Payload, PoolStatus, ValveStatus,
};
use crate::{MessagingError, Result};

/// How a field's value is treated by the codec.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Scalar, list or free-form value; keys below it are translated.
    Value,
    /// A nested payload object with its own shape.
    Nested(&'static PayloadShape),
    /// Application-owned map; keys below it are never translated.
    Opaque,
}

/// One direct field of a payload shape.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// In-memory (snake_case) name.
    pub name: &'static str,
    /// Value treatment.
    pub kind: FieldKind,
    /// Whether the key must be present on the wire. Presence with `null` counts.
    pub required: bool,
}

impl FieldSpec {
    /// camelCase name used on the wire.
    pub fn wire_name(&self) -> String {
        snake_to_camel(self.name)
    }
}

/// Field layout of a payload type.
#[derive(Debug)]
pub struct PayloadShape {
    /// Shape name, for diagnostics.
    pub name: &'static str,
    /// Direct fields in emission order.
    pub fields: &'static [FieldSpec],
}

impl PayloadShape {
    /// Wire names of the fields that must be present.
    pub fn required_wire_fields(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(FieldSpec::wire_name)
            .collect()
    }

    /// Nested shapes reachable from this one, with their field names.
    pub fn nested(&self) -> impl Iterator<Item = (&'static str, &'static PayloadShape)> + '_ {
        self.fields.iter().filter_map(|f| match f.kind {
            FieldKind::Nested(shape) => Some((f.name, shape)),
            _ => None,
        })
    }
}

const fn value(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Value,
        required: true,
    }
}

const fn optional(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Value,
        required: false,
    }
}

const fn nested(name: &'static str, shape: &'static PayloadShape) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Nested(shape),
        required: true,
    }
}

const fn opaque(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        kind: FieldKind::Opaque,
        required: true,
    }
}

/// Shape of a nested `WaterLevel`.
pub static WATER_LEVEL: PayloadShape = PayloadShape {
    name: "WaterLevel",
    fields: &[value("float_switch"), value("confidence")],
};

/// Shape of a nested `Temperature`.
pub static TEMPERATURE: PayloadShape = PayloadShape {
    name: "Temperature",
    fields: &[value("value"), optional("unit")],
};

/// Shape of a nested `Battery`.
pub static BATTERY: PayloadShape = PayloadShape {
    name: "Battery",
    fields: &[value("voltage"), value("percentage")],
};

/// Shape of a nested `Humidity`.
pub static HUMIDITY: PayloadShape = PayloadShape {
    name: "Humidity",
    fields: &[value("value"), optional("unit")],
};

/// Shape of the `pool_status` payload.
pub static POOL_STATUS: PayloadShape = PayloadShape {
    name: "PoolStatus",
    fields: &[
        nested("water_level", &WATER_LEVEL),
        nested("temperature", &TEMPERATURE),
        nested("battery", &BATTERY),
        value("reporting_interval"),
    ],
};

/// Shape of a nested `ValveState`.
pub static VALVE_STATE: PayloadShape = PayloadShape {
    name: "ValveState",
    fields: &[
        value("state"),
        value("is_filling"),
        value("current_fill_duration"),
        value("max_fill_duration"),
    ],
};

/// Shape of a nested `ScheduleInfo`.
pub static SCHEDULE_INFO: PayloadShape = PayloadShape {
    name: "ScheduleInfo",
    fields: &[
        value("enabled"),
        value("start_time"),
        value("window_hours"),
        optional("next_scheduled_fill"),
    ],
};

/// Shape of the `valve_status` payload.
pub static VALVE_STATUS: PayloadShape = PayloadShape {
    name: "ValveStatus",
    fields: &[
        nested("valve", &VALVE_STATE),
        nested("schedule", &SCHEDULE_INFO),
        nested("temperature", &TEMPERATURE),
    ],
};

/// Shape of the `display_status` payload.
pub static DISPLAY_STATUS: PayloadShape = PayloadShape {
    name: "DisplayStatus",
    fields: &[
        nested("local_temperature", &TEMPERATURE),
        nested("local_humidity", &HUMIDITY),
    ],
};

/// Shape of the `fill_start` payload.
pub static FILL_START: PayloadShape = PayloadShape {
    name: "FillStart",
    fields: &[
        value("fill_start_time"),
        value("scheduled_end_time"),
        value("max_duration"),
        value("trigger"),
    ],
};

/// Shape of the `fill_stop` payload.
pub static FILL_STOP: PayloadShape = PayloadShape {
    name: "FillStop",
    fields: &[
        value("fill_stop_time"),
        value("actual_duration"),
        value("reason"),
    ],
};

/// Shape of the `command` payload.
pub static COMMAND: PayloadShape = PayloadShape {
    name: "Command",
    fields: &[value("command"), opaque("parameters"), value("source")],
};

/// Shape of the `command_response` payload.
pub static COMMAND_RESPONSE: PayloadShape = PayloadShape {
    name: "CommandResponse",
    fields: &[
        value("command_timestamp"),
        value("command"),
        value("status"),
        optional("error_code"),
        optional("error_message"),
    ],
};

/// Shape of the `error` payload.
pub static ERROR: PayloadShape = PayloadShape {
    name: "Error",
    fields: &[
        value("error_code"),
        value("error_message"),
        value("severity"),
        opaque("context"),
    ],
};

/// Shape of the `config_update` payload.
pub static CONFIG_UPDATE: PayloadShape = PayloadShape {
    name: "ConfigUpdate",
    fields: &[value("config_key"), value("config_value"), value("source")],
};

/// Shape descriptor for a top-level message type.
pub fn shape(message_type: MessageType) -> &'static PayloadShape {
    match message_type {
        MessageType::PoolStatus => &POOL_STATUS,
        MessageType::ValveStatus => &VALVE_STATUS,
        MessageType::DisplayStatus => &DISPLAY_STATUS,
        MessageType::FillStart => &FILL_START,
        MessageType::FillStop => &FILL_STOP,
        MessageType::Command => &COMMAND,
        MessageType::CommandResponse => &COMMAND_RESPONSE,
        MessageType::Error => &ERROR,
        MessageType::ConfigUpdate => &CONFIG_UPDATE,
    }
}

/// Resolve a wire tag, failing with `UnknownMessageType`.
pub fn lookup(tag: &str) -> Result<(MessageType, &'static PayloadShape)> {
    MessageType::from_tag(tag)
        .map(|message_type| (message_type, shape(message_type)))
        .ok_or_else(|| MessagingError::UnknownMessageType(tag.to_owned()))
}

/// Dotted wire paths of every required field absent from a snake_case payload map.
///
/// Nested shapes are only descended into when their value is an object.
pub fn missing_fields(shape: &PayloadShape, data: &Map<String, JsonValue>) -> Vec<String> {
    let mut missing = Vec::new();
    collect_missing(shape, data, "", &mut missing);
    missing
}

fn collect_missing(
    shape: &PayloadShape,
    data: &Map<String, JsonValue>,
    prefix: &str,
    missing: &mut Vec<String>,
) {
    for field in shape.fields {
        let path = format!("{prefix}{}", field.wire_name());
        match (data.get(field.name), field.kind) {
            (None, _) if field.required => missing.push(path),
            (Some(JsonValue::Object(inner)), FieldKind::Nested(nested)) => {
                collect_missing(nested, inner, &format!("{path}."), missing)
            }
            _ => {}
        }
    }
}

/// Construct the typed payload for `message_type` from a snake_case value.
pub fn instantiate(message_type: MessageType, data: JsonValue) -> Result<Payload> {
    fn build<T: DeserializeOwned>(message_type: MessageType, data: JsonValue) -> Result<T> {
        serde_json::from_value(data)
            .map_err(|source| MessagingError::InvalidPayload {
                message_type,
                source,
            })
    }

    Ok(match message_type {
        MessageType::PoolStatus => Payload::PoolStatus(build::<PoolStatus>(message_type, data)?),
        MessageType::ValveStatus => {
            Payload::ValveStatus(build::<ValveStatus>(message_type, data)?)
        }
        MessageType::DisplayStatus => {
            Payload::DisplayStatus(build::<DisplayStatus>(message_type, data)?)
        }
        MessageType::FillStart => Payload::FillStart(build::<FillStart>(message_type, data)?),
        MessageType::FillStop => Payload::FillStop(build::<FillStop>(message_type, data)?),
        MessageType::Command => Payload::Command(build::<Command>(message_type, data)?),
        MessageType::CommandResponse => {
            Payload::CommandResponse(build::<CommandResponse>(message_type, data)?)
        }
        MessageType::Error => Payload::Error(build::<Error>(message_type, data)?),
        MessageType::ConfigUpdate => {
            Payload::ConfigUpdate(build::<ConfigUpdate>(message_type, data)?)
        }
    })
}
