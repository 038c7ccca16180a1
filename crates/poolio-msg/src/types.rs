//! ---
//! poolio_section: "02-messaging-envelope"
//! poolio_subsection: "module"
//! poolio_type: "source"
//! poolio_scope: "code"
//! poolio_description: "Message envelope, payload schema, and validation primitives."
//! poolio_version: "v0.1.0"
//! poolio_owner: "tbd"
//! ---
//! Payload shapes carried inside the envelope.
//!
//! Field names here are the in-memory snake_case names; the encoder and decoder
//! translate them to and from camelCase on the wire.
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::result::Result as StdResult;
use strum::{EnumIter, IntoEnumIterator};

use crate::Result;

/// Key/value data owned by the application, exempt from key translation.
pub type OpaqueMap = Map<String, JsonValue>;

fn default_temperature_unit() -> String {
    "fahrenheit".to_owned()
}

fn default_humidity_unit() -> String {
    "percent".to_owned()
}

// An explicit `null` unit falls back like an absent one.
fn temperature_unit_or_default<'de, D>(deserializer: D) -> StdResult<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_temperature_unit))
}

fn humidity_unit_or_default<'de, D>(deserializer: D) -> StdResult<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_humidity_unit))
}

/// Wire `type` tag of every known message.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MessageType {
    /// Pool sensor node report.
    PoolStatus,
    /// Valve controller report.
    ValveStatus,
    /// Display node report.
    DisplayStatus,
    /// A fill operation started.
    FillStart,
    /// A fill operation stopped.
    FillStop,
    /// Remote actuation request.
    Command,
    /// Outcome of a previously received command.
    CommandResponse,
    /// Error report.
    Error,
    /// Configuration change notification.
    ConfigUpdate,
}

impl MessageType {
    /// Wire tag, e.g. `pool_status`.
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Look up a wire tag, returning `None` for tags outside the registry.
    pub fn from_tag(tag: &str) -> Option<Self> {
        tag.parse().ok()
    }

    /// Iterate over every known message type in registry order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    /// Commands and their follow-ups age out faster than reports and events.
    pub fn is_time_sensitive(self) -> bool {
        matches!(
            self,
            MessageType::Command | MessageType::CommandResponse | MessageType::ConfigUpdate
        )
    }
}

/// Float switch reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterLevel {
    /// Whether the float switch reports water at level.
    pub float_switch: bool,
    /// Debounce confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Temperature reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    /// Measured value.
    pub value: f64,
    /// Unit name, `fahrenheit` unless stated otherwise.
    #[serde(
        default = "default_temperature_unit",
        deserialize_with = "temperature_unit_or_default"
    )]
    pub unit: String,
}

impl Temperature {
    /// Reading in degrees Fahrenheit.
    pub fn fahrenheit(value: f64) -> Self {
        Self {
            value,
            unit: default_temperature_unit(),
        }
    }

    /// Reading in degrees Celsius.
    pub fn celsius(value: f64) -> Self {
        Self {
            value,
            unit: "celsius".to_owned(),
        }
    }
}

/// Battery state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    /// Cell voltage.
    pub voltage: f64,
    /// Charge estimate, 0-100.
    pub percentage: i64,
}

/// Relative humidity reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Humidity {
    /// Measured value.
    pub value: f64,
    /// Unit name, `percent` unless stated otherwise.
    #[serde(
        default = "default_humidity_unit",
        deserialize_with = "humidity_unit_or_default"
    )]
    pub unit: String,
}

impl Humidity {
    /// Reading in percent relative humidity.
    pub fn percent(value: f64) -> Self {
        Self {
            value,
            unit: default_humidity_unit(),
        }
    }
}

/// `pool_status` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolStatus {
    /// Float switch reading.
    pub water_level: WaterLevel,
    /// Water temperature.
    pub temperature: Temperature,
    /// Node battery.
    pub battery: Battery,
    /// Seconds between reports.
    pub reporting_interval: i64,
}

/// Valve position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValvePosition {
    /// Water flowing.
    Open,
    /// Water shut off.
    Closed,
}

/// Valve hardware state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValveState {
    /// Current position.
    pub state: ValvePosition,
    /// Whether a fill is in progress.
    pub is_filling: bool,
    /// Seconds into the current fill, 0 when idle.
    pub current_fill_duration: i64,
    /// Upper bound on a single fill, in seconds.
    pub max_fill_duration: i64,
}

/// Fill schedule as configured on the valve node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleInfo {
    /// Whether scheduled fills run at all.
    pub enabled: bool,
    /// Window start, `HH:MM`.
    pub start_time: String,
    /// Window length in hours.
    pub window_hours: i64,
    /// Next fill as ISO-8601, if one is pending.
    #[serde(default)]
    pub next_scheduled_fill: Option<String>,
}

/// `valve_status` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValveStatus {
    /// Valve hardware state.
    pub valve: ValveState,
    /// Fill schedule.
    pub schedule: ScheduleInfo,
    /// Temperature at the valve node.
    pub temperature: Temperature,
}

/// `display_status` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayStatus {
    /// Indoor temperature at the display.
    pub local_temperature: Temperature,
    /// Indoor humidity at the display.
    pub local_humidity: Humidity,
}

/// What started a fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillTrigger {
    /// The daily schedule window opened.
    Scheduled,
    /// An operator asked for it.
    Manual,
    /// The pool node reported low water.
    LowWater,
}

/// `fill_start` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillStart {
    /// ISO-8601 start instant.
    pub fill_start_time: String,
    /// ISO-8601 instant the fill is due to end.
    pub scheduled_end_time: String,
    /// Upper bound in seconds.
    pub max_duration: i64,
    /// Origin of the fill.
    pub trigger: FillTrigger,
}

/// Why a fill ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillStopReason {
    /// Float switch reported full.
    WaterFull,
    /// Fill hit its duration cap.
    MaxDuration,
    /// Operator stopped it.
    Manual,
    /// A fault aborted it.
    Error,
    /// The schedule window closed.
    WindowClosed,
}

/// `fill_stop` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillStop {
    /// ISO-8601 stop instant.
    pub fill_stop_time: String,
    /// Seconds the valve was open.
    pub actual_duration: i64,
    /// Why it stopped.
    pub reason: FillStopReason,
}

/// `command` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Command name, e.g. `valve_start`.
    pub command: String,
    /// Arguments; keys are sent exactly as given.
    pub parameters: OpaqueMap,
    /// Issuer: a device ID or `cloud`.
    pub source: String,
}

/// Execution result of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    /// Executed.
    Success,
    /// Attempted but failed.
    Failed,
    /// Refused without attempting.
    Rejected,
}

/// `command_response` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Timestamp of the command being answered.
    pub command_timestamp: String,
    /// Name of the command being answered.
    pub command: String,
    /// Outcome.
    pub status: CommandStatus,
    /// [`ErrorCode`] string when the command failed or was rejected.
    #[serde(default)]
    pub error_code: Option<String>,
    /// Human-readable failure description.
    #[serde(default)]
    pub error_message: Option<String>,
}

impl CommandResponse {
    /// Response for a command that ran.
    pub fn success(command_timestamp: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            command_timestamp: command_timestamp.into(),
            command: command.into(),
            status: CommandStatus::Success,
            error_code: None,
            error_message: None,
        }
    }

    /// Response for a command that failed or was refused.
    pub fn failure(
        command_timestamp: impl Into<String>,
        command: impl Into<String>,
        status: CommandStatus,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            command_timestamp: command_timestamp.into(),
            command: command.into(),
            status,
            error_code: Some(code.as_str().to_owned()),
            error_message: Some(message.into()),
        }
    }
}

/// Error severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Diagnostic detail.
    Debug,
    /// Informational.
    Info,
    /// Degraded but working.
    Warning,
    /// Operation failed.
    Error,
    /// Node cannot continue.
    Critical,
}

/// `error` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Error {
    /// [`ErrorCode`] string.
    pub error_code: String,
    /// Human-readable description.
    pub error_message: String,
    /// How bad it is.
    pub severity: Severity,
    /// Diagnostic data; always sent, `null` when absent.
    pub context: Option<OpaqueMap>,
}

impl Error {
    /// Report without diagnostic context.
    pub fn new(code: ErrorCode, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            error_code: code.as_str().to_owned(),
            error_message: message.into(),
            severity,
            context: None,
        }
    }

    /// Attach diagnostic context.
    pub fn with_context(mut self, context: OpaqueMap) -> Self {
        self.context = Some(context);
        self
    }

    /// Parse `error_code` into a known code, if it is one.
    pub fn code(&self) -> Option<ErrorCode> {
        self.error_code.parse().ok()
    }
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    /// Pushed from the cloud feed.
    Cloud,
    /// Set on the device.
    Local,
    /// Built-in default.
    Default,
}

/// `config_update` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    /// Setting being changed.
    pub config_key: String,
    /// New value, any JSON.
    pub config_value: JsonValue,
    /// Origin of the change.
    pub source: ConfigSource,
}

/// Any top-level payload, tagged by its message type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// Pool node report.
    PoolStatus(PoolStatus),
    /// Valve node report.
    ValveStatus(ValveStatus),
    /// Display node report.
    DisplayStatus(DisplayStatus),
    /// Fill began.
    FillStart(FillStart),
    /// Fill ended.
    FillStop(FillStop),
    /// Instruction to a node.
    Command(Command),
    /// Reply to a command.
    CommandResponse(CommandResponse),
    /// Fault report.
    Error(Error),
    /// Setting change.
    ConfigUpdate(ConfigUpdate),
}

impl Payload {
    /// Message type tag this payload is sent under.
    pub fn message_type(&self) -> MessageType {
        match self {
            Payload::PoolStatus(_) => MessageType::PoolStatus,
            Payload::ValveStatus(_) => MessageType::ValveStatus,
            Payload::DisplayStatus(_) => MessageType::DisplayStatus,
            Payload::FillStart(_) => MessageType::FillStart,
            Payload::FillStop(_) => MessageType::FillStop,
            Payload::Command(_) => MessageType::Command,
            Payload::CommandResponse(_) => MessageType::CommandResponse,
            Payload::Error(_) => MessageType::Error,
            Payload::ConfigUpdate(_) => MessageType::ConfigUpdate,
        }
    }

    /// Encode under this payload's own type tag.
    pub fn encode(&self, device_id: &str, timestamp: Option<&str>) -> Result<String> {
        crate::encoder::encode_message(self, device_id, self.message_type().as_str(), timestamp)
    }
}

macro_rules! payload_from {
    ($($variant:ident),+ $(,)?) => {
        $(
            impl From<$variant> for Payload {
                fn from(value: $variant) -> Self {
                    Payload::$variant(value)
                }
            }
        )+
    };
}

payload_from!(
    PoolStatus,
    ValveStatus,
    DisplayStatus,
    FillStart,
    FillStop,
    Command,
    CommandResponse,
    Error,
    ConfigUpdate,
);

/// Family an [`ErrorCode`] belongs to, taken from its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ErrorCategory {
    /// Sensor reads and setup.
    Sensor,
    /// Connectivity.
    Network,
    /// I2C, 1-Wire and SPI buses.
    Bus,
    /// Configuration.
    Config,
    /// Node runtime.
    System,
    /// Valve control.
    Valve,
}

/// Standard codes for the `errorCode` field of `error` and `command_response`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Sensor returned no reading.
    SensorReadFailure,
    /// Sensor failed to initialise.
    SensorInitFailure,
    /// Reading outside the sensor's range.
    SensorOutOfRange,
    /// Could not reach the broker.
    NetworkConnectionFailed,
    /// Network operation timed out.
    NetworkTimeout,
    /// Broker rejected credentials.
    NetworkAuthFailure,
    /// I2C bus fault.
    #[serde(rename = "BUS_I2C_FAILURE")]
    #[strum(serialize = "BUS_I2C_FAILURE")]
    BusI2cFailure,
    /// 1-Wire bus fault.
    #[serde(rename = "BUS_ONEWIRE_FAILURE")]
    #[strum(serialize = "BUS_ONEWIRE_FAILURE")]
    BusOnewireFailure,
    /// SPI bus fault.
    BusSpiFailure,
    /// Setting has an invalid value.
    ConfigInvalidValue,
    /// Required setting absent.
    ConfigMissingRequired,
    /// Configuration does not match its schema.
    ConfigSchemaViolation,
    /// Free memory below threshold.
    SystemMemoryLow,
    /// Watchdog restarted the node.
    SystemWatchdogReset,
    /// Node restarted without a known cause.
    SystemUnexpectedReset,
    /// Safety interlock blocked the valve.
    ValveSafetyInterlock,
    /// Fill reached its duration cap.
    ValveMaxDuration,
    /// Fill requested while one is running.
    ValveAlreadyActive,
    /// Pool data too old to act on.
    ValveDataStale,
    /// Valve hardware fault.
    ValveHardwareFailure,
}

impl ErrorCode {
    /// Wire string, e.g. `SENSOR_READ_FAILURE`.
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Family of the code.
    pub fn category(self) -> ErrorCategory {
        use ErrorCode::*;
        match self {
            SensorReadFailure | SensorInitFailure | SensorOutOfRange => ErrorCategory::Sensor,
            NetworkConnectionFailed | NetworkTimeout | NetworkAuthFailure => {
                ErrorCategory::Network
            }
            BusI2cFailure | BusOnewireFailure | BusSpiFailure => ErrorCategory::Bus,
            ConfigInvalidValue | ConfigMissingRequired | ConfigSchemaViolation => {
                ErrorCategory::Config
            }
            SystemMemoryLow | SystemWatchdogReset | SystemUnexpectedReset => ErrorCategory::System,
            ValveSafetyInterlock | ValveMaxDuration | ValveAlreadyActive | ValveDataStale
            | ValveHardwareFailure => ErrorCategory::Valve,
        }
    }

    /// Every code in declaration order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_type_tags_round_trip() {
        let tags: Vec<&str> = MessageType::all().map(MessageType::as_str).collect();
        assert_eq!(
            tags,
            vec![
                "pool_status",
                "valve_status",
                "display_status",
                "fill_start",
                "fill_stop",
                "command",
                "command_response",
                "error",
                "config_update",
            ]
        );
        for message_type in MessageType::all() {
            assert_eq!(MessageType::from_tag(message_type.as_str()), Some(message_type));
            assert_eq!(message_type.to_string(), message_type.as_str());
        }
        assert_eq!(MessageType::from_tag("bogus_type"), None);
        assert_eq!(MessageType::from_tag("PoolStatus"), None);
    }

    #[test]
    fn only_control_messages_are_time_sensitive() {
        let sensitive: Vec<MessageType> =
            MessageType::all().filter(|t| t.is_time_sensitive()).collect();
        assert_eq!(
            sensitive,
            vec![
                MessageType::Command,
                MessageType::CommandResponse,
                MessageType::ConfigUpdate
            ]
        );
    }

    #[test]
    fn error_codes_cover_all_twenty_constants() {
        let codes: Vec<&str> = ErrorCode::all().map(ErrorCode::as_str).collect();
        assert_eq!(codes.len(), 20);
        assert!(codes.contains(&"BUS_I2C_FAILURE"));
        assert!(codes.contains(&"BUS_ONEWIRE_FAILURE"));
        assert!(codes.contains(&"VALVE_DATA_STALE"));
        for code in ErrorCode::all() {
            let prefix = code.as_str().split('_').next().unwrap_or_default();
            assert_eq!(prefix.to_lowercase(), code.category().to_string());
            assert_eq!(code.as_str().parse::<ErrorCode>().ok(), Some(code));
            assert_eq!(
                serde_json::to_value(code).expect("serialize"),
                json!(code.as_str())
            );
        }
    }

    #[test]
    fn literal_sets_use_wire_spelling() {
        assert_eq!(serde_json::to_value(ValvePosition::Open).unwrap(), json!("open"));
        assert_eq!(serde_json::to_value(FillTrigger::LowWater).unwrap(), json!("low_water"));
        assert_eq!(
            serde_json::to_value(FillStopReason::WindowClosed).unwrap(),
            json!("window_closed")
        );
        assert_eq!(serde_json::to_value(CommandStatus::Rejected).unwrap(), json!("rejected"));
        assert_eq!(serde_json::to_value(Severity::Warning).unwrap(), json!("warning"));
        assert_eq!(serde_json::to_value(ConfigSource::Default).unwrap(), json!("default"));
    }

    #[test]
    fn leaf_units_default_when_absent() {
        let temperature: Temperature = serde_json::from_value(json!({"value": 78.5})).unwrap();
        assert_eq!(temperature, Temperature::fahrenheit(78.5));
        let humidity: Humidity = serde_json::from_value(json!({"value": 45.0})).unwrap();
        assert_eq!(humidity, Humidity::percent(45.0));
    }

    #[test]
    fn null_units_fall_back_to_defaults() {
        let temperature: Temperature =
            serde_json::from_value(json!({"value": 78.5, "unit": null})).unwrap();
        assert_eq!(temperature.unit, "fahrenheit");
        let humidity: Humidity = serde_json::from_value(json!({"value": 45.0, "unit": null})).unwrap();
        assert_eq!(humidity.unit, "percent");
    }

    #[test]
    fn integer_fields_accept_any_json_int() {
        let battery: Battery =
            serde_json::from_value(json!({"voltage": 3.7, "percentage": 300})).unwrap();
        assert_eq!(battery.percentage, 300);
        let stop: FillStop = serde_json::from_value(
            json!({"fill_stop_time": "t", "actual_duration": -1, "reason": "manual"}),
        )
        .unwrap();
        assert_eq!(stop.actual_duration, -1);
    }

    #[test]
    fn error_helpers_carry_code_strings() {
        let report = Error::new(ErrorCode::SensorReadFailure, "probe offline", Severity::Error);
        assert_eq!(report.error_code, "SENSOR_READ_FAILURE");
        assert_eq!(report.code(), Some(ErrorCode::SensorReadFailure));
        assert!(report.context.is_none());

        let response = CommandResponse::failure(
            "2026-01-20T14:30:00-08:00",
            "valve_start",
            CommandStatus::Rejected,
            ErrorCode::ValveAlreadyActive,
            "fill in progress",
        );
        assert_eq!(response.error_code.as_deref(), Some("VALVE_ALREADY_ACTIVE"));
    }

    #[test]
    fn payload_reports_its_type() {
        let payload: Payload = ConfigUpdate {
            config_key: "max_fill_minutes".into(),
            config_value: json!(9),
            source: ConfigSource::Cloud,
        }
        .into();
        assert_eq!(payload.message_type(), MessageType::ConfigUpdate);
    }
}
