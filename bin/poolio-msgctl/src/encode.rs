//! ---
//! poolio_section: "03-operator-tooling"
//! poolio_subsection: "binary"
//! poolio_type: "source"
//! poolio_scope: "code"
//! poolio_description: "Operator CLI for inspecting Poolio node messages."
//! poolio_version: "v0.1.0"
//! poolio_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use poolio_common::config::AppConfig;
use poolio_msg::registry;
use serde_json::Value;
use tracing::info;

/// Options for `encode`.
#[derive(Debug, Args)]
pub struct EncodeArgs {
    /// Message type tag, e.g. `pool_status`.
    #[arg(long = "type", value_name = "TYPE")]
    message_type: String,
    /// Sender identifier; falls back to `[device] id` from the configuration.
    #[arg(long = "device-id", value_name = "ID")]
    device_id: Option<String>,
    /// Envelope timestamp; defaults to the current local time.
    #[arg(long, value_name = "TIMESTAMP")]
    timestamp: Option<String>,
    /// snake_case payload document, or `-` for stdin.
    #[arg(value_name = "INPUT", default_value = "-")]
    input: PathBuf,
}

/// Build the typed payload through the registry and print the wire form.
pub fn run(config: &AppConfig, args: &EncodeArgs) -> Result<ExitCode> {
    let device_id = args
        .device_id
        .as_deref()
        .or(config.device.id.as_deref())
        .ok_or_else(|| anyhow!("no device ID: pass --device-id or set [device] id"))?;
    let (message_type, _) = registry::lookup(&args.message_type)?;

    let document: Value = serde_json::from_str(&crate::read_input(&args.input)?)
        .context("payload document is not valid JSON")?;
    let payload = registry::instantiate(message_type, document)?;
    let wire = payload.encode(device_id, args.timestamp.as_deref())?;

    info!(
        device_id,
        message_type = message_type.as_str(),
        bytes = wire.len(),
        "encoded message"
    );
    println!("{wire}");
    Ok(ExitCode::SUCCESS)
}
