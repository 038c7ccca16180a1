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
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use poolio_common::config::AppConfig;
use poolio_common::time::{Clock, FixedClock, SystemClock};
use poolio_msg::registry;
use poolio_msg::{InboundPipeline, MessageType, MessagingError, Validator};
use serde_json::json;

/// Options for `check`.
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Evaluate freshness as of this RFC 3339 instant instead of now.
    #[arg(long, value_name = "TIMESTAMP")]
    at: Option<String>,
    /// Wire message file, or `-` for stdin.
    #[arg(value_name = "INPUT", default_value = "-")]
    input: PathBuf,
}

/// Options for `decode`.
#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Evaluate freshness as of this RFC 3339 instant instead of now.
    #[arg(long, value_name = "TIMESTAMP")]
    at: Option<String>,
    /// Wire message file, or `-` for stdin.
    #[arg(value_name = "INPUT", default_value = "-")]
    input: PathBuf,
}

fn clock_at(at: Option<&str>) -> Result<Arc<dyn Clock>> {
    Ok(match at {
        Some(instant) => Arc::new(
            FixedClock::parse(instant)
                .with_context(|| format!("--at expects an RFC 3339 timestamp, got {instant:?}"))?,
        ),
        None => Arc::new(SystemClock),
    })
}

/// Run every screening check and print the outcome.
pub fn check(config: &AppConfig, args: &CheckArgs) -> Result<ExitCode> {
    let json = crate::read_input(&args.input)?;
    let clock = clock_at(args.at.as_deref())?;
    let validator = Validator::new(&config.validation);
    let (valid, errors) = validator.check(&json, Some(clock.now().timestamp()));
    if valid {
        println!("valid");
        return Ok(ExitCode::SUCCESS);
    }
    for error in &errors {
        println!("{}: {error}", error.kind());
    }
    Ok(ExitCode::FAILURE)
}

/// Screen, decode, and print header plus snake_case payload.
pub fn decode(config: &AppConfig, args: &DecodeArgs) -> Result<ExitCode> {
    let json = crate::read_input(&args.input)?;
    let pipeline = InboundPipeline::new(Validator::new(&config.validation))
        .with_clock(clock_at(args.at.as_deref())?);
    let received = match pipeline.accept(&json) {
        Ok(received) => received,
        Err(MessagingError::Rejected(errors)) => {
            for error in &errors {
                eprintln!("{}: {error}", error.kind());
            }
            return Ok(ExitCode::FAILURE);
        }
        Err(err) => {
            eprintln!("{err}");
            return Ok(ExitCode::FAILURE);
        }
    };
    let header = &received.header;
    let document = json!({
        "version": header.version(),
        "type": header.message_type(),
        "device_id": header.device_id(),
        "timestamp": header.timestamp(),
        "payload": received.payload,
    });
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(ExitCode::SUCCESS)
}

/// Print each type with its freshness window and required wire fields.
pub fn types(config: &AppConfig) -> Result<ExitCode> {
    let validator = Validator::new(&config.validation);
    for message_type in MessageType::all() {
        let shape = registry::shape(message_type);
        println!(
            "{:<18} {:>5}s  {}",
            message_type.as_str(),
            validator.max_age_for(message_type.as_str()),
            shape.required_wire_fields().join(", ")
        );
    }
    Ok(ExitCode::SUCCESS)
}
