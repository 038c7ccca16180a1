//! ---
//! poolio_section: "01-core-functionality"
//! poolio_subsection: "module"
//! poolio_type: "source"
//! poolio_scope: "code"
//! poolio_description: "Shared primitives and utilities for Poolio nodes."
//! poolio_version: "v0.1.0"
//! poolio_owner: "tbd"
//! ---
//! Core shared primitives for the Poolio workspace.
//! This crate exposes configuration loading, tracing setup, and the wall-clock
//! abstraction consumed by the message protocol crates.

pub mod config;
pub mod logging;
pub mod time;

pub use config::{AppConfig, DeviceConfig, LoadedAppConfig, LoggingConfig, ValidationConfig};
pub use logging::{init_tracing, LogFormat};
pub use time::{iso8601_seconds, unix_seconds, Clock, FixedClock, SystemClock};
