//! ---
//! poolio_section: "03-operator-tooling"
//! poolio_subsection: "binary"
//! poolio_type: "source"
//! poolio_scope: "code"
//! poolio_description: "Operator CLI for inspecting Poolio node messages."
//! poolio_version: "v0.1.0"
//! poolio_owner: "tbd"
//! ---
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use poolio_common::config::AppConfig;
use poolio_common::logging::init_tracing;

mod encode;
mod inspect;

const DEFAULT_CONFIG_CANDIDATES: [&str; 2] = ["poolio.toml", "/etc/poolio/poolio.toml"];

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Poolio message inspection utility",
    long_about = None
)]
struct Cli {
    /// Configuration file (defaults to POOLIO_CONFIG, then ./poolio.toml).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Screen a wire message and list every validation failure.
    Check(inspect::CheckArgs),
    /// Screen and decode a wire message, printing the typed payload.
    Decode(inspect::DecodeArgs),
    /// Build a wire message from a snake_case payload document.
    Encode(encode::EncodeArgs),
    /// List message types with their required fields and freshness windows.
    Types,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing("poolio-msgctl", &config.logging)?;

    match cli.command {
        Commands::Check(args) => inspect::check(&config, &args),
        Commands::Decode(args) => inspect::decode(&config, &args),
        Commands::Encode(args) => encode::run(&config, &args),
        Commands::Types => inspect::types(&config),
    }
}

fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return AppConfig::from_path(path);
    }
    let env_override = std::env::var_os(AppConfig::ENV_CONFIG_PATH).is_some_and(|v| !v.is_empty());
    if env_override
        || DEFAULT_CONFIG_CANDIDATES
            .iter()
            .any(|candidate| Path::new(candidate).exists())
    {
        return AppConfig::load(&DEFAULT_CONFIG_CANDIDATES);
    }
    Ok(AppConfig::default())
}

/// Read a whole document from `input`, where `-` means stdin.
pub(crate) fn read_input(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("unable to read stdin")?;
        return Ok(buffer);
    }
    std::fs::read_to_string(input).with_context(|| format!("unable to read {}", input.display()))
}
