//! ---
//! poolio_section: "03-operator-tooling"
//! poolio_subsection: "binary"
//! poolio_type: "source"
//! poolio_scope: "code"
//! poolio_description: "Operator CLI for inspecting Poolio node messages."
//! poolio_version: "v0.1.0"
//! poolio_owner: "tbd"
//! ---
use std::fs;

use assert_cmd::Command;
use tempfile::TempDir;

const TS: &str = "2026-01-20T14:30:00-08:00";
const WIRE: &str = r#"{"version":2,"type":"pool_status","deviceId":"pool-node-001","timestamp":"2026-01-20T14:30:00-08:00","payload":{"waterLevel":{"floatSwitch":true,"confidence":0.95},"temperature":{"value":78.5,"unit":"fahrenheit"},"battery":{"voltage":3.85,"percentage":72},"reportingInterval":300}}"#;
const PAYLOAD: &str = r#"{"water_level":{"float_switch":true,"confidence":0.95},"temperature":{"value":78.5,"unit":"fahrenheit"},"battery":{"voltage":3.85,"percentage":72},"reporting_interval":300}"#;

fn msgctl() -> Command {
    let mut cmd = Command::cargo_bin("poolio-msgctl").expect("binary built");
    cmd.env_remove("POOLIO_CONFIG").env("POOLIO_LOG", "off");
    cmd
}

fn stdout(output: &std::process::Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("utf-8 stdout")
}

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

#[test]
fn encode_produces_exact_wire_form() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "payload.json", PAYLOAD);
    let output = msgctl()
        .args(["encode", "--type", "pool_status", "--device-id", "pool-node-001"])
        .args(["--timestamp", TS])
        .arg(&input)
        .assert()
        .success()
        .get_output()
        .clone();
    assert_eq!(stdout(&output).trim_end(), WIRE);
}

#[test]
fn encode_reads_device_id_from_config() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "poolio.toml", "[device]\nid = \"pool-node-007\"\n");
    let output = msgctl()
        .arg("--config")
        .arg(&config)
        .args(["encode", "--type", "pool_status", "--timestamp", TS, "-"])
        .write_stdin(PAYLOAD)
        .assert()
        .success()
        .get_output()
        .clone();
    assert!(stdout(&output).contains(r#""deviceId":"pool-node-007""#));
}

#[test]
fn encode_without_device_id_fails() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "payload.json", PAYLOAD);
    msgctl()
        .current_dir(dir.path())
        .args(["encode", "--type", "pool_status"])
        .arg(&input)
        .assert()
        .failure();
}

#[test]
fn check_reports_validity_at_given_instant() {
    let dir = TempDir::new().unwrap();
    let input = write(&dir, "wire.json", WIRE);

    let output = msgctl()
        .args(["check", "--at", TS])
        .arg(&input)
        .assert()
        .success()
        .get_output()
        .clone();
    assert_eq!(stdout(&output).trim(), "valid");

    let output = msgctl()
        .args(["check", "--at", "2026-01-20T15:00:00-08:00"])
        .arg(&input)
        .assert()
        .code(1)
        .get_output()
        .clone();
    assert!(stdout(&output).starts_with("message_too_old:"));
}

#[test]
fn check_lists_every_missing_envelope_field() {
    let output = msgctl()
        .args(["check", "-"])
        .write_stdin(r#"{"version":2}"#)
        .assert()
        .code(1)
        .get_output()
        .clone();
    let text = stdout(&output);
    assert_eq!(text.lines().count(), 4);
    assert!(text.contains("Envelope missing required field: deviceId"));
}

#[test]
fn decode_prints_snake_case_payload() {
    let output = msgctl()
        .args(["decode", "--at", TS, "-"])
        .write_stdin(WIRE)
        .assert()
        .success()
        .get_output()
        .clone();
    let document: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(document["device_id"], "pool-node-001");
    assert_eq!(document["payload"]["water_level"]["float_switch"], true);
    assert_eq!(document["payload"]["reporting_interval"], 300);
}

#[test]
fn types_lists_all_nine() {
    let output = msgctl()
        .arg("types")
        .assert()
        .success()
        .get_output()
        .clone();
    let text = stdout(&output);
    assert_eq!(text.lines().count(), 9);
    let command = text
        .lines()
        .find(|line| line.starts_with("command "))
        .expect("command row");
    assert!(command.contains("300s"));
    assert!(command.contains("command, parameters, source"));
}
