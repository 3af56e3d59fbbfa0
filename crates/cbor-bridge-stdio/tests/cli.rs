// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Black-box runs of the `cbor-bridge` binary.
#![allow(clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};

fn bridge() -> Command {
    let mut cmd = Command::cargo_bin("cbor-bridge").unwrap();
    cmd.env("RUST_LOG", "off");
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    let text = std::str::from_utf8(&output.stdout).unwrap();
    assert_eq!(text.lines().count(), 1, "expected one line, got {text:?}");
    serde_json::from_str(text).unwrap()
}

#[test]
fn help_prints() {
    bridge().arg("--help").assert().success();
}

#[test]
fn decode_success_exits_zero() {
    let output = bridge()
        .arg("decode")
        .write_stdin("a26161016162f5\n")
        .assert()
        .success()
        .get_output()
        .clone();
    let body = stdout_json(&output);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["result"], json!({"a": 1, "b": true}));
}

#[test]
fn decode_failure_exits_one() {
    bridge()
        .arg("decode")
        .write_stdin("zz")
        .assert()
        .code(1)
        .stdout(predicate::str::starts_with(r#"{"success":false,"error":"invalid hex: "#));
}

#[test]
fn encode_success_prints_hex() {
    bridge()
        .arg("encode")
        .write_stdin(r#"{"__cbor_tag__": 32, "__cbor_value__": "a"}"#)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""hex":"d8206161""#));
}

#[test]
fn encode_invalid_json_exits_one() {
    bridge()
        .arg("encode")
        .write_stdin("not json")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Invalid JSON: "));
}

#[test]
fn health_reports_identity() {
    let output = bridge().arg("health").assert().success().get_output().clone();
    assert_eq!(
        stdout_json(&output),
        json!({"status": "ok", "library": "ciborium", "version": "0.2", "language": "rust"})
    );
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    bridge().arg("frobnicate").assert().failure().stdout(predicate::str::is_empty());
}

#[test]
fn rust_log_controls_stderr() {
    bridge()
        .arg("decode")
        .write_stdin("00")
        .assert()
        .success()
        .stderr(predicate::str::is_empty());

    bridge()
        .env("RUST_LOG", "debug")
        .arg("decode")
        .write_stdin("00")
        .assert()
        .success()
        .stderr(predicate::str::contains("decode ok"));
}
