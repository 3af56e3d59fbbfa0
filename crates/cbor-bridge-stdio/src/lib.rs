// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Process bridge: one request on stdin, one JSON line on stdout.
//!
//! ```text
//! echo 00 | cbor-bridge decode
//! {"success":true,"result":0,"duration_ms":0.004}
//! ```
//!
//! The exit status mirrors `success` so shell harnesses can branch on it.
//! Logs go to stderr.

use std::io::{Read, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use cbor_bridge_core::{CborBackend, CodecService, Envelope};
use clap::{Parser, Subcommand};
use serde_json::{json, Value as JsonValue};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Command line of the `cbor-bridge` binary.
#[derive(Parser, Debug)]
#[command(name = "cbor-bridge")]
#[command(version, about = "CBOR conformance bridge (stdin/stdout)")]
pub struct Cli {
    /// Operation to run against stdin.
    #[command(subcommand)]
    pub command: Command,
}

/// Bridge operations.
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Decode hex CBOR read from stdin
    Decode,
    /// Encode a JSON-safe value read from stdin
    Encode,
    /// Print the backend identity
    Health,
}

/// One finished request: the document to print and whether it succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Printed as a single line on stdout.
    pub body: JsonValue,
    /// Drives the exit status.
    pub success: bool,
}

impl Reply {
    fn envelope(envelope: &Envelope) -> Self {
        Self {
            body: envelope.to_json(),
            success: envelope.is_success(),
        }
    }

    /// `0` on success, `1` otherwise.
    pub fn exit_code(&self) -> ExitCode {
        if self.success {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}

/// Run `command` over the full stdin text.
pub fn respond<B: CborBackend>(codec: &CodecService<B>, command: Command, input: &str) -> Reply {
    match command {
        Command::Decode => Reply::envelope(&codec.decode(input.trim())),
        Command::Encode => match serde_json::from_str::<JsonValue>(input) {
            Ok(value) => Reply::envelope(&codec.encode(value)),
            Err(err) => {
                warn!(%err, "stdin is not JSON");
                Reply::envelope(&Envelope::Failed {
                    error: format!("Invalid JSON: {err}"),
                })
            }
        },
        Command::Health => {
            let info = codec.info();
            Reply {
                body: json!({
                    "status": "ok",
                    "library": info.library,
                    "version": info.version,
                    "language": info.language,
                }),
                success: true,
            }
        }
    }
}

/// Log filter from `RUST_LOG`-style directives; unset, blank or invalid falls back to `info`.
pub fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|d| !d.trim().is_empty())
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Binary entry point: parse args, read stdin, print one line.
pub fn entrypoint() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let mut input = String::new();
    if cli.command != Command::Health {
        std::io::stdin()
            .read_to_string(&mut input)
            .context("failed to read stdin")?;
    }

    let reply = respond(&CodecService::default(), cli.command, &input);

    let mut out = std::io::stdout().lock();
    serde_json::to_writer(&mut out, &reply.body).context("failed to write reply")?;
    writeln!(out).context("failed to write reply")?;
    out.flush().context("failed to flush stdout")?;
    Ok(reply.exit_code())
}
