// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! CLI entry point for the stdio bridge.

use std::process::ExitCode;

use anyhow::Result;
use cbor_bridge_stdio::entrypoint;

fn main() -> Result<ExitCode> {
    entrypoint()
}
