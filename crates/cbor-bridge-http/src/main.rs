// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `cbor-bridge-http`: serve the ciborium-backed conformance bridge over HTTP.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use cbor_bridge_config::{ConfigService, FsConfigStore};
use cbor_bridge_core::CodecService;
use cbor_bridge_http::{
    app, ctrl_c, listen_addr, load_prefs, log_filter, serve, DEFAULT_MAX_BODY_BYTES,
};
use clap::Parser;
use tokio::net::TcpListener;

#[derive(Parser, Debug)]
#[command(author, version, about = "CBOR conformance bridge (HTTP)")]
struct Args {
    /// TCP listen address (e.g. 0.0.0.0:8080). Overrides saved prefs.
    #[arg(long)]
    listen: Option<SocketAddr>,
    /// Maximum request body in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES)]
    max_body_bytes: usize,
    /// Ignore saved prefs and do not write any
    #[arg(long)]
    no_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    // Config (best-effort)
    let config = if args.no_config {
        None
    } else {
        FsConfigStore::new().map(ConfigService::new).ok()
    };
    let prefs = load_prefs(config.as_ref());
    let addr = listen_addr(args.listen, &prefs)?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    let router = app(CodecService::default(), args.max_body_bytes);
    serve(listener, router, ctrl_c()).await
}
