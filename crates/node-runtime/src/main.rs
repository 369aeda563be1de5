//! # Quantum-Chain Node Runtime
//!
//! Entry point hosting the auth gateway.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`RUST_LOG`, default `info`)
//! 2. Load configuration (defaults overlaid with `QC_*` environment variables)
//! 3. Load the JWT secret file, generating it if absent
//! 4. Start the plain and authenticated listeners
//! 5. Run until Ctrl+C, then close all listeners
//!
//! ## Environment
//!
//! | Variable             | Effect                              |
//! |----------------------|-------------------------------------|
//! | `QC_HTTP_PORT`       | plain HTTP port (8545)              |
//! | `QC_WS_PORT`         | plain WebSocket port (8546)         |
//! | `QC_AUTH_PORT`       | authenticated listener port (8551)  |
//! | `QC_AUTH_ADDR`       | authenticated listener bind address |
//! | `QC_JWT_SECRET`      | path of the hex secret file         |
//! | `QC_CLOCK_SKEW_SECS` | `iat` tolerance in seconds (5)      |

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use qc_16_auth_gateway::{GatewayConfig, GatewayNode, JwtSecret};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Load configuration from the process environment.
fn load_config() -> GatewayConfig {
    overlay_env(GatewayConfig::default(), |key| std::env::var(key).ok())
}

/// Apply `QC_*` overrides read through `lookup`. Unparseable values are
/// logged and ignored.
fn overlay_env(mut config: GatewayConfig, lookup: impl Fn(&str) -> Option<String>) -> GatewayConfig {
    if let Some(port) = parsed(&lookup, "QC_HTTP_PORT") {
        config.http.port = port;
    }
    if let Some(port) = parsed(&lookup, "QC_WS_PORT") {
        config.websocket.port = port;
    }
    if let Some(port) = parsed(&lookup, "QC_AUTH_PORT") {
        config.auth.port = port;
    }
    if let Some(host) = parsed(&lookup, "QC_AUTH_ADDR") {
        config.auth.host = host;
    }
    if let Some(path) = lookup("QC_JWT_SECRET") {
        config.auth.jwt_secret = PathBuf::from(path);
    }
    if let Some(secs) = parsed(&lookup, "QC_CLOCK_SKEW_SECS") {
        config.auth.clock_skew_tolerance = Duration::from_secs(secs);
    }
    config
}

fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let config = load_config();
    config.validate().context("invalid gateway configuration")?;

    let secret = JwtSecret::load_or_generate(&config.auth.jwt_secret).with_context(|| {
        format!(
            "failed to load JWT secret from {}",
            config.auth.jwt_secret.display()
        )
    })?;
    info!(path = %config.auth.jwt_secret.display(), "JWT secret loaded");

    let mut node = GatewayNode::new(config, secret)?;
    node.start().await.context("failed to start gateway")?;

    for (name, endpoint) in [
        ("http", node.http_endpoint()),
        ("ws", node.ws_endpoint()),
        ("http-auth", node.http_auth_endpoint()),
        ("ws-auth", node.ws_auth_endpoint()),
    ] {
        match endpoint {
            Ok(url) => info!(listener = name, %url, "Endpoint ready"),
            Err(e) => info!(listener = name, "Endpoint unavailable: {}", e),
        }
    }

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    info!("Initiating graceful shutdown...");
    node.close().await;
    info!("Shutdown complete");

    Ok(())
}
