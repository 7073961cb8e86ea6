//! CoAP LED bridge: entry point.
//!
//! This binary exposes a small HTTP API that web browsers can call, and
//! forwards each call to an ESP32 as a confirmable CoAP request.
//!
//! # Why a bridge process?
//!
//! Browsers speak HTTP over TCP.  The ESP32 speaks CoAP over UDP, which a
//! browser cannot send.  The bridge translates between the two and applies a
//! fixed timeout, so a powered-off device shows up as a clean `504` instead
//! of a hanging page.
//!
//! # Usage
//!
//! ```text
//! coap-web-bridge [OPTIONS]
//!
//! Options:
//!   --http-bind   <IP>    HTTP bind address            [default: 0.0.0.0]
//!   --http-port   <PORT>  HTTP listener port           [default: 3000]
//!   --esp32-ip    <HOST>  Device IP or hostname        [default: 10.182.252.187]
//!   --coap-port   <PORT>  Device CoAP port             [default: 5683]
//!   --device-path <PATH>  LED resource path            [default: /led]
//!   --timeout-ms  <MS>    Per-request device timeout   [default: 3000]
//!   --public-dir  <DIR>   Serve static browser assets from DIR
//!   --config      <FILE>  TOML file with any of the settings above
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable            | Flag            |
//! |---------------------|-----------------|
//! | `BRIDGE_HTTP_BIND`  | `--http-bind`   |
//! | `BRIDGE_HTTP_PORT`  | `--http-port`   |
//! | `ESP32_IP`          | `--esp32-ip`    |
//! | `COAP_PORT`         | `--coap-port`   |
//! | `COAP_DEVICE_PATH`  | `--device-path` |
//! | `COAP_TIMEOUT_MS`   | `--timeout-ms`  |
//! | `BRIDGE_PUBLIC_DIR` | `--public-dir`  |
//! | `BRIDGE_CONFIG`     | `--config`      |
//!
//! A flag or variable beats the config file, which beats the built-in
//! default.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use coap_web_bridge::domain::config::{
    DEFAULT_DEVICE_HOST, DEFAULT_DEVICE_PATH, DEFAULT_HTTP_PORT, DEFAULT_TIMEOUT,
};
use coap_web_bridge::domain::{BridgeConfig, DeviceEndpoint};
use coap_web_bridge::infrastructure::config_file::{load_config, FileConfig};
use coap_web_bridge::infrastructure::{run_server, CoapTransport};

const DEFAULT_HTTP_BIND: &str = "0.0.0.0";

// ── CLI argument definitions ──────────────────────────────────────────────────

/// HTTP-to-CoAP bridge for an ESP32 LED.
///
/// Every value is optional so that a config file can fill in whatever the
/// command line leaves out.
#[derive(Debug, Parser)]
#[command(
    name = "coap-web-bridge",
    about = "HTTP-to-CoAP bridge for controlling an ESP32 LED from a browser",
    version
)]
struct Cli {
    /// IP address to bind the HTTP server to.
    ///
    /// `0.0.0.0` accepts browsers on every interface; `127.0.0.1` only local
    /// ones.
    #[arg(long, env = "BRIDGE_HTTP_BIND")]
    http_bind: Option<String>,

    /// TCP port for the HTTP server.
    #[arg(long, env = "BRIDGE_HTTP_PORT")]
    http_port: Option<u16>,

    /// IP address or hostname of the ESP32.
    #[arg(long, env = "ESP32_IP")]
    esp32_ip: Option<String>,

    /// UDP port of the ESP32's CoAP server.
    #[arg(long, env = "COAP_PORT")]
    coap_port: Option<u16>,

    /// CoAP resource path of the LED.
    #[arg(long, env = "COAP_DEVICE_PATH")]
    device_path: Option<String>,

    /// How long to wait for the ESP32 before answering 504, in milliseconds.
    #[arg(long, env = "COAP_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Directory of static browser assets (index.html, scripts).
    #[arg(long, env = "BRIDGE_PUBLIC_DIR")]
    public_dir: Option<PathBuf>,

    /// TOML config file.
    #[arg(long, env = "BRIDGE_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Reads the config file named by `--config`, if any.
    fn file_config(&self) -> anyhow::Result<FileConfig> {
        match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config file {}", path.display())),
            None => Ok(FileConfig::default()),
        }
    }

    /// Merges the CLI values over `file` and built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the bind address is not an IP address, the device
    /// host is empty, the resource path is not absolute, or the timeout is
    /// zero.
    fn into_bridge_config(self, file: FileConfig) -> anyhow::Result<BridgeConfig> {
        let http_bind = self
            .http_bind
            .or(file.http.bind)
            .unwrap_or_else(|| DEFAULT_HTTP_BIND.to_string());
        let http_port = self.http_port.or(file.http.port).unwrap_or(DEFAULT_HTTP_PORT);
        let bind_ip: IpAddr = http_bind
            .parse()
            .with_context(|| format!("invalid HTTP bind address: '{http_bind}'"))?;

        let host = self
            .esp32_ip
            .or(file.device.host)
            .unwrap_or_else(|| DEFAULT_DEVICE_HOST.to_string());
        if host.trim().is_empty() {
            bail!("ESP32 address must not be empty");
        }

        let path = self
            .device_path
            .or(file.device.path)
            .unwrap_or_else(|| DEFAULT_DEVICE_PATH.to_string());
        if !path.starts_with('/') {
            bail!("device path must start with '/': '{path}'");
        }

        let port = self
            .coap_port
            .or(file.device.port)
            .unwrap_or(coap_core::protocol::messages::DEFAULT_PORT);

        let timeout_ms = self
            .timeout_ms
            .or(file.device.timeout_ms)
            .unwrap_or(DEFAULT_TIMEOUT.as_millis() as u64);
        if timeout_ms == 0 {
            bail!("timeout must be greater than zero");
        }

        Ok(BridgeConfig {
            http_bind_addr: SocketAddr::new(bind_ip, http_port),
            device: DeviceEndpoint::new(host, port, path),
            timeout: Duration::from_millis(timeout_ms),
            public_dir: self.public_dir.or(file.http.public_dir),
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. `tracing_subscriber` is initialised; `RUST_LOG` controls the level.
/// 2. CLI arguments (and their environment fallbacks) are parsed.
/// 3. The optional config file is loaded and merged into a [`BridgeConfig`].
/// 4. [`run_server`] binds the HTTP port and serves until Ctrl+C, then
///    waits for in-flight requests to finish.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let cli = Cli::parse();
    let file = cli.file_config()?;
    let config = cli.into_bridge_config(file)?;

    info!(
        "CoAP LED bridge starting: http={}, device={}",
        config.http_bind_addr, config.device
    );

    // ── Graceful shutdown ─────────────────────────────────────────────────────
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("received Ctrl+C; draining in-flight requests"),
            Err(e) => {
                error!("failed to listen for Ctrl+C signal: {e}");
                // Without a signal handler, keep serving until killed.
                std::future::pending::<()>().await;
            }
        }
    };

    // ── Main server loop ──────────────────────────────────────────────────────
    run_server(config, Arc::new(CoapTransport::new()), shutdown).await?;

    info!("CoAP LED bridge stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
