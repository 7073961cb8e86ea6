//! `led-ctl`: drive the device's LED straight from a terminal.
//!
//! Uses the same CoAP transport and timeout race as the HTTP bridge, so it
//! doubles as a quick check that the device is reachable before starting
//! the bridge.
//!
//! ```text
//! led-ctl 192.168.4.1 on
//! led-ctl 192.168.4.1 status --timeout-ms 1000
//! ```
//!
//! Prints the device's answer on stdout and exits non-zero on timeout or
//! error.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use coap_web_bridge::application::BridgeService;
use coap_web_bridge::domain::{BridgeConfig, BridgeRequest, DeviceEndpoint, LedState};
use coap_web_bridge::infrastructure::CoapTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
    /// Switch the LED on.
    On,
    /// Switch the LED off.
    Off,
    /// Read the current LED state.
    Status,
}

impl Action {
    fn request(self) -> BridgeRequest {
        match self {
            Action::On => BridgeRequest::set_led(LedState::On.as_str()),
            Action::Off => BridgeRequest::set_led(LedState::Off.as_str()),
            Action::Status => BridgeRequest::read_led(),
        }
    }
}

/// Control a CoAP LED directly.
#[derive(Debug, Parser)]
#[command(name = "led-ctl", version)]
struct Cli {
    /// Device IP address or hostname.
    host: String,

    /// What to do.
    #[arg(value_enum)]
    action: Action,

    /// Device CoAP port.
    #[arg(long, default_value_t = 5683)]
    port: u16,

    /// LED resource path.
    #[arg(long, default_value = "/led")]
    path: String,

    /// Give up after this many milliseconds (must be at least 1).
    #[arg(long, default_value_t = 3000, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let device = DeviceEndpoint::new(cli.host, cli.port, cli.path);
    let uri = device.uri();
    let config = BridgeConfig {
        device,
        timeout: Duration::from_millis(cli.timeout_ms),
        ..BridgeConfig::default()
    };

    let service = BridgeService::new(Arc::new(config), Arc::new(CoapTransport::new()));
    let reply = service
        .handle(cli.action.request())
        .await
        .with_context(|| format!("{:?} on {uri} failed", cli.action))?;

    println!("{reply}");
    Ok(())
}
