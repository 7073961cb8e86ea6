//! First-event-wins race between a device exchange and a timeout.
//!
//! Every bridged request starts two things at once: one device exchange and
//! one timer.  Whichever finishes first decides the [`BridgeOutcome`]; the
//! other is dropped, which cancels it.
//!
//! ```text
//!            ┌── transport.send() ──► claim guard ─┐
//! request ───┤                                     ├─► settle() ─► outcome
//!            └── tokio::time::sleep(timeout) ──────┘
//! ```
//!
//! # Single resolution
//!
//! The device side and the timer branch both have to *claim* the shared
//! [`ResolutionGuard`] before their event may count.  The guard is an
//! `AtomicBool` flipped with compare-and-set, so exactly one side ever wins
//! the claim.
//!
//! # Ties
//!
//! Both sides are polled from the same `biased` `tokio::select!`, device
//! first, so a reply that is ready on the same wake-up as the timer always
//! wins.  A timer branch that loses the claim waits for the reply that
//! claimed it.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::application::transport::{DeviceTransport, TransportError};
use crate::domain::{BridgeOutcome, DeviceEndpoint, DeviceRequest};

/// What the device side produces once its exchange has finished.
pub type DeviceEvent = Result<Vec<u8>, TransportError>;

// ── ResolutionGuard ───────────────────────────────────────────────────────────

/// One-shot "already resolved" flag shared by both racers.
#[derive(Debug, Default)]
pub struct ResolutionGuard {
    resolved: AtomicBool,
}

impl ResolutionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the resolution.  Returns `true` for exactly one caller.
    pub fn try_resolve(&self) -> bool {
        self.resolved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

// ── Race ──────────────────────────────────────────────────────────────────────

/// Sends `request` to the device and races it against `timeout`.
///
/// Returns exactly one [`BridgeOutcome`].  The device exchange is dropped
/// before this function returns, or together with the HTTP handler future
/// if the client goes away first, so a late reply can never be observed.
pub async fn race_device_against_timer(
    transport: Arc<dyn DeviceTransport>,
    endpoint: DeviceEndpoint,
    request: DeviceRequest,
    timeout: Duration,
) -> BridgeOutcome {
    let guard = ResolutionGuard::new();
    let exchange = async {
        let event = transport.send(endpoint, request).await;
        if !guard.try_resolve() {
            debug!("device event arrived after the timeout; discarded");
        }
        event
    };

    settle(&guard, exchange, tokio::time::sleep(timeout)).await
}

/// Waits for the first of {device event, timer} and turns it into an
/// outcome.
///
/// Split out from [`race_device_against_timer`] so tests can drive both
/// sides by hand.  `device` is expected to claim `guard` before it
/// completes.
pub(crate) async fn settle<D, T>(guard: &ResolutionGuard, device: D, timer: T) -> BridgeOutcome
where
    D: Future<Output = DeviceEvent>,
    T: Future<Output = ()>,
{
    tokio::pin!(device);

    let timer_won = tokio::select! {
        biased;
        event = &mut device => return outcome_from(event),
        () = timer => guard.try_resolve(),
    };

    if timer_won {
        BridgeOutcome::TimedOut
    } else {
        // The device claimed the guard first and is about to complete.
        outcome_from(device.await)
    }
}

fn outcome_from(event: DeviceEvent) -> BridgeOutcome {
    match event {
        Ok(payload) => BridgeOutcome::DeviceReply(payload),
        Err(e) => BridgeOutcome::DeviceError(e.to_string()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
