//! Readiness gate driving the startup reconciliation loop.

use crate::initiator::Initiator;
use presenced_core::config::InitConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Signals whether the first reconciliation run has succeeded.
///
/// The HTTP layer refuses entity traffic until this flips true.
#[derive(Clone, Default)]
pub struct ReadinessGate {
    initialized: Arc<AtomicBool>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a reconciliation run has completed successfully.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Mark initialization as complete. Flipped by the initialization task
    /// once a reconciliation run succeeds.
    pub fn set_initialized(&self) {
        self.initialized.store(true, Ordering::SeqCst);
    }
}

/// Spawn the initialization task: run the initiator until one run succeeds,
/// then flip the gate and stop.
///
/// Failed runs are retried with exponential backoff between
/// `retry_delay_secs` and `retry_max_delay_secs`. Runs never overlap; the
/// loop is strictly sequential.
pub fn spawn_initialization(
    gate: ReadinessGate,
    initiator: Initiator,
    config: InitConfig,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let max_delay = Duration::from_secs(config.retry_max_delay_secs);
        let mut delay = Duration::from_secs(config.retry_delay_secs).min(max_delay);

        loop {
            match initiator.run().await {
                Ok(_) => {
                    gate.set_initialized();
                    tracing::info!("Presence initialization complete, accepting traffic");
                    return;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Error to fetch data for initialization");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(max_delay);
                }
            }
        }
    })
}
