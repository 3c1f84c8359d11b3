//! Context - Deadline and cancellation handed down by the host engine
//!
//! Every provider operation receives an `OperationContext`. Every remote call
//! and every sleep inside an operation is a suspension point where the
//! context's cancellation is observed.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// The operation was cancelled by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Per-operation context
#[derive(Debug, Clone)]
pub struct OperationContext {
    cancel: CancellationToken,
    timeout: Option<Duration>,
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationContext {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            timeout: None,
        }
    }

    /// Context driven by an externally owned cancellation token
    pub fn with_token(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            timeout: None,
        }
    }

    /// Override the resource's default timeout for this operation
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Timeout for this operation, falling back to the resource default
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout.unwrap_or(default)
    }

    /// Absolute deadline for an operation starting now
    pub fn deadline(&self, default: Duration) -> Instant {
        Instant::now() + self.timeout_or(default)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fail fast if the host already cancelled
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Sleep for `duration` unless cancelled first
    pub async fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
