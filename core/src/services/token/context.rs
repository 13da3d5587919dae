//! Per-request deadline and cancellation

use std::future::Future;

use tokio::sync::watch;
use tokio::time::{Duration, Instant};

use crate::errors::DomainError;

/// Deadline and cancel signal carried by every manager operation
///
/// Cloning a context shares its cancel signal.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
    cancel: Option<watch::Receiver<bool>>,
}

/// Cancels every context created from the same [`RequestContext::cancellable`] call
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl RequestContext {
    /// A context that never expires and cannot be canceled
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().deadline_at(Instant::now() + timeout)
    }

    /// A context that expires at `deadline`
    pub fn with_deadline(deadline: Instant) -> Self {
        Self::background().deadline_at(deadline)
    }

    /// A cancellable context plus the handle that cancels it
    pub fn cancellable() -> (Self, CancelHandle) {
        let (sender, receiver) = watch::channel(false);
        (
            Self {
                deadline: None,
                cancel: Some(receiver),
            },
            CancelHandle { sender },
        )
    }

    /// Returns a copy that also expires at `deadline`, keeping the earlier one
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the context is already canceled or past its deadline
    pub fn is_canceled(&self) -> bool {
        let canceled = self
            .cancel
            .as_ref()
            .map(|receiver| *receiver.borrow())
            .unwrap_or(false);
        let expired = self
            .deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false);
        canceled || expired
    }

    /// Fails with `Canceled` before starting work on a dead context
    pub fn check(&self) -> Result<(), DomainError> {
        if self.is_canceled() {
            Err(DomainError::Canceled)
        } else {
            Ok(())
        }
    }

    /// Drives `fut` until it completes or the context is canceled
    pub async fn run<F, T>(&self, fut: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        let mut cancel = self.cancel.clone();
        let canceled = async move {
            match cancel.as_mut() {
                // A dropped handle can no longer cancel
                Some(receiver) => {
                    let signaled = receiver.wait_for(|canceled| *canceled).await.map(|_| ());
                    if signaled.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = canceled => Err(DomainError::Canceled),
            _ = deadline => Err(DomainError::Canceled),
            result = fut => result,
        }
    }
}
