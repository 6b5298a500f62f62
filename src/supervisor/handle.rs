// src/supervisor/handle.rs
//! Handle to one in-flight stimulation operation

use tokio::sync::watch;

/// Observable state of a stimulation operation
#[derive(Debug, Clone, PartialEq)]
pub enum OperationStatus {
    /// The operation is issuing or monitoring its device command
    Running,
    /// The operation ran to natural completion
    Completed,
    /// The operation was superseded or explicitly ended
    Cancelled,
    /// The device rejected or aborted the operation
    Failed(String),
}

impl OperationStatus {
    /// Whether the status is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OperationStatus::Running)
    }

    fn outcome(&self) -> Option<OperationOutcome> {
        match self {
            OperationStatus::Running => None,
            OperationStatus::Completed => Some(OperationOutcome::Completed),
            OperationStatus::Cancelled => Some(OperationOutcome::Cancelled),
            OperationStatus::Failed(reason) => Some(OperationOutcome::Failed(reason.clone())),
        }
    }
}

/// Terminal outcome of a stimulation operation
///
/// `Cancelled` means the operation was intentionally superseded or ended;
/// `Failed` means the device rejected or aborted it. Callers can rely on
/// the distinction.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    /// Ran its full duration (or the device reported completion)
    Completed,
    /// Superseded by `update` or stopped by `end`/`close`
    Cancelled,
    /// Rejected or aborted, with the device's reason
    Failed(String),
}

/// Cloneable handle to one in-flight invocation of a stimulation request
///
/// Handles observe the operation; they cannot influence it. Cancellation is
/// only ever requested through the supervisor so the at-most-one-writer
/// invariant stays in one place.
#[derive(Debug, Clone)]
pub struct OperationHandle {
    id: u64,
    status_rx: watch::Receiver<OperationStatus>,
}

impl OperationHandle {
    pub(crate) fn new(id: u64, status_rx: watch::Receiver<OperationStatus>) -> Self {
        Self { id, status_rx }
    }

    /// Supervisor-assigned operation id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current status snapshot.
    pub fn status(&self) -> OperationStatus {
        self.status_rx.borrow().clone()
    }

    /// Whether the operation has reached a terminal state.
    pub fn is_finished(&self) -> bool {
        self.status_rx.borrow().is_terminal()
    }

    /// Wait for the operation to reach a terminal state.
    pub async fn wait(&mut self) -> OperationOutcome {
        if let Ok(status) = self.status_rx.wait_for(OperationStatus::is_terminal).await {
            if let Some(outcome) = status.outcome() {
                return outcome;
            }
        }

        // The operation task dropped its sender; report whatever was last
        // observed, treating a still-running status as a failure.
        self.status().outcome().unwrap_or_else(|| {
            OperationOutcome::Failed("operation ended without reporting a status".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!OperationStatus::Running.is_terminal());
        assert!(OperationStatus::Completed.is_terminal());
        assert!(OperationStatus::Cancelled.is_terminal());
        assert!(OperationStatus::Failed("x".to_string()).is_terminal());
    }

    #[tokio::test]
    async fn test_wait_resolves_on_terminal_status() {
        let (tx, rx) = watch::channel(OperationStatus::Running);
        let mut handle = OperationHandle::new(1, rx);
        assert!(!handle.is_finished());

        tx.send_replace(OperationStatus::Cancelled);
        assert_eq!(handle.wait().await, OperationOutcome::Cancelled);
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_wait_survives_dropped_sender() {
        let (tx, rx) = watch::channel(OperationStatus::Running);
        let mut handle = OperationHandle::new(2, rx);
        drop(tx);

        match handle.wait().await {
            OperationOutcome::Failed(reason) => assert!(reason.contains("without reporting")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
