// src/supervisor/mod.rs
//! Stimulation session supervision
//!
//! [`StimulationSupervisor`] owns the lifecycle of the current stimulation
//! operation against one device session. It guarantees that the device never
//! observes two overlapping stimulation commands: `start` admits one
//! operation, `update` supersedes it through cancel-and-replace, and
//! `end`/`close` tear it down. A superseded operation must acknowledge
//! cancellation before its replacement is issued, bounded by a configurable
//! grace period.

pub mod handle;


pub use handle::{OperationHandle, OperationOutcome, OperationStatus};

use crate::config::SupervisorSettings;
use crate::device::{
    ChannelConfig, CommandStatus, DeviceSession, StimulationDuration, StimulationRequest,
};
use crate::error::{SupervisorError, SupervisorResult};
use crate::utils::validation::{validate_channel_set, validate_request};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::time::{sleep_until, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Supervisor lifecycle state; at most one operation is ever `Running`.
enum SupervisorState {
    Uninitialized,
    Idle,
    Running(ActiveOperation),
    Closed,
}

impl SupervisorState {
    fn name(&self) -> &'static str {
        match self {
            SupervisorState::Uninitialized => "uninitialized",
            SupervisorState::Idle => "idle",
            SupervisorState::Running(_) => "running",
            SupervisorState::Closed => "closed",
        }
    }
}

/// Book-keeping for the one in-flight operation.
struct ActiveOperation {
    id: u64,
    handle: OperationHandle,
    cancel_tx: watch::Sender<bool>,
}

/// Serializes access to the active stimulation operation on one device
/// session.
///
/// All public operations are mutually exclusive; state transitions appear
/// atomic to external callers even though the stimulation operation itself
/// runs as a separately spawned task.
pub struct StimulationSupervisor<S: DeviceSession> {
    session: Arc<AsyncMutex<S>>,
    state: Arc<Mutex<SupervisorState>>,
    configured: Mutex<Vec<u8>>,
    call_gate: AsyncMutex<()>,
    settings: SupervisorSettings,
    next_operation_id: AtomicU64,
}

impl<S: DeviceSession> StimulationSupervisor<S> {
    /// Take exclusive ownership of an open device session.
    pub fn new(session: S, settings: SupervisorSettings) -> SupervisorResult<Self> {
        settings.validate()?;
        Ok(Self {
            session: Arc::new(AsyncMutex::new(session)),
            state: Arc::new(Mutex::new(SupervisorState::Uninitialized)),
            configured: Mutex::new(Vec::new()),
            call_gate: AsyncMutex::new(()),
            settings,
            next_operation_id: AtomicU64::new(1),
        })
    }

    /// Name of the current state, for logging and diagnostics.
    pub fn state_name(&self) -> &'static str {
        self.state.lock().name()
    }

    /// Handle to the operation currently running, if any.
    pub fn current_operation(&self) -> Option<OperationHandle> {
        match &*self.state.lock() {
            SupervisorState::Running(active) => Some(active.handle.clone()),
            _ => None,
        }
    }

    /// Validate the channel set and send it to the device.
    ///
    /// Transitions the supervisor from its uninitialized marker to idle.
    pub async fn initialize(&self, channels: &[ChannelConfig]) -> SupervisorResult<()> {
        let _gate = self.call_gate.lock().await;

        match &*self.state.lock() {
            SupervisorState::Uninitialized => {}
            SupervisorState::Closed => return Err(SupervisorError::Closed),
            other => {
                return Err(SupervisorError::InvalidState {
                    operation: "initialize",
                    state: other.name(),
                })
            }
        }

        validate_channel_set(channels)?;

        self.session.lock().await.configure(channels).await?;

        *self.configured.lock() = channels.iter().map(|c| c.index).collect();
        *self.state.lock() = SupervisorState::Idle;
        info!(channel_count = channels.len(), "stimulation channels configured");
        Ok(())
    }

    /// Begin a stimulation operation. Only legal while idle; callers that
    /// want supersede semantics use [`Self::update`].
    pub async fn start(&self, request: StimulationRequest) -> SupervisorResult<OperationHandle> {
        let _gate = self.call_gate.lock().await;

        match &*self.state.lock() {
            SupervisorState::Idle => {}
            SupervisorState::Closed => return Err(SupervisorError::Closed),
            other => {
                return Err(SupervisorError::InvalidState {
                    operation: "start",
                    state: other.name(),
                })
            }
        }

        self.check_request(&request)?;
        Ok(self.spawn_operation(request))
    }

    /// Supersede the running operation (if any) with a new request.
    ///
    /// The running operation is cancelled and awaited up to the grace
    /// period; its outcome is reported as `Cancelled`. Only after the
    /// acknowledgment and an intervening device stop is the new command
    /// issued, so the device never sees two writers. While idle this
    /// behaves exactly like [`Self::start`], with no spurious wait.
    pub async fn update(&self, request: StimulationRequest) -> SupervisorResult<OperationHandle> {
        let _gate = self.call_gate.lock().await;

        let prior = {
            let state = self.state.lock();
            match &*state {
                SupervisorState::Idle => None,
                SupervisorState::Running(active) => Some((active.id, active.handle.clone())),
                SupervisorState::Closed => return Err(SupervisorError::Closed),
                other => {
                    return Err(SupervisorError::InvalidState {
                        operation: "update",
                        state: other.name(),
                    })
                }
            }
        };

        // Reject bad requests before cancelling anything, so a failed
        // update leaves the running operation untouched.
        self.check_request(&request)?;

        if let Some((prior_id, mut prior_handle)) = prior {
            let outcome = self.cancel_and_await(prior_id, &mut prior_handle, "update").await?;
            debug!(operation = prior_id, ?outcome, "superseded operation settled");
            self.session.lock().await.stop().await?;
        }

        Ok(self.spawn_operation(request))
    }

    /// Cancel any running operation and send the device's explicit stop.
    ///
    /// Idempotent from the caller's point of view: ending an idle
    /// supervisor just re-issues the (idempotent) device stop.
    pub async fn end(&self) -> SupervisorResult<()> {
        let _gate = self.call_gate.lock().await;

        let prior = {
            let state = self.state.lock();
            match &*state {
                SupervisorState::Idle => None,
                SupervisorState::Running(active) => Some((active.id, active.handle.clone())),
                SupervisorState::Closed => return Err(SupervisorError::Closed),
                other => {
                    return Err(SupervisorError::InvalidState {
                        operation: "end",
                        state: other.name(),
                    })
                }
            }
        };

        if let Some((prior_id, mut prior_handle)) = prior {
            self.cancel_and_await(prior_id, &mut prior_handle, "end").await?;
        }

        self.session.lock().await.stop().await?;
        *self.state.lock() = SupervisorState::Idle;
        info!("stimulation ended");
        Ok(())
    }

    /// Stop any running operation and release the device session.
    ///
    /// Best-effort: cleanup continues past the first failure and the
    /// supervisor always ends up closed; the first error encountered is
    /// surfaced. The device phase is bounded by the grace period so a hung
    /// device cannot wedge the close.
    pub async fn close(&self) -> SupervisorResult<()> {
        let _gate = self.call_gate.lock().await;

        if matches!(&*self.state.lock(), SupervisorState::Closed) {
            return Err(SupervisorError::Closed);
        }

        let mut first_error: Option<SupervisorError> = None;

        let prior = {
            let state = self.state.lock();
            match &*state {
                SupervisorState::Running(active) => Some((active.id, active.handle.clone())),
                _ => None,
            }
        };
        let was_initialized = !matches!(&*self.state.lock(), SupervisorState::Uninitialized);

        if let Some((prior_id, mut prior_handle)) = prior {
            if let Err(err) = self.cancel_and_await(prior_id, &mut prior_handle, "close").await {
                warn!(error = %err, "cleanup error while closing");
                first_error.get_or_insert(err);
            }
        }

        let session = Arc::clone(&self.session);
        let release = async move {
            let mut session = session.lock().await;
            if was_initialized {
                if let Err(err) = session.stop().await {
                    return Err(SupervisorError::Device(err));
                }
            }
            session.close().await.map_err(SupervisorError::Device)
        };

        match timeout(self.settings.cancellation_grace(), release).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!(error = %err, "device error while closing");
                first_error.get_or_insert(err);
            }
            Err(_) => {
                warn!("device did not release within the grace period");
                first_error.get_or_insert(SupervisorError::CancellationTimeout {
                    grace_ms: self.settings.cancellation_grace_ms,
                });
            }
        }

        *self.state.lock() = SupervisorState::Closed;
        info!("device session released");

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn check_request(&self, request: &StimulationRequest) -> SupervisorResult<()> {
        let configured = self.configured.lock();
        validate_request(request, &configured)?;
        Ok(())
    }

    /// Signal cancellation on the active operation and wait for its
    /// acknowledged terminal state, bounded by the grace period.
    ///
    /// On success the `Running` marker is dropped; on timeout the state is
    /// left exactly as it was, so the caller sees a consistent supervisor.
    async fn cancel_and_await(
        &self,
        operation_id: u64,
        handle: &mut OperationHandle,
        caller: &'static str,
    ) -> SupervisorResult<OperationOutcome> {
        {
            let state = self.state.lock();
            if let SupervisorState::Running(active) = &*state {
                if active.id == operation_id {
                    // Receiver may already be gone if the operation finished.
                    let _ = active.cancel_tx.send(true);
                }
            }
        }

        match timeout(self.settings.cancellation_grace(), handle.wait()).await {
            Ok(outcome) => {
                let mut state = self.state.lock();
                if matches!(&*state, SupervisorState::Running(active) if active.id == operation_id)
                {
                    *state = SupervisorState::Idle;
                }
                Ok(outcome)
            }
            Err(_) => {
                warn!(
                    operation = operation_id,
                    caller,
                    grace_ms = self.settings.cancellation_grace_ms,
                    "cancellation not acknowledged within grace period"
                );
                Err(SupervisorError::CancellationTimeout {
                    grace_ms: self.settings.cancellation_grace_ms,
                })
            }
        }
    }

    /// Admit a request: mark the supervisor running, then spawn the
    /// operation task. The state is set before the task starts so a fast
    /// completion can never be overwritten by a stale `Running` marker.
    fn spawn_operation(&self, request: StimulationRequest) -> OperationHandle {
        let operation_id = self.next_operation_id.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (status_tx, status_rx) = watch::channel(OperationStatus::Running);
        let handle = OperationHandle::new(operation_id, status_rx);

        {
            let mut state = self.state.lock();
            *state = SupervisorState::Running(ActiveOperation {
                id: operation_id,
                handle: handle.clone(),
                cancel_tx,
            });
        }

        let worker = OperationWorker {
            id: operation_id,
            request,
            session: Arc::clone(&self.session),
            state: Arc::clone(&self.state),
            poll_interval: self.settings.status_poll_interval(),
            status_tx,
            cancel_rx,
        };

        info!(operation = operation_id, "stimulation operation accepted");
        tokio::spawn(worker.run());
        handle
    }
}

/// The spawned task driving one stimulation operation.
struct OperationWorker<S: DeviceSession> {
    id: u64,
    request: StimulationRequest,
    session: Arc<AsyncMutex<S>>,
    state: Arc<Mutex<SupervisorState>>,
    poll_interval: std::time::Duration,
    status_tx: watch::Sender<OperationStatus>,
    cancel_rx: watch::Receiver<bool>,
}

impl<S: DeviceSession> OperationWorker<S> {
    async fn run(mut self) {
        let sent = self.session.lock().await.send_stimulation_command(&self.request).await;
        let token = match sent {
            Ok(token) => token,
            Err(err) => {
                self.finish(OperationStatus::Failed(err.to_string()));
                return;
            }
        };
        debug!(operation = self.id, command = token.id(), "stimulation command issued");

        let deadline = match self.request.duration() {
            StimulationDuration::For(duration) => Some(Instant::now() + duration),
            StimulationDuration::UntilStopped => None,
        };

        let mut poll = tokio::time::interval(self.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // Skip the interval's immediate first tick; the command was just sent.
        poll.reset();

        loop {
            tokio::select! {
                biased;

                changed = self.cancel_rx.changed() => {
                    // A closed channel means the supervisor itself is gone;
                    // treat that as cancellation too.
                    if changed.is_err() || *self.cancel_rx.borrow_and_update() {
                        self.acknowledge_cancellation();
                        return;
                    }
                }

                _ = Self::deadline_elapsed(deadline) => {
                    self.complete_naturally().await;
                    return;
                }

                _ = poll.tick() => {
                    let status = self.session.lock().await.poll_status(&token).await;
                    match status {
                        Ok(CommandStatus::Running) => {}
                        Ok(CommandStatus::Completed) => {
                            self.complete_naturally().await;
                            return;
                        }
                        Ok(CommandStatus::Failed(reason)) => {
                            self.finish(OperationStatus::Failed(reason));
                            return;
                        }
                        Err(err) => {
                            self.finish(OperationStatus::Failed(err.to_string()));
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn deadline_elapsed(deadline: Option<Instant>) {
        match deadline {
            Some(at) => sleep_until(at).await,
            None => std::future::pending().await,
        }
    }

    /// The duration elapsed or the device reported completion: stop the
    /// device, hand the supervisor back to idle, report `Completed`.
    async fn complete_naturally(&mut self) {
        if let Err(err) = self.session.lock().await.stop().await {
            warn!(operation = self.id, error = %err, "stop after natural completion failed");
        }
        info!(operation = self.id, "stimulation operation completed");
        self.finish(OperationStatus::Completed);
    }

    /// Cancellation observed: cease touching the device immediately. The
    /// superseding caller owns the stop command and the state transition.
    fn acknowledge_cancellation(&mut self) {
        debug!(operation = self.id, "cancellation acknowledged");
        self.status_tx.send_replace(OperationStatus::Cancelled);
    }

    fn finish(&mut self, status: OperationStatus) {
        {
            let mut state = self.state.lock();
            if matches!(&*state, SupervisorState::Running(active) if active.id == self.id) {
                *state = SupervisorState::Idle;
            }
        }
        self.status_tx.send_replace(status);
    }
}
