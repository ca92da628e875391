//! The sync coordinator: the only writer of the pipeline store.
//!
//! Requests are queued and executed one at a time by a single worker task.
//! Moves are strictly serialized: a queued move is not applied until the
//! previous move's remote result is known, so every rollback restores the
//! board captured immediately before its own move and can never undo a later
//! one.

use super::phase::{MoveId, MovePhase};
use crate::aggregate::{PipelineStatistics, PipelineTotals};
use crate::backend::LeadBackend;
use crate::config::SyncConfig;
use crate::error::{PipelineError, Result};
use crate::reorder::{MoveRequest, ResolvedMove, StageUpdate};
use crate::stage::StageRegistry;
use crate::store::{PipelineBoard, PipelineStore};
use crate::types::{Lead, LeadId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Errors shared between an outcome, a notice, and the log
pub type SharedError = Arc<PipelineError>;

/// How a move request ended
#[derive(Debug, Clone)]
pub enum MoveOutcome {
    /// Applied locally and accepted by the backend
    Committed {
        move_id: MoveId,
        update: StageUpdate,
    },
    /// The lead was dropped where it already was
    Unchanged { move_id: MoveId },
    /// Applied locally, refused remotely, and reverted
    RolledBack { move_id: MoveId, error: SharedError },
    /// Refused before anything was mutated
    Rejected { move_id: MoveId, error: SharedError },
    /// The coordinator shut down before the result was known
    Cancelled { move_id: MoveId },
}

impl MoveOutcome {
    pub fn move_id(&self) -> MoveId {
        match self {
            Self::Committed { move_id, .. }
            | Self::Unchanged { move_id }
            | Self::RolledBack { move_id, .. }
            | Self::Rejected { move_id, .. }
            | Self::Cancelled { move_id } => *move_id,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// User-facing events published by the coordinator
#[derive(Debug, Clone)]
pub enum SyncNotice {
    MoveCommitted {
        move_id: MoveId,
        lead_id: LeadId,
    },
    MoveRolledBack {
        move_id: MoveId,
        lead_id: LeadId,
        error: SharedError,
    },
    MoveRejected {
        move_id: MoveId,
        lead_id: LeadId,
        error: SharedError,
    },
    Resynced {
        leads: usize,
    },
    ResyncFailed {
        error: SharedError,
    },
}

/// A change that already happened elsewhere (creation form, edit dialog,
/// deletion) and only needs to be reflected on the board.
#[derive(Debug, Clone)]
pub enum LocalChange {
    Created(Lead),
    Edited(Lead),
    Deleted(LeadId),
}

/// Pending result of a move request
#[derive(Debug)]
pub struct MoveHandle {
    move_id: MoveId,
    outcome: oneshot::Receiver<MoveOutcome>,
}

impl MoveHandle {
    /// Sequence number of this move
    pub fn move_id(&self) -> MoveId {
        self.move_id
    }

    /// Wait for the move to finish
    pub async fn outcome(self) -> MoveOutcome {
        self.outcome
            .await
            .unwrap_or(MoveOutcome::Cancelled {
                move_id: self.move_id,
            })
    }

    fn resolved(outcome: MoveOutcome) -> Self {
        let (tx, rx) = oneshot::channel();
        let move_id = outcome.move_id();
        let _ = tx.send(outcome);
        Self {
            move_id,
            outcome: rx,
        }
    }
}

enum Command {
    Move {
        request: ResolvedMove,
        move_id: MoveId,
        reply: oneshot::Sender<MoveOutcome>,
    },
    Reload {
        reply: oneshot::Sender<std::result::Result<usize, SharedError>>,
    },
    Local {
        change: LocalChange,
        reply: oneshot::Sender<std::result::Result<(), SharedError>>,
    },
}

/// Owner of the pipeline store and the move API the board calls into.
///
/// Dropping the coordinator cancels its worker; a remote result that arrives
/// afterwards is discarded without touching the store.
pub struct SyncCoordinator {
    commands: mpsc::Sender<Command>,
    store: Arc<PipelineStore>,
    backend: Arc<dyn LeadBackend>,
    registry: &'static StageRegistry,
    notices: broadcast::Sender<SyncNotice>,
    phase: watch::Receiver<MovePhase>,
    next_move_id: AtomicU64,
    resync_on_inconsistency: bool,
    cancel: CancellationToken,
}

impl SyncCoordinator {
    /// Start a coordinator with an empty board. Must be called inside a Tokio runtime.
    pub fn spawn(backend: Arc<dyn LeadBackend>, config: &SyncConfig) -> Self {
        Self::spawn_with_board(backend, config, PipelineBoard::new())
    }

    /// Start a coordinator and load the board from the backend
    pub async fn connect(
        backend: Arc<dyn LeadBackend>,
        config: &SyncConfig,
    ) -> std::result::Result<Self, SharedError> {
        let coordinator = Self::spawn(backend, config);
        coordinator.reload().await?;
        Ok(coordinator)
    }

    /// Start a coordinator seeded with a board already in hand
    pub fn spawn_with_board(
        backend: Arc<dyn LeadBackend>,
        config: &SyncConfig,
        board: PipelineBoard,
    ) -> Self {
        let store = Arc::new(PipelineStore::new(board));
        let (commands, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let (notices, _) = broadcast::channel(config.notice_capacity.max(1));
        let (phase_tx, phase) = watch::channel(MovePhase::Idle);
        let cancel = CancellationToken::new();

        let worker = Worker {
            store: store.clone(),
            backend: backend.clone(),
            notices: notices.clone(),
            phase: phase_tx,
            config: config.clone(),
            cancel: cancel.clone(),
        };
        tokio::spawn(worker.run(receiver));

        Self {
            commands,
            store,
            backend,
            registry: StageRegistry::global(),
            notices,
            phase,
            next_move_id: AtomicU64::new(1),
            resync_on_inconsistency: config.resync_on_inconsistency,
            cancel,
        }
    }

    /// Read access to the store
    pub fn store(&self) -> &PipelineStore {
        &self.store
    }

    /// The board as of now
    pub fn board(&self) -> Arc<PipelineBoard> {
        self.store.current()
    }

    /// Wake after every store replacement
    pub fn subscribe(&self) -> watch::Receiver<Arc<PipelineBoard>> {
        self.store.subscribe()
    }

    /// Stream of user-facing events
    pub fn notices(&self) -> broadcast::Receiver<SyncNotice> {
        self.notices.subscribe()
    }

    /// Current move phase
    pub fn phase(&self) -> MovePhase {
        self.phase.borrow().clone()
    }

    /// Totals recomputed from the current board
    pub fn totals(&self) -> PipelineTotals {
        PipelineTotals::compute(&self.store.current())
    }

    /// Server-side statistics, fetched fresh
    pub async fn statistics(&self) -> Result<PipelineStatistics> {
        self.backend.fetch_statistics().await
    }

    /// Entry point for a drag-and-drop gesture.
    ///
    /// Never blocks and never fails: problems are reported through the
    /// returned handle and the notice stream.
    pub fn on_move_requested(
        &self,
        lead_id: impl Into<LeadId>,
        source_stage: &str,
        source_index: usize,
        dest_stage: &str,
        dest_index: usize,
    ) -> MoveHandle {
        self.request_move(MoveRequest::new(
            lead_id,
            source_stage,
            source_index,
            dest_stage,
            dest_index,
        ))
    }

    /// Queue a move request
    pub fn request_move(&self, request: MoveRequest) -> MoveHandle {
        let move_id = self.next_move_id.fetch_add(1, Ordering::Relaxed);

        let resolved = match request.resolve(self.registry) {
            Ok(resolved) => resolved,
            Err(error) => {
                warn!(move_id, lead = %request.lead_id, %error, "rejecting move");
                let resync = error.requires_resync() && self.resync_on_inconsistency;
                let error = Arc::new(error);
                let _ = self.notices.send(SyncNotice::MoveRejected {
                    move_id,
                    lead_id: request.lead_id,
                    error: error.clone(),
                });
                if resync {
                    self.queue_reload();
                }
                return MoveHandle::resolved(MoveOutcome::Rejected { move_id, error });
            }
        };

        let (reply, outcome) = oneshot::channel();
        let command = Command::Move {
            request: resolved,
            move_id,
            reply,
        };

        match self.commands.try_send(command) {
            Ok(()) => MoveHandle { move_id, outcome },
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(move_id, "move queue full");
                let error = Arc::new(PipelineError::QueueFull);
                let _ = self.notices.send(SyncNotice::MoveRejected {
                    move_id,
                    lead_id: request.lead_id,
                    error: error.clone(),
                });
                MoveHandle::resolved(MoveOutcome::Rejected { move_id, error })
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                MoveHandle::resolved(MoveOutcome::Cancelled { move_id })
            }
        }
    }

    /// Replace the board with the backend's authoritative copy.
    ///
    /// Runs after every move queued before it has finished.
    pub async fn reload(&self) -> std::result::Result<usize, SharedError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Reload { reply }).await?;
        rx.await.map_err(|_| Arc::new(PipelineError::Shutdown))?
    }

    /// Reflect a change made outside the board
    pub async fn apply_local(&self, change: LocalChange) -> std::result::Result<(), SharedError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Local { change, reply }).await?;
        rx.await.map_err(|_| Arc::new(PipelineError::Shutdown))?
    }

    /// Stop the worker; in-flight results are discarded
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Ask the worker for a reload without waiting for it. The result is
    /// published as a notice.
    fn queue_reload(&self) {
        let (reply, _) = oneshot::channel();
        if let Err(error) = self.commands.try_send(Command::Reload { reply }) {
            warn!(%error, "could not queue board reload");
        }
    }

    async fn send(&self, command: Command) -> std::result::Result<(), SharedError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Arc::new(PipelineError::Shutdown))
    }
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// What came back from the remote call
enum Persisted {
    Accepted,
    Refused(PipelineError),
    /// No answer in time; the backend may still have applied the update
    TimedOut(PipelineError),
}

struct Worker {
    store: Arc<PipelineStore>,
    backend: Arc<dyn LeadBackend>,
    notices: broadcast::Sender<SyncNotice>,
    phase: watch::Sender<MovePhase>,
    config: SyncConfig,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self, mut commands: mpsc::Receiver<Command>) {
        loop {
            let command = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };

            match command {
                Command::Move {
                    request,
                    move_id,
                    reply,
                } => {
                    let outcome = self.handle_move(request, move_id).await;
                    let _ = reply.send(outcome);
                }
                Command::Reload { reply } => {
                    let result = self.reload().await;
                    let _ = reply.send(result);
                }
                Command::Local { change, reply } => {
                    let result = self.apply_local(change);
                    let _ = reply.send(result);
                }
            }
        }

        // Anything still queued is answered as cancelled by dropped reply senders.
        debug!("sync worker stopped");
    }

    async fn handle_move(&self, request: ResolvedMove, move_id: MoveId) -> MoveOutcome {
        if self.cancel.is_cancelled() {
            return MoveOutcome::Cancelled { move_id };
        }

        let snapshot = self.store.snapshot();
        if snapshot.locate(&request.lead_id) != Some((request.source, request.source_index)) {
            debug!(
                move_id,
                lead = %request.lead_id,
                "source index from request differs from board, locating by id"
            );
        }

        let next = match request.apply(&snapshot) {
            Ok(next) => next,
            Err(error) => return self.reject(request, move_id, error).await,
        };

        if Arc::ptr_eq(&next, &snapshot) {
            debug!(move_id, lead = %request.lead_id, "move left board unchanged");
            return MoveOutcome::Unchanged { move_id };
        }

        let update = match StageUpdate::from_board(&next, &request.lead_id) {
            Ok(update) => update,
            Err(error) => return self.reject(request, move_id, error).await,
        };

        if !self.transition(|phase| phase.apply(move_id, snapshot)) {
            return MoveOutcome::Cancelled { move_id };
        }
        self.store.replace(next);
        debug!(
            move_id,
            lead = %update.lead_id,
            stage = %update.new_stage,
            position = update.new_position,
            "move applied optimistically"
        );

        let persisted = match self.persist(&update).await {
            Some(persisted) => persisted,
            None => {
                debug!(move_id, "coordinator cancelled, discarding remote result");
                return MoveOutcome::Cancelled { move_id };
            }
        };

        let (error, timed_out) = match persisted {
            Persisted::Accepted => {
                self.transition(MovePhase::commit);
                info!(move_id, lead = %update.lead_id, stage = %update.new_stage, "move committed");
                let _ = self.notices.send(SyncNotice::MoveCommitted {
                    move_id,
                    lead_id: update.lead_id.clone(),
                });
                return MoveOutcome::Committed { move_id, update };
            }
            Persisted::Refused(error) => (error, false),
            Persisted::TimedOut(error) => (error, true),
        };

        warn!(move_id, lead = %update.lead_id, %error, "remote update failed, rolling back");
        self.roll_back(move_id, &error);
        let error = Arc::new(error);
        let _ = self.notices.send(SyncNotice::MoveRolledBack {
            move_id,
            lead_id: update.lead_id,
            error: error.clone(),
        });

        if timed_out && self.config.resync_on_inconsistency {
            debug!(move_id, "remote update timed out, re-fetching board");
            let _ = self.reload().await;
        }
        MoveOutcome::RolledBack { move_id, error }
    }

    /// Run the remote call, honoring the configured timeout and cancellation.
    /// `None` means the coordinator was cancelled first.
    async fn persist(&self, update: &StageUpdate) -> Option<Persisted> {
        let call = async {
            let result = match self.config.remote_timeout() {
                Some(limit) => {
                    match tokio::time::timeout(limit, self.backend.update_lead_stage(update)).await
                    {
                        Ok(result) => result,
                        Err(_) => {
                            return Persisted::TimedOut(PipelineError::remote(
                                &update.lead_id,
                                format!("no response within {}ms", limit.as_millis()),
                            ))
                        }
                    }
                }
                None => self.backend.update_lead_stage(update).await,
            };
            match result {
                Ok(()) => Persisted::Accepted,
                Err(error) => Persisted::Refused(error),
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            persisted = call => {
                if self.cancel.is_cancelled() {
                    None
                } else {
                    Some(persisted)
                }
            }
        }
    }

    fn roll_back(&self, move_id: MoveId, error: &PipelineError) {
        let current = self.phase.borrow().clone();
        match current.roll_back(error.to_string()) {
            Ok((phase, snapshot)) => {
                self.store.replace(snapshot);
                self.phase.send_replace(phase);
            }
            Err(transition) => {
                error!(move_id, %transition, "rollback without an applied move");
            }
        }
    }

    async fn reject(
        &self,
        request: ResolvedMove,
        move_id: MoveId,
        error: PipelineError,
    ) -> MoveOutcome {
        warn!(move_id, lead = %request.lead_id, %error, "rejecting move");
        let resync = error.requires_resync() && self.config.resync_on_inconsistency;
        let error = Arc::new(error);
        let _ = self.notices.send(SyncNotice::MoveRejected {
            move_id,
            lead_id: request.lead_id,
            error: error.clone(),
        });

        if resync {
            // Outcome of the resync is published as its own notice.
            let _ = self.reload().await;
        }
        MoveOutcome::Rejected { move_id, error }
    }

    async fn reload(&self) -> std::result::Result<usize, SharedError> {
        let fetched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(Arc::new(PipelineError::Shutdown)),
            fetched = self.backend.fetch_board() => fetched,
        };

        match fetched.and_then(|board| board.check_invariants().map(|()| board)) {
            Ok(board) => {
                let leads = board.len();
                self.store.replace(Arc::new(board));
                self.phase.send_replace(MovePhase::Idle);
                info!(leads, "board reloaded from backend");
                let _ = self.notices.send(SyncNotice::Resynced { leads });
                Ok(leads)
            }
            Err(error) => {
                warn!(%error, "board reload failed");
                let error = Arc::new(error);
                let _ = self.notices.send(SyncNotice::ResyncFailed {
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    fn apply_local(&self, change: LocalChange) -> std::result::Result<(), SharedError> {
        let current = self.store.current();
        let next = match &change {
            LocalChange::Created(lead) => current.with_appended(lead.clone()),
            LocalChange::Edited(lead) => current.with_upserted(lead.clone()),
            LocalChange::Deleted(id) => current.without_lead(id),
        }
        .map_err(|error| {
            warn!(%error, ?change, "local change not applied");
            Arc::new(error)
        })?;

        self.store.replace(Arc::new(next));
        debug!(?change, "local change applied");
        Ok(())
    }

    /// Apply a phase transition; false if it was illegal (already logged)
    fn transition(&self, step: impl FnOnce(MovePhase) -> Result<MovePhase>) -> bool {
        let current = self.phase.borrow().clone();
        match step(current) {
            Ok(next) => {
                self.phase.send_replace(next);
                true
            }
            Err(error) => {
                error!(%error, "illegal move phase transition");
                false
            }
        }
    }
}
