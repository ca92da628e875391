//! In-process backend for tests and offline use.

use super::LeadBackend;
use crate::aggregate::{PipelineStatistics, PipelineTotals, StageStatistics};
use crate::error::{PipelineError, Result};
use crate::reorder::{compute_move, StageUpdate};
use crate::store::PipelineBoard;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug)]
struct State {
    board: Arc<PipelineBoard>,
    updates: Vec<StageUpdate>,
    fail_updates: usize,
    fail_fetches: usize,
    failure_message: String,
}

/// Authoritative board held in memory.
///
/// Successful updates are applied with the same reorder engine the client
/// uses. Failures and slow responses can be scripted. Clones share state.
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    state: Arc<Mutex<State>>,
    paused: Arc<watch::Sender<bool>>,
    calls: Arc<watch::Sender<usize>>,
}

impl InMemoryBackend {
    /// Create a backend holding the given board
    pub fn new(board: PipelineBoard) -> Self {
        let (paused, _) = watch::channel(false);
        let (calls, _) = watch::channel(0);
        Self {
            state: Arc::new(Mutex::new(State {
                board: Arc::new(board),
                updates: Vec::new(),
                fail_updates: 0,
                fail_fetches: 0,
                failure_message: "backend unavailable".to_string(),
            })),
            paused: Arc::new(paused),
            calls: Arc::new(calls),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The authoritative board
    pub fn board(&self) -> Arc<PipelineBoard> {
        self.lock().board.clone()
    }

    /// Overwrite the authoritative board, as another client would
    pub fn set_board(&self, board: PipelineBoard) {
        self.lock().board = Arc::new(board);
    }

    /// Every update received so far, in arrival order, including failed ones
    pub fn updates(&self) -> Vec<StageUpdate> {
        self.lock().updates.clone()
    }

    /// Make the next `count` updates fail
    pub fn fail_next_updates(&self, count: usize) {
        self.lock().fail_updates = count;
    }

    /// Make the next `count` fetches fail
    pub fn fail_next_fetches(&self, count: usize) {
        self.lock().fail_fetches = count;
    }

    /// Message carried by scripted failures
    pub fn set_failure_message(&self, message: impl Into<String>) {
        self.lock().failure_message = message.into();
    }

    /// Hold every update call until [`Self::release_updates`]
    pub fn hold_updates(&self) {
        self.paused.send_replace(true);
    }

    /// Let held and future update calls proceed
    pub fn release_updates(&self) {
        self.paused.send_replace(false);
    }

    /// Wait until at least `count` update calls have arrived
    pub async fn wait_for_calls(&self, count: usize) {
        let mut rx = self.calls.subscribe();
        // The sender lives in self, so the channel cannot close while we wait.
        let _ = rx.wait_for(|calls| *calls >= count).await;
    }

    fn take_failure(counter: &mut usize, message: &str) -> Option<String> {
        if *counter == 0 {
            return None;
        }
        *counter -= 1;
        Some(message.to_string())
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new(PipelineBoard::new())
    }
}

#[async_trait]
impl LeadBackend for InMemoryBackend {
    async fn fetch_board(&self) -> Result<PipelineBoard> {
        let mut state = self.lock();
        let message = state.failure_message.clone();
        if let Some(message) = Self::take_failure(&mut state.fail_fetches, &message) {
            return Err(PipelineError::Backend {
                status: 503,
                message,
            });
        }
        Ok(PipelineBoard::clone(&state.board))
    }

    async fn fetch_statistics(&self) -> Result<PipelineStatistics> {
        let totals = PipelineTotals::compute(&self.board());
        let won = totals.stage(crate::stage::StageId::Won).map_or(0, |s| s.count);
        let lost = totals.stage(crate::stage::StageId::Lost).map_or(0, |s| s.count);
        let closed = won + lost;

        Ok(PipelineStatistics {
            total_leads: totals.lead_count as u64,
            total_value: totals.stages.iter().map(|s| s.total_value).sum(),
            conversion_rate: if closed == 0 {
                0.0
            } else {
                won as f64 / closed as f64
            },
            by_stage: totals
                .stages
                .iter()
                .map(|s| {
                    (
                        s.stage,
                        StageStatistics {
                            count: s.count as u64,
                            value: s.total_value,
                        },
                    )
                })
                .collect(),
        })
    }

    async fn update_lead_stage(&self, update: &StageUpdate) -> Result<()> {
        self.lock().updates.push(update.clone());
        self.calls.send_modify(|calls| *calls += 1);

        let mut paused = self.paused.subscribe();
        let _ = paused.wait_for(|held| !*held).await;

        let mut state = self.lock();
        let message = state.failure_message.clone();
        if let Some(message) = Self::take_failure(&mut state.fail_updates, &message) {
            debug!(lead = %update.lead_id, "scripted update failure");
            return Err(PipelineError::remote(&update.lead_id, message));
        }

        let (stage, _) = state
            .board
            .locate(&update.lead_id)
            .ok_or_else(|| PipelineError::remote(&update.lead_id, "no such lead"))?;
        state.board = compute_move(
            &state.board,
            &update.lead_id,
            stage,
            update.new_stage,
            update.new_position as usize,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageId;
    use crate::types::{Lead, LeadId};

    fn backend() -> InMemoryBackend {
        InMemoryBackend::new(
            PipelineBoard::from_leads(vec![
                Lead::with_id("a", "A").with_value(10.0),
                Lead::with_id("b", "B"),
                Lead::with_id("w", "W").with_stage(StageId::Won).with_value(90.0),
            ])
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_update_applies_move() {
        let backend = backend();
        let update = StageUpdate {
            lead_id: LeadId::from("a"),
            new_stage: StageId::Contacted,
            new_position: 0,
        };

        backend.update_lead_stage(&update).await.unwrap();

        let board = backend.board();
        assert_eq!(board.locate(&LeadId::from("a")), Some((StageId::Contacted, 0)));
        assert_eq!(backend.updates(), vec![update]);
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let backend = backend();
        backend.fail_next_updates(1);
        let update = StageUpdate {
            lead_id: LeadId::from("b"),
            new_stage: StageId::New,
            new_position: 0,
        };

        let err = backend.update_lead_stage(&update).await.unwrap_err();
        assert!(matches!(err, PipelineError::RemotePersistence { .. }));
        assert_eq!(backend.board().locate(&LeadId::from("b")), Some((StageId::New, 1)));

        backend.update_lead_stage(&update).await.unwrap();
        assert_eq!(backend.board().locate(&LeadId::from("b")), Some((StageId::New, 0)));

        backend.fail_next_fetches(1);
        assert!(backend.fetch_board().await.is_err());
        assert!(backend.fetch_board().await.is_ok());
    }

    #[tokio::test]
    async fn test_statistics() {
        let stats = backend().fetch_statistics().await.unwrap();
        assert_eq!(stats.total_leads, 3);
        assert_eq!(stats.total_value, 100.0);
        assert_eq!(stats.conversion_rate, 1.0);
        assert_eq!(stats.by_stage[&StageId::New].count, 2);
    }
}
