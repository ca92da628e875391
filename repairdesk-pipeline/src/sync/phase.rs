//! Per-move lifecycle as a tagged variant.

use crate::error::{PipelineError, Result};
use crate::store::PipelineBoard;
use std::sync::Arc;

/// Sequence number assigned to each move request
pub type MoveId = u64;

/// Where the current move stands.
///
/// `Idle -> OptimisticallyApplied -> Committed | RolledBack`, after which the
/// next move may start. Only `OptimisticallyApplied` carries a snapshot, so a
/// rollback can only ever restore the board captured for that very move.
#[derive(Debug, Clone, Default)]
pub enum MovePhase {
    #[default]
    Idle,
    OptimisticallyApplied {
        move_id: MoveId,
        snapshot: Arc<PipelineBoard>,
    },
    Committed {
        move_id: MoveId,
    },
    RolledBack {
        move_id: MoveId,
        reason: String,
    },
}

impl MovePhase {
    /// Short name for logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::OptimisticallyApplied { .. } => "optimistically_applied",
            Self::Committed { .. } => "committed",
            Self::RolledBack { .. } => "rolled_back",
        }
    }

    /// The move this phase belongs to, if any
    pub fn move_id(&self) -> Option<MoveId> {
        match self {
            Self::Idle => None,
            Self::OptimisticallyApplied { move_id, .. }
            | Self::Committed { move_id }
            | Self::RolledBack { move_id, .. } => Some(*move_id),
        }
    }

    /// Whether a remote call is outstanding
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::OptimisticallyApplied { .. })
    }

    /// Start a move, remembering the board to restore on failure
    pub fn apply(self, move_id: MoveId, snapshot: Arc<PipelineBoard>) -> Result<Self> {
        match self {
            Self::OptimisticallyApplied { .. } => Err(self.invalid("apply")),
            _ => Ok(Self::OptimisticallyApplied { move_id, snapshot }),
        }
    }

    /// The remote store accepted the move; the snapshot is dropped
    pub fn commit(self) -> Result<Self> {
        match self {
            Self::OptimisticallyApplied { move_id, .. } => Ok(Self::Committed { move_id }),
            _ => Err(self.invalid("commit")),
        }
    }

    /// The remote store refused the move; hands back the board to restore
    pub fn roll_back(self, reason: impl Into<String>) -> Result<(Self, Arc<PipelineBoard>)> {
        match self {
            Self::OptimisticallyApplied { move_id, snapshot } => Ok((
                Self::RolledBack {
                    move_id,
                    reason: reason.into(),
                },
                snapshot,
            )),
            _ => Err(self.invalid("roll_back")),
        }
    }

    fn invalid(&self, event: &str) -> PipelineError {
        PipelineError::InvalidTransition {
            from: self.name().to_string(),
            event: event.to_string(),
        }
    }
}
