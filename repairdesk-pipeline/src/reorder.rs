//! Reorder engine: pure computation of a board after a drag-and-drop move.
//!
//! Nothing here touches the network, the store, or the clock, so every rule
//! can be tested against plain values.

use crate::error::{PipelineError, Result};
use crate::stage::{StageId, StageRegistry};
use crate::store::PipelineBoard;
use crate::types::LeadId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

/// Compute the board after moving `lead_id` from `source` to `dest` at `dest_index`.
///
/// `dest_index` is interpreted against the destination column *after* the lead
/// has been removed from its source, which is what a drop target shows the user
/// when dragging within one column. Indices past the end clamp to the end.
///
/// A move that would leave the lead where it is returns the input `Arc` itself,
/// so callers can detect it with [`Arc::ptr_eq`] and skip a re-render.
pub fn compute_move(
    board: &Arc<PipelineBoard>,
    lead_id: &LeadId,
    source: StageId,
    dest: StageId,
    dest_index: usize,
) -> Result<Arc<PipelineBoard>> {
    let source_index = board
        .get_stage(source)
        .iter()
        .position(|lead| &lead.id == lead_id)
        .ok_or_else(|| PipelineError::lead_not_found(lead_id, source))?;

    if source == dest {
        let last = board.get_stage(source).len() - 1;
        if dest_index.min(last) == source_index {
            trace!(lead = %lead_id, stage = %source, index = source_index, "move is a no-op");
            return Ok(Arc::clone(board));
        }
    }

    let mut next = PipelineBoard::clone(board);
    let lead = next.column_mut(source).remove(source_index);
    let column = next.column_mut(dest);
    let landing = dest_index.min(column.len());
    column.insert(landing, lead);

    next.renumber(source);
    if dest != source {
        next.renumber(dest);
    }

    trace!(
        lead = %lead_id,
        from = %source,
        from_index = source_index,
        to = %dest,
        to_index = landing,
        "computed move"
    );
    Ok(Arc::new(next))
}

/// A drag gesture as reported by the presentation layer.
///
/// Stage ids are raw strings because they come from outside the engine and
/// must be validated before anything is mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub lead_id: LeadId,
    pub source_stage: String,
    pub source_index: usize,
    pub dest_stage: String,
    pub dest_index: usize,
}

impl MoveRequest {
    /// Create a move request
    pub fn new(
        lead_id: impl Into<LeadId>,
        source_stage: impl Into<String>,
        source_index: usize,
        dest_stage: impl Into<String>,
        dest_index: usize,
    ) -> Self {
        Self {
            lead_id: lead_id.into(),
            source_stage: source_stage.into(),
            source_index,
            dest_stage: dest_stage.into(),
            dest_index,
        }
    }

    /// Validate both stage ids against the registry
    pub fn resolve(&self, registry: &StageRegistry) -> Result<ResolvedMove> {
        Ok(ResolvedMove {
            lead_id: self.lead_id.clone(),
            source: registry.resolve(&self.source_stage)?,
            source_index: self.source_index,
            dest: registry.resolve(&self.dest_stage)?,
            dest_index: self.dest_index,
        })
    }
}

/// A move whose stages are known to exist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMove {
    pub lead_id: LeadId,
    pub source: StageId,
    /// Index the presentation layer believed the lead was at; the engine
    /// locates the lead by id and treats this as a hint.
    pub source_index: usize,
    pub dest: StageId,
    pub dest_index: usize,
}

impl ResolvedMove {
    /// Apply this move to a board
    pub fn apply(&self, board: &Arc<PipelineBoard>) -> Result<Arc<PipelineBoard>> {
        compute_move(board, &self.lead_id, self.source, self.dest, self.dest_index)
    }

    /// The move that puts the lead back where it was on `before`
    pub fn inverse(&self, before: &PipelineBoard) -> Result<ResolvedMove> {
        let (stage, index) = before
            .locate(&self.lead_id)
            .filter(|(stage, _)| *stage == self.source)
            .ok_or_else(|| PipelineError::lead_not_found(&self.lead_id, self.source))?;

        let dest_len = before.get_stage(self.dest).len();
        let dest_len_after_removal = if self.dest == stage {
            dest_len - 1
        } else {
            dest_len
        };
        let landing = self.dest_index.min(dest_len_after_removal);

        Ok(ResolvedMove {
            lead_id: self.lead_id.clone(),
            source: self.dest,
            source_index: landing,
            dest: stage,
            dest_index: index,
        })
    }
}

/// Remote update describing where a lead ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageUpdate {
    pub lead_id: LeadId,
    pub new_stage: StageId,
    pub new_position: u32,
}

impl StageUpdate {
    /// Read a lead's stage and position from a board
    pub fn from_board(board: &PipelineBoard, lead_id: &LeadId) -> Result<Self> {
        let lead = board
            .lead(lead_id)
            .ok_or_else(|| PipelineError::lead_not_found(lead_id, "any"))?;
        Ok(Self {
            lead_id: lead.id.clone(),
            new_stage: lead.sales_stage,
            new_position: lead.pipeline_position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Lead;

    fn board(columns: &[(StageId, &[&str])]) -> Arc<PipelineBoard> {
        let leads = columns.iter().flat_map(|(stage, ids)| {
            ids.iter()
                .map(move |id| Lead::with_id(*id, id.to_uppercase()).with_stage(*stage))
        });
        Arc::new(PipelineBoard::from_leads(leads).unwrap())
    }

    fn ids(board: &PipelineBoard, stage: StageId) -> Vec<&str> {
        board.get_stage(stage).iter().map(|l| l.id.as_str()).collect()
    }

    #[test]
    fn test_move_across_stages() {
        let before = board(&[(StageId::New, &["a", "b", "c"]), (StageId::Contacted, &["d"])]);

        let after =
            compute_move(&before, &LeadId::from("a"), StageId::New, StageId::Contacted, 1).unwrap();

        assert_eq!(ids(&after, StageId::New), vec!["b", "c"]);
        assert_eq!(ids(&after, StageId::Contacted), vec!["d", "a"]);
        let moved = after.lead(&LeadId::from("a")).unwrap();
        assert_eq!(moved.sales_stage, StageId::Contacted);
        assert_eq!(moved.pipeline_position, 1);
        after.check_invariants().unwrap();
    }

    #[test]
    fn test_reorder_within_stage() {
        let before = board(&[(StageId::New, &["a", "b", "c"])]);

        let after =
            compute_move(&before, &LeadId::from("b"), StageId::New, StageId::New, 0).unwrap();

        assert_eq!(ids(&after, StageId::New), vec!["b", "a", "c"]);
        after.check_invariants().unwrap();
    }

    #[test]
    fn test_same_stage_index_is_post_removal() {
        let before = board(&[(StageId::New, &["a", "b", "c", "d"])]);

        // Dropping "a" at index 2 of the list without "a" ([b, c, d]) lands it after "c".
        let after =
            compute_move(&before, &LeadId::from("a"), StageId::New, StageId::New, 2).unwrap();
        assert_eq!(ids(&after, StageId::New), vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn test_out_of_range_index_clamps() {
        let before = board(&[(StageId::New, &["a"]), (StageId::Won, &["x", "y"])]);

        let after =
            compute_move(&before, &LeadId::from("a"), StageId::New, StageId::Won, 99).unwrap();
        assert_eq!(ids(&after, StageId::Won), vec!["x", "y", "a"]);
        assert!(after.get_stage(StageId::New).is_empty());
    }

    #[test]
    fn test_noop_returns_same_arc() {
        let before = board(&[(StageId::New, &["a", "b", "c"])]);

        let after =
            compute_move(&before, &LeadId::from("b"), StageId::New, StageId::New, 1).unwrap();
        assert!(Arc::ptr_eq(&before, &after));

        // Past-the-end drop of the last card in its own column is also a no-op.
        let after =
            compute_move(&before, &LeadId::from("c"), StageId::New, StageId::New, 99).unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn test_missing_lead_fails() {
        let before = board(&[(StageId::New, &["a"]), (StageId::Contacted, &["b"])]);

        let err = compute_move(&before, &LeadId::from("b"), StageId::New, StageId::Won, 0)
            .unwrap_err();
        assert!(matches!(err, PipelineError::LeadNotFound { .. }));
    }

    #[test]
    fn test_request_resolve_rejects_unknown_stage() {
        let registry = StageRegistry::new();
        let request = MoveRequest::new("a", "new", 0, "archived", 0);

        let err = request.resolve(&registry).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidStage { ref id } if id == "archived"));

        let ok = MoveRequest::new("a", "new", 0, "won", 3).resolve(&registry).unwrap();
        assert_eq!(ok.dest, StageId::Won);
    }

    #[test]
    fn test_inverse_round_trip() {
        let before = board(&[(StageId::New, &["a", "b", "c"]), (StageId::Proposal, &["d", "e"])]);
        let mv = ResolvedMove {
            lead_id: LeadId::from("b"),
            source: StageId::New,
            source_index: 1,
            dest: StageId::Proposal,
            dest_index: 42,
        };

        let after = mv.apply(&before).unwrap();
        let back = mv.inverse(&before).unwrap().apply(&after).unwrap();
        assert_eq!(*back, *before);
    }

    #[test]
    fn test_stage_update_from_board() {
        let before = board(&[(StageId::New, &["a", "b"])]);
        let after =
            compute_move(&before, &LeadId::from("a"), StageId::New, StageId::Qualified, 0).unwrap();

        let update = StageUpdate::from_board(&after, &LeadId::from("a")).unwrap();
        assert_eq!(update.new_stage, StageId::Qualified);
        assert_eq!(update.new_position, 0);
    }
}
