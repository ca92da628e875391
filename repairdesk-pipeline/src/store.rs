//! Pipeline store: the per-stage ordered projection the board renders.
//!
//! [`PipelineBoard`] is an immutable-by-convention value: every mutation helper
//! returns a new board. [`PipelineStore`] holds the current board behind an
//! `Arc` and swaps it atomically, so a reader can never observe half of a move.

use crate::error::{PipelineError, Result};
use crate::stage::StageId;
use crate::types::{Lead, LeadId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Leads grouped by stage, each stage ordered by pipeline position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<StageId, Vec<Lead>>", into = "BTreeMap<StageId, Vec<Lead>>")]
pub struct PipelineBoard {
    columns: BTreeMap<StageId, Vec<Lead>>,
}

impl PipelineBoard {
    /// An empty board with every stage present
    pub fn new() -> Self {
        Self {
            columns: StageId::ALL.into_iter().map(|s| (s, Vec::new())).collect(),
        }
    }

    /// Build a board from backend data already grouped by stage.
    ///
    /// Each column is sorted by the stored `pipeline_position` (ties keep the
    /// backend's order) and then renumbered densely. The column a lead arrives
    /// in wins over its own `sales_stage` field.
    pub fn from_grouped(grouped: BTreeMap<StageId, Vec<Lead>>) -> Result<Self> {
        let mut board = Self::new();
        let mut seen = HashSet::new();

        for (stage, mut leads) in grouped {
            leads.sort_by_key(|lead| lead.pipeline_position);
            for lead in &leads {
                lead.validate()?;
                if !seen.insert(lead.id.clone()) {
                    return Err(PipelineError::Inconsistent {
                        message: format!("lead {} appears in more than one column", lead.id),
                    });
                }
                if lead.sales_stage != stage {
                    debug!(
                        lead = %lead.id,
                        claimed = %lead.sales_stage,
                        column = %stage,
                        "lead grouped under a different stage than its own field"
                    );
                }
            }
            board.columns.insert(stage, leads);
            board.renumber(stage);
        }

        Ok(board)
    }

    /// Build a board from a flat list, grouping by each lead's `sales_stage`
    pub fn from_leads(leads: impl IntoIterator<Item = Lead>) -> Result<Self> {
        let mut grouped: BTreeMap<StageId, Vec<Lead>> = BTreeMap::new();
        for lead in leads {
            grouped.entry(lead.sales_stage).or_default().push(lead);
        }
        Self::from_grouped(grouped)
    }

    /// Ordered leads of one stage
    pub fn get_stage(&self, stage: StageId) -> &[Lead] {
        self.columns.get(&stage).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All stages in rank order with their leads
    pub fn stages(&self) -> impl Iterator<Item = (StageId, &[Lead])> {
        self.columns.iter().map(|(s, leads)| (*s, leads.as_slice()))
    }

    /// Find which stage and index a lead currently occupies
    pub fn locate(&self, id: &LeadId) -> Option<(StageId, usize)> {
        self.columns.iter().find_map(|(stage, leads)| {
            leads
                .iter()
                .position(|lead| &lead.id == id)
                .map(|index| (*stage, index))
        })
    }

    /// Look up a lead by id
    pub fn lead(&self, id: &LeadId) -> Option<&Lead> {
        self.columns.values().flatten().find(|lead| &lead.id == id)
    }

    /// Total number of leads on the board
    pub fn len(&self) -> usize {
        self.columns.values().map(Vec::len).sum()
    }

    /// Whether the board has no leads at all
    pub fn is_empty(&self) -> bool {
        self.columns.values().all(Vec::is_empty)
    }

    /// Verify the structural invariants: every stage present, positions dense
    /// 0..n-1 within each stage, each lead in exactly one column, and each
    /// lead's `sales_stage` matching its column.
    pub fn check_invariants(&self) -> Result<()> {
        let mut seen = HashSet::new();

        for stage in StageId::ALL {
            let Some(leads) = self.columns.get(&stage) else {
                return Err(PipelineError::Inconsistent {
                    message: format!("stage {stage} missing from board"),
                });
            };

            for (index, lead) in leads.iter().enumerate() {
                if lead.pipeline_position as usize != index {
                    return Err(PipelineError::Inconsistent {
                        message: format!(
                            "lead {} in {stage} has position {} at index {index}",
                            lead.id, lead.pipeline_position
                        ),
                    });
                }
                if lead.sales_stage != stage {
                    return Err(PipelineError::Inconsistent {
                        message: format!(
                            "lead {} sits in {stage} but claims {}",
                            lead.id, lead.sales_stage
                        ),
                    });
                }
                if !seen.insert(&lead.id) {
                    return Err(PipelineError::Inconsistent {
                        message: format!("lead {} appears more than once", lead.id),
                    });
                }
            }
        }

        Ok(())
    }

    /// A new board with `lead` appended to the end of its stage
    pub fn with_appended(&self, lead: Lead) -> Result<Self> {
        lead.validate()?;
        if self.locate(&lead.id).is_some() {
            return Err(PipelineError::invalid_value(
                "id",
                format!("lead {} is already on the board", lead.id),
            ));
        }

        let mut next = self.clone();
        let stage = lead.sales_stage;
        next.column_mut(stage).push(lead);
        next.renumber(stage);
        Ok(next)
    }

    /// A new board reflecting an edited lead.
    ///
    /// If the lead stays in its stage it keeps its slot; if its stage changed it
    /// goes to the end of the new stage; if it is unknown it is appended.
    pub fn with_upserted(&self, lead: Lead) -> Result<Self> {
        lead.validate()?;
        let Some((current_stage, index)) = self.locate(&lead.id) else {
            return self.with_appended(lead);
        };

        let mut next = self.clone();
        let stage = lead.sales_stage;
        if current_stage == stage {
            next.column_mut(stage)[index] = lead;
        } else {
            next.column_mut(current_stage).remove(index);
            next.renumber(current_stage);
            next.column_mut(stage).push(lead);
        }
        next.renumber(stage);
        Ok(next)
    }

    /// A new board without the given lead
    pub fn without_lead(&self, id: &LeadId) -> Result<Self> {
        let (stage, index) = self
            .locate(id)
            .ok_or_else(|| PipelineError::lead_not_found(id, "any"))?;

        let mut next = self.clone();
        next.column_mut(stage).remove(index);
        next.renumber(stage);
        Ok(next)
    }

    pub(crate) fn column_mut(&mut self, stage: StageId) -> &mut Vec<Lead> {
        self.columns.entry(stage).or_default()
    }

    /// Rewrite stage and position fields of one column to match array order
    pub(crate) fn renumber(&mut self, stage: StageId) {
        for (index, lead) in self.column_mut(stage).iter_mut().enumerate() {
            lead.sales_stage = stage;
            lead.pipeline_position = index as u32;
        }
    }
}

impl Default for PipelineBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<BTreeMap<StageId, Vec<Lead>>> for PipelineBoard {
    type Error = PipelineError;

    fn try_from(grouped: BTreeMap<StageId, Vec<Lead>>) -> Result<Self> {
        Self::from_grouped(grouped)
    }
}

impl From<PipelineBoard> for BTreeMap<StageId, Vec<Lead>> {
    fn from(board: PipelineBoard) -> Self {
        board.columns
    }
}

/// Single-writer holder of the current board.
///
/// Readers get cheap `Arc` handles or a [`watch::Receiver`] that wakes after
/// every replacement. Only the sync coordinator replaces the board.
#[derive(Debug)]
pub struct PipelineStore {
    current: watch::Sender<Arc<PipelineBoard>>,
}

impl PipelineStore {
    /// Create a store holding the given board
    pub fn new(board: PipelineBoard) -> Self {
        let (current, _) = watch::channel(Arc::new(board));
        Self { current }
    }

    /// The board as of now
    pub fn current(&self) -> Arc<PipelineBoard> {
        self.current.borrow().clone()
    }

    /// Ordered leads of one stage
    pub fn get_stage(&self, stage: StageId) -> Vec<Lead> {
        self.current.borrow().get_stage(stage).to_vec()
    }

    /// Capture the current board for a later rollback.
    ///
    /// Boards are never mutated in place, so the captured `Arc` stays a faithful
    /// copy of this moment no matter what replaces it afterwards.
    pub fn snapshot(&self) -> Arc<PipelineBoard> {
        self.current()
    }

    /// Receive a notification after every replacement
    pub fn subscribe(&self) -> watch::Receiver<Arc<PipelineBoard>> {
        self.current.subscribe()
    }

    /// Swap in a whole new board. Returns false (and notifies nobody) when the
    /// replacement is the very board already held.
    pub(crate) fn replace(&self, board: Arc<PipelineBoard>) -> bool {
        self.current.send_if_modified(|current| {
            if Arc::ptr_eq(current, &board) {
                false
            } else {
                *current = board;
                true
            }
        })
    }
}

impl Default for PipelineStore {
    fn default() -> Self {
        Self::new(PipelineBoard::new())
    }
}
