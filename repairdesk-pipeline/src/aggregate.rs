//! Derived views over a board.
//!
//! Totals are always recomputed from a [`PipelineBoard`]; nothing here keeps a
//! running counter that could drift from the store.

use crate::stage::StageId;
use crate::store::PipelineBoard;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Count and value of one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    pub stage: StageId,
    pub count: usize,
    pub total_value: f64,
}

/// Board-wide totals, rebuilt from the board on every call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineTotals {
    /// One summary per stage, in rank order
    pub stages: Vec<StageSummary>,
    pub lead_count: usize,
    /// Value of leads not yet won or lost
    pub open_value: f64,
    pub won_value: f64,
}

impl PipelineTotals {
    /// Summarize a board
    pub fn compute(board: &PipelineBoard) -> Self {
        let stages: Vec<StageSummary> = board
            .stages()
            .map(|(stage, leads)| StageSummary {
                stage,
                count: leads.len(),
                total_value: leads.iter().map(|lead| lead.potential_value).sum(),
            })
            .collect();

        let open_value = stages
            .iter()
            .filter(|s| !s.stage.is_closed())
            .map(|s| s.total_value)
            .sum();
        let won_value = stages
            .iter()
            .filter(|s| s.stage == StageId::Won)
            .map(|s| s.total_value)
            .sum();

        Self {
            lead_count: stages.iter().map(|s| s.count).sum(),
            stages,
            open_value,
            won_value,
        }
    }

    /// Summary for a single stage
    pub fn stage(&self, stage: StageId) -> Option<&StageSummary> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

/// Server-side pipeline statistics.
///
/// Fetched from the backend as-is; the engine neither computes nor mutates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStatistics {
    #[serde(default)]
    pub total_leads: u64,
    #[serde(default)]
    pub total_value: f64,
    #[serde(default)]
    pub conversion_rate: f64,
    #[serde(default)]
    pub by_stage: BTreeMap<StageId, StageStatistics>,
}

/// Per-stage entry of [`PipelineStatistics`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageStatistics {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub value: f64,
}
