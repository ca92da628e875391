//! Stage registry: the fixed, ordered set of sales stages.
//!
//! Stages are never created or deleted at runtime. The registry only answers
//! "which columns exist, in what order, with what color" and validates stage ids
//! arriving from the presentation layer.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// One phase of the sales funnel
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    #[default]
    New,
    Contacted,
    Qualified,
    Proposal,
    Negotiation,
    Won,
    Lost,
}

impl StageId {
    /// Every stage in rank order
    pub const ALL: [StageId; 7] = [
        StageId::New,
        StageId::Contacted,
        StageId::Qualified,
        StageId::Proposal,
        StageId::Negotiation,
        StageId::Won,
        StageId::Lost,
    ];

    /// Wire/string form of the stage id
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Qualified => "qualified",
            Self::Proposal => "proposal",
            Self::Negotiation => "negotiation",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }

    /// Display rank, 0 for the leftmost column
    pub fn rank(&self) -> usize {
        *self as usize
    }

    /// Won and lost leads no longer count toward the open pipeline
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageId {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        StageId::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| PipelineError::invalid_stage(s))
    }
}

/// Static description of a pipeline column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageDescriptor {
    pub id: StageId,
    pub rank: usize,
    pub label: &'static str,
    /// 6-character hex color code without #
    pub display_color: &'static str,
}

/// The fixed ordered list of stages
#[derive(Debug, Clone)]
pub struct StageRegistry {
    stages: Vec<StageDescriptor>,
}

impl StageRegistry {
    /// Build the registry with the standard sales stages
    pub fn new() -> Self {
        let stages = StageId::ALL
            .into_iter()
            .map(|id| StageDescriptor {
                id,
                rank: id.rank(),
                label: label_for(id),
                display_color: color_for(id),
            })
            .collect();
        Self { stages }
    }

    /// Shared default registry
    pub fn global() -> &'static StageRegistry {
        static REGISTRY: OnceLock<StageRegistry> = OnceLock::new();
        REGISTRY.get_or_init(StageRegistry::new)
    }

    /// Stage descriptors in column order
    pub fn stages(&self) -> &[StageDescriptor] {
        &self.stages
    }

    /// Look up the descriptor for a stage
    pub fn get(&self, id: StageId) -> &StageDescriptor {
        // Built from StageId::ALL, so the rank always indexes a descriptor.
        &self.stages[id.rank()]
    }

    /// Validate a stage id coming from outside the engine
    pub fn resolve(&self, id: &str) -> Result<StageId> {
        id.trim().parse()
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn label_for(id: StageId) -> &'static str {
    match id {
        StageId::New => "New",
        StageId::Contacted => "Contacted",
        StageId::Qualified => "Qualified",
        StageId::Proposal => "Proposal",
        StageId::Negotiation => "Negotiation",
        StageId::Won => "Won",
        StageId::Lost => "Lost",
    }
}

fn color_for(id: StageId) -> &'static str {
    match id {
        StageId::New => "6b7280",
        StageId::Contacted => "3b82f6",
        StageId::Qualified => "8b5cf6",
        StageId::Proposal => "f59e0b",
        StageId::Negotiation => "f97316",
        StageId::Won => "22c55e",
        StageId::Lost => "ef4444",
    }
}
