//! Remote store seam.
//!
//! The engine only consumes three calls from the backend: fetch the board,
//! fetch statistics, and persist one lead's new stage and position.

mod http;
mod memory;

pub use http::HttpLeadBackend;
pub use memory::InMemoryBackend;

use crate::aggregate::PipelineStatistics;
use crate::error::Result;
use crate::reorder::StageUpdate;
use crate::store::PipelineBoard;
use async_trait::async_trait;

/// Backend collaborator holding the authoritative lead data
#[async_trait]
pub trait LeadBackend: Send + Sync {
    /// Leads grouped by stage, in pipeline order
    async fn fetch_board(&self) -> Result<PipelineBoard>;

    /// Aggregate counts and values as computed by the server
    async fn fetch_statistics(&self) -> Result<PipelineStatistics>;

    /// Persist a lead's stage and position.
    ///
    /// Failures are reported as [`crate::PipelineError::RemotePersistence`].
    async fn update_lead_stage(&self, update: &StageUpdate) -> Result<()>;
}
