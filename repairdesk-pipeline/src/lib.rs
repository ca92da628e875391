//! Sales pipeline board engine
//!
//! This crate keeps the lead kanban board of the repair-shop application
//! consistent while cards are dragged between and within stages. The board is
//! updated optimistically, the change is persisted to the REST backend, and the
//! board is restored exactly if the backend refuses.
//!
//! ## Overview
//!
//! - **Stage registry** - the fixed, ordered list of sales stages ([`stage`])
//! - **Pipeline store** - leads grouped by stage, swapped atomically ([`store`])
//! - **Reorder engine** - pure move computation ([`reorder`])
//! - **Sync coordinator** - optimistic apply, commit or rollback ([`sync`])
//! - **Aggregates** - totals recomputed from the board, never stored ([`aggregate`])
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use repairdesk_pipeline::{
//!     HttpLeadBackend, MoveOutcome, PipelineConfig, StageId, SyncCoordinator,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::load()?;
//! let backend = Arc::new(HttpLeadBackend::new(&config.backend)?);
//! let coordinator = SyncCoordinator::connect(backend, &config.sync).await?;
//!
//! // A card was dragged from the top of "new" to the bottom of "contacted"
//! let handle = coordinator.on_move_requested("42", "new", 0, "contacted", usize::MAX);
//! match handle.outcome().await {
//!     MoveOutcome::Committed { .. } => println!("saved"),
//!     other => println!("not saved: {:?}", other),
//! }
//!
//! for lead in coordinator.board().get_stage(StageId::Contacted) {
//!     println!("{} {}", lead.pipeline_position, lead.customer_name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod backend;
pub mod config;
mod error;
pub mod reorder;
pub mod stage;
pub mod store;
pub mod sync;
pub mod types;

pub use aggregate::{PipelineStatistics, PipelineTotals, StageStatistics, StageSummary};
pub use backend::{HttpLeadBackend, InMemoryBackend, LeadBackend};
pub use config::{BackendConfig, PipelineConfig, SyncConfig};
pub use error::{PipelineError, Result};
pub use reorder::{compute_move, MoveRequest, ResolvedMove, StageUpdate};
pub use stage::{StageDescriptor, StageId, StageRegistry};
pub use store::{PipelineBoard, PipelineStore};
pub use sync::{
    LocalChange, MoveHandle, MoveId, MoveOutcome, MovePhase, SharedError, SyncCoordinator,
    SyncNotice,
};
pub use types::{Lead, LeadId, LeadQuality, UserId};
