//! Core types for the pipeline engine

mod ids;
mod lead;

// Re-export all types
pub use ids::{LeadId, UserId};
pub use lead::{Lead, LeadQuality};
