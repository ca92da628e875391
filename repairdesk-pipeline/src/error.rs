//! Error types for the pipeline engine

use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that can occur in pipeline operations
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A move or lookup referenced a stage id outside the registry
    #[error("invalid stage: {id}")]
    InvalidStage { id: String },

    /// The lead is not where the board says it should be
    #[error("lead not found: {id} (stage {stage})")]
    LeadNotFound { id: String, stage: String },

    /// The backend rejected or failed to process a stage/position update
    #[error("remote update failed for lead {lead_id}: {message}")]
    RemotePersistence { lead_id: String, message: String },

    /// A fetch against the backend failed
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// A lead or board failed validation
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// The board violates one of its structural invariants
    #[error("inconsistent board: {message}")]
    Inconsistent { message: String },

    /// A move phase was asked to make a transition it does not allow
    #[error("invalid transition from {from} via {event}")]
    InvalidTransition { from: String, event: String },

    /// The coordinator has shut down
    #[error("sync coordinator is shut down")]
    Shutdown,

    /// Too many requests are already waiting
    #[error("move queue is full")]
    QueueFull,

    /// Configuration failed to load or validate
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Configuration could not be extracted
    #[error("configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Base URL could not be joined with an endpoint path
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// Create an invalid stage error
    pub fn invalid_stage(id: impl Into<String>) -> Self {
        Self::InvalidStage { id: id.into() }
    }

    /// Create a lead-not-found error
    pub fn lead_not_found(id: impl ToString, stage: impl ToString) -> Self {
        Self::LeadNotFound {
            id: id.to_string(),
            stage: stage.to_string(),
        }
    }

    /// Create a remote persistence error
    pub fn remote(lead_id: impl ToString, message: impl Into<String>) -> Self {
        Self::RemotePersistence {
            lead_id: lead_id.to_string(),
            message: message.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the local board can no longer be trusted and must be re-fetched
    pub fn requires_resync(&self) -> bool {
        matches!(
            self,
            Self::LeadNotFound { .. } | Self::InvalidStage { .. } | Self::Inconsistent { .. }
        )
    }

    /// Whether the failure is an expected condition with a defined recovery path
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::RemotePersistence { .. } | Self::Backend { .. } | Self::Http(_)
        )
    }
}

impl From<figment::Error> for PipelineError {
    fn from(error: figment::Error) -> Self {
        Self::Figment(Box::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::lead_not_found("lead-1", "new");
        assert_eq!(err.to_string(), "lead not found: lead-1 (stage new)");

        let err = PipelineError::invalid_stage("archived");
        assert_eq!(err.to_string(), "invalid stage: archived");
    }

    #[test]
    fn test_remote_error() {
        let err = PipelineError::remote("lead-9", "503 Service Unavailable");
        assert!(err.to_string().contains("lead-9"));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_classification() {
        assert!(PipelineError::lead_not_found("x", "new").requires_resync());
        assert!(PipelineError::invalid_stage("x").requires_resync());
        assert!(!PipelineError::remote("x", "boom").requires_resync());
        assert!(PipelineError::remote("x", "boom").is_recoverable());
        assert!(!PipelineError::invalid_stage("x").is_recoverable());
        assert!(!PipelineError::Shutdown.is_recoverable());
    }
}
