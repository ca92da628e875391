//! Optimistic synchronization between the board and the backend

mod coordinator;
mod phase;

pub use coordinator::{
    LocalChange, MoveHandle, MoveOutcome, SharedError, SyncCoordinator, SyncNotice,
};
pub use phase::{MoveId, MovePhase};
