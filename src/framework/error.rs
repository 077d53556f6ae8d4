//! # Scheduler Errors
//!
//! Configuration mistakes surface synchronously as [`SceneError`]. Runtime failures
//! (provider errors, failing callbacks) never reach the caller; actions absorb and log
//! them so one bad scene cannot stall the queue.

use super::operation::OperationId;
use crate::model::SceneId;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum SceneError {
    #[error("Operation {0} has already started; its configuration is locked")]
    OperationLocked(OperationId),
    #[error("Scene {scene} is not permitted here: {reason}")]
    NotPermitted { scene: SceneId, reason: String },
    #[error("Operation {0} cannot be linked as its own child")]
    InvalidParent(OperationId),
}
