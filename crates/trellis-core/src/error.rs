use thiserror::Error;

use trellis_model::{SectionId, TaskId};

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("section not found: {0}")]
    SectionNotFound(SectionId),

    #[error(transparent)]
    Api(#[from] ApiError),
}
