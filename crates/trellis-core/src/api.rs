use async_trait::async_trait;
use thiserror::Error;

use trellis_model::{
    Board, ProjectId, Section, SectionId, SectionPatch, Task, TaskId, TaskMove, TaskPatch,
};

/// Uniform error shape every server call resolves to.
///
/// Expired-credential failures never reach the engine as `Status { 401 }`;
/// the transport's refresh layer either retries them transparently or
/// collapses them into `Unauthorized`.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The server rejected the request (validation, missing entity, conflict).
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The request never produced a server answer.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Credential renewal failed; the session is gone.
    #[error("session expired")]
    Unauthorized,
}

/// Server collaborator for board mutations.
///
/// This trait abstracts the backend implementation, allowing users to:
/// - Use the provided HTTP transport
/// - Implement custom backends for tests or offline replay
#[async_trait]
pub trait BoardApi: Send + Sync + 'static {
    /// Fetch all sections and tasks of a project.
    async fn fetch_board(&self, project: &ProjectId) -> Result<Board, ApiError>;

    /// Persist a locally created task; the response carries the
    /// server-assigned identifier.
    async fn create_task(&self, task: &Task) -> Result<Task, ApiError>;

    /// Persist a partial update; the response is the authoritative record.
    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, ApiError>;

    async fn delete_task(&self, id: &TaskId) -> Result<(), ApiError>;

    async fn move_task(&self, id: &TaskId, dest: &TaskMove) -> Result<Task, ApiError>;

    /// Server-side duplication; the copy's identifier and content are
    /// unknown until the response arrives.
    async fn duplicate_task(&self, id: &TaskId) -> Result<Task, ApiError>;

    async fn create_section(&self, section: &Section) -> Result<Section, ApiError>;

    async fn update_section(
        &self,
        id: &SectionId,
        patch: &SectionPatch,
    ) -> Result<Section, ApiError>;

    async fn delete_section(&self, id: &SectionId) -> Result<(), ApiError>;
}
