use serde::{Deserialize, Serialize};

/// Workflow state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    /// Not started.
    Open,
    /// Someone is actively working on it.
    InProgress,
    /// Waiting on something outside the task.
    Blocked,
    /// Finished.
    Done,
}

impl TaskStatus {
    /// Returns `true` if the task still needs work.
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Open | TaskStatus::InProgress | TaskStatus::Blocked)
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}
