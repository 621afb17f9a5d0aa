use serde::{Deserialize, Serialize};

use crate::{Position, ProjectId, SectionId};

/// A column on the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: SectionId,
    pub name: String,
    pub project_id: ProjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub position: Position,
    #[serde(default)]
    pub collapsed: bool,
    /// Work-in-progress limit; `None` means unlimited.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wip_limit: Option<u32>,
    /// Cached number of top-level tasks, maintained locally.
    #[serde(default)]
    pub task_count: u32,
}
