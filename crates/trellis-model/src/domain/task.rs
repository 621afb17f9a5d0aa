use std::collections::HashMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::time_serde;
use crate::{Position, Priority, ProjectId, SectionId, TaskId, TaskStatus, UserId};

/// A card on the board, possibly nested under a parent task.
///
/// Nesting invariants maintained by the sync engine:
/// - a task with `parent_id` set references a task of the same project,
///   and its `level` is the parent's level plus one;
/// - a task without a parent has `level == 0` and is ordered through its
///   section's top-level list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    pub section_id: SectionId,
    pub project_id: ProjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<UserId>,
    #[serde(default, with = "time_serde::opt", skip_serializing_if = "Option::is_none")]
    pub start_at: Option<SystemTime>,
    #[serde(default, with = "time_serde::opt", skip_serializing_if = "Option::is_none")]
    pub due_at: Option<SystemTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom_fields: HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<TaskId>,
    #[serde(default)]
    pub level: u32,
    pub position: Position,
    #[serde(with = "time_serde")]
    pub created_at: SystemTime,
    #[serde(with = "time_serde")]
    pub updated_at: SystemTime,
    #[serde(default, with = "time_serde::opt", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<SystemTime>,
    #[serde(default)]
    pub subtask_count: u32,
    /// Whether the subtask list is unfolded in the UI. Never sent to the server.
    #[serde(skip)]
    pub expanded: bool,
}

impl Task {
    pub fn is_subtask(&self) -> bool {
        self.parent_id.is_some()
    }
}
