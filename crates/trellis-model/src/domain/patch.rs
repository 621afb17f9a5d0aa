use std::collections::HashMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use super::time_serde;
use crate::{Position, Priority, Section, SectionId, Task, TaskStatus, UserId};

/// Partial update for a task. Only the fields carried by the patch are
/// changed; everything else keeps its current value. Structural fields
/// (section, parent, ordering) move through the dedicated move operation
/// instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<HashMap<String, serde_json::Value>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.assignee_id.is_none()
            && self.start_at.is_none()
            && self.due_at.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.tags.is_none()
            && self.custom_fields.is_none()
    }

    /// Overwrite the carried fields on `task`, leaving the rest untouched.
    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(assignee) = &self.assignee_id {
            task.assignee_id = Some(assignee.clone());
        }
        if let Some(start_at) = self.start_at {
            task.start_at = Some(start_at);
        }
        if let Some(due_at) = self.due_at {
            task.due_at = Some(due_at);
        }
        if let Some(priority) = self.priority {
            task.priority = Some(priority);
        }
        if let Some(status) = self.status {
            task.status = Some(status);
        }
        if let Some(tags) = &self.tags {
            task.tags = tags.clone();
        }
        if let Some(fields) = &self.custom_fields {
            task.custom_fields = fields.clone();
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

/// Destination of a cross-section move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMove {
    pub section_id: SectionId,
    pub position: Position,
}

/// Partial update for a section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wip_limit: Option<u32>,
}

impl SectionPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.color.is_none()
            && self.position.is_none()
            && self.collapsed.is_none()
            && self.wip_limit.is_none()
    }

    pub fn apply(&self, section: &mut Section) {
        if let Some(name) = &self.name {
            section.name = name.clone();
        }
        if let Some(color) = &self.color {
            section.color = Some(color.clone());
        }
        if let Some(position) = self.position {
            section.position = position;
        }
        if let Some(collapsed) = self.collapsed {
            section.collapsed = collapsed;
        }
        if let Some(limit) = self.wip_limit {
            section.wip_limit = Some(limit);
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}
