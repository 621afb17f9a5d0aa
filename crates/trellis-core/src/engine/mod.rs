use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, instrument, warn};

use trellis_model::{
    NewSection, NewTask, ProjectId, Section, SectionId, SectionPatch, Task, TaskId, TaskMove,
    TaskPatch,
};

use crate::{api::BoardApi, error::EngineError, state::BoardState};

/// Optimistic mutation engine over a project's board.
///
/// Every operation mutates [`BoardState`] synchronously before the server
/// call suspends, so readers of the state handle always see the intended
/// outcome immediately. When the call settles the engine either reconciles
/// the local record with the server's authoritative response or rolls the
/// mutation back to its pre-flight snapshot; local state is never left
/// partially applied.
#[derive(Clone)]
pub struct SyncEngine {
    state: BoardState,
    api: Arc<dyn BoardApi>,
    project: ProjectId,
}

impl SyncEngine {
    pub fn new(api: Arc<dyn BoardApi>, project: ProjectId) -> Self {
        Self {
            state: BoardState::new(),
            api,
            project,
        }
    }

    /// Shared handle to the board state the UI renders from.
    pub fn state(&self) -> BoardState {
        self.state.clone()
    }

    /// Replace local state with a freshly fetched board.
    pub async fn load(&self) -> Result<(), EngineError> {
        let board = self.api.fetch_board(&self.project).await?;
        self.state.replace_all(board);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// Create a task at the end of a section's top-level list.
    ///
    /// A `temp-*` placeholder is visible for the whole round-trip; the
    /// server response replaces it in the same list slot, and a rejection
    /// removes it without a trace.
    #[instrument(level = "debug", skip(self, draft), fields(section = %section_id))]
    pub async fn create_task(
        &self,
        section_id: &SectionId,
        draft: NewTask,
    ) -> Result<Task, EngineError> {
        let section = self
            .state
            .section(section_id)
            .ok_or_else(|| EngineError::SectionNotFound(section_id.clone()))?;

        let local = self.build_task(draft, &section, None);
        let temp_id = local.id.clone();
        self.state.insert_task(local.clone());
        debug!(task = %temp_id, "task applied locally");

        match self.api.create_task(&local).await {
            Ok(server) => {
                self.state.swap_task_id(&temp_id, server.clone());
                Ok(server)
            }
            Err(err) => {
                warn!(task = %temp_id, error = %err, "create rejected, dropping placeholder");
                self.state.discard_task(&temp_id);
                Err(err.into())
            }
        }
    }

    /// Create a subtask nested under `parent_id`.
    ///
    /// The subtask inherits the parent's section and sits one nesting
    /// level below it; the parent's cached subtask counter is bumped once
    /// the create lands.
    #[instrument(level = "debug", skip(self, draft), fields(parent = %parent_id))]
    pub async fn create_subtask(
        &self,
        parent_id: &TaskId,
        draft: NewTask,
    ) -> Result<Task, EngineError> {
        let parent = self
            .state
            .task(parent_id)
            .ok_or_else(|| EngineError::TaskNotFound(parent_id.clone()))?;
        let section = self
            .state
            .section(&parent.section_id)
            .ok_or_else(|| EngineError::SectionNotFound(parent.section_id.clone()))?;

        let local = self.build_task(draft, &section, Some(&parent));
        let temp_id = local.id.clone();
        self.state.insert_task(local.clone());

        match self.api.create_task(&local).await {
            Ok(server) => {
                self.state.swap_task_id(&temp_id, server.clone());
                self.state.increment_subtask_count(parent_id);
                Ok(server)
            }
            Err(err) => {
                warn!(task = %temp_id, error = %err, "subtask create rejected");
                self.state.discard_task(&temp_id);
                Err(err.into())
            }
        }
    }

    /// Patch a task anywhere in the tree, rolling back on rejection.
    #[instrument(level = "debug", skip(self, patch), fields(task = %id))]
    pub async fn update_task(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, EngineError> {
        let snapshot = self
            .state
            .apply_task_patch(id, &patch)
            .ok_or_else(|| EngineError::TaskNotFound(id.clone()))?;

        match self.api.update_task(id, &patch).await {
            Ok(server) => {
                self.state.replace_task(server.clone());
                Ok(server)
            }
            Err(err) => {
                warn!(task = %id, error = %err, "update rejected, restoring snapshot");
                self.state.restore_task(snapshot);
                Err(err.into())
            }
        }
    }

    /// Delete a task (and its subtasks). A rejected delete re-inserts the
    /// removed records at the end of their collection.
    #[instrument(level = "debug", skip(self), fields(task = %id))]
    pub async fn delete_task(&self, id: &TaskId) -> Result<(), EngineError> {
        let removed = self
            .state
            .remove_task(id)
            .ok_or_else(|| EngineError::TaskNotFound(id.clone()))?;

        match self.api.delete_task(id).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(task = %id, error = %err, "delete rejected, re-inserting");
                self.state.restore_removed(removed);
                Err(err.into())
            }
        }
    }

    /// Move a task to `section_id` at `index`. A rejected move restores
    /// both the previous section and the previous slot.
    #[instrument(level = "debug", skip(self), fields(task = %id, section = %section_id))]
    pub async fn move_task(
        &self,
        id: &TaskId,
        section_id: &SectionId,
        index: usize,
    ) -> Result<Task, EngineError> {
        self.state
            .section(section_id)
            .ok_or_else(|| EngineError::SectionNotFound(section_id.clone()))?;
        let snapshot = self
            .state
            .move_task(id, section_id, index)
            .ok_or_else(|| EngineError::TaskNotFound(id.clone()))?;

        let dest = TaskMove {
            section_id: section_id.clone(),
            position: index as f64,
        };
        match self.api.move_task(id, &dest).await {
            Ok(server) => {
                self.state.replace_task(server.clone());
                Ok(server)
            }
            Err(err) => {
                warn!(task = %id, error = %err, "move rejected, undoing");
                self.state.undo_move(snapshot);
                Err(err.into())
            }
        }
    }

    /// Server-side duplication. There is no optimistic placeholder: the
    /// copy's identifier and content are unknown until the response
    /// arrives, at which point it is appended to local state.
    #[instrument(level = "debug", skip(self), fields(task = %id))]
    pub async fn duplicate_task(&self, id: &TaskId) -> Result<Task, EngineError> {
        self.state
            .task(id)
            .ok_or_else(|| EngineError::TaskNotFound(id.clone()))?;

        let copy = self.api.duplicate_task(id).await?;
        self.state.insert_task(copy.clone());
        Ok(copy)
    }

    // ------------------------------------------------------------------
    // Sections
    // ------------------------------------------------------------------

    /// Create a section at the end of the board.
    #[instrument(level = "debug", skip(self, draft))]
    pub async fn create_section(&self, draft: NewSection) -> Result<Section, EngineError> {
        let local = Section {
            id: SectionId::temp(),
            name: draft.name,
            project_id: self.project.clone(),
            color: draft.color,
            position: self.state.section_count() as f64,
            collapsed: false,
            wip_limit: draft.wip_limit,
            task_count: 0,
        };
        let temp_id = local.id.clone();
        self.state.insert_section(local.clone());

        match self.api.create_section(&local).await {
            Ok(server) => {
                self.state.swap_section_id(&temp_id, server.clone());
                Ok(server)
            }
            Err(err) => {
                warn!(section = %temp_id, error = %err, "section create rejected");
                self.state.discard_section(&temp_id);
                Err(err.into())
            }
        }
    }

    #[instrument(level = "debug", skip(self, patch), fields(section = %id))]
    pub async fn update_section(
        &self,
        id: &SectionId,
        patch: SectionPatch,
    ) -> Result<Section, EngineError> {
        let snapshot = self
            .state
            .apply_section_patch(id, &patch)
            .ok_or_else(|| EngineError::SectionNotFound(id.clone()))?;

        match self.api.update_section(id, &patch).await {
            Ok(server) => {
                self.state.replace_section(server.clone());
                Ok(server)
            }
            Err(err) => {
                warn!(section = %id, error = %err, "section update rejected");
                self.state.restore_section(snapshot);
                Err(err.into())
            }
        }
    }

    /// Delete a section and every task in it. A rejected delete restores
    /// the section (at the end of the board) together with its tasks.
    #[instrument(level = "debug", skip(self), fields(section = %id))]
    pub async fn delete_section(&self, id: &SectionId) -> Result<(), EngineError> {
        let snapshot = self
            .state
            .remove_section(id)
            .ok_or_else(|| EngineError::SectionNotFound(id.clone()))?;

        match self.api.delete_section(id).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(section = %id, error = %err, "section delete rejected, restoring");
                self.state.restore_removed_section(snapshot);
                Err(err.into())
            }
        }
    }

    /// Assemble a full task record from a creation draft. Ordering puts
    /// new tasks at the end of their container; timestamps are "now".
    fn build_task(&self, draft: NewTask, section: &Section, parent: Option<&Task>) -> Task {
        let now = SystemTime::now();
        let position = match parent {
            Some(parent) => self.state.subtask_len(&parent.id) as f64,
            None => self.state.top_level_count(&section.id) as f64,
        };

        Task {
            id: TaskId::temp(),
            title: draft.title,
            description: draft.description,
            completed: false,
            section_id: section.id.clone(),
            project_id: section.project_id.clone(),
            assignee_id: draft.assignee_id,
            start_at: draft.start_at,
            due_at: draft.due_at,
            priority: draft.priority,
            status: draft.status,
            tags: draft.tags,
            custom_fields: draft.custom_fields,
            parent_id: parent.map(|p| p.id.clone()),
            level: parent.map(|p| p.level + 1).unwrap_or(0),
            position,
            created_at: now,
            updated_at: now,
            completed_at: None,
            subtask_count: 0,
            expanded: false,
        }
    }
}
