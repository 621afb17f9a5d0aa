use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::SystemTime,
};

use trellis_model::{Board, Section, SectionId, SectionPatch, Task, TaskId, TaskPatch};

/// In-memory board storage: sections plus a task arena with secondary
/// indices.
///
/// Tasks live in a flat map keyed by id; ordering and nesting are kept in
/// separate index vectors (`by_section` for top-level cards, `children`
/// for subtasks). Recursive find/update/remove therefore costs a map
/// lookup plus index maintenance instead of a tree walk.
#[derive(Clone)]
pub struct BoardState {
    inner: Arc<RwLock<BoardStateInner>>,
}

struct BoardStateInner {
    sections: HashMap<SectionId, Section>,
    /// Section display order.
    section_order: Vec<SectionId>,
    tasks: HashMap<TaskId, Task>,
    /// Index: section -> ordered top-level task ids.
    by_section: HashMap<SectionId, Vec<TaskId>>,
    /// Index: parent task -> ordered subtask ids.
    children: HashMap<TaskId, Vec<TaskId>>,
}

/// Pre-mutation snapshot of a removed section and every task that lived
/// in it, kept for rollback of a failed delete.
pub struct SectionSnapshot {
    section: Section,
    tasks: Vec<Task>,
}

/// Pre-mutation snapshot of a moved task: the full record plus the slot
/// it occupied in its previous container.
pub struct MoveSnapshot {
    task: Task,
    index: usize,
}

impl BoardState {
    /// Create empty board state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(BoardStateInner {
                sections: HashMap::new(),
                section_order: Vec::new(),
                tasks: HashMap::new(),
                by_section: HashMap::new(),
                children: HashMap::new(),
            })),
        }
    }

    /// Replace everything with a freshly fetched board.
    pub fn replace_all(&self, board: Board) {
        let mut inner = self.inner.write().unwrap();

        inner.sections.clear();
        inner.section_order.clear();
        inner.tasks.clear();
        inner.by_section.clear();
        inner.children.clear();

        let mut sections = board.sections;
        sections.sort_by(|a, b| a.position.total_cmp(&b.position));
        for section in sections {
            inner.section_order.push(section.id.clone());
            inner.by_section.insert(section.id.clone(), Vec::new());
            inner.sections.insert(section.id.clone(), section);
        }

        let mut tasks = board.tasks;
        tasks.sort_by(|a, b| a.position.total_cmp(&b.position));
        for task in tasks {
            let id = task.id.clone();
            match &task.parent_id {
                Some(parent) => inner.children.entry(parent.clone()).or_default().push(id.clone()),
                None => inner
                    .by_section
                    .entry(task.section_id.clone())
                    .or_default()
                    .push(id.clone()),
            }
            inner.tasks.insert(id, task);
        }
    }

    // ------------------------------------------------------------------
    // Sections
    // ------------------------------------------------------------------

    pub fn insert_section(&self, section: Section) {
        let mut inner = self.inner.write().unwrap();
        inner.section_order.push(section.id.clone());
        inner.by_section.insert(section.id.clone(), Vec::new());
        inner.sections.insert(section.id.clone(), section);
    }

    /// Replace a temporary section id with the server-assigned record,
    /// keeping the display slot.
    pub fn swap_section_id(&self, temp: &SectionId, server: Section) {
        let mut inner = self.inner.write().unwrap();

        if inner.sections.remove(temp).is_none() {
            inner.section_order.push(server.id.clone());
            inner.by_section.insert(server.id.clone(), Vec::new());
            inner.sections.insert(server.id.clone(), server);
            return;
        }

        if let Some(slot) = inner.section_order.iter().position(|id| id == temp) {
            inner.section_order[slot] = server.id.clone();
        } else {
            inner.section_order.push(server.id.clone());
        }

        let task_ids = inner.by_section.remove(temp).unwrap_or_default();
        for task_id in &task_ids {
            if let Some(task) = inner.tasks.get_mut(task_id) {
                task.section_id = server.id.clone();
            }
        }
        inner.by_section.insert(server.id.clone(), task_ids);
        inner.sections.insert(server.id.clone(), server);
    }

    /// Apply a patch and return the pre-mutation record for rollback.
    pub fn apply_section_patch(&self, id: &SectionId, patch: &SectionPatch) -> Option<Section> {
        let mut inner = self.inner.write().unwrap();
        let section = inner.sections.get_mut(id)?;
        let snapshot = section.clone();
        patch.apply(section);
        Some(snapshot)
    }

    /// Overwrite a section record with the server's authoritative copy.
    pub fn replace_section(&self, section: Section) {
        let mut inner = self.inner.write().unwrap();
        inner.sections.insert(section.id.clone(), section);
    }

    pub fn restore_section(&self, snapshot: Section) {
        self.replace_section(snapshot);
    }

    /// Remove a section together with every task that lives in it.
    ///
    /// The returned snapshot restores the whole subtree on rollback, so a
    /// failed delete never leaves tasks pointing at a missing section.
    pub fn remove_section(&self, id: &SectionId) -> Option<SectionSnapshot> {
        let mut inner = self.inner.write().unwrap();
        let section = inner.sections.remove(id)?;
        inner.section_order.retain(|sid| sid != id);

        let top_level = inner.by_section.remove(id).unwrap_or_default();
        let mut tasks = Vec::new();
        for task_id in top_level {
            collect_subtree(&mut inner, &task_id, &mut tasks);
        }

        Some(SectionSnapshot { section, tasks })
    }

    /// Drop a rejected optimistic section without keeping a snapshot.
    pub fn discard_section(&self, id: &SectionId) {
        let mut inner = self.inner.write().unwrap();
        inner.sections.remove(id);
        inner.section_order.retain(|sid| sid != id);
        inner.by_section.remove(id);
    }

    /// Re-insert a removed section at the end of the board.
    pub fn restore_removed_section(&self, snapshot: SectionSnapshot) {
        let mut inner = self.inner.write().unwrap();
        let SectionSnapshot { section, tasks } = snapshot;

        inner.section_order.push(section.id.clone());
        inner.by_section.insert(section.id.clone(), Vec::new());

        // Tasks go in before the section record so the snapshot's cached
        // task count is not bumped a second time.
        for task in tasks {
            attach(&mut inner, task);
        }
        inner.sections.insert(section.id.clone(), section);
    }

    pub fn section(&self, id: &SectionId) -> Option<Section> {
        let inner = self.inner.read().unwrap();
        inner.sections.get(id).cloned()
    }

    /// All sections in display order.
    pub fn sections(&self) -> Vec<Section> {
        let inner = self.inner.read().unwrap();
        inner
            .section_order
            .iter()
            .filter_map(|id| inner.sections.get(id).cloned())
            .collect()
    }

    pub fn section_count(&self) -> usize {
        let inner = self.inner.read().unwrap();
        inner.section_order.len()
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// Register a task and index it under its section or parent.
    pub fn insert_task(&self, task: Task) {
        let mut inner = self.inner.write().unwrap();
        attach(&mut inner, task);
    }

    /// Replace a temporary task id with the server-assigned record,
    /// keeping the list slot the placeholder occupied.
    pub fn swap_task_id(&self, temp: &TaskId, server: Task) {
        let mut inner = self.inner.write().unwrap();

        let Some(old) = inner.tasks.remove(temp) else {
            attach(&mut inner, server);
            return;
        };

        let server_id = server.id.clone();
        let swapped = {
            let ids = match &old.parent_id {
                Some(parent) => inner.children.get_mut(parent),
                None => inner.by_section.get_mut(&old.section_id),
            };
            match ids {
                Some(ids) => match ids.iter().position(|tid| tid == temp) {
                    Some(slot) => {
                        ids[slot] = server_id.clone();
                        true
                    }
                    None => false,
                },
                None => false,
            }
        };

        // Subtasks created while the placeholder was in flight keep working:
        // re-key the children index and re-point their parent references.
        if let Some(child_ids) = inner.children.remove(temp) {
            for child_id in &child_ids {
                if let Some(child) = inner.tasks.get_mut(child_id) {
                    child.parent_id = Some(server_id.clone());
                }
            }
            inner.children.insert(server_id.clone(), child_ids);
        }

        if swapped {
            inner.tasks.insert(server_id, server);
        } else {
            attach(&mut inner, server);
        }
    }

    /// Drop a rejected optimistic task without keeping a snapshot.
    pub fn discard_task(&self, id: &TaskId) {
        let mut inner = self.inner.write().unwrap();
        detach(&mut inner, id);
        inner.tasks.remove(id);
        inner.children.remove(id);
    }

    /// Apply a patch plus a refreshed update timestamp and return the
    /// pre-mutation record for rollback.
    pub fn apply_task_patch(&self, id: &TaskId, patch: &TaskPatch) -> Option<Task> {
        let mut inner = self.inner.write().unwrap();
        let task = inner.tasks.get_mut(id)?;
        let snapshot = task.clone();

        patch.apply(task);
        task.updated_at = SystemTime::now();
        match patch.completed {
            Some(true) if !snapshot.completed => task.completed_at = Some(SystemTime::now()),
            Some(false) => task.completed_at = None,
            _ => {}
        }

        Some(snapshot)
    }

    /// Overwrite a task record with the server's authoritative copy,
    /// re-homing its index entries if the server moved it.
    pub fn replace_task(&self, task: Task) {
        let mut inner = self.inner.write().unwrap();

        let rehome = match inner.tasks.get(&task.id) {
            Some(current) => {
                current.section_id != task.section_id || current.parent_id != task.parent_id
            }
            None => true,
        };

        if rehome {
            detach(&mut inner, &task.id);
            inner.tasks.remove(&task.id);
            attach(&mut inner, task);
        } else {
            inner.tasks.insert(task.id.clone(), task);
        }
    }

    /// Roll a patched task back to its snapshot. Index entries are
    /// untouched since patches never change a task's home.
    pub fn restore_task(&self, snapshot: Task) {
        let mut inner = self.inner.write().unwrap();
        inner.tasks.insert(snapshot.id.clone(), snapshot);
    }

    /// Remove a task and its whole subtask subtree.
    ///
    /// Returns the removed records in preorder (the task itself first) so
    /// a failed delete can restore them.
    pub fn remove_task(&self, id: &TaskId) -> Option<Vec<Task>> {
        let mut inner = self.inner.write().unwrap();
        if !inner.tasks.contains_key(id) {
            return None;
        }

        detach(&mut inner, id);
        let mut removed = Vec::new();
        collect_subtree(&mut inner, id, &mut removed);
        if let Some(parent) = removed.first().and_then(|task| task.parent_id.clone()) {
            bump_subtask_count(&mut inner, &parent, -1);
        }
        Some(removed)
    }

    /// Re-insert a removed subtree. The root lands at the end of its
    /// previous container; exact slot restoration is not guaranteed.
    pub fn restore_removed(&self, tasks: Vec<Task>) {
        let mut inner = self.inner.write().unwrap();
        if let Some(parent) = tasks.first().and_then(|task| task.parent_id.clone()) {
            bump_subtask_count(&mut inner, &parent, 1);
        }
        for task in tasks {
            attach(&mut inner, task);
        }
    }

    /// Re-home a task to `section` at `index`, returning a snapshot that
    /// can undo the move exactly.
    ///
    /// The moved task becomes a top-level card of the destination section;
    /// its subtasks follow it, keeping their relative nesting. No other
    /// task's position is touched.
    pub fn move_task(&self, id: &TaskId, section: &SectionId, index: usize) -> Option<MoveSnapshot> {
        let mut inner = self.inner.write().unwrap();
        if !inner.tasks.contains_key(id) || !inner.sections.contains_key(section) {
            return None;
        }

        let slot = detach(&mut inner, id).unwrap_or(0);
        let snapshot = inner.tasks.get(id).cloned()?;
        if let Some(parent) = &snapshot.parent_id {
            bump_subtask_count(&mut inner, &parent.clone(), -1);
        }

        {
            let task = inner.tasks.get_mut(id)?;
            task.section_id = section.clone();
            task.parent_id = None;
            task.level = 0;
            task.position = index as f64;
            task.updated_at = SystemTime::now();
        }
        rehome_subtree(&mut inner, id, section);

        let ids = inner.by_section.entry(section.clone()).or_default();
        let at = index.min(ids.len());
        ids.insert(at, id.clone());
        bump_task_count(&mut inner, section, 1);

        Some(MoveSnapshot { task: snapshot, index: slot })
    }

    /// Undo a move: put the task back into its previous container at its
    /// previous slot and restore the snapshot record.
    pub fn undo_move(&self, snapshot: MoveSnapshot) {
        let mut inner = self.inner.write().unwrap();
        let MoveSnapshot { task, index } = snapshot;
        let id = task.id.clone();

        detach(&mut inner, &id);

        match &task.parent_id {
            Some(parent) => {
                let ids = inner.children.entry(parent.clone()).or_default();
                let at = index.min(ids.len());
                ids.insert(at, id.clone());
                bump_subtask_count(&mut inner, &parent.clone(), 1);
            }
            None => {
                let section = task.section_id.clone();
                let ids = inner.by_section.entry(section.clone()).or_default();
                let at = index.min(ids.len());
                ids.insert(at, id.clone());
                bump_task_count(&mut inner, &section, 1);
            }
        }

        let section = task.section_id.clone();
        inner.tasks.insert(id.clone(), task);
        rehome_subtree(&mut inner, &id, &section);
    }

    /// Bump a parent's cached subtask counter after a subtask create
    /// lands.
    pub fn increment_subtask_count(&self, id: &TaskId) {
        let mut inner = self.inner.write().unwrap();
        if let Some(task) = inner.tasks.get_mut(id) {
            task.subtask_count += 1;
        }
    }

    pub fn task(&self, id: &TaskId) -> Option<Task> {
        let inner = self.inner.read().unwrap();
        inner.tasks.get(id).cloned()
    }

    /// Ordered top-level tasks of a section.
    pub fn section_tasks(&self, id: &SectionId) -> Vec<Task> {
        let inner = self.inner.read().unwrap();
        inner
            .by_section
            .get(id)
            .map(|ids| ids.iter().filter_map(|tid| inner.tasks.get(tid).cloned()).collect())
            .unwrap_or_default()
    }

    /// Ordered subtasks of a parent.
    pub fn subtasks(&self, id: &TaskId) -> Vec<Task> {
        let inner = self.inner.read().unwrap();
        inner
            .children
            .get(id)
            .map(|ids| ids.iter().filter_map(|tid| inner.tasks.get(tid).cloned()).collect())
            .unwrap_or_default()
    }

    pub fn top_level_count(&self, id: &SectionId) -> usize {
        let inner = self.inner.read().unwrap();
        inner.by_section.get(id).map(Vec::len).unwrap_or(0)
    }

    pub fn subtask_len(&self, id: &TaskId) -> usize {
        let inner = self.inner.read().unwrap();
        inner.children.get(id).map(Vec::len).unwrap_or(0)
    }

    pub fn task_total(&self) -> usize {
        let inner = self.inner.read().unwrap();
        inner.tasks.len()
    }
}

impl Default for BoardState {
    fn default() -> Self {
        Self::new()
    }
}

/// Insert a task record and index it at the end of its container,
/// maintaining the owning section's cached task count.
fn attach(inner: &mut BoardStateInner, task: Task) {
    let id = task.id.clone();
    let section = task.section_id.clone();
    match &task.parent_id {
        Some(parent) => {
            inner.children.entry(parent.clone()).or_default().push(id.clone());
        }
        None => {
            inner.by_section.entry(section.clone()).or_default().push(id.clone());
            bump_task_count(inner, &section, 1);
        }
    }
    inner.tasks.insert(id, task);
}

/// Unlink a task id from whichever container holds it, returning the slot
/// it occupied. The record itself stays in the arena.
fn detach(inner: &mut BoardStateInner, id: &TaskId) -> Option<usize> {
    let (parent_id, section_id) = match inner.tasks.get(id) {
        Some(task) => (task.parent_id.clone(), task.section_id.clone()),
        None => return None,
    };

    match parent_id {
        Some(parent) => {
            let ids = inner.children.get_mut(&parent)?;
            let slot = ids.iter().position(|tid| tid == id)?;
            ids.remove(slot);
            Some(slot)
        }
        None => {
            let ids = inner.by_section.get_mut(&section_id)?;
            let slot = ids.iter().position(|tid| tid == id)?;
            ids.remove(slot);
            bump_task_count(inner, &section_id, -1);
            Some(slot)
        }
    }
}

/// Remove a task and its descendants from the arena in preorder,
/// accumulating the removed records.
fn collect_subtree(inner: &mut BoardStateInner, id: &TaskId, out: &mut Vec<Task>) {
    let Some(task) = inner.tasks.remove(id) else {
        return;
    };
    out.push(task);

    let child_ids = inner.children.remove(id).unwrap_or_default();
    for child_id in child_ids {
        collect_subtree(inner, &child_id, out);
    }
}

/// Point a subtree's descendants at `section` and rebase their nesting
/// levels on the (already updated) root.
fn rehome_subtree(inner: &mut BoardStateInner, root: &TaskId, section: &SectionId) {
    let root_level = match inner.tasks.get(root) {
        Some(task) => task.level,
        None => return,
    };
    let child_ids = inner.children.get(root).cloned().unwrap_or_default();
    for child_id in child_ids {
        if let Some(child) = inner.tasks.get_mut(&child_id) {
            child.section_id = section.clone();
            child.level = root_level + 1;
        }
        rehome_subtree(inner, &child_id, section);
    }
}

fn bump_task_count(inner: &mut BoardStateInner, section: &SectionId, delta: i64) {
    if let Some(section) = inner.sections.get_mut(section) {
        section.task_count = (section.task_count as i64 + delta).max(0) as u32;
    }
}

fn bump_subtask_count(inner: &mut BoardStateInner, parent: &TaskId, delta: i64) {
    if let Some(parent) = inner.tasks.get_mut(parent) {
        parent.subtask_count = (parent.subtask_count as i64 + delta).max(0) as u32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_model::ProjectId;

    fn section(id: &str, name: &str, position: f64) -> Section {
        Section {
            id: SectionId::from(id),
            name: name.to_string(),
            project_id: ProjectId::from("proj-1"),
            color: None,
            position,
            collapsed: false,
            wip_limit: None,
            task_count: 0,
        }
    }

    fn task(id: &str, section: &str, position: f64) -> Task {
        Task {
            id: TaskId::from(id),
            title: format!("task {id}"),
            description: String::new(),
            completed: false,
            section_id: SectionId::from(section),
            project_id: ProjectId::from("proj-1"),
            assignee_id: None,
            start_at: None,
            due_at: None,
            priority: None,
            status: None,
            tags: Vec::new(),
            custom_fields: HashMap::new(),
            parent_id: None,
            level: 0,
            position,
            created_at: SystemTime::now(),
            updated_at: SystemTime::now(),
            completed_at: None,
            subtask_count: 0,
            expanded: false,
        }
    }

    fn subtask(id: &str, parent: &Task, position: f64) -> Task {
        Task {
            id: TaskId::from(id),
            parent_id: Some(parent.id.clone()),
            level: parent.level + 1,
            section_id: parent.section_id.clone(),
            position,
            ..task(id, parent.section_id.as_str(), position)
        }
    }

    /// Two sections; "sec-a" holds a1 and a2, "sec-b" holds b1.
    fn seeded_state() -> BoardState {
        let state = BoardState::new();
        state.insert_section(section("sec-a", "To Do", 0.0));
        state.insert_section(section("sec-b", "Doing", 1.0));
        state.insert_task(task("a1", "sec-a", 0.0));
        state.insert_task(task("a2", "sec-a", 1.0));
        state.insert_task(task("b1", "sec-b", 0.0));
        state
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn insert_and_get_task() {
        let state = seeded_state();

        let found = state.task(&TaskId::from("a1")).expect("task should exist");
        assert_eq!(found.title, "task a1");
        assert_eq!(found.section_id, SectionId::from("sec-a"));
        assert_eq!(state.task_total(), 3);
    }

    #[test]
    fn section_tasks_keep_insertion_order() {
        let state = seeded_state();
        assert_eq!(ids(&state.section_tasks(&SectionId::from("sec-a"))), ["a1", "a2"]);
        assert_eq!(ids(&state.section_tasks(&SectionId::from("sec-b"))), ["b1"]);
    }

    #[test]
    fn insert_maintains_section_task_count() {
        let state = seeded_state();
        assert_eq!(state.section(&SectionId::from("sec-a")).unwrap().task_count, 2);
        assert_eq!(state.section(&SectionId::from("sec-b")).unwrap().task_count, 1);
    }

    #[test]
    fn swap_task_id_keeps_list_slot() {
        let state = seeded_state();
        let temp = TaskId::temp();
        let mut placeholder = task("ignored", "sec-a", 2.0);
        placeholder.id = temp.clone();
        state.insert_task(placeholder);

        let mut server = task("srv-9", "sec-a", 2.0);
        server.title = "task srv-9".to_string();
        state.swap_task_id(&temp, server);

        let listed = state.section_tasks(&SectionId::from("sec-a"));
        assert_eq!(ids(&listed), ["a1", "a2", "srv-9"]);
        assert!(state.task(&temp).is_none());
        assert_eq!(state.section(&SectionId::from("sec-a")).unwrap().task_count, 3);
    }

    #[test]
    fn swap_task_id_repoints_children_of_placeholder() {
        let state = seeded_state();
        let temp = TaskId::temp();
        let mut placeholder = task("ignored", "sec-a", 2.0);
        placeholder.id = temp.clone();
        state.insert_task(placeholder.clone());
        state.insert_task(subtask("sub-1", &state.task(&temp).unwrap(), 0.0));

        state.swap_task_id(&temp, task("srv-9", "sec-a", 2.0));

        let sub = state.task(&TaskId::from("sub-1")).unwrap();
        assert_eq!(sub.parent_id, Some(TaskId::from("srv-9")));
        assert_eq!(ids(&state.subtasks(&TaskId::from("srv-9"))), ["sub-1"]);
    }

    #[test]
    fn apply_patch_returns_pre_mutation_snapshot() {
        let state = seeded_state();
        let id = TaskId::from("a1");

        let snapshot = state
            .apply_task_patch(&id, &TaskPatch::title("renamed"))
            .expect("task should exist");

        assert_eq!(snapshot.title, "task a1");
        assert_eq!(state.task(&id).unwrap().title, "renamed");
    }

    #[test]
    fn patch_completion_toggles_completed_at() {
        let state = seeded_state();
        let id = TaskId::from("a1");

        let done = TaskPatch {
            completed: Some(true),
            ..TaskPatch::default()
        };
        state.apply_task_patch(&id, &done).unwrap();
        assert!(state.task(&id).unwrap().completed_at.is_some());

        let reopened = TaskPatch {
            completed: Some(false),
            ..TaskPatch::default()
        };
        state.apply_task_patch(&id, &reopened).unwrap();
        assert!(state.task(&id).unwrap().completed_at.is_none());
    }

    #[test]
    fn restore_task_rolls_back_to_snapshot() {
        let state = seeded_state();
        let id = TaskId::from("a1");
        let before = state.section_tasks(&SectionId::from("sec-a"));

        let snapshot = state.apply_task_patch(&id, &TaskPatch::title("renamed")).unwrap();
        state.restore_task(snapshot);

        assert_eq!(state.section_tasks(&SectionId::from("sec-a")), before);
    }

    #[test]
    fn remove_task_returns_subtree_in_preorder() {
        let state = seeded_state();
        let parent = state.task(&TaskId::from("a1")).unwrap();
        state.insert_task(subtask("sub-1", &parent, 0.0));
        state.insert_task(subtask("sub-2", &parent, 1.0));

        let removed = state.remove_task(&parent.id).expect("task should exist");

        assert_eq!(ids(&removed), ["a1", "sub-1", "sub-2"]);
        assert!(state.task(&TaskId::from("sub-1")).is_none());
        assert_eq!(ids(&state.section_tasks(&SectionId::from("sec-a"))), ["a2"]);
    }

    #[test]
    fn remove_then_restore_reappends_at_end() {
        let state = seeded_state();

        let removed = state.remove_task(&TaskId::from("a1")).unwrap();
        state.restore_removed(removed);

        assert_eq!(ids(&state.section_tasks(&SectionId::from("sec-a"))), ["a2", "a1"]);
        assert_eq!(state.section(&SectionId::from("sec-a")).unwrap().task_count, 2);
    }

    #[test]
    fn subtask_removal_updates_parent_counter() {
        let state = seeded_state();
        let parent_id = TaskId::from("a1");
        let parent = state.task(&parent_id).unwrap();
        state.insert_task(subtask("sub-1", &parent, 0.0));
        state.increment_subtask_count(&parent_id);
        assert_eq!(state.task(&parent_id).unwrap().subtask_count, 1);

        let removed = state.remove_task(&TaskId::from("sub-1")).unwrap();
        assert_eq!(state.task(&parent_id).unwrap().subtask_count, 0);

        state.restore_removed(removed);
        assert_eq!(state.task(&parent_id).unwrap().subtask_count, 1);
    }

    #[test]
    fn move_task_rehomes_subtree() {
        let state = seeded_state();
        let parent = state.task(&TaskId::from("a1")).unwrap();
        state.insert_task(subtask("sub-1", &parent, 0.0));

        state.move_task(&parent.id, &SectionId::from("sec-b"), 0).unwrap();

        let moved = state.task(&parent.id).unwrap();
        assert_eq!(moved.section_id, SectionId::from("sec-b"));
        assert_eq!(moved.position, 0.0);
        let sub = state.task(&TaskId::from("sub-1")).unwrap();
        assert_eq!(sub.section_id, SectionId::from("sec-b"));
        assert_eq!(sub.level, 1);
        assert_eq!(ids(&state.section_tasks(&SectionId::from("sec-b"))), ["a1", "b1"]);
    }

    #[test]
    fn move_does_not_touch_other_positions() {
        let state = seeded_state();
        let before: Vec<f64> = state
            .section_tasks(&SectionId::from("sec-b"))
            .iter()
            .map(|t| t.position)
            .collect();

        state.move_task(&TaskId::from("a1"), &SectionId::from("sec-b"), 1).unwrap();

        let after: Vec<f64> = state
            .section_tasks(&SectionId::from("sec-b"))
            .iter()
            .filter(|t| t.id.as_str() != "a1")
            .map(|t| t.position)
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn move_then_undo_restores_exact_slot() {
        let state = seeded_state();
        let before_a = state.section_tasks(&SectionId::from("sec-a"));
        let before_b = state.section_tasks(&SectionId::from("sec-b"));

        let snapshot = state.move_task(&TaskId::from("a1"), &SectionId::from("sec-b"), 0).unwrap();
        state.undo_move(snapshot);

        assert_eq!(state.section_tasks(&SectionId::from("sec-a")), before_a);
        assert_eq!(state.section_tasks(&SectionId::from("sec-b")), before_b);
        assert_eq!(state.section(&SectionId::from("sec-a")).unwrap().task_count, 2);
        assert_eq!(state.section(&SectionId::from("sec-b")).unwrap().task_count, 1);
    }

    #[test]
    fn discard_task_drops_placeholder() {
        let state = seeded_state();
        let temp = TaskId::temp();
        let mut placeholder = task("ignored", "sec-a", 2.0);
        placeholder.id = temp.clone();
        state.insert_task(placeholder);

        state.discard_task(&temp);

        assert!(state.task(&temp).is_none());
        assert_eq!(ids(&state.section_tasks(&SectionId::from("sec-a"))), ["a1", "a2"]);
        assert_eq!(state.section(&SectionId::from("sec-a")).unwrap().task_count, 2);
    }

    #[test]
    fn remove_section_takes_its_tasks_along() {
        let state = seeded_state();
        let parent = state.task(&TaskId::from("a1")).unwrap();
        state.insert_task(subtask("sub-1", &parent, 0.0));

        let snapshot = state.remove_section(&SectionId::from("sec-a")).unwrap();

        assert!(state.section(&SectionId::from("sec-a")).is_none());
        assert!(state.task(&TaskId::from("a1")).is_none());
        assert!(state.task(&TaskId::from("sub-1")).is_none());
        assert_eq!(state.task_total(), 1);

        state.restore_removed_section(snapshot);

        assert_eq!(ids(&state.section_tasks(&SectionId::from("sec-a"))), ["a1", "a2"]);
        assert_eq!(state.task(&TaskId::from("sub-1")).unwrap().parent_id, Some(parent.id));
        assert_eq!(state.section(&SectionId::from("sec-a")).unwrap().task_count, 2);
    }

    #[test]
    fn apply_section_patch_returns_snapshot() {
        let state = seeded_state();
        let id = SectionId::from("sec-a");

        let snapshot = state.apply_section_patch(&id, &SectionPatch::named("Backlog")).unwrap();

        assert_eq!(snapshot.name, "To Do");
        assert_eq!(state.section(&id).unwrap().name, "Backlog");

        state.restore_section(snapshot);
        assert_eq!(state.section(&id).unwrap().name, "To Do");
    }

    #[test]
    fn replace_all_orders_by_position() {
        let state = BoardState::new();
        let board = Board {
            sections: vec![section("sec-b", "Doing", 1.0), section("sec-a", "To Do", 0.0)],
            tasks: vec![
                task("a2", "sec-a", 1.0),
                task("a1", "sec-a", 0.0),
                subtask("sub-1", &task("a1", "sec-a", 0.0), 0.0),
            ],
        };

        state.replace_all(board);

        let sections = state.sections();
        assert_eq!(sections[0].name, "To Do");
        assert_eq!(sections[1].name, "Doing");
        assert_eq!(ids(&state.section_tasks(&SectionId::from("sec-a"))), ["a1", "a2"]);
        assert_eq!(ids(&state.subtasks(&TaskId::from("a1"))), ["sub-1"]);
    }

    #[test]
    fn replace_task_rehomes_when_server_moved_it() {
        let state = seeded_state();
        let mut moved = state.task(&TaskId::from("a1")).unwrap();
        moved.section_id = SectionId::from("sec-b");

        state.replace_task(moved);

        assert_eq!(ids(&state.section_tasks(&SectionId::from("sec-a"))), ["a2"]);
        assert_eq!(ids(&state.section_tasks(&SectionId::from("sec-b"))), ["b1", "a1"]);
    }

    #[test]
    fn counts_track_nesting() {
        let state = seeded_state();
        let parent = state.task(&TaskId::from("a1")).unwrap();
        state.insert_task(subtask("sub-1", &parent, 0.0));
        state.insert_task(subtask("sub-2", &parent, 1.0));

        assert_eq!(state.top_level_count(&SectionId::from("sec-a")), 2);
        assert_eq!(state.subtask_len(&parent.id), 2);
    }
}
