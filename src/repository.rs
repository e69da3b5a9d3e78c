//! The task repository contract and an in-memory implementation.
//!
//! [`TaskRepository`] is the only way the web layer touches stored tasks. The
//! SQLite backend lives in [`crate::db`]; [`MemoryTaskRepository`] keeps tasks
//! in a map and is meant for tests and throwaway sessions.

use crate::error::StorageResult;
use crate::types::{Task, TaskUpdate, listing_order, now_timestamp};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Storage operations over tasks.
///
/// Missing ids are reported through `None`/`false`, never as errors. Any
/// failure of the backing store is returned as a [`StorageError`]
/// unchanged; implementations do not retry and do not log.
///
/// [`StorageError`]: crate::error::StorageError
pub trait TaskRepository: Send + Sync {
    /// All tasks: incomplete first, then priority ascending, then due date
    /// ascending with undated tasks last, then id.
    fn get_all(&self) -> StorageResult<Vec<Task>>;

    /// The task with the given id, if any.
    fn get_by_id(&self, id: i64) -> StorageResult<Option<Task>>;

    /// Persist a new task and return it with its assigned id.
    ///
    /// Both timestamps are set to the insert time; any id already on the
    /// task is ignored.
    fn create(&self, task: Task) -> StorageResult<Task>;

    /// Apply the supplied fields and refresh `updated_at`.
    ///
    /// Returns `None` if the task does not exist or `update` is empty.
    fn update(&self, id: i64, update: &TaskUpdate) -> StorageResult<Option<Task>>;

    /// Remove a task. Returns whether a row was removed.
    fn delete(&self, id: i64) -> StorageResult<bool>;

    /// Set the completion flag and refresh `updated_at`.
    fn mark_completed(&self, id: i64, completed: bool) -> StorageResult<Option<Task>>;
}

#[derive(Debug, Default)]
struct MemoryState {
    last_id: i64,
    tasks: BTreeMap<i64, Task>,
}

/// Task repository backed by an in-process map.
///
/// Ids are assigned from a counter that never reuses a deleted id, matching
/// the SQLite `AUTOINCREMENT` behavior.
#[derive(Debug, Default)]
pub struct MemoryTaskRepository {
    state: Mutex<MemoryState>,
}

impl MemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TaskRepository for MemoryTaskRepository {
    fn get_all(&self) -> StorageResult<Vec<Task>> {
        let state = self.lock();
        let mut tasks: Vec<Task> = state.tasks.values().cloned().collect();
        tasks.sort_by(listing_order);
        Ok(tasks)
    }

    fn get_by_id(&self, id: i64) -> StorageResult<Option<Task>> {
        Ok(self.lock().tasks.get(&id).cloned())
    }

    fn create(&self, mut task: Task) -> StorageResult<Task> {
        let mut state = self.lock();
        state.last_id += 1;
        let id = state.last_id;
        let now = now_timestamp();
        task.id = Some(id);
        task.created_at = now.clone();
        task.updated_at = now;
        state.tasks.insert(id, task.clone());
        Ok(task)
    }

    fn update(&self, id: i64, update: &TaskUpdate) -> StorageResult<Option<Task>> {
        let mut state = self.lock();
        let Some(task) = state.tasks.get_mut(&id) else {
            return Ok(None);
        };
        if !task.apply(update) {
            return Ok(None);
        }
        task.touch();
        Ok(Some(task.clone()))
    }

    fn delete(&self, id: i64) -> StorageResult<bool> {
        Ok(self.lock().tasks.remove(&id).is_some())
    }

    fn mark_completed(&self, id: i64, completed: bool) -> StorageResult<Option<Task>> {
        let mut state = self.lock();
        Ok(state.tasks.get_mut(&id).map(|task| {
            task.completed = completed;
            task.touch();
            task.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_not_reused_after_delete() {
        let repo = MemoryTaskRepository::new();
        let first = repo.create(Task::new("one")).unwrap();
        assert!(repo.delete(first.id.unwrap()).unwrap());

        let second = repo.create(Task::new("two")).unwrap();
        assert_eq!(second.id, Some(2));
    }

    #[test]
    fn create_ignores_caller_id() {
        let repo = MemoryTaskRepository::new();
        let task = repo.create(Task::new("x").with_id(99)).unwrap();
        assert_eq!(task.id, Some(1));
        assert!(repo.get_by_id(99).unwrap().is_none());
    }
}
