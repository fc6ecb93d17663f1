use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::models::{Filter, Owner, Task};

/// Counts reported alongside every rendered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Summary {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

/// The filtered, ordered view handed to the presentation layer. Computing
/// it never mutates the underlying collection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TaskView {
    pub filter: Filter,
    pub tasks: Vec<Task>,
    pub summary: Summary,
}

/// Application state: the in-memory task collection, the owner it belongs
/// to, and the active view filter. This is the single place task state is
/// mutated; everything else works on cloned snapshots.
#[derive(Clone, Default)]
pub struct AppState {
    inner: Arc<Mutex<AppData>>,
}

#[derive(Debug, Default)]
struct AppData {
    tasks: Vec<Task>,
    owner: Option<Owner>,
    filter: Filter,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(&self) -> Option<Owner> {
        let guard = self.inner.lock().expect("state poisoned");
        guard.owner.clone()
    }

    /// Swaps the visible collection: the previous owner's tasks are
    /// discarded in the same critical section the owner changes in, so a
    /// view can never mix two owners.
    pub fn swap_owner(&self, owner: Option<Owner>, tasks: Vec<Task>) {
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.owner = owner;
        guard.tasks = tasks;
    }

    pub fn tasks(&self) -> Vec<Task> {
        let guard = self.inner.lock().expect("state poisoned");
        guard.tasks.clone()
    }

    pub fn push_task(&self, task: Task) {
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.tasks.push(task);
    }

    /// Replaces the optimistic record carrying `pending_id` with the
    /// store-confirmed task. Returns false if it was removed in the
    /// meantime.
    pub fn confirm_pending(&self, pending_id: &str, confirmed: Task) -> bool {
        let mut guard = self.inner.lock().expect("state poisoned");
        match guard.tasks.iter_mut().find(|task| task.id == pending_id) {
            Some(existing) => {
                *existing = confirmed;
                true
            }
            None => false,
        }
    }

    /// Removes a task, reporting its position and contents for a later
    /// revert.
    pub fn remove_task(&self, id: &str) -> Option<(usize, Task)> {
        let mut guard = self.inner.lock().expect("state poisoned");
        let index = guard.tasks.iter().position(|task| task.id == id)?;
        Some((index, guard.tasks.remove(index)))
    }

    /// Reinserts a previously removed task at its original position.
    pub fn insert_task(&self, index: usize, task: Task) {
        let mut guard = self.inner.lock().expect("state poisoned");
        let index = index.min(guard.tasks.len());
        guard.tasks.insert(index, task);
    }

    /// Flips `completed` and returns the new value, or `None` when the id
    /// is not in the collection.
    pub fn toggle(&self, id: &str) -> Option<bool> {
        let mut guard = self.inner.lock().expect("state poisoned");
        let task = guard.tasks.iter_mut().find(|task| task.id == id)?;
        task.completed = !task.completed;
        Some(task.completed)
    }

    /// Empties the collection, returning the previous contents so a failed
    /// bulk delete can restore them.
    pub fn clear(&self) -> Vec<Task> {
        let mut guard = self.inner.lock().expect("state poisoned");
        std::mem::take(&mut guard.tasks)
    }

    pub fn restore(&self, tasks: Vec<Task>) {
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.tasks = tasks;
    }

    pub fn filter(&self) -> Filter {
        let guard = self.inner.lock().expect("state poisoned");
        guard.filter
    }

    pub fn set_filter(&self, filter: Filter) {
        let mut guard = self.inner.lock().expect("state poisoned");
        guard.filter = filter;
    }

    /// Pure function of current state and filter.
    pub fn view(&self) -> TaskView {
        let guard = self.inner.lock().expect("state poisoned");
        let completed = guard.tasks.iter().filter(|task| task.completed).count();
        let summary = Summary {
            total: guard.tasks.len(),
            active: guard.tasks.len() - completed,
            completed,
        };
        let tasks = guard
            .tasks
            .iter()
            .filter(|task| guard.filter.matches(task))
            .cloned()
            .collect();
        TaskView {
            filter: guard.filter,
            tasks,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identity;

    fn make_task(id: &str, completed: bool) -> Task {
        Task {
            id: id.to_string(),
            text: format!("task-{id}"),
            completed,
            created_at: Some(1),
        }
    }

    #[test]
    fn view_summary_always_balances() {
        let state = AppState::new();
        state.push_task(make_task("a", false));
        state.push_task(make_task("b", false));
        state.push_task(make_task("c", true));

        let mut views = vec![state.view()];
        state.toggle("a");
        views.push(state.view());
        state.remove_task("b");
        views.push(state.view());
        state.push_task(make_task("d", false));
        views.push(state.view());

        for view in views {
            assert_eq!(
                view.summary.total,
                view.summary.active + view.summary.completed
            );
        }
    }

    #[test]
    fn view_filters_without_mutating_the_collection() {
        let state = AppState::new();
        state.push_task(make_task("a", false));
        state.push_task(make_task("b", true));

        state.set_filter(Filter::Active);
        let view = state.view();
        assert!(view.tasks.iter().all(|task| !task.completed));
        assert_eq!(view.summary, Summary { total: 2, active: 1, completed: 1 });

        state.set_filter(Filter::Completed);
        let view = state.view();
        assert!(view.tasks.iter().all(|task| task.completed));

        state.set_filter(Filter::All);
        let view = state.view();
        assert_eq!(view.tasks.len(), state.tasks().len());
    }

    #[test]
    fn toggle_twice_restores_original_flag() {
        let state = AppState::new();
        state.push_task(make_task("a", false));
        assert_eq!(state.toggle("a"), Some(true));
        assert_eq!(state.toggle("a"), Some(false));
        assert_eq!(state.toggle("missing"), None);
    }

    #[test]
    fn confirm_pending_replaces_the_optimistic_record_in_place() {
        let state = AppState::new();
        state.push_task(Task {
            id: "pending-1".to_string(),
            text: "buy milk".to_string(),
            completed: false,
            created_at: None,
        });
        let confirmed = Task {
            id: "t1".to_string(),
            text: "buy milk".to_string(),
            completed: false,
            created_at: Some(7),
        };
        assert!(state.confirm_pending("pending-1", confirmed.clone()));
        assert_eq!(state.tasks(), vec![confirmed]);
        assert!(!state.confirm_pending("pending-1", make_task("x", false)));
    }

    #[test]
    fn remove_and_insert_restore_original_position() {
        let state = AppState::new();
        state.push_task(make_task("a", false));
        state.push_task(make_task("b", false));
        state.push_task(make_task("c", false));

        let (index, task) = state.remove_task("b").expect("task exists");
        assert_eq!(index, 1);
        state.insert_task(index, task);
        assert_eq!(
            state.tasks().iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        assert!(state.remove_task("missing").is_none());
    }

    #[test]
    fn swap_owner_discards_the_previous_collection() {
        let state = AppState::new();
        state.swap_owner(Some(Owner::Local), vec![make_task("a", false)]);
        assert_eq!(state.tasks().len(), 1);

        let sam = Owner::User(Identity {
            uid: "uid-sam".to_string(),
            display_name: None,
        });
        state.swap_owner(Some(sam.clone()), Vec::new());
        assert!(state.tasks().is_empty());
        assert_eq!(state.owner(), Some(sam));

        state.swap_owner(None, Vec::new());
        assert_eq!(state.owner(), None);
    }

    #[test]
    fn clear_returns_previous_tasks_for_restore() {
        let state = AppState::new();
        state.push_task(make_task("a", false));
        state.push_task(make_task("b", true));
        let previous = state.clear();
        assert!(state.tasks().is_empty());
        state.restore(previous);
        assert_eq!(state.tasks().len(), 2);
    }
}
