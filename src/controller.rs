use crate::models::{Filter, Owner, Task};
use crate::state::{AppState, TaskView};
use crate::store::{StoreError, TaskStore};

// User-facing notice strings; the UI shows these as-is.
pub const MSG_EMPTY_TASK: &str = "Please enter a task.";
pub const MSG_SIGN_IN: &str = "Sign in to manage tasks.";
pub const MSG_TASK_NOT_FOUND: &str = "No such task.";
pub const MSG_LOAD_FAILED: &str = "Could not load tasks.";
pub const MSG_ADD_FAILED: &str = "Could not add task.";
pub const MSG_UPDATE_FAILED: &str = "Could not update task.";
pub const MSG_DELETE_FAILED: &str = "Could not delete task.";
pub const MSG_CLEAR_FAILED: &str = "Could not clear tasks.";
pub const MSG_ALL_CLEARED: &str = "All tasks cleared.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// Seam between the controller and whatever renders it: a terminal, a GUI,
/// or a test recorder. Notices are transient, never blocking.
pub trait Presenter {
    fn render(&self, view: &TaskView);
    fn notify(&self, kind: NoticeKind, text: &str);
}

#[derive(Debug)]
pub enum AppError {
    /// Bad user input; nothing was changed.
    Validation(String),
    /// The operation needs a signed-in (or local) owner.
    Auth(String),
    /// Persistence failed; the optimistic mutation was reverted.
    /// `retry_input` re-surfaces the rejected input so the UI can offer a
    /// retry.
    Store {
        source: StoreError,
        retry_input: Option<String>,
    },
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Validation(message) => write!(f, "{message}"),
            AppError::Auth(message) => write!(f, "{message}"),
            AppError::Store { source, .. } => write!(f, "store error: {source}"),
        }
    }
}

impl std::error::Error for AppError {}

/// Owns the in-memory task collection and mediates between UI commands and
/// the task store. Every mutation is applied and re-rendered optimistically
/// before the store call resolves; when persistence fails the mutation is
/// reverted and the failure surfaced as a transient notice.
pub struct TaskListController<P: Presenter> {
    state: AppState,
    store: TaskStore,
    presenter: P,
}

impl<P: Presenter> TaskListController<P> {
    pub fn new(store: TaskStore, presenter: P) -> Self {
        Self {
            state: AppState::new(),
            store,
            presenter,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    /// Reports the current filtered view to the presenter.
    pub fn render(&self) {
        self.presenter.render(&self.state.view());
    }

    pub fn view(&self) -> TaskView {
        self.state.view()
    }

    fn require_owner(&self) -> Result<Owner, AppError> {
        match self.state.owner() {
            Some(owner) => Ok(owner),
            None => {
                self.presenter.notify(NoticeKind::Error, MSG_SIGN_IN);
                Err(AppError::Auth(MSG_SIGN_IN.to_string()))
            }
        }
    }

    fn store_error(&self, source: StoreError, notice: &str, retry_input: Option<String>) -> AppError {
        log::warn!("store operation failed: {source}");
        self.presenter.notify(NoticeKind::Error, notice);
        AppError::Store {
            source,
            retry_input,
        }
    }

    /// Replaces the visible collection with `owner`'s tasks, ordered by
    /// creation time ascending. `None` clears without touching the store.
    /// On store failure the collection is left empty for that owner.
    pub async fn load(&self, owner: Option<Owner>) -> Result<(), AppError> {
        let Some(owner) = owner else {
            self.state.swap_owner(None, Vec::new());
            self.render();
            return Ok(());
        };
        match self.store.list(owner.id()).await {
            Ok(tasks) => {
                self.state.swap_owner(Some(owner), tasks);
                self.render();
                Ok(())
            }
            Err(source) => {
                self.state.swap_owner(Some(owner), Vec::new());
                self.render();
                Err(self.store_error(source, MSG_LOAD_FAILED, None))
            }
        }
    }

    /// Appends a task optimistically, then persists it. The temporary
    /// client-side id is replaced by the store-assigned one on
    /// confirmation; on failure the entry is removed again and the input
    /// travels back in the error for retry.
    pub async fn add(&self, text: &str) -> Result<Task, AppError> {
        let text = text.trim();
        if text.is_empty() {
            self.presenter.notify(NoticeKind::Error, MSG_EMPTY_TASK);
            return Err(AppError::Validation(MSG_EMPTY_TASK.to_string()));
        }
        let owner = self.require_owner()?;

        let pending_id = format!("pending-{}", uuid::Uuid::new_v4());
        self.state.push_task(Task {
            id: pending_id.clone(),
            text: text.to_string(),
            completed: false,
            created_at: None,
        });
        self.render();

        match self.store.create(owner.id(), text).await {
            Ok(confirmed) => {
                self.state.confirm_pending(&pending_id, confirmed.clone());
                self.render();
                Ok(confirmed)
            }
            Err(source) => {
                self.state.remove_task(&pending_id);
                self.render();
                Err(self.store_error(source, MSG_ADD_FAILED, Some(text.to_string())))
            }
        }
    }

    /// Flips a task's completion flag optimistically, then persists the new
    /// value. There is deliberately no guard against the task having been
    /// deleted remotely in the meantime; the store reports that as a
    /// failure and the local flip is reverted.
    pub async fn toggle_completion(&self, id: &str) -> Result<bool, AppError> {
        let owner = self.require_owner()?;
        let Some(completed) = self.state.toggle(id) else {
            self.presenter.notify(NoticeKind::Error, MSG_TASK_NOT_FOUND);
            return Err(AppError::Validation(MSG_TASK_NOT_FOUND.to_string()));
        };
        self.render();

        match self.store.set_completed(owner.id(), id, completed).await {
            Ok(()) => Ok(completed),
            Err(source) => {
                self.state.toggle(id);
                self.render();
                Err(self.store_error(source, MSG_UPDATE_FAILED, None))
            }
        }
    }

    /// Removes a task optimistically, then deletes it from the store,
    /// reinserting it at its original position if the delete fails.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let owner = self.require_owner()?;
        let Some((index, task)) = self.state.remove_task(id) else {
            self.presenter.notify(NoticeKind::Error, MSG_TASK_NOT_FOUND);
            return Err(AppError::Validation(MSG_TASK_NOT_FOUND.to_string()));
        };
        self.render();

        match self.store.delete(owner.id(), id).await {
            Ok(()) => Ok(()),
            Err(source) => {
                self.state.insert_task(index, task);
                self.render();
                Err(self.store_error(source, MSG_DELETE_FAILED, None))
            }
        }
    }

    /// Deletes every task for the current owner in one bulk store
    /// operation. Confirmation is the caller's responsibility; the
    /// controller assumes it was given. The previous collection is
    /// restored if the bulk delete fails.
    pub async fn clear_all(&self) -> Result<(), AppError> {
        let owner = self.require_owner()?;
        let previous = self.state.clear();
        self.render();

        match self.store.clear(owner.id()).await {
            Ok(()) => {
                self.presenter.notify(NoticeKind::Info, MSG_ALL_CLEARED);
                Ok(())
            }
            Err(source) => {
                self.state.restore(previous);
                self.render();
                Err(self.store_error(source, MSG_CLEAR_FAILED, None))
            }
        }
    }

    /// View-only; the underlying collection is untouched.
    pub fn set_filter(&self, filter: Filter) {
        self.state.set_filter(filter);
        self.render();
    }
}
