use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::models::{Task, TasksFile, LOCAL_OWNER_ID, SCHEMA_VERSION};
use crate::remote::RemoteStore;
use crate::storage::{Storage, StorageError};

#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Request(String),
    Http { status: u16, body: String },
    NotFound(String),
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(err) => write!(f, "io error: {err}"),
            StoreError::Json(err) => write!(f, "json error: {err}"),
            StoreError::Request(err) => write!(f, "request error: {err}"),
            StoreError::Http { status, body } => write!(f, "http {status}: {body}"),
            StoreError::NotFound(id) => write!(f, "no such task: {id}"),
            StoreError::Unavailable(reason) => write!(f, "store unavailable: {reason}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::Json(value)
    }
}

impl From<StorageError> for StoreError {
    fn from(value: StorageError) -> Self {
        match value {
            StorageError::Io(err) => StoreError::Io(err),
            StorageError::Json(err) => StoreError::Json(err),
        }
    }
}

fn new_task_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The persistence backend behind the task list controller. All backends
/// expose the same owner-scoped create/list/update/delete surface keyed by
/// an opaque task id; ids and creation timestamps are assigned here, never
/// by the caller.
pub enum TaskStore {
    Local(LocalStore),
    Remote(RemoteStore),
    Memory(MemoryStore),
}

impl TaskStore {
    /// All tasks for `owner`, ordered by creation time ascending.
    pub async fn list(&self, owner: &str) -> Result<Vec<Task>, StoreError> {
        match self {
            TaskStore::Local(store) => store.list(owner),
            TaskStore::Remote(store) => store.list(owner).await,
            TaskStore::Memory(store) => store.list(owner),
        }
    }

    /// Persists a new task and returns it with its store-assigned id and
    /// creation timestamp.
    pub async fn create(&self, owner: &str, text: &str) -> Result<Task, StoreError> {
        match self {
            TaskStore::Local(store) => store.create(owner, text),
            TaskStore::Remote(store) => store.create(owner, text).await,
            TaskStore::Memory(store) => store.create(owner, text),
        }
    }

    pub async fn set_completed(
        &self,
        owner: &str,
        id: &str,
        completed: bool,
    ) -> Result<(), StoreError> {
        match self {
            TaskStore::Local(store) => store.set_completed(owner, id, completed),
            TaskStore::Remote(store) => store.set_completed(owner, id, completed).await,
            TaskStore::Memory(store) => store.set_completed(owner, id, completed),
        }
    }

    /// Deleting an id that is already gone is not an error.
    pub async fn delete(&self, owner: &str, id: &str) -> Result<(), StoreError> {
        match self {
            TaskStore::Local(store) => store.delete(owner, id),
            TaskStore::Remote(store) => store.delete(owner, id).await,
            TaskStore::Memory(store) => store.delete(owner, id),
        }
    }

    /// Removes every task for `owner` in one batch.
    pub async fn clear(&self, owner: &str) -> Result<(), StoreError> {
        match self {
            TaskStore::Local(store) => store.clear(owner),
            TaskStore::Remote(store) => store.clear(owner).await,
            TaskStore::Memory(store) => store.clear(owner),
        }
    }
}

/// File-backed store for the local pseudo-owner: the whole task array lives
/// in one `data.json` blob. It refuses any other owner so a signed-in
/// collection can never be read through it by mistake.
pub struct LocalStore {
    storage: Storage,
}

impl LocalStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    fn check_owner(owner: &str) -> Result<(), StoreError> {
        if owner == LOCAL_OWNER_ID {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!(
                "local store only serves the '{LOCAL_OWNER_ID}' owner, got '{owner}'"
            )))
        }
    }

    fn load(&self) -> Result<Vec<Task>, StoreError> {
        match self.storage.load_tasks() {
            Ok(file) => Ok(file.tasks),
            // First run: no blob yet.
            Err(StorageError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                Ok(Vec::new())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, tasks: Vec<Task>) -> Result<(), StoreError> {
        self.storage.ensure_dirs()?;
        self.storage.save_tasks(&TasksFile {
            schema_version: SCHEMA_VERSION,
            tasks,
        })?;
        Ok(())
    }

    fn list(&self, owner: &str) -> Result<Vec<Task>, StoreError> {
        Self::check_owner(owner)?;
        let mut tasks = self.load()?;
        tasks.sort_by_key(|task| task.created_at.unwrap_or(i64::MAX));
        Ok(tasks)
    }

    fn create(&self, owner: &str, text: &str) -> Result<Task, StoreError> {
        Self::check_owner(owner)?;
        let task = Task {
            id: new_task_id(),
            text: text.to_string(),
            completed: false,
            created_at: Some(Utc::now().timestamp_millis()),
        };
        let mut tasks = self.load()?;
        tasks.push(task.clone());
        self.save(tasks)?;
        Ok(task)
    }

    fn set_completed(&self, owner: &str, id: &str, completed: bool) -> Result<(), StoreError> {
        Self::check_owner(owner)?;
        let mut tasks = self.load()?;
        let task = tasks
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        task.completed = completed;
        self.save(tasks)
    }

    fn delete(&self, owner: &str, id: &str) -> Result<(), StoreError> {
        Self::check_owner(owner)?;
        let mut tasks = self.load()?;
        tasks.retain(|task| task.id != id);
        self.save(tasks)
    }

    fn clear(&self, owner: &str) -> Result<(), StoreError> {
        Self::check_owner(owner)?;
        // One atomic blob rewrite; all-or-nothing by construction.
        self.save(Vec::new())
    }
}

/// In-process store with no persistence: backs `--ephemeral` runs and the
/// controller tests, which also use the failure switch to exercise the
/// store-error paths.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    owners: HashMap<String, Vec<Task>>,
    failing: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every operation fails with `StoreError::Unavailable`.
    pub fn set_failing(&self, failing: bool) {
        let mut guard = self.inner.lock().expect("store poisoned");
        guard.failing = failing;
    }

    /// Snapshot of the persisted records for one owner.
    pub fn tasks_for(&self, owner: &str) -> Vec<Task> {
        let guard = self.inner.lock().expect("store poisoned");
        guard.owners.get(owner).cloned().unwrap_or_default()
    }

    fn check_available(guard: &MemoryInner) -> Result<(), StoreError> {
        if guard.failing {
            Err(StoreError::Unavailable("injected failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn list(&self, owner: &str) -> Result<Vec<Task>, StoreError> {
        let guard = self.inner.lock().expect("store poisoned");
        Self::check_available(&guard)?;
        let mut tasks = guard.owners.get(owner).cloned().unwrap_or_default();
        tasks.sort_by_key(|task| task.created_at.unwrap_or(i64::MAX));
        Ok(tasks)
    }

    fn create(&self, owner: &str, text: &str) -> Result<Task, StoreError> {
        let mut guard = self.inner.lock().expect("store poisoned");
        Self::check_available(&guard)?;
        let task = Task {
            id: new_task_id(),
            text: text.to_string(),
            completed: false,
            created_at: Some(Utc::now().timestamp_millis()),
        };
        guard
            .owners
            .entry(owner.to_string())
            .or_default()
            .push(task.clone());
        Ok(task)
    }

    fn set_completed(&self, owner: &str, id: &str, completed: bool) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().expect("store poisoned");
        Self::check_available(&guard)?;
        let task = guard
            .owners
            .get_mut(owner)
            .and_then(|tasks| tasks.iter_mut().find(|task| task.id == id))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        task.completed = completed;
        Ok(())
    }

    fn delete(&self, owner: &str, id: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().expect("store poisoned");
        Self::check_available(&guard)?;
        if let Some(tasks) = guard.owners.get_mut(owner) {
            tasks.retain(|task| task.id != id);
        }
        Ok(())
    }

    fn clear(&self, owner: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().expect("store poisoned");
        Self::check_available(&guard)?;
        guard.owners.remove(owner);
        Ok(())
    }
}
