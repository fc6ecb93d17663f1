use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{SessionFile, SettingsFile, TasksFile};

const DATA_FILE: &str = "data.json";
const SETTINGS_FILE: &str = "settings.json";
const SESSION_FILE: &str = "session.json";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::Json(err) => write!(f, "json error: {err}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        StorageError::Io(value)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(value: serde_json::Error) -> Self {
        StorageError::Json(value)
    }
}

/// JSON persistence under the data directory: the local pseudo-owner's task
/// blob (`data.json`), user settings, and the current auth session.
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn load_tasks(&self) -> Result<TasksFile, StorageError> {
        self.load_json(self.root.join(DATA_FILE))
    }

    pub fn load_settings(&self) -> Result<SettingsFile, StorageError> {
        self.load_json(self.root.join(SETTINGS_FILE))
    }

    pub fn load_session(&self) -> Result<SessionFile, StorageError> {
        self.load_json(self.root.join(SESSION_FILE))
    }

    pub fn save_tasks(&self, data: &TasksFile) -> Result<(), StorageError> {
        self.write_atomic(self.root.join(DATA_FILE), data)
    }

    pub fn save_settings(&self, data: &SettingsFile) -> Result<(), StorageError> {
        self.write_atomic(self.root.join(SETTINGS_FILE), data)
    }

    pub fn save_session(&self, data: &SessionFile) -> Result<(), StorageError> {
        self.write_atomic(self.root.join(SESSION_FILE), data)
    }

    fn load_json<T: DeserializeOwned>(&self, path: PathBuf) -> Result<T, StorageError> {
        let mut file = File::open(path)?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(serde_json::from_str(&buf)?)
    }

    fn write_atomic<T: Serialize>(&self, path: PathBuf, data: &T) -> Result<(), StorageError> {
        let temp_path = path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(data)?;
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Identity, Settings, Task, SCHEMA_VERSION};

    fn storage() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::new(dir.path().to_path_buf());
        storage.ensure_dirs().expect("ensure dirs");
        (dir, storage)
    }

    #[test]
    fn tasks_round_trip_through_data_file() {
        let (_dir, storage) = storage();
        let file = TasksFile {
            schema_version: SCHEMA_VERSION,
            tasks: vec![Task {
                id: "t1".to_string(),
                text: "buy milk".to_string(),
                completed: false,
                created_at: Some(1_700_000_000),
            }],
        };
        storage.save_tasks(&file).expect("save tasks");

        let loaded = storage.load_tasks().expect("load tasks");
        assert_eq!(loaded.schema_version, SCHEMA_VERSION);
        assert_eq!(loaded.tasks, file.tasks);
    }

    #[test]
    fn missing_files_report_io_errors() {
        let (_dir, storage) = storage();
        assert!(matches!(storage.load_tasks(), Err(StorageError::Io(_))));
        assert!(matches!(storage.load_settings(), Err(StorageError::Io(_))));
        assert!(matches!(storage.load_session(), Err(StorageError::Io(_))));
    }

    #[test]
    fn settings_and_session_round_trip() {
        let (_dir, storage) = storage();

        let mut settings = Settings::default();
        settings.theme = "dark".to_string();
        settings.display_name = Some("Sam".to_string());
        storage
            .save_settings(&SettingsFile {
                schema_version: SCHEMA_VERSION,
                settings: settings.clone(),
            })
            .expect("save settings");
        let loaded = storage.load_settings().expect("load settings");
        assert_eq!(loaded.settings, settings);

        storage
            .save_session(&SessionFile {
                schema_version: SCHEMA_VERSION,
                identity: Some(Identity {
                    uid: "uid-1".to_string(),
                    display_name: None,
                }),
            })
            .expect("save session");
        let session = storage.load_session().expect("load session");
        assert_eq!(session.identity.map(|i| i.uid).as_deref(), Some("uid-1"));
    }

    #[test]
    fn write_atomic_replaces_previous_content() {
        let (_dir, storage) = storage();
        let empty = TasksFile {
            schema_version: SCHEMA_VERSION,
            tasks: Vec::new(),
        };
        storage.save_tasks(&empty).expect("save empty");
        let one = TasksFile {
            schema_version: SCHEMA_VERSION,
            tasks: vec![Task {
                id: "t1".to_string(),
                text: "x".to_string(),
                completed: true,
                created_at: None,
            }],
        };
        storage.save_tasks(&one).expect("overwrite");
        let loaded = storage.load_tasks().expect("load");
        assert_eq!(loaded.tasks.len(), 1);
        // No stray temp file should remain after the rename.
        assert!(!storage.root().join("data.tmp").exists());
    }
}
