use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::{SyncSettings, Task, Timestamp};
use crate::store::StoreError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// One persisted task document on the wire. The remote service speaks
/// camelCase JSON, mirroring the hosted document store it fronts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: String,
    pub text: String,
    pub completed: bool,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

impl From<TaskRecord> for Task {
    fn from(record: TaskRecord) -> Self {
        Task {
            id: record.id,
            text: record.text,
            completed: record.completed,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    tasks: Vec<TaskRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest {
    completed: bool,
}

/// Per-owner task collection behind an HTTP/JSON service. Collection paths
/// are scoped by owner uid (`/owners/{uid}/tasks`) so one owner can never
/// address another's records; `clear` maps to the service's atomic batch
/// delete (`tasks:clear`).
pub struct RemoteStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

fn trim_base_url(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}

fn collection_path(base_url: &str, owner: &str) -> String {
    format!("{}/owners/{owner}/tasks", trim_base_url(base_url))
}

fn document_path(base_url: &str, owner: &str, id: &str) -> String {
    format!("{}/{id}", collection_path(base_url, owner))
}

fn clear_path(base_url: &str, owner: &str) -> String {
    format!("{}:clear", collection_path(base_url, owner))
}

impl RemoteStore {
    pub fn new(settings: &SyncSettings) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| StoreError::Request(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }

    async fn read_body(
        response: reqwest::Response,
        not_found_id: Option<&str>,
    ) -> Result<String, StoreError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| StoreError::Request(format!("failed to read response: {err}")))?;
        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(id) = not_found_id {
                return Err(StoreError::NotFound(id.to_string()));
            }
        }
        if !status.is_success() {
            return Err(StoreError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    pub async fn list(&self, owner: &str) -> Result<Vec<Task>, StoreError> {
        let response = self
            .request(
                reqwest::Method::GET,
                collection_path(&self.base_url, owner),
            )
            .send()
            .await
            .map_err(|err| StoreError::Request(format!("list request failed: {err}")))?;
        let body = Self::read_body(response, None).await?;
        let parsed: ListResponse = serde_json::from_str(&body)?;
        let mut tasks: Vec<Task> = parsed.tasks.into_iter().map(Task::from).collect();
        tasks.sort_by_key(|task| task.created_at.unwrap_or(i64::MAX));
        Ok(tasks)
    }

    pub async fn create(&self, owner: &str, text: &str) -> Result<Task, StoreError> {
        let response = self
            .request(
                reqwest::Method::POST,
                collection_path(&self.base_url, owner),
            )
            .json(&CreateRequest { text })
            .send()
            .await
            .map_err(|err| StoreError::Request(format!("create request failed: {err}")))?;
        let body = Self::read_body(response, None).await?;
        let record: TaskRecord = serde_json::from_str(&body)?;
        Ok(record.into())
    }

    pub async fn set_completed(
        &self,
        owner: &str,
        id: &str,
        completed: bool,
    ) -> Result<(), StoreError> {
        let response = self
            .request(
                reqwest::Method::PATCH,
                document_path(&self.base_url, owner, id),
            )
            .json(&UpdateRequest { completed })
            .send()
            .await
            .map_err(|err| StoreError::Request(format!("update request failed: {err}")))?;
        Self::read_body(response, Some(id)).await?;
        Ok(())
    }

    pub async fn delete(&self, owner: &str, id: &str) -> Result<(), StoreError> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                document_path(&self.base_url, owner, id),
            )
            .send()
            .await
            .map_err(|err| StoreError::Request(format!("delete request failed: {err}")))?;
        let status = response.status();
        // Deleting an already-gone document counts as success.
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::read_body(response, None).await?;
        Ok(())
    }

    pub async fn clear(&self, owner: &str) -> Result<(), StoreError> {
        let response = self
            .request(reqwest::Method::POST, clear_path(&self.base_url, owner))
            .send()
            .await
            .map_err(|err| StoreError::Request(format!("clear request failed: {err}")))?;
        Self::read_body(response, None).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_paths_are_owner_scoped() {
        assert_eq!(
            collection_path("https://sync.example/api/", "uid-1"),
            "https://sync.example/api/owners/uid-1/tasks"
        );
        assert_eq!(
            document_path("https://sync.example/api", "uid-1", "t9"),
            "https://sync.example/api/owners/uid-1/tasks/t9"
        );
        assert_eq!(
            clear_path("https://sync.example/api", "uid-1"),
            "https://sync.example/api/owners/uid-1/tasks:clear"
        );
    }

    #[test]
    fn task_record_parses_camel_case_and_tolerates_missing_timestamp() {
        let record: TaskRecord = serde_json::from_str(
            r#"{ "id": "t1", "text": "buy milk", "completed": false, "createdAt": 1700000000000 }"#,
        )
        .expect("record should parse");
        let task: Task = record.into();
        assert_eq!(task.id, "t1");
        assert_eq!(task.created_at, Some(1_700_000_000_000));

        let record: TaskRecord =
            serde_json::from_str(r#"{ "id": "t2", "text": "x", "completed": true }"#)
                .expect("record without createdAt should parse");
        assert_eq!(record.created_at, None);
    }

    #[test]
    fn list_response_parses_task_array() {
        let parsed: ListResponse = serde_json::from_str(
            r#"{ "tasks": [
                 { "id": "b", "text": "second", "completed": false, "createdAt": 2 },
                 { "id": "a", "text": "first", "completed": true, "createdAt": 1 }
               ] }"#,
        )
        .expect("list response should parse");
        assert_eq!(parsed.tasks.len(), 2);
    }

    #[test]
    fn create_and_update_requests_use_camel_case() {
        let body = serde_json::to_string(&CreateRequest { text: "buy milk" }).unwrap();
        assert_eq!(body, r#"{"text":"buy milk"}"#);
        let body = serde_json::to_string(&UpdateRequest { completed: true }).unwrap();
        assert_eq!(body, r#"{"completed":true}"#);
    }
}
