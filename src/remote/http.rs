//! HTTP client for the remote task store.
//!
//! Speaks plain JSON against `{base}/api/tasks`:
//! `GET` lists, `POST` creates, `PUT /{id}` updates, `DELETE /{id}` deletes.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use super::{DeleteOutcome, RemoteError, RemoteResult, TaskBackend};
use crate::task::{Task, TaskId, TaskPatch};

/// Task store client over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTaskBackend {
    client: Client,
    base_url: String,
}

impl HttpTaskBackend {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn tasks_url(&self) -> String {
        format!("{}/api/tasks", self.base_url)
    }

    fn task_url(&self, id: &TaskId) -> String {
        format!("{}/{}", self.tasks_url(), urlencoding::encode(id.as_str()))
    }

    fn network_error(e: reqwest::Error) -> RemoteError {
        if e.is_timeout() {
            RemoteError::Network(format!("Request timeout: {}", e))
        } else if e.is_connect() {
            RemoteError::Network(format!("Connection failed: {}", e))
        } else {
            RemoteError::Network(format!("Request failed: {}", e))
        }
    }

    /// Read a successful JSON body or turn the response into an error.
    async fn decode<T: DeserializeOwned>(
        resp: reqwest::Response,
        id: Option<&TaskId>,
    ) -> RemoteResult<T> {
        let status = resp.status();
        let text = resp.text().await.map_err(Self::network_error)?;

        if status == StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(RemoteError::NotFound(id.clone()));
            }
        }
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| RemoteError::Decode(format!("{}, body: {}", e, text)))
    }
}

#[async_trait]
impl TaskBackend for HttpTaskBackend {
    async fn create_task(&self, draft: &TaskPatch) -> RemoteResult<Task> {
        let resp = self
            .client
            .post(self.tasks_url())
            .json(draft)
            .send()
            .await
            .map_err(Self::network_error)?;
        Self::decode(resp, None).await
    }

    async fn list_tasks(&self) -> RemoteResult<Vec<Task>> {
        let resp = self
            .client
            .get(self.tasks_url())
            .send()
            .await
            .map_err(Self::network_error)?;
        Self::decode(resp, None).await
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> RemoteResult<Task> {
        let resp = self
            .client
            .put(self.task_url(id))
            .json(patch)
            .send()
            .await
            .map_err(Self::network_error)?;
        Self::decode(resp, Some(id)).await
    }

    async fn delete_task(&self, id: &TaskId) -> RemoteResult<DeleteOutcome> {
        let resp = self
            .client
            .delete(self.task_url(id))
            .send()
            .await
            .map_err(Self::network_error)?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(DeleteOutcome::NotFound);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(DeleteOutcome::Deleted)
    }
}
