use crate::error::AppError;
use crate::model::{Task, TaskDraft};
use crate::remote::RemoteTasks;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Client for a PocketBase records collection.
#[derive(Debug, Clone)]
pub struct PocketBaseRemote {
    client: reqwest::Client,
    records_url: String,
}

#[derive(Debug, Deserialize)]
struct RecordPage {
    items: Vec<Task>,
}

impl PocketBaseRemote {
    pub fn new(base_url: &str, collection: &str, timeout: Duration) -> Result<Self, AppError> {
        let collection = collection.trim();
        if collection.is_empty() {
            return Err(AppError::invalid_input("collection name is required"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::invalid_data(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            records_url: format!(
                "{}/api/collections/{}/records",
                base_url.trim_end_matches('/'),
                urlencoding::encode(collection)
            ),
        })
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}/{}", self.records_url, urlencoding::encode(id))
    }
}

/// Filter expression selecting one list; the name is quoted as a string literal.
fn list_filter(list_name: &str) -> String {
    let escaped = list_name.replace('\\', "\\\\").replace('"', "\\\"");
    format!("name=\"{escaped}\"")
}

async fn checked(response: reqwest::Response, action: &str) -> Result<reqwest::Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(AppError::remote_unavailable(format!(
        "{action} failed with status {status}: {}",
        body.trim()
    )))
}

#[async_trait]
impl RemoteTasks for PocketBaseRemote {
    async fn list(&self, list_name: &str, page_size: u32) -> Result<Vec<Task>, AppError> {
        debug!(list = list_name, page_size, "fetching records");
        let per_page = page_size.to_string();
        let filter = list_filter(list_name);
        let response = self
            .client
            .get(&self.records_url)
            .query(&[
                ("page", "1"),
                ("perPage", per_page.as_str()),
                ("skipTotal", "1"),
                ("filter", filter.as_str()),
            ])
            .send()
            .await?;

        let page: RecordPage = checked(response, "list").await?.json().await?;
        Ok(page.items)
    }

    async fn create(&self, draft: &TaskDraft) -> Result<Task, AppError> {
        debug!(list = %draft.list_name, "creating record");
        let response = self.client.post(&self.records_url).json(draft).send().await?;
        Ok(checked(response, "create").await?.json().await?)
    }

    async fn update(&self, task: &Task) -> Result<Task, AppError> {
        debug!(id = %task.id, done = task.done, "updating record");
        let response = self
            .client
            .patch(self.record_url(&task.id))
            .json(task)
            .send()
            .await?;
        Ok(checked(response, "update").await?.json().await?)
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        debug!(id, "deleting record");
        let response = self.client.delete(self.record_url(id)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        checked(response, "delete").await?;
        Ok(())
    }
}
