use crate::error::AppError;
use crate::model::{NewTask, Task, datetime_to_millis};
use crate::remote::RemoteTasks;
use std::future::Future;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

pub const DEFAULT_PAGE_SIZE: u32 = 200;
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// In-memory mirror of the active list's tasks.
///
/// Every mutation is written through to the remote collection; when the
/// remote call fails the in-memory record is left as it was before the call.
pub struct TaskStore {
    remote: Box<dyn RemoteTasks>,
    list_name: Option<String>,
    tasks: Vec<Task>,
    page_size: u32,
    remote_timeout: Duration,
}

impl TaskStore {
    pub fn new(remote: Box<dyn RemoteTasks>) -> Self {
        Self {
            remote,
            list_name: None,
            tasks: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_remote_timeout(mut self, remote_timeout: Duration) -> Self {
        self.remote_timeout = remote_timeout;
        self
    }

    pub fn list_name(&self) -> Option<&str> {
        self.list_name.as_deref()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn pending(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|task| !task.done)
    }

    pub fn completed(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|task| task.done)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Replaces the in-memory set with the remote records for `list_name`.
    pub async fn load(&mut self, list_name: &str) -> Result<&[Task], AppError> {
        let page_size = self.page_size;
        let tasks = self
            .with_timeout("load", self.remote.list(list_name, page_size))
            .await?;

        debug!(list = list_name, count = tasks.len(), "loaded tasks");
        self.list_name = Some(list_name.to_string());
        self.tasks = tasks;
        Ok(&self.tasks)
    }

    pub async fn add(&mut self, new_task: NewTask) -> Result<Task, AppError> {
        let list_name = self
            .list_name
            .clone()
            .ok_or_else(|| AppError::invalid_input("no list is loaded"))?;

        let draft = new_task.into_draft(&list_name);
        let created = self.with_timeout("add", self.remote.create(&draft)).await?;

        info!(id = %created.id, list = %list_name, "added task");
        self.tasks.push(created.clone());
        Ok(created)
    }

    /// Moves a task between the pending and completed views. Completing a
    /// task stamps `last_completed_at`; reopening leaves it untouched.
    ///
    /// Returns `Ok(None)` when no task has this id.
    pub async fn mark_done(
        &mut self,
        id: &str,
        is_done: bool,
        now: OffsetDateTime,
    ) -> Result<Option<Task>, AppError> {
        let Some(index) = self.position(id) else {
            debug!(id, "mark_done on unknown task ignored");
            return Ok(None);
        };

        let previous = self.tasks[index].clone();
        let mut updated = previous.clone();
        updated.done = is_done;
        if is_done {
            updated.last_completed_at = Some(datetime_to_millis(now));
        }
        self.tasks[index] = updated.clone();

        let result = self
            .with_timeout("update", self.remote.update(&updated))
            .await;
        match result {
            Ok(_) => {
                info!(id, done = is_done, "task updated");
                Ok(Some(updated))
            }
            Err(err) => {
                self.tasks[index] = previous;
                Err(err)
            }
        }
    }

    /// Returns `Ok(None)` when no task has this id.
    pub async fn remove(&mut self, id: &str) -> Result<Option<Task>, AppError> {
        if self.position(id).is_none() {
            debug!(id, "remove on unknown task ignored");
            return Ok(None);
        }

        self.with_timeout("delete", self.remote.delete(id)).await?;

        let removed = self.position(id).map(|index| self.tasks.remove(index));
        info!(id, "task removed");
        Ok(removed)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    async fn with_timeout<T, F>(&self, action: &str, call: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        match tokio::time::timeout(self.remote_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                warn!(action, error = %err, "remote call failed");
                Err(err)
            }
            Err(_) => {
                warn!(action, timeout = ?self.remote_timeout, "remote call timed out");
                Err(AppError::remote_unavailable(format!(
                    "{action} timed out after {:?}",
                    self.remote_timeout
                )))
            }
        }
    }
}
