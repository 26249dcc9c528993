use crate::error::AppError;
use crate::model::{Task, TaskDraft};
use crate::remote::RemoteTasks;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// In-process task collection. Clones share the same records, so a caller
/// can keep a handle to inspect what a store wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    records: Mutex<Vec<Task>>,
    next_id: AtomicU64,
    unavailable: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Task>) -> Self {
        let remote = Self::new();
        *remote.lock() = records;
        remote
    }

    /// Makes every subsequent call fail with `RemoteUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delays every subsequent call.
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut guard) = self.inner.latency.lock() {
            *guard = latency;
        }
    }

    pub fn records(&self) -> Vec<Task> {
        self.lock().clone()
    }

    pub fn record(&self, id: &str) -> Option<Task> {
        self.lock().iter().find(|task| task.id == id).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Task>> {
        self.inner
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn simulate_network(&self) -> Result<(), AppError> {
        let latency = self.inner.latency.lock().ok().and_then(|guard| *guard);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::remote_unavailable("collection is unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteTasks for MemoryRemote {
    async fn list(&self, list_name: &str, page_size: u32) -> Result<Vec<Task>, AppError> {
        self.simulate_network().await?;
        Ok(self
            .lock()
            .iter()
            .filter(|task| task.list_name == list_name)
            .take(page_size as usize)
            .cloned()
            .collect())
    }

    async fn create(&self, draft: &TaskDraft) -> Result<Task, AppError> {
        self.simulate_network().await?;
        let sequence = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let task = Task {
            id: format!("mem{sequence:012}"),
            list_name: draft.list_name.clone(),
            description: draft.description.clone(),
            done: draft.done,
            recurrence: draft.recurrence.clone(),
            last_completed_at: None,
        };
        self.lock().push(task.clone());
        Ok(task)
    }

    async fn update(&self, task: &Task) -> Result<Task, AppError> {
        self.simulate_network().await?;
        let mut records = self.lock();
        let existing = records
            .iter_mut()
            .find(|record| record.id == task.id)
            .ok_or_else(|| AppError::remote_unavailable(format!("record {} not found", task.id)))?;
        *existing = task.clone();
        Ok(task.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.simulate_network().await?;
        self.lock().retain(|record| record.id != id);
        Ok(())
    }
}
