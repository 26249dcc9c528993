//! Access to the hosted task collection, the system of record for tasks.

use crate::error::AppError;
use crate::model::{Task, TaskDraft};
use async_trait::async_trait;

mod memory;
mod pocketbase;

pub use memory::MemoryRemote;
pub use pocketbase::PocketBaseRemote;

/// Document-store operations the task store relies on.
#[async_trait]
pub trait RemoteTasks: Send + Sync {
    /// Records whose `name` field equals `list_name`, at most `page_size` of them.
    async fn list(&self, list_name: &str, page_size: u32) -> Result<Vec<Task>, AppError>;

    /// Creates a record; the server assigns the id.
    async fn create(&self, draft: &TaskDraft) -> Result<Task, AppError>;

    async fn update(&self, task: &Task) -> Result<Task, AppError>;

    /// Deleting a record that no longer exists succeeds.
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}
