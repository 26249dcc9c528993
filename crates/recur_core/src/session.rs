//! Session context: owns the list identity, the task store and the scheduler
//! for one run of the client, and turns user intents into store operations.

use crate::config::Config;
use crate::error::AppError;
use crate::interval::describe_interval;
use crate::list_identity::{self, EntryPoint, ListIdentity, NamePrompt};
use crate::model::{NewTask, Task};
use crate::remote::RemoteTasks;
use crate::scheduler::{Scheduler, TickReport};
use crate::task_store::TaskStore;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, warn};

/// Passive sync indicator shown by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Failed(String),
}

/// A user action, produced by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    AddTask(NewTask),
    CompleteTask(String),
    ReopenTask(String),
    DeleteTask(String),
    SwitchList(String),
    NewList,
    ForgetList(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Added(Task),
    Updated(Task),
    Removed(Task),
    /// The intent referenced a task that is not loaded.
    Unchanged,
    /// The active list changed; call [`Session::reload`].
    Reload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskLine {
    pub id: String,
    pub description: String,
    pub every: Option<String>,
}

impl TaskLine {
    fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            description: task.description.clone(),
            every: task.recurrence.as_deref().map(describe_interval),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskView {
    pub list_name: Option<String>,
    pub pending: Vec<TaskLine>,
    pub completed: Vec<TaskLine>,
}

pub struct Session {
    identity: ListIdentity,
    store: TaskStore,
    scheduler: Scheduler,
    sync: SyncState,
}

impl Session {
    pub fn new(identity: ListIdentity, store: TaskStore, scheduler: Scheduler) -> Self {
        Self {
            identity,
            store,
            scheduler,
            sync: SyncState::Idle,
        }
    }

    pub fn from_config(
        config: &Config,
        identity: ListIdentity,
        remote: Box<dyn RemoteTasks>,
    ) -> Self {
        let store = TaskStore::new(remote)
            .with_page_size(config.page_size)
            .with_remote_timeout(config.remote_timeout());
        Self::new(identity, store, Scheduler::new(config.tick_interval()))
    }

    pub fn identity(&self) -> &ListIdentity {
        &self.identity
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn sync_state(&self) -> &SyncState {
        &self.sync
    }

    /// Adopts a shared link if there is one, resolves the active list and
    /// loads its tasks. Returns the list name.
    pub async fn start(
        &mut self,
        entry: &mut EntryPoint,
        prompt: &mut dyn NamePrompt,
    ) -> Result<String, AppError> {
        self.identity.adopt_shared_list_name(entry)?;
        self.reload(prompt).await
    }

    /// Resolves the active list and loads it. When the load fails the
    /// previously loaded list stays active.
    pub async fn reload(&mut self, prompt: &mut dyn NamePrompt) -> Result<String, AppError> {
        let list_name = self.identity.resolve_active_list_name(prompt).await?;
        let result = self.store.load(&list_name).await.map(|_| ());
        if let Err(err) = self.settle(result) {
            self.restore_loaded_list(&list_name);
            return Err(err);
        }
        info!(list = %list_name, count = self.store.tasks().len(), "list loaded");
        Ok(list_name)
    }

    pub async fn dispatch(
        &mut self,
        intent: Intent,
        now: OffsetDateTime,
    ) -> Result<Outcome, AppError> {
        match intent {
            Intent::AddTask(new_task) => {
                let result = self.store.add(new_task).await;
                self.settle(result).map(Outcome::Added)
            }
            Intent::CompleteTask(id) => self.set_done(&id, true, now).await,
            Intent::ReopenTask(id) => self.set_done(&id, false, now).await,
            Intent::DeleteTask(id) => {
                let result = self.store.remove(&id).await;
                Ok(self
                    .settle(result)?
                    .map_or(Outcome::Unchanged, Outcome::Removed))
            }
            Intent::SwitchList(name) => {
                let name = self.identity.switch_to(&name)?;
                info!(list = %name, "switching list");
                Ok(Outcome::Reload)
            }
            Intent::NewList => {
                self.identity.clear_active()?;
                Ok(Outcome::Reload)
            }
            Intent::ForgetList(name) => {
                let loaded = self.store.list_name().map(str::to_string);
                let forgotten = self.identity.forget_visited(&name)?;
                let active_changed = self.identity.active_list_name() != loaded.as_deref();
                if forgotten && active_changed {
                    Ok(Outcome::Reload)
                } else {
                    Ok(Outcome::Unchanged)
                }
            }
        }
    }

    /// Runs one scheduler pass against the loaded list.
    pub async fn tick(&mut self, now: OffsetDateTime) -> TickReport {
        let report = self.scheduler.tick(&mut self.store, now).await;
        if let Some(failure) = report.failures.first() {
            self.sync = SyncState::Failed(failure.error.to_string());
        } else if !report.reopened.is_empty() {
            self.sync = SyncState::Idle;
        }
        report
    }

    /// Pending and completed tasks in store order.
    pub fn view(&self) -> TaskView {
        TaskView {
            list_name: self.store.list_name().map(str::to_string),
            pending: self.store.pending().map(TaskLine::from_task).collect(),
            completed: self.store.completed().map(TaskLine::from_task).collect(),
        }
    }

    pub fn share_link(&self, public_url: &str) -> Option<String> {
        self.store
            .list_name()
            .map(|name| list_identity::share_link(public_url, name))
    }

    async fn set_done(
        &mut self,
        id: &str,
        done: bool,
        now: OffsetDateTime,
    ) -> Result<Outcome, AppError> {
        let result = self.store.mark_done(id, done, now).await;
        Ok(self
            .settle(result)?
            .map_or(Outcome::Unchanged, Outcome::Updated))
    }

    fn restore_loaded_list(&mut self, failed: &str) {
        let Some(loaded) = self.store.list_name().map(str::to_string) else {
            return;
        };
        if loaded == failed {
            return;
        }

        warn!(failed = %failed, list = %loaded, "list did not load, staying on the loaded list");
        if let Err(err) = self.identity.switch_to(&loaded) {
            warn!(error = %err, "could not restore the active list");
        }
    }

    fn settle<T>(&mut self, result: Result<T, AppError>) -> Result<T, AppError> {
        self.sync = match &result {
            Ok(_) => SyncState::Idle,
            Err(err) => SyncState::Failed(err.to_string()),
        };
        result
    }
}
