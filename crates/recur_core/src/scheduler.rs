use crate::error::AppError;
use crate::interval::parse_interval;
use crate::model::Task;
use crate::task_store::TaskStore;
use std::collections::HashSet;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

/// What one pass over the completed tasks did.
#[derive(Debug, Default)]
pub struct TickReport {
    pub reopened: Vec<Task>,
    pub failures: Vec<TickFailure>,
    pub malformed: Vec<MalformedRecurrence>,
}

impl TickReport {
    pub fn is_quiet(&self) -> bool {
        self.reopened.is_empty() && self.failures.is_empty() && self.malformed.is_empty()
    }
}

#[derive(Debug)]
pub struct TickFailure {
    pub task_id: String,
    pub error: AppError,
}

#[derive(Debug)]
pub struct MalformedRecurrence {
    pub task_id: String,
    pub token: String,
    pub error: AppError,
}

/// Reopens completed recurring tasks once their interval has elapsed.
#[derive(Debug)]
pub struct Scheduler {
    tick_interval: Duration,
    warned: HashSet<(String, String)>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_INTERVAL)
    }
}

/// When a completed task becomes due again, or `None` if it never does.
pub fn due_at(task: &Task) -> Result<Option<OffsetDateTime>, AppError> {
    let (Some(token), Some(completed_at)) = (task.recurrence.as_deref(), task.last_completed_time())
    else {
        return Ok(None);
    };

    let interval = parse_interval(token)?;
    Ok(completed_at.checked_add(interval))
}

impl Scheduler {
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            tick_interval: tick_interval.max(Duration::from_millis(1)),
            warned: HashSet::new(),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Timer for the periodic loop. A tick that overruns pushes the next one
    /// back instead of bursting to catch up.
    pub fn ticker(&self) -> Interval {
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }

    /// One pass over the completed view. Per-task failures are collected in
    /// the report and never abort the pass.
    pub async fn tick(&mut self, store: &mut TaskStore, now: OffsetDateTime) -> TickReport {
        let mut report = TickReport::default();
        let mut due = Vec::new();

        for task in store.completed() {
            match due_at(task) {
                Ok(Some(at)) if now >= at => due.push(task.id.clone()),
                Ok(_) => {}
                Err(error) => {
                    let token = task.recurrence.clone().unwrap_or_default();
                    self.note_malformed(&task.id, &token, &error);
                    report.malformed.push(MalformedRecurrence {
                        task_id: task.id.clone(),
                        token,
                        error,
                    });
                }
            }
        }

        for id in due {
            match store.mark_done(&id, false, now).await {
                Ok(Some(task)) => {
                    info!(id = %task.id, "recurring task is due again");
                    report.reopened.push(task);
                }
                Ok(None) => debug!(id = %id, "due task vanished before reopening"),
                Err(error) => {
                    warn!(id = %id, error = %error, "failed to reopen due task");
                    report.failures.push(TickFailure { task_id: id, error });
                }
            }
        }

        report
    }

    fn note_malformed(&mut self, task_id: &str, token: &str, error: &AppError) {
        if self.warned.insert((task_id.to_string(), token.to_string())) {
            warn!(id = task_id, token, error = %error, "ignoring malformed recurrence");
        } else {
            debug!(id = task_id, token, "malformed recurrence still present");
        }
    }
}
