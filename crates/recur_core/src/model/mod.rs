mod task;

pub use task::{NewTask, Task, TaskDraft, datetime_to_millis, millis_to_datetime};
