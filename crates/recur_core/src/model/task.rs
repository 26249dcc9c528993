use crate::error::AppError;
use crate::interval;
use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

/// A task record as stored in the remote collection.
///
/// Field names on the wire follow the collection schema (`task`, `every`,
/// `lastTime`, `name`); the Rust names describe what they hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(rename = "name")]
    pub list_name: String,
    #[serde(rename = "task")]
    pub description: String,
    #[serde(default)]
    pub done: bool,
    #[serde(
        rename = "every",
        default,
        deserialize_with = "empty_string_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub recurrence: Option<String>,
    /// Unix milliseconds of the most recent completion.
    #[serde(
        rename = "lastTime",
        default,
        deserialize_with = "unset_timestamp_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_completed_at: Option<i64>,
}

impl Task {
    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    pub fn last_completed_time(&self) -> Option<OffsetDateTime> {
        self.last_completed_at.and_then(millis_to_datetime)
    }
}

/// Fields a user supplies when adding a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub description: String,
    pub recurrence: Option<String>,
}

impl NewTask {
    /// Validates and normalizes user input. A blank recurrence means a
    /// one-time task; a non-blank one must be a well-formed interval token.
    pub fn new(description: &str, recurrence: Option<&str>) -> Result<Self, AppError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(AppError::invalid_input("description is required"));
        }

        let recurrence = match recurrence.map(str::trim) {
            Some(token) if !token.is_empty() => {
                interval::parse_interval(token)?;
                Some(token.to_ascii_lowercase())
            }
            _ => None,
        };

        Ok(Self {
            description: description.to_string(),
            recurrence,
        })
    }

    pub fn into_draft(self, list_name: &str) -> TaskDraft {
        TaskDraft {
            list_name: list_name.to_string(),
            description: self.description,
            done: false,
            recurrence: self.recurrence,
        }
    }
}

/// Creation payload sent to the remote collection; the server assigns `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDraft {
    #[serde(rename = "name")]
    pub list_name: String,
    #[serde(rename = "task")]
    pub description: String,
    pub done: bool,
    #[serde(rename = "every", skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<String>,
}

pub fn datetime_to_millis(value: OffsetDateTime) -> i64 {
    (value.unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn millis_to_datetime(millis: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|token| {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

// The collection reports an unset number field as 0, null or "".
fn unset_timestamp_as_none<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let millis = match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float as i64)),
        Some(serde_json::Value::String(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.parse::<i64>().map_err(D::Error::custom)?)
            }
        }
        Some(other) => {
            return Err(D::Error::custom(format!(
                "lastTime must be a number, got {other}"
            )));
        }
    };

    Ok(millis.filter(|value| *value > 0))
}

#[cfg(test)]
mod tests {
    use super::{NewTask, Task, datetime_to_millis, millis_to_datetime};
    use time::macros::datetime;

    #[test]
    fn deserializes_collection_record() {
        let json = serde_json::json!({
            "id": "r1",
            "collectionId": "c1",
            "name": "groceries",
            "task": "buy milk",
            "done": true,
            "every": "7d",
            "lastTime": 1_700_000_000_000_i64
        });

        let task: Task = serde_json::from_value(json).unwrap();

        assert_eq!(task.id, "r1");
        assert_eq!(task.list_name, "groceries");
        assert_eq!(task.description, "buy milk");
        assert!(task.done);
        assert_eq!(task.recurrence.as_deref(), Some("7d"));
        assert_eq!(task.last_completed_at, Some(1_700_000_000_000));
    }

    #[test]
    fn unset_fields_normalize_to_none() {
        for last_time in [
            serde_json::json!(0),
            serde_json::json!(""),
            serde_json::Value::Null,
        ] {
            let json = serde_json::json!({
                "id": "r1",
                "name": "home",
                "task": "water plants",
                "done": false,
                "every": "",
                "lastTime": last_time
            });

            let task: Task = serde_json::from_value(json).unwrap();
            assert_eq!(task.recurrence, None);
            assert_eq!(task.last_completed_at, None);
        }
    }

    #[test]
    fn rejects_non_numeric_last_time() {
        let json = serde_json::json!({
            "id": "r1",
            "name": "home",
            "task": "water plants",
            "lastTime": [1]
        });

        assert!(serde_json::from_value::<Task>(json).is_err());
    }

    #[test]
    fn serializes_wire_field_names() {
        let task = Task {
            id: "r1".to_string(),
            list_name: "home".to_string(),
            description: "sweep".to_string(),
            done: true,
            recurrence: Some("1w".to_string()),
            last_completed_at: Some(42),
        };

        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["name"], "home");
        assert_eq!(value["task"], "sweep");
        assert_eq!(value["every"], "1w");
        assert_eq!(value["lastTime"], 42);
    }

    #[test]
    fn new_task_validates_input() {
        let task = NewTask::new("  pay rent ", Some(" 4W ")).unwrap();
        assert_eq!(task.description, "pay rent");
        assert_eq!(task.recurrence.as_deref(), Some("4w"));

        let once = NewTask::new("call mom", Some("  ")).unwrap();
        assert_eq!(once.recurrence, None);

        assert_eq!(NewTask::new("   ", None).unwrap_err().code(), "invalid_input");
        assert_eq!(
            NewTask::new("stretch", Some("5x")).unwrap_err().code(),
            "parse_error"
        );
    }

    #[test]
    fn millis_conversion_matches_datetime() {
        let at = datetime!(2025-12-20 08:30:00.250 UTC);
        let millis = datetime_to_millis(at);
        assert_eq!(millis_to_datetime(millis), Some(at));
    }
}
