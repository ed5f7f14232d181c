use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

// Priority levels, capitalised on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    /// Strict parse of the canonical form. Anything else is rejected.
    pub fn from_canonical(value: &str) -> Option<Priority> {
        Priority::ALL.into_iter().find(|p| p.as_str() == value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Task struct, always built through ingest::parse_task
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub due_time: Option<NaiveTime>,
    pub priority: Priority,
    pub completed: bool,
    pub category: Option<String>,
    pub owner_id: Option<String>,
}

// Row as returned by the `tasks` table, nothing trusted yet
#[derive(Clone, Deserialize, Debug, Default)]
pub struct TaskRow {
    pub id: Option<serde_json::Value>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub due_time: Option<String>,
    pub priority: Option<String>,
    pub completed: Option<bool>,
    pub category: Option<String>,
    pub user_id: Option<String>,
}

pub const DEFAULT_CATEGORY: &str = "Personal";

// Fields submitted when creating a task
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    #[serde(with = "wire_time::option")]
    pub due_time: Option<NaiveTime>,
    pub priority: Priority,
    pub category: String,
}

// Partial update, only the set fields are sent
#[derive(Clone, Serialize, Debug, Default, PartialEq)]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "wire_time::double_option"
    )]
    pub due_time: Option<Option<NaiveTime>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl TaskPatch {
    pub fn completed(completed: bool) -> TaskPatch {
        TaskPatch {
            completed: Some(completed),
            ..TaskPatch::default()
        }
    }

    /// Fields of `edit` that differ from `task`.
    pub fn changes(task: &Task, edit: &TaskDraft) -> TaskPatch {
        fn changed<T: PartialEq + Clone>(old: &T, new: &T) -> Option<T> {
            (old != new).then(|| new.clone())
        }
        TaskPatch {
            title: changed(&task.title, &edit.title),
            description: changed(&task.description, &edit.description),
            due_date: changed(&task.due_date, &edit.due_date),
            due_time: changed(&task.due_time, &edit.due_time),
            priority: changed(&task.priority, &edit.priority),
            completed: None,
            category: (task.category.as_deref().unwrap_or(DEFAULT_CATEGORY) != edit.category)
                .then(|| edit.category.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == TaskPatch::default()
    }
}

// FileRecord struct for the `files` table
#[derive(Clone, Deserialize, Serialize, Debug, PartialEq)]
pub struct FileRecord {
    pub id: serde_json::Value,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub path: String,
    pub created_at: Option<String>,
    #[serde(rename = "user_id")]
    pub owner_id: Option<String>,
}

impl FileRecord {
    pub fn id_string(&self) -> String {
        match &self.id {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

// User struct from the auth endpoint
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
}

// Times go out as HH:MM:SS, the column type of `due_time`
mod wire_time {
    use chrono::NaiveTime;

    const FORMAT: &str = "%H:%M:%S";

    pub mod option {
        use super::*;
        use serde::Serializer;

        pub fn serialize<S: Serializer>(
            value: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(t) => serializer.serialize_str(&t.format(FORMAT).to_string()),
                None => serializer.serialize_none(),
            }
        }
    }

    pub mod double_option {
        use super::*;
        use serde::Serializer;

        pub fn serialize<S: Serializer>(
            value: &Option<Option<NaiveTime>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(inner) => option::serialize(inner, serializer),
                None => serializer.serialize_none(),
            }
        }
    }
}
