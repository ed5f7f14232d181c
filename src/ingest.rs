use crate::error::ValidationError;
use crate::models::{Priority, Task, TaskRow};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::warn;

/// Result of validating a batch of rows. `tasks` keeps the row order.
#[derive(Debug, Default)]
pub struct Ingested {
    pub tasks: Vec<Task>,
    pub rejected: Vec<(TaskRow, ValidationError)>,
}

pub fn ingest(rows: Vec<TaskRow>) -> Ingested {
    let mut out = Ingested::default();
    for row in rows {
        match parse_task(row.clone()) {
            Ok(task) => out.tasks.push(task),
            Err(err) => {
                warn!(field = err.field(), id = ?row.id, "rejecting task row: {}", err);
                out.rejected.push((row, err));
            }
        }
    }
    out
}

pub fn parse_task(row: TaskRow) -> Result<Task, ValidationError> {
    let id = match row.id {
        Some(serde_json::Value::String(s)) if !s.is_empty() => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => return Err(ValidationError::MissingField("id")),
    };

    let title = row.title.ok_or(ValidationError::MissingField("title"))?;
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }

    let due_date = row.due_date.ok_or(ValidationError::MissingField("due_date"))?;
    let due_date = parse_date(&due_date)?;
    let due_time = match row.due_time.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_time(raw)?),
    };

    let priority = row.priority.ok_or(ValidationError::MissingField("priority"))?;
    let priority = Priority::from_canonical(&priority)
        .ok_or(ValidationError::InvalidPriority { value: priority })?;

    Ok(Task {
        id,
        title,
        description: row.description.unwrap_or_default(),
        due_date,
        due_time,
        priority,
        completed: row.completed.unwrap_or(false),
        category: row.category.filter(|c| !c.trim().is_empty()),
        owner_id: row.user_id,
    })
}

/// Accepts `YYYY-MM-DD` or a full timestamp; a timestamp keeps only its
/// calendar day.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = raw.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed).map(|dt| dt.date_naive()))
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f").map(|dt| dt.date()))
        .map_err(|_| ValidationError::InvalidDate {
            field: "due_date",
            value: raw.to_string(),
        })
}

pub fn parse_time(raw: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| ValidationError::InvalidTime {
            field: "due_time",
            value: raw.to_string(),
        })
}
