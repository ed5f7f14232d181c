use crate::error::ValidationError;
use crate::models::{Priority, Task, TaskDraft, DEFAULT_CATEGORY};
use chrono::{Duration, NaiveDate, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, PartialEq)]
pub struct ParsedTask {
    pub title: String,
    pub priority: Priority,
    pub due_date: NaiveDate,
    pub due_time: Option<NaiveTime>,
    pub category: String,
}

impl ParsedTask {
    pub fn into_draft(self, description: &str) -> Result<TaskDraft, ValidationError> {
        if self.title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(TaskDraft {
            title: self.title,
            description: description.trim().to_string(),
            due_date: self.due_date,
            due_time: self.due_time,
            priority: self.priority,
            category: self.category,
        })
    }
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?ix)
            ^(?:
                !(?P<priority>[a-z0-9]+)
              | \^(?P<date>[0-9a-z-]+)
              | \#(?P<category>\S+)
              | (?P<time>[0-2]?[0-9]:[0-5][0-9])
            )$",
        )
        .unwrap()
    })
}

fn parse_priority(raw: &str) -> Option<Priority> {
    match raw.to_lowercase().as_str() {
        "1" | "low" => Some(Priority::Low),
        "2" | "medium" => Some(Priority::Medium),
        "3" | "high" => Some(Priority::High),
        _ => None,
    }
}

fn parse_due(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    match raw.to_lowercase().as_str() {
        "today" => Some(today),
        "tomorrow" => Some(today + Duration::days(1)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d").ok(),
    }
}

/// Quick-add syntax: `!high` / `!1..!3` priority, `^2026-11-01`,
/// `^today` or `^tomorrow` due date, `09:30` due time, `#Work` category.
/// Everything else is the title. The first valid marker of each kind wins,
/// invalid markers are dropped.
pub fn parse_task_input(input: &str, today: NaiveDate) -> ParsedTask {
    let mut priority = None;
    let mut due_date = None;
    let mut due_time = None;
    let mut category = None;

    let mut title_words = Vec::new();
    for word in input.split_whitespace() {
        let Some(caps) = token_re().captures(word) else {
            title_words.push(word);
            continue;
        };
        if let Some(p) = caps.name("priority") {
            if priority.is_none() {
                priority = parse_priority(p.as_str());
            }
        } else if let Some(d) = caps.name("date") {
            if due_date.is_none() {
                due_date = parse_due(d.as_str(), today);
            }
        } else if let Some(c) = caps.name("category") {
            if category.is_none() {
                category = Some(c.as_str().to_string());
            }
        } else if let Some(t) = caps.name("time") {
            if due_time.is_none() {
                due_time = NaiveTime::parse_from_str(t.as_str(), "%H:%M").ok();
            }
        }
    }

    ParsedTask {
        title: title_words.join(" "),
        priority: priority.unwrap_or(Priority::Medium),
        due_date: due_date.unwrap_or(today),
        due_time,
        category: category.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
    }
}

/// Quick-add line that parses back to the task's title, priority, date,
/// time and category. Used to prefill the edit form.
pub fn format_task_input(task: &Task) -> String {
    let mut parts = vec![
        task.title.clone(),
        format!("!{}", task.priority.as_str().to_lowercase()),
        format!("^{}", task.due_date.format("%Y-%m-%d")),
    ];
    if let Some(time) = task.due_time {
        parts.push(time.format("%H:%M").to_string());
    }
    if let Some(category) = &task.category {
        parts.push(format!("#{}", category));
    }
    parts.join(" ")
}
