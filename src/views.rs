//! Derived views over a snapshot of tasks.
//!
//! Every function here takes the whole snapshot by reference and returns a
//! fresh value. Nothing is cached between calls, so the UI can call them on
//! every redraw.

use crate::models::{Priority, Task};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Classification {
    Completed,
    Overdue,
    DueToday,
    Upcoming,
}

impl Classification {
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Completed => "Completed",
            Classification::Overdue => "Overdue",
            Classification::DueToday => "Today",
            Classification::Upcoming => "Upcoming",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Today,
    Upcoming,
    Overdue,
    Completed,
    Active,
    /// Due before today, completed or not.
    Past,
}

impl StatusFilter {
    pub const ALL: [StatusFilter; 7] = [
        StatusFilter::All,
        StatusFilter::Today,
        StatusFilter::Upcoming,
        StatusFilter::Overdue,
        StatusFilter::Completed,
        StatusFilter::Active,
        StatusFilter::Past,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            StatusFilter::All => "All",
            StatusFilter::Today => "Today",
            StatusFilter::Upcoming => "Upcoming",
            StatusFilter::Overdue => "Overdue",
            StatusFilter::Completed => "Completed",
            StatusFilter::Active => "Active",
            StatusFilter::Past => "Past",
        }
    }

    pub fn next(self) -> StatusFilter {
        let i = StatusFilter::ALL.iter().position(|f| *f == self).unwrap_or(0);
        StatusFilter::ALL[(i + 1) % StatusFilter::ALL.len()]
    }

    fn matches(&self, task: &Task, reference: NaiveDateTime) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Past => task.due_date < reference.date(),
            StatusFilter::Today => classify(task, reference) == Classification::DueToday,
            StatusFilter::Upcoming => classify(task, reference) == Classification::Upcoming,
            StatusFilter::Overdue => classify(task, reference) == Classification::Overdue,
            StatusFilter::Completed => classify(task, reference) == Classification::Completed,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct CompletionStats {
    pub total: usize,
    pub completed: usize,
    /// Whole percent, 0 when there are no tasks.
    pub rate: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub completed: usize,
    pub overdue: usize,
    pub due_today: usize,
    pub upcoming: usize,
}

/// Compares calendar days only. A task due today stays `DueToday` after its
/// due time has passed.
pub fn classify(task: &Task, reference: NaiveDateTime) -> Classification {
    let today = reference.date();
    if task.completed {
        Classification::Completed
    } else if task.due_date < today {
        Classification::Overdue
    } else if task.due_date == today {
        Classification::DueToday
    } else {
        Classification::Upcoming
    }
}

pub fn filter_by_status(
    tasks: &[Task],
    filter: StatusFilter,
    reference: NaiveDateTime,
) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| filter.matches(task, reference))
        .cloned()
        .collect()
}

pub fn filter_by_search(tasks: &[Task], query: &str) -> Vec<Task> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return tasks.to_vec();
    }

    tasks
        .iter()
        .filter(|task| {
            task.title.to_lowercase().contains(&query)
                || task.description.to_lowercase().contains(&query)
                || task
                    .category
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase().contains(&query))
        })
        .cloned()
        .collect()
}

pub fn filter_by_priority(tasks: &[Task], priority: Priority) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| task.priority == priority)
        .cloned()
        .collect()
}

/// Groups by ISO due date, keys ascending. Tasks keep their input order
/// inside a group, so sort first if time order matters.
pub fn group_by_due_date(tasks: &[Task]) -> Vec<(String, Vec<Task>)> {
    let mut groups: BTreeMap<_, Vec<Task>> = BTreeMap::new();
    for task in tasks {
        groups.entry(task.due_date).or_default().push(task.clone());
    }

    groups
        .into_iter()
        .map(|(date, tasks)| (date.format("%Y-%m-%d").to_string(), tasks))
        .collect()
}

/// Stable sort by due date, then due time. No time sorts first.
pub fn sort_tasks(tasks: &[Task]) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by_key(|task| (task.due_date, task.due_time));
    sorted
}

pub fn completion_stats(tasks: &[Task]) -> CompletionStats {
    let total = tasks.len();
    let completed = tasks.iter().filter(|task| task.completed).count();
    let rate = if total == 0 {
        0
    } else {
        // round half up
        ((completed * 200 + total) / (total * 2)) as u32
    };

    CompletionStats {
        total,
        completed,
        rate,
    }
}

pub fn status_counts(tasks: &[Task], reference: NaiveDateTime) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for task in tasks {
        match classify(task, reference) {
            Classification::Completed => counts.completed += 1,
            Classification::Overdue => counts.overdue += 1,
            Classification::DueToday => counts.due_today += 1,
            Classification::Upcoming => counts.upcoming += 1,
        }
    }
    counts
}

pub fn toggle_completion(task: &Task) -> Task {
    Task {
        completed: !task.completed,
        ..task.clone()
    }
}
