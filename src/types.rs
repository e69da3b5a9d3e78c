//! Core types for the task manager.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Lowest (most urgent) priority value.
pub const PRIORITY_MIN: i64 = 1;
/// Highest (least urgent) priority value.
pub const PRIORITY_MAX: i64 = 5;
/// Priority assigned when none is given.
pub const PRIORITY_DEFAULT: i64 = 3;

/// Task priority, always within `PRIORITY_MIN..=PRIORITY_MAX`.
///
/// 1 is the most urgent. The only way to build one is through [`Priority::new`],
/// which clamps out-of-range input, so a stored or returned priority can never
/// fall outside the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "i64")]
pub struct Priority(u8);

impl Priority {
    /// Build a priority, clamping the value into range.
    pub fn new(value: i64) -> Self {
        Self(value.clamp(PRIORITY_MIN, PRIORITY_MAX) as u8)
    }

    pub fn value(self) -> i64 {
        i64::from(self.0)
    }

    /// Short human label shown in the HTML view.
    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Urgent",
            2 => "High",
            3 => "Normal",
            4 => "Low",
            _ => "Someday",
        }
    }

    /// Every priority in ascending order.
    pub fn all() -> impl Iterator<Item = Priority> {
        (PRIORITY_MIN..=PRIORITY_MAX).map(Priority::new)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::new(PRIORITY_DEFAULT)
    }
}

impl From<Priority> for i64 {
    fn from(priority: Priority) -> Self {
        priority.value()
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current time as an RFC 3339 UTC string with millisecond precision.
///
/// The fixed width keeps lexicographic order equal to chronological order.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A single task.
///
/// Serializes to exactly `id, title, description, priority, due_date,
/// completed, created_at, updated_at`; this is the object shape of the JSON API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    /// Assigned by the store on create; `None` until then.
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    /// Free-form date string, not validated.
    pub due_date: Option<String>,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Task {
    /// Create an unsaved task with default fields and both timestamps set to now.
    pub fn new(title: impl Into<String>) -> Self {
        let now = now_timestamp();
        Self {
            id: None,
            title: title.into(),
            description: String::new(),
            priority: Priority::default(),
            due_date: None,
            completed: false,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the priority; out-of-range values are clamped.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Priority::new(priority);
        self
    }

    pub fn with_due_date(mut self, due_date: Option<String>) -> Self {
        self.due_date = due_date;
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Override the timestamps. `None` keeps the current value.
    pub fn with_timestamps(mut self, created_at: Option<String>, updated_at: Option<String>) -> Self {
        if let Some(created_at) = created_at {
            self.created_at = created_at;
        }
        if let Some(updated_at) = updated_at {
            self.updated_at = updated_at;
        }
        self
    }

    /// True if the task is incomplete and its due date is before `today`
    /// (both `YYYY-MM-DD`).
    pub fn is_overdue(&self, today: &str) -> bool {
        !self.completed
            && self
                .due_date
                .as_deref()
                .is_some_and(|due| !due.is_empty() && due < today)
    }

    /// Refresh `updated_at` to now without ever moving it backwards.
    pub fn touch(&mut self) {
        let now = now_timestamp();
        if now > self.updated_at {
            self.updated_at = now;
        }
    }

    /// Apply a sparse update in place. Returns false if the update was empty.
    pub fn apply(&mut self, update: &TaskUpdate) -> bool {
        if update.is_empty() {
            return false;
        }
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(priority) = update.priority {
            self.priority = priority;
        }
        if let Some(due_date) = &update.due_date {
            self.due_date = due_date.clone();
        }
        if let Some(completed) = update.completed {
            self.completed = completed;
        }
        true
    }
}

/// Listing order: incomplete before completed, then priority ascending, then
/// due date ascending with missing due dates last, then id.
pub fn listing_order(a: &Task, b: &Task) -> Ordering {
    a.completed
        .cmp(&b.completed)
        .then(a.priority.cmp(&b.priority))
        .then_with(|| match (&a.due_date, &b.due_date) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then(a.id.cmp(&b.id))
}

/// Sparse update for a task.
///
/// Each field is `None` when not supplied. `due_date` is doubly optional:
/// `Some(None)` clears the due date, `None` leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<String>>,
    pub completed: Option<bool>,
}

impl TaskUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the priority; out-of-range values are clamped.
    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = Some(Priority::new(priority));
        self
    }

    /// Set (`Some`) or clear (`None`) the due date.
    pub fn due_date(mut self, due_date: Option<String>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn completed(mut self, completed: bool) -> Self {
        self.completed = Some(completed);
        self
    }

    /// True if no field is supplied.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.completed.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_is_clamped() {
        assert_eq!(Priority::new(0).value(), 1);
        assert_eq!(Priority::new(-7).value(), 1);
        assert_eq!(Priority::new(99).value(), 5);
        assert_eq!(Priority::new(4).value(), 4);
        assert_eq!(Priority::default().value(), 3);
    }

    #[test]
    fn priority_serializes_as_number() {
        let json = serde_json::to_string(&Priority::new(42)).unwrap();
        assert_eq!(json, "5");
    }

    #[test]
    fn new_task_defaults() {
        let task = Task::new("Buy milk");
        assert_eq!(task.id, None);
        assert_eq!(task.description, "");
        assert_eq!(task.priority.value(), 3);
        assert_eq!(task.due_date, None);
        assert!(!task.completed);
        assert_eq!(task.created_at, task.updated_at);
        assert!(!task.created_at.is_empty());
    }

    #[test]
    fn builder_clamps_priority() {
        assert_eq!(Task::new("a").with_priority(0).priority.value(), 1);
        assert_eq!(Task::new("a").with_priority(99).priority.value(), 5);
    }

    #[test]
    fn serializes_exactly_the_public_fields() {
        let task = Task::new("Write report")
            .with_id(7)
            .with_priority(2)
            .with_due_date(Some("2026-11-01".into()))
            .with_timestamps(Some("t0".into()), Some("t1".into()));
        let value = serde_json::to_value(&task).unwrap();
        let object = value.as_object().unwrap();

        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "completed",
                "created_at",
                "description",
                "due_date",
                "id",
                "priority",
                "title",
                "updated_at"
            ]
        );
        assert_eq!(object["id"], 7);
        assert_eq!(object["priority"], 2);
        assert_eq!(object["due_date"], "2026-11-01");
        assert_eq!(object["completed"], false);
        assert_eq!(object["created_at"], "t0");
        assert_eq!(object["updated_at"], "t1");
    }

    #[test]
    fn unsaved_task_serializes_null_id() {
        let value = serde_json::to_value(Task::new("x")).unwrap();
        assert!(value["id"].is_null());
        assert!(value["due_date"].is_null());
    }

    #[test]
    fn timestamps_are_fixed_width_utc() {
        let ts = now_timestamp();
        assert_eq!(ts.len(), "2026-10-19T08:15:30.125Z".len());
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn listing_order_puts_completed_last_and_undated_after_dated() {
        let mut tasks = vec![
            Task::new("done").with_id(1).with_priority(1).with_completed(true),
            Task::new("undated").with_id(2).with_priority(2),
            Task::new("late").with_id(3).with_priority(2).with_due_date(Some("2026-12-01".into())),
            Task::new("soon").with_id(4).with_priority(2).with_due_date(Some("2026-10-20".into())),
            Task::new("low").with_id(5).with_priority(5),
        ];
        tasks.sort_by(listing_order);
        let titles: Vec<&str> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["soon", "late", "undated", "low", "done"]);
    }

    #[test]
    fn overdue_only_for_incomplete_past_due() {
        let today = "2026-10-19";
        assert!(Task::new("a").with_due_date(Some("2026-10-18".into())).is_overdue(today));
        assert!(!Task::new("a").with_due_date(Some("2026-10-19".into())).is_overdue(today));
        assert!(!Task::new("a").is_overdue(today));
        assert!(
            !Task::new("a")
                .with_due_date(Some("2026-01-01".into()))
                .with_completed(true)
                .is_overdue(today)
        );
    }

    #[test]
    fn update_builder_and_apply() {
        assert!(TaskUpdate::new().is_empty());

        let mut task = Task::new("old").with_due_date(Some("2026-10-30".into()));
        let update = TaskUpdate::new().title("new").priority(0).due_date(None);
        assert!(!update.is_empty());
        assert!(task.apply(&update));
        assert_eq!(task.title, "new");
        assert_eq!(task.priority.value(), 1);
        assert_eq!(task.due_date, None);

        let before = task.clone();
        assert!(!task.apply(&TaskUpdate::new()));
        assert_eq!(task, before);
    }
}
