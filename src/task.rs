use std::fmt;

use chrono::Local;
use serde::Serialize;
use uuid::Uuid;

pub const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Opaque handle for a task, stable for the lifetime of the process.
///
/// Ids are not written to disk; every load hands out fresh ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task priority, 1 (most urgent) through 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Priority(u8);

impl Priority {
    pub const MIN: Priority = Priority(1);
    pub const MAX: Priority = Priority(5);

    /// Returns `None` outside 1..=5.
    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN.0..=Self::MAX.0)
            .contains(&value)
            .then_some(Self(value))
    }

    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(Self::MIN.0 as i64, Self::MAX.0 as i64) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn raise(self) -> Self {
        Self::clamped(self.0 as i64 + 1)
    }

    pub fn lower(self) -> Self {
        Self::clamped(self.0 as i64 - 1)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Field order here is the key order of the saved file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub title: String,
    pub completed: bool,
    pub priority: Priority,
    pub due_date: String,
    pub created_at: String,
    #[serde(skip)]
    pub id: TaskId,
}

impl Task {
    /// Builds a pending task stamped with the current local time.
    /// Title validation is the caller's job.
    pub fn new(title: impl Into<String>, priority: Priority, due_date: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            completed: false,
            priority,
            due_date: due_date.into(),
            created_at: now_timestamp(),
            id: TaskId::new(),
        }
    }

    pub fn status_glyph(&self) -> &'static str {
        if self.completed {
            "✔"
        } else {
            "✘"
        }
    }

    /// Equality on the persisted fields only.
    pub fn same_record(&self, other: &Task) -> bool {
        self.title == other.title
            && self.completed == other.completed
            && self.priority == other.priority
            && self.due_date == other.due_date
            && self.created_at == other.created_at
    }

    pub(crate) fn sort_key(&self) -> (bool, Priority) {
        (self.completed, self.priority)
    }
}

pub fn now_timestamp() -> String {
    Local::now().format(CREATED_AT_FORMAT).to_string()
}
