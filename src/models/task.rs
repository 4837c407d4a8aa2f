use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Title given to a task created without one.
pub const PLACEHOLDER_TITLE: &str = "tasktitle";
/// Description given to a task created without one.
pub const PLACEHOLDER_DESCRIPTION: &str = "taskdescription";

/// Represents the status of a task.
///
/// Stored as a `SMALLINT` and exchanged over JSON as the same integer:
/// pending is `-1`, in-progress is `1` and completed is `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(try_from = "i16", into = "i16")]
#[repr(i16)]
pub enum TaskStatus {
    /// Task is yet to be started.
    Pending = -1,
    /// Task is completed.
    Completed = 0,
    /// Task is currently being worked on.
    InProgress = 1,
}

impl TryFrom<i16> for TaskStatus {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(TaskStatus::Pending),
            0 => Ok(TaskStatus::Completed),
            1 => Ok(TaskStatus::InProgress),
            other => Err(format!(
                "invalid task status {} (expected -1 pending, 1 in-progress or 0 completed)",
                other
            )),
        }
    }
}

impl From<TaskStatus> for i16 {
    fn from(status: TaskStatus) -> i16 {
        status as i16
    }
}

/// Represents a task entity as stored in the database and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Unique identifier for the task.
    pub id: i64,
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    /// Identifier of the user who owns the task.
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a task, used by the single create endpoint and for
/// every element of a batch import.
///
/// Absent fields fall back to placeholders; the owner falls back to the
/// authenticated caller.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct TaskInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    pub status: Option<TaskStatus>,

    pub owner_id: Option<i64>,
}

impl TaskInput {
    pub fn into_new_task(self, default_owner: i64) -> NewTask {
        NewTask {
            title: self.title.unwrap_or_else(|| PLACEHOLDER_TITLE.to_string()),
            description: self
                .description
                .unwrap_or_else(|| PLACEHOLDER_DESCRIPTION.to_string()),
            status: self.status.unwrap_or(TaskStatus::Pending),
            owner_id: self.owner_id.unwrap_or(default_owner),
        }
    }
}

/// A task ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub owner_id: i64,
}

/// Partial update of a task.
///
/// A field that is present overwrites the stored value, even when it is a
/// "zero" value such as `""` or status `0`. A field that is absent (or `null`)
/// leaves the stored value untouched.
#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct TaskPatch {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    pub status: Option<TaskStatus>,

    pub owner_id: Option<i64>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.owner_id.is_none()
    }

    /// Applies the present fields onto `task`, leaving the rest alone.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(owner_id) = self.owner_id {
            task.owner_id = owner_id;
        }
    }
}

/// Body of a batch import: either a bare JSON array or `{"tasks": [...]}`.
///
/// Elements are kept as raw JSON so a single malformed element is reported
/// against its index instead of rejecting the whole batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum TaskBatch {
    Wrapped { tasks: Vec<serde_json::Value> },
    Bare(Vec<serde_json::Value>),
}

impl TaskBatch {
    pub fn into_items(self) -> Vec<serde_json::Value> {
        match self {
            TaskBatch::Wrapped { tasks } => tasks,
            TaskBatch::Bare(tasks) => tasks,
        }
    }
}
