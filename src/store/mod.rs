//! Durable storage for users and tasks.
//!
//! Handlers only see the [`Store`] trait. [`PgStore`] is the production
//! implementation; [`MemoryStore`] keeps the same semantics in process and
//! backs the test suite and `STORAGE=memory` runs.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

use crate::error::AppError;
use crate::models::{NewTask, NewUser, Task, TaskPatch, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage operations for users and tasks.
///
/// Implementations report a duplicate username as `AppError::Conflict` and a
/// task whose owner does not exist as `AppError::BadRequest`. Absent records
/// are `Ok(None)` / `Ok(false)`, never errors.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;

    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    async fn create_task(&self, task: NewTask) -> Result<Task, AppError>;

    async fn list_tasks(&self) -> Result<Vec<Task>, AppError>;

    async fn find_task(&self, id: i64) -> Result<Option<Task>, AppError>;

    /// Applies the present fields of `patch` and bumps `updated_at`.
    /// Returns `None` when no task has this id.
    async fn update_task(&self, id: i64, patch: TaskPatch) -> Result<Option<Task>, AppError>;

    /// Returns `true` when a task was removed.
    async fn delete_task(&self, id: i64) -> Result<bool, AppError>;

    async fn ping(&self) -> Result<(), AppError>;
}

/// Runs a store operation, failing with `ServiceUnavailable` once `limit` elapses.
pub async fn with_deadline<T, F>(limit: Duration, operation: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(AppError::ServiceUnavailable(
            "Storage operation timed out".into(),
        )),
    }
}
