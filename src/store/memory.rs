use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::Store;
use crate::error::AppError;
use crate::models::{NewTask, NewUser, Task, TaskPatch, User};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    tasks: BTreeMap<i64, Task>,
    last_user_id: i64,
    last_task_id: i64,
}

impl Tables {
    fn owner_exists(&self, owner_id: i64) -> Result<(), AppError> {
        if self.users.contains_key(&owner_id) {
            Ok(())
        } else {
            Err(AppError::BadRequest("Owner does not exist".into()))
        }
    }
}

/// In-process store with the same constraints as the `users`/`tasks` schema.
///
/// Writes take the table lock exclusively, so the username check and the
/// insert happen atomically.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict("Username already exists".into()));
        }

        tables.last_user_id += 1;
        let now = Utc::now();
        let created = User {
            id: tables.last_user_id,
            username: user.username,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, AppError> {
        let mut tables = self.tables.write().await;
        tables.owner_exists(task.owner_id)?;

        tables.last_task_id += 1;
        let now = Utc::now();
        let created = Task {
            id: tables.last_task_id,
            title: task.title,
            description: task.description,
            status: task.status,
            owner_id: task.owner_id,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, AppError> {
        Ok(self.tables.read().await.tasks.values().cloned().collect())
    }

    async fn find_task(&self, id: i64) -> Result<Option<Task>, AppError> {
        Ok(self.tables.read().await.tasks.get(&id).cloned())
    }

    async fn update_task(&self, id: i64, patch: TaskPatch) -> Result<Option<Task>, AppError> {
        let mut tables = self.tables.write().await;
        if let Some(owner_id) = patch.owner_id {
            if tables.tasks.contains_key(&id) {
                tables.owner_exists(owner_id)?;
            }
        }

        Ok(tables.tasks.get_mut(&id).map(|task| {
            patch.apply_to(task);
            task.updated_at = Utc::now();
            task.clone()
        }))
    }

    async fn delete_task(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.tables.write().await.tasks.remove(&id).is_some())
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}
