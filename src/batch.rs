//! Batch import of tasks with bounded concurrency.
//!
//! Each element of the batch is validated and inserted independently. At
//! most `Limits::import_concurrency` inserts are in flight at once, and the
//! whole import shares one deadline. Every element ends up in the report,
//! either created or failed, so nothing is silently dropped.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;
use validator::Validate;

use crate::error::AppError;
use crate::models::{NewTask, Task, TaskInput};
use crate::state::Limits;
use crate::store::{with_deadline, Store};

/// Outcome of one batch element, tagged by `status` in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportOutcome {
    Created { index: usize, task: Task },
    Failed { index: usize, error: String },
}

impl ImportOutcome {
    pub fn index(&self) -> usize {
        match self {
            ImportOutcome::Created { index, .. } | ImportOutcome::Failed { index, .. } => *index,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, ImportOutcome::Created { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub total: usize,
    pub created: usize,
    pub failed: usize,
    /// One entry per input element, ordered by index.
    pub results: Vec<ImportOutcome>,
}

impl ImportReport {
    fn from_outcomes(mut results: Vec<ImportOutcome>) -> Self {
        results.sort_by_key(ImportOutcome::index);
        let created = results.iter().filter(|r| r.is_created()).count();
        Self {
            total: results.len(),
            created,
            failed: results.len() - created,
            results,
        }
    }

    pub fn all_created(&self) -> bool {
        self.failed == 0
    }
}

fn prepare(raw: serde_json::Value, default_owner: i64) -> Result<NewTask, AppError> {
    let input: TaskInput =
        serde_json::from_value(raw).map_err(|e| AppError::BadRequest(e.to_string()))?;
    input.validate()?;
    Ok(input.into_new_task(default_owner))
}

/// Inserts every element of `items`, attributing unowned ones to `default_owner`.
///
/// Results are gathered here, in the caller's task, after all workers finish.
pub async fn import_tasks(
    store: Arc<dyn Store>,
    items: Vec<serde_json::Value>,
    default_owner: i64,
    limits: Limits,
) -> ImportReport {
    let deadline = Instant::now() + limits.import_timeout;

    let outcomes: Vec<ImportOutcome> = stream::iter(items.into_iter().enumerate())
        .map(|(index, raw)| {
            let store = Arc::clone(&store);
            async move {
                if Instant::now() >= deadline {
                    return ImportOutcome::Failed {
                        index,
                        error: "Import deadline exceeded before this task was started".into(),
                    };
                }

                let attempt = async {
                    let new_task = prepare(raw, default_owner)?;
                    with_deadline(limits.store_timeout, store.create_task(new_task)).await
                };

                match tokio::time::timeout_at(deadline, attempt).await {
                    Ok(Ok(task)) => ImportOutcome::Created { index, task },
                    Ok(Err(err)) => ImportOutcome::Failed {
                        index,
                        error: err.client_message(),
                    },
                    Err(_) => ImportOutcome::Failed {
                        index,
                        error: "Import deadline exceeded".into(),
                    },
                }
            }
        })
        .buffer_unordered(limits.import_concurrency.max(1))
        .collect()
        .await;

    ImportReport::from_outcomes(outcomes)
}
