use crate::{
    auth::AuthenticatedUser,
    batch,
    error::AppError,
    models::{TaskBatch, TaskInput, TaskPatch},
    state::AppState,
};
use actix_web::{delete, get, http::StatusCode, put, web, HttpResponse, Responder};
use serde_json::json;
use std::sync::Arc;
use validator::Validate;

/// Lists every task.
///
/// Tasks are not filtered by owner: any authenticated caller sees all of them.
///
/// ## Responses:
/// - `200 OK`: `{"tasks": [Task, ...]}` ordered by id.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `500 Internal Server Error`: For database errors.
pub async fn list_tasks(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let tasks = state.timed(state.store.list_tasks()).await?;
    Ok(HttpResponse::Ok().json(json!({ "tasks": tasks })))
}

/// Creates a new task.
///
/// Fields missing from the body are filled with placeholders: title
/// `"tasktitle"`, description `"taskdescription"`, status pending. The owner
/// defaults to the authenticated caller; an explicit `owner_id` must name an
/// existing user.
///
/// ## Responses:
/// - `201 Created`: Returns the stored `Task`, including its new id.
/// - `400 Bad Request`: Malformed JSON, failed validation, or unknown owner.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `500 Internal Server Error`: For database errors.
pub async fn create_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    task_data.validate()?;
    let new_task = task_data.into_inner().into_new_task(user.id);

    let task = state.timed(state.store.create_task(new_task)).await?;
    log::debug!("user {} created task {}", user.id, task.id);

    Ok(HttpResponse::Created().json(task))
}

/// Imports a batch of tasks.
///
/// Accepts a JSON array of task payloads (or `{"tasks": [...]}`). Each element
/// is handled like a single create, by a bounded pool of concurrent inserts.
/// The response lists the outcome of every element in input order.
///
/// ## Responses:
/// - `201 Created`: Every element was created.
/// - `207 Multi-Status`: At least one element failed; see `results`.
/// - `400 Bad Request`: The body is not a batch, is larger than
///   `Limits::import_body_limit`, or the batch is empty.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
pub async fn import_batch(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    batch_data: web::Json<TaskBatch>,
) -> Result<impl Responder, AppError> {
    let items = batch_data.into_inner().into_items();
    if items.is_empty() {
        return Err(AppError::BadRequest("Batch contains no tasks".into()));
    }

    let report =
        batch::import_tasks(Arc::clone(&state.store), items, user.id, state.limits).await;
    log::info!(
        "user {} imported {} tasks: {} created, {} failed",
        user.id,
        report.total,
        report.created,
        report.failed
    );

    let status = if report.all_created() {
        StatusCode::CREATED
    } else {
        StatusCode::MULTI_STATUS
    };
    Ok(HttpResponse::build(status).json(report))
}

/// Retrieves a specific task by its ID.
///
/// ## Responses:
/// - `200 OK`: Returns the `Task`.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `404 Not Found`: No task has this id.
#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    task_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let task_id = task_id.into_inner();

    match state.timed(state.store.find_task(task_id)).await? {
        Some(task) => Ok(HttpResponse::Ok().json(task)),
        None => Err(AppError::NotFound("Task not found".into())),
    }
}

/// Partially updates a task.
///
/// Only the fields present in the body are written; a present zero value
/// (`""`, status `0`) is written like any other value.
///
/// ## Responses:
/// - `200 OK`: Returns the updated `Task`.
/// - `400 Bad Request`: Malformed JSON, failed validation, or unknown owner.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `404 Not Found`: No task has this id.
#[put("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    task_id: web::Path<i64>,
    patch: web::Json<TaskPatch>,
) -> Result<impl Responder, AppError> {
    patch.validate()?;
    let task_id = task_id.into_inner();
    let patch = patch.into_inner();

    let updated = if patch.is_empty() {
        state.timed(state.store.find_task(task_id)).await?
    } else {
        state.timed(state.store.update_task(task_id, patch)).await?
    };

    match updated {
        Some(task) => Ok(HttpResponse::Ok().json(task)),
        None => Err(AppError::NotFound("Task not found".into())),
    }
}

/// Deletes a task by its ID.
///
/// ## Responses:
/// - `200 OK`: The task existed and was removed.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
/// - `404 Not Found`: No task has this id; nothing was removed.
#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_id: web::Path<i64>,
) -> Result<impl Responder, AppError> {
    let task_id = task_id.into_inner();

    if !state.timed(state.store.delete_task(task_id)).await? {
        return Err(AppError::NotFound("Task not found".into()));
    }

    log::debug!("user {} deleted task {}", user.id, task_id);
    Ok(HttpResponse::Ok().json(json!({ "message": "task deleted successfully" })))
}
