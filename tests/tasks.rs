use actix_cors::Cors;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{header, StatusCode};
use actix_web::middleware::Logger;
use actix_web::{rt, test, web, App, HttpServer};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::net::TcpListener;
use std::sync::Arc;
use taskmanager::auth::{AuthResponse, TokenIssuer};
use taskmanager::batch::{ImportOutcome, ImportReport};
use taskmanager::models::{NewTask, NewUser, Task, TaskPatch, TaskStatus, User};
use taskmanager::routes;
use taskmanager::store::{MemoryStore, Store};
use taskmanager::{AppError, AppState, Limits};

// Helper struct to hold auth details
struct TestUser {
    id: i64,
    token: String,
}

impl TestUser {
    fn bearer(&self) -> (header::HeaderName, String) {
        (header::AUTHORIZATION, format!("Bearer {}", self.token))
    }
}

fn test_state(store: Arc<dyn Store>) -> AppState {
    AppState::new(
        store,
        TokenIssuer::new("integration-secret", chrono::Duration::hours(1)),
        Limits {
            bcrypt_cost: 4,
            import_concurrency: 4,
            ..Limits::default()
        },
    )
}

async fn init_app(
    state: AppState,
) -> impl Service<
    actix_http::Request,
    Response = ServiceResponse<impl MessageBody>,
    Error = actix_web::Error,
> {
    test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .wrap(Logger::default())
            .configure(routes::config),
    )
    .await
}

async fn register_and_login_user(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    >,
    username: &str,
    password: &str,
) -> TestUser {
    let credentials = json!({ "username": username, "password": password });

    let req = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(&credentials)
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED, "register {}", username);

    let req = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(&credentials)
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::OK, "login {}", username);
    let auth: AuthResponse = test::read_body_json(resp).await;

    TestUser {
        id: auth.user_id,
        token: auth.token,
    }
}

/// Rejects every task whose title is `item-<n>` with an odd `n`.
struct RejectOddStore {
    inner: MemoryStore,
}

#[async_trait]
impl Store for RejectOddStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        self.inner.create_user(user).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        self.inner.find_user_by_username(username).await
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.inner.list_users().await
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, AppError> {
        let index = task
            .title
            .strip_prefix("item-")
            .and_then(|n| n.parse::<usize>().ok());
        if matches!(index, Some(n) if n % 2 == 1) {
            return Err(AppError::DatabaseError("row rejected".into()));
        }
        self.inner.create_task(task).await
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, AppError> {
        self.inner.list_tasks().await
    }

    async fn find_task(&self, id: i64) -> Result<Option<Task>, AppError> {
        self.inner.find_task(id).await
    }

    async fn update_task(&self, id: i64, patch: TaskPatch) -> Result<Option<Task>, AppError> {
        self.inner.update_task(id, patch).await
    }

    async fn delete_task(&self, id: i64) -> Result<bool, AppError> {
        self.inner.delete_task(id).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.inner.ping().await
    }
}

#[test_log::test(actix_rt::test)]
async fn test_end_to_end_flow() {
    let app = init_app(test_state(Arc::new(MemoryStore::new()))).await;
    let user = register_and_login_user(&app, "a", "p").await;

    let req = test::TestRequest::post()
        .uri("/tasks/")
        .append_header(user.bearer())
        .set_json(json!({ "title": "t1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Task = test::read_body_json(resp).await;
    assert_eq!(created.title, "t1");
    assert_eq!(created.description, "taskdescription");
    assert_eq!(created.status, TaskStatus::Pending);
    assert_eq!(created.owner_id, user.id);

    let req = test::TestRequest::get()
        .uri(&format!("/tasks/{}", created.id))
        .append_header(user.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Task = test::read_body_json(resp).await;
    assert_eq!(fetched, created);

    let req = test::TestRequest::delete()
        .uri(&format!("/tasks/{}", created.id))
        .append_header(user.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/tasks/{}", created.id))
        .append_header(user.bearer())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_created_ids_are_fresh_and_listed() {
    let app = init_app(test_state(Arc::new(MemoryStore::new()))).await;
    let user = register_and_login_user(&app, "lister", "pw").await;

    let mut ids = Vec::new();
    for title in ["one", "two", "three"] {
        let req = test::TestRequest::post()
            .uri("/tasks")
            .append_header(user.bearer())
            .set_json(json!({ "title": title, "status": 1 }))
            .to_request();
        let created: Task = test::call_and_read_body_json(&app, req).await;
        assert!(!ids.contains(&created.id));
        ids.push(created.id);
    }

    let req = test::TestRequest::get()
        .uri("/tasks/")
        .append_header(user.bearer())
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let listed: Vec<i64> = body["tasks"]
        .as_array()
        .expect("tasks array")
        .iter()
        .filter_map(|t| t["id"].as_i64())
        .collect();
    assert_eq!(listed, ids);
}

#[actix_rt::test]
async fn test_partial_update_only_touches_present_fields() {
    let app = init_app(test_state(Arc::new(MemoryStore::new()))).await;
    let user = register_and_login_user(&app, "updater", "pw").await;

    let req = test::TestRequest::post()
        .uri("/tasks/")
        .append_header(user.bearer())
        .set_json(json!({ "title": "original", "description": "keep me", "status": 1 }))
        .to_request();
    let created: Task = test::call_and_read_body_json(&app, req).await;
    let uri = format!("/tasks/{}", created.id);

    let req = test::TestRequest::put()
        .uri(&uri)
        .append_header(user.bearer())
        .set_json(json!({ "title": "x" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Task = test::read_body_json(resp).await;
    assert_eq!(updated.title, "x");
    assert_eq!(updated.description, "keep me");
    assert_eq!(updated.status, TaskStatus::InProgress);
    assert_eq!(updated.owner_id, created.owner_id);

    // Zero values are writes, not "no change"
    let req = test::TestRequest::put()
        .uri(&uri)
        .append_header(user.bearer())
        .set_json(json!({ "status": 0, "description": "" }))
        .to_request();
    let updated: Task = test::call_and_read_body_json(&app, req).await;
    assert_eq!(updated.status, TaskStatus::Completed);
    assert_eq!(updated.description, "");
    assert_eq!(updated.title, "x");

    let req = test::TestRequest::put()
        .uri(&uri)
        .append_header(user.bearer())
        .set_json(json!({ "status": 5 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::put()
        .uri("/tasks/999999")
        .append_header(user.bearer())
        .set_json(json!({ "title": "ghost" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_rt::test]
async fn test_delete_missing_task_is_not_found() {
    let app = init_app(test_state(Arc::new(MemoryStore::new()))).await;
    let user = register_and_login_user(&app, "deleter", "pw").await;

    let req = test::TestRequest::post()
        .uri("/tasks/")
        .append_header(user.bearer())
        .set_json(json!({}))
        .to_request();
    let created: Task = test::call_and_read_body_json(&app, req).await;
    assert_eq!(created.title, "tasktitle");

    let uri = format!("/tasks/{}", created.id);
    let req = test::TestRequest::delete()
        .uri(&uri)
        .append_header(user.bearer())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::delete()
        .uri(&uri)
        .append_header(user.bearer())
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_rt::test]
async fn test_owner_comes_from_the_requests_own_token() {
    let app = init_app(test_state(Arc::new(MemoryStore::new()))).await;
    let alice = register_and_login_user(&app, "alice", "pw").await;
    // bob logs in last; alice's tasks must still be attributed to alice
    let bob = register_and_login_user(&app, "bob", "pw").await;

    let req = test::TestRequest::post()
        .uri("/tasks/")
        .append_header(alice.bearer())
        .set_json(json!({ "title": "alice's" }))
        .to_request();
    let created: Task = test::call_and_read_body_json(&app, req).await;
    assert_eq!(created.owner_id, alice.id);
    assert!(created.owner_id != bob.id);

    let req = test::TestRequest::post()
        .uri("/tasks/")
        .append_header(alice.bearer())
        .set_json(json!({ "title": "orphan", "owner_id": 424242 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_task_routes_require_a_valid_token() {
    let app = init_app(test_state(Arc::new(MemoryStore::new()))).await;

    let req = test::TestRequest::get().uri("/tasks/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Missing token");

    let req = test::TestRequest::get()
        .uri("/tasks/1")
        .append_header((header::AUTHORIZATION, "Bearer not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // A token signed with another secret is rejected too
    let foreign = TokenIssuer::new("someone-else", chrono::Duration::hours(1))
        .issue(1, "mallory")
        .unwrap();
    let req = test::TestRequest::post()
        .uri("/tasks/import")
        .append_header((header::AUTHORIZATION, format!("Bearer {}", foreign)))
        .set_json(json!([{}]))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_batch_import_all_created() {
    let app = init_app(test_state(Arc::new(MemoryStore::new()))).await;
    let user = register_and_login_user(&app, "importer", "pw").await;

    let batch: Vec<_> = (0..10)
        .map(|i| json!({ "title": format!("item-{}", i) }))
        .collect();
    let req = test::TestRequest::post()
        .uri("/tasks/import")
        .append_header(user.bearer())
        .set_json(json!({ "tasks": batch }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let report: ImportReport = test::read_body_json(resp).await;
    assert_eq!(report.total, 10);
    assert_eq!(report.created, 10);
    assert_eq!(report.failed, 0);
    assert!(report.results.iter().all(|r| match r {
        ImportOutcome::Created { task, .. } => task.owner_id == user.id,
        ImportOutcome::Failed { .. } => false,
    }));

    let req = test::TestRequest::get()
        .uri("/tasks/")
        .append_header(user.bearer())
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["tasks"].as_array().map(Vec::len), Some(10));
}

#[actix_rt::test]
async fn test_batch_import_reports_every_failure() {
    let store = Arc::new(RejectOddStore {
        inner: MemoryStore::new(),
    });
    let app = init_app(test_state(store)).await;
    let user = register_and_login_user(&app, "importer", "pw").await;

    let batch: Vec<_> = (0..10)
        .map(|i| json!({ "title": format!("item-{}", i) }))
        .collect();
    let req = test::TestRequest::post()
        .uri("/tasks/import")
        .append_header(user.bearer())
        .set_json(&batch)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::MULTI_STATUS);

    let report: ImportReport = test::read_body_json(resp).await;
    assert_eq!(report.total, 10);
    assert_eq!(report.created, 5);
    assert_eq!(report.failed, 5);

    let failed: Vec<usize> = report
        .results
        .iter()
        .filter(|r| !r.is_created())
        .map(ImportOutcome::index)
        .collect();
    assert_eq!(failed, vec![1, 3, 5, 7, 9]);

    let req = test::TestRequest::get()
        .uri("/tasks/")
        .append_header(user.bearer())
        .to_request();
    let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    let mut titles: Vec<String> = body["tasks"]
        .as_array()
        .expect("tasks array")
        .iter()
        .filter_map(|t| t["title"].as_str().map(str::to_string))
        .collect();
    titles.sort();
    assert_eq!(titles, vec!["item-0", "item-2", "item-4", "item-6", "item-8"]);
}

#[actix_rt::test]
async fn test_batch_import_rejects_empty_and_malformed_batches() {
    let app = init_app(test_state(Arc::new(MemoryStore::new()))).await;
    let user = register_and_login_user(&app, "importer", "pw").await;

    for payload in [json!([]), json!({ "tasks": [] }), json!({ "title": "not a batch" })] {
        let req = test::TestRequest::post()
            .uri("/tasks/import")
            .append_header(user.bearer())
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "payload {}", payload);
    }
}

#[actix_rt::test]
async fn test_large_batch_import_is_accepted() {
    let app = init_app(test_state(Arc::new(MemoryStore::new()))).await;
    let user = register_and_login_user(&app, "bulk_importer", "pw").await;

    let batch: Vec<serde_json::Value> = (0..2500)
        .map(|i| json!({ "title": format!("bulk-task-{}", i), "description": "bulk" }))
        .collect();
    let payload = json!(batch);
    assert!(payload.to_string().len() > 32 * 1024);

    let req = test::TestRequest::post()
        .uri("/tasks/import")
        .append_header(user.bearer())
        .set_json(&payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let report: ImportReport = test::read_body_json(resp).await;
    assert_eq!(report.total, 2500);
    assert_eq!(report.created, 2500);
}

#[actix_rt::test]
async fn test_non_numeric_task_id_is_json_bad_request() {
    let app = init_app(test_state(Arc::new(MemoryStore::new()))).await;
    let user = register_and_login_user(&app, "path_user", "pw").await;

    let requests = [
        test::TestRequest::get().uri("/tasks/abc"),
        test::TestRequest::put()
            .uri("/tasks/abc")
            .set_json(json!({ "title": "x" })),
        test::TestRequest::delete().uri("/tasks/abc"),
    ];

    for req in requests {
        let req = req.append_header(user.bearer()).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert!(body["error"].is_string(), "error body missing: {}", body);
    }
}

#[actix_rt::test]
async fn test_create_task_unauthorized() {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let state = web::Data::new(test_state(Arc::new(MemoryStore::new())));
    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .configure(routes::config)
    })
    .workers(1)
    .listen(listener)
    .expect("Failed to listen on bound port")
    .run();
    let server_handle = server.handle();
    rt::spawn(server);

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("http://127.0.0.1:{}/tasks/", port))
        .json(&json!({ "title": "Unauthorized Task" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.expect("json error body");
    assert_eq!(body["error"], "Missing token");

    server_handle.stop(true).await;
}
