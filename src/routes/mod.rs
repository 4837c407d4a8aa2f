pub mod auth;
pub mod health;
pub mod tasks;

use actix_web::{
    error::{JsonPayloadError, PathError},
    web, HttpRequest,
};

use crate::auth::AuthMiddleware;
use crate::error::AppError;
use crate::state::Limits;

/// Answers undecodable JSON bodies with the usual `{"error": ...}` shape.
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}

/// Same for path segments that do not parse, such as `/tasks/abc`.
fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(err.to_string()).into()
}

/// Registers every route with the default `Limits`.
pub fn config(cfg: &mut web::ServiceConfig) {
    config_with(cfg, &Limits::default());
}

/// Registers every route. Only the `/tasks` scope sits behind `AuthMiddleware`.
///
/// Expects a `web::Data<AppState>` on the enclosing `App`. The import route
/// gets its own body limit from `limits.import_body_limit`.
pub fn config_with(cfg: &mut web::ServiceConfig, limits: &Limits) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .service(health::health)
        .service(
            web::scope("/auth")
                .service(auth::register)
                .service(auth::login)
                .service(auth::all_users),
        )
        .service(
            web::scope("/tasks")
                .wrap(AuthMiddleware)
                .service(
                    web::resource(["", "/"])
                        .route(web::get().to(tasks::list_tasks))
                        .route(web::post().to(tasks::create_task)),
                )
                .service(
                    web::resource("/import")
                        .app_data(
                            web::JsonConfig::default()
                                .limit(limits.import_body_limit)
                                .error_handler(json_error_handler),
                        )
                        .route(web::post().to(tasks::import_batch)),
                )
                .service(tasks::get_task)
                .service(tasks::update_task)
                .service(tasks::delete_task),
        );
}
