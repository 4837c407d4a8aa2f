use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

use crate::state::AppState;

/// Health check endpoint
///
/// Reports whether the store answers, along with the current timestamp.
#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> impl Responder {
    match state.timed(state.store.ping()).await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "status": "ok",
            "store": "ok",
            "timestamp": Utc::now()
        })),
        Err(err) => {
            log::warn!("health check failed: {}", err);
            HttpResponse::ServiceUnavailable().json(json!({
                "status": "degraded",
                "store": err.client_message(),
                "timestamp": Utc::now()
            }))
        }
    }
}
