use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub database: String,
    pub timestamp: i64,
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let (status, database) = match state.store.ping().await {
        Ok(()) => ("healthy", "connected".to_string()),
        Err(e) => {
            log::warn!("⚠️  Health check: store unreachable - {}", e);
            ("degraded", "unreachable".to_string())
        }
    };

    let body = HealthResponse {
        status: status.to_string(),
        service: "coworking-booking".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
        timestamp: chrono::Utc::now().timestamp(),
    };

    if status == "healthy" {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}
