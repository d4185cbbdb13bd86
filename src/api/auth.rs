use actix_web::{web, HttpResponse};

use crate::models::{AuthResponse, LoginRequest, RegisterRequest, UserInfo};
use crate::services::auth_service::{self, Caller};
use crate::state::AppState;
use crate::utils::error::AppError;

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already in use")
    )
)]
pub async fn register(
    state: web::Data<AppState>,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("📝 POST /auth/register - email: {}", request.email);

    match auth_service::register(&state, &request).await {
        Ok(response) => {
            log::info!("✅ Registration successful: {}", response.user.email);
            Ok(HttpResponse::Created().json(response))
        }
        Err(e) => {
            log::warn!("❌ Registration failed: {} - {}", request.email, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    state: web::Data<AppState>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    match auth_service::login(&state, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", response.user.email);
            Ok(HttpResponse::Ok().json(response))
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            Err(e)
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 401, description = "Unauthenticated")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(
    state: web::Data<AppState>,
    caller: web::ReqData<Caller>,
) -> Result<HttpResponse, AppError> {
    log::info!("👤 GET /auth/me");

    let user = auth_service::me(&state, &caller).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": user
    })))
}
