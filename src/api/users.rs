use actix_web::{web, HttpResponse};

use crate::models::UserInfo;
use crate::services::auth_service::{self, Caller};
use crate::state::AppState;
use crate::utils::error::AppError;

#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    responses(
        (status = 200, description = "All users, newest first", body = [UserInfo]),
        (status = 401, description = "Unauthenticated"),
        (status = 403, description = "Admin only")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_users(
    state: web::Data<AppState>,
    caller: web::ReqData<Caller>,
) -> Result<HttpResponse, AppError> {
    log::info!("👥 GET /users");

    let users = auth_service::list_users(&state, &caller).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "total": users.len(),
        "users": users
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserInfo),
        (status = 403, description = "Admin only"),
        (status = 404, description = "User not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_user(
    state: web::Data<AppState>,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    log::info!("👤 GET /users/{}", user_id);

    let user = auth_service::get_user(&state, &caller, &user_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "user": user
    })))
}
