use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::models::{
    CreateSpaceRequest, IntervalQuery, ReservationResponse, SpaceResponse, SpaceType,
    UpdateSpaceRequest,
};
use crate::services::{
    analytics_service::{self, OccupancyStats},
    auth_service::Caller,
    reservation_service, space_service,
};
use crate::state::AppState;
use crate::utils::{error::AppError, time::Timestamp};

#[derive(Debug, Deserialize)]
pub struct SpacesQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OccupancyQuery {
    pub range_start: Timestamp,
    pub range_end: Timestamp,
}

#[utoipa::path(
    get,
    path = "/api/v1/spaces",
    tag = "Spaces",
    params(("type" = Option<String>, Query, description = "desk | meeting_room")),
    responses(
        (status = 200, description = "Active spaces ordered by name", body = [SpaceResponse]),
        (status = 400, description = "Unknown space type")
    )
)]
pub async fn list_spaces(
    state: web::Data<AppState>,
    query: web::Query<SpacesQuery>,
) -> Result<HttpResponse, AppError> {
    log::info!("🏢 GET /spaces - type: {:?}", query.kind);

    let kind = query
        .kind
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .map(str::parse::<SpaceType>)
        .transpose()?;

    let spaces: Vec<SpaceResponse> = space_service::list_spaces(&state, kind)
        .await?
        .into_iter()
        .map(SpaceResponse::from)
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "total": spaces.len(),
        "spaces": spaces
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/spaces/{id}",
    tag = "Spaces",
    params(("id" = String, Path, description = "Space id")),
    responses(
        (status = 200, description = "Space (active or not)", body = SpaceResponse),
        (status = 404, description = "Space not found")
    )
)]
pub async fn get_space(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let space_id = path.into_inner();
    log::info!("🏢 GET /spaces/{}", space_id);

    let space = space_service::get_space(&state, &space_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "space": SpaceResponse::from(space)
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/spaces",
    tag = "Spaces",
    request_body = CreateSpaceRequest,
    responses(
        (status = 201, description = "Space created", body = SpaceResponse),
        (status = 403, description = "Admin only"),
        (status = 409, description = "An active space with this name exists")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_space(
    state: web::Data<AppState>,
    caller: web::ReqData<Caller>,
    body: web::Json<CreateSpaceRequest>,
) -> Result<HttpResponse, AppError> {
    log::info!("➕ POST /spaces - name: {}", body.name);

    let space = space_service::create_space(&state, &caller, &body).await?;
    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "space": SpaceResponse::from(space)
    })))
}

#[utoipa::path(
    put,
    path = "/api/v1/spaces/{id}",
    tag = "Spaces",
    params(("id" = String, Path, description = "Space id")),
    request_body = UpdateSpaceRequest,
    responses(
        (status = 200, description = "Space updated", body = SpaceResponse),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Space not found"),
        (status = 409, description = "Name already taken")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_space(
    state: web::Data<AppState>,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
    body: web::Json<UpdateSpaceRequest>,
) -> Result<HttpResponse, AppError> {
    let space_id = path.into_inner();
    log::info!("✏️  PUT /spaces/{}", space_id);

    let space = space_service::update_space(&state, &caller, &space_id, &body).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "space": SpaceResponse::from(space)
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/spaces/{id}",
    tag = "Spaces",
    params(("id" = String, Path, description = "Space id")),
    responses(
        (status = 200, description = "Space deactivated"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Space not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn deactivate_space(
    state: web::Data<AppState>,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let space_id = path.into_inner();
    log::info!("🗄️  DELETE /spaces/{}", space_id);

    let deactivated = space_service::deactivate_space(&state, &caller, &space_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": deactivated
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/spaces/{id}/availability",
    tag = "Spaces",
    params(
        ("id" = String, Path, description = "Space id"),
        ("start_time" = String, Query, description = "ISO-8601 or epoch milliseconds"),
        ("end_time" = String, Query, description = "ISO-8601 or epoch milliseconds")
    ),
    responses(
        (status = 200, description = "Whether the interval is free"),
        (status = 400, description = "Invalid interval"),
        (status = 401, description = "Unauthenticated"),
        (status = 404, description = "Space not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn check_availability(
    state: web::Data<AppState>,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
    query: web::Query<IntervalQuery>,
) -> Result<HttpResponse, AppError> {
    let space_id = path.into_inner();
    let IntervalQuery { start_time, end_time } = query.into_inner();
    log::info!("🔎 GET /spaces/{}/availability", space_id);

    let available = reservation_service::check_availability(
        &state,
        &caller,
        &space_id,
        start_time.into_inner(),
        end_time.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "available": available
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/spaces/{id}/reservations",
    tag = "Spaces",
    params(("id" = String, Path, description = "Space id")),
    responses(
        (status = 200, description = "Reservations by start time (own only for members)", body = [ReservationResponse]),
        (status = 401, description = "Unauthenticated"),
        (status = 404, description = "Space not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn space_reservations(
    state: web::Data<AppState>,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let space_id = path.into_inner();
    log::info!("📋 GET /spaces/{}/reservations", space_id);

    let reservations: Vec<ReservationResponse> =
        reservation_service::list_for_space(&state, &caller, &space_id)
            .await?
            .into_iter()
            .map(ReservationResponse::from)
            .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "total": reservations.len(),
        "reservations": reservations
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/spaces/{id}/occupancy",
    tag = "Spaces",
    params(
        ("id" = String, Path, description = "Space id"),
        ("range_start" = String, Query, description = "ISO-8601 or epoch milliseconds"),
        ("range_end" = String, Query, description = "ISO-8601 or epoch milliseconds")
    ),
    responses(
        (status = 200, description = "Occupancy statistics", body = OccupancyStats),
        (status = 400, description = "Empty or inverted range"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Space not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn space_occupancy(
    state: web::Data<AppState>,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
    query: web::Query<OccupancyQuery>,
) -> Result<HttpResponse, AppError> {
    let space_id = path.into_inner();
    let OccupancyQuery { range_start, range_end } = query.into_inner();
    log::info!("📊 GET /spaces/{}/occupancy", space_id);

    let stats = analytics_service::space_occupancy(
        &state,
        &caller,
        &space_id,
        range_start.into_inner(),
        range_end.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "stats": stats
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/spaces/{id}/quote",
    tag = "Spaces",
    params(
        ("id" = String, Path, description = "Space id"),
        ("start_time" = String, Query, description = "ISO-8601 or epoch milliseconds"),
        ("end_time" = String, Query, description = "ISO-8601 or epoch milliseconds")
    ),
    responses(
        (status = 200, description = "Price for the interval"),
        (status = 400, description = "Invalid interval"),
        (status = 404, description = "Space not found")
    )
)]
pub async fn quote(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<IntervalQuery>,
) -> Result<HttpResponse, AppError> {
    let space_id = path.into_inner();
    let IntervalQuery { start_time, end_time } = query.into_inner();
    log::info!("💰 GET /spaces/{}/quote", space_id);

    let price = analytics_service::quote(
        &state,
        &space_id,
        start_time.into_inner(),
        end_time.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "price": price
    })))
}
