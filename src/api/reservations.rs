use actix_web::{web, HttpResponse};

use crate::models::{CreateReservationRequest, Reservation, ReservationResponse, UpdateStatusRequest};
use crate::services::{
    analytics_service,
    auth_service::Caller,
    reservation_service, space_service,
};
use crate::state::AppState;
use crate::utils::error::{AppError, AppResult};

async fn priced(state: &AppState, reservation: Reservation) -> AppResult<ReservationResponse> {
    let space = space_service::get_space(state, &reservation.space_id).await?;
    let price = analytics_service::price(space.hourly_rate, reservation.start_time, reservation.end_time);
    Ok(ReservationResponse::from(reservation).with_price(price))
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/mine",
    tag = "Reservations",
    responses(
        (status = 200, description = "Caller's reservations by start time", body = [ReservationResponse]),
        (status = 401, description = "Unauthenticated")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn my_reservations(
    state: web::Data<AppState>,
    caller: web::ReqData<Caller>,
) -> Result<HttpResponse, AppError> {
    log::info!("📋 GET /reservations/mine");

    let reservations: Vec<ReservationResponse> = reservation_service::list_mine(&state, &caller)
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
    path = "/api/v1/reservations/{id}",
    tag = "Reservations",
    params(("id" = String, Path, description = "Reservation id")),
    responses(
        (status = 200, description = "Reservation with price", body = ReservationResponse),
        (status = 403, description = "Neither owner nor admin"),
        (status = 404, description = "Reservation not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_reservation(
    state: web::Data<AppState>,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let reservation_id = path.into_inner();
    log::info!("📄 GET /reservations/{}", reservation_id);

    let reservation = reservation_service::get_by_id(&state, &caller, &reservation_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "reservation": priced(&state, reservation).await?
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations",
    tag = "Reservations",
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation confirmed", body = ReservationResponse),
        (status = 400, description = "Invalid or past interval"),
        (status = 401, description = "Unauthenticated"),
        (status = 404, description = "Space not found"),
        (status = 409, description = "Slot already taken")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_reservation(
    state: web::Data<AppState>,
    caller: web::ReqData<Caller>,
    body: web::Json<CreateReservationRequest>,
) -> Result<HttpResponse, AppError> {
    let CreateReservationRequest { space_id, start_time, end_time } = body.into_inner();
    log::info!("➕ POST /reservations - space: {}", space_id);

    let reservation = reservation_service::create_reservation(
        &state,
        &caller,
        &space_id,
        start_time.into_inner(),
        end_time.into_inner(),
    )
    .await?;

    Ok(HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "reservation": priced(&state, reservation).await?
    })))
}

#[utoipa::path(
    patch,
    path = "/api/v1/reservations/{id}/status",
    tag = "Reservations",
    params(("id" = String, Path, description = "Reservation id")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status written", body = ReservationResponse),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reinstatement would overlap")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_status(
    state: web::Data<AppState>,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let reservation_id = path.into_inner();
    log::info!("🔁 PATCH /reservations/{}/status - {}", reservation_id, body.status);

    let reservation =
        reservation_service::update_status(&state, &caller, &reservation_id, &body.status).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "reservation": ReservationResponse::from(reservation)
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/cancel",
    tag = "Reservations",
    params(("id" = String, Path, description = "Reservation id")),
    responses(
        (status = 200, description = "Reservation cancelled", body = ReservationResponse),
        (status = 400, description = "Reservation already started"),
        (status = 403, description = "Neither owner nor admin"),
        (status = 404, description = "Reservation not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn cancel_reservation(
    state: web::Data<AppState>,
    caller: web::ReqData<Caller>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let reservation_id = path.into_inner();
    log::info!("❌ POST /reservations/{}/cancel", reservation_id);

    let reservation =
        reservation_service::cancel_reservation(&state, &caller, &reservation_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "reservation": ReservationResponse::from(reservation)
    })))
}
