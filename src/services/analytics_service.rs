use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    database::ReservationFilter,
    models::{Reservation, ReservationStatus, Span},
    services::{auth_service::{require_admin, Caller}, space_service},
    state::AppState,
    utils::{
        error::{AppError, AppResult},
        time::{hours_between, round_to},
    },
};

#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct OccupancyStats {
    pub count: usize,
    pub hours_booked: f64,
    pub occupancy_rate_percent: f64,
}

/// `hourly_rate * hours`, rounded half-up to cents.
pub fn price(hourly_rate: f64, start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    round_to(hourly_rate * hours_between(start, end), 2)
}

/// Occupancy of `range` by the given confirmed reservations. Only reservations lying
/// entirely inside the range count.
pub fn occupancy_of(reservations: &[Reservation], range: &Span) -> OccupancyStats {
    let inside: Vec<&Reservation> = reservations
        .iter()
        .filter(|r| range.contains_span(&r.span()))
        .collect();
    let hours_booked: f64 = inside
        .iter()
        .map(|r| hours_between(r.start_time, r.end_time))
        .sum();
    let range_hours = hours_between(range.start, range.end);

    OccupancyStats {
        count: inside.len(),
        hours_booked: round_to(hours_booked, 1),
        occupancy_rate_percent: round_to(hours_booked / range_hours * 100.0, 1),
    }
}

pub async fn occupancy(
    state: &AppState,
    space_id: &str,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> AppResult<OccupancyStats> {
    let range = Span::new(range_start, range_end).map_err(|_| {
        AppError::InvalidInput("Range start must be before range end".to_string())
    })?;

    let filter = ReservationFilter {
        status: Some(ReservationStatus::Confirmed),
        starts_from: Some(range.start),
        ends_by: Some(range.end),
        ..ReservationFilter::for_space(space_id)
    };
    let reservations = state.store.find_reservations(&filter).await?;

    Ok(occupancy_of(&reservations, &range))
}

/// Admin-facing occupancy report for an existing space.
pub async fn space_occupancy(
    state: &AppState,
    caller: &Caller,
    space_id: &str,
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
) -> AppResult<OccupancyStats> {
    require_admin(caller)?;
    space_service::get_space(state, space_id).await?;
    occupancy(state, space_id, range_start, range_end).await
}

/// Price quote for booking `space_id` over `[start, end)`.
pub async fn quote(
    state: &AppState,
    space_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<f64> {
    let span = Span::new(start, end)?;
    let space = space_service::get_space(state, space_id).await?;
    Ok(price(space.hourly_rate, span.start, span.end))
}
