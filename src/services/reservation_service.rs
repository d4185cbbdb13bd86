// ==================== RESERVATION LIFECYCLE ====================
// pending -> confirmed (on creation) -> cancelled.
// Admins may also set any status directly; reinstating a cancelled reservation
// re-runs the availability check.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    database::ReservationFilter,
    models::{Reservation, ReservationStatus, Span},
    services::{
        auth_service::{require_admin, require_identity, Caller, IdentityClaim},
        availability_service, space_service,
    },
    state::AppState,
    utils::error::{AppError, AppResult},
};

fn can_access(identity: &IdentityClaim, reservation: &Reservation) -> bool {
    identity.is_admin() || reservation.is_owned_by(&identity.id)
}

async fn find_existing(state: &AppState, id: &str) -> AppResult<Reservation> {
    state
        .store
        .find_reservation(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))
}

/// Books `[start, end)` on `space_id` for the caller. `now` is the reference
/// instant for the "no past bookings" rule.
pub async fn create_reservation_at(
    state: &AppState,
    caller: &Caller,
    space_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> AppResult<Reservation> {
    let identity = require_identity(caller)?;
    let space = space_service::get_space(state, space_id).await?;

    let span = Span::new(start, end)?;
    if span.start <= now {
        return Err(AppError::InvalidInput(
            "Cannot book a time slot in the past".to_string(),
        ));
    }
    if !space.is_active {
        return Err(AppError::InvalidInput("Space is not active".to_string()));
    }

    // Held until the insert lands so concurrent bookings of this space see each other.
    let _guard = state.space_locks.lock(&space.id).await;

    if !availability_service::is_available(state, &space.id, &span).await? {
        log::warn!(
            "⛔ Space {} unavailable for {} - {} (requested by {})",
            space.id,
            span.start,
            span.end,
            identity.id
        );
        return Err(AppError::Conflict(
            "This space is not available for the selected period".to_string(),
        ));
    }

    let reservation = Reservation {
        id: Uuid::new_v4().to_string(),
        user_id: identity.id.clone(),
        space_id: space.id.clone(),
        start_time: span.start,
        end_time: span.end,
        status: ReservationStatus::Confirmed,
        created_at: now,
    };

    state.store.insert_reservation(&reservation).await?;
    log::info!(
        "📅 Reservation {} confirmed: space {} {} - {} for user {}",
        reservation.id,
        reservation.space_id,
        reservation.start_time,
        reservation.end_time,
        reservation.user_id
    );

    Ok(reservation)
}

pub async fn create_reservation(
    state: &AppState,
    caller: &Caller,
    space_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<Reservation> {
    create_reservation_at(state, caller, space_id, start, end, Utc::now()).await
}

/// Admin override. Moving a cancelled reservation back to pending/confirmed
/// fails with `Conflict` if its slot has been taken in the meantime.
pub async fn update_status(
    state: &AppState,
    caller: &Caller,
    id: &str,
    new_status: &str,
) -> AppResult<Reservation> {
    let admin = require_admin(caller)?;
    let reservation = find_existing(state, id).await?;
    let status: ReservationStatus = new_status.parse()?;

    let reinstating = !reservation.status.holds_slot() && status.holds_slot();
    let _guard = if reinstating {
        let guard = state.space_locks.lock(&reservation.space_id).await;
        let clash = availability_service::find_conflicts(state, &reservation.space_id, &reservation.span())
            .await?
            .into_iter()
            .any(|other| other.id != reservation.id);
        if clash {
            return Err(AppError::Conflict(
                "Cannot reinstate: the time slot is now taken by another reservation".to_string(),
            ));
        }
        Some(guard)
    } else {
        None
    };

    let updated = state
        .store
        .set_reservation_status(&reservation.id, status)
        .await?
        .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))?;

    log::info!(
        "🔁 Reservation {} status {} -> {} by admin {}",
        updated.id,
        reservation.status,
        updated.status,
        admin.id
    );
    Ok(updated)
}

pub async fn cancel_reservation_at(
    state: &AppState,
    caller: &Caller,
    id: &str,
    now: DateTime<Utc>,
) -> AppResult<Reservation> {
    let identity = require_identity(caller)?;
    let reservation = find_existing(state, id).await?;

    if !can_access(identity, &reservation) {
        return Err(AppError::not_owner());
    }
    if reservation.start_time <= now {
        return Err(AppError::InvalidInput(
            "Cannot cancel a reservation that has already started".to_string(),
        ));
    }
    if reservation.status == ReservationStatus::Cancelled {
        return Ok(reservation);
    }

    let cancelled = state
        .store
        .set_reservation_status(&reservation.id, ReservationStatus::Cancelled)
        .await?
        .ok_or_else(|| AppError::NotFound("Reservation not found".to_string()))?;

    log::info!("❌ Reservation {} cancelled by {}", cancelled.id, identity.id);
    Ok(cancelled)
}

pub async fn cancel_reservation(state: &AppState, caller: &Caller, id: &str) -> AppResult<Reservation> {
    cancel_reservation_at(state, caller, id, Utc::now()).await
}

pub async fn list_mine(state: &AppState, caller: &Caller) -> AppResult<Vec<Reservation>> {
    let identity = require_identity(caller)?;
    state
        .store
        .find_reservations(&ReservationFilter::for_user(&identity.id))
        .await
}

/// Admins see every reservation of the space, members only their own.
pub async fn list_for_space(
    state: &AppState,
    caller: &Caller,
    space_id: &str,
) -> AppResult<Vec<Reservation>> {
    let identity = require_identity(caller)?;
    space_service::get_space(state, space_id).await?;

    let mut filter = ReservationFilter::for_space(space_id);
    if !identity.is_admin() {
        filter.user_id = Some(identity.id.clone());
    }
    state.store.find_reservations(&filter).await
}

pub async fn get_by_id(state: &AppState, caller: &Caller, id: &str) -> AppResult<Reservation> {
    let identity = require_identity(caller)?;
    let reservation = find_existing(state, id).await?;

    if !can_access(identity, &reservation) {
        return Err(AppError::not_owner());
    }
    Ok(reservation)
}

/// Availability as exposed over HTTP: requires an identity and an existing space.
pub async fn check_availability(
    state: &AppState,
    caller: &Caller,
    space_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> AppResult<bool> {
    require_identity(caller)?;
    space_service::get_space(state, space_id).await?;
    let span = Span::new(start, end)?;
    availability_service::is_available(state, space_id, &span).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{admin, member, seed_space, test_state, tomorrow_at};
    use chrono::Duration;
    use std::sync::Arc;

    #[tokio::test]
    async fn creates_confirmed_reservation_owned_by_caller() {
        let state = test_state();
        let space = seed_space(&state, "Room A").await;

        let r = create_reservation(&state, &member("u1"), &space.id, tomorrow_at(10, 0), tomorrow_at(11, 0))
            .await
            .unwrap();
        assert_eq!(r.status, ReservationStatus::Confirmed);
        assert_eq!(r.user_id, "u1");
        assert_eq!(r.space_id, space.id);
    }

    #[tokio::test]
    async fn creation_rules() {
        let state = test_state();
        let space = seed_space(&state, "Room A").await;
        let caller = member("u1");

        assert!(matches!(
            create_reservation(&state, &Caller::anonymous(), &space.id, tomorrow_at(10, 0), tomorrow_at(11, 0)).await,
            Err(AppError::Unauthenticated(_))
        ));
        assert!(matches!(
            create_reservation(&state, &caller, "missing", tomorrow_at(10, 0), tomorrow_at(11, 0)).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            create_reservation(&state, &caller, &space.id, tomorrow_at(10, 0), tomorrow_at(10, 0)).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            create_reservation(&state, &caller, &space.id, tomorrow_at(11, 0), tomorrow_at(10, 0)).await,
            Err(AppError::InvalidInput(_))
        ));

        let past_start = Utc::now() - Duration::hours(2);
        assert!(matches!(
            create_reservation(&state, &caller, &space.id, past_start, past_start + Duration::hours(1)).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn start_equal_to_now_is_rejected() {
        let state = test_state();
        let space = seed_space(&state, "Room A").await;
        let now = tomorrow_at(9, 0);

        assert!(matches!(
            create_reservation_at(&state, &member("u1"), &space.id, now, now + Duration::hours(1), now).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn overlapping_booking_conflicts_and_back_to_back_succeeds() {
        let state = test_state();
        let space = seed_space(&state, "Room A").await;
        create_reservation(&state, &member("u1"), &space.id, tomorrow_at(10, 0), tomorrow_at(11, 0))
            .await
            .unwrap();

        assert!(matches!(
            create_reservation(&state, &member("u2"), &space.id, tomorrow_at(10, 30), tomorrow_at(11, 30)).await,
            Err(AppError::Conflict(_))
        ));
        assert!(create_reservation(&state, &member("u2"), &space.id, tomorrow_at(11, 0), tomorrow_at(12, 0))
            .await
            .is_ok());
        assert!(create_reservation(&state, &member("u2"), &space.id, tomorrow_at(9, 0), tomorrow_at(10, 0))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn inactive_space_cannot_be_booked() {
        let state = test_state();
        let space = seed_space(&state, "Room A").await;
        space_service::deactivate_space(&state, &admin("a1"), &space.id).await.unwrap();

        assert!(matches!(
            create_reservation(&state, &member("u1"), &space.id, tomorrow_at(10, 0), tomorrow_at(11, 0)).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_overlapping_requests_admit_one() {
        let state = test_state();
        let space = seed_space(&state, "Room A").await;
        let state = Arc::new(state);

        let mut handles = Vec::new();
        for i in 0..8 {
            let state = state.clone();
            let space_id = space.id.clone();
            handles.push(tokio::spawn(async move {
                create_reservation(
                    &state,
                    &member(&format!("u{}", i)),
                    &space_id,
                    tomorrow_at(14, 0),
                    tomorrow_at(15, 0),
                )
                .await
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
    }

    #[tokio::test]
    async fn cancel_rules() {
        let state = test_state();
        let space = seed_space(&state, "Room A").await;
        let r = create_reservation(&state, &member("owner"), &space.id, tomorrow_at(10, 0), tomorrow_at(11, 0))
            .await
            .unwrap();

        assert!(matches!(
            cancel_reservation(&state, &member("stranger"), &r.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            cancel_reservation(&state, &member("owner"), "missing").await,
            Err(AppError::NotFound(_))
        ));

        let cancelled = cancel_reservation(&state, &member("owner"), &r.id).await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);

        // Idempotent
        let again = cancel_reservation(&state, &member("owner"), &r.id).await.unwrap();
        assert_eq!(again.status, ReservationStatus::Cancelled);
    }

    #[tokio::test]
    async fn admin_can_cancel_any_reservation() {
        let state = test_state();
        let space = seed_space(&state, "Room A").await;
        let r = create_reservation(&state, &member("owner"), &space.id, tomorrow_at(10, 0), tomorrow_at(11, 0))
            .await
            .unwrap();

        let cancelled = cancel_reservation(&state, &admin("a1"), &r.id).await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    }

    #[tokio::test]
    async fn started_reservation_cannot_be_cancelled() {
        let state = test_state();
        let space = seed_space(&state, "Room A").await;
        let r = create_reservation(&state, &member("owner"), &space.id, tomorrow_at(10, 0), tomorrow_at(11, 0))
            .await
            .unwrap();

        let during = tomorrow_at(10, 30);
        assert!(matches!(
            cancel_reservation_at(&state, &member("owner"), &r.id, during).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            cancel_reservation_at(&state, &member("owner"), &r.id, tomorrow_at(10, 0)).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn status_override_rules() {
        let state = test_state();
        let space = seed_space(&state, "Room A").await;
        let r = create_reservation(&state, &member("owner"), &space.id, tomorrow_at(10, 0), tomorrow_at(11, 0))
            .await
            .unwrap();

        assert!(matches!(
            update_status(&state, &member("owner"), &r.id, "pending").await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            update_status(&state, &admin("a1"), "missing", "pending").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            update_status(&state, &admin("a1"), &r.id, "archived").await,
            Err(AppError::InvalidInput(_))
        ));

        let pending = update_status(&state, &admin("a1"), &r.id, "pending").await.unwrap();
        assert_eq!(pending.status, ReservationStatus::Pending);

        let cancelled = update_status(&state, &admin("a1"), &r.id, "cancelled").await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);

        // Slot is still free, so reinstating works
        let back = update_status(&state, &admin("a1"), &r.id, "confirmed").await.unwrap();
        assert_eq!(back.status, ReservationStatus::Confirmed);
    }

    #[tokio::test]
    async fn reinstating_into_a_taken_slot_conflicts() {
        let state = test_state();
        let space = seed_space(&state, "Room A").await;
        let first = create_reservation(&state, &member("u1"), &space.id, tomorrow_at(10, 0), tomorrow_at(11, 0))
            .await
            .unwrap();
        cancel_reservation(&state, &member("u1"), &first.id).await.unwrap();
        create_reservation(&state, &member("u2"), &space.id, tomorrow_at(10, 30), tomorrow_at(11, 30))
            .await
            .unwrap();

        assert!(matches!(
            update_status(&state, &admin("a1"), &first.id, "confirmed").await,
            Err(AppError::Conflict(_))
        ));
        let still = get_by_id(&state, &admin("a1"), &first.id).await.unwrap();
        assert_eq!(still.status, ReservationStatus::Cancelled);
    }

    #[tokio::test]
    async fn visibility_rules() {
        let state = test_state();
        let space = seed_space(&state, "Room A").await;
        let late = create_reservation(&state, &member("u1"), &space.id, tomorrow_at(15, 0), tomorrow_at(16, 0))
            .await
            .unwrap();
        let early = create_reservation(&state, &member("u1"), &space.id, tomorrow_at(9, 0), tomorrow_at(10, 0))
            .await
            .unwrap();
        let other = create_reservation(&state, &member("u2"), &space.id, tomorrow_at(12, 0), tomorrow_at(13, 0))
            .await
            .unwrap();

        let mine: Vec<String> = list_mine(&state, &member("u1"))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(mine, vec![early.id.clone(), late.id.clone()]);

        let member_view = list_for_space(&state, &member("u2"), &space.id).await.unwrap();
        assert_eq!(member_view.len(), 1);
        assert_eq!(member_view[0].id, other.id);

        let admin_view: Vec<String> = list_for_space(&state, &admin("a1"), &space.id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(admin_view, vec![early.id.clone(), other.id.clone(), late.id.clone()]);

        assert!(matches!(
            list_for_space(&state, &admin("a1"), "missing").await,
            Err(AppError::NotFound(_))
        ));

        assert!(matches!(
            get_by_id(&state, &member("u2"), &early.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(get_by_id(&state, &member("u1"), &early.id).await.unwrap().id, early.id);
        assert_eq!(get_by_id(&state, &admin("a1"), &early.id).await.unwrap().id, early.id);
    }

    #[tokio::test]
    async fn availability_query_rules() {
        let state = test_state();
        let space = seed_space(&state, "Room A").await;
        create_reservation(&state, &member("u1"), &space.id, tomorrow_at(10, 0), tomorrow_at(11, 0))
            .await
            .unwrap();

        assert!(matches!(
            check_availability(&state, &Caller::anonymous(), &space.id, tomorrow_at(12, 0), tomorrow_at(13, 0)).await,
            Err(AppError::Unauthenticated(_))
        ));
        assert!(matches!(
            check_availability(&state, &member("u1"), "missing", tomorrow_at(12, 0), tomorrow_at(13, 0)).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            check_availability(&state, &member("u1"), &space.id, tomorrow_at(13, 0), tomorrow_at(12, 0)).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(!check_availability(&state, &member("u2"), &space.id, tomorrow_at(10, 30), tomorrow_at(11, 30))
            .await
            .unwrap());
        assert!(check_availability(&state, &member("u2"), &space.id, tomorrow_at(11, 0), tomorrow_at(12, 0))
            .await
            .unwrap());
    }
}
