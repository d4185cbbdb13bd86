// ==================== AVAILABILITY ENGINE ====================
// A candidate [s, e) conflicts with a stored [s', e') iff s < e' && s' < e.
// Touching intervals (e == s') are free. Cancelled reservations never block.

use crate::{
    database::ReservationFilter,
    models::{Reservation, ReservationStatus, Span},
    state::AppState,
    utils::error::AppResult,
};

/// Reservations among `existing` that still hold their slot and overlap `span`.
pub fn conflicts_in<'a>(
    existing: &'a [Reservation],
    span: &Span,
) -> impl Iterator<Item = &'a Reservation> + 'a {
    let span = *span;
    existing
        .iter()
        .filter(move |r| r.status.holds_slot() && r.span().overlaps(&span))
}

pub async fn find_conflicts(
    state: &AppState,
    space_id: &str,
    span: &Span,
) -> AppResult<Vec<Reservation>> {
    let filter = ReservationFilter {
        exclude_status: Some(ReservationStatus::Cancelled),
        ..ReservationFilter::for_space(space_id)
    };
    let existing = state.store.find_reservations(&filter).await?;

    Ok(conflicts_in(&existing, span).cloned().collect())
}

pub async fn is_available(state: &AppState, space_id: &str, span: &Span) -> AppResult<bool> {
    Ok(find_conflicts(state, space_id, span).await?.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::test_state;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 6, 1, hour, minute, 0).unwrap()
    }

    fn span(from: (u32, u32), to: (u32, u32)) -> Span {
        Span::new(at(from.0, from.1), at(to.0, to.1)).unwrap()
    }

    fn booking(id: &str, space: &str, s: Span, status: ReservationStatus) -> Reservation {
        Reservation {
            id: id.to_string(),
            user_id: "u1".to_string(),
            space_id: space.to_string(),
            start_time: s.start,
            end_time: s.end,
            status,
            created_at: at(0, 0),
        }
    }

    #[test]
    fn overlap_cases_against_ten_to_eleven() {
        let existing = vec![booking("r1", "s1", span((10, 0), (11, 0)), ReservationStatus::Confirmed)];

        let conflicting = [
            span((9, 0), (12, 0)),   // candidate contains existing
            span((10, 15), (10, 45)), // existing contains candidate
            span((9, 30), (10, 30)),  // overlaps start edge
            span((10, 30), (11, 30)), // overlaps end edge
            span((10, 0), (11, 0)),   // identical
        ];
        for candidate in conflicting {
            assert_eq!(conflicts_in(&existing, &candidate).count(), 1, "{:?}", candidate);
        }

        let free = [
            span((11, 0), (12, 0)), // starts exactly at end
            span((9, 0), (10, 0)),  // ends exactly at start
            span((12, 0), (13, 0)),
        ];
        for candidate in free {
            assert_eq!(conflicts_in(&existing, &candidate).count(), 0, "{:?}", candidate);
        }
    }

    #[test]
    fn cancelled_reservations_do_not_block() {
        let existing = vec![
            booking("r1", "s1", span((10, 0), (11, 0)), ReservationStatus::Cancelled),
            booking("r2", "s1", span((10, 30), (11, 30)), ReservationStatus::Pending),
        ];
        let hits: Vec<&str> = conflicts_in(&existing, &span((10, 0), (11, 0)))
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(hits, vec!["r2"]);
    }

    #[tokio::test]
    async fn engine_scopes_to_one_space() {
        let state = test_state();
        state
            .store
            .insert_reservation(&booking("r1", "s1", span((10, 0), (11, 0)), ReservationStatus::Confirmed))
            .await
            .unwrap();
        state
            .store
            .insert_reservation(&booking("r2", "s1", span((13, 0), (14, 0)), ReservationStatus::Cancelled))
            .await
            .unwrap();

        assert!(!is_available(&state, "s1", &span((10, 30), (11, 30))).await.unwrap());
        assert!(is_available(&state, "s1", &span((11, 0), (12, 0))).await.unwrap());
        assert!(is_available(&state, "s1", &span((13, 0), (14, 0))).await.unwrap());
        assert!(is_available(&state, "s2", &span((10, 0), (11, 0))).await.unwrap());

        let conflicts = find_conflicts(&state, "s1", &span((9, 0), (15, 0))).await.unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].id, "r1");
    }
}
