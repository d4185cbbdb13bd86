use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Reservation, ReservationStatus, Space, SpaceChanges, SpaceType, User};
use crate::utils::error::AppResult;

/// Selection over the `reservations` collection. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    pub space_id: Option<String>,
    pub user_id: Option<String>,
    pub status: Option<ReservationStatus>,
    pub exclude_status: Option<ReservationStatus>,
    /// `start_time >= starts_from`
    pub starts_from: Option<DateTime<Utc>>,
    /// `end_time <= ends_by`
    pub ends_by: Option<DateTime<Utc>>,
}

impl ReservationFilter {
    pub fn for_space(space_id: &str) -> Self {
        Self {
            space_id: Some(space_id.to_string()),
            ..Default::default()
        }
    }

    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            ..Default::default()
        }
    }

    pub fn matches(&self, r: &Reservation) -> bool {
        self.space_id.as_deref().map_or(true, |id| r.space_id == id)
            && self.user_id.as_deref().map_or(true, |id| r.user_id == id)
            && self.status.map_or(true, |s| r.status == s)
            && self.exclude_status.map_or(true, |s| r.status != s)
            && self.starts_from.map_or(true, |t| r.start_time >= t)
            && self.ends_by.map_or(true, |t| r.end_time <= t)
    }
}

/// Document store the services talk to. Reads return `None` or an empty list for
/// missing data; `Err` is reserved for storage faults.
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> AppResult<()>;

    async fn insert_user(&self, user: &User) -> AppResult<()>;
    async fn find_user_by_id(&self, id: &str) -> AppResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    /// Newest first.
    async fn list_users(&self) -> AppResult<Vec<User>>;

    /// `Conflict` when another active space already has this name.
    async fn insert_space(&self, space: &Space) -> AppResult<()>;
    async fn find_space(&self, id: &str) -> AppResult<Option<Space>>;
    async fn find_active_space_by_name(&self, name: &str) -> AppResult<Option<Space>>;
    /// Active spaces ordered by name.
    async fn list_active_spaces(&self, kind: Option<SpaceType>) -> AppResult<Vec<Space>>;
    /// Writes only the fields set in `changes`. Returns the updated document, `None`
    /// for an unknown id, `Conflict` when a rename collides with another active space.
    async fn update_space(&self, id: &str, changes: &SpaceChanges) -> AppResult<Option<Space>>;
    /// Sets `is_active = false` and nothing else but `updated_at`.
    async fn deactivate_space(&self, id: &str, at: DateTime<Utc>) -> AppResult<Option<Space>>;

    async fn insert_reservation(&self, reservation: &Reservation) -> AppResult<()>;
    async fn find_reservation(&self, id: &str) -> AppResult<Option<Reservation>>;
    /// Ordered by start time ascending.
    async fn find_reservations(&self, filter: &ReservationFilter) -> AppResult<Vec<Reservation>>;
    /// Returns the updated document, or `None` when the id is unknown.
    async fn set_reservation_status(
        &self,
        id: &str,
        status: ReservationStatus,
    ) -> AppResult<Option<Reservation>>;
}
