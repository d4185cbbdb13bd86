//! Fixtures shared by the service tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Timelike, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use crate::config::AppConfig;
use crate::database::{MemoryStore, ReservationFilter, Store};
use crate::models::{
    CreateSpaceRequest, Reservation, ReservationStatus, Role, Space, SpaceChanges, SpaceType, User,
};
use crate::utils::error::AppResult;
use crate::services::auth_service::{Caller, IdentityClaim};
use crate::services::space_service;
use crate::state::AppState;

pub fn test_state() -> AppState {
    state_with(MemoryStore::new())
}

pub fn state_with(store: impl Store + 'static) -> AppState {
    AppState::new(Arc::new(store), AppConfig::for_tests())
}

pub fn member(id: &str) -> Caller {
    Caller::authenticated(IdentityClaim {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        role: Role::Member,
    })
}

pub fn admin(id: &str) -> Caller {
    Caller::authenticated(IdentityClaim {
        id: id.to_string(),
        email: format!("{}@example.com", id),
        role: Role::Admin,
    })
}

/// Tomorrow at `hour:minute` UTC, always in the future.
pub fn tomorrow_at(hour: u32, minute: u32) -> DateTime<Utc> {
    (Utc::now() + Duration::days(1))
        .with_hour(hour)
        .and_then(|t| t.with_minute(minute))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap()
}

pub fn space_request(name: &str) -> CreateSpaceRequest {
    CreateSpaceRequest {
        name: name.to_string(),
        kind: SpaceType::MeetingRoom,
        capacity: 8,
        amenities: vec!["projector".to_string(), "whiteboard".to_string()],
        hourly_rate: 10.0,
        description: Some("Quiet room".to_string()),
    }
}

pub async fn seed_space(state: &AppState, name: &str) -> Space {
    space_service::create_space(state, &admin("admin-1"), &space_request(name))
        .await
        .unwrap()
}

/// `MemoryStore` that stalls after selected reads, so a test can land a second
/// operation between another one's read and its write.
#[derive(Default)]
pub struct DelayedStore {
    inner: MemoryStore,
    name_lookup_delay: StdDuration,
    first_find_space_delay: StdDuration,
    find_space_seen: AtomicBool,
}

impl DelayedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name_lookup_delay(mut self, delay: StdDuration) -> Self {
        self.name_lookup_delay = delay;
        self
    }

    pub fn with_first_find_space_delay(mut self, delay: StdDuration) -> Self {
        self.first_find_space_delay = delay;
        self
    }
}

#[async_trait]
impl Store for DelayedStore {
    async fn ping(&self) -> AppResult<()> {
        self.inner.ping().await
    }

    async fn insert_user(&self, user: &User) -> AppResult<()> {
        self.inner.insert_user(user).await
    }

    async fn find_user_by_id(&self, id: &str) -> AppResult<Option<User>> {
        self.inner.find_user_by_id(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.inner.find_user_by_email(email).await
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        self.inner.list_users().await
    }

    async fn insert_space(&self, space: &Space) -> AppResult<()> {
        self.inner.insert_space(space).await
    }

    async fn find_space(&self, id: &str) -> AppResult<Option<Space>> {
        let found = self.inner.find_space(id).await;
        if !self.find_space_seen.swap(true, Ordering::SeqCst) {
            tokio::time::sleep(self.first_find_space_delay).await;
        }
        found
    }

    async fn find_active_space_by_name(&self, name: &str) -> AppResult<Option<Space>> {
        let found = self.inner.find_active_space_by_name(name).await;
        tokio::time::sleep(self.name_lookup_delay).await;
        found
    }

    async fn list_active_spaces(&self, kind: Option<SpaceType>) -> AppResult<Vec<Space>> {
        self.inner.list_active_spaces(kind).await
    }

    async fn update_space(&self, id: &str, changes: &SpaceChanges) -> AppResult<Option<Space>> {
        self.inner.update_space(id, changes).await
    }

    async fn deactivate_space(&self, id: &str, at: DateTime<Utc>) -> AppResult<Option<Space>> {
        self.inner.deactivate_space(id, at).await
    }

    async fn insert_reservation(&self, reservation: &Reservation) -> AppResult<()> {
        self.inner.insert_reservation(reservation).await
    }

    async fn find_reservation(&self, id: &str) -> AppResult<Option<Reservation>> {
        self.inner.find_reservation(id).await
    }

    async fn find_reservations(&self, filter: &ReservationFilter) -> AppResult<Vec<Reservation>> {
        self.inner.find_reservations(filter).await
    }

    async fn set_reservation_status(
        &self,
        id: &str,
        status: ReservationStatus,
    ) -> AppResult<Option<Reservation>> {
        self.inner.set_reservation_status(id, status).await
    }
}
