use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::store::{ReservationFilter, Store};
use crate::models::{Reservation, ReservationStatus, Space, SpaceChanges, SpaceType, User};
use crate::utils::error::{AppError, AppResult};

#[derive(Default)]
struct Collections {
    users: HashMap<String, User>,
    spaces: HashMap<String, Space>,
    reservations: HashMap<String, Reservation>,
}

impl Collections {
    // Mirrors the partial unique index on spaces.name where is_active
    fn active_name_taken(&self, name: &str, except_id: &str) -> bool {
        self.spaces
            .values()
            .any(|s| s.is_active && s.name == name && s.id != except_id)
    }
}

fn name_conflict(name: &str) -> AppError {
    AppError::Conflict(format!("A space named '{}' already exists", name))
}

/// In-process document store. Used by the test suite and by `STORAGE_BACKEND=memory`.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        // Mirrors the unique index on users.email
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already in use".to_string()));
        }
        inner.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let mut users: Vec<User> = self.inner.read().await.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn insert_space(&self, space: &Space) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if space.is_active && inner.active_name_taken(&space.name, &space.id) {
            return Err(name_conflict(&space.name));
        }
        inner.spaces.insert(space.id.clone(), space.clone());
        Ok(())
    }

    async fn find_space(&self, id: &str) -> AppResult<Option<Space>> {
        Ok(self.inner.read().await.spaces.get(id).cloned())
    }

    async fn find_active_space_by_name(&self, name: &str) -> AppResult<Option<Space>> {
        let inner = self.inner.read().await;
        Ok(inner
            .spaces
            .values()
            .find(|s| s.is_active && s.name == name)
            .cloned())
    }

    async fn list_active_spaces(&self, kind: Option<SpaceType>) -> AppResult<Vec<Space>> {
        let inner = self.inner.read().await;
        let mut spaces: Vec<Space> = inner
            .spaces
            .values()
            .filter(|s| s.is_active && kind.map_or(true, |k| s.kind == k))
            .cloned()
            .collect();
        spaces.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(spaces)
    }

    async fn update_space(&self, id: &str, changes: &SpaceChanges) -> AppResult<Option<Space>> {
        let mut inner = self.inner.write().await;
        let is_active = match inner.spaces.get(id) {
            Some(space) => space.is_active,
            None => return Ok(None),
        };
        if let Some(name) = &changes.name {
            if is_active && inner.active_name_taken(name, id) {
                return Err(name_conflict(name));
            }
        }
        Ok(inner.spaces.get_mut(id).map(|space| {
            changes.apply_to(space);
            space.clone()
        }))
    }

    async fn deactivate_space(&self, id: &str, at: DateTime<Utc>) -> AppResult<Option<Space>> {
        let mut inner = self.inner.write().await;
        Ok(inner.spaces.get_mut(id).map(|space| {
            space.is_active = false;
            space.updated_at = at;
            space.clone()
        }))
    }

    async fn insert_reservation(&self, reservation: &Reservation) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .reservations
            .insert(reservation.id.clone(), reservation.clone());
        Ok(())
    }

    async fn find_reservation(&self, id: &str) -> AppResult<Option<Reservation>> {
        Ok(self.inner.read().await.reservations.get(id).cloned())
    }

    async fn find_reservations(&self, filter: &ReservationFilter) -> AppResult<Vec<Reservation>> {
        let inner = self.inner.read().await;
        let mut found: Vec<Reservation> = inner
            .reservations
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(found)
    }

    async fn set_reservation_status(
        &self,
        id: &str,
        status: ReservationStatus,
    ) -> AppResult<Option<Reservation>> {
        let mut inner = self.inner.write().await;
        Ok(inner.reservations.get_mut(id).map(|r| {
            r.status = status;
            r.clone()
        }))
    }
}
