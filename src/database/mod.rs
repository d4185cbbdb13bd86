pub mod memory;
pub mod store;

pub use memory::MemoryStore;
pub use store::{ReservationFilter, Store};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};
use std::error::Error;

use crate::models::{Reservation, ReservationStatus, Space, SpaceChanges, SpaceType, User};
use crate::utils::error::{AppError, AppResult};

const USERS: &str = "users";
const SPACES: &str = "spaces";
const RESERVATIONS: &str = "reservations";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(2);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = uri
            .rsplit('/')
            .next()
            .and_then(|s| s.split('?').next())
            .filter(|s| !s.is_empty() && !s.contains(':'))
            .unwrap_or("coworking");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes the booking queries rely on
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        log::info!("🔧 Creating database indexes...");

        // users(email) unique - backs the registration uniqueness rule
        let users = self.collection::<Document>(USERS);
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match users.create_index(email_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(email) unique"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // spaces(is_active, name) - catalog listing
        let spaces = self.collection::<Document>(SPACES);
        let spaces_index = IndexModel::builder()
            .keys(doc! { "is_active": 1, "name": 1 })
            .build();

        match spaces.create_index(spaces_index).await {
            Ok(_) => log::info!("   ✅ Index created: spaces(is_active, name)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // spaces(name) unique among active spaces - enforced at write time
        let active_name_index = IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(
                IndexOptions::builder()
                    .name("spaces_active_name_unique".to_string())
                    .unique(true)
                    .partial_filter_expression(doc! { "is_active": true })
                    .build(),
            )
            .build();

        match spaces.create_index(active_name_index).await {
            Ok(_) => log::info!("   ✅ Index created: spaces(name) unique where is_active"),
            Err(e) => log::warn!("⚠️  Could not create spaces(name) unique index: {}", e),
        }

        // reservations(space_id, status) - availability scans
        let reservations = self.collection::<Document>(RESERVATIONS);
        let availability_index = IndexModel::builder()
            .keys(doc! { "space_id": 1, "status": 1, "start_time": 1 })
            .build();

        match reservations.create_index(availability_index).await {
            Ok(_) => log::info!("   ✅ Index created: reservations(space_id, status, start_time)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // reservations(user_id, start_time) - "my reservations"
        let user_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "start_time": 1 })
            .build();

        match reservations.create_index(user_index).await {
            Ok(_) => log::info!("   ✅ Index created: reservations(user_id, start_time)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }
}

const DUPLICATE_KEY: i32 = 11000;

// insert_one reports a write error, findAndModify a command error
fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    match *e.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref write_error)) => {
            write_error.code == DUPLICATE_KEY
        }
        ErrorKind::Command(ref command_error) => command_error.code == DUPLICATE_KEY,
        _ => false,
    }
}

fn space_name_conflict(name: &str) -> AppError {
    AppError::Conflict(format!("A space named '{}' already exists", name))
}

/// `$set` document holding only the supplied fields.
fn space_changes_doc(changes: &SpaceChanges) -> Document {
    let mut set = doc! { "updated_at": changes.updated_at.timestamp_millis() };

    if let Some(name) = &changes.name {
        set.insert("name", name.as_str());
    }
    if let Some(kind) = changes.kind {
        set.insert("type", kind.as_str());
    }
    if let Some(capacity) = changes.capacity {
        set.insert("capacity", capacity);
    }
    if let Some(amenities) = &changes.amenities {
        set.insert("amenities", amenities.clone());
    }
    if let Some(rate) = changes.hourly_rate {
        set.insert("hourly_rate", rate);
    }
    if let Some(description) = &changes.description {
        set.insert("description", description.clone());
    }

    doc! { "$set": set }
}

fn reservation_filter_doc(filter: &ReservationFilter) -> Document {
    let mut query = doc! {};

    if let Some(space_id) = &filter.space_id {
        query.insert("space_id", space_id.as_str());
    }
    if let Some(user_id) = &filter.user_id {
        query.insert("user_id", user_id.as_str());
    }

    let mut status = Document::new();
    if let Some(s) = filter.status {
        status.insert("$eq", s.as_str());
    }
    if let Some(s) = filter.exclude_status {
        status.insert("$ne", s.as_str());
    }
    if !status.is_empty() {
        query.insert("status", status);
    }

    if let Some(t) = filter.starts_from {
        query.insert("start_time", doc! { "$gte": t.timestamp_millis() });
    }
    if let Some(t) = filter.ends_by {
        query.insert("end_time", doc! { "$lte": t.timestamp_millis() });
    }

    query
}

#[async_trait]
impl Store for MongoDB {
    async fn ping(&self) -> AppResult<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> AppResult<()> {
        match self.collection::<User>(USERS).insert_one(user).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => {
                Err(AppError::Conflict("Email already in use".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_id(&self, id: &str) -> AppResult<Option<User>> {
        Ok(self
            .collection::<User>(USERS)
            .find_one(doc! { "_id": id })
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        Ok(self
            .collection::<User>(USERS)
            .find_one(doc! { "email": email })
            .await?)
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let cursor = self
            .collection::<User>(USERS)
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_space(&self, space: &Space) -> AppResult<()> {
        match self.collection::<Space>(SPACES).insert_one(space).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(space_name_conflict(&space.name)),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_space(&self, id: &str) -> AppResult<Option<Space>> {
        Ok(self
            .collection::<Space>(SPACES)
            .find_one(doc! { "_id": id })
            .await?)
    }

    async fn find_active_space_by_name(&self, name: &str) -> AppResult<Option<Space>> {
        Ok(self
            .collection::<Space>(SPACES)
            .find_one(doc! { "name": name, "is_active": true })
            .await?)
    }

    async fn list_active_spaces(&self, kind: Option<SpaceType>) -> AppResult<Vec<Space>> {
        let mut filter = doc! { "is_active": true };
        if let Some(kind) = kind {
            filter.insert("type", kind.as_str());
        }

        let cursor = self
            .collection::<Space>(SPACES)
            .find(filter)
            .sort(doc! { "name": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_space(&self, id: &str, changes: &SpaceChanges) -> AppResult<Option<Space>> {
        let result = self
            .collection::<Space>(SPACES)
            .find_one_and_update(doc! { "_id": id }, space_changes_doc(changes))
            .return_document(ReturnDocument::After)
            .await;

        match result {
            Ok(space) => Ok(space),
            Err(e) if is_duplicate_key(&e) => Err(space_name_conflict(
                changes.name.as_deref().unwrap_or_default(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn deactivate_space(&self, id: &str, at: DateTime<Utc>) -> AppResult<Option<Space>> {
        Ok(self
            .collection::<Space>(SPACES)
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$set": { "is_active": false, "updated_at": at.timestamp_millis() } },
            )
            .return_document(ReturnDocument::After)
            .await?)
    }

    async fn insert_reservation(&self, reservation: &Reservation) -> AppResult<()> {
        self.collection::<Reservation>(RESERVATIONS)
            .insert_one(reservation)
            .await?;
        Ok(())
    }

    async fn find_reservation(&self, id: &str) -> AppResult<Option<Reservation>> {
        Ok(self
            .collection::<Reservation>(RESERVATIONS)
            .find_one(doc! { "_id": id })
            .await?)
    }

    async fn find_reservations(&self, filter: &ReservationFilter) -> AppResult<Vec<Reservation>> {
        let cursor = self
            .collection::<Reservation>(RESERVATIONS)
            .find(reservation_filter_doc(filter))
            .sort(doc! { "start_time": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn set_reservation_status(
        &self,
        id: &str,
        status: ReservationStatus,
    ) -> AppResult<Option<Reservation>> {
        Ok(self
            .collection::<Reservation>(RESERVATIONS)
            .find_one_and_update(
                doc! { "_id": id },
                doc! { "$set": { "status": status.as_str() } },
            )
            .return_document(ReturnDocument::After)
            .await?)
    }
}
