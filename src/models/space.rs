use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SpaceType {
    Desk,
    MeetingRoom,
}

impl SpaceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpaceType::Desk => "desk",
            SpaceType::MeetingRoom => "meeting_room",
        }
    }
}

impl fmt::Display for SpaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpaceType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "desk" => Ok(SpaceType::Desk),
            "meeting_room" => Ok(SpaceType::MeetingRoom),
            other => Err(AppError::InvalidInput(format!(
                "Unknown space type '{}' (expected desk or meeting_room)",
                other
            ))),
        }
    }
}

/// Bookable space (stored in the `spaces` collection).
/// Spaces are never removed; deactivation flips `is_active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
    #[serde(rename = "_id")]
    pub id: String,

    pub name: String,

    #[serde(rename = "type")]
    pub kind: SpaceType,

    pub capacity: i32,

    /// Distinct, trimmed amenity labels
    #[serde(default)]
    pub amenities: Vec<String>,

    pub hourly_rate: f64,

    pub description: Option<String>,

    pub is_active: bool,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

/// Payload for a new space
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct CreateSpaceRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SpaceType,
    pub capacity: i32,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub hourly_rate: f64,
    pub description: Option<String>,
}

/// Partial update; absent fields stay untouched.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateSpaceRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<SpaceType>,
    pub capacity: Option<i32>,
    pub amenities: Option<Vec<String>>,
    pub hourly_rate: Option<f64>,
    pub description: Option<String>,
}

/// Validated changes for one space. Only the fields set here are written, so a
/// concurrent deactivation is never undone by an edit.
#[derive(Debug, Clone)]
pub struct SpaceChanges {
    pub name: Option<String>,
    pub kind: Option<SpaceType>,
    pub capacity: Option<i32>,
    pub amenities: Option<Vec<String>>,
    pub hourly_rate: Option<f64>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub updated_at: DateTime<Utc>,
}

impl SpaceChanges {
    pub fn at(updated_at: DateTime<Utc>) -> Self {
        Self {
            name: None,
            kind: None,
            capacity: None,
            amenities: None,
            hourly_rate: None,
            description: None,
            updated_at,
        }
    }

    pub fn apply_to(&self, space: &mut Space) {
        if let Some(name) = &self.name {
            space.name = name.clone();
        }
        if let Some(kind) = self.kind {
            space.kind = kind;
        }
        if let Some(capacity) = self.capacity {
            space.capacity = capacity;
        }
        if let Some(amenities) = &self.amenities {
            space.amenities = amenities.clone();
        }
        if let Some(rate) = self.hourly_rate {
            space.hourly_rate = rate;
        }
        if let Some(description) = &self.description {
            space.description = description.clone();
        }
        space.updated_at = self.updated_at;
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SpaceResponse {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: SpaceType,
    pub capacity: i32,
    pub amenities: Vec<String>,
    pub hourly_rate: f64,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Space> for SpaceResponse {
    fn from(space: Space) -> Self {
        SpaceResponse {
            id: space.id,
            name: space.name,
            kind: space.kind,
            capacity: space.capacity,
            amenities: space.amenities,
            hourly_rate: space.hourly_rate,
            description: space.description,
            is_active: space.is_active,
            created_at: space.created_at,
            updated_at: space.updated_at,
        }
    }
}
