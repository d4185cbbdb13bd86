use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::{error::AppError, time::Timestamp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the reservation still occupies its time slot.
    pub fn holds_slot(&self) -> bool {
        !matches!(self, ReservationStatus::Cancelled)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(ReservationStatus::Pending),
            "confirmed" => Ok(ReservationStatus::Confirmed),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            other => Err(AppError::InvalidInput(format!("Invalid status '{}'", other))),
        }
    }
}

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Span {
    /// Fails unless `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, AppError> {
        if start >= end {
            return Err(AppError::InvalidInput(
                "Start time must be before end time".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    /// Touching edges (`self.end == other.start`) do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_span(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// Reservation document (stored in the `reservations` collection)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub space_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    pub status: ReservationStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn span(&self) -> Span {
        Span {
            start: self.start_time,
            end: self.end_time,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateReservationRequest {
    pub space_id: String,
    /// ISO-8601 string or epoch milliseconds
    #[schema(value_type = String)]
    pub start_time: Timestamp,
    #[schema(value_type = String)]
    pub end_time: Timestamp,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Interval passed as query parameters (`start_time`, `end_time`)
#[derive(Debug, Deserialize)]
pub struct IntervalQuery {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ReservationResponse {
    pub id: String,
    pub user_id: String,
    pub space_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl ReservationResponse {
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }
}

impl From<Reservation> for ReservationResponse {
    fn from(r: Reservation) -> Self {
        ReservationResponse {
            id: r.id,
            user_id: r.user_id,
            space_id: r.space_id,
            start_time: r.start_time,
            end_time: r.end_time,
            status: r.status,
            created_at: r.created_at,
            price: None,
        }
    }
}
