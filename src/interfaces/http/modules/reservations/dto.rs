//! Reservation DTOs

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::{Reservation, ReservationState};

/// Booking request. Both fields are optional; `{}` books from now.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct AllocateRequest {
    /// RFC 3339 with any offset; stored as UTC
    #[schema(value_type = Option<String>, example = "2026-10-14T09:00:00+05:30")]
    pub start_time: Option<DateTime<FixedOffset>>,
    #[validate(length(min = 1, max = 20))]
    pub vehicle_number: Option<String>,
}

impl AllocateRequest {
    pub fn start_time_utc(&self) -> Option<DateTime<Utc>> {
        self.start_time.map(|t| t.with_timezone(&Utc))
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct CheckOutRequest {
    /// RFC 3339 with any offset; defaults to now
    #[schema(value_type = Option<String>, example = "2026-10-14T11:00:00Z")]
    pub end_time: Option<DateTime<FixedOffset>>,
}

impl CheckOutRequest {
    pub fn end_time_utc(&self) -> Option<DateTime<Utc>> {
        self.end_time.map(|t| t.with_timezone(&Utc))
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListReservationsQuery {
    /// Admin only: every user's reservations
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReservationDto {
    pub id: i32,
    pub user_id: String,
    /// `null` once the spot has been removed from its lot
    pub spot_id: Option<i32>,
    pub vehicle_number: Option<String>,
    pub state: ReservationState,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, example = "20.00")]
    pub cost: Option<Decimal>,
    pub created_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationDto {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            spot_id: r.spot_id,
            vehicle_number: r.vehicle_number,
            state: r.state,
            start_time: r.start_time,
            end_time: r.end_time,
            cost: r.cost,
            created_at: r.created_at,
        }
    }
}
