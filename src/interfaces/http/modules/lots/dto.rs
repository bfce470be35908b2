//! Lot and spot DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::{LotView, SpotDetail};
use crate::domain::{Lot, NewLot, Spot, SpotStatus, SpotStatusCounts};
use crate::interfaces::http::modules::reservations::dto::ReservationDto;

/// Upper bound on spots per request
pub const MAX_SPOTS_PER_REQUEST: u32 = 10_000;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLotRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[validate(length(min = 3, max = 12))]
    pub pin_code: Option<String>,
    /// Price per hour, at most 2 decimal places
    #[schema(value_type = String, example = "10.00")]
    pub hourly_price: Decimal,
    /// Initial number of spots; may be 0
    #[validate(range(max = 10000))]
    pub capacity: u32,
}

impl From<CreateLotRequest> for NewLot {
    fn from(req: CreateLotRequest) -> Self {
        NewLot {
            name: req.name.trim().to_string(),
            address: req.address,
            pin_code: req.pin_code,
            hourly_price: req.hourly_price,
            capacity: req.capacity,
        }
    }
}

/// Body of grow / shrink
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct SpotCountRequest {
    #[validate(range(min = 1, max = 10000))]
    pub count: u32,
}

/// Body of capacity PUT
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResizeRequest {
    #[validate(range(max = 10000))]
    pub capacity: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LotDto {
    pub id: i32,
    pub name: String,
    pub address: Option<String>,
    pub pin_code: Option<String>,
    #[schema(value_type = String, example = "10.00")]
    pub hourly_price: Decimal,
    pub capacity: u32,
    /// Present on reads; omitted after mutations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spots: Option<SpotStatusCounts>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Lot> for LotDto {
    fn from(lot: Lot) -> Self {
        Self {
            id: lot.id,
            name: lot.name,
            address: lot.address,
            pin_code: lot.pin_code,
            hourly_price: lot.hourly_price,
            capacity: lot.capacity,
            spots: None,
            created_at: lot.created_at,
            updated_at: lot.updated_at,
        }
    }
}

impl From<LotView> for LotDto {
    fn from(view: LotView) -> Self {
        Self {
            spots: Some(view.spots),
            ..LotDto::from(view.lot)
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SpotDto {
    pub id: i32,
    pub lot_id: i32,
    pub status: SpotStatus,
}

impl From<Spot> for SpotDto {
    fn from(spot: Spot) -> Self {
        Self {
            id: spot.id,
            lot_id: spot.lot_id,
            status: spot.status,
        }
    }
}

/// Admin view of a spot and whoever holds it
#[derive(Debug, Serialize, ToSchema)]
pub struct SpotDetailDto {
    pub id: i32,
    pub lot_id: i32,
    pub status: SpotStatus,
    pub reservation: Option<ReservationDto>,
}

impl From<SpotDetail> for SpotDetailDto {
    fn from(detail: SpotDetail) -> Self {
        Self {
            id: detail.spot.id,
            lot_id: detail.spot.lot_id,
            status: detail.spot.status,
            reservation: detail.reservation.map(ReservationDto::from),
        }
    }
}
