//! Notification events

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::lot::Lot;
use crate::domain::reservation::{Reservation, ReservationState};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    LotCreated(LotSnapshot),
    CapacityChanged(CapacityChangedEvent),
    LotDeleted(LotSnapshot),
    ReservationCompleted(ReservationSnapshot),
    ReservationCancelled(ReservationSnapshot),
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::LotCreated(_) => "lot_created",
            Event::CapacityChanged(_) => "capacity_changed",
            Event::LotDeleted(_) => "lot_deleted",
            Event::ReservationCompleted(_) => "reservation_completed",
            Event::ReservationCancelled(_) => "reservation_cancelled",
        }
    }

    pub fn lot_id(&self) -> Option<i32> {
        match self {
            Event::LotCreated(e) | Event::LotDeleted(e) => Some(e.lot_id),
            Event::CapacityChanged(e) => Some(e.lot_id),
            Event::ReservationCompleted(e) | Event::ReservationCancelled(e) => e.lot_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotSnapshot {
    pub lot_id: i32,
    pub name: String,
    pub hourly_price: Decimal,
    pub capacity: u32,
    pub timestamp: DateTime<Utc>,
}

impl From<&Lot> for LotSnapshot {
    fn from(lot: &Lot) -> Self {
        Self {
            lot_id: lot.id,
            name: lot.name.clone(),
            hourly_price: lot.hourly_price,
            capacity: lot.capacity,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityChange {
    Grow,
    Shrink,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapacityChangedEvent {
    pub lot_id: i32,
    pub change: CapacityChange,
    pub old_capacity: u32,
    pub new_capacity: u32,
    /// Spots removed by a shrink; empty on grow
    pub removed_spot_ids: Vec<i32>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationSnapshot {
    pub reservation_id: i32,
    pub user_id: String,
    pub lot_id: Option<i32>,
    pub spot_id: Option<i32>,
    pub state: ReservationState,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub cost: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

impl ReservationSnapshot {
    pub fn new(reservation: &Reservation, lot_id: Option<i32>) -> Self {
        Self {
            reservation_id: reservation.id,
            user_id: reservation.user_id.clone(),
            lot_id,
            spot_id: reservation.spot_id,
            state: reservation.state,
            start_time: reservation.start_time,
            end_time: reservation.end_time,
            cost: reservation.cost,
            timestamp: Utc::now(),
        }
    }
}

/// Event envelope with a unique id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

impl EventMessage {
    pub fn new(event: Event) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = Event::CapacityChanged(CapacityChangedEvent {
            lot_id: 3,
            change: CapacityChange::Shrink,
            old_capacity: 5,
            new_capacity: 3,
            removed_spot_ids: vec![11, 12],
            timestamp: Utc::now(),
        });
        let json = serde_json::to_value(EventMessage::new(event)).unwrap();
        assert_eq!(json["type"], "CapacityChanged");
        assert_eq!(json["data"]["change"], "shrink");
        assert_eq!(json["data"]["removed_spot_ids"][1], 12);
        assert!(json["id"].is_string());
    }
}
