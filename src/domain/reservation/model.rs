//! Reservation domain entity

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::DomainResult;
use crate::shared::errors::DomainError;

/// Reservation lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ReservationState {
    /// Spot claimed, parking not yet finished
    Active,
    /// Checked out; end timestamp and cost are set
    Completed,
    /// Withdrawn before check-in
    Cancelled,
}

impl ReservationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Active" => Some(Self::Active),
            "Completed" => Some(Self::Completed),
            "Cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReservationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub id: i32,
    pub user_id: String,
    /// `None` once the spot has been removed from its lot.
    pub spot_id: Option<i32>,
    pub vehicle_number: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub cost: Option<Decimal>,
    pub state: ReservationState,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn is_active(&self) -> bool {
        self.state == ReservationState::Active
    }

    /// Close the reservation. End time and cost are written together, once.
    pub fn complete(&mut self, end_time: DateTime<Utc>, cost: Decimal) -> DomainResult<()> {
        self.require_active("complete")?;
        self.end_time = Some(end_time);
        self.cost = Some(cost);
        self.state = ReservationState::Completed;
        Ok(())
    }

    pub fn cancel(&mut self) -> DomainResult<()> {
        self.require_active("cancel")?;
        self.state = ReservationState::Cancelled;
        Ok(())
    }

    pub fn require_active(&self, action: &str) -> DomainResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(DomainError::InvalidTransition(format!(
                "cannot {} reservation {} in state {}",
                action, self.id, self.state
            )))
        }
    }
}

/// Input for a new Active reservation on a specific spot
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub user_id: String,
    pub spot_id: i32,
    pub vehicle_number: Option<String>,
    pub start_time: DateTime<Utc>,
}

// ── Tests ──────────────────────────────────────────────────────
