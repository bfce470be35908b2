//! Spot domain entity

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::DomainResult;
use crate::shared::errors::DomainError;

/// Spot status
///
/// ```text
/// Available ──allocate──▶ Reserved ──check-in──▶ Occupied
///     ▲                      │                       │
///     └──────cancel──────────┘                       │
///     └──────────────────check-out───────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum SpotStatus {
    Available,
    Reserved,
    Occupied,
}

impl SpotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Reserved => "Reserved",
            Self::Occupied => "Occupied",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Available" => Some(Self::Available),
            "Reserved" => Some(Self::Reserved),
            "Occupied" => Some(Self::Occupied),
            _ => None,
        }
    }

    pub fn can_transition_to(self, next: SpotStatus) -> bool {
        matches!(
            (self, next),
            (Self::Available, Self::Reserved)
                | (Self::Reserved, Self::Occupied)
                | (Self::Reserved, Self::Available)
                | (Self::Occupied, Self::Available)
        )
    }

    /// Reserved or Occupied: referenced by a live reservation.
    pub fn is_in_use(self) -> bool {
        self != Self::Available
    }
}

impl std::fmt::Display for SpotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spot {
    pub id: i32,
    pub lot_id: i32,
    pub status: SpotStatus,
}

impl Spot {
    pub fn new(id: i32, lot_id: i32) -> Self {
        Self {
            id,
            lot_id,
            status: SpotStatus::Available,
        }
    }

    /// Apply a state-machine move; an illegal move leaves the spot unchanged.
    pub fn transition(&mut self, next: SpotStatus) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition(format!(
                "spot {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

/// Per-status spot tally for one lot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SpotStatusCounts {
    pub available: u32,
    pub reserved: u32,
    pub occupied: u32,
    pub total: u32,
}

impl SpotStatusCounts {
    pub fn record(&mut self, status: SpotStatus) {
        match status {
            SpotStatus::Available => self.available += 1,
            SpotStatus::Reserved => self.reserved += 1,
            SpotStatus::Occupied => self.occupied += 1,
        }
        self.total += 1;
    }

    pub fn in_use(&self) -> u32 {
        self.reserved + self.occupied
    }
}

impl<'a> FromIterator<&'a Spot> for SpotStatusCounts {
    fn from_iter<I: IntoIterator<Item = &'a Spot>>(iter: I) -> Self {
        let mut counts = Self::default();
        for spot in iter {
            counts.record(spot.status);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SpotStatus; 3] = [
        SpotStatus::Available,
        SpotStatus::Reserved,
        SpotStatus::Occupied,
    ];

    #[test]
    fn only_four_moves_are_legal() {
        let legal: Vec<(SpotStatus, SpotStatus)> = ALL
            .iter()
            .flat_map(|a| ALL.iter().map(move |b| (*a, *b)))
            .filter(|(a, b)| a.can_transition_to(*b))
            .collect();
        assert_eq!(legal.len(), 4);
        assert!(!SpotStatus::Available.can_transition_to(SpotStatus::Occupied));
        assert!(!SpotStatus::Occupied.can_transition_to(SpotStatus::Reserved));
    }

    #[test]
    fn illegal_transition_leaves_state_unchanged() {
        let mut spot = Spot::new(1, 1);
        let err = spot.transition(SpotStatus::Occupied).unwrap_err();
        assert!(matches!(err, DomainError::InvalidTransition(_)));
        assert_eq!(spot.status, SpotStatus::Available);
    }

    #[test]
    fn full_cycle() {
        let mut spot = Spot::new(1, 1);
        spot.transition(SpotStatus::Reserved).unwrap();
        spot.transition(SpotStatus::Occupied).unwrap();
        assert!(spot.transition(SpotStatus::Occupied).is_err());
        spot.transition(SpotStatus::Available).unwrap();
        assert!(!spot.status.is_in_use());
    }

    #[test]
    fn parse_rejects_legacy_codes() {
        assert_eq!(SpotStatus::parse("Reserved"), Some(SpotStatus::Reserved));
        assert_eq!(SpotStatus::parse("O"), None);
    }

    #[test]
    fn counts_tally_by_status() {
        let mut spots = vec![Spot::new(1, 1), Spot::new(2, 1), Spot::new(3, 1)];
        spots[1].status = SpotStatus::Reserved;
        spots[2].status = SpotStatus::Occupied;
        let counts: SpotStatusCounts = spots.iter().collect();
        assert_eq!(
            counts,
            SpotStatusCounts {
                available: 1,
                reserved: 1,
                occupied: 1,
                total: 3
            }
        );
        assert_eq!(counts.in_use(), 2);
    }
}
