//! Lot domain entity

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::billing::validate_price;
use crate::domain::DomainResult;
use crate::shared::errors::DomainError;

#[derive(Debug, Clone, PartialEq)]
pub struct Lot {
    pub id: i32,
    pub name: String,
    pub address: Option<String>,
    pub pin_code: Option<String>,
    pub hourly_price: Decimal,
    /// Declared spot count; equals the number of spots owned by the lot.
    pub capacity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for lot creation
#[derive(Debug, Clone)]
pub struct NewLot {
    pub name: String,
    pub address: Option<String>,
    pub pin_code: Option<String>,
    pub hourly_price: Decimal,
    pub capacity: u32,
}

impl NewLot {
    pub fn new(name: impl Into<String>, hourly_price: Decimal, capacity: u32) -> Self {
        Self {
            name: name.into(),
            address: None,
            pin_code: None,
            hourly_price,
            capacity,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>, pin_code: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self.pin_code = Some(pin_code.into());
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidInput("lot name must not be empty".into()));
        }
        validate_price(self.hourly_price)
    }
}
