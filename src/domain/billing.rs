//! Parking cost calculation
//!
//! `cost = round(hours(end - start) * hourly_price, 2)`, computed in decimal
//! arithmetic. Both timestamps must already be UTC.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::DomainResult;
use crate::shared::errors::DomainError;

const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Money is rounded half away from zero to cents.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn compute_cost(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    hourly_price: Decimal,
) -> DomainResult<Decimal> {
    if end < start {
        return Err(DomainError::InvalidInput(format!(
            "end {} is before start {}",
            end.to_rfc3339(),
            start.to_rfc3339()
        )));
    }
    validate_price(hourly_price)?;

    let millis = Decimal::from((end - start).num_milliseconds());
    let raw = millis * hourly_price / Decimal::from(MILLIS_PER_HOUR);
    Ok(round_money(raw))
}

pub fn validate_price(hourly_price: Decimal) -> DomainResult<()> {
    if hourly_price <= Decimal::ZERO {
        return Err(DomainError::InvalidInput(format!(
            "hourly price must be positive, got {}",
            hourly_price
        )));
    }
    if hourly_price.normalize().scale() > 2 {
        return Err(DomainError::InvalidInput(format!(
            "hourly price {} has more than 2 decimal places",
            hourly_price
        )));
    }
    Ok(())
}

/// Storage keeps money as integer cents.
pub fn to_cents(amount: Decimal) -> DomainResult<i64> {
    (round_money(amount) * Decimal::ONE_HUNDRED)
        .to_i64()
        .ok_or_else(|| DomainError::InvalidInput(format!("amount {} out of range", amount)))
}

pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
