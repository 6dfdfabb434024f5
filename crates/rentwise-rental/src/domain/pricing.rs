//! Per-vehicle-type pricing rules and the rate calculator.
//!
//! A rule carries a base daily rate and four adjustments. Weekend and holiday
//! multipliers replace the base rate (holiday wins when both apply); the
//! long-term factor then scales whatever daily rate was selected, but only for
//! rentals of [`LONG_TERM_MIN_DAYS`] days or more. The long-term "discount" is
//! stored as a multiplicative factor: `0.9` means ten percent off.

use crate::domain::bookings::RentalPeriod;
use crate::domain::types::{round_money, PricingId, VehicleType};
use crate::error::{RentalError, Result};
use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Minimum number of days for the long-term factor to apply.
pub const LONG_TERM_MIN_DAYS: u32 = 7;

/// Rate inputs for creating or replacing a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPricingRule {
    pub vehicle_type: VehicleType,
    pub base_daily_rate: Decimal,
    pub weekend_multiplier: Decimal,
    pub holiday_multiplier: Decimal,
    pub long_term_discount: Decimal,
    pub insurance_daily_rate: Decimal,
}

impl NewPricingRule {
    pub fn validate(&self) -> Result<()> {
        if self.base_daily_rate <= Decimal::ZERO {
            return Err(RentalError::Validation(format!(
                "base daily rate must be positive, got {}",
                self.base_daily_rate
            )));
        }
        if self.weekend_multiplier <= Decimal::ZERO || self.holiday_multiplier <= Decimal::ZERO {
            return Err(RentalError::Validation(
                "weekend and holiday multipliers must be positive".to_string(),
            ));
        }
        if self.long_term_discount <= Decimal::ZERO || self.long_term_discount > Decimal::ONE {
            return Err(RentalError::Validation(format!(
                "long-term discount factor must be in (0, 1], got {}",
                self.long_term_discount
            )));
        }
        if self.insurance_daily_rate < Decimal::ZERO {
            return Err(RentalError::Validation(
                "insurance daily rate cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Stored pricing rule; there is exactly one per vehicle type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingRule {
    pub id: PricingId,
    pub vehicle_type: VehicleType,
    pub base_daily_rate: Decimal,
    pub weekend_multiplier: Decimal,
    pub holiday_multiplier: Decimal,
    pub long_term_discount: Decimal,
    pub insurance_daily_rate: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which adjustments apply to a rental.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateFlags {
    pub weekend: bool,
    pub holiday: bool,
    pub long_term: bool,
}

impl RateFlags {
    /// Derive the flags from the days actually rented.
    ///
    /// The end date is the return day and is not charged, so only
    /// `start..end` is inspected.
    pub fn for_period(period: &RentalPeriod, holidays: &HolidayCalendar) -> Self {
        let mut flags = RateFlags {
            long_term: period.days() >= LONG_TERM_MIN_DAYS,
            ..Default::default()
        };

        for day in period.rented_days() {
            if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                flags.weekend = true;
            }
            if holidays.contains(day) {
                flags.holiday = true;
            }
        }

        flags
    }
}

/// Dates priced with the holiday multiplier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HolidayCalendar {
    dates: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.contains(&date)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Priced breakdown of a prospective rental, rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub vehicle_type: VehicleType,
    pub days: u32,
    pub flags: RateFlags,
    pub include_insurance: bool,
    pub daily_rate: Decimal,
    pub rental_cost: Decimal,
    pub insurance_cost: Decimal,
    pub discount_amount: Decimal,
    pub total: Decimal,
}

impl PricingRule {
    pub fn weekend_rate(&self) -> Decimal {
        self.base_daily_rate * self.weekend_multiplier
    }

    pub fn holiday_rate(&self) -> Decimal {
        self.base_daily_rate * self.holiday_multiplier
    }

    pub fn long_term_rate(&self) -> Decimal {
        self.base_daily_rate * self.long_term_discount
    }

    pub fn is_long_term_rental(&self, days: u32) -> bool {
        days >= LONG_TERM_MIN_DAYS
    }

    /// Daily rate after the weekend/holiday and long-term adjustments.
    ///
    /// The long-term flag is ignored for rentals shorter than
    /// [`LONG_TERM_MIN_DAYS`].
    pub fn daily_rate(&self, days: u32, flags: RateFlags) -> Decimal {
        let mut rate = if flags.holiday {
            self.holiday_rate()
        } else if flags.weekend {
            self.weekend_rate()
        } else {
            self.base_daily_rate
        };

        if flags.long_term && self.is_long_term_rental(days) {
            rate *= self.long_term_discount;
        }

        rate
    }

    /// Rental cost without insurance.
    pub fn total_rate(&self, days: u32, flags: RateFlags) -> Decimal {
        self.daily_rate(days, flags) * Decimal::from(days)
    }

    pub fn insurance_total(&self, days: u32) -> Decimal {
        self.insurance_daily_rate * Decimal::from(days)
    }

    /// Savings of the long-term rate over the base rate, for display.
    pub fn discount_amount(&self, days: u32) -> Decimal {
        if !self.is_long_term_rental(days) {
            return Decimal::ZERO;
        }
        let days = Decimal::from(days);
        self.base_daily_rate * days - self.long_term_rate() * days
    }

    pub fn quote(&self, days: u32, flags: RateFlags, include_insurance: bool) -> Result<Quote> {
        if days < 1 {
            return Err(RentalError::Validation(
                "a rental must last at least one day".to_string(),
            ));
        }

        let rental_cost = self.total_rate(days, flags);
        let insurance_cost = if include_insurance {
            self.insurance_total(days)
        } else {
            Decimal::ZERO
        };
        let discount_amount = if flags.long_term {
            self.discount_amount(days)
        } else {
            Decimal::ZERO
        };

        Ok(Quote {
            vehicle_type: self.vehicle_type,
            days,
            flags,
            include_insurance,
            daily_rate: round_money(self.daily_rate(days, flags)),
            rental_cost: round_money(rental_cost),
            insurance_cost: round_money(insurance_cost),
            discount_amount: round_money(discount_amount),
            total: round_money(rental_cost + insurance_cost),
        })
    }
}
