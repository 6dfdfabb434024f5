use crate::domain::types::{BookingId, BookingStatus, PaymentStatus, UserId, VehicleId};
use crate::error::{RentalError, Result};
use chrono::{DateTime, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Pick-up and return dates of a rental. The return day is not charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl RentalPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end <= start {
            return Err(RentalError::InvalidPeriod { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of charged days, always at least one.
    pub fn days(&self) -> u32 {
        u32::try_from((self.end - self.start).num_days()).unwrap_or(u32::MAX)
    }

    /// Charged days, `start` inclusive and `end` exclusive.
    pub fn rented_days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        std::iter::successors(Some(self.start), |d| d.checked_add_days(Days::new(1)))
            .take_while(move |d| *d < end)
    }

    pub fn overlaps(&self, other: &RentalPeriod) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub vehicle_id: VehicleId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub total_amount: Decimal,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn period(&self) -> Result<RentalPeriod> {
        RentalPeriod::new(self.start_date, self.end_date)
    }

    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }

    pub fn is_pending(&self) -> bool {
        self.status == BookingStatus::Pending
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }

    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Active
    }

    pub fn is_completed(&self) -> bool {
        self.status == BookingStatus::Completed
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == BookingStatus::Cancelled
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }

    pub fn can_be_cancelled(&self) -> bool {
        self.status.can_transition_to(BookingStatus::Cancelled)
    }

    /// Copy of this booking in `next` status, if the lifecycle allows it.
    pub fn with_status(&self, next: BookingStatus, now: DateTime<Utc>) -> Result<Booking> {
        if !self.status.can_transition_to(next) {
            return Err(RentalError::InvalidStateTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        Ok(Booking {
            status: next,
            updated_at: now,
            ..self.clone()
        })
    }

    pub fn with_payment_status(&self, next: PaymentStatus, now: DateTime<Utc>) -> Result<Booking> {
        if !self.payment_status.can_transition_to(next) {
            return Err(RentalError::InvalidPaymentTransition {
                from: self.payment_status.to_string(),
                to: next.to_string(),
            });
        }
        Ok(Booking {
            payment_status: next,
            updated_at: now,
            ..self.clone()
        })
    }
}

/// Customer request for a new booking; the total is priced by the desk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBookingRequest {
    pub user_id: UserId,
    pub vehicle_id: VehicleId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub include_insurance: bool,
}

impl NewBookingRequest {
    pub fn period(&self) -> Result<RentalPeriod> {
        RentalPeriod::new(self.start_date, self.end_date)
    }

    pub fn validate(&self) -> Result<RentalPeriod> {
        if self.pickup_location.trim().is_empty() {
            return Err(RentalError::Validation(
                "pickup location is required".to_string(),
            ));
        }
        if self.dropoff_location.trim().is_empty() {
            return Err(RentalError::Validation(
                "drop-off location is required".to_string(),
            ));
        }
        self.period()
    }
}

/// A booking ready to be stored, with its total already priced.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub user_id: UserId,
    pub vehicle_id: VehicleId,
    pub period: RentalPeriod,
    pub pickup_location: String,
    pub dropoff_location: String,
    pub total_amount: Decimal,
}
