//! Closed-out rentals and return-date classification.

use crate::domain::types::{BookingId, HistoryId, RentalOutcome, UserId, VehicleId};
use crate::error::{RentalError, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a vehicle came back relative to its planned end date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReturnStatus {
    NotReturned,
    OnTime,
    Late { days: i64 },
    Early { days: i64 },
}

impl ReturnStatus {
    pub fn classify(planned_end: NaiveDate, actual_return: Option<NaiveDate>) -> Self {
        let Some(actual) = actual_return else {
            return ReturnStatus::NotReturned;
        };
        let delta = (actual - planned_end).num_days();
        match delta {
            0 => ReturnStatus::OnTime,
            d if d > 0 => ReturnStatus::Late { days: d },
            d => ReturnStatus::Early { days: -d },
        }
    }
}

impl fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnStatus::NotReturned => f.write_str("Not Returned"),
            ReturnStatus::OnTime => f.write_str("On Time"),
            ReturnStatus::Late { days } => write!(f, "Late ({days} days)"),
            ReturnStatus::Early { days } => write!(f, "Early ({days} days)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalHistoryRecord {
    pub id: HistoryId,
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub vehicle_id: VehicleId,
    pub rental_start_date: NaiveDate,
    pub rental_end_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub total_amount: Decimal,
    pub status: RentalOutcome,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl RentalHistoryRecord {
    pub fn return_status(&self) -> ReturnStatus {
        ReturnStatus::classify(self.rental_end_date, self.actual_return_date)
    }

    pub fn was_returned_late(&self) -> bool {
        matches!(self.return_status(), ReturnStatus::Late { .. })
    }

    pub fn was_returned_early(&self) -> bool {
        matches!(self.return_status(), ReturnStatus::Early { .. })
    }

    pub fn was_returned_on_time(&self) -> bool {
        self.return_status() == ReturnStatus::OnTime
    }

    pub fn days_late(&self) -> i64 {
        match self.return_status() {
            ReturnStatus::Late { days } => days,
            _ => 0,
        }
    }

    pub fn days_early(&self) -> i64 {
        match self.return_status() {
            ReturnStatus::Early { days } => days,
            _ => 0,
        }
    }

    pub fn planned_duration_days(&self) -> i64 {
        (self.rental_end_date - self.rental_start_date).num_days()
    }

    /// Days from pick-up to return, or `None` while the vehicle is out.
    pub fn actual_duration_days(&self) -> Option<i64> {
        self.actual_return_date
            .map(|returned| (returned - self.rental_start_date).num_days())
    }

    pub fn is_completed(&self) -> bool {
        self.status == RentalOutcome::Completed
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == RentalOutcome::Cancelled
    }

    pub fn is_no_show(&self) -> bool {
        self.status == RentalOutcome::NoShow
    }

    pub fn is_recent(&self, now: DateTime<Utc>, window_days: i64) -> bool {
        match recent_cutoff(now, window_days) {
            Ok(since) => self.created_at >= since,
            // the window reaches past the representable range
            Err(_) => window_days > 0,
        }
    }
}

/// Earliest creation time that still counts as recent for a window of
/// `window_days` ending at `now`.
pub fn recent_cutoff(now: DateTime<Utc>, window_days: i64) -> Result<DateTime<Utc>> {
    if window_days < 0 {
        return Err(RentalError::Validation(format!(
            "recent window cannot be negative: {window_days} days"
        )));
    }
    Duration::try_days(window_days)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| {
            RentalError::Validation(format!("recent window of {window_days} days is too large"))
        })
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRentalHistory {
    pub booking_id: BookingId,
    pub user_id: UserId,
    pub vehicle_id: VehicleId,
    pub rental_start_date: NaiveDate,
    pub rental_end_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub total_amount: Decimal,
    pub status: RentalOutcome,
    pub notes: Option<String>,
}
