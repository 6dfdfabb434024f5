//! The rental desk: booking workflow on top of the repositories.

use crate::config::{DefaultPricing, RentalConfig};
use crate::domain::bookings::{Booking, NewBooking, NewBookingRequest, RentalPeriod};
use crate::domain::history::{NewRentalHistory, RentalHistoryRecord, ReturnStatus};
use crate::domain::pricing::{HolidayCalendar, PricingRule, Quote, RateFlags};
use crate::domain::types::{
    BookingId, BookingStatus, HistoryId, PaymentStatus, RentalOutcome, VehicleId, VehicleStatus,
    VehicleType,
};
use crate::error::{RentalError, Result};
use crate::storage::{
    AdminRepository, BookingRepository, Database, PricingRepository, RentalHistoryRepository,
    SqliteAdminRepository, SqliteBookingRepository, SqlitePricingRepository,
    SqliteRentalHistoryRepository, SqliteTx, SqliteUserRepository, SqliteVehicleRepository,
    UserRepository, VehicleRepository,
};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct RentalDesk {
    db: Database,
    vehicles: Arc<dyn VehicleRepository>,
    users: Arc<dyn UserRepository>,
    admins: Arc<dyn AdminRepository>,
    pricing: Arc<dyn PricingRepository>,
    bookings: Arc<dyn BookingRepository>,
    history: Arc<dyn RentalHistoryRepository>,
    holidays: HolidayCalendar,
    recent_history_days: i64,
}

impl RentalDesk {
    pub fn new(db: &Database, config: &RentalConfig) -> Self {
        let pool = db.pool().clone();
        Self {
            db: db.clone(),
            vehicles: Arc::new(SqliteVehicleRepository::new(pool.clone())),
            users: Arc::new(SqliteUserRepository::new(pool.clone())),
            admins: Arc::new(SqliteAdminRepository::new(pool.clone())),
            pricing: Arc::new(SqlitePricingRepository::new(pool.clone())),
            bookings: Arc::new(SqliteBookingRepository::new(pool.clone())),
            history: Arc::new(SqliteRentalHistoryRepository::new(pool)),
            holidays: config.pricing.holiday_calendar(),
            recent_history_days: config.booking.recent_history_days,
        }
    }

    pub fn vehicles(&self) -> &dyn VehicleRepository {
        self.vehicles.as_ref()
    }

    pub fn users(&self) -> &dyn UserRepository {
        self.users.as_ref()
    }

    pub fn admins(&self) -> &dyn AdminRepository {
        self.admins.as_ref()
    }

    pub fn pricing(&self) -> &dyn PricingRepository {
        self.pricing.as_ref()
    }

    pub fn bookings(&self) -> &dyn BookingRepository {
        self.bookings.as_ref()
    }

    pub fn history(&self) -> &dyn RentalHistoryRepository {
        self.history.as_ref()
    }

    pub fn holidays(&self) -> &HolidayCalendar {
        &self.holidays
    }

    async fn rule_for(&self, vehicle_type: VehicleType) -> Result<PricingRule> {
        self.pricing
            .get_by_vehicle_type(vehicle_type)
            .await?
            .ok_or_else(|| RentalError::PricingNotFound {
                vehicle_type: vehicle_type.to_string(),
            })
    }

    async fn require_booking(&self, id: BookingId) -> Result<Booking> {
        self.bookings
            .get(id)
            .await?
            .ok_or_else(|| RentalError::BookingNotFound { id: id.to_string() })
    }

    /// Price `period` for a specific vehicle, deriving weekend, holiday and
    /// long-term flags from the dates.
    pub async fn quote(
        &self,
        vehicle_id: VehicleId,
        period: &RentalPeriod,
        include_insurance: bool,
    ) -> Result<Quote> {
        let vehicle = self
            .vehicles
            .get(vehicle_id)
            .await?
            .ok_or_else(|| RentalError::VehicleNotFound {
                id: vehicle_id.to_string(),
            })?;
        let rule = self.rule_for(vehicle.vehicle_type).await?;
        let flags = RateFlags::for_period(period, &self.holidays);

        rule.quote(period.days(), flags, include_insurance)
    }

    /// Price `days` of a vehicle type with caller-supplied weekend and
    /// holiday flags. Long-term pricing follows from the day count.
    pub async fn quote_for_type(
        &self,
        vehicle_type: VehicleType,
        days: u32,
        weekend: bool,
        holiday: bool,
        include_insurance: bool,
    ) -> Result<Quote> {
        let rule = self.rule_for(vehicle_type).await?;
        let flags = RateFlags {
            weekend,
            holiday,
            long_term: rule.is_long_term_rental(days),
        };
        rule.quote(days, flags, include_insurance)
    }

    pub async fn create_booking(&self, request: &NewBookingRequest) -> Result<Booking> {
        let period = request.validate()?;

        if self.users.get(request.user_id).await?.is_none() {
            return Err(RentalError::UserNotFound {
                id: request.user_id.to_string(),
            });
        }

        let vehicle = self
            .vehicles
            .get(request.vehicle_id)
            .await?
            .ok_or_else(|| RentalError::VehicleNotFound {
                id: request.vehicle_id.to_string(),
            })?;
        if !vehicle.is_available() {
            return Err(RentalError::VehicleUnavailable {
                id: vehicle.id.to_string(),
                reason: format!("vehicle is {}", vehicle.status),
            });
        }

        let quote = self
            .quote(vehicle.id, &period, request.include_insurance)
            .await?;

        // rejects the period if an open booking of the vehicle overlaps it
        let booking = self
            .bookings
            .create(&NewBooking {
                user_id: request.user_id,
                vehicle_id: vehicle.id,
                period,
                pickup_location: request.pickup_location.trim().to_string(),
                dropoff_location: request.dropoff_location.trim().to_string(),
                total_amount: quote.total,
            })
            .await?;

        info!(
            "Created booking {} for user {} on vehicle {} ({} days, total {})",
            booking.id, booking.user_id, booking.vehicle_id, quote.days, booking.total_amount
        );
        Ok(booking)
    }

    pub async fn confirm_booking(&self, id: BookingId) -> Result<Booking> {
        let booking = self.bookings.confirm(id).await?;
        info!("Confirmed booking {}", id);
        Ok(booking)
    }

    /// Cancel a pending or confirmed booking and close it out in the history.
    pub async fn cancel_booking(&self, id: BookingId) -> Result<Booking> {
        let mut tx = self.db.begin().await?;
        let booking = self.bookings.cancel_tx(&mut tx, id).await?;
        self.close_out(&mut tx, &booking, RentalOutcome::Cancelled, None, None)
            .await?;
        tx.commit().await?;

        info!("Cancelled booking {}", id);
        Ok(booking)
    }

    /// Hand the vehicle over to the renter.
    pub async fn activate_booking(&self, id: BookingId) -> Result<Booking> {
        let mut tx = self.db.begin().await?;
        let booking = self
            .bookings
            .transition_tx(&mut tx, id, BookingStatus::Active)
            .await?;
        self.vehicles
            .update_status_tx(&mut tx, booking.vehicle_id, VehicleStatus::Rented)
            .await?;
        tx.commit().await?;

        info!(
            "Activated booking {}; vehicle {} is out",
            id, booking.vehicle_id
        );
        Ok(booking)
    }

    /// Take the vehicle back and record the completed rental.
    pub async fn complete_booking(
        &self,
        id: BookingId,
        actual_return_date: NaiveDate,
        notes: Option<&str>,
    ) -> Result<(Booking, RentalHistoryRecord)> {
        let current = self.require_booking(id).await?;
        if actual_return_date < current.start_date {
            return Err(RentalError::Validation(format!(
                "return date {} is before the rental started on {}",
                actual_return_date, current.start_date
            )));
        }

        let mut tx = self.db.begin().await?;
        let booking = self
            .bookings
            .transition_tx(&mut tx, id, BookingStatus::Completed)
            .await?;
        self.vehicles
            .update_status_tx(&mut tx, booking.vehicle_id, VehicleStatus::Available)
            .await?;
        let record = self
            .close_out(
                &mut tx,
                &booking,
                RentalOutcome::Completed,
                Some(actual_return_date),
                notes,
            )
            .await?;
        tx.commit().await?;

        match record.return_status() {
            ReturnStatus::Late { days } => warn!("Booking {} returned {} days late", id, days),
            status => debug!("Booking {} returned: {}", id, status),
        }
        info!("Completed booking {}", id);
        Ok((booking, record))
    }

    /// The renter never collected a confirmed booking.
    pub async fn record_no_show(
        &self,
        id: BookingId,
        notes: Option<&str>,
    ) -> Result<(Booking, RentalHistoryRecord)> {
        let current = self.require_booking(id).await?;
        if current.status != BookingStatus::Confirmed {
            return Err(RentalError::InvalidStateTransition {
                from: current.status.to_string(),
                to: BookingStatus::Cancelled.to_string(),
            });
        }

        let mut tx = self.db.begin().await?;
        let booking = self.bookings.cancel_tx(&mut tx, id).await?;
        let record = self
            .close_out(&mut tx, &booking, RentalOutcome::NoShow, None, notes)
            .await?;
        tx.commit().await?;
        info!("Recorded no-show for booking {}", id);
        Ok((booking, record))
    }

    pub async fn record_payment(&self, id: BookingId) -> Result<Booking> {
        let booking = self
            .bookings
            .update_payment_status(id, PaymentStatus::Paid)
            .await?;
        info!("Booking {} paid ({})", id, booking.total_amount);
        Ok(booking)
    }

    pub async fn refund_payment(&self, id: BookingId) -> Result<Booking> {
        let booking = self
            .bookings
            .update_payment_status(id, PaymentStatus::Refunded)
            .await?;
        info!("Booking {} refunded ({})", id, booking.total_amount);
        Ok(booking)
    }

    pub async fn return_status(&self, history_id: HistoryId) -> Result<ReturnStatus> {
        let record = self
            .history
            .get(history_id)
            .await?
            .ok_or_else(|| RentalError::HistoryNotFound {
                id: history_id.to_string(),
            })?;
        Ok(record.return_status())
    }

    /// History records created within the configured recent window.
    pub async fn recent_rentals(&self, now: DateTime<Utc>) -> Result<Vec<RentalHistoryRecord>> {
        self.history
            .list_recent(now, self.recent_history_days)
            .await
    }

    /// Create a rule for every vehicle type in `defaults` that has none yet.
    pub async fn seed_default_pricing(
        &self,
        defaults: &[DefaultPricing],
    ) -> Result<Vec<PricingRule>> {
        let mut created = Vec::new();
        for default in defaults {
            if self.pricing.exists_for_type(default.vehicle_type).await? {
                debug!("Pricing for {} already present", default.vehicle_type);
                continue;
            }
            let rule = self.pricing.create(&default.to_new_rule()).await?;
            info!(
                "Seeded pricing for {}: base {} per day",
                rule.vehicle_type, rule.base_daily_rate
            );
            created.push(rule);
        }
        Ok(created)
    }

    async fn close_out(
        &self,
        tx: &mut SqliteTx<'_>,
        booking: &Booking,
        outcome: RentalOutcome,
        actual_return_date: Option<NaiveDate>,
        notes: Option<&str>,
    ) -> Result<RentalHistoryRecord> {
        self.history
            .create_tx(
                tx,
                &NewRentalHistory {
                    booking_id: booking.id,
                    user_id: booking.user_id,
                    vehicle_id: booking.vehicle_id,
                    rental_start_date: booking.start_date,
                    rental_end_date: booking.end_date,
                    actual_return_date,
                    total_amount: booking.total_amount,
                    status: outcome,
                    notes: notes.map(str::to_string),
                },
            )
            .await
    }
}
