use crate::domain::bookings::{Booking, NewBooking, RentalPeriod};
use crate::domain::types::{BookingId, BookingStatus, PaymentStatus, UserId, VehicleId};
use crate::error::{RentalError, Result};
use crate::storage::{code_column, decimal_column, SqliteTx};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

const BOOKING_COLUMNS: &str = "id, user_id, vehicle_id, start_date, end_date, pickup_location, \
     dropoff_location, total_amount, status, payment_status, created_at, updated_at";

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Store a new booking as pending with payment pending.
    ///
    /// Fails with [`RentalError::VehicleUnavailable`] when an open booking of
    /// the same vehicle overlaps the period. The overlap check and the insert
    /// are one statement, so concurrent requests cannot both succeed.
    async fn create(&self, booking: &NewBooking) -> Result<Booking>;
    async fn get(&self, id: BookingId) -> Result<Option<Booking>>;
    async fn list(&self) -> Result<Vec<Booking>>;
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Booking>>;
    async fn list_by_status(&self, status: BookingStatus) -> Result<Vec<Booking>>;
    async fn list_by_vehicle(&self, vehicle_id: VehicleId) -> Result<Vec<Booking>>;
    /// Replace the stored record. Status changes here bypass the lifecycle
    /// guards; use [`BookingRepository::transition`] for those.
    async fn update(&self, booking: &Booking) -> Result<Booking>;
    async fn delete(&self, id: BookingId) -> Result<bool>;
    /// Move to `next` only if the stored status allows it.
    ///
    /// The check and the write are a single conditional UPDATE, so a refused
    /// transition leaves the row untouched.
    async fn transition(&self, id: BookingId, next: BookingStatus) -> Result<Booking>;
    /// [`BookingRepository::transition`] inside the caller's transaction.
    async fn transition_tx(
        &self,
        tx: &mut SqliteTx<'_>,
        id: BookingId,
        next: BookingStatus,
    ) -> Result<Booking>;
    async fn update_payment_status(&self, id: BookingId, next: PaymentStatus) -> Result<Booking>;
    /// Open bookings of `vehicle_id` whose period intersects `period`.
    async fn find_overlapping(
        &self,
        vehicle_id: VehicleId,
        period: &RentalPeriod,
    ) -> Result<Vec<Booking>>;

    async fn confirm(&self, id: BookingId) -> Result<Booking> {
        self.transition(id, BookingStatus::Confirmed).await
    }

    async fn cancel(&self, id: BookingId) -> Result<Booking> {
        self.transition(id, BookingStatus::Cancelled).await
    }

    async fn cancel_tx(&self, tx: &mut SqliteTx<'_>, id: BookingId) -> Result<Booking> {
        self.transition_tx(tx, id, BookingStatus::Cancelled).await
    }
}

pub struct SqliteBookingRepository {
    pool: SqlitePool,
}

impl SqliteBookingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn booking_from_row(row: &SqliteRow) -> Result<Booking> {
        Ok(Booking {
            id: BookingId::new(row.try_get("id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            vehicle_id: VehicleId::new(row.try_get("vehicle_id")?),
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            pickup_location: row.try_get("pickup_location")?,
            dropoff_location: row.try_get("dropoff_location")?,
            total_amount: decimal_column(row, "bookings", "total_amount")?,
            status: code_column(row, "bookings", "status")?,
            payment_status: code_column(row, "bookings", "payment_status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn list_where(
        &self,
        clause: &str,
        code: Option<&str>,
        id: Option<i64>,
    ) -> Result<Vec<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings {clause} ORDER BY created_at DESC, id DESC"
        );
        let mut query = sqlx::query(&sql);
        if let Some(code) = code {
            query = query.bind(code);
        }
        if let Some(id) = id {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(Self::booking_from_row).collect()
    }

    async fn require(&self, id: BookingId) -> Result<Booking> {
        self.get(id)
            .await?
            .ok_or_else(|| RentalError::BookingNotFound { id: id.to_string() })
    }

    async fn fetch_on(conn: &mut SqliteConnection, id: BookingId) -> Result<Option<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&mut *conn)
            .await?;
        row.as_ref().map(Self::booking_from_row).transpose()
    }

    async fn require_on(conn: &mut SqliteConnection, id: BookingId) -> Result<Booking> {
        Self::fetch_on(conn, id)
            .await?
            .ok_or_else(|| RentalError::BookingNotFound { id: id.to_string() })
    }

    async fn transition_on(
        conn: &mut SqliteConnection,
        id: BookingId,
        next: BookingStatus,
    ) -> Result<Booking> {
        let allowed_from: Vec<BookingStatus> = BookingStatus::ALL
            .iter()
            .copied()
            .filter(|s| s.can_transition_to(next))
            .collect();

        if !allowed_from.is_empty() {
            let sql = format!(
                "UPDATE bookings SET status = ?, updated_at = ? WHERE id = ? AND status IN ({})",
                Self::placeholders(allowed_from.len())
            );
            let mut query = sqlx::query(&sql)
                .bind(next.as_str())
                .bind(Utc::now())
                .bind(id.as_i64());
            for status in &allowed_from {
                query = query.bind(status.as_str());
            }

            if query.execute(&mut *conn).await?.rows_affected() > 0 {
                return Self::require_on(conn, id).await;
            }
        }

        let current = Self::require_on(conn, id).await?;
        Err(RentalError::InvalidStateTransition {
            from: current.status.to_string(),
            to: next.to_string(),
        })
    }

    fn open_statuses() -> Vec<BookingStatus> {
        BookingStatus::ALL
            .iter()
            .copied()
            .filter(|s| s.is_open())
            .collect()
    }

    fn placeholders(n: usize) -> String {
        vec!["?"; n].join(", ")
    }
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    async fn create(&self, booking: &NewBooking) -> Result<Booking> {
        let now = Utc::now();
        let open = Self::open_statuses();

        let sql = format!(
            r#"
            INSERT INTO bookings
            (user_id, vehicle_id, start_date, end_date, pickup_location, dropoff_location,
             total_amount, status, payment_status, created_at, updated_at)
            SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?
            WHERE NOT EXISTS (
                SELECT 1 FROM bookings
                WHERE vehicle_id = ? AND start_date < ? AND end_date > ? AND status IN ({})
            )
            "#,
            Self::placeholders(open.len())
        );
        let mut query = sqlx::query(&sql)
            .bind(booking.user_id.as_i64())
            .bind(booking.vehicle_id.as_i64())
            .bind(booking.period.start())
            .bind(booking.period.end())
            .bind(&booking.pickup_location)
            .bind(&booking.dropoff_location)
            .bind(booking.total_amount.to_string())
            .bind(BookingStatus::Pending.as_str())
            .bind(PaymentStatus::Pending.as_str())
            .bind(now)
            .bind(now)
            .bind(booking.vehicle_id.as_i64())
            .bind(booking.period.end())
            .bind(booking.period.start());
        for status in &open {
            query = query.bind(status.as_str());
        }

        let result = query.execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            let clashes = self
                .find_overlapping(booking.vehicle_id, &booking.period)
                .await?;
            let reason = match clashes.first() {
                Some(existing) => format!(
                    "already booked from {} to {} (booking {})",
                    existing.start_date, existing.end_date, existing.id
                ),
                None => "already booked for an overlapping period".to_string(),
            };
            return Err(RentalError::VehicleUnavailable {
                id: booking.vehicle_id.to_string(),
                reason,
            });
        }

        self.require(BookingId::new(result.last_insert_rowid())).await
    }

    async fn get(&self, id: BookingId) -> Result<Option<Booking>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch_on(&mut conn, id).await
    }

    async fn list(&self) -> Result<Vec<Booking>> {
        self.list_where("", None, None).await
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Booking>> {
        self.list_where("WHERE user_id = ?", None, Some(user_id.as_i64()))
            .await
    }

    async fn list_by_status(&self, status: BookingStatus) -> Result<Vec<Booking>> {
        self.list_where("WHERE status = ?", Some(status.as_str()), None)
            .await
    }

    async fn list_by_vehicle(&self, vehicle_id: VehicleId) -> Result<Vec<Booking>> {
        self.list_where("WHERE vehicle_id = ?", None, Some(vehicle_id.as_i64()))
            .await
    }

    async fn update(&self, booking: &Booking) -> Result<Booking> {
        booking.period()?;

        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET user_id = ?, vehicle_id = ?, start_date = ?, end_date = ?, pickup_location = ?,
                dropoff_location = ?, total_amount = ?, status = ?, payment_status = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(booking.user_id.as_i64())
        .bind(booking.vehicle_id.as_i64())
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(&booking.pickup_location)
        .bind(&booking.dropoff_location)
        .bind(booking.total_amount.to_string())
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(Utc::now())
        .bind(booking.id.as_i64())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RentalError::BookingNotFound {
                id: booking.id.to_string(),
            });
        }
        self.require(booking.id).await
    }

    async fn delete(&self, id: BookingId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = ?")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn transition(&self, id: BookingId, next: BookingStatus) -> Result<Booking> {
        let mut conn = self.pool.acquire().await?;
        Self::transition_on(&mut conn, id, next).await
    }

    async fn transition_tx(
        &self,
        tx: &mut SqliteTx<'_>,
        id: BookingId,
        next: BookingStatus,
    ) -> Result<Booking> {
        Self::transition_on(tx, id, next).await
    }

    async fn update_payment_status(&self, id: BookingId, next: PaymentStatus) -> Result<Booking> {
        let allowed_from: Vec<PaymentStatus> = PaymentStatus::ALL
            .iter()
            .copied()
            .filter(|s| s.can_transition_to(next))
            .collect();

        if !allowed_from.is_empty() {
            let sql = format!(
                "UPDATE bookings SET payment_status = ?, updated_at = ? \
                 WHERE id = ? AND payment_status IN ({})",
                Self::placeholders(allowed_from.len())
            );
            let mut query = sqlx::query(&sql)
                .bind(next.as_str())
                .bind(Utc::now())
                .bind(id.as_i64());
            for status in &allowed_from {
                query = query.bind(status.as_str());
            }

            if query.execute(&self.pool).await?.rows_affected() > 0 {
                return self.require(id).await;
            }
        }

        let current = self.require(id).await?;
        Err(RentalError::InvalidPaymentTransition {
            from: current.payment_status.to_string(),
            to: next.to_string(),
        })
    }

    async fn find_overlapping(
        &self,
        vehicle_id: VehicleId,
        period: &RentalPeriod,
    ) -> Result<Vec<Booking>> {
        let open = Self::open_statuses();

        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE vehicle_id = ? AND start_date < ? AND end_date > ? AND status IN ({}) \
             ORDER BY start_date",
            Self::placeholders(open.len())
        );
        let mut query = sqlx::query(&sql)
            .bind(vehicle_id.as_i64())
            .bind(period.end())
            .bind(period.start());
        for status in &open {
            query = query.bind(status.as_str());
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(Self::booking_from_row).collect()
    }
}
