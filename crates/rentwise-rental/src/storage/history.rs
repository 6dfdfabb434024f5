use crate::domain::history::{recent_cutoff, NewRentalHistory, RentalHistoryRecord};
use crate::domain::types::{BookingId, HistoryId, RentalOutcome, UserId, VehicleId};
use crate::error::{RentalError, Result};
use crate::storage::{code_column, decimal_column, SqliteTx};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;

const HISTORY_COLUMNS: &str = "id, booking_id, user_id, vehicle_id, rental_start_date, \
     rental_end_date, actual_return_date, total_amount, status, notes, created_at";

#[async_trait]
pub trait RentalHistoryRepository: Send + Sync {
    async fn create(&self, record: &NewRentalHistory) -> Result<RentalHistoryRecord>;
    async fn create_tx(
        &self,
        tx: &mut SqliteTx<'_>,
        record: &NewRentalHistory,
    ) -> Result<RentalHistoryRecord>;
    async fn get(&self, id: HistoryId) -> Result<Option<RentalHistoryRecord>>;
    async fn get_by_booking(&self, booking_id: BookingId) -> Result<Option<RentalHistoryRecord>>;
    async fn list(&self) -> Result<Vec<RentalHistoryRecord>>;
    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<RentalHistoryRecord>>;
    async fn list_by_vehicle(&self, vehicle_id: VehicleId) -> Result<Vec<RentalHistoryRecord>>;
    async fn list_by_status(&self, status: RentalOutcome) -> Result<Vec<RentalHistoryRecord>>;
    async fn list_completed(&self) -> Result<Vec<RentalHistoryRecord>>;
    /// Rentals lying entirely inside `from..=to`, by start date.
    async fn list_in_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RentalHistoryRecord>>;
    /// Records created within `days` of `now`.
    async fn list_recent(&self, now: DateTime<Utc>, days: i64) -> Result<Vec<RentalHistoryRecord>>;
    async fn update(&self, record: &RentalHistoryRecord) -> Result<RentalHistoryRecord>;
    async fn update_actual_return_date(
        &self,
        id: HistoryId,
        returned_on: NaiveDate,
    ) -> Result<RentalHistoryRecord>;
    async fn update_status(&self, id: HistoryId, status: RentalOutcome)
        -> Result<RentalHistoryRecord>;
    async fn set_notes(&self, id: HistoryId, notes: Option<&str>) -> Result<RentalHistoryRecord>;
    async fn delete(&self, id: HistoryId) -> Result<bool>;
    async fn count_by_status(&self) -> Result<HashMap<RentalOutcome, i64>>;
    /// Sum of the amounts of completed rentals.
    async fn total_revenue(&self) -> Result<Decimal>;
    /// Mean planned length in days of completed rentals, if there are any.
    async fn average_rental_duration(&self) -> Result<Option<f64>>;
}

pub struct SqliteRentalHistoryRepository {
    pool: SqlitePool,
}

impl SqliteRentalHistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn record_from_row(row: &SqliteRow) -> Result<RentalHistoryRecord> {
        Ok(RentalHistoryRecord {
            id: HistoryId::new(row.try_get("id")?),
            booking_id: BookingId::new(row.try_get("booking_id")?),
            user_id: UserId::new(row.try_get("user_id")?),
            vehicle_id: VehicleId::new(row.try_get("vehicle_id")?),
            rental_start_date: row.try_get("rental_start_date")?,
            rental_end_date: row.try_get("rental_end_date")?,
            actual_return_date: row.try_get("actual_return_date")?,
            total_amount: decimal_column(row, "rental_history", "total_amount")?,
            status: code_column(row, "rental_history", "status")?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn list_by_id_column(&self, column: &str, id: i64) -> Result<Vec<RentalHistoryRecord>> {
        let sql = format!(
            "SELECT {HISTORY_COLUMNS} FROM rental_history WHERE {column} = ? \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql).bind(id).fetch_all(&self.pool).await?;
        rows.iter().map(Self::record_from_row).collect()
    }

    async fn require(&self, id: HistoryId) -> Result<RentalHistoryRecord> {
        self.get(id)
            .await?
            .ok_or_else(|| RentalError::HistoryNotFound { id: id.to_string() })
    }

    async fn create_on(
        conn: &mut SqliteConnection,
        record: &NewRentalHistory,
    ) -> Result<RentalHistoryRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO rental_history
            (booking_id, user_id, vehicle_id, rental_start_date, rental_end_date,
             actual_return_date, total_amount, status, notes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.booking_id.as_i64())
        .bind(record.user_id.as_i64())
        .bind(record.vehicle_id.as_i64())
        .bind(record.rental_start_date)
        .bind(record.rental_end_date)
        .bind(record.actual_return_date)
        .bind(record.total_amount.to_string())
        .bind(record.status.as_str())
        .bind(&record.notes)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        let sql = format!("SELECT {HISTORY_COLUMNS} FROM rental_history WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(result.last_insert_rowid())
            .fetch_one(&mut *conn)
            .await?;
        Self::record_from_row(&row)
    }

    fn ensure_updated(rows_affected: u64, id: HistoryId) -> Result<()> {
        if rows_affected == 0 {
            return Err(RentalError::HistoryNotFound { id: id.to_string() });
        }
        Ok(())
    }
}

#[async_trait]
impl RentalHistoryRepository for SqliteRentalHistoryRepository {
    async fn create(&self, record: &NewRentalHistory) -> Result<RentalHistoryRecord> {
        let mut conn = self.pool.acquire().await?;
        Self::create_on(&mut conn, record).await
    }

    async fn create_tx(
        &self,
        tx: &mut SqliteTx<'_>,
        record: &NewRentalHistory,
    ) -> Result<RentalHistoryRecord> {
        Self::create_on(tx, record).await
    }

    async fn get(&self, id: HistoryId) -> Result<Option<RentalHistoryRecord>> {
        let sql = format!("SELECT {HISTORY_COLUMNS} FROM rental_history WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::record_from_row).transpose()
    }

    async fn get_by_booking(&self, booking_id: BookingId) -> Result<Option<RentalHistoryRecord>> {
        let sql = format!(
            "SELECT {HISTORY_COLUMNS} FROM rental_history WHERE booking_id = ? \
             ORDER BY id DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(booking_id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::record_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<RentalHistoryRecord>> {
        let sql = format!(
            "SELECT {HISTORY_COLUMNS} FROM rental_history ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(Self::record_from_row).collect()
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<RentalHistoryRecord>> {
        self.list_by_id_column("user_id", user_id.as_i64()).await
    }

    async fn list_by_vehicle(&self, vehicle_id: VehicleId) -> Result<Vec<RentalHistoryRecord>> {
        self.list_by_id_column("vehicle_id", vehicle_id.as_i64())
            .await
    }

    async fn list_by_status(&self, status: RentalOutcome) -> Result<Vec<RentalHistoryRecord>> {
        let sql = format!(
            "SELECT {HISTORY_COLUMNS} FROM rental_history WHERE status = ? \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::record_from_row).collect()
    }

    async fn list_completed(&self) -> Result<Vec<RentalHistoryRecord>> {
        self.list_by_status(RentalOutcome::Completed).await
    }

    async fn list_in_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<RentalHistoryRecord>> {
        let sql = format!(
            "SELECT {HISTORY_COLUMNS} FROM rental_history \
             WHERE rental_start_date >= ? AND rental_end_date <= ? \
             ORDER BY rental_start_date, id"
        );
        let rows = sqlx::query(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::record_from_row).collect()
    }

    async fn list_recent(&self, now: DateTime<Utc>, days: i64) -> Result<Vec<RentalHistoryRecord>> {
        let since = recent_cutoff(now, days)?;
        let sql = format!(
            "SELECT {HISTORY_COLUMNS} FROM rental_history WHERE created_at >= ? \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::record_from_row).collect()
    }

    async fn update(&self, record: &RentalHistoryRecord) -> Result<RentalHistoryRecord> {
        let result = sqlx::query(
            r#"
            UPDATE rental_history
            SET booking_id = ?, user_id = ?, vehicle_id = ?, rental_start_date = ?,
                rental_end_date = ?, actual_return_date = ?, total_amount = ?, status = ?,
                notes = ?
            WHERE id = ?
            "#,
        )
        .bind(record.booking_id.as_i64())
        .bind(record.user_id.as_i64())
        .bind(record.vehicle_id.as_i64())
        .bind(record.rental_start_date)
        .bind(record.rental_end_date)
        .bind(record.actual_return_date)
        .bind(record.total_amount.to_string())
        .bind(record.status.as_str())
        .bind(&record.notes)
        .bind(record.id.as_i64())
        .execute(&self.pool)
        .await?;

        Self::ensure_updated(result.rows_affected(), record.id)?;
        self.require(record.id).await
    }

    async fn update_actual_return_date(
        &self,
        id: HistoryId,
        returned_on: NaiveDate,
    ) -> Result<RentalHistoryRecord> {
        let result = sqlx::query("UPDATE rental_history SET actual_return_date = ? WHERE id = ?")
            .bind(returned_on)
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        Self::ensure_updated(result.rows_affected(), id)?;
        self.require(id).await
    }

    async fn update_status(
        &self,
        id: HistoryId,
        status: RentalOutcome,
    ) -> Result<RentalHistoryRecord> {
        let result = sqlx::query("UPDATE rental_history SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        Self::ensure_updated(result.rows_affected(), id)?;
        self.require(id).await
    }

    async fn set_notes(&self, id: HistoryId, notes: Option<&str>) -> Result<RentalHistoryRecord> {
        let result = sqlx::query("UPDATE rental_history SET notes = ? WHERE id = ?")
            .bind(notes)
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        Self::ensure_updated(result.rows_affected(), id)?;
        self.require(id).await
    }

    async fn delete(&self, id: HistoryId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM rental_history WHERE id = ?")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_by_status(&self) -> Result<HashMap<RentalOutcome, i64>> {
        let rows =
            sqlx::query("SELECT status, COUNT(*) AS total FROM rental_history GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut counts = HashMap::new();
        for row in &rows {
            let status: RentalOutcome = code_column(row, "rental_history", "status")?;
            counts.insert(status, row.try_get::<i64, _>("total")?);
        }
        Ok(counts)
    }

    async fn total_revenue(&self) -> Result<Decimal> {
        // amounts are decimal text, so sum here rather than in SQL
        let rows = sqlx::query("SELECT total_amount FROM rental_history WHERE status = ?")
            .bind(RentalOutcome::Completed.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().try_fold(Decimal::ZERO, |sum, row| {
            Ok(sum + decimal_column(row, "rental_history", "total_amount")?)
        })
    }

    async fn average_rental_duration(&self) -> Result<Option<f64>> {
        let average: Option<f64> = sqlx::query_scalar(
            r#"
            SELECT AVG(julianday(rental_end_date) - julianday(rental_start_date))
            FROM rental_history
            WHERE status = ?
            "#,
        )
        .bind(RentalOutcome::Completed.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(average)
    }
}
