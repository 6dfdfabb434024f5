use crate::domain::types::{VehicleId, VehicleStatus, VehicleType};
use crate::domain::vehicles::{NewVehicle, Vehicle};
use crate::error::{RentalError, Result};
use crate::storage::{code_column, decimal_column, unique_violation, SqliteTx};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use std::collections::HashMap;

const VEHICLE_COLUMNS: &str = "id, make, model, year, color, license_plate, vehicle_type, fuel_type, \
     transmission, seating_capacity, mileage, status, daily_rate, image_path, description, \
     created_at, updated_at";

#[async_trait]
pub trait VehicleRepository: Send + Sync {
    async fn create(&self, vehicle: &NewVehicle) -> Result<Vehicle>;
    async fn get(&self, id: VehicleId) -> Result<Option<Vehicle>>;
    async fn get_by_license_plate(&self, plate: &str) -> Result<Option<Vehicle>>;
    async fn list(&self) -> Result<Vec<Vehicle>>;
    async fn list_by_status(&self, status: VehicleStatus) -> Result<Vec<Vehicle>>;
    async fn list_available(&self) -> Result<Vec<Vehicle>>;
    async fn list_by_type(&self, vehicle_type: VehicleType) -> Result<Vec<Vehicle>>;
    async fn list_available_by_type(&self, vehicle_type: VehicleType) -> Result<Vec<Vehicle>>;
    /// Case-insensitive substring match on make or model. `%` and `_` in
    /// `term` match literally.
    async fn search(&self, term: &str) -> Result<Vec<Vehicle>>;
    /// Replace every editable field of an existing vehicle.
    async fn update(&self, vehicle: &Vehicle) -> Result<Vehicle>;
    async fn update_status(&self, id: VehicleId, status: VehicleStatus) -> Result<Vehicle>;
    async fn update_status_tx(
        &self,
        tx: &mut SqliteTx<'_>,
        id: VehicleId,
        status: VehicleStatus,
    ) -> Result<Vehicle>;
    async fn update_mileage(&self, id: VehicleId, mileage: i64) -> Result<Vehicle>;
    async fn delete(&self, id: VehicleId) -> Result<bool>;
    async fn license_plate_exists(&self, plate: &str) -> Result<bool>;
    async fn count_by_status(&self) -> Result<HashMap<VehicleStatus, i64>>;
}

pub struct SqliteVehicleRepository {
    pool: SqlitePool,
}

impl SqliteVehicleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn vehicle_from_row(row: &SqliteRow) -> Result<Vehicle> {
        Ok(Vehicle {
            id: VehicleId::new(row.try_get("id")?),
            make: row.try_get("make")?,
            model: row.try_get("model")?,
            year: row.try_get("year")?,
            color: row.try_get("color")?,
            license_plate: row.try_get("license_plate")?,
            vehicle_type: code_column(row, "vehicles", "vehicle_type")?,
            fuel_type: code_column(row, "vehicles", "fuel_type")?,
            transmission: code_column(row, "vehicles", "transmission")?,
            seating_capacity: row.try_get("seating_capacity")?,
            mileage: row.try_get("mileage")?,
            status: code_column(row, "vehicles", "status")?,
            daily_rate: decimal_column(row, "vehicles", "daily_rate")?,
            image_path: row.try_get("image_path")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    async fn fetch_where(&self, clause: &str, binds: &[&str]) -> Result<Vec<Vehicle>> {
        let sql = format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles {clause} ORDER BY created_at DESC, id DESC"
        );
        let mut query = sqlx::query(&sql);
        for value in binds {
            query = query.bind(*value);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(Self::vehicle_from_row).collect()
    }

    async fn require(&self, id: VehicleId) -> Result<Vehicle> {
        self.get(id)
            .await?
            .ok_or_else(|| RentalError::VehicleNotFound { id: id.to_string() })
    }

    async fn update_status_on(
        conn: &mut SqliteConnection,
        id: VehicleId,
        status: VehicleStatus,
    ) -> Result<Vehicle> {
        let result = sqlx::query("UPDATE vehicles SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(id.as_i64())
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RentalError::VehicleNotFound { id: id.to_string() });
        }

        let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_one(&mut *conn)
            .await?;
        Self::vehicle_from_row(&row)
    }
}

/// Escape LIKE wildcards so they match literally under `ESCAPE '\'`.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl VehicleRepository for SqliteVehicleRepository {
    async fn create(&self, vehicle: &NewVehicle) -> Result<Vehicle> {
        vehicle.validate()?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO vehicles
            (make, model, year, color, license_plate, vehicle_type, fuel_type, transmission,
             seating_capacity, mileage, status, daily_rate, image_path, description,
             created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&vehicle.make)
        .bind(&vehicle.model)
        .bind(vehicle.year)
        .bind(&vehicle.color)
        .bind(&vehicle.license_plate)
        .bind(vehicle.vehicle_type.as_str())
        .bind(vehicle.fuel_type.as_str())
        .bind(vehicle.transmission.as_str())
        .bind(vehicle.seating_capacity)
        .bind(vehicle.mileage)
        .bind(vehicle.status.as_str())
        .bind(vehicle.daily_rate.to_string())
        .bind(&vehicle.image_path)
        .bind(&vehicle.description)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            unique_violation(e, || {
                format!("license plate {} is already registered", vehicle.license_plate)
            })
        })?;

        self.require(VehicleId::new(result.last_insert_rowid())).await
    }

    async fn get(&self, id: VehicleId) -> Result<Option<Vehicle>> {
        let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::vehicle_from_row).transpose()
    }

    async fn get_by_license_plate(&self, plate: &str) -> Result<Option<Vehicle>> {
        let sql = format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE license_plate = ?");
        let row = sqlx::query(&sql)
            .bind(plate)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::vehicle_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<Vehicle>> {
        self.fetch_where("", &[]).await
    }

    async fn list_by_status(&self, status: VehicleStatus) -> Result<Vec<Vehicle>> {
        self.fetch_where("WHERE status = ?", &[status.as_str()]).await
    }

    async fn list_available(&self) -> Result<Vec<Vehicle>> {
        self.list_by_status(VehicleStatus::Available).await
    }

    async fn list_by_type(&self, vehicle_type: VehicleType) -> Result<Vec<Vehicle>> {
        self.fetch_where("WHERE vehicle_type = ?", &[vehicle_type.as_str()])
            .await
    }

    async fn list_available_by_type(&self, vehicle_type: VehicleType) -> Result<Vec<Vehicle>> {
        self.fetch_where(
            "WHERE vehicle_type = ? AND status = ?",
            &[vehicle_type.as_str(), VehicleStatus::Available.as_str()],
        )
        .await
    }

    async fn search(&self, term: &str) -> Result<Vec<Vehicle>> {
        let pattern = format!("%{}%", escape_like(&term.trim().to_lowercase()));
        self.fetch_where(
            r"WHERE lower(make) LIKE ? ESCAPE '\' OR lower(model) LIKE ? ESCAPE '\'",
            &[pattern.as_str(), pattern.as_str()],
        )
        .await
    }

    async fn update(&self, vehicle: &Vehicle) -> Result<Vehicle> {
        vehicle.validate()?;

        let result = sqlx::query(
            r#"
            UPDATE vehicles
            SET make = ?, model = ?, year = ?, color = ?, license_plate = ?, vehicle_type = ?,
                fuel_type = ?, transmission = ?, seating_capacity = ?, mileage = ?, status = ?,
                daily_rate = ?, image_path = ?, description = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&vehicle.make)
        .bind(&vehicle.model)
        .bind(vehicle.year)
        .bind(&vehicle.color)
        .bind(&vehicle.license_plate)
        .bind(vehicle.vehicle_type.as_str())
        .bind(vehicle.fuel_type.as_str())
        .bind(vehicle.transmission.as_str())
        .bind(vehicle.seating_capacity)
        .bind(vehicle.mileage)
        .bind(vehicle.status.as_str())
        .bind(vehicle.daily_rate.to_string())
        .bind(&vehicle.image_path)
        .bind(&vehicle.description)
        .bind(Utc::now())
        .bind(vehicle.id.as_i64())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            unique_violation(e, || {
                format!("license plate {} is already registered", vehicle.license_plate)
            })
        })?;

        if result.rows_affected() == 0 {
            return Err(RentalError::VehicleNotFound {
                id: vehicle.id.to_string(),
            });
        }
        self.require(vehicle.id).await
    }

    async fn update_status(&self, id: VehicleId, status: VehicleStatus) -> Result<Vehicle> {
        let mut conn = self.pool.acquire().await?;
        Self::update_status_on(&mut conn, id, status).await
    }

    async fn update_status_tx(
        &self,
        tx: &mut SqliteTx<'_>,
        id: VehicleId,
        status: VehicleStatus,
    ) -> Result<Vehicle> {
        Self::update_status_on(tx, id, status).await
    }

    async fn update_mileage(&self, id: VehicleId, mileage: i64) -> Result<Vehicle> {
        if mileage < 0 {
            return Err(RentalError::Validation("mileage cannot be negative".to_string()));
        }
        let result = sqlx::query("UPDATE vehicles SET mileage = ?, updated_at = ? WHERE id = ?")
            .bind(mileage)
            .bind(Utc::now())
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RentalError::VehicleNotFound { id: id.to_string() });
        }
        self.require(id).await
    }

    async fn delete(&self, id: VehicleId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM vehicles WHERE id = ?")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn license_plate_exists(&self, plate: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vehicles WHERE license_plate = ?")
            .bind(plate)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn count_by_status(&self) -> Result<HashMap<VehicleStatus, i64>> {
        let rows = sqlx::query("SELECT status, COUNT(*) AS total FROM vehicles GROUP BY status")
            .fetch_all(&self.pool)
            .await?;

        let mut counts = HashMap::new();
        for row in &rows {
            let status: VehicleStatus = code_column(row, "vehicles", "status")?;
            counts.insert(status, row.try_get::<i64, _>("total")?);
        }
        Ok(counts)
    }
}
