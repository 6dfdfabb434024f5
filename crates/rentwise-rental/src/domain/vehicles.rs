use crate::domain::types::{FuelType, Transmission, VehicleId, VehicleStatus, VehicleType};
use crate::error::{RentalError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub color: String,
    pub license_plate: String,
    pub vehicle_type: VehicleType,
    pub fuel_type: FuelType,
    pub transmission: Transmission,
    pub seating_capacity: i32,
    pub mileage: i64,
    pub status: VehicleStatus,
    pub daily_rate: Decimal,
    pub image_path: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    pub fn is_available(&self) -> bool {
        self.status == VehicleStatus::Available
    }

    pub fn is_rented(&self) -> bool {
        self.status == VehicleStatus::Rented
    }

    pub fn is_in_maintenance(&self) -> bool {
        self.status == VehicleStatus::Maintenance
    }

    pub fn is_out_of_service(&self) -> bool {
        self.status == VehicleStatus::OutOfService
    }

    /// Same field rules as [`NewVehicle::validate`].
    pub fn validate(&self) -> Result<()> {
        check_fields(
            &self.make,
            &self.model,
            &self.license_plate,
            self.seating_capacity,
            self.mileage,
            self.daily_rate,
        )
    }

    /// "2022 Toyota Corolla"
    pub fn display_name(&self) -> String {
        format!("{} {} {}", self.year, self.make, self.model)
    }
}

/// Fleet entry before it has been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVehicle {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub color: String,
    pub license_plate: String,
    pub vehicle_type: VehicleType,
    pub fuel_type: FuelType,
    pub transmission: Transmission,
    pub seating_capacity: i32,
    pub mileage: i64,
    pub status: VehicleStatus,
    pub daily_rate: Decimal,
    pub image_path: Option<String>,
    pub description: Option<String>,
}

impl NewVehicle {
    pub fn validate(&self) -> Result<()> {
        check_fields(
            &self.make,
            &self.model,
            &self.license_plate,
            self.seating_capacity,
            self.mileage,
            self.daily_rate,
        )
    }
}

fn check_fields(
    make: &str,
    model: &str,
    license_plate: &str,
    seating_capacity: i32,
    mileage: i64,
    daily_rate: Decimal,
) -> Result<()> {
    if make.trim().is_empty() || model.trim().is_empty() {
        return Err(RentalError::Validation(
            "make and model are required".to_string(),
        ));
    }
    if license_plate.trim().is_empty() {
        return Err(RentalError::Validation(
            "license plate is required".to_string(),
        ));
    }
    if seating_capacity < 1 {
        return Err(RentalError::Validation(format!(
            "seating capacity must be at least 1, got {seating_capacity}"
        )));
    }
    if mileage < 0 {
        return Err(RentalError::Validation("mileage cannot be negative".to_string()));
    }
    if daily_rate < Decimal::ZERO {
        return Err(RentalError::Validation(
            "daily rate cannot be negative".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn corolla() -> NewVehicle {
        NewVehicle {
            make: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: 2022,
            color: "White".to_string(),
            license_plate: "ABC-123".to_string(),
            vehicle_type: VehicleType::Sedan,
            fuel_type: FuelType::Gasoline,
            transmission: Transmission::Automatic,
            seating_capacity: 5,
            mileage: 12_000,
            status: VehicleStatus::Available,
            daily_rate: dec!(45),
            image_path: None,
            description: None,
        }
    }

    #[test]
    fn test_display_name_and_status() {
        let now = Utc::now();
        let new = corolla();
        let vehicle = Vehicle {
            id: VehicleId::new(1),
            make: new.make,
            model: new.model,
            year: new.year,
            color: new.color,
            license_plate: new.license_plate,
            vehicle_type: new.vehicle_type,
            fuel_type: new.fuel_type,
            transmission: new.transmission,
            seating_capacity: new.seating_capacity,
            mileage: new.mileage,
            status: VehicleStatus::Maintenance,
            daily_rate: new.daily_rate,
            image_path: None,
            description: None,
            created_at: now,
            updated_at: now,
        };

        assert_eq!(vehicle.display_name(), "2022 Toyota Corolla");
        assert!(vehicle.is_in_maintenance());
        assert!(!vehicle.is_available());
    }

    #[test]
    fn test_validate() {
        assert!(corolla().validate().is_ok());

        let mut bad = corolla();
        bad.license_plate = String::new();
        assert!(bad.validate().is_err());

        let mut bad = corolla();
        bad.seating_capacity = 0;
        assert!(bad.validate().is_err());
    }
}
