#![allow(dead_code)]

use chrono::NaiveDate;
use rentwise_rental::config::DatabaseConfig;
use rentwise_rental::domain::{
    FuelType, NewBookingRequest, NewPricingRule, NewUser, NewVehicle, PricingRule, Transmission,
    User, UserId, Vehicle, VehicleId, VehicleStatus, VehicleType,
};
use rentwise_rental::storage::Database;
use rentwise_rental::{RentalConfig, RentalDesk};
use rust_decimal_macros::dec;
use std::path::Path;

pub struct TestContext {
    pub db: Database,
    pub desk: RentalDesk,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_config(RentalConfig::default()).await
    }

    pub async fn with_config(config: RentalConfig) -> Self {
        let db = Database::in_memory()
            .await
            .expect("Failed to open in-memory database");
        let desk = RentalDesk::new(&db, &config);
        TestContext { db, desk }
    }

    /// Context over a pooled SQLite file, for tests that need real
    /// concurrent connections.
    pub async fn on_file(path: &Path) -> Self {
        let config = DatabaseConfig {
            url: format!("sqlite://{}", path.display()),
            max_connections: 5,
            create_if_missing: true,
            ..DatabaseConfig::default()
        };
        let db = Database::connect(&config)
            .await
            .expect("Failed to open file database");
        db.migrate().await.expect("Failed to migrate file database");
        let desk = RentalDesk::new(&db, &RentalConfig::default());
        TestContext { db, desk }
    }

    pub async fn create_user(&self, username: &str) -> User {
        self.desk
            .users()
            .create(&NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                password_hash: "opaque-hash".to_string(),
                first_name: "Test".to_string(),
                last_name: "Renter".to_string(),
                phone: Some("555-0100".to_string()),
                address: None,
                driver_license: Some("DL-0001".to_string()),
                date_of_birth: Some(date("1990-04-12")),
            })
            .await
            .expect("Failed to create user")
    }

    pub async fn create_vehicle(&self, plate: &str, vehicle_type: VehicleType) -> Vehicle {
        self.desk
            .vehicles()
            .create(&new_vehicle(plate, vehicle_type))
            .await
            .expect("Failed to create vehicle")
    }

    /// Sedan rule with base 50, weekend 1.2, holiday 1.5, long-term 0.9, insurance 15.
    pub async fn create_sedan_pricing(&self) -> PricingRule {
        self.desk
            .pricing()
            .create(&sedan_rule())
            .await
            .expect("Failed to create pricing rule")
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("bad test date")
}

pub fn new_vehicle(plate: &str, vehicle_type: VehicleType) -> NewVehicle {
    NewVehicle {
        make: "Toyota".to_string(),
        model: "Corolla".to_string(),
        year: 2022,
        color: "Silver".to_string(),
        license_plate: plate.to_string(),
        vehicle_type,
        fuel_type: FuelType::Hybrid,
        transmission: Transmission::Automatic,
        seating_capacity: 5,
        mileage: 15_000,
        status: VehicleStatus::Available,
        daily_rate: dec!(50),
        image_path: None,
        description: Some("Compact and economical".to_string()),
    }
}

pub fn sedan_rule() -> NewPricingRule {
    NewPricingRule {
        vehicle_type: VehicleType::Sedan,
        base_daily_rate: dec!(50),
        weekend_multiplier: dec!(1.2),
        holiday_multiplier: dec!(1.5),
        long_term_discount: dec!(0.9),
        insurance_daily_rate: dec!(15),
    }
}

pub fn booking_request(
    user_id: UserId,
    vehicle_id: VehicleId,
    start: &str,
    end: &str,
) -> NewBookingRequest {
    NewBookingRequest {
        user_id,
        vehicle_id,
        start_date: date(start),
        end_date: date(end),
        pickup_location: "Central Station".to_string(),
        dropoff_location: "Airport".to_string(),
        include_insurance: false,
    }
}
