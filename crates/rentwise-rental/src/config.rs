use crate::domain::pricing::{HolidayCalendar, NewPricingRule};
use crate::domain::types::VehicleType;
use chrono::NaiveDate;
use rentwise_common::{ConfigLoader, ConfigurationError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Longest recent-history window accepted, roughly a century.
pub const MAX_RECENT_HISTORY_DAYS: i64 = 36_500;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RentalConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub booking: BookingConfig,
}

impl ConfigLoader for RentalConfig {
    const DEFAULT_FILE: &'static str = "rentwise.toml";
    const ENV_PREFIX: &'static str = "RENTWISE_";
}

impl RentalConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.database.url.trim().is_empty() {
            return Err(invalid("database.url", "must not be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(invalid("database.max_connections", "must be at least 1"));
        }
        if !(1..=MAX_RECENT_HISTORY_DAYS).contains(&self.booking.recent_history_days) {
            return Err(invalid(
                "booking.recent_history_days",
                &format!("must be between 1 and {MAX_RECENT_HISTORY_DAYS}"),
            ));
        }

        let mut seen = HashSet::new();
        for rule in &self.pricing.defaults {
            if !seen.insert(rule.vehicle_type) {
                return Err(invalid(
                    "pricing.defaults",
                    &format!("duplicate entry for {}", rule.vehicle_type),
                ));
            }
            rule.to_new_rule()
                .validate()
                .map_err(|e| invalid("pricing.defaults", &e.to_string()))?;
        }

        Ok(())
    }
}

fn invalid(key: &str, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub create_if_missing: bool,
    pub busy_timeout_ms: u64,
}

impl DatabaseConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:rentwise.db".to_string(),
            max_connections: 5,
            create_if_missing: true,
            busy_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingConfig {
    /// Dates charged at the holiday multiplier
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
    /// Rules seeded for vehicle types that have none
    #[serde(default)]
    pub defaults: Vec<DefaultPricing>,
}

impl PricingConfig {
    pub fn holiday_calendar(&self) -> HolidayCalendar {
        HolidayCalendar::new(self.holidays.iter().copied())
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        let rule = |vehicle_type, base: i64, insurance: i64| DefaultPricing {
            vehicle_type,
            base_daily_rate: Decimal::from(base),
            weekend_multiplier: Decimal::new(12, 1),
            holiday_multiplier: Decimal::new(15, 1),
            long_term_discount: Decimal::new(9, 1),
            insurance_daily_rate: Decimal::from(insurance),
        };

        Self {
            holidays: Vec::new(),
            defaults: vec![
                rule(VehicleType::Sedan, 50, 15),
                rule(VehicleType::Suv, 75, 20),
                rule(VehicleType::Hatchback, 40, 12),
                rule(VehicleType::Convertible, 90, 25),
                rule(VehicleType::Truck, 85, 25),
                rule(VehicleType::Van, 80, 20),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefaultPricing {
    pub vehicle_type: VehicleType,
    pub base_daily_rate: Decimal,
    pub weekend_multiplier: Decimal,
    pub holiday_multiplier: Decimal,
    pub long_term_discount: Decimal,
    pub insurance_daily_rate: Decimal,
}

impl DefaultPricing {
    pub fn to_new_rule(&self) -> NewPricingRule {
        NewPricingRule {
            vehicle_type: self.vehicle_type,
            base_daily_rate: self.base_daily_rate,
            weekend_multiplier: self.weekend_multiplier,
            holiday_multiplier: self.holiday_multiplier,
            long_term_discount: self.long_term_discount,
            insurance_daily_rate: self.insurance_daily_rate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingConfig {
    /// Window used for the "recent rentals" listing
    pub recent_history_days: i64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            recent_history_days: 30,
        }
    }
}
