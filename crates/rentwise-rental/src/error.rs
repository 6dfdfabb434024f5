use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RentalError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(#[from] rentwise_common::ConfigurationError),

    #[error("Invalid booking state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Invalid payment transition from {from} to {to}")]
    InvalidPaymentTransition { from: String, to: String },

    #[error("Booking not found: {id}")]
    BookingNotFound { id: String },

    #[error("Vehicle not found: {id}")]
    VehicleNotFound { id: String },

    #[error("User not found: {id}")]
    UserNotFound { id: String },

    #[error("Admin not found: {id}")]
    AdminNotFound { id: String },

    #[error("No pricing rule for vehicle type {vehicle_type}")]
    PricingNotFound { vehicle_type: String },

    #[error("Rental history record not found: {id}")]
    HistoryNotFound { id: String },

    #[error("Vehicle {id} is not available: {reason}")]
    VehicleUnavailable { id: String, reason: String },

    #[error("Invalid rental period: end date {end} must be after start date {start}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },

    #[error("Invalid {kind} code: {value}")]
    InvalidCode { kind: &'static str, value: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Corrupt value in {table}.{column}: {value}")]
    CorruptRow {
        table: &'static str,
        column: &'static str,
        value: String,
    },
}

impl RentalError {
    pub fn invalid_code(kind: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidCode {
            kind,
            value: value.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RentalError>;
