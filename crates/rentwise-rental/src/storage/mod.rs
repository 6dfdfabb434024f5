//! SQLite persistence.
//!
//! One repository per table, each an async trait with a `Sqlite*`
//! implementation sharing a single [`SqlitePool`]. Money is stored as decimal
//! text and enumerations as their lowercase codes; a value that fails to parse
//! back surfaces as [`RentalError::CorruptRow`].
//!
//! Writes that must land together take a [`SqliteTx`] through the `*_tx`
//! repository methods; the caller owns the commit.

pub mod accounts;
pub mod bookings;
pub mod history;
pub mod pricing;
pub mod vehicles;

pub use accounts::{
    AdminRepository, SqliteAdminRepository, SqliteUserRepository, UserRepository,
};
pub use bookings::{BookingRepository, SqliteBookingRepository};
pub use history::{RentalHistoryRepository, SqliteRentalHistoryRepository};
pub use pricing::{PricingField, PricingRepository, SqlitePricingRepository};
pub use vehicles::{SqliteVehicleRepository, VehicleRepository};

use crate::config::DatabaseConfig;
use crate::error::{RentalError, Result};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::str::FromStr;
use tracing::{debug, info};

pub type SqliteTx<'a> = Transaction<'a, Sqlite>;

/// Handle on the rental database.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let in_memory = config.url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(config.create_if_missing)
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout());
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // every connection to :memory: opens its own empty database, and
        // dropping the last one discards it
        let max_connections = if in_memory { 1 } else { config.max_connections };

        let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
        if in_memory {
            pool_options = pool_options.idle_timeout(None).max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;

        debug!(url = %config.url, max_connections, "Opened rental database");
        Ok(Self { pool })
    }

    /// Private in-memory database with the schema applied.
    pub async fn in_memory() -> Result<Self> {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            create_if_missing: true,
            ..DatabaseConfig::default()
        };
        let db = Self::connect(&config).await?;
        db.migrate().await?;
        Ok(db)
    }

    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open a transaction. It rolls back when dropped without a commit.
    pub async fn begin(&self) -> Result<SqliteTx<'static>> {
        Ok(self.pool.begin().await?)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Rental database migrations applied");
        Ok(())
    }
}

pub(crate) fn decimal_column(
    row: &SqliteRow,
    table: &'static str,
    column: &'static str,
) -> Result<Decimal> {
    let raw: String = row.try_get(column)?;
    Decimal::from_str(&raw).map_err(|_| RentalError::CorruptRow {
        table,
        column,
        value: raw,
    })
}

pub(crate) fn code_column<T>(
    row: &SqliteRow,
    table: &'static str,
    column: &'static str,
) -> Result<T>
where
    T: FromStr<Err = RentalError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|_| RentalError::CorruptRow {
        table,
        column,
        value: raw,
    })
}

/// Map a UNIQUE constraint violation to [`RentalError::Conflict`].
pub(crate) fn unique_violation(err: sqlx::Error, what: impl FnOnce() -> String) -> RentalError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => RentalError::Conflict(what()),
        _ => RentalError::Database(err),
    }
}
