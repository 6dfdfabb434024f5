//! Vehicle rental desk.
//!
//! Customers browse vehicles and book them; administrators manage the fleet,
//! the bookings and the per-vehicle-type pricing rules. The crate is split
//! into a pure [`domain`] layer (pricing arithmetic, booking state machine,
//! return classification), a SQLite-backed [`storage`] layer, and the
//! [`service::RentalDesk`] that ties them together.

pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod storage;

pub use config::RentalConfig;
pub use error::{RentalError, Result};
pub use service::RentalDesk;
