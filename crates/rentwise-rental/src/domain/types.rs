use crate::error::RentalError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            pub fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(s.trim().parse()?))
            }
        }
    };
}

row_id!(
    /// Renter account identifier
    UserId
);
row_id!(
    /// Administrator account identifier
    AdminId
);
row_id!(
    /// Fleet vehicle identifier
    VehicleId
);
row_id!(
    /// Booking identifier
    BookingId
);
row_id!(
    /// Pricing rule identifier
    PricingId
);
row_id!(
    /// Rental history record identifier
    HistoryId
);

/// Enumerations persisted as lowercase string codes.
///
/// Parsing is case-insensitive and fails with [`RentalError::InvalidCode`] on
/// anything that is not a known code.
macro_rules! code_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($variant:ident => $code:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = RentalError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let code = s.trim();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(code))
                    .ok_or_else(|| RentalError::invalid_code($kind, code))
            }
        }
    };
}

code_enum!(
    /// Body style; pricing rules are keyed by this
    VehicleType, "vehicle type" {
        Sedan => "sedan",
        Suv => "suv",
        Hatchback => "hatchback",
        Convertible => "convertible",
        Truck => "truck",
        Van => "van",
    }
);

impl VehicleType {
    pub fn display_name(&self) -> &'static str {
        match self {
            VehicleType::Sedan => "Sedan",
            VehicleType::Suv => "SUV",
            VehicleType::Hatchback => "Hatchback",
            VehicleType::Convertible => "Convertible",
            VehicleType::Truck => "Truck",
            VehicleType::Van => "Van",
        }
    }
}

code_enum!(
    FuelType, "fuel type" {
        Gasoline => "gasoline",
        Diesel => "diesel",
        Electric => "electric",
        Hybrid => "hybrid",
    }
);

code_enum!(
    Transmission, "transmission" {
        Manual => "manual",
        Automatic => "automatic",
    }
);

code_enum!(
    /// Fleet status of a vehicle
    VehicleStatus, "vehicle status" {
        Available => "available",
        Rented => "rented",
        Maintenance => "maintenance",
        OutOfService => "out_of_service",
    }
);

code_enum!(
    /// Booking lifecycle states
    BookingStatus, "booking status" {
        Pending => "pending",
        Confirmed => "confirmed",
        Active => "active",
        Completed => "completed",
        Cancelled => "cancelled",
    }
);

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }

    /// Statuses that still hold the vehicle for their period.
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::Active
        )
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Active)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
                | (BookingStatus::Active, BookingStatus::Completed)
        )
    }
}

code_enum!(
    /// Payment state, tracked independently of the booking status
    PaymentStatus, "payment status" {
        Pending => "pending",
        Paid => "paid",
        Refunded => "refunded",
    }
);

impl PaymentStatus {
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Paid)
                | (PaymentStatus::Paid, PaymentStatus::Refunded)
        )
    }
}

code_enum!(
    /// Terminal outcome recorded in rental history
    RentalOutcome, "rental status" {
        Completed => "completed",
        Cancelled => "cancelled",
        NoShow => "no_show",
    }
);

impl RentalOutcome {
    pub fn display_name(&self) -> &'static str {
        match self {
            RentalOutcome::Completed => "Completed",
            RentalOutcome::Cancelled => "Cancelled",
            RentalOutcome::NoShow => "No Show",
        }
    }
}

code_enum!(
    AdminRole, "admin role" {
        Admin => "admin",
        SuperAdmin => "super_admin",
    }
);

/// Round a currency amount to cents.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
