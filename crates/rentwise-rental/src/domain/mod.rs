pub mod accounts;
pub mod bookings;
pub mod history;
pub mod pricing;
pub mod types;
pub mod vehicles;

pub use accounts::{Admin, NewAdmin, NewUser, Permission, User};
pub use bookings::{Booking, NewBooking, NewBookingRequest, RentalPeriod};
pub use history::{recent_cutoff, NewRentalHistory, RentalHistoryRecord, ReturnStatus};
pub use pricing::{HolidayCalendar, NewPricingRule, PricingRule, Quote, RateFlags};
pub use types::{
    AdminId, AdminRole, BookingId, BookingStatus, FuelType, HistoryId, PaymentStatus, PricingId,
    RentalOutcome, Transmission, UserId, VehicleId, VehicleStatus, VehicleType,
};
pub use vehicles::{NewVehicle, Vehicle};
