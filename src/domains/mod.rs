pub mod bookings;
pub mod reports;
