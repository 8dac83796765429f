//! Cache key generation utilities

/// Generate cache key for the parsed booking snapshot of a table
pub fn bookings_snapshot(table: &str) -> String {
    format!("bookings:{}", table)
}
