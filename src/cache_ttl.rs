//! Centralized TTL constants for caching
//!
//! Consistent cache time-to-live values with environment variable overrides.

use std::env;
use std::time::Duration;

// Default TTL constants (in seconds)
pub const TTL_BOOKINGS: u64 = 300; // 5 minutes
pub const CACHE_CLEANUP_INTERVAL: u64 = 60;

/// Get TTL with environment variable override
pub fn ttl_with_env(env_key: &str, default_ttl: u64) -> u64 {
    env::var(env_key)
        .map(|val| val.parse::<u64>().unwrap_or(default_ttl))
        .unwrap_or(default_ttl)
}

/// Get booking snapshot TTL from environment or default
pub fn get_bookings_ttl() -> Duration {
    Duration::from_secs(ttl_with_env("TTL_BOOKINGS_SECONDS", TTL_BOOKINGS))
}

pub fn get_cleanup_interval() -> Duration {
    Duration::from_secs(ttl_with_env("CACHE_CLEANUP_INTERVAL_SECONDS", CACHE_CLEANUP_INTERVAL))
}
