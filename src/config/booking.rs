//! Booking configuration.

use serde::Deserialize;

/// Retry policy for booking attempts that lose a race on the seat list.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    /// Retries after the first attempt.
    pub max_retries: usize,
    /// Initial backoff delay in milliseconds.
    pub min_delay_ms: u64,
    /// Backoff delay ceiling in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            min_delay_ms: 10,
            max_delay_ms: 500,
        }
    }
}
