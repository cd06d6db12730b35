//! Retry utilities: backoff builders.
//!
//! Uses `backon` for exponential backoff with jitter. Booking attempts retry
//! when they lose a race on a show's seat list; list maintenance retries
//! when its compare-and-set on a user's venue list is beaten by another writer.

use std::time::Duration;

use backon::ExponentialBuilder;

use crate::config::BookingConfig;

/// Backoff for booking attempts, tuned by configuration.
pub fn booking_backoff(config: &BookingConfig) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(config.min_delay_ms))
        .with_max_delay(Duration::from_millis(config.max_delay_ms))
        .with_max_times(config.max_retries)
        .with_jitter()
}

/// Backoff for read-modify-write of list attributes.
///
/// - Min delay: 5ms
/// - Max delay: 200ms
/// - Max attempts: 8
/// - Jitter enabled
pub fn list_update_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(5))
        .with_max_delay(Duration::from_millis(200))
        .with_max_times(8)
        .with_jitter()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use backon::Retryable;

    use super::*;

    #[tokio::test]
    async fn test_booking_backoff_stops_after_max_retries() {
        let config = BookingConfig {
            max_retries: 3,
            min_delay_ms: 1,
            max_delay_ms: 2,
        };
        let attempts = AtomicUsize::new(0);

        let result: Result<(), &str> = (|| async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err("conflict")
        })
        .retry(booking_backoff(&config))
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }
}
