//! Booking store: `USER#<userId>` / `BOOKED_SHOW_DATE#<dt>#BOOKINGID#<id>`.
//!
//! Bookings are create-only.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::keys;
use crate::model::Booking;
use crate::storage::{from_item, to_item, Condition, TableStore, WriteOp};

#[derive(Debug, Serialize, Deserialize)]
struct BookingRow {
    pk: String,
    sk: String,
    booking_id: String,
    user_id: String,
    show_id: String,
    event_id: String,
    show_date_time: String,
    time_booked: String,
    num_tickets_booked: u32,
    total_price: f64,
    seats: Vec<String>,
    venue_city: String,
    venue_name: String,
    venue_state: String,
    event_name: String,
    event_duration: String,
}

impl BookingRow {
    fn from_booking(booking: &Booking) -> Result<Self> {
        let starts_at = keys::parse_show_date_time(&booking.show_date_time)?;
        let key = keys::booking_key(&booking.user_id, starts_at, &booking.booking_id)?;
        Ok(Self {
            pk: key.pk,
            sk: key.sk,
            booking_id: booking.booking_id.clone(),
            user_id: booking.user_id.clone(),
            show_id: booking.show_id.clone(),
            event_id: booking.event_id.clone(),
            show_date_time: booking.show_date_time.clone(),
            time_booked: booking.time_booked.clone(),
            num_tickets_booked: booking.num_tickets,
            total_price: booking.total_price,
            seats: booking.seats.clone(),
            venue_city: booking.venue_city.clone(),
            venue_name: booking.venue_name.clone(),
            venue_state: booking.venue_state.clone(),
            event_name: booking.event_name.clone(),
            event_duration: booking.event_duration.clone(),
        })
    }

    fn into_booking(self) -> Result<Booking> {
        let (show_date_time, booking_id) = keys::parse_booking_sk(&self.sk)?;
        Ok(Booking {
            booking_id: booking_id.to_string(),
            user_id: self.user_id,
            show_id: self.show_id,
            event_id: self.event_id,
            show_date_time: show_date_time.to_string(),
            time_booked: self.time_booked,
            num_tickets: self.num_tickets_booked,
            total_price: self.total_price,
            seats: self.seats,
            venue_city: self.venue_city,
            venue_name: self.venue_name,
            venue_state: self.venue_state,
            event_name: self.event_name,
            event_duration: self.event_duration,
        })
    }
}

#[derive(Clone)]
pub struct BookingRepository {
    store: Arc<dyn TableStore>,
}

impl BookingRepository {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// The conditional put of a new booking row, for use in a transaction.
    pub fn put_op(&self, booking: &Booking) -> Result<WriteOp> {
        let row = BookingRow::from_booking(booking)?;
        Ok(WriteOp::put(to_item(&row)?, Condition::NotExists))
    }

    pub async fn create(&self, booking: &Booking) -> Result<()> {
        let row = BookingRow::from_booking(booking)?;
        self.store
            .put(to_item(&row)?, Condition::NotExists)
            .await
            .map_err(|e| {
                if e.is_condition_failure() {
                    Error::AlreadyExists {
                        entity: "booking",
                        id: booking.booking_id.clone(),
                    }
                } else {
                    e.into()
                }
            })?;
        info!(booking_id = %booking.booking_id, user_id = %booking.user_id, "Created booking");
        Ok(())
    }

    /// A user's bookings ordered by show start. Empty when there are none.
    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<Booking>> {
        let items = self
            .store
            .query(&keys::user_partition(user_id)?, keys::BOOKING_PREFIX, None)
            .await?;
        debug!(user_id = %user_id, count = items.len(), "Listed bookings");
        items
            .into_iter()
            .map(|item| from_item::<BookingRow>(item)?.into_booking())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryTableStore;

    fn booking(id: &str, user: &str, show_date_time: &str) -> Booking {
        Booking {
            booking_id: id.to_string(),
            user_id: user.to_string(),
            show_id: "sh1".to_string(),
            event_id: "e1".to_string(),
            show_date_time: show_date_time.to_string(),
            time_booked: "2025-04-01T10:00:00+00:00".to_string(),
            num_tickets: 2,
            total_price: 100.0,
            seats: vec!["A1".to_string(), "A2".to_string()],
            venue_city: "Austin".to_string(),
            venue_name: "The Moody".to_string(),
            venue_state: "TX".to_string(),
            event_name: "jazz night".to_string(),
            event_duration: "2h".to_string(),
        }
    }

    #[tokio::test]
    async fn test_list_by_user_empty() {
        let repo = BookingRepository::new(Arc::new(MemoryTableStore::new()));
        assert!(repo.list_by_user("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_by_user_orders_by_show_date() {
        let repo = BookingRepository::new(Arc::new(MemoryTableStore::new()));
        let late = booking("b1", "u1", "2025-06-01T18:00");
        let early = booking("b2", "u1", "2025-05-01T18:00");
        repo.create(&late).await.unwrap();
        repo.create(&early).await.unwrap();
        repo.create(&booking("b3", "u2", "2025-05-01T18:00")).await.unwrap();

        assert_eq!(repo.list_by_user("u1").await.unwrap(), vec![early, late]);
    }

    #[tokio::test]
    async fn test_list_ignores_user_details_row() {
        let store = Arc::new(MemoryTableStore::new());
        let repo = BookingRepository::new(store.clone());
        store
            .put(
                crate::storage::item::fields([
                    ("pk", serde_json::json!("USER#u1")),
                    ("sk", serde_json::json!("DETAILS")),
                ]),
                Condition::Always,
            )
            .await
            .unwrap();
        repo.create(&booking("b1", "u1", "2025-05-01T18:00")).await.unwrap();

        assert_eq!(repo.list_by_user("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_show_time_rejected() {
        let repo = BookingRepository::new(Arc::new(MemoryTableStore::new()));
        let err = repo.create(&booking("b1", "u1", "May 1st")).await.unwrap_err();
        assert!(matches!(err, Error::Key(_)));
    }
}
