//! Booking coordinator.
//!
//! Reserving seats is one transaction: the booking row (`NotExists`) and
//! the show's seat append (`AppendMode::Unique`) commit together or not at
//! all. A concurrent booking that takes one of the seats first makes the
//! transaction fail its condition; the whole attempt is then retried from
//! a fresh read of the show, which reports the taken seat as
//! `SeatAlreadyBooked`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use backon::Retryable;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use super::Caller;
use crate::config::BookingConfig;
use crate::error::{Error, Result};
use crate::keys;
use crate::model::{Booking, Role};
use crate::repository::{BookingRepository, EventRepository, ShowRepository};
use crate::storage::TableStore;
use crate::utils::retry::booking_backoff;
use crate::validation::check_seat_request;

#[derive(Clone)]
pub struct BookingCoordinator {
    store: Arc<dyn TableStore>,
    bookings: BookingRepository,
    shows: ShowRepository,
    events: EventRepository,
    config: BookingConfig,
}

impl BookingCoordinator {
    pub fn new(
        store: Arc<dyn TableStore>,
        bookings: BookingRepository,
        shows: ShowRepository,
        events: EventRepository,
        config: BookingConfig,
    ) -> Self {
        Self {
            store,
            bookings,
            shows,
            events,
            config,
        }
    }

    /// Book `seats` on a show for `user_id`.
    ///
    /// Fails with `SeatAlreadyBooked` if any seat is taken, whether found
    /// on the first read or after losing a race for it.
    #[tracing::instrument(name = "booking.add", skip_all, fields(user_id = %user_id, show_id = %show_id))]
    pub async fn add_booking(&self, user_id: &str, show_id: &str, seats: &[String]) -> Result<Booking> {
        (|| async { self.try_add_booking(user_id, show_id, seats).await })
            .retry(booking_backoff(&self.config))
            .when(Error::is_retryable)
            .notify(|err: &Error, dur: Duration| {
                warn!(show_id = %show_id, error = %err, delay = ?dur, "Seat reservation lost a race, retrying");
            })
            .await
    }

    async fn try_add_booking(&self, user_id: &str, show_id: &str, seats: &[String]) -> Result<Booking> {
        let show = self.shows.get_by_id(show_id).await?;
        if show.is_blocked {
            return Err(Error::blocked("show", show_id));
        }

        let booked: HashSet<String> = show.booked_seats.iter().cloned().collect();
        let seats = check_seat_request(seats, &booked)?;

        let event = self.events.get_by_id(&show.event_id).await?;
        if event.is_empty() {
            return Err(Error::not_found("event", &show.event_id));
        }

        let booking = Booking {
            booking_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            show_id: show.id.clone(),
            event_id: event.id,
            show_date_time: keys::format_show_date_time(show.starts_at()),
            time_booked: Utc::now().to_rfc3339(),
            num_tickets: seats.len() as u32,
            total_price: seats.len() as f64 * show.price,
            seats,
            venue_city: show.venue.city,
            venue_name: show.venue.name,
            venue_state: show.venue.state,
            event_name: event.name,
            event_duration: event.duration,
        };

        let ops = vec![
            self.bookings.put_op(&booking)?,
            self.shows.seat_append_op(show_id, &booking.seats)?,
        ];
        self.store.transact_write(ops).await?;

        info!(
            booking_id = %booking.booking_id,
            user_id = %user_id,
            show_id = %show_id,
            seats = ?booking.seats,
            total_price = booking.total_price,
            "Booking confirmed"
        );
        Ok(booking)
    }

    /// Book as `caller`. Admins may book on behalf of another user.
    pub async fn book(
        &self,
        caller: &Caller,
        on_behalf_of: Option<&str>,
        show_id: &str,
        seats: &[String],
    ) -> Result<Booking> {
        caller.require_role(&[Role::Customer, Role::Admin], "book shows")?;
        let user_id = match on_behalf_of {
            Some(user_id) if user_id != caller.user_id => {
                caller.require_role(&[Role::Admin], "book for other users")?;
                user_id
            }
            _ => caller.user_id.as_str(),
        };
        self.add_booking(user_id, show_id, seats).await
    }

    /// The caller's own bookings.
    pub async fn browse_bookings(&self, caller: &Caller) -> Result<Vec<Booking>> {
        self.bookings.list_by_user(&caller.user_id).await
    }

    /// Another user's bookings; admins only unless it is the caller.
    pub async fn browse_for(&self, caller: &Caller, user_id: &str) -> Result<Vec<Booking>> {
        if user_id != caller.user_id {
            caller.require_role(&[Role::Admin], "view other users' bookings")?;
        }
        self.bookings.list_by_user(user_id).await
    }
}
