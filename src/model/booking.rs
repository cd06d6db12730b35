use serde::{Deserialize, Serialize};

/// A confirmed booking with the venue/event snapshot taken when it was made.
///
/// Bookings are immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub booking_id: String,
    pub user_id: String,
    pub show_id: String,
    pub event_id: String,
    /// Show start (`YYYY-MM-DDTHH:MM`), also the booking's sort-key date.
    pub show_date_time: String,
    /// RFC 3339 timestamp of when the booking was made.
    pub time_booked: String,
    pub num_tickets: u32,
    pub total_price: f64,
    pub seats: Vec<String>,
    pub venue_city: String,
    pub venue_name: String,
    pub venue_state: String,
    pub event_name: String,
    pub event_duration: String,
}
