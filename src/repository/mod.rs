//! Entity stores over the single table.
//!
//! Each repository owns the row shapes of its entity and of the index rows
//! it maintains, and builds every key through [`crate::keys`].

mod artist;
mod booking;
mod event;
mod show;
mod user;
mod venue;

pub use artist::ArtistRepository;
pub use booking::BookingRepository;
pub use event::EventRepository;
pub use show::ShowRepository;
pub use user::UserRepository;
pub use venue::VenueRepository;

/// Attribute holding a user's owned venue ids.
pub const VENUE_IDS_ATTRIBUTE: &str = "venue_ids";
/// Attribute holding a show's booked seat codes.
pub const BOOKED_SEATS_ATTRIBUTE: &str = "booked_seats";
