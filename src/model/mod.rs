//! Domain entities and the DTOs returned to calling services.
//!
//! These are plain values; the row shapes that hit the table live in the
//! repositories next to the code that encodes them.

mod artist;
mod booking;
mod event;
mod show;
mod user;
mod venue;

pub use artist::Artist;
pub use booking::Booking;
pub use event::{Event, EventCategory, EventUpdate};
pub use show::{NewShow, ShowDateFilter, ShowDto, ShowQuery};
pub use user::{Role, User};
pub use venue::{Venue, VenueDto, VenueUpdate};
