//! eventro-demo: runs a booking walkthrough against the configured table.
//!
//! ## Configuration
//! - First argument: path to a YAML config file (optional)
//! - EVENTRO_CONFIG / EVENTRO__* environment variables, see `Config::load`
//! - EVENTRO_LOG: tracing filter (default: info)
//!
//! Creates a host, a venue in Austin, an event and a show, books two seats
//! and then tries to book one of them again.

use chrono::{NaiveDate, NaiveTime};
use tracing::{error, info};

use eventro::config::Config;
use eventro::model::{EventCategory, Role, User};
use eventro::services::{Caller, NewEvent, NewVenue, ShowRequest};
use eventro::utils::bootstrap::init_tracing;
use eventro::Eventro;

fn demo_user(id: &str, role: Role) -> User {
    User {
        user_id: id.to_string(),
        username: id.to_string(),
        email: format!("{id}@eventro.test"),
        phone_number: String::new(),
        credential: String::new(),
        role,
        is_blocked: false,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let path = std::env::args().nth(1);
    let config = Config::load(path.as_deref())?;
    let app = Eventro::from_config(&config).await?;

    let admin = demo_user("admin", Role::Admin);
    let host = demo_user("host", Role::Host);
    let fan = demo_user("fan", Role::Customer);
    for user in [&admin, &host, &fan] {
        if let Err(e) = app.users.create(user).await {
            info!(email = %user.email, error = %e, "User already present");
        }
    }
    let (admin, host, fan) = (Caller::from(&admin), Caller::from(&host), Caller::from(&fan));

    let venue = app
        .venues
        .create_venue(
            &host,
            NewVenue {
                name: "The Moody".to_string(),
                city: "Austin".to_string(),
                state: "TX".to_string(),
            },
        )
        .await?;
    let event = app
        .events
        .create_event(
            &admin,
            NewEvent {
                name: "Jazz Night".to_string(),
                description: "An evening of standards".to_string(),
                duration: "2h".to_string(),
                category: EventCategory::Concert,
                artist_ids: Vec::new(),
            },
        )
        .await?;

    let show_date = NaiveDate::from_ymd_opt(2025, 5, 1).ok_or("invalid demo date")?;
    let show_time = NaiveTime::from_hms_opt(18, 0, 0).ok_or("invalid demo time")?;
    let show = app
        .shows
        .create_show(
            &host,
            ShowRequest {
                venue_id: venue.id.clone(),
                event_id: event.id.clone(),
                price: 50.0,
                show_date,
                show_time,
            },
        )
        .await?;

    let listed = app
        .shows
        .browse_shows(&fan, eventro::model::ShowQuery::new(&event.id, &venue.city))
        .await?;
    info!(event_id = %event.id, city = %venue.city, shows = listed.len(), "Shows listed");

    let seats = vec!["A1".to_string(), "A2".to_string()];
    let booking = app.bookings.book(&fan, None, &show.id, &seats).await?;
    info!(
        booking_id = %booking.booking_id,
        total_price = booking.total_price,
        seats = ?booking.seats,
        "Booked"
    );

    match app.bookings.book(&fan, None, &show.id, &["A1".to_string()]).await {
        Ok(b) => error!(booking_id = %b.booking_id, "Seat A1 was booked twice"),
        Err(e) => info!(error = %e, "Second booking for A1 rejected"),
    }

    let bookings = app.bookings.browse_bookings(&fan).await?;
    info!(user_id = %fan.user_id, bookings = bookings.len(), "Done");
    Ok(())
}
