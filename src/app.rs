//! Wiring of stores and services over one table.

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::repository::{
    ArtistRepository, BookingRepository, EventRepository, ShowRepository, UserRepository,
    VenueRepository,
};
use crate::services::{ArtistService, BookingCoordinator, EventService, ShowService, VenueService};
use crate::storage::{init_storage, TableStore};

/// Every service of the booking backend, sharing one table store.
#[derive(Clone)]
pub struct Eventro {
    pub store: Arc<dyn TableStore>,
    pub users: UserRepository,
    pub venues: VenueService,
    pub events: EventService,
    pub shows: ShowService,
    pub bookings: BookingCoordinator,
    pub artists: ArtistService,
}

impl Eventro {
    /// Open the configured table and build the services over it.
    pub async fn from_config(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        let store = init_storage(&config.storage).await?;
        info!(storage = ?config.storage.storage_type, "Eventro initialized");
        Ok(Self::new(store, config))
    }

    pub fn new(store: Arc<dyn TableStore>, config: &Config) -> Self {
        let venues = VenueRepository::new(store.clone());
        let events = EventRepository::new(store.clone());
        let artists = ArtistRepository::new(store.clone());
        let shows = ShowRepository::new(
            store.clone(),
            venues.clone(),
            events.clone(),
            config.shows.ttl_grace_hours,
        );

        Self {
            users: UserRepository::new(store.clone()),
            venues: VenueService::new(venues.clone()),
            events: EventService::new(events.clone(), artists.clone()),
            shows: ShowService::new(shows.clone(), venues, events.clone()),
            bookings: BookingCoordinator::new(
                store.clone(),
                BookingRepository::new(store.clone()),
                shows,
                events,
                config.booking.clone(),
            ),
            artists: ArtistService::new(artists),
            store,
        }
    }
}
