use tracing::info;
use uuid::Uuid;

use super::Caller;
use crate::error::Result;
use crate::model::{Role, Venue, VenueUpdate};
use crate::repository::VenueRepository;
use crate::validation::require_non_empty;

/// Fields of a venue supplied by its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVenue {
    pub name: String,
    pub city: String,
    pub state: String,
}

#[derive(Clone)]
pub struct VenueService {
    venues: VenueRepository,
}

impl VenueService {
    pub fn new(venues: VenueRepository) -> Self {
        Self { venues }
    }

    /// Register a venue owned by the calling host.
    pub async fn create_venue(&self, caller: &Caller, venue: NewVenue) -> Result<Venue> {
        caller.require_role(&[Role::Host, Role::Admin], "create venues")?;
        require_non_empty("venue name", &venue.name)?;
        require_non_empty("venue city", &venue.city)?;

        let venue = Venue {
            id: Uuid::new_v4().to_string(),
            host_id: caller.email.clone(),
            name: venue.name,
            city: venue.city,
            state: venue.state,
            is_blocked: false,
        };
        self.venues.create(&venue).await?;
        Ok(venue)
    }

    pub async fn get_venue(&self, venue_id: &str) -> Result<Venue> {
        self.venues.get_by_id(venue_id).await
    }

    /// Venues owned by the calling host.
    pub async fn host_venues(&self, caller: &Caller) -> Result<Vec<Venue>> {
        caller.require_role(&[Role::Host, Role::Admin], "list hosted venues")?;
        self.venues.list_by_host(&caller.email).await
    }

    /// Merge `update` into the stored venue and write it back whole.
    pub async fn update_venue(
        &self,
        caller: &Caller,
        venue_id: &str,
        update: VenueUpdate,
    ) -> Result<Venue> {
        let mut venue = self.venues.get_by_id(venue_id).await?;
        caller.require_owner(&venue.host_id, "venue")?;
        if update.is_blocked.is_some() {
            caller.require_role(&[Role::Admin], "block venues")?;
        }

        update.apply(&mut venue);
        self.venues.update(&venue).await?;
        info!(venue_id = %venue_id, by = %caller.email, "Venue updated");
        Ok(venue)
    }

    pub async fn delete_venue(&self, caller: &Caller, venue_id: &str) -> Result<Venue> {
        let venue = self.venues.get_by_id(venue_id).await?;
        caller.require_owner(&venue.host_id, "venue")?;
        self.venues.delete(venue_id).await
    }
}
