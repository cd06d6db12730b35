use chrono::{NaiveDate, NaiveTime};
use tracing::info;
use uuid::Uuid;

use super::Caller;
use crate::error::{Error, Result};
use crate::model::{NewShow, Role, ShowDto, ShowQuery};
use crate::repository::{EventRepository, ShowRepository, VenueRepository};
use crate::validation::validate_price;

/// A host's request to schedule an event at one of their venues.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowRequest {
    pub venue_id: String,
    pub event_id: String,
    pub price: f64,
    pub show_date: NaiveDate,
    pub show_time: NaiveTime,
}

#[derive(Clone)]
pub struct ShowService {
    shows: ShowRepository,
    venues: VenueRepository,
    events: EventRepository,
}

impl ShowService {
    pub fn new(shows: ShowRepository, venues: VenueRepository, events: EventRepository) -> Self {
        Self {
            shows,
            venues,
            events,
        }
    }

    /// Schedule a show. The venue must belong to the caller unless they are
    /// an admin; neither venue nor event may be blocked.
    pub async fn create_show(&self, caller: &Caller, request: ShowRequest) -> Result<ShowDto> {
        caller.require_role(&[Role::Host, Role::Admin], "create shows")?;
        validate_price(request.price)?;

        let venue = self.venues.get_by_id(&request.venue_id).await?;
        caller.require_owner(&venue.host_id, "venue")?;
        if venue.is_blocked {
            return Err(Error::blocked("venue", &venue.id));
        }

        let event = self.events.get_by_id(&request.event_id).await?;
        if event.is_empty() {
            return Err(Error::not_found("event", &request.event_id));
        }
        if event.is_blocked {
            return Err(Error::blocked("event", &event.id));
        }

        let show = NewShow {
            id: Uuid::new_v4().to_string(),
            host_id: venue.host_id,
            venue_id: venue.id,
            event_id: event.id,
            price: request.price,
            show_date: request.show_date,
            show_time: request.show_time,
            is_blocked: false,
        };
        self.shows.create(&show).await?;
        self.shows.get_by_id(&show.id).await
    }

    pub async fn get_show(&self, show_id: &str) -> Result<ShowDto> {
        self.shows.get_by_id(show_id).await
    }

    /// Browse an event's shows in a city. Hosts only see their own shows.
    pub async fn browse_shows(&self, caller: &Caller, mut query: ShowQuery) -> Result<Vec<ShowDto>> {
        if caller.role == Role::Host {
            query.host_id = Some(caller.email.clone());
        }
        self.shows.list_by_event(&query).await
    }

    pub async fn update_show(&self, caller: &Caller, show_id: &str, is_blocked: bool) -> Result<ShowDto> {
        caller.require_role(&[Role::Host, Role::Admin], "update shows")?;
        let show = self.shows.get_by_id(show_id).await?;
        caller.require_owner(&show.host_id, "show")?;

        self.shows.update(show_id, is_blocked).await?;
        info!(show_id = %show_id, is_blocked, by = %caller.email, "Show updated");
        self.shows.get_by_id(show_id).await
    }
}
