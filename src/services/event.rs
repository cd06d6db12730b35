use std::collections::HashSet;

use tracing::{debug, info};
use uuid::Uuid;

use super::Caller;
use crate::error::{Error, Result};
use crate::model::{Event, EventCategory, EventUpdate, Role};
use crate::repository::{ArtistRepository, EventRepository};
use crate::validation::{require_non_empty, ValidationError};

/// Fields of a new event. Artist names are resolved from `artist_ids`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewEvent {
    pub name: String,
    pub description: String,
    pub duration: String,
    pub category: EventCategory,
    pub artist_ids: Vec<String>,
}

#[derive(Clone)]
pub struct EventService {
    events: EventRepository,
    artists: ArtistRepository,
}

impl EventService {
    pub fn new(events: EventRepository, artists: ArtistRepository) -> Self {
        Self { events, artists }
    }

    pub async fn create_event(&self, caller: &Caller, event: NewEvent) -> Result<Event> {
        caller.require_role(&[Role::Admin, Role::Host], "create events")?;
        require_non_empty("event name", &event.name)?;

        let artist_names = self.artists.names(&event.artist_ids).await?;
        let event = Event {
            id: Uuid::new_v4().to_string(),
            name: event.name,
            description: event.description,
            duration: event.duration,
            category: event.category,
            is_blocked: false,
            artist_ids: event.artist_ids,
            artist_names,
        };
        self.events.create(&event).await?;
        self.get_event(&event.id).await
    }

    /// Like the store read, but a missing event is `NotFound`.
    pub async fn get_event(&self, event_id: &str) -> Result<Event> {
        let event = self.events.get_by_id(event_id).await?;
        if event.is_empty() {
            return Err(Error::not_found("event", event_id));
        }
        Ok(event)
    }

    pub async fn update_event(
        &self,
        caller: &Caller,
        event_id: &str,
        update: EventUpdate,
    ) -> Result<Event> {
        caller.require_role(&[Role::Admin], "update events")?;
        let mut event = self.get_event(event_id).await?;
        let previous_name = event.name.clone();

        update.apply(&mut event);
        require_non_empty("event name", &event.name)?;
        self.events.update(&event, &previous_name).await?;
        info!(event_id = %event_id, by = %caller.email, "Event updated");
        self.get_event(event_id).await
    }

    pub async fn delete_event(&self, caller: &Caller, event_id: &str) -> Result<Event> {
        caller.require_role(&[Role::Admin], "delete events")?;
        self.events.delete(event_id).await
    }

    /// Browse events by city, by name prefix, or both.
    ///
    /// With both, the result is the city's events whose name matches, in
    /// city-index order.
    pub async fn browse_events(&self, city: Option<&str>, name: Option<&str>) -> Result<Vec<Event>> {
        let events = match (city, name) {
            (Some(city), None) => self.events.get_events_by_city(city).await?,
            (None, Some(name)) => {
                let ids = self.events.search_by_name(name).await?;
                self.events.get_many(&ids).await?
            }
            (Some(city), Some(name)) => {
                let ids: HashSet<String> =
                    self.events.search_by_name(name).await?.into_iter().collect();
                self.events
                    .get_events_by_city(city)
                    .await?
                    .into_iter()
                    .filter(|event| ids.contains(&event.id))
                    .collect()
            }
            (None, None) => return Err(ValidationError::EmptyField("city or name").into()),
        };
        debug!(city = ?city, name = ?name, count = events.len(), "Browsed events");
        Ok(events)
    }

    /// Events shown at a host's venues. Hosts may only ask about themselves.
    pub async fn host_events(&self, caller: &Caller, host_id: &str) -> Result<Vec<Event>> {
        caller.require_role(&[Role::Admin, Role::Host], "list hosted events")?;
        caller.require_owner(host_id, "host events")?;
        self.events.get_events_hosted_by_host(host_id).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::Artist;
    use crate::storage::MemoryTableStore;

    async fn service() -> EventService {
        let store = Arc::new(MemoryTableStore::new());
        let artists = ArtistRepository::new(store.clone());
        artists
            .create(&Artist {
                id: "a1".to_string(),
                name: "Mingus Jr".to_string(),
                bio: "Plays the upright bass".to_string(),
            })
            .await
            .unwrap();
        EventService::new(EventRepository::new(store), artists)
    }

    fn admin() -> Caller {
        Caller::new("u0", "admin@example.com", Role::Admin)
    }

    fn jazz() -> NewEvent {
        NewEvent {
            name: "Jazz Night".to_string(),
            duration: "2h".to_string(),
            category: EventCategory::Concert,
            artist_ids: vec!["a1".to_string()],
            ..NewEvent::default()
        }
    }

    #[tokio::test]
    async fn test_create_event_resolves_artist_names() {
        let svc = service().await;
        let event = svc.create_event(&admin(), jazz()).await.unwrap();

        assert_eq!(event.name, "jazz night");
        assert_eq!(event.artist_names, vec!["Mingus Jr"]);
        assert_eq!(svc.get_event(&event.id).await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_create_event_with_unknown_artist_fails() {
        let svc = service().await;
        let mut event = jazz();
        event.artist_ids.push("ghost".to_string());

        assert!(svc.create_event(&admin(), event).await.unwrap_err().is_not_found());
        assert!(svc.browse_events(None, Some("jazz")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_event_is_not_found() {
        let svc = service().await;
        assert!(svc.get_event("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_only_admin_updates_and_deletes() {
        let svc = service().await;
        let event = svc.create_event(&admin(), jazz()).await.unwrap();
        let host = Caller::new("u1", "host@example.com", Role::Host);

        assert!(matches!(
            svc.delete_event(&host, &event.id).await.unwrap_err(),
            Error::Forbidden(_)
        ));

        let rename = EventUpdate {
            name: Some("Blues Night".to_string()),
            ..EventUpdate::default()
        };
        let renamed = svc.update_event(&admin(), &event.id, rename).await.unwrap();
        assert_eq!(renamed.name, "blues night");
        assert!(svc.browse_events(None, Some("jazz")).await.unwrap().is_empty());
        assert_eq!(
            svc.browse_events(None, Some("Blues")).await.unwrap(),
            vec![renamed]
        );

        svc.delete_event(&admin(), &event.id).await.unwrap();
        assert!(svc.get_event(&event.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_browse_requires_a_filter() {
        let svc = service().await;
        let err = svc.browse_events(None, None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::EmptyField(_))));
    }

    #[tokio::test]
    async fn test_host_events_restricted_to_self() {
        let svc = service().await;
        let host = Caller::new("u1", "host@example.com", Role::Host);

        assert!(svc.host_events(&host, "host@example.com").await.unwrap().is_empty());
        assert!(matches!(
            svc.host_events(&host, "other@example.com").await.unwrap_err(),
            Error::Forbidden(_)
        ));
    }
}
