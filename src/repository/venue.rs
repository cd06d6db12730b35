//! Venue store.
//!
//! A venue row is `VENUE#<venueId>` / `HOST#<hostId>`; the owning user's
//! row carries the list of venue ids the host owns. The two are written
//! one after the other, not atomically.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use backon::Retryable;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::VENUE_IDS_ATTRIBUTE;
use crate::error::{Error, Result};
use crate::keys;
use crate::model::Venue;
use crate::storage::item::{fields, string_list};
use crate::storage::{from_item, to_item, AppendMode, Condition, StorageError, TableStore};
use crate::utils::retry::list_update_backoff;

#[derive(Debug, Serialize, Deserialize)]
struct VenueRow {
    pk: String,
    sk: String,
    venue_name: String,
    venue_city: String,
    venue_state: String,
    #[serde(default)]
    is_blocked: bool,
}

impl VenueRow {
    /// The city later keys the city and date indexes, so it must be a valid segment.
    fn from_venue(venue: &Venue) -> Result<Self> {
        let key = keys::venue_key(&venue.id, &venue.host_id)?;
        keys::segment("city", &venue.city)?;
        Ok(Self {
            pk: key.pk,
            sk: key.sk,
            venue_name: venue.name.clone(),
            venue_city: venue.city.clone(),
            venue_state: venue.state.clone(),
            is_blocked: venue.is_blocked,
        })
    }

    fn into_venue(self) -> Result<Venue> {
        Ok(Venue {
            id: keys::parse_venue_id(&self.pk)?.to_string(),
            host_id: keys::parse_host_id(&self.sk)?.to_string(),
            name: self.venue_name,
            city: self.venue_city,
            state: self.venue_state,
            is_blocked: self.is_blocked,
        })
    }
}

#[derive(Clone)]
pub struct VenueRepository {
    store: Arc<dyn TableStore>,
}

impl VenueRepository {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Write the venue row, then append its id to the host's venue list.
    ///
    /// If the append fails the venue row stays behind, unreferenced by the
    /// host list, and the error is returned.
    pub async fn create(&self, venue: &Venue) -> Result<()> {
        let row = VenueRow::from_venue(venue)?;
        self.store
            .put(to_item(&row)?, Condition::NotExists)
            .await
            .map_err(|e| {
                if e.is_condition_failure() {
                    Error::AlreadyExists {
                        entity: "venue",
                        id: venue.id.clone(),
                    }
                } else {
                    e.into()
                }
            })?;

        if let Err(e) = self
            .store
            .append_to_list(
                &keys::user_key(&venue.host_id)?,
                VENUE_IDS_ATTRIBUTE,
                vec![venue.id.clone()],
                AppendMode::Blind,
            )
            .await
        {
            warn!(
                venue_id = %venue.id,
                host_id = %venue.host_id,
                error = %e,
                "Venue written but host venue list not updated"
            );
            return Err(e.into());
        }

        info!(venue_id = %venue.id, host_id = %venue.host_id, city = %venue.city, "Created venue");
        Ok(())
    }

    pub async fn get_by_id(&self, venue_id: &str) -> Result<Venue> {
        let item = self
            .store
            .query(&keys::venue_partition(venue_id)?, keys::HOST_PREFIX, Some(1))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found("venue", venue_id))?;
        from_item::<VenueRow>(item)?.into_venue()
    }

    /// Venues owned by `host_id`, in the order they were added.
    ///
    /// Empty when the host has no user row or an empty list.
    pub async fn list_by_host(&self, host_id: &str) -> Result<Vec<Venue>> {
        let Some(user) = self.store.get(&keys::user_key(host_id)?).await? else {
            debug!(host_id = %host_id, "No user row for host");
            return Ok(Vec::new());
        };
        let venue_ids = string_list(&user, VENUE_IDS_ATTRIBUTE);
        if venue_ids.is_empty() {
            return Ok(Vec::new());
        }

        let venue_keys = venue_ids
            .iter()
            .map(|id| keys::venue_key(id, host_id))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut by_id = HashMap::new();
        for item in self.store.batch_get(&venue_keys).await? {
            let venue = from_item::<VenueRow>(item)?.into_venue()?;
            by_id.insert(venue.id.clone(), venue);
        }

        Ok(venue_ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    /// Overwrite the venue row. Fails with `NotFound` if it does not exist.
    pub async fn update(&self, venue: &Venue) -> Result<()> {
        let row = VenueRow::from_venue(venue)?;
        self.store
            .put(to_item(&row)?, Condition::Exists)
            .await
            .map_err(|e| {
                if e.is_condition_failure() {
                    Error::not_found("venue", &venue.id)
                } else {
                    e.into()
                }
            })?;
        info!(venue_id = %venue.id, "Updated venue");
        Ok(())
    }

    /// Delete the venue row, then drop its id from the host's venue list.
    pub async fn delete(&self, venue_id: &str) -> Result<Venue> {
        let venue = self.get_by_id(venue_id).await?;
        self.store
            .delete(&keys::venue_key(&venue.id, &venue.host_id)?)
            .await?;

        (|| async { self.remove_from_host_list(&venue.host_id, &venue.id).await })
            .retry(list_update_backoff())
            .when(StorageError::is_condition_failure)
            .notify(|err: &StorageError, dur: Duration| {
                warn!(host_id = %venue.host_id, error = %err, delay = ?dur, "Venue list changed concurrently, retrying");
            })
            .await?;

        info!(venue_id = %venue.id, host_id = %venue.host_id, "Deleted venue");
        Ok(venue)
    }

    /// Compare-and-set the host's venue list without `venue_id`.
    async fn remove_from_host_list(
        &self,
        host_id: &str,
        venue_id: &str,
    ) -> std::result::Result<(), StorageError> {
        let key = keys::user_key(host_id).map_err(|e| StorageError::InvalidItem(e.to_string()))?;
        let Some(user) = self.store.get(&key).await? else {
            warn!(host_id = %host_id, "Host user row missing while deleting venue");
            return Ok(());
        };
        let current = string_list(&user, VENUE_IDS_ATTRIBUTE);
        if !current.iter().any(|id| id == venue_id) {
            return Ok(());
        }
        let remaining: Vec<Value> = current
            .iter()
            .filter(|id| id.as_str() != venue_id)
            .cloned()
            .map(Value::String)
            .collect();

        self.store
            .update(
                &key,
                fields([(VENUE_IDS_ATTRIBUTE, Value::Array(remaining))]),
                Condition::Equals {
                    attribute: VENUE_IDS_ATTRIBUTE.to_string(),
                    value: Value::Array(current.into_iter().map(Value::String).collect()),
                },
            )
            .await
    }
}
