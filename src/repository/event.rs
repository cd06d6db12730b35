//! Event store.
//!
//! Rows:
//! - `EVENT#<id>` / `DETAILS`: the event itself
//! - `EVENTS` / `EVENT_NAME#<name>#EVENT_ID#<id>`: name index for prefix search
//! - `CITY#<city>` / `EVENT#<id>`: city index, written by show creation
//!
//! Names are stored and indexed lower-cased.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::keys::{self, TableKey};
use crate::model::{Event, EventCategory};
use crate::storage::item::fields;
use crate::storage::{from_item, to_item, Condition, Item, TableStore, WriteOp, PK, SK};

#[derive(Debug, Serialize, Deserialize)]
struct EventRow {
    pk: String,
    sk: String,
    event_id: String,
    event_name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    duration: String,
    #[serde(default)]
    category: EventCategory,
    #[serde(default)]
    is_blocked: bool,
    #[serde(default)]
    artist_ids: Vec<String>,
    #[serde(default)]
    artist_names: Vec<String>,
}

impl EventRow {
    fn from_event(event: &Event) -> Result<Self> {
        let key = keys::event_key(&event.id)?;
        Ok(Self {
            pk: key.pk,
            sk: key.sk,
            event_id: event.id.clone(),
            event_name: keys::normalize_event_name(&event.name),
            description: event.description.clone(),
            duration: event.duration.clone(),
            category: event.category,
            is_blocked: event.is_blocked,
            artist_ids: event.artist_ids.clone(),
            artist_names: event.artist_names.clone(),
        })
    }
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.event_id,
            name: row.event_name,
            description: row.description,
            duration: row.duration,
            category: row.category,
            is_blocked: row.is_blocked,
            artist_ids: row.artist_ids,
            artist_names: row.artist_names,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct NameIndexRow {
    pk: String,
    sk: String,
    event_id: String,
}

fn name_index_item(name: &str, event_id: &str) -> Result<Item> {
    let key = keys::event_name_index_key(name, event_id)?;
    Ok(to_item(&NameIndexRow {
        pk: key.pk,
        sk: key.sk,
        event_id: event_id.to_string(),
    })?)
}

#[derive(Clone)]
pub struct EventRepository {
    store: Arc<dyn TableStore>,
}

impl EventRepository {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    /// Write the event row and its name-index row in one transaction.
    pub async fn create(&self, event: &Event) -> Result<()> {
        let row = EventRow::from_event(event)?;
        let ops = vec![
            WriteOp::put(to_item(&row)?, Condition::NotExists),
            WriteOp::put(name_index_item(&event.name, &event.id)?, Condition::Always),
        ];
        self.store.transact_write(ops).await.map_err(|e| {
            if e.condition_failed_at(0) {
                Error::AlreadyExists {
                    entity: "event",
                    id: event.id.clone(),
                }
            } else {
                e.into()
            }
        })?;

        info!(event_id = %event.id, name = %row.event_name, "Created event");
        Ok(())
    }

    /// Point read. Returns `Event::default()` when the event does not exist.
    pub async fn get_by_id(&self, event_id: &str) -> Result<Event> {
        match self.store.get(&keys::event_key(event_id)?).await? {
            Some(item) => Ok(from_item::<EventRow>(item)?.into()),
            None => {
                debug!(event_id = %event_id, "Event not found");
                Ok(Event::default())
            }
        }
    }

    /// Ids of events whose name starts with `prefix` (case-insensitive),
    /// ordered by name.
    pub async fn search_by_name(&self, prefix: &str) -> Result<Vec<String>> {
        let items = self
            .store
            .query(keys::EVENTS_PARTITION, &keys::event_name_prefix(prefix), None)
            .await?;
        items
            .into_iter()
            .map(|item| -> Result<String> {
                let row: NameIndexRow = from_item(item)?;
                let (_, event_id) = keys::parse_event_name_sk(&row.sk)?;
                Ok(event_id.to_string())
            })
            .collect()
    }

    /// Events with at least one show in `city`.
    ///
    /// The city index only learns about an event when a show is created
    /// there, so this is empty for a city with no shows. Event data comes
    /// from the primary rows; index entries for deleted events are skipped.
    pub async fn get_events_by_city(&self, city: &str) -> Result<Vec<Event>> {
        let items = self
            .store
            .query(&keys::city_partition(city)?, keys::EVENT_PREFIX, None)
            .await?;
        let mut event_ids = Vec::with_capacity(items.len());
        for item in items {
            let sk = item
                .get(SK)
                .and_then(Value::as_str)
                .unwrap_or_default();
            event_ids.push(keys::parse_event_id(sk)?.to_string());
        }
        self.get_many(&event_ids).await
    }

    /// Events with a show at any venue owned by `host_id`, or hosted by them.
    ///
    /// Scans venue and show rows; cost grows with table size.
    pub async fn get_events_hosted_by_host(&self, host_id: &str) -> Result<Vec<Event>> {
        let host_sk = keys::venue_host_sort_key(host_id)?;
        let venue_ids: HashSet<String> = self
            .store
            .scan(keys::VENUE_PREFIX)
            .await?
            .into_iter()
            .filter(|item| item.get(SK).and_then(Value::as_str) == Some(host_sk.as_str()))
            .filter_map(|item| {
                let pk = item.get(PK)?.as_str()?;
                keys::parse_venue_id(pk).ok().map(str::to_string)
            })
            .collect();

        let attr = |item: &Item, name: &str| item.get(name).and_then(Value::as_str).map(str::to_string);
        let mut event_ids = BTreeSet::new();
        for item in self.store.scan(keys::SHOW_PREFIX).await? {
            let hosted = attr(&item, "host_id").as_deref() == Some(host_id)
                || attr(&item, "venue_id").is_some_and(|v| venue_ids.contains(&v));
            if let Some(event_id) = attr(&item, "event_id").filter(|_| hosted) {
                event_ids.insert(event_id);
            }
        }

        debug!(host_id = %host_id, venues = venue_ids.len(), events = event_ids.len(), "Resolved host events");
        self.get_many(&event_ids.into_iter().collect::<Vec<_>>()).await
    }

    /// Batch read, preserving the order of `event_ids` and skipping missing events.
    pub async fn get_many(&self, event_ids: &[String]) -> Result<Vec<Event>> {
        if event_ids.is_empty() {
            return Ok(Vec::new());
        }
        let event_keys = event_ids
            .iter()
            .map(|id| keys::event_key(id))
            .collect::<std::result::Result<Vec<TableKey>, _>>()?;
        let mut by_id = HashMap::new();
        for item in self.store.batch_get(&event_keys).await? {
            let event: Event = from_item::<EventRow>(item)?.into();
            by_id.insert(event.id.clone(), event);
        }
        Ok(event_ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    pub async fn update_blocked(&self, event_id: &str, is_blocked: bool) -> Result<()> {
        self.store
            .update(
                &keys::event_key(event_id)?,
                fields([("is_blocked", Value::Bool(is_blocked))]),
                Condition::Exists,
            )
            .await
            .map_err(|e| {
                if e.is_condition_failure() {
                    Error::not_found("event", event_id)
                } else {
                    e.into()
                }
            })?;
        info!(event_id = %event_id, is_blocked, "Updated event blocked flag");
        Ok(())
    }

    /// Overwrite an event, moving its name-index row when the name changed.
    pub async fn update(&self, event: &Event, previous_name: &str) -> Result<()> {
        let row = EventRow::from_event(event)?;
        let mut ops = vec![WriteOp::put(to_item(&row)?, Condition::Exists)];
        if keys::normalize_event_name(previous_name) != row.event_name {
            ops.push(WriteOp::Delete {
                key: keys::event_name_index_key(previous_name, &event.id)?,
            });
            ops.push(WriteOp::put(
                name_index_item(&event.name, &event.id)?,
                Condition::Always,
            ));
        }

        self.store.transact_write(ops).await.map_err(|e| {
            if e.condition_failed_at(0) {
                Error::not_found("event", &event.id)
            } else {
                e.into()
            }
        })?;
        info!(event_id = %event.id, "Updated event");
        Ok(())
    }

    /// Delete the event row and its name-index row.
    ///
    /// City-index rows are left in place; readers skip them once the
    /// primary row is gone.
    pub async fn delete(&self, event_id: &str) -> Result<Event> {
        let event = self.get_by_id(event_id).await?;
        if event.is_empty() {
            return Err(Error::not_found("event", event_id));
        }
        self.store
            .transact_write(vec![
                WriteOp::Delete {
                    key: keys::event_key(event_id)?,
                },
                WriteOp::Delete {
                    key: keys::event_name_index_key(&event.name, event_id)?,
                },
            ])
            .await?;
        info!(event_id = %event_id, "Deleted event");
        Ok(event)
    }
}
