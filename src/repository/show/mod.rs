//! Show store.
//!
//! Creating a show writes four rows in one transaction:
//! - `SHOW#<id>` / `DETAILS`: the show, with its booked seats
//! - `CITY#<city>` / `EVENT#<eventId>`: event snapshot for browse-by-city
//! - `EVENT#<eventId>#CITY#<city>` / `DATE#<dt>#VENUE#<venueId>#SHOW#<id>`:
//!   date index carrying price and blocked flag
//! - `HOST#<hostId>` / `EVENT#<eventId>`: host index
//!
//! The show row and the date index row expire (`expires_at`) a configured
//! grace period after the show starts.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::{EventRepository, VenueRepository, BOOKED_SEATS_ATTRIBUTE};
use crate::error::{Error, Result};
use crate::keys;
use crate::model::{EventCategory, NewShow, ShowDateFilter, ShowDto, ShowQuery};
use crate::storage::item::fields;
use crate::storage::{from_item, to_item, AppendMode, Condition, TableStore, WriteOp};

#[derive(Debug, Serialize, Deserialize)]
struct ShowRow {
    pk: String,
    sk: String,
    show_id: String,
    venue_id: String,
    event_id: String,
    venue_city: String,
    host_id: String,
    price: f64,
    show_date_time: String,
    created_at: String,
    #[serde(default)]
    booked_seats: Vec<String>,
    #[serde(default)]
    is_blocked: bool,
    expires_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct CityIndexRow {
    pk: String,
    sk: String,
    event_id: String,
    event_name: String,
    description: String,
    duration: String,
    category: EventCategory,
    artist_ids: Vec<String>,
    #[serde(default)]
    is_blocked: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct DateIndexRow {
    pk: String,
    sk: String,
    show_id: String,
    venue_id: String,
    price: f64,
    #[serde(default)]
    is_blocked: bool,
    expires_at: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct HostIndexRow {
    pk: String,
    sk: String,
    event_id: String,
    event_name: String,
}

#[derive(Clone)]
pub struct ShowRepository {
    store: Arc<dyn TableStore>,
    venues: VenueRepository,
    events: EventRepository,
    ttl_grace: Duration,
}

impl ShowRepository {
    pub fn new(
        store: Arc<dyn TableStore>,
        venues: VenueRepository,
        events: EventRepository,
        ttl_grace_hours: i64,
    ) -> Self {
        Self {
            store,
            venues,
            events,
            ttl_grace: Duration::hours(ttl_grace_hours),
        }
    }

    fn expires_at(&self, starts_at: NaiveDateTime) -> i64 {
        (starts_at + self.ttl_grace).and_utc().timestamp()
    }

    /// Create a show and its three index rows atomically.
    ///
    /// City and event snapshots are read from the primary venue and event
    /// rows. Fails with `DuplicateShow` if the show id is taken, leaving
    /// the existing rows untouched.
    #[tracing::instrument(name = "show.create", skip_all, fields(show_id = %show.id, event_id = %show.event_id))]
    pub async fn create(&self, show: &NewShow) -> Result<()> {
        let venue = self.venues.get_by_id(&show.venue_id).await?;
        let event = self.events.get_by_id(&show.event_id).await?;
        if event.is_empty() {
            return Err(Error::not_found("event", &show.event_id));
        }

        let starts_at = show.starts_at();
        let expires_at = self.expires_at(starts_at);

        let show_key = keys::show_key(&show.id)?;
        let show_row = ShowRow {
            pk: show_key.pk,
            sk: show_key.sk,
            show_id: show.id.clone(),
            venue_id: venue.id.clone(),
            event_id: event.id.clone(),
            venue_city: venue.city.clone(),
            host_id: show.host_id.clone(),
            price: show.price,
            show_date_time: keys::format_show_date_time(starts_at),
            created_at: Utc::now().to_rfc3339(),
            booked_seats: Vec::new(),
            is_blocked: show.is_blocked,
            expires_at,
        };

        let city_key = keys::city_event_key(&venue.city, &event.id)?;
        let city_row = CityIndexRow {
            pk: city_key.pk,
            sk: city_key.sk,
            event_id: event.id.clone(),
            event_name: event.name.clone(),
            description: event.description.clone(),
            duration: event.duration.clone(),
            category: event.category,
            artist_ids: event.artist_ids.clone(),
            is_blocked: event.is_blocked,
        };

        let date_key =
            keys::event_city_date_key(&event.id, &venue.city, starts_at, &venue.id, &show.id)?;
        let date_row = DateIndexRow {
            pk: date_key.pk,
            sk: date_key.sk,
            show_id: show.id.clone(),
            venue_id: venue.id.clone(),
            price: show.price,
            is_blocked: show.is_blocked,
            expires_at,
        };

        let host_key = keys::host_event_key(&show.host_id, &event.id)?;
        let host_row = HostIndexRow {
            pk: host_key.pk,
            sk: host_key.sk,
            event_id: event.id.clone(),
            event_name: event.name.clone(),
        };

        let ops = vec![
            WriteOp::put(to_item(&show_row)?, Condition::NotExists),
            WriteOp::put(to_item(&city_row)?, Condition::Always),
            WriteOp::put(to_item(&date_row)?, Condition::Always),
            WriteOp::put(to_item(&host_row)?, Condition::Always),
        ];
        self.store.transact_write(ops).await.map_err(|e| {
            if e.condition_failed_at(0) {
                Error::DuplicateShow(show.id.clone())
            } else {
                e.into()
            }
        })?;

        info!(
            show_id = %show.id,
            venue_id = %venue.id,
            city = %venue.city,
            starts_at = %show_row.show_date_time,
            "Created show"
        );
        Ok(())
    }

    async fn get_row(&self, show_id: &str) -> Result<ShowRow> {
        let item = self
            .store
            .get(&keys::show_key(show_id)?)
            .await?
            .ok_or_else(|| Error::not_found("show", show_id))?;
        Ok(from_item(item)?)
    }

    /// Read a show with its venue snapshot resolved from the venue row.
    pub async fn get_by_id(&self, show_id: &str) -> Result<ShowDto> {
        let row = self.get_row(show_id).await?;
        let starts_at = keys::parse_show_date_time(&row.show_date_time)?;
        let venue = self.venues.get_by_id(&row.venue_id).await?;

        Ok(ShowDto {
            id: row.show_id,
            event_id: row.event_id,
            host_id: row.host_id,
            price: row.price,
            show_date: starts_at.date(),
            show_time: starts_at.time(),
            booked_seats: row.booked_seats,
            venue: venue.dto(),
            is_blocked: row.is_blocked,
        })
    }

    /// Shows of an event in a city, ordered by start time.
    ///
    /// Every hit on the date index is re-read from its show row; the index
    /// row's price wins. Index entries whose show no longer exists are
    /// skipped. `host_id` is applied after the reads.
    pub async fn list_by_event(&self, query: &ShowQuery) -> Result<Vec<ShowDto>> {
        let partition = keys::event_city_partition(&query.event_id, &query.city)?;
        let prefix = keys::date_sk_prefix(query.date.as_ref(), query.venue_id.as_deref())?;
        let rows = self.store.query(&partition, &prefix, None).await?;

        // A whole-day prefix cannot carry the venue, so it is matched here.
        let venue_post_filter = match query.date {
            Some(ShowDateFilter::Day(_)) => query.venue_id.as_deref(),
            _ => None,
        };

        let mut shows = Vec::with_capacity(rows.len());
        for item in rows {
            let row: DateIndexRow = from_item(item)?;
            let entry = keys::parse_date_sk(&row.sk)?;
            if venue_post_filter.is_some_and(|venue_id| venue_id != entry.venue_id) {
                continue;
            }

            let mut show = match self.get_by_id(&entry.show_id).await {
                Ok(show) => show,
                Err(e) if e.is_not_found() => {
                    debug!(show_id = %entry.show_id, error = %e, "Skipping stale date index entry");
                    continue;
                }
                Err(e) => return Err(e),
            };
            show.price = row.price;

            if query
                .host_id
                .as_deref()
                .is_some_and(|host_id| host_id != show.host_id)
            {
                continue;
            }
            shows.push(show);
        }

        debug!(
            event_id = %query.event_id,
            city = %query.city,
            prefix = %prefix,
            count = shows.len(),
            "Listed shows"
        );
        Ok(shows)
    }

    /// Set the blocked flag on the show row and its date index row together.
    pub async fn update(&self, show_id: &str, is_blocked: bool) -> Result<()> {
        let row = self.get_row(show_id).await?;
        let starts_at = keys::parse_show_date_time(&row.show_date_time)?;
        let date_key = keys::event_city_date_key(
            &row.event_id,
            &row.venue_city,
            starts_at,
            &row.venue_id,
            &row.show_id,
        )?;
        let flag = || fields([("is_blocked", Value::Bool(is_blocked))]);

        let ops = vec![
            WriteOp::Update {
                key: keys::show_key(show_id)?,
                fields: flag(),
                condition: Condition::Exists,
            },
            WriteOp::Update {
                key: date_key,
                fields: flag(),
                condition: Condition::Exists,
            },
        ];
        self.store.transact_write(ops).await.map_err(|e| {
            if e.condition_failed_at(0) {
                Error::not_found("show", show_id)
            } else {
                e.into()
            }
        })?;

        info!(show_id = %show_id, is_blocked, "Updated show blocked flag");
        Ok(())
    }

    /// Append seats to a show only if none of them is already booked.
    ///
    /// A taken seat (or a missing show) fails the storage condition and
    /// surfaces as a retryable storage error.
    pub async fn update_show_booking(&self, show_id: &str, seats: &[String]) -> Result<()> {
        self.store
            .append_to_list(
                &keys::show_key(show_id)?,
                BOOKED_SEATS_ATTRIBUTE,
                seats.to_vec(),
                AppendMode::Unique,
            )
            .await?;
        info!(show_id = %show_id, seats = ?seats, "Booked seats");
        Ok(())
    }

    /// The seat append of [`update_show_booking`](Self::update_show_booking)
    /// as a transaction operation.
    pub fn seat_append_op(&self, show_id: &str, seats: &[String]) -> Result<WriteOp> {
        Ok(WriteOp::AppendToList {
            key: keys::show_key(show_id)?,
            attribute: BOOKED_SEATS_ATTRIBUTE.to_string(),
            values: seats.to_vec(),
            mode: AppendMode::Unique,
        })
    }
}
