//! Composite key codec for the single-table layout.
//!
//! Every row lives under a partition key (`pk`) and a sort key (`sk`). This
//! module is the only place that knows the literal prefixes; repositories
//! build and parse keys exclusively through it so index shapes stay in sync.
//!
//! | Row | pk | sk |
//! |---|---|---|
//! | Venue | `VENUE#<venueId>` | `HOST#<hostId>` |
//! | User / venue list | `USER#<email>` | `DETAILS` |
//! | Event | `EVENT#<eventId>` | `DETAILS` |
//! | Event name index | `EVENTS` | `EVENT_NAME#<name>#EVENT_ID#<eventId>` |
//! | City index | `CITY#<city>` | `EVENT#<eventId>` |
//! | Show | `SHOW#<showId>` | `DETAILS` |
//! | Event+city date index | `EVENT#<eventId>#CITY#<city>` | `DATE#<dateTime>#VENUE#<venueId>#SHOW#<showId>` |
//! | Host index | `HOST#<hostId>` | `EVENT#<eventId>` |
//! | Booking | `USER#<userId>` | `BOOKED_SHOW_DATE#<dateTime>#BOOKINGID#<bookingId>` |
//! | Artist | `ARTIST#<artistId>` | `NAME#<name>` |

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::model::ShowDateFilter;

/// Separator between key segments.
pub const SEPARATOR: char = '#';

/// Sort key of every "primary details" row.
pub const DETAILS: &str = "DETAILS";

pub const VENUE_PREFIX: &str = "VENUE#";
pub const HOST_PREFIX: &str = "HOST#";
pub const USER_PREFIX: &str = "USER#";
pub const EVENT_PREFIX: &str = "EVENT#";
pub const SHOW_PREFIX: &str = "SHOW#";
pub const CITY_PREFIX: &str = "CITY#";
pub const DATE_PREFIX: &str = "DATE#";
pub const ARTIST_PREFIX: &str = "ARTIST#";
pub const NAME_PREFIX: &str = "NAME#";
pub const BOOKING_PREFIX: &str = "BOOKED_SHOW_DATE#";

/// Partition holding the event name index.
pub const EVENTS_PARTITION: &str = "EVENTS";
pub const EVENT_NAME_PREFIX: &str = "EVENT_NAME#";

const EVENT_ID_MARKER: &str = "#EVENT_ID#";
const CITY_MARKER: &str = "#CITY#";
const VENUE_MARKER: &str = "#VENUE#";
const SHOW_MARKER: &str = "#SHOW#";
const BOOKING_ID_MARKER: &str = "#BOOKINGID#";

/// Layout of the date-time segment inside date-index and booking sort keys.
pub const SHOW_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid {field} '{value}': key segments must be non-empty and must not contain '#'")]
    InvalidSegment { field: &'static str, value: String },

    #[error("malformed {kind}: {key}")]
    Malformed { kind: &'static str, key: String },
}

pub type Result<T> = std::result::Result<T, KeyError>;

/// Partition/sort key pair addressing one row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableKey {
    pub pk: String,
    pub sk: String,
}

impl TableKey {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
        }
    }
}

impl std::fmt::Display for TableKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.pk, self.sk)
    }
}

/// Check a raw id (or city, email) before embedding it in a key.
pub fn segment<'a>(field: &'static str, value: &'a str) -> Result<&'a str> {
    if value.is_empty() || value.contains(SEPARATOR) {
        return Err(KeyError::InvalidSegment {
            field,
            value: value.to_string(),
        });
    }
    Ok(value)
}

fn strip<'a>(kind: &'static str, prefix: &str, key: &'a str) -> Result<&'a str> {
    key.strip_prefix(prefix).ok_or_else(|| KeyError::Malformed {
        kind,
        key: key.to_string(),
    })
}

// ============================================================================
// Venues and users
// ============================================================================

pub fn venue_partition(venue_id: &str) -> Result<String> {
    Ok(format!("{VENUE_PREFIX}{}", segment("venue id", venue_id)?))
}

/// Sort key of every venue row owned by `host_id`.
pub fn venue_host_sort_key(host_id: &str) -> Result<String> {
    Ok(format!("{HOST_PREFIX}{}", segment("host id", host_id)?))
}

pub fn venue_key(venue_id: &str, host_id: &str) -> Result<TableKey> {
    Ok(TableKey::new(venue_partition(venue_id)?, venue_host_sort_key(host_id)?))
}

pub fn parse_venue_id(pk: &str) -> Result<&str> {
    strip("venue partition key", VENUE_PREFIX, pk)
}

pub fn parse_host_id(sk: &str) -> Result<&str> {
    strip("venue sort key", HOST_PREFIX, sk)
}

pub fn user_partition(user_id: &str) -> Result<String> {
    Ok(format!("{USER_PREFIX}{}", segment("user id", user_id)?))
}

pub fn user_key(user_id: &str) -> Result<TableKey> {
    Ok(TableKey::new(user_partition(user_id)?, DETAILS))
}

pub fn parse_user_id(pk: &str) -> Result<&str> {
    strip("user partition key", USER_PREFIX, pk)
}

// ============================================================================
// Events and their indexes
// ============================================================================

pub fn event_key(event_id: &str) -> Result<TableKey> {
    Ok(TableKey::new(
        format!("{EVENT_PREFIX}{}", segment("event id", event_id)?),
        DETAILS,
    ))
}

pub fn parse_event_id(key: &str) -> Result<&str> {
    strip("event key", EVENT_PREFIX, key)
}

/// Event names are indexed lower-cased so lookups are case-insensitive.
pub fn normalize_event_name(name: &str) -> String {
    name.to_lowercase()
}

pub fn event_name_index_key(name: &str, event_id: &str) -> Result<TableKey> {
    Ok(TableKey::new(
        EVENTS_PARTITION,
        format!(
            "{EVENT_NAME_PREFIX}{}{EVENT_ID_MARKER}{}",
            normalize_event_name(name),
            segment("event id", event_id)?
        ),
    ))
}

pub fn event_name_prefix(name_prefix: &str) -> String {
    format!("{EVENT_NAME_PREFIX}{}", normalize_event_name(name_prefix))
}

/// Split a name-index sort key into `(name, event_id)`.
///
/// Names are free text and may contain `#`; the id follows the last marker.
pub fn parse_event_name_sk(sk: &str) -> Result<(&str, &str)> {
    let rest = strip("event name sort key", EVENT_NAME_PREFIX, sk)?;
    rest.rsplit_once(EVENT_ID_MARKER)
        .filter(|(_, id)| !id.is_empty())
        .ok_or_else(|| KeyError::Malformed {
            kind: "event name sort key",
            key: sk.to_string(),
        })
}

pub fn city_partition(city: &str) -> Result<String> {
    Ok(format!("{CITY_PREFIX}{}", segment("city", city)?))
}

pub fn city_event_key(city: &str, event_id: &str) -> Result<TableKey> {
    Ok(TableKey::new(
        city_partition(city)?,
        format!("{EVENT_PREFIX}{}", segment("event id", event_id)?),
    ))
}

pub fn host_partition(host_id: &str) -> Result<String> {
    Ok(format!("{HOST_PREFIX}{}", segment("host id", host_id)?))
}

pub fn host_event_key(host_id: &str, event_id: &str) -> Result<TableKey> {
    Ok(TableKey::new(
        host_partition(host_id)?,
        format!("{EVENT_PREFIX}{}", segment("event id", event_id)?),
    ))
}

// ============================================================================
// Shows and the event+city date index
// ============================================================================

pub fn show_key(show_id: &str) -> Result<TableKey> {
    Ok(TableKey::new(
        format!("{SHOW_PREFIX}{}", segment("show id", show_id)?),
        DETAILS,
    ))
}

pub fn parse_show_key(pk: &str) -> Result<&str> {
    strip("show partition key", SHOW_PREFIX, pk)
}

pub fn format_show_date_time(at: NaiveDateTime) -> String {
    at.format(SHOW_DATE_TIME_FORMAT).to_string()
}

pub fn parse_show_date_time(value: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, SHOW_DATE_TIME_FORMAT).map_err(|_| KeyError::Malformed {
        kind: "show date-time",
        key: value.to_string(),
    })
}

pub fn event_city_partition(event_id: &str, city: &str) -> Result<String> {
    Ok(format!(
        "{EVENT_PREFIX}{}{CITY_MARKER}{}",
        segment("event id", event_id)?,
        segment("city", city)?
    ))
}

pub fn event_city_date_sort_key(
    starts_at: NaiveDateTime,
    venue_id: &str,
    show_id: &str,
) -> Result<String> {
    Ok(format!(
        "{DATE_PREFIX}{}{VENUE_MARKER}{}{SHOW_MARKER}{}",
        format_show_date_time(starts_at),
        segment("venue id", venue_id)?,
        segment("show id", show_id)?
    ))
}

pub fn event_city_date_key(
    event_id: &str,
    city: &str,
    starts_at: NaiveDateTime,
    venue_id: &str,
    show_id: &str,
) -> Result<TableKey> {
    Ok(TableKey::new(
        event_city_partition(event_id, city)?,
        event_city_date_sort_key(starts_at, venue_id, show_id)?,
    ))
}

/// Sort-key prefix for a date-index range query.
///
/// - no date: `DATE#`
/// - a whole day: `DATE#<YYYY-MM-DD>T` (venue, if any, is matched by the caller)
/// - an exact start: `DATE#<YYYY-MM-DDTHH:MM>#`, or with a venue
///   `DATE#<YYYY-MM-DDTHH:MM>#VENUE#<venueId>#`
pub fn date_sk_prefix(date: Option<&ShowDateFilter>, venue_id: Option<&str>) -> Result<String> {
    match date {
        None => Ok(DATE_PREFIX.to_string()),
        Some(ShowDateFilter::Day(day)) => Ok(format!("{DATE_PREFIX}{}T", day.format("%Y-%m-%d"))),
        Some(ShowDateFilter::At(at)) => match venue_id {
            Some(venue_id) => Ok(format!(
                "{DATE_PREFIX}{}{VENUE_MARKER}{}{SEPARATOR}",
                format_show_date_time(*at),
                segment("venue id", venue_id)?
            )),
            None => Ok(format!("{DATE_PREFIX}{}{SEPARATOR}", format_show_date_time(*at))),
        },
    }
}

/// Parsed form of a date-index sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateIndexEntry {
    pub starts_at: NaiveDateTime,
    pub venue_id: String,
    pub show_id: String,
}

pub fn parse_date_sk(sk: &str) -> Result<DateIndexEntry> {
    let malformed = || KeyError::Malformed {
        kind: "date index sort key",
        key: sk.to_string(),
    };
    let rest = strip("date index sort key", DATE_PREFIX, sk)?;
    let (date_time, rest) = rest.split_once(VENUE_MARKER).ok_or_else(malformed)?;
    let (venue_id, show_id) = rest.split_once(SHOW_MARKER).ok_or_else(malformed)?;
    if venue_id.is_empty() || show_id.is_empty() {
        return Err(malformed());
    }
    Ok(DateIndexEntry {
        starts_at: parse_show_date_time(date_time)?,
        venue_id: venue_id.to_string(),
        show_id: show_id.to_string(),
    })
}

/// Show id of a date index sort key: the text after the last `#SHOW#`.
pub fn parse_show_id(sk: &str) -> Result<&str> {
    match sk.rsplit_once(SHOW_MARKER) {
        Some((_, show_id)) if !show_id.is_empty() => Ok(show_id),
        _ => Err(KeyError::Malformed {
            kind: "date index sort key",
            key: sk.to_string(),
        }),
    }
}

// ============================================================================
// Bookings
// ============================================================================

pub fn booking_key(user_id: &str, show_starts_at: NaiveDateTime, booking_id: &str) -> Result<TableKey> {
    Ok(TableKey::new(
        user_partition(user_id)?,
        format!(
            "{BOOKING_PREFIX}{}{BOOKING_ID_MARKER}{}",
            format_show_date_time(show_starts_at),
            segment("booking id", booking_id)?
        ),
    ))
}

/// Split a booking sort key into `(show_date_time, booking_id)`.
pub fn parse_booking_sk(sk: &str) -> Result<(&str, &str)> {
    let rest = strip("booking sort key", BOOKING_PREFIX, sk)?;
    rest.split_once(BOOKING_ID_MARKER)
        .filter(|(date, id)| !date.is_empty() && !id.is_empty())
        .ok_or_else(|| KeyError::Malformed {
            kind: "booking sort key",
            key: sk.to_string(),
        })
}

// ============================================================================
// Artists
// ============================================================================

pub fn artist_partition(artist_id: &str) -> Result<String> {
    Ok(format!("{ARTIST_PREFIX}{}", segment("artist id", artist_id)?))
}

pub fn artist_key(artist_id: &str, name: &str) -> Result<TableKey> {
    Ok(TableKey::new(artist_partition(artist_id)?, format!("{NAME_PREFIX}{name}")))
}

pub fn parse_artist_name(sk: &str) -> Result<&str> {
    strip("artist sort key", NAME_PREFIX, sk)
}
