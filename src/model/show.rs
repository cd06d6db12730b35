use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use super::VenueDto;

/// Input for show creation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewShow {
    pub id: String,
    pub host_id: String,
    pub venue_id: String,
    pub event_id: String,
    pub price: f64,
    pub show_date: NaiveDate,
    pub show_time: NaiveTime,
    pub is_blocked: bool,
}

impl NewShow {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.show_date.and_time(self.show_time)
    }
}

/// A show as returned to callers, with its venue snapshot resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShowDto {
    pub id: String,
    pub event_id: String,
    pub host_id: String,
    pub price: f64,
    pub show_date: NaiveDate,
    pub show_time: NaiveTime,
    pub booked_seats: Vec<String>,
    pub venue: VenueDto,
    pub is_blocked: bool,
}

impl ShowDto {
    pub fn starts_at(&self) -> NaiveDateTime {
        self.show_date.and_time(self.show_time)
    }
}

/// Date narrowing for show browsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowDateFilter {
    /// Every show starting on this calendar day.
    Day(NaiveDate),
    /// Shows starting exactly at this minute.
    At(NaiveDateTime),
}

/// Parameters of a browse-by-event query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShowQuery {
    pub event_id: String,
    pub city: String,
    pub date: Option<ShowDateFilter>,
    pub venue_id: Option<String>,
    pub host_id: Option<String>,
}

impl ShowQuery {
    pub fn new(event_id: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            city: city.into(),
            ..Self::default()
        }
    }

    pub fn on(mut self, date: ShowDateFilter) -> Self {
        self.date = Some(date);
        self
    }

    pub fn at_venue(mut self, venue_id: impl Into<String>) -> Self {
        self.venue_id = Some(venue_id.into());
        self
    }

    pub fn hosted_by(mut self, host_id: impl Into<String>) -> Self {
        self.host_id = Some(host_id.into());
        self
    }
}
