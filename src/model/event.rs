use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    #[default]
    Movie,
    Sports,
    Concert,
    Workshop,
    Party,
}

/// An event (the thing being performed), independent of where and when.
///
/// `Event::default()` is the "empty entity" returned by point reads that
/// find nothing; check [`Event::is_empty`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub description: String,
    pub duration: String,
    pub category: EventCategory,
    pub is_blocked: bool,
    pub artist_ids: Vec<String>,
    pub artist_names: Vec<String>,
}

impl Event {
    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }
}

/// Partial update of an event.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EventUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub duration: Option<String>,
    pub category: Option<EventCategory>,
    pub is_blocked: Option<bool>,
}

impl EventUpdate {
    pub fn apply(self, event: &mut Event) {
        if let Some(name) = self.name {
            event.name = name;
        }
        if let Some(description) = self.description {
            event.description = description;
        }
        if let Some(duration) = self.duration {
            event.duration = duration;
        }
        if let Some(category) = self.category {
            event.category = category;
        }
        if let Some(is_blocked) = self.is_blocked {
            event.is_blocked = is_blocked;
        }
    }
}
