use serde::{Deserialize, Serialize};

/// A venue owned by a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    pub id: String,
    pub host_id: String,
    pub name: String,
    pub city: String,
    pub state: String,
    pub is_blocked: bool,
}

impl Venue {
    pub fn dto(&self) -> VenueDto {
        VenueDto {
            id: self.id.clone(),
            name: self.name.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
        }
    }
}

/// Venue snapshot embedded in show responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueDto {
    pub id: String,
    pub name: String,
    pub city: String,
    pub state: String,
}

/// Partial update of a venue's mutable fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VenueUpdate {
    pub name: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub is_blocked: Option<bool>,
}

impl VenueUpdate {
    pub fn apply(self, venue: &mut Venue) {
        if let Some(name) = self.name {
            venue.name = name;
        }
        if let Some(city) = self.city {
            venue.city = city;
        }
        if let Some(state) = self.state {
            venue.state = state;
        }
        if let Some(is_blocked) = self.is_blocked {
            venue.is_blocked = is_blocked;
        }
    }
}
