//! Role-checked operations over the stores.
//!
//! Every service call takes the authenticated [`Caller`]. Authentication
//! itself happens upstream; these services only decide what a caller with
//! a given role may do.

mod artist;
mod booking;
mod event;
mod show;
mod venue;

pub use artist::ArtistService;
pub use booking::BookingCoordinator;
pub use event::{EventService, NewEvent};
pub use show::{ShowRequest, ShowService};
pub use venue::{NewVenue, VenueService};

use crate::error::{Error, Result};
use crate::model::{Role, User};

/// The authenticated user on whose behalf a service call runs.
///
/// Hosts are identified by email; venues and shows record the owning
/// host's email as `host_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: String,
    pub email: String,
    pub role: Role,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with `Forbidden` unless the caller holds one of `roles`.
    pub fn require_role(&self, roles: &[Role], action: &str) -> Result<()> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(Error::forbidden(format!("{} may not {action}", self.role)))
        }
    }

    /// Admins act on anything; everyone else only on what `owner` owns.
    pub fn require_owner(&self, owner: &str, action: &str) -> Result<()> {
        if self.is_admin() || self.email == owner {
            Ok(())
        } else {
            Err(Error::forbidden(format!("{} does not own the {action} target", self.email)))
        }
    }
}

impl From<&User> for Caller {
    fn from(user: &User) -> Self {
        Self::new(&user.user_id, &user.email, user.role)
    }
}
