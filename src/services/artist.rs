use uuid::Uuid;

use super::Caller;
use crate::error::Result;
use crate::model::{Artist, Role};
use crate::repository::ArtistRepository;
use crate::validation::{require_non_empty, validate_artist_bio};

#[derive(Clone)]
pub struct ArtistService {
    artists: ArtistRepository,
}

impl ArtistService {
    pub fn new(artists: ArtistRepository) -> Self {
        Self { artists }
    }

    pub async fn create_artist(&self, caller: &Caller, name: &str, bio: &str) -> Result<Artist> {
        caller.require_role(&[Role::Admin], "create artists")?;
        require_non_empty("artist name", name)?;
        validate_artist_bio(bio)?;

        let artist = Artist {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            bio: bio.to_string(),
        };
        self.artists.create(&artist).await?;
        Ok(artist)
    }

    pub async fn get_artist(&self, artist_id: &str) -> Result<Artist> {
        self.artists.get_by_id(artist_id).await
    }
}
