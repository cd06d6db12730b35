//! Artist store: `ARTIST#<artistId>` / `NAME#<name>`.

use std::sync::Arc;

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::keys;
use crate::model::Artist;
use crate::storage::{from_item, to_item, Condition, TableStore};

#[derive(Debug, Serialize, Deserialize)]
struct ArtistRow {
    pk: String,
    sk: String,
    artist_id: String,
    bio: String,
}

#[derive(Clone)]
pub struct ArtistRepository {
    store: Arc<dyn TableStore>,
}

impl ArtistRepository {
    pub fn new(store: Arc<dyn TableStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, artist: &Artist) -> Result<()> {
        let key = keys::artist_key(&artist.id, &artist.name)?;
        let row = ArtistRow {
            pk: key.pk,
            sk: key.sk,
            artist_id: artist.id.clone(),
            bio: artist.bio.clone(),
        };
        self.store
            .put(to_item(&row)?, Condition::NotExists)
            .await
            .map_err(|e| {
                if e.is_condition_failure() {
                    Error::AlreadyExists {
                        entity: "artist",
                        id: artist.id.clone(),
                    }
                } else {
                    e.into()
                }
            })?;
        info!(artist_id = %artist.id, "Created artist");
        Ok(())
    }

    pub async fn get_by_id(&self, artist_id: &str) -> Result<Artist> {
        let item = self
            .store
            .query(&keys::artist_partition(artist_id)?, keys::NAME_PREFIX, Some(1))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found("artist", artist_id))?;
        let row: ArtistRow = from_item(item)?;
        Ok(Artist {
            id: row.artist_id,
            name: keys::parse_artist_name(&row.sk)?.to_string(),
            bio: row.bio,
        })
    }

    /// Names of the given artists, in order. Fails if any id is unknown.
    pub async fn names(&self, artist_ids: &[String]) -> Result<Vec<String>> {
        let artists = try_join_all(artist_ids.iter().map(|id| self.get_by_id(id))).await?;
        Ok(artists.into_iter().map(|artist| artist.name).collect())
    }
}
