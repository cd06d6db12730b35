//! Show configuration.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShowsConfig {
    /// Hours after a show starts before its row expires (TTL).
    pub ttl_grace_hours: i64,
}

impl Default for ShowsConfig {
    fn default() -> Self {
        Self { ttl_grace_hours: 24 }
    }
}
