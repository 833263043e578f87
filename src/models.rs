use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
}

impl Song {
    /// A new song with a client-generated id. The server's representation
    /// replaces this one once the create call succeeds.
    pub fn with_name(name: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            artist: None,
            duration_secs: None,
        }
    }
}

/// Admin-visible archival record: who stored which song, and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSong {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
    pub stored_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub is_public: bool,
    #[serde(default)]
    pub songs: Vec<Song>,
    pub created_at: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
}

/// Identity supplied by the external session provider. Read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[cfg(test)]
impl Song {
    pub fn mock(name: &str) -> Self {
        Self {
            id: format!("song-{}", name),
            name: name.to_string(),
            artist: Some("Mock Artist".to_string()),
            duration_secs: Some(180),
        }
    }
}

#[cfg(test)]
impl StoredSong {
    pub fn mock(user_id: &str, name: &str) -> Self {
        Self {
            id: format!("stored-{}-{}", user_id, name),
            user_id: user_id.to_string(),
            name: name.to_string(),
            artist: None,
            duration_secs: None,
            stored_at: "2026-01-01 12:00:00".to_string(),
        }
    }
}

#[cfg(test)]
impl Playlist {
    pub fn mock(name: &str, is_public: bool) -> Self {
        Self {
            id: format!("playlist-{}", name),
            name: name.to_string(),
            is_public,
            songs: Vec::new(),
            created_at: "2026-01-01 12:00:00".to_string(),
            user_id: "mock-user".to_string(),
            user_name: Some("Mock User".to_string()),
        }
    }
}
