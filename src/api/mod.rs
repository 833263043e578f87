pub mod http;

pub use http::HttpApiClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Playlist, Song, StoredSong};

/// The remote music-list service. One implementation talks HTTP; tests
/// substitute an in-memory double.
#[async_trait]
pub trait MusicApi: Send + Sync {
    async fn get_songs(&self) -> Result<Vec<Song>>;

    async fn create_song(&self, song: &Song) -> Result<Song>;

    async fn get_stored_songs(&self) -> Result<Vec<StoredSong>>;

    async fn get_my_playlists(&self) -> Result<Vec<Playlist>>;

    async fn get_public_playlists(&self) -> Result<Vec<Playlist>>;

    async fn create_playlist(&self, name: &str, is_public: bool, user_id: &str)
    -> Result<Playlist>;

    async fn add_song_to_playlist(&self, playlist_id: &str, song: &Song) -> Result<()>;
}
