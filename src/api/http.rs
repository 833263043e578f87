use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api::MusicApi;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{Playlist, Song, StoredSong};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePlaylistRequest {
    name: String,
    is_public: bool,
    user_id: String,
}

pub struct HttpApiClient {
    http_client: Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.http_client.get(format!("{}{}", self.base_url, path)))
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authorize(self.http_client.post(format!("{}{}", self.base_url, path)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    // Any non-2xx is a recoverable failure; the body text becomes the message.
    async fn check(response: Response, what: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        warn!("{} failed ({}): {}", what, status, message);
        Err(AppError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl MusicApi for HttpApiClient {
    async fn get_songs(&self) -> Result<Vec<Song>> {
        debug!("Fetching songs");
        let response = self.get("/api/songs").send().await?;
        let response = Self::check(response, "Fetching songs").await?;

        Ok(response.json().await?)
    }

    async fn create_song(&self, song: &Song) -> Result<Song> {
        let response = self.post("/api/songs").json(song).send().await?;
        let response = Self::check(response, "Creating song").await?;

        let created: Song = response.json().await?;
        info!("Created song: {}", created.name);

        Ok(created)
    }

    async fn get_stored_songs(&self) -> Result<Vec<StoredSong>> {
        debug!("Fetching stored songs");
        let response = self.get("/api/songs/stored").send().await?;
        let response = Self::check(response, "Fetching stored songs").await?;

        Ok(response.json().await?)
    }

    async fn get_my_playlists(&self) -> Result<Vec<Playlist>> {
        debug!("Fetching user playlists");
        let response = self.get("/api/playlists/my").send().await?;
        let response = Self::check(response, "Fetching playlists").await?;

        Ok(response.json().await?)
    }

    async fn get_public_playlists(&self) -> Result<Vec<Playlist>> {
        debug!("Fetching public playlists");
        let response = self.get("/api/playlists/public").send().await?;
        let response = Self::check(response, "Fetching public playlists").await?;

        Ok(response.json().await?)
    }

    async fn create_playlist(
        &self,
        name: &str,
        is_public: bool,
        user_id: &str,
    ) -> Result<Playlist> {
        let request = CreatePlaylistRequest {
            name: name.to_string(),
            is_public,
            user_id: user_id.to_string(),
        };

        let response = self.post("/api/playlists").json(&request).send().await?;
        let response = Self::check(response, "Creating playlist").await?;

        let created: Playlist = response.json().await?;
        info!("Created playlist: {}", created.name);

        Ok(created)
    }

    async fn add_song_to_playlist(&self, playlist_id: &str, song: &Song) -> Result<()> {
        let path = format!("/api/playlists/{}/songs", urlencoding::encode(playlist_id));

        let response = self.post(&path).json(song).send().await?;
        Self::check(response, "Adding song to playlist").await?;

        info!("Added {} to playlist {}", song.name, playlist_id);

        Ok(())
    }
}
