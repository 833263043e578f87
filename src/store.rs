use std::sync::Arc;

use rand::{Rng, RngExt};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::api::MusicApi;
use crate::archive::{SongArchive, UserIdMatch};
use crate::models::{Playlist, SessionUser, Song, StoredSong};
use crate::session::SessionStatus;

/// Top-level view state, driven by session transitions. The error banner is
/// not a state: it is shown alongside whichever state is current and the
/// view stays interactive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Loading,
    Unauthenticated,
    Authenticated,
}

#[derive(Debug)]
struct State {
    songs: Vec<Song>,
    selected: Option<Song>,
    playlists: Vec<Playlist>,
    public_playlists: Vec<Playlist>,
    archive: SongArchive,
    active_playlist: Option<String>,
    user: Option<SessionUser>,
    view: ViewState,
    loading: bool,
    error: Option<String>,
    // Bumped on every session transition. Fetches capture it before the
    // call and apply results only if it still matches, so a response that
    // arrives after the session moved on is discarded.
    epoch: u64,
}

impl State {
    fn new(match_rule: UserIdMatch) -> Self {
        Self {
            songs: Vec::new(),
            selected: None,
            playlists: Vec::new(),
            public_playlists: Vec::new(),
            archive: SongArchive::new(match_rule),
            active_playlist: None,
            user: None,
            view: ViewState::Loading,
            loading: false,
            error: None,
            epoch: 0,
        }
    }

    // Sign-out teardown: everything user-scoped goes, public playlists stay.
    fn clear_user_scoped(&mut self) {
        self.songs.clear();
        self.selected = None;
        self.playlists.clear();
        self.active_playlist = None;
        self.archive.set_records(Vec::new());
        self.user = None;
        self.loading = false;
        self.error = None;
    }

    fn pick_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<Song> {
        if self.songs.is_empty() {
            return self.selected.clone();
        }

        let index = rng.random_range(0..self.songs.len());
        let song = self.songs[index].clone();
        self.selected = Some(song.clone());
        Some(song)
    }
}

/// All client-side application state for the authenticated variant: a cache
/// of songs, playlists, and stored-song records synchronized with the remote
/// MusicAPI. Mutations are append-on-success: local state changes only after
/// the remote call confirms, so a failure leaves everything as it was and
/// only sets the error banner.
pub struct ClientStateStore {
    api: Arc<dyn MusicApi>,
    state: RwLock<State>,
}

impl ClientStateStore {
    pub fn new(api: Arc<dyn MusicApi>, match_rule: UserIdMatch) -> Self {
        Self {
            api,
            state: RwLock::new(State::new(match_rule)),
        }
    }

    /// Applies a session transition from the external auth provider.
    pub async fn set_session(&self, status: SessionStatus) {
        let mut state = self.state.write().await;
        state.epoch += 1;

        match status {
            SessionStatus::Loading => {
                state.view = ViewState::Loading;
            }
            SessionStatus::Unauthenticated => {
                debug!("Session ended, clearing user state");
                state.clear_user_scoped();
                state.view = ViewState::Unauthenticated;
            }
            SessionStatus::Authenticated(user) => {
                info!(user_id = %user.id, "Session authenticated");
                state.user = Some(user);
                state.view = ViewState::Loading;
            }
        }
    }

    /// Fetches the signed-in user's songs, playlists, and stored songs.
    /// The three fetches are independently recoverable: one failing is
    /// surfaced in the banner without suppressing the others' results.
    /// Returns false if anything failed or the session changed mid-flight.
    pub async fn load_user_data(&self) -> bool {
        let epoch = {
            let mut state = self.state.write().await;
            if state.user.is_none() {
                return false;
            }
            state.loading = true;
            state.epoch
        };

        let songs = self.api.get_songs().await;
        let playlists = self.api.get_my_playlists().await;
        let stored = self.api.get_stored_songs().await;

        let mut state = self.state.write().await;
        if state.epoch != epoch {
            debug!("Discarding user data fetched for a stale session");
            return false;
        }

        let mut failures = Vec::new();

        match songs {
            Ok(songs) => state.songs = songs,
            Err(e) => {
                warn!("Failed to load songs: {}", e);
                failures.push("songs");
            }
        }
        match playlists {
            Ok(playlists) => state.playlists = playlists,
            Err(e) => {
                warn!("Failed to load playlists: {}", e);
                failures.push("playlists");
            }
        }
        match stored {
            Ok(records) => state.archive.set_records(records),
            Err(e) => {
                warn!("Failed to load stored songs: {}", e);
                failures.push("stored songs");
            }
        }

        state.loading = false;
        state.view = ViewState::Authenticated;

        if failures.is_empty() {
            info!(
                songs = state.songs.len(),
                playlists = state.playlists.len(),
                "User data loaded"
            );
            state.error = None;
            true
        } else {
            state.error = Some(format!("Could not load {}", failures.join(", ")));
            false
        }
    }

    /// Fetches publicly visible playlists. Allowed in any session state;
    /// the result survives sign-out.
    pub async fn load_public_playlists(&self) -> bool {
        let epoch = {
            let mut state = self.state.write().await;
            state.loading = true;
            state.epoch
        };

        let result = self.api.get_public_playlists().await;

        let mut state = self.state.write().await;
        if state.epoch != epoch {
            debug!("Discarding public playlists fetched for a stale session");
            return false;
        }
        state.loading = false;

        match result {
            Ok(playlists) => {
                state.public_playlists = playlists;
                state.error = None;
                true
            }
            Err(e) => {
                warn!("Failed to load public playlists: {}", e);
                state.error = Some(format!("Could not load public playlists: {}", e));
                false
            }
        }
    }

    /// Creates a song remotely and appends the server's representation to
    /// the local cache on success. Blank names are rejected silently.
    pub async fn add_song(&self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }

        let song = Song::with_name(name);
        let epoch = self.state.read().await.epoch;

        match self.api.create_song(&song).await {
            Ok(created) => {
                let mut state = self.state.write().await;
                if state.epoch != epoch {
                    debug!("Discarding song created in a stale session");
                    return false;
                }
                // The server representation is authoritative; the
                // client-generated id is dropped with `song`.
                if !state.songs.iter().any(|s| s.id == created.id) {
                    state.songs.push(created);
                }
                state.error = None;
                true
            }
            Err(e) => {
                warn!("Failed to add song {}: {}", name, e);
                let mut state = self.state.write().await;
                if state.epoch == epoch {
                    state.error = Some(format!("Could not add song: {}", e));
                }
                false
            }
        }
    }

    /// Drops a song from the local cache. There is no remote delete; the
    /// cache is the user's working list. Clears the selection if it pointed
    /// at the removed song.
    pub async fn remove_song(&self, id: &str) -> bool {
        let mut state = self.state.write().await;

        let Some(index) = state.songs.iter().position(|s| s.id == id) else {
            return false;
        };

        let song = state.songs.remove(index);
        if state.selected.as_ref().is_some_and(|s| s.id == song.id) {
            state.selected = None;
        }

        true
    }

    pub async fn select_random_song(&self) -> Option<Song> {
        let mut state = self.state.write().await;
        state.pick_random(&mut rand::rng())
    }

    /// Uniform pick over the song cache with a caller-supplied generator.
    /// On an empty cache the previous selection is left as it was.
    pub async fn select_random_song_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Song> {
        let mut state = self.state.write().await;
        state.pick_random(rng)
    }

    pub async fn clear_songs(&self) {
        let mut state = self.state.write().await;
        state.songs.clear();
        state.selected = None;
    }

    /// Creates a playlist owned by the session user, with an empty song
    /// sequence, and appends the server-returned playlist on success.
    /// Requires an authenticated session and a non-blank name.
    pub async fn create_playlist(&self, name: &str, is_public: bool) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }

        let (user_id, epoch) = {
            let state = self.state.read().await;
            match &state.user {
                Some(user) => (user.id.clone(), state.epoch),
                None => return false,
            }
        };

        match self.api.create_playlist(name, is_public, &user_id).await {
            Ok(playlist) => {
                let mut state = self.state.write().await;
                if state.epoch != epoch {
                    debug!("Discarding playlist created in a stale session");
                    return false;
                }
                info!(playlist_id = %playlist.id, "Created playlist {}", playlist.name);
                state.playlists.push(playlist);
                state.error = None;
                true
            }
            Err(e) => {
                warn!("Failed to create playlist {}: {}", name, e);
                let mut state = self.state.write().await;
                if state.epoch == epoch {
                    state.error = Some(format!("Could not create playlist: {}", e));
                }
                false
            }
        }
    }

    /// Appends a song to one of the user's playlists, remotely first and
    /// locally on success. The active playlist resolves through the same
    /// cache, so both views stay consistent.
    pub async fn add_to_playlist(&self, playlist_id: &str, song: Song) -> bool {
        let epoch = {
            let state = self.state.read().await;
            if !state.playlists.iter().any(|p| p.id == playlist_id) {
                return false;
            }
            state.epoch
        };

        match self.api.add_song_to_playlist(playlist_id, &song).await {
            Ok(()) => {
                let mut state = self.state.write().await;
                if state.epoch != epoch {
                    debug!("Discarding playlist addition from a stale session");
                    return false;
                }
                if let Some(playlist) = state.playlists.iter_mut().find(|p| p.id == playlist_id)
                {
                    playlist.songs.push(song);
                }
                state.error = None;
                true
            }
            Err(e) => {
                warn!("Failed to add song to playlist {}: {}", playlist_id, e);
                let mut state = self.state.write().await;
                if state.epoch == epoch {
                    state.error = Some(format!("Could not add song to playlist: {}", e));
                }
                false
            }
        }
    }

    /// Targets a playlist for subsequent additions. It must be present in
    /// the user's playlist cache.
    pub async fn set_active_playlist(&self, playlist_id: &str) -> bool {
        let mut state = self.state.write().await;

        if state.playlists.iter().any(|p| p.id == playlist_id) {
            state.active_playlist = Some(playlist_id.to_string());
            true
        } else {
            false
        }
    }

    pub async fn active_playlist(&self) -> Option<Playlist> {
        let state = self.state.read().await;
        let id = state.active_playlist.as_deref()?;
        state.playlists.iter().find(|p| p.id == id).cloned()
    }

    /// Records an admin storage event in the local archive.
    pub async fn store_song(&self, user_id: &str, name: &str) -> bool {
        self.state.write().await.archive.store(user_id, name)
    }

    pub async fn filter_stored_songs(&self, query: &str) -> Vec<StoredSong> {
        let state = self.state.read().await;
        state.archive.filter(query).into_iter().cloned().collect()
    }

    pub async fn songs(&self) -> Vec<Song> {
        self.state.read().await.songs.clone()
    }

    pub async fn selected_song(&self) -> Option<Song> {
        self.state.read().await.selected.clone()
    }

    pub async fn playlists(&self) -> Vec<Playlist> {
        self.state.read().await.playlists.clone()
    }

    pub async fn public_playlists(&self) -> Vec<Playlist> {
        self.state.read().await.public_playlists.clone()
    }

    pub async fn stored_songs(&self) -> Vec<StoredSong> {
        self.state.read().await.archive.records().to_vec()
    }

    pub async fn view(&self) -> ViewState {
        self.state.read().await.view
    }

    pub async fn user(&self) -> Option<SessionUser> {
        self.state.read().await.user.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn error_banner(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use async_trait::async_trait;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::time::Duration;

    #[derive(Default)]
    struct MockApi {
        songs: Vec<Song>,
        playlists: Vec<Playlist>,
        stored: Vec<StoredSong>,
        public_playlists: Vec<Playlist>,
        fail_get_songs: bool,
        fail_create_song: bool,
        fail_add_to_playlist: bool,
        fetch_delay_ms: u64,
    }

    impl MockApi {
        fn remote_error(what: &str) -> AppError {
            AppError::Api {
                status: 500,
                message: format!("{} unavailable", what),
            }
        }

        async fn delay(&self) {
            if self.fetch_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.fetch_delay_ms)).await;
            }
        }
    }

    #[async_trait]
    impl MusicApi for MockApi {
        async fn get_songs(&self) -> Result<Vec<Song>> {
            self.delay().await;
            if self.fail_get_songs {
                return Err(Self::remote_error("GET /api/songs"));
            }
            Ok(self.songs.clone())
        }

        async fn create_song(&self, song: &Song) -> Result<Song> {
            if self.fail_create_song {
                return Err(Self::remote_error("POST /api/songs"));
            }
            Ok(Song {
                id: format!("srv-{}", song.name),
                ..song.clone()
            })
        }

        async fn get_stored_songs(&self) -> Result<Vec<StoredSong>> {
            self.delay().await;
            Ok(self.stored.clone())
        }

        async fn get_my_playlists(&self) -> Result<Vec<Playlist>> {
            self.delay().await;
            Ok(self.playlists.clone())
        }

        async fn get_public_playlists(&self) -> Result<Vec<Playlist>> {
            Ok(self.public_playlists.clone())
        }

        async fn create_playlist(
            &self,
            name: &str,
            is_public: bool,
            user_id: &str,
        ) -> Result<Playlist> {
            Ok(Playlist {
                id: format!("pl-{}", name),
                name: name.to_string(),
                is_public,
                songs: Vec::new(),
                created_at: "2026-01-01 12:00:00".to_string(),
                user_id: user_id.to_string(),
                user_name: None,
            })
        }

        async fn add_song_to_playlist(&self, _playlist_id: &str, _song: &Song) -> Result<()> {
            if self.fail_add_to_playlist {
                return Err(Self::remote_error("POST /api/playlists/{id}/songs"));
            }
            Ok(())
        }
    }

    fn store_with(api: MockApi) -> ClientStateStore {
        ClientStateStore::new(Arc::new(api), UserIdMatch::Substring)
    }

    fn user(id: &str) -> SessionUser {
        SessionUser {
            id: id.to_string(),
            name: None,
            email: None,
        }
    }

    #[tokio::test]
    async fn test_add_song_appends_server_representation() {
        let store = store_with(MockApi::default());
        store.set_session(SessionStatus::Authenticated(user("u1"))).await;

        assert!(store.add_song("  Imagine ").await);

        let songs = store.songs().await;
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].name, "Imagine");
        assert_eq!(songs[0].id, "srv-Imagine");
        assert!(store.error_banner().await.is_none());
    }

    #[tokio::test]
    async fn test_add_song_blank_name_is_noop() {
        let store = store_with(MockApi::default());

        assert!(!store.add_song("").await);
        assert!(!store.add_song("   ").await);
        assert!(store.songs().await.is_empty());
        assert!(store.error_banner().await.is_none());
    }

    #[tokio::test]
    async fn test_failed_create_song_leaves_state_and_sets_banner() {
        let api = MockApi {
            fail_create_song: true,
            ..MockApi::default()
        };
        let store = store_with(api);
        store.set_session(SessionStatus::Authenticated(user("u1"))).await;

        assert!(!store.add_song("Imagine").await);
        assert!(store.songs().await.is_empty());
        assert!(store.error_banner().await.is_some());

        // A later successful remote call clears the banner.
        assert!(store.create_playlist("Favorites", false).await);
        assert!(store.error_banner().await.is_none());
    }

    #[tokio::test]
    async fn test_create_playlist_requires_session_and_name() {
        let store = store_with(MockApi::default());

        assert!(!store.create_playlist("Favorites", false).await);

        store.set_session(SessionStatus::Authenticated(user("u1"))).await;
        assert!(!store.create_playlist("   ", false).await);
        assert!(store.playlists().await.is_empty());
    }

    #[tokio::test]
    async fn test_create_playlist_then_add_song() {
        let store = store_with(MockApi::default());
        store.set_session(SessionStatus::Authenticated(user("u1"))).await;

        assert!(store.create_playlist("Favorites", false).await);

        let playlists = store.playlists().await;
        assert_eq!(playlists.len(), 1);
        assert_eq!(playlists[0].user_id, "u1");
        assert!(playlists[0].songs.is_empty());

        let id = playlists[0].id.clone();
        assert!(store.set_active_playlist(&id).await);
        assert!(store.add_to_playlist(&id, Song::mock("Imagine")).await);

        assert_eq!(store.playlists().await[0].songs.len(), 1);
        // The active view resolves through the same cache.
        let active = store.active_playlist().await.expect("active playlist set");
        assert_eq!(active.songs.len(), 1);
    }

    #[tokio::test]
    async fn test_add_to_unknown_playlist_is_rejected() {
        let store = store_with(MockApi::default());
        store.set_session(SessionStatus::Authenticated(user("u1"))).await;

        assert!(!store.add_to_playlist("missing", Song::mock("Imagine")).await);
        assert!(!store.set_active_playlist("missing").await);
    }

    #[tokio::test]
    async fn test_failed_playlist_addition_leaves_playlist_unchanged() {
        let api = MockApi {
            playlists: vec![Playlist::mock("Favorites", false)],
            fail_add_to_playlist: true,
            ..MockApi::default()
        };
        let store = store_with(api);
        store.set_session(SessionStatus::Authenticated(user("u1"))).await;
        store.load_user_data().await;

        let id = store.playlists().await[0].id.clone();
        assert!(!store.add_to_playlist(&id, Song::mock("Imagine")).await);
        assert!(store.playlists().await[0].songs.is_empty());
        assert!(store.error_banner().await.is_some());
    }

    #[tokio::test]
    async fn test_load_user_data_populates_caches() {
        let api = MockApi {
            songs: vec![Song::mock("Imagine"), Song::mock("Yesterday")],
            playlists: vec![Playlist::mock("Favorites", false)],
            stored: vec![StoredSong::mock("u1", "A")],
            ..MockApi::default()
        };
        let store = store_with(api);
        store.set_session(SessionStatus::Authenticated(user("u1"))).await;

        assert!(store.load_user_data().await);
        assert_eq!(store.songs().await.len(), 2);
        assert_eq!(store.playlists().await.len(), 1);
        assert_eq!(store.stored_songs().await.len(), 1);
        assert_eq!(store.view().await, ViewState::Authenticated);
        assert!(!store.is_loading().await);
        assert!(store.error_banner().await.is_none());
    }

    #[tokio::test]
    async fn test_load_user_data_without_session_is_noop() {
        let api = MockApi {
            songs: vec![Song::mock("Imagine")],
            ..MockApi::default()
        };
        let store = store_with(api);

        assert!(!store.load_user_data().await);
        assert!(store.songs().await.is_empty());
    }

    #[tokio::test]
    async fn test_partial_load_failure_surfaces_banner_and_keeps_rest() {
        let api = MockApi {
            fail_get_songs: true,
            playlists: vec![Playlist::mock("Favorites", false)],
            stored: vec![StoredSong::mock("u1", "A")],
            ..MockApi::default()
        };
        let store = store_with(api);
        store.set_session(SessionStatus::Authenticated(user("u1"))).await;

        assert!(!store.load_user_data().await);

        // The failed fetch is reported, the successful ones still applied.
        let banner = store.error_banner().await.expect("banner must be set");
        assert!(banner.contains("songs"));
        assert_eq!(store.playlists().await.len(), 1);
        assert_eq!(store.stored_songs().await.len(), 1);
        assert_eq!(store.view().await, ViewState::Authenticated);
    }

    #[tokio::test]
    async fn test_signout_clears_user_state_keeps_public_playlists() {
        let api = MockApi {
            songs: vec![Song::mock("Imagine")],
            playlists: vec![Playlist::mock("Favorites", false)],
            stored: vec![StoredSong::mock("u1", "A")],
            public_playlists: vec![Playlist::mock("Charts", true)],
            ..MockApi::default()
        };
        let store = store_with(api);

        assert!(store.load_public_playlists().await);
        store.set_session(SessionStatus::Authenticated(user("u1"))).await;
        assert!(store.load_user_data().await);

        let id = store.playlists().await[0].id.clone();
        store.set_active_playlist(&id).await;
        store.select_random_song().await;

        store.set_session(SessionStatus::Unauthenticated).await;

        assert!(store.songs().await.is_empty());
        assert!(store.playlists().await.is_empty());
        assert!(store.stored_songs().await.is_empty());
        assert!(store.selected_song().await.is_none());
        assert!(store.active_playlist().await.is_none());
        assert!(store.user().await.is_none());
        assert_eq!(store.view().await, ViewState::Unauthenticated);
        assert_eq!(store.public_playlists().await.len(), 1);
    }

    #[tokio::test]
    async fn test_signout_discards_in_flight_fetch() {
        let api = MockApi {
            songs: vec![Song::mock("Imagine")],
            fetch_delay_ms: 50,
            ..MockApi::default()
        };
        let store = Arc::new(store_with(api));
        store.set_session(SessionStatus::Authenticated(user("u1"))).await;

        let loader = Arc::clone(&store);
        let handle = tokio::spawn(async move { loader.load_user_data().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        store.set_session(SessionStatus::Unauthenticated).await;

        assert!(!handle.await.expect("loader task must not panic"));
        assert!(store.songs().await.is_empty());
        assert_eq!(store.view().await, ViewState::Unauthenticated);
    }

    #[tokio::test]
    async fn test_random_selection_is_member_of_cache() {
        let api = MockApi {
            songs: vec![
                Song::mock("Imagine"),
                Song::mock("Yesterday"),
                Song::mock("Hey Jude"),
            ],
            ..MockApi::default()
        };
        let store = store_with(api);
        store.set_session(SessionStatus::Authenticated(user("u1"))).await;
        store.load_user_data().await;

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            let picked = store
                .select_random_song_with(&mut rng)
                .await
                .expect("non-empty cache must yield a pick");
            assert!(store.songs().await.iter().any(|s| s.id == picked.id));
            assert_eq!(store.selected_song().await, Some(picked));
        }
    }

    #[tokio::test]
    async fn test_random_selection_on_empty_cache_keeps_selection() {
        let store = store_with(MockApi::default());

        assert!(store.select_random_song().await.is_none());
        assert!(store.selected_song().await.is_none());
    }

    #[tokio::test]
    async fn test_remove_song_clears_matching_selection() {
        let api = MockApi {
            songs: vec![Song::mock("Imagine"), Song::mock("Yesterday")],
            ..MockApi::default()
        };
        let store = store_with(api);
        store.set_session(SessionStatus::Authenticated(user("u1"))).await;
        store.load_user_data().await;

        let mut rng = StdRng::seed_from_u64(9);
        let picked = store
            .select_random_song_with(&mut rng)
            .await
            .expect("pick from two songs");

        assert!(store.remove_song(&picked.id).await);
        assert!(store.selected_song().await.is_none());
        assert_eq!(store.songs().await.len(), 1);

        // Removing an id that is not present changes nothing.
        assert!(!store.remove_song("missing").await);
        assert_eq!(store.songs().await.len(), 1);
    }

    #[tokio::test]
    async fn test_store_song_and_filter() {
        let store = store_with(MockApi::default());

        assert!(store.store_song("u1", "A").await);
        assert!(store.store_song("u2", "B").await);
        assert!(!store.store_song("  ", "C").await);

        let matched = store.filter_stored_songs("u1").await;
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "A");

        assert_eq!(store.filter_stored_songs("").await.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_songs_resets_selection() {
        let api = MockApi {
            songs: vec![Song::mock("Imagine")],
            ..MockApi::default()
        };
        let store = store_with(api);
        store.set_session(SessionStatus::Authenticated(user("u1"))).await;
        store.load_user_data().await;
        store.select_random_song().await;

        store.clear_songs().await;
        assert!(store.songs().await.is_empty());
        assert!(store.selected_song().await.is_none());
    }
}
