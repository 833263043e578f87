pub mod api;
pub mod archive;
pub mod config;
pub mod error;
pub mod list;
pub mod models;
pub mod session;
pub mod store;

pub use api::{HttpApiClient, MusicApi};
pub use archive::{SongArchive, UserIdMatch};
pub use config::Config;
pub use error::{AppError, Result};
pub use list::SongList;
pub use models::{Playlist, SessionUser, Song, StoredSong};
pub use session::SessionStatus;
pub use store::{ClientStateStore, ViewState};
