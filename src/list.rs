use rand::{Rng, RngExt};

use crate::models::Song;

/// In-memory song list with random pick; works entirely offline.
/// Names are validated on entry: trimmed, non-empty, no duplicates.
#[derive(Debug, Default)]
pub struct SongList {
    songs: Vec<Song>,
    selected: Option<Song>,
}

impl SongList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a song by display name. Returns false (and leaves the list
    /// untouched) for empty input or a name already present.
    pub fn add(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.songs.iter().any(|s| s.name == name) {
            return false;
        }

        self.songs.push(Song::with_name(name));
        true
    }

    /// Removes the entry at `index`. Clears the selection if it was the
    /// removed entry.
    pub fn remove_at(&mut self, index: usize) -> Option<Song> {
        if index >= self.songs.len() {
            return None;
        }

        let song = self.songs.remove(index);
        if self.selected.as_ref().is_some_and(|s| s.id == song.id) {
            self.selected = None;
        }

        Some(song)
    }

    pub fn remove(&mut self, id: &str) -> Option<Song> {
        let index = self.songs.iter().position(|s| s.id == id)?;
        self.remove_at(index)
    }

    pub fn select_random(&mut self) -> Option<&Song> {
        self.select_random_with(&mut rand::rng())
    }

    /// Uniform pick over the current list. On an empty list the previous
    /// selection is left as it was.
    pub fn select_random_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<&Song> {
        if self.songs.is_empty() {
            return self.selected.as_ref();
        }

        let index = rng.random_range(0..self.songs.len());
        self.selected = Some(self.songs[index].clone());
        self.selected.as_ref()
    }

    pub fn clear(&mut self) {
        self.songs.clear();
        self.selected = None;
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn selected(&self) -> Option<&Song> {
        self.selected.as_ref()
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}
