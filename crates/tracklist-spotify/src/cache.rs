// SPDX-License-Identifier: GPL-3.0-or-later

use crate::models::{Artist, SavedAlbum, SavedTrack};
use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const SAVED_TRACKS: &str = "saved_tracks";
pub(crate) const SAVED_ALBUMS: &str = "saved_albums";
pub(crate) const FOLLOWED_ARTISTS: &str = "followed_artists";

/// Time-bounded copies of the user's library collections.
///
/// Walking a large library takes many paged requests, so each collection is
/// kept for `ttl` after it was fetched.
#[derive(Clone)]
pub struct LibraryCache {
    saved_tracks: Cache<&'static str, Arc<Vec<SavedTrack>>>,
    saved_albums: Cache<&'static str, Arc<Vec<SavedAlbum>>>,
    followed_artists: Cache<&'static str, Arc<Vec<Artist>>>,
}

impl std::fmt::Debug for LibraryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryCache")
            .field("saved_tracks", &self.saved_tracks.entry_count())
            .field("saved_albums", &self.saved_albums.entry_count())
            .field("followed_artists", &self.followed_artists.entry_count())
            .finish()
    }
}

fn build<T: Send + Sync + 'static>(ttl: Duration, capacity: u64) -> Cache<&'static str, Arc<Vec<T>>> {
    Cache::builder()
        .max_capacity(capacity)
        .time_to_live(ttl)
        .build()
}

impl LibraryCache {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        Self {
            saved_tracks: build(ttl, capacity),
            saved_albums: build(ttl, capacity),
            followed_artists: build(ttl, capacity),
        }
    }

    pub fn saved_tracks(&self) -> Option<Arc<Vec<SavedTrack>>> {
        self.saved_tracks.get(&SAVED_TRACKS)
    }

    pub fn store_saved_tracks(&self, tracks: Arc<Vec<SavedTrack>>) {
        self.saved_tracks.insert(SAVED_TRACKS, tracks);
    }

    pub fn saved_albums(&self) -> Option<Arc<Vec<SavedAlbum>>> {
        self.saved_albums.get(&SAVED_ALBUMS)
    }

    pub fn store_saved_albums(&self, albums: Arc<Vec<SavedAlbum>>) {
        self.saved_albums.insert(SAVED_ALBUMS, albums);
    }

    pub fn followed_artists(&self) -> Option<Arc<Vec<Artist>>> {
        self.followed_artists.get(&FOLLOWED_ARTISTS)
    }

    pub fn store_followed_artists(&self, artists: Arc<Vec<Artist>>) {
        self.followed_artists.insert(FOLLOWED_ARTISTS, artists);
    }
}

impl Default for LibraryCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(24 * 60 * 60), 16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artist(name: &str) -> Artist {
        Artist {
            id: name.to_lowercase(),
            name: name.to_string(),
            uri: None,
            genres: Vec::new(),
            popularity: 0,
            followers: Default::default(),
            images: Vec::new(),
        }
    }

    #[test]
    fn stores_and_returns_collections() {
        let cache = LibraryCache::default();
        assert!(cache.followed_artists().is_none());

        cache.store_followed_artists(Arc::new(vec![artist("Queen")]));

        let cached = cache.followed_artists().expect("artists should be cached");
        assert_eq!(cached[0].name, "Queen");
    }

    #[test]
    fn collections_are_cached_independently() {
        let cache = LibraryCache::default();
        cache.store_saved_albums(Arc::new(Vec::new()));

        assert!(cache.saved_albums().is_some());
        assert!(cache.saved_tracks().is_none());
        assert!(cache.followed_artists().is_none());
    }
}
