// SPDX-License-Identifier: GPL-3.0-or-later

//! Spotify Web API client used for catalog search, library reads and
//! playlist writes.
//!
//! Requests are paced by a [`RateLimiter`], retried per a [`RetryPolicy`],
//! and library collections are cached in memory for a bounded time.

pub mod cache;
pub mod client;
pub mod error;
pub mod models;
pub mod rate_limiter;
pub mod retry;

pub use cache::LibraryCache;
pub use client::{SpotifyClient, SpotifyClientBuilder, MAX_SEARCH_LIMIT};
pub use error::{Result, SpotifyError};
pub use models::{
    Artist, CurrentUser, Image, Playlist, PlaylistItem, SavedAlbum, SavedTrack, SimplifiedAlbum,
    SimplifiedArtist, Track,
};
pub use rate_limiter::{RatePermit, RateLimiter};
pub use retry::RetryPolicy;
