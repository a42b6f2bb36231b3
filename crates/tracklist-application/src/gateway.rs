// SPDX-License-Identifier: GPL-3.0-or-later

//! Seams between the matching pipeline and the catalog service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracklist_domain::Candidate;
use tracklist_spotify::{SpotifyClient, SpotifyError, Track};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    #[error("catalog rate limit hit, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("transient catalog failure: {0}")]
    Transient(String),

    #[error("catalog rejected the request: {0}")]
    Rejected(String),
}

impl From<SpotifyError> for GatewayError {
    fn from(error: SpotifyError) -> Self {
        match error.root() {
            SpotifyError::RateLimited { retry_after } => Self::RateLimited {
                retry_after: *retry_after,
            },
            SpotifyError::Transient { .. } | SpotifyError::RequestFailed(_) => {
                Self::Transient(error.to_string())
            }
            _ => Self::Rejected(error.to_string()),
        }
    }
}

/// Free-text track search against the catalog.
#[async_trait]
pub trait CatalogSearchGateway: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, GatewayError>;
}

#[async_trait]
impl<T: CatalogSearchGateway + ?Sized> CatalogSearchGateway for &T {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, GatewayError> {
        (**self).search(query, limit).await
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub public: bool,
}

impl PlaylistRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            public: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedPlaylist {
    pub id: String,
    pub uri: Option<String>,
    pub name: String,
    pub url: Option<String>,
    pub public: bool,
}

/// Playlist writes.
#[async_trait]
pub trait PlaylistGateway: Send + Sync {
    async fn create_playlist(
        &self,
        request: &PlaylistRequest,
    ) -> Result<CreatedPlaylist, GatewayError>;

    /// Append `uris` in order. Returns the number of tracks added.
    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<usize, GatewayError>;
}

#[async_trait]
impl<T: PlaylistGateway + ?Sized> PlaylistGateway for &T {
    async fn create_playlist(
        &self,
        request: &PlaylistRequest,
    ) -> Result<CreatedPlaylist, GatewayError> {
        (**self).create_playlist(request).await
    }

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<usize, GatewayError> {
        (**self).add_tracks(playlist_id, uris).await
    }
}

/// Catalog tracks without an id or uri cannot be added anywhere and are dropped.
pub fn candidate_from_track(track: Track) -> Option<Candidate> {
    let artists = track.artists.iter().map(|a| a.name.clone()).collect();
    let album_name = track.album_name().unwrap_or_default().to_string();
    Some(Candidate {
        id: track.id?,
        uri: track.uri?,
        name: track.name,
        artists,
        album_name,
        duration_ms: track.duration_ms,
        popularity: track.popularity.min(100),
        preview_url: track.preview_url,
    })
}

#[async_trait]
impl CatalogSearchGateway for SpotifyClient {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, GatewayError> {
        let tracks = self.search_tracks(query, limit).await?;
        Ok(tracks.into_iter().filter_map(candidate_from_track).collect())
    }
}

#[async_trait]
impl PlaylistGateway for SpotifyClient {
    async fn create_playlist(
        &self,
        request: &PlaylistRequest,
    ) -> Result<CreatedPlaylist, GatewayError> {
        let playlist = SpotifyClient::create_playlist(
            self,
            &request.name,
            &request.description,
            request.public,
        )
        .await?;

        Ok(CreatedPlaylist {
            id: playlist.id,
            uri: playlist.uri,
            name: playlist.name,
            url: playlist.external_urls.spotify,
            public: playlist.public.unwrap_or(request.public),
        })
    }

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<usize, GatewayError> {
        self.add_tracks_to_playlist(playlist_id, uris).await?;
        Ok(uris.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracklist_spotify::{SimplifiedAlbum, SimplifiedArtist};

    fn track(id: Option<&str>) -> Track {
        Track {
            id: id.map(str::to_string),
            name: "Bohemian Rhapsody".to_string(),
            uri: id.map(|id| format!("spotify:track:{}", id)),
            artists: vec![SimplifiedArtist {
                id: None,
                name: "Queen".to_string(),
                uri: None,
            }],
            album: Some(SimplifiedAlbum {
                id: None,
                name: "A Night at the Opera".to_string(),
                uri: None,
                album_type: None,
                release_date: None,
                total_tracks: None,
                artists: Vec::new(),
                images: Vec::new(),
            }),
            duration_ms: 354_000,
            popularity: 80,
            explicit: false,
            preview_url: None,
            external_urls: Default::default(),
        }
    }

    #[test]
    fn track_converts_to_candidate() {
        let candidate = candidate_from_track(track(Some("abc"))).expect("track has an id");

        assert_eq!(candidate.uri, "spotify:track:abc");
        assert_eq!(candidate.artists, vec!["Queen".to_string()]);
        assert_eq!(candidate.album_name, "A Night at the Opera");
    }

    #[test]
    fn track_without_id_is_dropped() {
        assert!(candidate_from_track(track(None)).is_none());
    }

    #[test]
    fn exhausted_rate_limit_maps_through_root() {
        let error = SpotifyError::RetriesExhausted {
            attempts: 3,
            last: Box::new(SpotifyError::RateLimited {
                retry_after: Duration::from_secs(7),
            }),
        };

        assert_eq!(
            GatewayError::from(error),
            GatewayError::RateLimited {
                retry_after: Duration::from_secs(7)
            }
        );
    }

    #[test]
    fn client_errors_are_rejections() {
        let error = SpotifyError::Unauthorized("expired".to_string());
        assert!(matches!(GatewayError::from(error), GatewayError::Rejected(_)));
    }
}
