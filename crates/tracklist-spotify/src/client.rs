// SPDX-License-Identifier: GPL-3.0-or-later

use crate::cache::LibraryCache;
use crate::error::{Result, SpotifyError};
use crate::models::{
    AddTracksRequest, Artist, CreatePlaylistRequest, CurrentUser, FollowedArtistsResponse,
    Paging, Playlist, PlaylistItem, SavedAlbum, SavedTrack, SearchResponse, SnapshotResponse,
    Track,
};
use crate::rate_limiter::RateLimiter;
use crate::retry::RetryPolicy;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use url::Url;

const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
const USER_AGENT: &str = concat!("Tracklist/", env!("CARGO_PKG_VERSION"));

/// Largest `limit` the search endpoint accepts.
pub const MAX_SEARCH_LIMIT: usize = 50;
const LIBRARY_PAGE_SIZE: u32 = 50;
const PLAYLIST_PAGE_SIZE: u32 = 100;

/// Spotify Web API client with pacing, bounded retries and a library cache.
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    client: Client,
    base_url: String,
    access_token: Option<String>,
    rate_limiter: RateLimiter,
    retry: RetryPolicy,
    page_delay: Duration,
    add_batch_size: usize,
    cache: LibraryCache,
}

impl SpotifyClient {
    pub fn builder() -> SpotifyClientBuilder {
        SpotifyClientBuilder::default()
    }

    /// Whether a bearer token was configured. Says nothing about its validity.
    pub fn has_token(&self) -> bool {
        self.access_token.is_some()
    }

    pub fn add_batch_size(&self) -> usize {
        self.add_batch_size
    }

    /// Profile of the user the token belongs to.
    pub async fn current_user(&self) -> Result<CurrentUser> {
        let url = self.endpoint("/me")?;
        self.get(url).await
    }

    /// Free-text track search. `limit` is clamped to `1..=50`.
    pub async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<Track>> {
        if query.trim().is_empty() {
            return Err(SpotifyError::InvalidRequest(
                "search query must not be empty".to_string(),
            ));
        }

        let limit = limit.clamp(1, MAX_SEARCH_LIMIT);
        let mut url = self.endpoint("/search")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("type", "track")
            .append_pair("limit", &limit.to_string());

        let response: SearchResponse = self.get(url).await?;
        debug!(
            target: "spotify",
            query,
            results = response.tracks.items.len(),
            "track search completed"
        );
        Ok(response.tracks.items)
    }

    /// Look up a single track by catalog id.
    pub async fn track(&self, track_id: &str) -> Result<Track> {
        let url = self.endpoint(&format!("/tracks/{}", checked_id(track_id)?))?;
        self.get(url).await
    }

    /// Every track in the user's saved library. Entries whose track was
    /// removed from the catalog are kept with `track: None`.
    pub async fn saved_tracks(&self, use_cache: bool) -> Result<Arc<Vec<SavedTrack>>> {
        if use_cache {
            if let Some(cached) = self.cache.saved_tracks() {
                trace!(target: "spotify", count = cached.len(), "saved tracks served from cache");
                return Ok(cached);
            }
        }

        let tracks = Arc::new(
            self.collect_offset_pages::<SavedTrack>("/me/tracks", LIBRARY_PAGE_SIZE)
                .await?,
        );
        info!(target: "spotify", count = tracks.len(), "fetched saved tracks");
        self.cache.store_saved_tracks(tracks.clone());
        Ok(tracks)
    }

    pub async fn saved_albums(&self, use_cache: bool) -> Result<Arc<Vec<SavedAlbum>>> {
        if use_cache {
            if let Some(cached) = self.cache.saved_albums() {
                trace!(target: "spotify", count = cached.len(), "saved albums served from cache");
                return Ok(cached);
            }
        }

        let albums = Arc::new(
            self.collect_offset_pages::<SavedAlbum>("/me/albums", LIBRARY_PAGE_SIZE)
                .await?,
        );
        info!(target: "spotify", count = albums.len(), "fetched saved albums");
        self.cache.store_saved_albums(albums.clone());
        Ok(albums)
    }

    /// Artists the user follows. This collection is cursor-paged.
    pub async fn followed_artists(&self, use_cache: bool) -> Result<Arc<Vec<Artist>>> {
        if use_cache {
            if let Some(cached) = self.cache.followed_artists() {
                trace!(target: "spotify", count = cached.len(), "followed artists served from cache");
                return Ok(cached);
            }
        }

        let mut artists = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut url = self.endpoint("/me/following")?;
            url.query_pairs_mut()
                .append_pair("type", "artist")
                .append_pair("limit", &LIBRARY_PAGE_SIZE.to_string());
            if let Some(cursor) = &after {
                url.query_pairs_mut().append_pair("after", cursor);
            }

            let page: FollowedArtistsResponse = self.get(url).await?;
            let page = page.artists;
            let fetched = page.items.len();
            artists.extend(page.items);

            match (page.next, page.cursors.after) {
                (Some(_), Some(cursor)) if fetched > 0 => {
                    after = Some(cursor);
                    self.pause_between_pages().await;
                }
                _ => break,
            }
        }

        let artists = Arc::new(artists);
        info!(target: "spotify", count = artists.len(), "fetched followed artists");
        self.cache.store_followed_artists(artists.clone());
        Ok(artists)
    }

    pub async fn playlist(&self, playlist_id: &str) -> Result<Playlist> {
        let url = self.endpoint(&format!("/playlists/{}", checked_id(playlist_id)?))?;
        self.get(url).await
    }

    /// Every item of a playlist, walking all pages.
    pub async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>> {
        let path = format!("/playlists/{}/tracks", checked_id(playlist_id)?);
        self.collect_offset_pages(&path, PLAYLIST_PAGE_SIZE).await
    }

    /// Create a playlist owned by the current user.
    pub async fn create_playlist(
        &self,
        name: &str,
        description: &str,
        public: bool,
    ) -> Result<Playlist> {
        let user = self.current_user().await?;
        let url = self.endpoint(&format!("/users/{}/playlists", user.id))?;
        let body = serde_json::to_value(CreatePlaylistRequest {
            name,
            description,
            public,
        })?;

        let playlist: Playlist = self.execute(Method::POST, url, Some(&body)).await?;
        info!(
            target: "spotify",
            playlist_id = %playlist.id,
            name = %playlist.name,
            "playlist created"
        );
        Ok(playlist)
    }

    /// Append tracks in order, `add_batch_size` per request. Returns one
    /// snapshot id per request issued.
    pub async fn add_tracks_to_playlist(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<Vec<String>> {
        let path = format!("/playlists/{}/tracks", checked_id(playlist_id)?);
        let mut snapshots = Vec::new();

        for (batch, chunk) in uris.chunks(self.add_batch_size.max(1)).enumerate() {
            let url = self.endpoint(&path)?;
            let body = serde_json::to_value(AddTracksRequest { uris: chunk })?;
            let response: SnapshotResponse = self.execute(Method::POST, url, Some(&body)).await?;
            debug!(
                target: "spotify",
                playlist_id,
                batch,
                tracks = chunk.len(),
                "added tracks to playlist"
            );
            snapshots.push(response.snapshot_id);
        }

        Ok(snapshots)
    }

    async fn collect_offset_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        page_size: u32,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut offset: usize = 0;

        loop {
            let mut url = self.endpoint(path)?;
            url.query_pairs_mut()
                .append_pair("limit", &page_size.to_string())
                .append_pair("offset", &offset.to_string());

            let page: Paging<T> = self.get(url).await?;
            let fetched = page.items.len();
            items.extend(page.items);
            offset += fetched;

            if page.next.is_none() || fetched == 0 {
                break;
            }
            trace!(target: "spotify", path, offset, total = page.total, "fetching next page");
            self.pause_between_pages().await;
        }

        Ok(items)
    }

    async fn pause_between_pages(&self) {
        if !self.page_delay.is_zero() {
            tokio::time::sleep(self.page_delay).await;
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Url::parse(&format!("{}{}", self.base_url.trim_end_matches('/'), path))
            .map_err(|e| SpotifyError::InvalidRequest(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        self.execute(Method::GET, url, None).await
    }

    /// Issue a request, retrying rate-limit and transient failures per the retry policy.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        let token = self
            .access_token
            .as_deref()
            .ok_or_else(|| SpotifyError::Unauthorized("no access token configured".to_string()))?;

        let mut attempt: u32 = 1;
        loop {
            match self.send_once(method.clone(), &url, body, token).await {
                Ok(value) => return Ok(value),
                Err(error) => match self.retry.delay_for(&error, attempt) {
                    Some(delay) => {
                        warn!(
                            target: "spotify",
                            %method,
                            url = %url,
                            attempt,
                            ?delay,
                            error = %error,
                            "request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None if error.is_retryable() => {
                        return Err(SpotifyError::RetriesExhausted {
                            attempts: attempt,
                            last: Box::new(error),
                        });
                    }
                    None => return Err(error),
                },
            }
        }
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &Url,
        body: Option<&serde_json::Value>,
        token: &str,
    ) -> Result<T> {
        let _permit = self.rate_limiter.acquire().await;

        trace!(target: "spotify", %method, url = %url, "sending request");

        let mut request = self.client.request(method, url.clone()).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;

        let status = response.status();
        debug!(target: "spotify", %status, url = %url, "response received");

        if status.is_success() {
            let body = response.text().await?;
            trace!(target: "spotify", body = %body, "response body");
            return Ok(serde_json::from_str(&body)?);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(self.retry.default_retry_after);
            return Err(SpotifyError::RateLimited { retry_after });
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SpotifyError::Unauthorized(message),
            StatusCode::NOT_FOUND => SpotifyError::NotFound(url.path().to_string()),
            status if status.is_server_error() => SpotifyError::Transient {
                status: status.as_u16(),
                message,
            },
            status => SpotifyError::ApiError {
                status: status.as_u16(),
                message,
            },
        })
    }
}

/// Catalog ids are base62; anything else would escape the URL path.
fn checked_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(SpotifyError::InvalidRequest(format!(
            "invalid catalog id: {:?}",
            id
        )));
    }
    Ok(id)
}

/// Builder for configuring a Spotify client.
#[derive(Debug)]
pub struct SpotifyClientBuilder {
    base_url: String,
    access_token: Option<String>,
    timeout: Duration,
    rate_limit_interval: Duration,
    page_delay: Duration,
    retry: RetryPolicy,
    add_batch_size: usize,
    cache_ttl: Duration,
    cache_capacity: u64,
}

impl Default for SpotifyClientBuilder {
    fn default() -> Self {
        Self {
            base_url: SPOTIFY_API_BASE.to_string(),
            access_token: None,
            timeout: Duration::from_secs(30),
            rate_limit_interval: Duration::ZERO,
            page_delay: Duration::from_millis(100),
            retry: RetryPolicy::default(),
            add_batch_size: 100,
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            cache_capacity: 16,
        }
    }
}

impl SpotifyClientBuilder {
    /// Set a custom base URL (useful for testing with mock servers).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Minimum gap between the end of one request and the start of the next.
    pub fn rate_limit_interval(mut self, interval: Duration) -> Self {
        self.rate_limit_interval = interval;
        self
    }

    pub fn page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn add_batch_size(mut self, size: usize) -> Self {
        self.add_batch_size = size.max(1);
        self
    }

    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn cache_capacity(mut self, capacity: u64) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<SpotifyClient> {
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(SpotifyClient {
            client,
            base_url: self.base_url,
            access_token: self.access_token,
            rate_limiter: RateLimiter::new(self.rate_limit_interval),
            retry: self.retry,
            page_delay: self.page_delay,
            add_batch_size: self.add_batch_size,
            cache: LibraryCache::new(self.cache_ttl, self.cache_capacity),
        })
    }
}
