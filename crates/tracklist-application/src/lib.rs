// SPDX-License-Identifier: GPL-3.0-or-later
use std::time::Duration;

use tracklist_config::AppConfig;
use tracklist_spotify::{RetryPolicy, SpotifyClient, SpotifyError};

pub mod batch;
pub mod gateway;
pub mod library;
pub mod normalize;
pub mod playlist;
pub mod resolver;
pub mod review;
pub mod scoring;
pub mod song_list;
pub mod workflow;

pub use batch::{BatchEngine, BatchError, PacedGateway};
pub use gateway::{
    CatalogSearchGateway, CreatedPlaylist, GatewayError, PlaylistGateway, PlaylistRequest,
};
pub use library::{LibraryService, LibrarySummary, PlaylistInfo, TrackPreview};
pub use playlist::{
    AddOutcome, PlaylistError, PlaylistOutcome, PlaylistService, ReviewedAddOutcome,
    SkippedCounts, DEFAULT_MAX_TRACKS,
};
pub use resolver::{Resolution, ResolutionError, SearchAttempt, SearchStrategy, TrackResolver};
pub use review::{export_review, import_review, ReviewError, ReviewOutcome, ReviewScope};
pub use scoring::SimilarityScorer;
pub use song_list::{parse_song_list, SongListError};
pub use workflow::{import_and_create, ImportError, ImportOutcome};

use tracing::info;

/// Shared configuration plus the one Spotify client every service talks through.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub client: SpotifyClient,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, SpotifyError> {
        let client = spotify_client(&config)?;
        Ok(Self { config, client })
    }

    pub fn resolver(&self) -> TrackResolver<SpotifyClient> {
        TrackResolver::new(self.client.clone(), &self.config.matching)
    }

    pub fn batch_engine(&self) -> BatchEngine<SpotifyClient> {
        BatchEngine::new(self.resolver(), self.pacing())
    }

    pub fn playlist_service(&self) -> PlaylistService<SpotifyClient> {
        PlaylistService::new(self.client.clone(), self.config.playlist.max_tracks)
    }

    pub fn library(&self) -> LibraryService {
        LibraryService::new(self.client.clone())
    }

    /// Configured pause between catalog searches in a batch.
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.config.batch.pacing_delay_ms)
    }

    pub fn on_start(&self) {
        info!(
            target: "application",
            api = %self.config.spotify.api_base_url,
            authenticated = self.client.has_token(),
            "application state initialized"
        );
    }
}

fn spotify_client(config: &AppConfig) -> Result<SpotifyClient, SpotifyError> {
    let spotify = &config.spotify;
    let retry = &config.retry;

    SpotifyClient::builder()
        .base_url(spotify.api_base_url.clone())
        .access_token(spotify.access_token.clone())
        .timeout(Duration::from_secs(spotify.timeout_secs))
        .rate_limit_interval(Duration::from_millis(spotify.min_request_interval_ms))
        .page_delay(Duration::from_millis(spotify.page_delay_ms))
        .retry_policy(RetryPolicy {
            max_attempts: retry.max_attempts.max(1),
            transient_backoff: Duration::from_millis(retry.transient_backoff_ms),
            default_retry_after: Duration::from_secs(retry.default_retry_after_secs),
            retry_after_padding: Duration::from_millis(retry.retry_after_padding_ms),
            max_retry_after: Duration::from_secs(retry.max_retry_after_secs),
        })
        .add_batch_size(config.playlist.add_batch_size)
        .cache_ttl(Duration::from_secs(config.cache.ttl_hours * 60 * 60))
        .cache_capacity(config.cache.max_entries)
        .build()
}
