// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::Path;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    pub api_base_url: String,
    /// Bearer token issued out of band. Token refresh is not handled here.
    pub access_token: Option<String>,
    pub timeout_secs: u64,
    /// Minimum gap between two requests issued by the same client.
    pub min_request_interval_ms: u64,
    /// Pause between page requests when walking a paged collection.
    pub page_delay_ms: u64,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.spotify.com/v1".to_string(),
            access_token: None,
            timeout_secs: 30,
            min_request_interval_ms: 0,
            page_delay_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub transient_backoff_ms: u64,
    /// Used when a 429 response carries no `Retry-After` header.
    pub default_retry_after_secs: u64,
    /// Added on top of the advertised `Retry-After`.
    pub retry_after_padding_ms: u64,
    /// A `Retry-After` longer than this fails the request instead of waiting.
    pub max_retry_after_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            transient_backoff_ms: 1_000,
            default_retry_after_secs: 5,
            retry_after_padding_ms: 1_000,
            max_retry_after_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_hours: u64,
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 24,
            max_entries: 16,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    pub title_weight: f64,
    pub artist_weight: f64,
    pub high_threshold: f64,
    pub medium_threshold: f64,
    /// Minimum result count requested from the catalog for the primary query.
    pub query_limit: usize,
    /// Result count requested for each fallback query.
    pub fallback_query_limit: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            title_weight: 0.7,
            artist_weight: 0.3,
            high_threshold: 0.90,
            medium_threshold: 0.70,
            query_limit: 5,
            fallback_query_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    pub pacing_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            pacing_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistConfig {
    pub max_tracks: usize,
    pub add_batch_size: usize,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            max_tracks: 10_000,
            add_batch_size: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub spotify: SpotifyConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub matching: MatchingConfig,
    pub batch: BatchConfig,
    pub playlist: PlaylistConfig,
    pub telemetry: TelemetryConfig,
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: TRACKLIST_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("TRACKLIST_").split("__"));

    let config: AppConfig = figment.extract()?;
    info!(target: "config", "configuration loaded");
    Ok(config)
}
