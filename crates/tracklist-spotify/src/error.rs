// SPDX-License-Identifier: GPL-3.0-or-later

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SpotifyError>;

#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("Transient Spotify API failure: {status} - {message}")]
    Transient { status: u16, message: String },

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response from Spotify API: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<SpotifyError>,
    },
}

impl SpotifyError {
    /// Whether a later attempt of the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Transient { .. } => true,
            Self::RequestFailed(error) => error.is_timeout() || error.is_connect(),
            _ => false,
        }
    }

    /// The error that ended the last attempt, looking through `RetriesExhausted`.
    pub fn root(&self) -> &SpotifyError {
        match self {
            Self::RetriesExhausted { last, .. } => last.root(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for SpotifyError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidResponse(format!("Failed to parse response: {}", error))
    }
}
