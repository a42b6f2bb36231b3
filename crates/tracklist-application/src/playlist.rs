// SPDX-License-Identifier: GPL-3.0-or-later

//! Playlist assembly from batch reports and reviewed CSV files.

use crate::gateway::{CreatedPlaylist, GatewayError, PlaylistGateway, PlaylistRequest};
use crate::review::{import_review, ReviewError};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use tracklist_domain::{BatchReport, ConfidenceTier, InclusionTier, TrackUri};

/// Spotify refuses playlists longer than this.
pub const DEFAULT_MAX_TRACKS: usize = 10_000;

#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error(
        "too many tracks ({count}); a playlist holds at most {max}, split the request into multiple playlists"
    )]
    SizeExceeded { count: usize, max: usize },

    #[error("no tracks to add")]
    NothingToAdd,

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Review(#[from] ReviewError),
}

/// Tiers that the inclusion cutoff left out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkippedCounts {
    pub medium: usize,
    pub low: usize,
    pub not_found: usize,
}

impl SkippedCounts {
    fn for_report(report: &BatchReport, inclusion: InclusionTier) -> Self {
        let skipped = |tier: ConfidenceTier| {
            if inclusion.includes(tier) {
                0
            } else {
                report.summary.count(tier)
            }
        };
        Self {
            medium: skipped(ConfidenceTier::Medium),
            low: skipped(ConfidenceTier::Low),
            not_found: report.summary.not_found,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistOutcome {
    pub playlist: CreatedPlaylist,
    pub tracks_added: usize,
    pub inclusion: InclusionTier,
    pub skipped: SkippedCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddOutcome {
    pub playlist_id: String,
    pub tracks_added: usize,
    /// Entries dropped because they were not `spotify:track:` references.
    pub invalid_dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewedAddOutcome {
    pub playlist_id: String,
    pub tracks_added: usize,
    pub custom_replacements: usize,
    pub rejected: usize,
    pub invalid_rows: usize,
}

/// Creates playlists and appends tracks, enforcing the size limit up front.
#[derive(Debug, Clone)]
pub struct PlaylistService<P> {
    gateway: P,
    max_tracks: usize,
}

impl<P: PlaylistGateway> PlaylistService<P> {
    pub fn new(gateway: P, max_tracks: usize) -> Self {
        Self {
            gateway,
            max_tracks,
        }
    }

    pub fn max_tracks(&self) -> usize {
        self.max_tracks
    }

    fn check_size(&self, count: usize) -> Result<(), PlaylistError> {
        if count == 0 {
            return Err(PlaylistError::NothingToAdd);
        }
        if count > self.max_tracks {
            warn!(target: "playlist", count, max = self.max_tracks, "playlist size limit exceeded");
            return Err(PlaylistError::SizeExceeded {
                count,
                max: self.max_tracks,
            });
        }
        Ok(())
    }

    pub async fn create_playlist(
        &self,
        request: &PlaylistRequest,
    ) -> Result<CreatedPlaylist, PlaylistError> {
        let playlist = self.gateway.create_playlist(request).await?;
        info!(target: "playlist", playlist_id = %playlist.id, name = %playlist.name, "playlist created");
        Ok(playlist)
    }

    /// Create a playlist from the report entries the inclusion tier admits,
    /// in input order. Nothing is created when the size check fails.
    pub async fn create_from_report(
        &self,
        request: &PlaylistRequest,
        report: &BatchReport,
        inclusion: InclusionTier,
    ) -> Result<PlaylistOutcome, PlaylistError> {
        let uris = report.accepted_uris(inclusion);
        self.check_size(uris.len())?;

        let playlist = self.create_playlist(request).await?;
        let tracks_added = self.gateway.add_tracks(&playlist.id, &uris).await?;

        info!(
            target: "playlist",
            playlist_id = %playlist.id,
            batch_id = %report.id,
            tracks_added,
            %inclusion,
            "playlist filled from batch report"
        );

        Ok(PlaylistOutcome {
            playlist,
            tracks_added,
            inclusion,
            skipped: SkippedCounts::for_report(report, inclusion),
        })
    }

    /// Append tracks to an existing playlist. Anything that is not a
    /// `spotify:track:` reference is dropped first.
    pub async fn add_tracks(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<AddOutcome, PlaylistError> {
        let valid: Vec<String> = uris
            .iter()
            .filter_map(|uri| TrackUri::parse(uri.trim()).ok())
            .map(String::from)
            .collect();
        let invalid_dropped = uris.len() - valid.len();
        if invalid_dropped > 0 {
            warn!(target: "playlist", invalid_dropped, "dropped invalid track references");
        }

        self.check_size(valid.len())?;
        let tracks_added = self.gateway.add_tracks(playlist_id, &valid).await?;
        info!(target: "playlist", playlist_id, tracks_added, "tracks added");

        Ok(AddOutcome {
            playlist_id: playlist_id.to_string(),
            tracks_added,
            invalid_dropped,
        })
    }

    /// Import a reviewed CSV and append the accepted tracks.
    pub async fn add_reviewed_tracks(
        &self,
        playlist_id: &str,
        reviewed_csv: &str,
    ) -> Result<ReviewedAddOutcome, PlaylistError> {
        let review = import_review(reviewed_csv)?;
        self.check_size(review.accepted_uris.len())?;

        let tracks_added = self
            .gateway
            .add_tracks(playlist_id, &review.accepted_uris)
            .await?;
        info!(
            target: "playlist",
            playlist_id,
            tracks_added,
            rejected = review.rejected,
            "reviewed tracks added"
        );

        Ok(ReviewedAddOutcome {
            playlist_id: playlist_id.to_string(),
            tracks_added,
            custom_replacements: review.custom_replacements,
            rejected: review.rejected,
            invalid_rows: review.invalid_rows,
        })
    }
}
