// SPDX-License-Identifier: GPL-3.0-or-later

//! Song list to playlist in one call: parse, resolve, create, report.

use crate::batch::{BatchEngine, BatchError};
use crate::gateway::{CatalogSearchGateway, PlaylistGateway, PlaylistRequest};
use crate::playlist::{PlaylistOutcome, PlaylistService};
use crate::song_list::{parse_song_list, SongListError};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use tracklist_domain::{BatchEntry, BatchId, BatchReport, BatchSummary, InclusionTier};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    SongList(#[from] SongListError),

    #[error(transparent)]
    Batch(#[from] BatchError),
}

/// Outcome of [`import_and_create`]. A playlist failure does not discard the
/// resolution work; it is reported next to it.
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub batch_id: BatchId,
    pub search_summary: BatchSummary,
    pub playlist: Option<PlaylistOutcome>,
    pub playlist_error: Option<String>,
    /// Entries the inclusion tier left out, in input order.
    pub needs_review: Vec<BatchEntry>,
    #[serde(skip)]
    pub report: BatchReport,
}

pub async fn import_and_create<G, P>(
    engine: &BatchEngine<G>,
    playlists: &PlaylistService<P>,
    request: &PlaylistRequest,
    songs_csv: &str,
    inclusion: InclusionTier,
    pacing: Duration,
) -> Result<ImportOutcome, ImportError>
where
    G: CatalogSearchGateway,
    P: PlaylistGateway,
{
    let songs = parse_song_list(songs_csv)?;
    let report = engine.resolve_batch(&songs, pacing).await?;

    let (playlist, playlist_error) = match playlists
        .create_from_report(request, &report, inclusion)
        .await
    {
        Ok(outcome) => (Some(outcome), None),
        Err(error) => {
            warn!(target: "playlist", batch_id = %report.id, error = %error, "playlist not created");
            (None, Some(error.to_string()))
        }
    };

    let needs_review: Vec<BatchEntry> = report
        .entries
        .iter()
        .filter(|entry| !inclusion.includes(entry.result.tier()))
        .cloned()
        .collect();

    info!(
        target: "playlist",
        batch_id = %report.id,
        songs = report.len(),
        needs_review = needs_review.len(),
        created = playlist.is_some(),
        "import finished"
    );

    Ok(ImportOutcome {
        batch_id: report.id,
        search_summary: report.summary,
        playlist,
        playlist_error,
        needs_review,
        report,
    })
}
