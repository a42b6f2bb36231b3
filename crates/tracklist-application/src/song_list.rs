// SPDX-License-Identifier: GPL-3.0-or-later

use thiserror::Error;
use tracing::{debug, warn};
use tracklist_domain::SongRequest;

#[derive(Debug, Error)]
pub enum SongListError {
    #[error("song list CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("song list has no 'title' column (expected columns: title, artist)")]
    MissingTitleColumn,

    #[error("song list contains no songs")]
    Empty,
}

/// Parse a `title,artist` CSV. Header names are matched case-insensitively;
/// the artist column is optional and rows without a title are skipped.
pub fn parse_song_list(content: &str) -> Result<Vec<SongRequest>, SongListError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let title_col = find("title").ok_or(SongListError::MissingTitleColumn)?;
    let artist_col = find("artist");

    let mut songs = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let title = record.get(title_col).unwrap_or_default();
        let artist = artist_col
            .and_then(|col| record.get(col))
            .unwrap_or_default();

        match SongRequest::new(title, artist) {
            Ok(song) => songs.push(song),
            Err(error) => {
                warn!(target: "batch", line = line + 2, error = %error, "skipping song list row");
            }
        }
    }

    if songs.is_empty() {
        return Err(SongListError::Empty);
    }
    debug!(target: "batch", songs = songs.len(), "song list parsed");
    Ok(songs)
}
