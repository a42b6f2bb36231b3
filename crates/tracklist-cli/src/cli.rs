// SPDX-License-Identifier: GPL-3.0-or-later

//! Command-line definitions for the `tracklist` binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracklist_domain::InclusionTier;

/// Resolve song lists against Spotify and build playlists from them
#[derive(Debug, Parser)]
#[command(name = "tracklist", author, version, about, long_about = None)]
pub struct Cli {
    /// TOML configuration file (environment variables prefixed TRACKLIST_ override it)
    #[arg(short, long, global = true, env = "TRACKLIST_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show whether a token is configured and who it belongs to
    AuthStatus,
    /// Ranked catalog candidates for one song
    Search {
        #[command(flatten)]
        song: SongArgs,
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
    /// Run every fallback query for one song and show what each returned
    FuzzySearch {
        #[command(flatten)]
        song: SongArgs,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Resolve a `title,artist` CSV and print the batch report as JSON
    Batch {
        songs: PathBuf,
        /// Pause between catalog searches (defaults to batch.pacing_delay_ms)
        #[arg(long)]
        pacing_ms: Option<u64>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Write a review CSV from a saved batch report
    ExportReview {
        report: PathBuf,
        /// Include high confidence rows too
        #[arg(long)]
        all: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Create a playlist from a saved batch report
    CreatePlaylist {
        report: PathBuf,
        #[command(flatten)]
        playlist: PlaylistArgs,
    },
    /// Resolve a song list and create a playlist in one step
    Import {
        songs: PathBuf,
        #[command(flatten)]
        playlist: PlaylistArgs,
        #[arg(long)]
        pacing_ms: Option<u64>,
    },
    /// Add the tracks accepted in a reviewed CSV to a playlist
    ApplyReview { playlist_id: String, reviewed: PathBuf },
    /// Add track URIs to an existing playlist
    AddTracks {
        playlist_id: String,
        #[arg(required = true)]
        uris: Vec<String>,
    },
    /// Playlist name, owner and track count
    PlaylistInfo { playlist_id: String },
    /// Details for a single `spotify:track:` URI
    Preview { uri: String },
    /// Saved library views
    Library {
        #[command(subcommand)]
        view: LibraryView,
        /// Refetch instead of using the in-memory library cache
        #[arg(long, global = true)]
        no_cache: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum LibraryView {
    FollowedArtists,
    SavedTracks,
    /// Artists across saved tracks, by song count
    Artists,
    /// Albums with at least `min_songs` saved tracks
    Albums {
        #[arg(long, default_value_t = 6)]
        min_songs: usize,
    },
    Summary,
}

#[derive(Debug, clap::Args)]
pub struct SongArgs {
    #[arg(short, long)]
    pub title: String,
    #[arg(short, long, default_value = "")]
    pub artist: String,
}

#[derive(Debug, clap::Args)]
pub struct OutputArgs {
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, clap::Args)]
pub struct PlaylistArgs {
    #[arg(short, long)]
    pub name: String,
    #[arg(short, long)]
    pub description: Option<String>,
    #[arg(long)]
    pub public: bool,
    /// Lowest tier to include: high, high_medium or all
    #[arg(long, default_value = "high")]
    pub include: InclusionTier,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definitions_are_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn import_parses_inclusion_tier() {
        let cli = Cli::try_parse_from([
            "tracklist",
            "import",
            "songs.csv",
            "--name",
            "Road Trip",
            "--include",
            "high_medium",
        ])
        .expect("arguments should parse");

        match cli.command {
            Command::Import { songs, playlist, pacing_ms } => {
                assert_eq!(songs, PathBuf::from("songs.csv"));
                assert_eq!(playlist.name, "Road Trip");
                assert_eq!(playlist.include, InclusionTier::HighMedium);
                assert!(!playlist.public);
                assert!(pacing_ms.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn unknown_inclusion_tier_is_rejected() {
        let result = Cli::try_parse_from([
            "tracklist",
            "create-playlist",
            "report.json",
            "--name",
            "x",
            "--include",
            "medium",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn library_flag_after_view() {
        let cli = Cli::try_parse_from(["tracklist", "library", "albums", "--min-songs", "3", "--no-cache"])
            .expect("arguments should parse");

        match cli.command {
            Command::Library { view: LibraryView::Albums { min_songs }, no_cache } => {
                assert_eq!(min_songs, 3);
                assert!(no_cache);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn album_threshold_defaults_to_six_songs() {
        let cli = Cli::try_parse_from(["tracklist", "library", "albums"])
            .expect("arguments should parse");

        match cli.command {
            Command::Library { view: LibraryView::Albums { min_songs }, no_cache } => {
                assert_eq!(min_songs, 6);
                assert!(!no_cache);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn add_tracks_needs_uris() {
        assert!(Cli::try_parse_from(["tracklist", "add-tracks", "pl1"]).is_err());
    }
}
