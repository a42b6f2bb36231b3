// SPDX-License-Identifier: GPL-3.0-or-later
mod cli;

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracklist_application::{
    export_review, import_and_create, parse_song_list, AppState, PlaylistRequest, ReviewScope,
};
use tracklist_config::load as load_config;
use tracklist_domain::{BatchReport, SongRequest};

use cli::{Cli, Command, LibraryView, OutputArgs, PlaylistArgs, SongArgs};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let config = load_config(args.config.as_deref())?;
    init_tracing(&config.telemetry.log_level);

    let state = AppState::new(config)?;
    state.on_start();

    tokio::select! {
        result = run(&state, args.command) => result,
        _ = shutdown_signal() => bail!("interrupted before the command finished"),
    }
}

async fn run(state: &AppState, command: Command) -> Result<()> {
    match command {
        Command::AuthStatus => {
            if !state.client.has_token() {
                return print_json(&json!({ "authenticated": false }));
            }
            let user = state.client.current_user().await?;
            print_json(&json!({ "authenticated": true, "user": user }))
        }
        Command::Search { song, limit } => {
            let song = song_request(song)?;
            let candidates = state.resolver().resolve(&song, limit).await?;
            print_json(&candidates)
        }
        Command::FuzzySearch { song, limit } => {
            let song = song_request(song)?;
            let resolution = state.resolver().fuzzy_search(&song, limit).await?;
            print_json(&resolution)
        }
        Command::Batch {
            songs,
            pacing_ms,
            output,
        } => {
            let songs = parse_song_list(&read_file(&songs)?)?;
            let report = state
                .batch_engine()
                .resolve_batch(&songs, pacing(state, pacing_ms))
                .await?;
            write_output(&output, &serde_json::to_string_pretty(&report)?)
        }
        Command::ExportReview {
            report,
            all,
            output,
        } => {
            let report = read_report(&report)?;
            let scope = if all {
                ReviewScope::All
            } else {
                ReviewScope::NeedsReview
            };
            write_output(&output, &export_review(&report, scope)?)
        }
        Command::CreatePlaylist { report, playlist } => {
            let report = read_report(&report)?;
            let outcome = state
                .playlist_service()
                .create_from_report(&playlist_request(&playlist), &report, playlist.include)
                .await?;
            print_json(&outcome)
        }
        Command::Import {
            songs,
            playlist,
            pacing_ms,
        } => {
            let content = read_file(&songs)?;
            let outcome = import_and_create(
                &state.batch_engine(),
                &state.playlist_service(),
                &playlist_request(&playlist),
                &content,
                playlist.include,
                pacing(state, pacing_ms),
            )
            .await?;
            print_json(&outcome)
        }
        Command::ApplyReview {
            playlist_id,
            reviewed,
        } => {
            let content = read_file(&reviewed)?;
            let outcome = state
                .playlist_service()
                .add_reviewed_tracks(&playlist_id, &content)
                .await?;
            print_json(&outcome)
        }
        Command::AddTracks { playlist_id, uris } => {
            let outcome = state.playlist_service().add_tracks(&playlist_id, &uris).await?;
            print_json(&outcome)
        }
        Command::PlaylistInfo { playlist_id } => {
            print_json(&state.library().playlist_info(&playlist_id).await?)
        }
        Command::Preview { uri } => print_json(&state.library().track_preview(&uri).await?),
        Command::Library { view, no_cache } => {
            let library = state.library();
            let use_cache = !no_cache;
            match view {
                LibraryView::FollowedArtists => {
                    print_json(&library.followed_artists(use_cache).await?)
                }
                LibraryView::SavedTracks => print_json(&library.saved_tracks(use_cache).await?),
                LibraryView::Artists => print_json(&library.library_artists(use_cache).await?),
                LibraryView::Albums { min_songs } => {
                    print_json(&library.albums_by_song_count(min_songs, use_cache).await?)
                }
                LibraryView::Summary => print_json(&library.library_summary(use_cache).await?),
            }
        }
    }
}

fn init_tracing(default_level: &str) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn song_request(args: SongArgs) -> Result<SongRequest> {
    Ok(SongRequest::new(args.title, args.artist)?)
}

fn playlist_request(args: &PlaylistArgs) -> PlaylistRequest {
    let mut request = PlaylistRequest::new(args.name.clone()).public(args.public);
    if let Some(description) = &args.description {
        request = request.description(description.clone());
    }
    request
}

fn pacing(state: &AppState, override_ms: Option<u64>) -> Duration {
    override_ms.map(Duration::from_millis).unwrap_or_else(|| state.pacing())
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn read_report(path: &Path) -> Result<BatchReport> {
    serde_json::from_str(&read_file(path)?)
        .with_context(|| format!("{} is not a batch report", path.display()))
}

fn write_output(output: &OutputArgs, content: &str) -> Result<()> {
    match &output.output {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(target: "cli", path = %path.display(), "output written");
            Ok(())
        }
        None => {
            println!("{}", content.trim_end());
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut interrupt, mut terminate) =
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(interrupt), Ok(terminate)) => (interrupt, terminate),
                (Err(e), _) | (_, Err(e)) => {
                    warn!(target: "cli", error = %e, "could not install signal handlers");
                    return std::future::pending().await;
                }
            };

        tokio::select! {
            _ = interrupt.recv() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(target: "cli", error = %e, "could not install ctrl-c handler");
            return std::future::pending().await;
        }
    }

    info!(target: "cli", "shutdown signal received");
}
