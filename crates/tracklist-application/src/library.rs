// SPDX-License-Identifier: GPL-3.0-or-later

//! Read-only views over the user's library: followed artists, saved tracks,
//! and the artist/album statistics derived from them.

use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;
use tracklist_domain::TrackUri;
use tracklist_spotify::{
    Artist, Image, Playlist, SavedAlbum, SavedTrack, SimplifiedAlbum, SpotifyClient,
    SpotifyError, Track,
};

const SUMMARY_TOP_N: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FollowedArtistView {
    pub name: String,
    pub id: String,
    pub uri: Option<String>,
    pub genres: Vec<String>,
    pub popularity: u8,
    pub followers: u64,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistRef {
    pub name: String,
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlbumRef {
    pub name: String,
    pub id: Option<String>,
    pub release_date: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedTrackView {
    pub name: String,
    pub id: Option<String>,
    pub uri: Option<String>,
    pub artists: Vec<ArtistRef>,
    pub album: Option<AlbumRef>,
    pub duration_ms: u64,
    pub popularity: u8,
    pub added_at: Option<String>,
    pub preview_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SongRef {
    pub name: String,
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryArtist {
    pub name: String,
    pub id: Option<String>,
    pub uri: Option<String>,
    pub song_count: usize,
    pub songs: Vec<SongRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlbumStat {
    pub name: String,
    pub id: Option<String>,
    pub uri: Option<String>,
    pub artists: Vec<String>,
    pub release_date: Option<String>,
    pub total_tracks: u32,
    pub saved_count: usize,
    /// Share of the album's tracks that are saved, one decimal.
    pub percentage: f64,
    pub image_url: Option<String>,
    pub saved_songs: Vec<SongRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryCounts {
    pub followed_artists: usize,
    pub saved_tracks: usize,
    pub saved_albums: usize,
    pub unique_artists_in_library: usize,
    pub unique_albums_in_library: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibrarySummary {
    pub summary: LibraryCounts,
    pub followed_artists: Vec<FollowedArtistView>,
    pub top_artists_by_saved_songs: Vec<LibraryArtist>,
    pub albums_with_most_saved_songs: Vec<AlbumStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistInfo {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub owner: Option<String>,
    pub public: Option<bool>,
    pub track_count: usize,
    pub followers: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackPreview {
    pub name: String,
    pub uri: Option<String>,
    pub artists: String,
    pub album: Option<String>,
    pub duration_ms: u64,
    pub preview_url: Option<String>,
    pub has_preview: bool,
}

fn first_image(images: &[Image]) -> Option<String> {
    images.first().map(|image| image.url.clone())
}

fn album_ref(album: &SimplifiedAlbum) -> AlbumRef {
    AlbumRef {
        name: album.name.clone(),
        id: album.id.clone(),
        release_date: album.release_date.clone(),
        image_url: first_image(&album.images),
    }
}

fn song_ref(track: &Track) -> SongRef {
    SongRef {
        name: track.name.clone(),
        id: track.id.clone(),
    }
}

/// Tracks still present in the catalog.
fn present_tracks(saved: &[SavedTrack]) -> impl Iterator<Item = (&SavedTrack, &Track)> {
    saved
        .iter()
        .filter_map(|item| item.track.as_ref().map(|track| (item, track)))
}

pub fn followed_artists(artists: &[Artist]) -> Vec<FollowedArtistView> {
    artists
        .iter()
        .map(|artist| FollowedArtistView {
            name: artist.name.clone(),
            id: artist.id.clone(),
            uri: artist.uri.clone(),
            genres: artist.genres.clone(),
            popularity: artist.popularity,
            followers: artist.followers.total,
            image_url: first_image(&artist.images),
        })
        .collect()
}

/// Saved tracks, skipping entries whose track was removed from the catalog.
pub fn saved_tracks(saved: &[SavedTrack]) -> Vec<SavedTrackView> {
    present_tracks(saved)
        .map(|(item, track)| SavedTrackView {
            name: track.name.clone(),
            id: track.id.clone(),
            uri: track.uri.clone(),
            artists: track
                .artists
                .iter()
                .map(|artist| ArtistRef {
                    name: artist.name.clone(),
                    id: artist.id.clone(),
                })
                .collect(),
            album: track.album.as_ref().map(album_ref),
            duration_ms: track.duration_ms,
            popularity: track.popularity,
            added_at: item.added_at.clone(),
            preview_url: track.preview_url.clone(),
        })
        .collect()
}

/// Unique artists across saved tracks, most saved songs first, ties by name.
pub fn library_artists(saved: &[SavedTrack]) -> Vec<LibraryArtist> {
    let mut by_key: HashMap<String, LibraryArtist> = HashMap::new();

    for (_, track) in present_tracks(saved) {
        for artist in &track.artists {
            let key = artist.id.clone().unwrap_or_else(|| artist.name.to_lowercase());
            let entry = by_key.entry(key).or_insert_with(|| LibraryArtist {
                name: artist.name.clone(),
                id: artist.id.clone(),
                uri: artist
                    .uri
                    .clone()
                    .or_else(|| artist.id.as_ref().map(|id| format!("spotify:artist:{}", id))),
                song_count: 0,
                songs: Vec::new(),
            });
            entry.song_count += 1;
            entry.songs.push(song_ref(track));
        }
    }

    let mut artists: Vec<LibraryArtist> = by_key.into_values().collect();
    artists.sort_by(|a, b| {
        b.song_count
            .cmp(&a.song_count)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    artists
}

/// Albums with at least `min_songs` saved tracks, most saved first.
pub fn albums_by_song_count(saved: &[SavedTrack], min_songs: usize) -> Vec<AlbumStat> {
    let mut by_key: HashMap<String, AlbumStat> = HashMap::new();

    for (_, track) in present_tracks(saved) {
        let Some(album) = track.album.as_ref() else {
            continue;
        };
        let key = album.id.clone().unwrap_or_else(|| album.name.to_lowercase());
        let entry = by_key.entry(key).or_insert_with(|| AlbumStat {
            name: album.name.clone(),
            id: album.id.clone(),
            uri: album
                .uri
                .clone()
                .or_else(|| album.id.as_ref().map(|id| format!("spotify:album:{}", id))),
            artists: album.artists.iter().map(|a| a.name.clone()).collect(),
            release_date: album.release_date.clone(),
            total_tracks: album.total_tracks.unwrap_or(0),
            saved_count: 0,
            percentage: 0.0,
            image_url: first_image(&album.images),
            saved_songs: Vec::new(),
        });
        entry.saved_songs.push(song_ref(track));
    }

    let mut albums: Vec<AlbumStat> = by_key
        .into_values()
        .map(|mut album| {
            album.saved_count = album.saved_songs.len();
            album.percentage = if album.total_tracks > 0 {
                (album.saved_count as f64 / album.total_tracks as f64 * 1000.0).round() / 10.0
            } else {
                0.0
            };
            album
        })
        .filter(|album| album.saved_count >= min_songs)
        .collect();

    albums.sort_by(|a, b| {
        b.saved_count
            .cmp(&a.saved_count)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
    albums
}

pub fn library_summary(
    followed: &[Artist],
    saved: &[SavedTrack],
    saved_albums: &[SavedAlbum],
) -> LibrarySummary {
    let followed = followed_artists(followed);
    let mut artists = library_artists(saved);
    let mut albums = albums_by_song_count(saved, 1);

    let summary = LibraryCounts {
        followed_artists: followed.len(),
        saved_tracks: present_tracks(saved).count(),
        saved_albums: saved_albums.len(),
        unique_artists_in_library: artists.len(),
        unique_albums_in_library: albums.len(),
    };
    artists.truncate(SUMMARY_TOP_N);
    albums.truncate(SUMMARY_TOP_N);

    LibrarySummary {
        summary,
        followed_artists: followed,
        top_artists_by_saved_songs: artists,
        albums_with_most_saved_songs: albums,
    }
}

pub fn playlist_info(playlist: &Playlist, track_count: usize) -> PlaylistInfo {
    PlaylistInfo {
        id: playlist.id.clone(),
        name: playlist.name.clone(),
        description: playlist.description.clone(),
        url: playlist.external_urls.spotify.clone(),
        owner: playlist
            .owner
            .as_ref()
            .map(|owner| owner.display_name.clone().unwrap_or_else(|| owner.id.clone())),
        public: playlist.public,
        track_count,
        followers: playlist.followers.total,
    }
}

pub fn track_preview(track: &Track) -> TrackPreview {
    TrackPreview {
        name: track.name.clone(),
        uri: track.uri.clone(),
        artists: track.artist_names(),
        album: track.album_name().map(str::to_string),
        duration_ms: track.duration_ms,
        preview_url: track.preview_url.clone(),
        has_preview: track.preview_url.is_some(),
    }
}

/// Library reads through the Spotify client.
#[derive(Debug, Clone)]
pub struct LibraryService {
    client: SpotifyClient,
}

impl LibraryService {
    pub fn new(client: SpotifyClient) -> Self {
        Self { client }
    }

    pub async fn followed_artists(
        &self,
        use_cache: bool,
    ) -> Result<Vec<FollowedArtistView>, SpotifyError> {
        let artists = self.client.followed_artists(use_cache).await?;
        Ok(followed_artists(&artists))
    }

    pub async fn saved_tracks(&self, use_cache: bool) -> Result<Vec<SavedTrackView>, SpotifyError> {
        let saved = self.client.saved_tracks(use_cache).await?;
        Ok(saved_tracks(&saved))
    }

    pub async fn library_artists(
        &self,
        use_cache: bool,
    ) -> Result<Vec<LibraryArtist>, SpotifyError> {
        let saved = self.client.saved_tracks(use_cache).await?;
        Ok(library_artists(&saved))
    }

    pub async fn albums_by_song_count(
        &self,
        min_songs: usize,
        use_cache: bool,
    ) -> Result<Vec<AlbumStat>, SpotifyError> {
        let saved = self.client.saved_tracks(use_cache).await?;
        Ok(albums_by_song_count(&saved, min_songs))
    }

    pub async fn library_summary(&self, use_cache: bool) -> Result<LibrarySummary, SpotifyError> {
        let followed = self.client.followed_artists(use_cache).await?;
        let saved = self.client.saved_tracks(use_cache).await?;
        let albums = self.client.saved_albums(use_cache).await?;
        debug!(
            target: "library",
            followed = followed.len(),
            saved = saved.len(),
            albums = albums.len(),
            "building library summary"
        );
        Ok(library_summary(&followed, &saved, &albums))
    }

    pub async fn playlist_info(&self, playlist_id: &str) -> Result<PlaylistInfo, SpotifyError> {
        let playlist = self.client.playlist(playlist_id).await?;
        let items = self.client.playlist_tracks(playlist_id).await?;
        Ok(playlist_info(&playlist, items.len()))
    }

    /// Preview details for a `spotify:track:` reference.
    pub async fn track_preview(&self, track_uri: &str) -> Result<TrackPreview, SpotifyError> {
        let uri = TrackUri::parse(track_uri.trim())
            .map_err(|e| SpotifyError::InvalidRequest(e.to_string()))?;
        let track = self.client.track(uri.id()).await?;
        Ok(track_preview(&track))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracklist_spotify::SimplifiedArtist;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn artist_credit(id: &str, name: &str) -> SimplifiedArtist {
        SimplifiedArtist {
            id: Some(id.to_string()),
            name: name.to_string(),
            uri: None,
        }
    }

    fn album(id: &str, name: &str, total: u32) -> SimplifiedAlbum {
        SimplifiedAlbum {
            id: Some(id.to_string()),
            name: name.to_string(),
            uri: None,
            album_type: Some("album".to_string()),
            release_date: Some("1975-11-21".to_string()),
            total_tracks: Some(total),
            artists: vec![artist_credit("queen", "Queen")],
            images: vec![Image {
                url: format!("https://img/{}", id),
                width: Some(640),
                height: Some(640),
            }],
        }
    }

    fn saved(name: &str, artists: Vec<SimplifiedArtist>, album: SimplifiedAlbum) -> SavedTrack {
        SavedTrack {
            added_at: Some("2024-01-01T00:00:00Z".to_string()),
            track: Some(Track {
                id: Some(name.to_lowercase().replace(' ', "")),
                name: name.to_string(),
                uri: Some(format!("spotify:track:{}", name.to_lowercase().replace(' ', ""))),
                artists,
                album: Some(album),
                duration_ms: 200_000,
                popularity: 50,
                explicit: false,
                preview_url: None,
                external_urls: Default::default(),
            }),
        }
    }

    fn library() -> Vec<SavedTrack> {
        let opera = album("opera", "A Night at the Opera", 12);
        let hot_space = album("hotspace", "Hot Space", 11);
        vec![
            saved("Bohemian Rhapsody", vec![artist_credit("queen", "Queen")], opera.clone()),
            saved("Love of My Life", vec![artist_credit("queen", "Queen")], opera.clone()),
            saved("Youre My Best Friend", vec![artist_credit("queen", "Queen")], opera),
            saved(
                "Under Pressure",
                vec![artist_credit("queen", "Queen"), artist_credit("bowie", "David Bowie")],
                hot_space,
            ),
            SavedTrack {
                added_at: None,
                track: None,
            },
        ]
    }

    #[test]
    fn saved_tracks_skip_removed_entries() {
        let views = saved_tracks(&library());
        assert_eq!(views.len(), 4);
        assert_eq!(
            views[0].album.as_ref().and_then(|a| a.image_url.as_deref()),
            Some("https://img/opera")
        );
    }

    #[test]
    fn library_artists_are_counted_and_sorted() {
        let artists = library_artists(&library());

        assert_eq!(artists.len(), 2);
        assert_eq!(artists[0].name, "Queen");
        assert_eq!(artists[0].song_count, 4);
        assert_eq!(artists[0].uri.as_deref(), Some("spotify:artist:queen"));
        assert_eq!(artists[1].name, "David Bowie");
        assert_eq!(artists[1].song_count, 1);
    }

    #[test]
    fn albums_are_filtered_by_saved_count() {
        let albums = albums_by_song_count(&library(), 2);

        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].name, "A Night at the Opera");
        assert_eq!(albums[0].saved_count, 3);
        assert_eq!(albums[0].percentage, 25.0);
    }

    #[test]
    fn summary_counts_everything() {
        let saved_album = SavedAlbum {
            added_at: None,
            album: album("opera", "A Night at the Opera", 12),
        };
        let summary = library_summary(&[], &library(), &[saved_album]);

        assert_eq!(summary.summary.saved_tracks, 4);
        assert_eq!(summary.summary.saved_albums, 1);
        assert_eq!(summary.summary.unique_artists_in_library, 2);
        assert_eq!(summary.summary.unique_albums_in_library, 2);
        assert_eq!(summary.albums_with_most_saved_songs[0].saved_count, 3);
    }

    #[tokio::test]
    async fn track_preview_looks_up_by_uri() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tracks/4u7EnebtmKWzUH433cf5Qv"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "4u7EnebtmKWzUH433cf5Qv",
                "name": "Bohemian Rhapsody",
                "uri": "spotify:track:4u7EnebtmKWzUH433cf5Qv",
                "artists": [{ "name": "Queen" }],
                "album": { "name": "A Night at the Opera" },
                "duration_ms": 354_320,
                "preview_url": "https://p.scdn.co/mp3-preview/abc"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = SpotifyClient::builder()
            .base_url(server.uri())
            .access_token(Some("token".to_string()))
            .build()
            .expect("client should build");
        let service = LibraryService::new(client);

        let preview = service
            .track_preview("spotify:track:4u7EnebtmKWzUH433cf5Qv")
            .await
            .expect("preview should load");

        assert!(preview.has_preview);
        assert_eq!(preview.artists, "Queen");
    }

    #[tokio::test]
    async fn track_preview_rejects_non_track_uris() {
        let client = SpotifyClient::builder()
            .access_token(Some("token".to_string()))
            .build()
            .expect("client should build");
        let service = LibraryService::new(client);

        let error = service
            .track_preview("spotify:album:abc")
            .await
            .expect_err("album uri should be rejected");
        assert!(matches!(error, SpotifyError::InvalidRequest(_)));
    }
}
