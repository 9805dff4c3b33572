// Catalog track model
// The catalog API is someone else's job - we only read what it hands us.
// Deezer payloads come in a few shapes (search vs chart vs artist top), so
// everything is normalized into one flat Track on the way in.

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album_art_url: Option<String>,
    pub preview_url: Option<String>,
}

impl Track {
    /// Build a bare track straight from a preview link (CLI usage)
    pub fn from_preview_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let title = url
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .map(|segment| segment.split('?').next().unwrap_or(segment).to_string())
            .unwrap_or_else(|| "Unknown Title".to_string());

        Self {
            id: url.clone(),
            title,
            artist: "Unknown Artist".to_string(),
            album_art_url: None,
            preview_url: non_empty(Some(url)),
        }
    }

    pub fn is_playable(&self) -> bool {
        self.preview_url.is_some()
    }
}

/// Parse a catalog response (`{"data": [...]}`) or a bare track array
pub fn parse_tracks(json: &str) -> Result<Vec<Track>> {
    let payload: Payload = serde_json::from_str(json)?;
    let raw = match payload {
        Payload::Wrapped { data } => data,
        Payload::Bare(tracks) => tracks,
    };
    Ok(raw.into_iter().map(Track::from).collect())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Payload {
    Wrapped { data: Vec<RawTrack> },
    Bare(Vec<RawTrack>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

#[derive(Deserialize)]
struct RawArtist {
    name: String,
}

#[derive(Deserialize)]
struct RawImage {
    url: String,
}

#[derive(Deserialize)]
struct RawAlbum {
    cover_medium: Option<String>,
    cover: Option<String>,
    #[serde(default)]
    images: Vec<RawImage>,
}

#[derive(Deserialize)]
struct RawTrack {
    id: RawId,
    title: Option<String>,
    title_short: Option<String>,
    name: Option<String>,
    preview_url: Option<String>,
    preview: Option<String>,
    artist: Option<RawArtist>,
    #[serde(default)]
    artists: Vec<RawArtist>,
    album: Option<RawAlbum>,
}

impl From<RawTrack> for Track {
    fn from(raw: RawTrack) -> Self {
        let id = match raw.id {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s,
        };

        let title = non_empty(raw.title)
            .or_else(|| non_empty(raw.title_short))
            .or_else(|| non_empty(raw.name))
            .unwrap_or_else(|| "Unknown Title".to_string());

        let joined = raw
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let artist = non_empty(raw.artist.map(|a| a.name))
            .or_else(|| non_empty(Some(joined)))
            .unwrap_or_else(|| "Unknown Artist".to_string());

        let album_art_url = raw.album.and_then(|album| {
            non_empty(album.cover_medium)
                .or_else(|| non_empty(album.cover))
                .or_else(|| album.images.into_iter().next().map(|img| img.url))
        });

        let preview_url = non_empty(raw.preview_url).or_else(|| non_empty(raw.preview));

        Self {
            id,
            title,
            artist,
            album_art_url,
            preview_url,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_payload_normalizes_preview_and_artist() {
        let json = r#"{
            "data": [
                {
                    "id": 3135556,
                    "title": "Harder, Better, Faster, Stronger",
                    "preview": "https://cdns-preview.example/abc.mp3",
                    "artist": { "id": 27, "name": "Daft Punk" },
                    "album": { "cover_medium": "https://img.example/cover.jpg" }
                }
            ],
            "total": 1
        }"#;

        let tracks = parse_tracks(json).unwrap();
        assert_eq!(tracks.len(), 1);
        let track = &tracks[0];
        assert_eq!(track.id, "3135556");
        assert_eq!(track.artist, "Daft Punk");
        assert_eq!(track.preview_url.as_deref(), Some("https://cdns-preview.example/abc.mp3"));
        assert_eq!(track.album_art_url.as_deref(), Some("https://img.example/cover.jpg"));
    }

    #[test]
    fn preview_url_wins_over_preview_and_blank_counts_as_missing() {
        let json = r#"[
            { "id": "a", "name": "First", "preview_url": "https://x/1.mp3", "preview": "https://x/other.mp3",
              "artists": [{ "name": "One" }, { "name": "Two" }] },
            { "id": "b", "title_short": "Second", "preview_url": "", "preview": "   " }
        ]"#;

        let tracks = parse_tracks(json).unwrap();
        assert_eq!(tracks[0].title, "First");
        assert_eq!(tracks[0].artist, "One, Two");
        assert_eq!(tracks[0].preview_url.as_deref(), Some("https://x/1.mp3"));

        assert_eq!(tracks[1].title, "Second");
        assert_eq!(tracks[1].artist, "Unknown Artist");
        assert!(!tracks[1].is_playable());
    }

    #[test]
    fn album_images_fall_back_to_first_entry() {
        let json = r#"[{ "id": 1, "album": { "images": [{ "url": "https://img/1.jpg" }, { "url": "https://img/2.jpg" }] } }]"#;
        let tracks = parse_tracks(json).unwrap();
        assert_eq!(tracks[0].title, "Unknown Title");
        assert_eq!(tracks[0].album_art_url.as_deref(), Some("https://img/1.jpg"));
    }

    #[test]
    fn track_from_preview_url_uses_file_name_as_title() {
        let track = Track::from_preview_url("https://cdn.example/previews/song.mp3?hdnea=token");
        assert_eq!(track.title, "song.mp3");
        assert!(track.is_playable());
    }
}
