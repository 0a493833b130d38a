//! Stored vault models.
//!
//! These are the read-side shapes the store hands back: flat entity structs
//! with list/map fields decoded from their stored JSON text, plus the
//! resolved composites that mirror the nested external payload shape.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// Enumerations
// =============================================================================

/// Album type classification
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlbumType {
    Album,
    Single,
    Compilation,
}

impl AlbumType {
    /// Convert from database string representation
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "album" => AlbumType::Album,
            "single" => AlbumType::Single,
            "compilation" => AlbumType::Compilation,
            _ => AlbumType::Album, // Default fallback
        }
    }

    /// Convert to database string representation
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AlbumType::Album => "album",
            AlbumType::Single => "single",
            AlbumType::Compilation => "compilation",
        }
    }
}

/// Time window a ranked top-items list is scoped to
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl Default for TimeRange {
    fn default() -> Self {
        TimeRange::MediumTerm
    }
}

impl TimeRange {
    /// Convert from database string representation
    pub fn from_db_str(s: &str) -> Self {
        match s {
            "short_term" => TimeRange::ShortTerm,
            "medium_term" => TimeRange::MediumTerm,
            "long_term" => TimeRange::LongTerm,
            _ => TimeRange::default(),
        }
    }

    /// Convert to database string representation
    pub fn to_db_str(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }

    /// Resolve the scope of a top-items page: explicit field first, then a
    /// `time_range=` fragment in the page href, else the default range.
    pub fn resolve(explicit: Option<&str>, href: Option<&str>) -> Self {
        if let Some(s) = explicit {
            if let Some(range) = Self::parse(s) {
                return range;
            }
        }
        if let Some(href) = href {
            if let Some(fragment) = href.split(&['?', '&'][..]).find_map(|part| {
                part.strip_prefix("time_range=")
            }) {
                if let Some(range) = Self::parse(fragment) {
                    return range;
                }
            }
        }
        TimeRange::default()
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "short_term" => Some(TimeRange::ShortTerm),
            "medium_term" => Some(TimeRange::MediumTerm),
            "long_term" => Some(TimeRange::LongTerm),
            _ => None,
        }
    }
}

// =============================================================================
// Core Entities
// =============================================================================

/// Image metadata, stored verbatim from the source payload
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Image {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// User profile entity
#[derive(Clone, Debug, Serialize)]
pub struct User {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub followers_total: i64,
    pub product: Option<String>,
    pub spotify_url: Option<String>,
    pub href: Option<String>,
    pub uri: Option<String>,
}

/// Artist entity
#[derive(Clone, Debug, Serialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    pub genres: Vec<String>,
    pub popularity: Option<i32>,
    pub followers_total: i64,
    pub spotify_url: Option<String>,
    pub href: Option<String>,
    pub uri: Option<String>,
    pub images: Vec<Image>,
}

/// Album entity
#[derive(Clone, Debug, Serialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    pub album_type: AlbumType,
    pub total_tracks: Option<i32>,
    pub release_date: Option<String>,
    pub release_date_precision: Option<String>,
    pub available_markets: Vec<String>,
    pub label: Option<String>,
    pub popularity: Option<i32>,
    pub spotify_url: Option<String>,
    pub href: Option<String>,
    pub uri: Option<String>,
    pub images: Vec<Image>,
}

/// Track entity
#[derive(Clone, Debug, Serialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub duration_ms: Option<i64>,
    pub explicit: bool,
    pub popularity: Option<i32>,
    pub preview_url: Option<String>,
    pub track_number: Option<i32>,
    pub disc_number: i32,
    pub is_local: bool,
    pub available_markets: Vec<String>,
    pub external_ids: BTreeMap<String, String>,
    pub spotify_url: Option<String>,
    pub href: Option<String>,
    pub uri: Option<String>,
    pub album_id: Option<String>,
}

/// Playlist entity
#[derive(Clone, Debug, Serialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub public: Option<bool>,
    pub collaborative: bool,
    pub followers_total: i64,
    pub snapshot_id: Option<String>,
    pub spotify_url: Option<String>,
    pub href: Option<String>,
    pub uri: Option<String>,
    pub images: Vec<Image>,
    pub owner_id: String,
}

/// Per-track acoustic descriptors (1:1 with tracks)
#[derive(Clone, Debug, Serialize)]
pub struct AudioFeatures {
    pub track_id: String,
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub key: Option<i32>,
    pub loudness: Option<f64>,
    pub mode: Option<i32>,
    pub speechiness: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub valence: Option<f64>,
    pub tempo: Option<f64>,
    pub time_signature: Option<i32>,
}

// =============================================================================
// Resolved/Composite Types (API Responses)
// =============================================================================

/// Track with its album and artists resolved
#[derive(Clone, Debug, Serialize)]
pub struct ResolvedTrack {
    pub track: Track,
    pub album: Option<Album>,
    pub artists: Vec<Artist>,
}

/// One playlist membership row with its resolved track
#[derive(Clone, Debug, Serialize)]
pub struct PlaylistEntry {
    pub position: i32,
    pub added_at: Option<String>,
    pub added_by_id: Option<String>,
    #[serde(flatten)]
    pub track: ResolvedTrack,
}

/// Playlist with its ordered membership resolved
#[derive(Clone, Debug, Serialize)]
pub struct ResolvedPlaylist {
    pub playlist: Playlist,
    pub tracks: Vec<PlaylistEntry>,
}

/// One saved-track row with its resolved track
#[derive(Clone, Debug, Serialize)]
pub struct SavedTrackEntry {
    pub added_at: Option<String>,
    #[serde(flatten)]
    pub track: ResolvedTrack,
}

/// One ranked top-track row
#[derive(Clone, Debug, Serialize)]
pub struct TopTrackEntry {
    pub time_range: TimeRange,
    pub rank: i32,
    #[serde(flatten)]
    pub track: ResolvedTrack,
}

/// One ranked top-artist row
#[derive(Clone, Debug, Serialize)]
pub struct TopArtistEntry {
    pub time_range: TimeRange,
    pub rank: i32,
    pub artist: Artist,
}

// =============================================================================
// Sync Reporting
// =============================================================================

/// Per-kind counts of entities and association rows persisted by one sync.
///
/// Entity counts are distinct entities touched (a duplicated artist in one
/// payload graph counts once); association counts are rows inserted.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct SyncReport {
    pub user_id: String,
    pub users: usize,
    pub artists: usize,
    pub albums: usize,
    pub tracks: usize,
    pub playlists: usize,
    pub playlist_tracks: usize,
    pub saved_tracks: usize,
    pub top_tracks: usize,
    pub top_artists: usize,
    pub skipped_items: usize,
}

/// Row counts for the primary vault tables.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct DatabaseStats {
    pub users: usize,
    pub artists: usize,
    pub albums: usize,
    pub tracks: usize,
    pub playlists: usize,
    pub audio_features: usize,
    pub audio_analysis: usize,
    pub saved_tracks: usize,
    pub user_top_tracks: usize,
    pub user_top_artists: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_album_type_roundtrip() {
        let types = vec![AlbumType::Album, AlbumType::Single, AlbumType::Compilation];
        for album_type in types {
            let db_str = album_type.to_db_str();
            let parsed = AlbumType::from_db_str(db_str);
            assert_eq!(album_type, parsed);
        }
    }

    #[test]
    fn test_album_type_unknown_falls_back_to_album() {
        assert_eq!(AlbumType::from_db_str("mixtape"), AlbumType::Album);
    }

    #[test]
    fn test_time_range_roundtrip() {
        let ranges = vec![
            TimeRange::ShortTerm,
            TimeRange::MediumTerm,
            TimeRange::LongTerm,
        ];
        for range in ranges {
            let db_str = range.to_db_str();
            let parsed = TimeRange::from_db_str(db_str);
            assert_eq!(range, parsed);
        }
    }

    #[test]
    fn test_enums_serialize_in_external_form() {
        assert_eq!(
            serde_json::to_string(&TimeRange::ShortTerm).unwrap(),
            r#""short_term""#
        );
        assert_eq!(
            serde_json::to_string(&AlbumType::Compilation).unwrap(),
            r#""compilation""#
        );
    }

    #[test]
    fn test_time_range_resolve_prefers_explicit_field() {
        let range = TimeRange::resolve(
            Some("long_term"),
            Some("https://api.spotify.com/v1/me/top/tracks?time_range=short_term"),
        );
        assert_eq!(range, TimeRange::LongTerm);
    }

    #[test]
    fn test_time_range_resolve_parses_href_fragment() {
        let range = TimeRange::resolve(
            None,
            Some("https://api.spotify.com/v1/me/top/tracks?limit=50&time_range=short_term&offset=0"),
        );
        assert_eq!(range, TimeRange::ShortTerm);
    }

    #[test]
    fn test_time_range_resolve_falls_back_to_default() {
        assert_eq!(TimeRange::resolve(None, None), TimeRange::MediumTerm);
        assert_eq!(
            TimeRange::resolve(Some("last_week"), Some("https://example.com?page=2")),
            TimeRange::MediumTerm
        );
    }
}
