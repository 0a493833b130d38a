//! Raw payload shapes from the streaming API.
//!
//! These mirror the JSON the (out-of-scope) API access layer hands over:
//! already fetched, paginated, and retried. Every field that can be absent in
//! practice is optional or defaulted so a partially-shaped payload
//! deserializes instead of failing the whole collection.

use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FollowersPayload {
    #[serde(default)]
    pub total: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalUrlsPayload {
    #[serde(default)]
    pub spotify: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImagePayload {
    pub url: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub followers: FollowersPayload,
    #[serde(default)]
    pub external_urls: ExternalUrlsPayload,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtistPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub popularity: Option<i32>,
    #[serde(default)]
    pub followers: FollowersPayload,
    #[serde(default)]
    pub external_urls: ExternalUrlsPayload,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub images: Vec<ImagePayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlbumPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub album_type: Option<String>,
    #[serde(default)]
    pub total_tracks: Option<i32>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub release_date_precision: Option<String>,
    #[serde(default)]
    pub available_markets: Vec<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub popularity: Option<i32>,
    #[serde(default)]
    pub external_urls: ExternalUrlsPayload,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub images: Vec<ImagePayload>,
    #[serde(default)]
    pub artists: Vec<ArtistPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub explicit: Option<bool>,
    #[serde(default)]
    pub popularity: Option<i32>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub track_number: Option<i32>,
    #[serde(default)]
    pub disc_number: Option<i32>,
    #[serde(default)]
    pub is_local: Option<bool>,
    #[serde(default)]
    pub available_markets: Vec<String>,
    #[serde(default)]
    pub external_ids: BTreeMap<String, String>,
    #[serde(default)]
    pub external_urls: ExternalUrlsPayload,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub album: Option<AlbumPayload>,
    #[serde(default)]
    pub artists: Vec<ArtistPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub public: Option<bool>,
    #[serde(default)]
    pub collaborative: Option<bool>,
    #[serde(default)]
    pub followers: FollowersPayload,
    #[serde(default)]
    pub snapshot_id: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrlsPayload,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub images: Vec<ImagePayload>,
}

/// Who added a playlist entry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddedByPayload {
    #[serde(default)]
    pub id: Option<String>,
}

/// One playlist membership entry as delivered by the items endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistItemPayload {
    #[serde(default)]
    pub track: Option<TrackPayload>,
    #[serde(default)]
    pub added_at: Option<String>,
    #[serde(default)]
    pub added_by: Option<AddedByPayload>,
}

/// A playlist together with its already-fetched membership items.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistWithItems {
    #[serde(default)]
    pub playlist: PlaylistPayload,
    #[serde(default)]
    pub items: Vec<PlaylistItemPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SavedTrackPayload {
    #[serde(default)]
    pub track: Option<TrackPayload>,
    #[serde(default)]
    pub added_at: Option<String>,
}

/// One page of ranked top items for a single time range.
///
/// The range is self-described: an explicit `time_range` field when the
/// access layer passes it through, otherwise a `time_range=` fragment
/// embedded in the page `href`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopItemsPayload<T> {
    #[serde(default)]
    pub items: Vec<T>,
    #[serde(default)]
    pub time_range: Option<String>,
    #[serde(default)]
    pub href: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AudioFeaturesPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub danceability: Option<f64>,
    #[serde(default)]
    pub energy: Option<f64>,
    #[serde(default)]
    pub key: Option<i32>,
    #[serde(default)]
    pub loudness: Option<f64>,
    #[serde(default)]
    pub mode: Option<i32>,
    #[serde(default)]
    pub speechiness: Option<f64>,
    #[serde(default)]
    pub acousticness: Option<f64>,
    #[serde(default)]
    pub instrumentalness: Option<f64>,
    #[serde(default)]
    pub liveness: Option<f64>,
    #[serde(default)]
    pub valence: Option<f64>,
    #[serde(default)]
    pub tempo: Option<f64>,
    #[serde(default)]
    pub time_signature: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AudioAnalysisPayload {
    #[serde(default)]
    pub bars: Vec<serde_json::Value>,
    #[serde(default)]
    pub beats: Vec<serde_json::Value>,
    #[serde(default)]
    pub sections: Vec<serde_json::Value>,
    #[serde(default)]
    pub segments: Vec<serde_json::Value>,
    #[serde(default)]
    pub tatums: Vec<serde_json::Value>,
    #[serde(default)]
    pub track: serde_json::Value,
}

/// Audio analysis paired with the track it describes; the analysis endpoint
/// does not echo the track id back.
#[derive(Debug, Clone, Deserialize)]
pub struct AudioAnalysisItem {
    pub track_id: String,
    #[serde(default)]
    pub analysis: AudioAnalysisPayload,
}

/// The complete input of one sync: everything the access layer fetched for
/// the authorized user, bundled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibrarySnapshot {
    pub user: UserPayload,
    #[serde(default)]
    pub playlists: Vec<PlaylistWithItems>,
    #[serde(default)]
    pub saved_tracks: Vec<SavedTrackPayload>,
    #[serde(default)]
    pub top_tracks: Vec<TopItemsPayload<TrackPayload>>,
    #[serde(default)]
    pub top_artists: Vec<TopItemsPayload<ArtistPayload>>,
    #[serde(default)]
    pub followed_artists: Vec<ArtistPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_payload_tolerates_missing_fields() {
        let track: TrackPayload = serde_json::from_str(r#"{"name": "No Id"}"#).unwrap();
        assert_eq!(track.id, None);
        assert_eq!(track.name.as_deref(), Some("No Id"));
        assert!(track.available_markets.is_empty());
        assert!(track.artists.is_empty());
        assert!(track.album.is_none());
    }

    #[test]
    fn test_nested_followers_and_urls_deserialize() {
        let artist: ArtistPayload = serde_json::from_str(
            r#"{
                "id": "a1",
                "name": "Art",
                "followers": {"total": 42, "href": null},
                "external_urls": {"spotify": "https://open.spotify.com/artist/a1"},
                "genres": ["dream pop"]
            }"#,
        )
        .unwrap();
        assert_eq!(artist.followers.total, Some(42));
        assert_eq!(
            artist.external_urls.spotify.as_deref(),
            Some("https://open.spotify.com/artist/a1")
        );
        assert_eq!(artist.genres, vec!["dream pop"]);
    }

    #[test]
    fn test_top_items_page_with_href_only() {
        let page: TopItemsPayload<TrackPayload> = serde_json::from_str(
            r#"{
                "items": [{"id": "t1", "name": "Song"}],
                "href": "https://api.spotify.com/v1/me/top/tracks?time_range=short_term&limit=50"
            }"#,
        )
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.time_range, None);
        assert!(page.href.unwrap().contains("time_range=short_term"));
    }

    #[test]
    fn test_library_snapshot_minimal() {
        let snapshot: LibrarySnapshot =
            serde_json::from_str(r#"{"user": {"id": "u1"}}"#).unwrap();
        assert_eq!(snapshot.user.id.as_deref(), Some("u1"));
        assert!(snapshot.playlists.is_empty());
        assert!(snapshot.saved_tracks.is_empty());
        assert!(snapshot.top_tracks.is_empty());
    }
}
