//! Entity normalization: raw payload → flat storage row.
//!
//! Pure mapping, no I/O. Nested source fields (`followers.total`,
//! `external_urls.spotify`) flatten to columns; list/map fields are encoded
//! to JSON text and decoded symmetrically on read. Missing optional fields
//! default to `None`, an empty list, or `0` as semantically appropriate.

use crate::payload::{
    AlbumPayload, ArtistPayload, AudioAnalysisPayload, AudioFeaturesPayload, PlaylistPayload,
    TrackPayload, UserPayload,
};
use crate::snapshot_store::models::{AlbumType, Image};
use chrono::DateTime;
use thiserror::Error;

/// Failure affecting a single item within a collection. The sync drops the
/// item, counts it, and keeps going; these never abort a sync.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ItemError {
    #[error("missing required id on {0} payload")]
    MissingId(&'static str),
    #[error("malformed timestamp {0:?}")]
    MalformedTimestamp(String),
}

/// Parse an RFC3339 `added_at` into epoch seconds.
pub fn parse_added_at(value: &str) -> Result<i64, ItemError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp())
        .map_err(|_| ItemError::MalformedTimestamp(value.to_string()))
}

fn encode_json<T: serde::Serialize>(value: &T) -> String {
    // Row values are plain lists/maps of strings; encoding cannot fail
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

fn images_json(images: &[crate::payload::ImagePayload]) -> String {
    let images: Vec<Image> = images
        .iter()
        .map(|i| Image {
            url: i.url.clone(),
            width: i.width,
            height: i.height,
        })
        .collect();
    encode_json(&images)
}

// =============================================================================
// Row Types
// =============================================================================

pub struct UserRow {
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

#[derive(Debug)]
pub struct ArtistRow {
    pub id: String,
    pub name: String,
    pub genres: String,
    pub popularity: Option<i32>,
    pub followers_total: i64,
    pub spotify_url: Option<String>,
    pub href: Option<String>,
    pub uri: Option<String>,
    pub images: String,
}

pub struct AlbumRow {
    pub id: String,
    pub name: String,
    pub album_type: AlbumType,
    pub total_tracks: Option<i32>,
    pub release_date: Option<String>,
    pub release_date_precision: Option<String>,
    pub available_markets: String,
    pub label: Option<String>,
    pub popularity: Option<i32>,
    pub spotify_url: Option<String>,
    pub href: Option<String>,
    pub uri: Option<String>,
    pub images: String,
}

pub struct TrackRow {
    pub id: String,
    pub name: String,
    pub duration_ms: Option<i64>,
    pub explicit: bool,
    pub popularity: Option<i32>,
    pub preview_url: Option<String>,
    pub track_number: Option<i32>,
    pub disc_number: i32,
    pub is_local: bool,
    pub available_markets: String,
    pub external_ids: String,
    pub spotify_url: Option<String>,
    pub href: Option<String>,
    pub uri: Option<String>,
    pub album_id: Option<String>,
}

pub struct PlaylistRow {
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
    pub images: String,
}

pub struct AudioFeaturesRow {
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

pub struct AudioAnalysisRow {
    pub track_id: String,
    pub bars: String,
    pub beats: String,
    pub sections: String,
    pub segments: String,
    pub tatums: String,
    pub track_summary: String,
}

// =============================================================================
// Normalizers
// =============================================================================

pub fn user_row(payload: &UserPayload) -> Result<UserRow, ItemError> {
    let id = required_id(payload.id.as_deref(), "user")?;
    Ok(UserRow {
        id,
        display_name: payload.display_name.clone(),
        email: payload.email.clone(),
        country: payload.country.clone(),
        followers_total: payload.followers.total.unwrap_or(0),
        product: payload.product.clone(),
        spotify_url: payload.external_urls.spotify.clone(),
        href: payload.href.clone(),
        uri: payload.uri.clone(),
    })
}

pub fn artist_row(payload: &ArtistPayload) -> Result<ArtistRow, ItemError> {
    let id = required_id(payload.id.as_deref(), "artist")?;
    Ok(ArtistRow {
        id,
        name: payload.name.clone().unwrap_or_default(),
        genres: encode_json(&payload.genres),
        popularity: payload.popularity,
        followers_total: payload.followers.total.unwrap_or(0),
        spotify_url: payload.external_urls.spotify.clone(),
        href: payload.href.clone(),
        uri: payload.uri.clone(),
        images: images_json(&payload.images),
    })
}

pub fn album_row(payload: &AlbumPayload) -> Result<AlbumRow, ItemError> {
    let id = required_id(payload.id.as_deref(), "album")?;
    Ok(AlbumRow {
        id,
        name: payload.name.clone().unwrap_or_default(),
        album_type: payload
            .album_type
            .as_deref()
            .map(AlbumType::from_db_str)
            .unwrap_or(AlbumType::Album),
        total_tracks: payload.total_tracks,
        release_date: payload.release_date.clone(),
        release_date_precision: payload.release_date_precision.clone(),
        available_markets: encode_json(&payload.available_markets),
        label: payload.label.clone(),
        popularity: payload.popularity,
        spotify_url: payload.external_urls.spotify.clone(),
        href: payload.href.clone(),
        uri: payload.uri.clone(),
        images: images_json(&payload.images),
    })
}

pub fn track_row(payload: &TrackPayload) -> Result<TrackRow, ItemError> {
    let id = required_id(payload.id.as_deref(), "track")?;
    Ok(TrackRow {
        id,
        name: payload.name.clone().unwrap_or_default(),
        duration_ms: payload.duration_ms,
        explicit: payload.explicit.unwrap_or(false),
        popularity: payload.popularity,
        preview_url: payload.preview_url.clone(),
        track_number: payload.track_number,
        disc_number: payload.disc_number.unwrap_or(1),
        is_local: payload.is_local.unwrap_or(false),
        available_markets: encode_json(&payload.available_markets),
        external_ids: encode_json(&payload.external_ids),
        spotify_url: payload.external_urls.spotify.clone(),
        href: payload.href.clone(),
        uri: payload.uri.clone(),
        album_id: payload
            .album
            .as_ref()
            .and_then(|album| album.id.clone())
            .filter(|id| !id.is_empty()),
    })
}

pub fn playlist_row(payload: &PlaylistPayload) -> Result<PlaylistRow, ItemError> {
    let id = required_id(payload.id.as_deref(), "playlist")?;
    Ok(PlaylistRow {
        id,
        name: payload.name.clone().unwrap_or_default(),
        description: payload.description.clone(),
        public: payload.public,
        collaborative: payload.collaborative.unwrap_or(false),
        followers_total: payload.followers.total.unwrap_or(0),
        snapshot_id: payload.snapshot_id.clone(),
        spotify_url: payload.external_urls.spotify.clone(),
        href: payload.href.clone(),
        uri: payload.uri.clone(),
        images: images_json(&payload.images),
    })
}

pub fn audio_features_row(payload: &AudioFeaturesPayload) -> Result<AudioFeaturesRow, ItemError> {
    let track_id = required_id(payload.id.as_deref(), "audio features")?;
    Ok(AudioFeaturesRow {
        track_id,
        danceability: payload.danceability,
        energy: payload.energy,
        key: payload.key,
        loudness: payload.loudness,
        mode: payload.mode,
        speechiness: payload.speechiness,
        acousticness: payload.acousticness,
        instrumentalness: payload.instrumentalness,
        liveness: payload.liveness,
        valence: payload.valence,
        tempo: payload.tempo,
        time_signature: payload.time_signature,
    })
}

pub fn audio_analysis_row(track_id: &str, payload: &AudioAnalysisPayload) -> AudioAnalysisRow {
    AudioAnalysisRow {
        track_id: track_id.to_string(),
        bars: encode_json(&payload.bars),
        beats: encode_json(&payload.beats),
        sections: encode_json(&payload.sections),
        segments: encode_json(&payload.segments),
        tatums: encode_json(&payload.tatums),
        track_summary: encode_json(&payload.track),
    }
}

fn required_id(id: Option<&str>, kind: &'static str) -> Result<String, ItemError> {
    match id {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(ItemError::MissingId(kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{FollowersPayload, ImagePayload};
    use std::collections::BTreeMap;

    fn artist(id: Option<&str>) -> ArtistPayload {
        ArtistPayload {
            id: id.map(String::from),
            name: Some("Art".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_id_is_an_item_error() {
        assert_eq!(
            artist_row(&artist(None)).unwrap_err(),
            ItemError::MissingId("artist")
        );
        assert_eq!(
            artist_row(&artist(Some(""))).unwrap_err(),
            ItemError::MissingId("artist")
        );
        assert!(artist_row(&artist(Some("a1"))).is_ok());
    }

    #[test]
    fn test_followers_default_to_zero_and_lists_to_empty() {
        let row = artist_row(&artist(Some("a1"))).unwrap();
        assert_eq!(row.followers_total, 0);
        assert_eq!(row.genres, "[]");
        assert_eq!(row.images, "[]");
    }

    #[test]
    fn test_list_fields_encode_to_json() {
        let payload = ArtistPayload {
            id: Some("a1".to_string()),
            name: Some("Art".to_string()),
            genres: vec!["shoegaze".to_string(), "dream pop".to_string()],
            followers: FollowersPayload { total: Some(9) },
            images: vec![ImagePayload {
                url: "https://img/1".to_string(),
                width: Some(640),
                height: Some(640),
            }],
            ..Default::default()
        };
        let row = artist_row(&payload).unwrap();
        assert_eq!(row.genres, r#"["shoegaze","dream pop"]"#);
        assert_eq!(row.followers_total, 9);
        let images: Vec<Image> = serde_json::from_str(&row.images).unwrap();
        assert_eq!(images[0].url, "https://img/1");
        assert_eq!(images[0].width, Some(640));
    }

    #[test]
    fn test_track_defaults() {
        let payload = TrackPayload {
            id: Some("t1".to_string()),
            name: Some("Song".to_string()),
            ..Default::default()
        };
        let row = track_row(&payload).unwrap();
        assert!(!row.explicit);
        assert!(!row.is_local);
        assert_eq!(row.disc_number, 1);
        assert_eq!(row.album_id, None);
        assert_eq!(row.external_ids, "{}");
    }

    #[test]
    fn test_track_album_id_comes_from_embedded_album() {
        let payload = TrackPayload {
            id: Some("t1".to_string()),
            album: Some(AlbumPayload {
                id: Some("al1".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(track_row(&payload).unwrap().album_id.as_deref(), Some("al1"));
    }

    #[test]
    fn test_external_ids_encoding_is_deterministic() {
        let mut ids = BTreeMap::new();
        ids.insert("isrc".to_string(), "USUM71703861".to_string());
        ids.insert("ean".to_string(), "0190295851927".to_string());
        let payload = TrackPayload {
            id: Some("t1".to_string()),
            external_ids: ids,
            ..Default::default()
        };
        let first = track_row(&payload).unwrap().external_ids;
        let second = track_row(&payload).unwrap().external_ids;
        assert_eq!(first, second);
        assert_eq!(first, r#"{"ean":"0190295851927","isrc":"USUM71703861"}"#);
    }

    #[test]
    fn test_parse_added_at() {
        assert_eq!(parse_added_at("1970-01-01T00:01:00Z").unwrap(), 60);
        assert_eq!(parse_added_at("1970-01-01T01:00:00+01:00").unwrap(), 0);
        assert_eq!(
            parse_added_at("yesterday").unwrap_err(),
            ItemError::MalformedTimestamp("yesterday".to_string())
        );
    }

    #[test]
    fn test_album_type_defaults_when_absent_or_unknown() {
        let mut payload = AlbumPayload {
            id: Some("al1".to_string()),
            ..Default::default()
        };
        assert_eq!(album_row(&payload).unwrap().album_type, AlbumType::Album);
        payload.album_type = Some("single".to_string());
        assert_eq!(album_row(&payload).unwrap().album_type, AlbumType::Single);
    }
}
