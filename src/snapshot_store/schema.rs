//! SQLite schema for the vault database.
//!
//! Entity tables are keyed by the external API's opaque string ID, so a
//! re-sync of the same ID updates in place. Association tables carry
//! surrogate integer keys and are replaced wholesale per scope on every
//! sync. List/map-valued source fields live in JSON text columns.

use crate::sql_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

const USER_FK: ForeignKey = ForeignKey {
    foreign_table: "users",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const ARTIST_FK: ForeignKey = ForeignKey {
    foreign_table: "artists",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const ALBUM_FK: ForeignKey = ForeignKey {
    foreign_table: "albums",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::NoAction,
};

const TRACK_FK: ForeignKey = ForeignKey {
    foreign_table: "tracks",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

const PLAYLIST_FK: ForeignKey = ForeignKey {
    foreign_table: "playlists",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Cascade,
};

// =============================================================================
// Entity Tables
// =============================================================================

const USERS_TABLE: Table = Table {
    name: "users",
    columns: &[
        sql_column!("id", SqlType::Text, is_primary_key = true),
        sql_column!("display_name", SqlType::Text),
        sql_column!("email", SqlType::Text),
        sql_column!("country", SqlType::Text),
        sql_column!("followers_total", SqlType::Integer, non_null = true),
        sql_column!("product", SqlType::Text),
        sql_column!("spotify_url", SqlType::Text),
        sql_column!("href", SqlType::Text),
        sql_column!("uri", SqlType::Text),
        sql_column!(
            "created",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sql_column!(
            "updated",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sql_column!("id", SqlType::Text, is_primary_key = true),
        sql_column!("name", SqlType::Text, non_null = true),
        sql_column!("genres", SqlType::Text, non_null = true), // JSON list
        sql_column!("popularity", SqlType::Integer),
        sql_column!("followers_total", SqlType::Integer, non_null = true),
        sql_column!("spotify_url", SqlType::Text),
        sql_column!("href", SqlType::Text),
        sql_column!("uri", SqlType::Text),
        sql_column!("images", SqlType::Text, non_null = true), // JSON list
        sql_column!(
            "created",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sql_column!(
            "updated",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_artists_name", "name")],
    unique_constraints: &[],
};

const ALBUMS_TABLE: Table = Table {
    name: "albums",
    columns: &[
        sql_column!("id", SqlType::Text, is_primary_key = true),
        sql_column!("name", SqlType::Text, non_null = true),
        sql_column!("album_type", SqlType::Text, non_null = true), // 'album', 'single', 'compilation'
        sql_column!("total_tracks", SqlType::Integer),
        sql_column!("release_date", SqlType::Text), // '2023-05-15', '2023-05', '2023'
        sql_column!("release_date_precision", SqlType::Text), // 'day', 'month', 'year'
        sql_column!("available_markets", SqlType::Text, non_null = true), // JSON list
        sql_column!("label", SqlType::Text),
        sql_column!("popularity", SqlType::Integer),
        sql_column!("spotify_url", SqlType::Text),
        sql_column!("href", SqlType::Text),
        sql_column!("uri", SqlType::Text),
        sql_column!("images", SqlType::Text, non_null = true), // JSON list
        sql_column!(
            "created",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sql_column!(
            "updated",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_albums_name", "name")],
    unique_constraints: &[],
};

const TRACKS_TABLE: Table = Table {
    name: "tracks",
    columns: &[
        sql_column!("id", SqlType::Text, is_primary_key = true),
        sql_column!("name", SqlType::Text, non_null = true),
        sql_column!("duration_ms", SqlType::Integer),
        sql_column!("explicit", SqlType::Integer, non_null = true),
        sql_column!("popularity", SqlType::Integer),
        sql_column!("preview_url", SqlType::Text),
        sql_column!("track_number", SqlType::Integer),
        sql_column!("disc_number", SqlType::Integer, non_null = true),
        sql_column!("is_local", SqlType::Integer, non_null = true),
        sql_column!("available_markets", SqlType::Text, non_null = true), // JSON list
        sql_column!("external_ids", SqlType::Text, non_null = true), // JSON map (ISRC, etc.)
        sql_column!("spotify_url", SqlType::Text),
        sql_column!("href", SqlType::Text),
        sql_column!("uri", SqlType::Text),
        sql_column!("album_id", SqlType::Text, foreign_key = Some(&ALBUM_FK)),
        sql_column!(
            "created",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sql_column!(
            "updated",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_tracks_album", "album_id")],
    unique_constraints: &[],
};

const PLAYLISTS_TABLE: Table = Table {
    name: "playlists",
    columns: &[
        sql_column!("id", SqlType::Text, is_primary_key = true),
        sql_column!("name", SqlType::Text, non_null = true),
        sql_column!("description", SqlType::Text),
        sql_column!("public", SqlType::Integer),
        sql_column!("collaborative", SqlType::Integer, non_null = true),
        sql_column!("followers_total", SqlType::Integer, non_null = true),
        sql_column!("snapshot_id", SqlType::Text),
        sql_column!("spotify_url", SqlType::Text),
        sql_column!("href", SqlType::Text),
        sql_column!("uri", SqlType::Text),
        sql_column!("images", SqlType::Text, non_null = true), // JSON list
        sql_column!(
            "owner_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sql_column!(
            "created",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sql_column!(
            "updated",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_playlists_owner", "owner_id")],
    unique_constraints: &[],
};

// =============================================================================
// Enrichment Tables (1:1 with tracks)
// =============================================================================

const AUDIO_FEATURES_TABLE: Table = Table {
    name: "audio_features",
    columns: &[
        sql_column!(
            "track_id",
            SqlType::Text,
            is_primary_key = true,
            foreign_key = Some(&TRACK_FK)
        ),
        sql_column!("danceability", SqlType::Real),
        sql_column!("energy", SqlType::Real),
        sql_column!("key", SqlType::Integer),
        sql_column!("loudness", SqlType::Real),
        sql_column!("mode", SqlType::Integer),
        sql_column!("speechiness", SqlType::Real),
        sql_column!("acousticness", SqlType::Real),
        sql_column!("instrumentalness", SqlType::Real),
        sql_column!("liveness", SqlType::Real),
        sql_column!("valence", SqlType::Real),
        sql_column!("tempo", SqlType::Real),
        sql_column!("time_signature", SqlType::Integer),
        sql_column!(
            "created",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sql_column!(
            "updated",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

const AUDIO_ANALYSIS_TABLE: Table = Table {
    name: "audio_analysis",
    columns: &[
        sql_column!(
            "track_id",
            SqlType::Text,
            is_primary_key = true,
            foreign_key = Some(&TRACK_FK)
        ),
        sql_column!("bars", SqlType::Text, non_null = true), // JSON list
        sql_column!("beats", SqlType::Text, non_null = true), // JSON list
        sql_column!("sections", SqlType::Text, non_null = true), // JSON list
        sql_column!("segments", SqlType::Text, non_null = true), // JSON list
        sql_column!("tatums", SqlType::Text, non_null = true), // JSON list
        sql_column!("track_summary", SqlType::Text, non_null = true), // JSON object
        sql_column!(
            "created",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sql_column!(
            "updated",
            SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

// =============================================================================
// Association Tables
// =============================================================================

const TRACK_ARTISTS_TABLE: Table = Table {
    name: "track_artists",
    columns: &[
        sql_column!("id", SqlType::Integer, is_primary_key = true),
        sql_column!(
            "track_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&TRACK_FK)
        ),
        sql_column!(
            "artist_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
    ],
    indices: &[("idx_track_artists_track", "track_id")],
    unique_constraints: &[&["track_id", "artist_id"]],
};

const ALBUM_ARTISTS_TABLE: Table = Table {
    name: "album_artists",
    columns: &[
        sql_column!("id", SqlType::Integer, is_primary_key = true),
        sql_column!(
            "album_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&ALBUM_FK)
        ),
        sql_column!(
            "artist_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
    ],
    indices: &[("idx_album_artists_album", "album_id")],
    unique_constraints: &[&["album_id", "artist_id"]],
};

/// Ordered playlist membership; `added_at`/`added_by_id` describe the edge,
/// not the track.
const PLAYLIST_TRACKS_TABLE: Table = Table {
    name: "playlist_tracks",
    columns: &[
        sql_column!("id", SqlType::Integer, is_primary_key = true),
        sql_column!(
            "playlist_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&PLAYLIST_FK)
        ),
        sql_column!(
            "track_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&TRACK_FK)
        ),
        sql_column!("position", SqlType::Integer, non_null = true),
        sql_column!("added_at", SqlType::Integer),
        sql_column!("added_by_id", SqlType::Text),
    ],
    indices: &[("idx_playlist_tracks_playlist", "playlist_id")],
    unique_constraints: &[],
};

const SAVED_TRACKS_TABLE: Table = Table {
    name: "saved_tracks",
    columns: &[
        sql_column!("id", SqlType::Integer, is_primary_key = true),
        sql_column!(
            "user_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sql_column!(
            "track_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&TRACK_FK)
        ),
        sql_column!("added_at", SqlType::Integer),
    ],
    indices: &[("idx_saved_tracks_user", "user_id")],
    unique_constraints: &[&["user_id", "track_id"]],
};

const USER_TOP_TRACKS_TABLE: Table = Table {
    name: "user_top_tracks",
    columns: &[
        sql_column!("id", SqlType::Integer, is_primary_key = true),
        sql_column!(
            "user_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sql_column!(
            "track_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&TRACK_FK)
        ),
        sql_column!("time_range", SqlType::Text, non_null = true),
        sql_column!("rank", SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_user_top_tracks_user", "user_id")],
    unique_constraints: &[&["user_id", "time_range", "rank"]],
};

const USER_TOP_ARTISTS_TABLE: Table = Table {
    name: "user_top_artists",
    columns: &[
        sql_column!("id", SqlType::Integer, is_primary_key = true),
        sql_column!(
            "user_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&USER_FK)
        ),
        sql_column!(
            "artist_id",
            SqlType::Text,
            non_null = true,
            foreign_key = Some(&ARTIST_FK)
        ),
        sql_column!("time_range", SqlType::Text, non_null = true),
        sql_column!("rank", SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_user_top_artists_user", "user_id")],
    unique_constraints: &[&["user_id", "time_range", "rank"]],
};

// =============================================================================
// Versioned Schema Definition
// =============================================================================

pub const VAULT_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        USERS_TABLE,
        ARTISTS_TABLE,
        ALBUMS_TABLE,
        TRACKS_TABLE,
        PLAYLISTS_TABLE,
        AUDIO_FEATURES_TABLE,
        AUDIO_ANALYSIS_TABLE,
        TRACK_ARTISTS_TABLE,
        ALBUM_ARTISTS_TABLE,
        PLAYLIST_TRACKS_TABLE,
        SAVED_TRACKS_TABLE,
        USER_TOP_TRACKS_TABLE,
        USER_TOP_ARTISTS_TABLE,
    ],
    migration: None,
}];

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::{params, Connection};

    #[test]
    fn test_schema_creates_and_validates() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = &VAULT_VERSIONED_SCHEMAS[0];
        schema.create(&conn).unwrap();
        schema.validate(&conn).unwrap();
    }

    #[test]
    fn test_entity_id_is_primary_key() {
        let conn = Connection::open_in_memory().unwrap();
        VAULT_VERSIONED_SCHEMAS[0].create(&conn).unwrap();

        conn.execute(
            "INSERT INTO artists (id, name, genres, followers_total, images)
             VALUES ('a1', 'First', '[]', 0, '[]')",
            [],
        )
        .unwrap();

        // Same external id again must be rejected, not duplicated
        let duplicate = conn.execute(
            "INSERT INTO artists (id, name, genres, followers_total, images)
             VALUES ('a1', 'Second', '[]', 0, '[]')",
            [],
        );
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_saved_tracks_unique_per_user_and_track() {
        let conn = Connection::open_in_memory().unwrap();
        VAULT_VERSIONED_SCHEMAS[0].create(&conn).unwrap();

        conn.execute(
            "INSERT INTO users (id, followers_total) VALUES ('u1', 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO tracks (id, name, explicit, disc_number, is_local,
                                 available_markets, external_ids)
             VALUES ('t1', 'Song', 0, 1, 0, '[]', '{}')",
            [],
        )
        .unwrap();

        conn.execute(
            "INSERT INTO saved_tracks (user_id, track_id, added_at) VALUES ('u1', 't1', 100)",
            [],
        )
        .unwrap();
        let duplicate = conn.execute(
            "INSERT INTO saved_tracks (user_id, track_id, added_at) VALUES ('u1', 't1', 200)",
            [],
        );
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_association_rows_get_surrogate_integer_keys() {
        let conn = Connection::open_in_memory().unwrap();
        VAULT_VERSIONED_SCHEMAS[0].create(&conn).unwrap();

        conn.execute(
            "INSERT INTO artists (id, name, genres, followers_total, images)
             VALUES ('a1', 'Art', '[]', 0, '[]')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO tracks (id, name, explicit, disc_number, is_local,
                                 available_markets, external_ids)
             VALUES ('t1', 'Song', 0, 1, 0, '[]', '{}')",
            [],
        )
        .unwrap();

        conn.execute(
            "INSERT INTO track_artists (track_id, artist_id) VALUES ('t1', 'a1')",
            [],
        )
        .unwrap();
        let id: i64 = conn
            .query_row(
                "SELECT id FROM track_artists WHERE track_id = ?1",
                params!["t1"],
                |r| r.get(0),
            )
            .unwrap();
        assert!(id > 0);
    }
}
