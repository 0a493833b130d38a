//! SQLite-backed snapshot store.
//!
//! Write side: `store_user_snapshot` drives one full sync (user, playlists
//! with membership, saved tracks, ranked top items per time range, followed
//! artists) inside a single transaction and either commits the whole
//! snapshot or none of it. Read side: resolved aggregates in the external
//! payload shape.

use super::models::*;
use super::normalize;
use super::schema::VAULT_VERSIONED_SCHEMAS;
use super::sync::SyncSession;
use super::trait_def::SnapshotStore;
use crate::payload::{AudioAnalysisPayload, AudioFeaturesPayload, LibrarySnapshot};
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{bail, Context, Result};
use chrono::{SecondsFormat, TimeZone, Utc};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub struct SqliteSnapshotStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSnapshotStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = if db_path.as_ref().exists() {
            Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            let conn = Connection::open(db_path)?;
            VAULT_VERSIONED_SCHEMAS
                .last()
                .expect("at least one schema version")
                .create(&conn)?;
            conn
        };

        let db_version = conn
            .query_row("PRAGMA user_version;", [], |row| row.get::<_, i64>(0))
            .context("Failed to read database version")?
            - BASE_DB_VERSION as i64;

        if db_version < 0 {
            bail!("Database predates schema versioning, refusing to open");
        }
        let version = db_version as usize;
        if version >= VAULT_VERSIONED_SCHEMAS.len() {
            bail!("Database version {} is too new", version);
        }
        VAULT_VERSIONED_SCHEMAS[version].validate(&conn)?;
        Self::migrate_if_needed(&conn, version)?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(SqliteSnapshotStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate_if_needed(conn: &Connection, version: usize) -> Result<()> {
        let mut latest = version;
        for schema in VAULT_VERSIONED_SCHEMAS.iter().skip(version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!("Migrating vault db from version {} to {}", latest, schema.version);
                migration_fn(conn)?;
                latest = schema.version;
            }
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest),
            [],
        )?;
        Ok(())
    }

    // =========================================================================
    // Write Side - Snapshot Sync
    // =========================================================================

    /// Run one complete sync. Everything happens in a single transaction:
    /// an error at any step rolls the whole snapshot back.
    pub fn store_user_snapshot(&self, snapshot: &LibrarySnapshot) -> Result<SyncReport> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let report = {
            let mut session = SyncSession::new(&tx);
            let user_id = session.upsert_user(&snapshot.user)?;

            for playlist in &snapshot.playlists {
                let Some(playlist_id) = session.upsert_playlist(&playlist.playlist, &user_id)?
                else {
                    continue;
                };
                let mut track_ids = Vec::with_capacity(playlist.items.len());
                for item in &playlist.items {
                    let track_id = match &item.track {
                        Some(track) => session.upsert_track(track)?,
                        None => {
                            session.count_skipped_item();
                            None
                        }
                    };
                    track_ids.push(track_id);
                }
                session.replace_playlist_tracks(&playlist_id, &playlist.items, &track_ids)?;
            }

            let mut saved_track_ids = Vec::with_capacity(snapshot.saved_tracks.len());
            for item in &snapshot.saved_tracks {
                let track_id = match &item.track {
                    Some(track) => session.upsert_track(track)?,
                    None => {
                        session.count_skipped_item();
                        None
                    }
                };
                saved_track_ids.push(track_id);
            }
            session.replace_saved_tracks(&user_id, &snapshot.saved_tracks, &saved_track_ids)?;

            for page in &snapshot.top_tracks {
                let time_range =
                    TimeRange::resolve(page.time_range.as_deref(), page.href.as_deref());
                let mut ranked = Vec::with_capacity(page.items.len());
                for track in &page.items {
                    if let Some(track_id) = session.upsert_track(track)? {
                        ranked.push(track_id);
                    }
                }
                session.replace_top_tracks(&user_id, time_range, &ranked)?;
            }

            for page in &snapshot.top_artists {
                let time_range =
                    TimeRange::resolve(page.time_range.as_deref(), page.href.as_deref());
                let mut ranked = Vec::with_capacity(page.items.len());
                for artist in &page.items {
                    if let Some(artist_id) = session.upsert_artist(artist)? {
                        ranked.push(artist_id);
                    }
                }
                session.replace_top_artists(&user_id, time_range, &ranked)?;
            }

            // The source stores followed artists as plain artist entities
            for artist in &snapshot.followed_artists {
                session.upsert_artist(artist)?;
            }

            session.into_report(user_id)
        };

        tx.commit()?;

        info!(
            "Synced snapshot for user {}: {} artists, {} albums, {} tracks, {} playlists ({} items skipped)",
            report.user_id,
            report.artists,
            report.albums,
            report.tracks,
            report.playlists,
            report.skipped_items
        );
        Ok(report)
    }

    /// Upsert audio features for one track. Returns false when the payload
    /// has no id or the track is not in the vault.
    pub fn store_audio_features(&self, payload: &AudioFeaturesPayload) -> Result<bool> {
        let row = match normalize::audio_features_row(payload) {
            Ok(row) => row,
            Err(_) => return Ok(false),
        };
        let conn = self.conn.lock().unwrap();

        let track_exists = match conn.query_row(
            "SELECT 1 FROM tracks WHERE id = ?1",
            params![row.track_id],
            |_| Ok(()),
        ) {
            Ok(()) => true,
            Err(rusqlite::Error::QueryReturnedNoRows) => false,
            Err(e) => return Err(e.into()),
        };
        if !track_exists {
            return Ok(false);
        }

        let now = Utc::now().timestamp();
        conn.execute(
            "INSERT INTO audio_features (track_id, danceability, energy, key, loudness,
                                         mode, speechiness, acousticness, instrumentalness,
                                         liveness, valence, tempo, time_signature,
                                         created, updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)
             ON CONFLICT(track_id) DO UPDATE SET
                 danceability = ?2, energy = ?3, key = ?4, loudness = ?5, mode = ?6,
                 speechiness = ?7, acousticness = ?8, instrumentalness = ?9,
                 liveness = ?10, valence = ?11, tempo = ?12, time_signature = ?13,
                 updated = ?14",
            params![
                row.track_id,
                row.danceability,
                row.energy,
                row.key,
                row.loudness,
                row.mode,
                row.speechiness,
                row.acousticness,
                row.instrumentalness,
                row.liveness,
                row.valence,
                row.tempo,
                row.time_signature,
                now,
            ],
        )?;
        Ok(true)
    }

    /// Upsert audio analysis for one track. Returns false when the track is
    /// not in the vault.
    pub fn store_audio_analysis(
        &self,
        track_id: &str,
        payload: &AudioAnalysisPayload,
    ) -> Result<bool> {
        let row = normalize::audio_analysis_row(track_id, payload);
        let conn = self.conn.lock().unwrap();

        let track_exists = match conn.query_row(
            "SELECT 1 FROM tracks WHERE id = ?1",
            params![row.track_id],
            |_| Ok(()),
        ) {
            Ok(()) => true,
            Err(rusqlite::Error::QueryReturnedNoRows) => false,
            Err(e) => return Err(e.into()),
        };
        if !track_exists {
            return Ok(false);
        }

        let now = Utc::now().timestamp();
        conn.execute(
            "INSERT INTO audio_analysis (track_id, bars, beats, sections, segments,
                                         tatums, track_summary, created, updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             ON CONFLICT(track_id) DO UPDATE SET
                 bars = ?2, beats = ?3, sections = ?4, segments = ?5, tatums = ?6,
                 track_summary = ?7, updated = ?8",
            params![
                row.track_id,
                row.bars,
                row.beats,
                row.sections,
                row.segments,
                row.tatums,
                row.track_summary,
                now,
            ],
        )?;
        Ok(true)
    }

    /// Track ids with no audio features yet; the fetch layer derives its
    /// feature batches from this.
    pub fn track_ids_missing_audio_features(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT t.id FROM tracks t
             LEFT JOIN audio_features af ON af.track_id = t.id
             WHERE af.track_id IS NULL",
        )?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Track ids with no audio analysis yet, capped because analysis fetches
    /// are heavy.
    pub fn track_ids_missing_audio_analysis(&self, limit: usize) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT t.id FROM tracks t
             LEFT JOIN audio_analysis aa ON aa.track_id = t.id
             WHERE aa.track_id IS NULL LIMIT ?1",
        )?;
        let ids = stmt
            .query_map(params![limit as i64], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Get the stored audio features for a track.
    pub fn get_audio_features(&self, track_id: &str) -> Result<Option<AudioFeatures>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT track_id, danceability, energy, key, loudness, mode, speechiness,
                    acousticness, instrumentalness, liveness, valence, tempo,
                    time_signature
             FROM audio_features WHERE track_id = ?1",
        )?;
        match stmt.query_row(params![track_id], |row| {
            Ok(AudioFeatures {
                track_id: row.get(0)?,
                danceability: row.get(1)?,
                energy: row.get(2)?,
                key: row.get(3)?,
                loudness: row.get(4)?,
                mode: row.get(5)?,
                speechiness: row.get(6)?,
                acousticness: row.get(7)?,
                instrumentalness: row.get(8)?,
                liveness: row.get(9)?,
                valence: row.get(10)?,
                tempo: row.get(11)?,
                time_signature: row.get(12)?,
            })
        }) {
            Ok(features) => Ok(Some(features)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Internal Read Helpers
    // =========================================================================

    fn decode_list<T: serde::de::DeserializeOwned>(raw: Option<String>) -> Vec<T> {
        raw.and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    fn decode_map(raw: Option<String>) -> BTreeMap<String, String> {
        raw.and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    fn epoch_to_rfc3339(epoch: Option<i64>) -> Option<String> {
        epoch.and_then(|secs| {
            Utc.timestamp_opt(secs, 0)
                .single()
                .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        })
    }

    fn read_user(conn: &Connection, id: &str) -> Result<Option<User>> {
        let mut stmt = conn.prepare_cached(
            "SELECT id, display_name, email, country, followers_total, product,
                    spotify_url, href, uri
             FROM users WHERE id = ?1",
        )?;
        match stmt.query_row(params![id], |row| {
            Ok(User {
                id: row.get(0)?,
                display_name: row.get(1)?,
                email: row.get(2)?,
                country: row.get(3)?,
                followers_total: row.get(4)?,
                product: row.get(5)?,
                spotify_url: row.get(6)?,
                href: row.get(7)?,
                uri: row.get(8)?,
            })
        }) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read_artist(conn: &Connection, id: &str) -> Result<Option<Artist>> {
        let mut stmt = conn.prepare_cached(
            "SELECT id, name, genres, popularity, followers_total, spotify_url,
                    href, uri, images
             FROM artists WHERE id = ?1",
        )?;
        match stmt.query_row(params![id], Self::parse_artist_row) {
            Ok(artist) => Ok(Some(artist)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Parse an Artist from a row (id, name, genres, popularity,
    /// followers_total, spotify_url, href, uri, images).
    fn parse_artist_row(row: &rusqlite::Row) -> rusqlite::Result<Artist> {
        Ok(Artist {
            id: row.get(0)?,
            name: row.get(1)?,
            genres: Self::decode_list(row.get(2)?),
            popularity: row.get(3)?,
            followers_total: row.get(4)?,
            spotify_url: row.get(5)?,
            href: row.get(6)?,
            uri: row.get(7)?,
            images: Self::decode_list(row.get(8)?),
        })
    }

    fn read_album(conn: &Connection, id: &str) -> Result<Option<Album>> {
        let mut stmt = conn.prepare_cached(
            "SELECT id, name, album_type, total_tracks, release_date,
                    release_date_precision, available_markets, label, popularity,
                    spotify_url, href, uri, images
             FROM albums WHERE id = ?1",
        )?;
        match stmt.query_row(params![id], |row| {
            let album_type: String = row.get(2)?;
            Ok(Album {
                id: row.get(0)?,
                name: row.get(1)?,
                album_type: AlbumType::from_db_str(&album_type),
                total_tracks: row.get(3)?,
                release_date: row.get(4)?,
                release_date_precision: row.get(5)?,
                available_markets: Self::decode_list(row.get(6)?),
                label: row.get(7)?,
                popularity: row.get(8)?,
                spotify_url: row.get(9)?,
                href: row.get(10)?,
                uri: row.get(11)?,
                images: Self::decode_list(row.get(12)?),
            })
        }) {
            Ok(album) => Ok(Some(album)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read_track(conn: &Connection, id: &str) -> Result<Option<Track>> {
        let mut stmt = conn.prepare_cached(
            "SELECT id, name, duration_ms, explicit, popularity, preview_url,
                    track_number, disc_number, is_local, available_markets,
                    external_ids, spotify_url, href, uri, album_id
             FROM tracks WHERE id = ?1",
        )?;
        match stmt.query_row(params![id], |row| {
            Ok(Track {
                id: row.get(0)?,
                name: row.get(1)?,
                duration_ms: row.get(2)?,
                explicit: row.get::<_, i32>(3)? != 0,
                popularity: row.get(4)?,
                preview_url: row.get(5)?,
                track_number: row.get(6)?,
                disc_number: row.get(7)?,
                is_local: row.get::<_, i32>(8)? != 0,
                available_markets: Self::decode_list(row.get(9)?),
                external_ids: Self::decode_map(row.get(10)?),
                spotify_url: row.get(11)?,
                href: row.get(12)?,
                uri: row.get(13)?,
                album_id: row.get(14)?,
            })
        }) {
            Ok(track) => Ok(Some(track)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a track with its album and artists. Artist order follows the
    /// source payload's credit order (edge insertion order).
    fn resolve_track(conn: &Connection, id: &str) -> Result<Option<ResolvedTrack>> {
        let track = match Self::read_track(conn, id)? {
            Some(t) => t,
            None => return Ok(None),
        };

        let album = match &track.album_id {
            Some(album_id) => Self::read_album(conn, album_id)?,
            None => None,
        };

        let mut stmt = conn.prepare_cached(
            "SELECT a.id, a.name, a.genres, a.popularity, a.followers_total,
                    a.spotify_url, a.href, a.uri, a.images
             FROM artists a
             INNER JOIN track_artists ta ON ta.artist_id = a.id
             WHERE ta.track_id = ?1
             ORDER BY ta.id",
        )?;
        let artists = stmt
            .query_map(params![id], Self::parse_artist_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(ResolvedTrack {
            track,
            album,
            artists,
        }))
    }

    fn read_playlist_entries(conn: &Connection, playlist_id: &str) -> Result<Vec<PlaylistEntry>> {
        let mut stmt = conn.prepare_cached(
            "SELECT track_id, position, added_at, added_by_id
             FROM playlist_tracks WHERE playlist_id = ?1
             ORDER BY position",
        )?;
        let rows = stmt
            .query_map(params![playlist_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i32>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut entries = Vec::with_capacity(rows.len());
        for (track_id, position, added_at, added_by_id) in rows {
            if let Some(track) = Self::resolve_track(conn, &track_id)? {
                entries.push(PlaylistEntry {
                    position,
                    added_at: Self::epoch_to_rfc3339(added_at),
                    added_by_id,
                    track,
                });
            }
        }
        Ok(entries)
    }
}

// =============================================================================
// SnapshotStore Trait Implementation
// =============================================================================

impl SnapshotStore for SqliteSnapshotStore {
    fn store_user_snapshot(&self, snapshot: &LibrarySnapshot) -> Result<SyncReport> {
        SqliteSnapshotStore::store_user_snapshot(self, snapshot)
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        Self::read_user(&conn, id)
    }

    fn get_user_playlists(&self, user_id: &str) -> Result<Vec<ResolvedPlaylist>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, name, description, public, collaborative, followers_total,
                    snapshot_id, spotify_url, href, uri, images, owner_id
             FROM playlists WHERE owner_id = ?1
             ORDER BY created, id",
        )?;
        let playlists = stmt
            .query_map(params![user_id], |row| {
                Ok(Playlist {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    public: row
                        .get::<_, Option<i32>>(3)?
                        .map(|v| v != 0),
                    collaborative: row.get::<_, i32>(4)? != 0,
                    followers_total: row.get(5)?,
                    snapshot_id: row.get(6)?,
                    spotify_url: row.get(7)?,
                    href: row.get(8)?,
                    uri: row.get(9)?,
                    images: Self::decode_list(row.get(10)?),
                    owner_id: row.get(11)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut resolved = Vec::with_capacity(playlists.len());
        for playlist in playlists {
            let tracks = Self::read_playlist_entries(&conn, &playlist.id)?;
            resolved.push(ResolvedPlaylist { playlist, tracks });
        }
        Ok(resolved)
    }

    fn get_saved_tracks(&self, user_id: &str) -> Result<Vec<SavedTrackEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT track_id, added_at FROM saved_tracks
             WHERE user_id = ?1
             ORDER BY added_at IS NULL, added_at DESC, id",
        )?;
        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<i64>>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut entries = Vec::with_capacity(rows.len());
        for (track_id, added_at) in rows {
            if let Some(track) = Self::resolve_track(&conn, &track_id)? {
                entries.push(SavedTrackEntry {
                    added_at: Self::epoch_to_rfc3339(added_at),
                    track,
                });
            }
        }
        Ok(entries)
    }

    fn get_user_top_tracks(
        &self,
        user_id: &str,
        time_range: Option<TimeRange>,
    ) -> Result<Vec<TopTrackEntry>> {
        let conn = self.conn.lock().unwrap();
        let rows = Self::read_top_rows(&conn, "user_top_tracks", "track_id", user_id, time_range)?;

        let mut entries = Vec::with_capacity(rows.len());
        for (track_id, range, rank) in rows {
            if let Some(track) = Self::resolve_track(&conn, &track_id)? {
                entries.push(TopTrackEntry {
                    time_range: TimeRange::from_db_str(&range),
                    rank,
                    track,
                });
            }
        }
        Ok(entries)
    }

    fn get_user_top_artists(
        &self,
        user_id: &str,
        time_range: Option<TimeRange>,
    ) -> Result<Vec<TopArtistEntry>> {
        let conn = self.conn.lock().unwrap();
        let rows = Self::read_top_rows(&conn, "user_top_artists", "artist_id", user_id, time_range)?;

        let mut entries = Vec::with_capacity(rows.len());
        for (artist_id, range, rank) in rows {
            if let Some(artist) = Self::read_artist(&conn, &artist_id)? {
                entries.push(TopArtistEntry {
                    time_range: TimeRange::from_db_str(&range),
                    rank,
                    artist,
                });
            }
        }
        Ok(entries)
    }

    fn get_track(&self, id: &str) -> Result<Option<ResolvedTrack>> {
        let conn = self.conn.lock().unwrap();
        Self::resolve_track(&conn, id)
    }

    fn get_tracks(&self, ids: &[String]) -> Result<Vec<ResolvedTrack>> {
        let conn = self.conn.lock().unwrap();
        let mut tracks = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(track) = Self::resolve_track(&conn, id)? {
                tracks.push(track);
            }
        }
        Ok(tracks)
    }

    fn get_database_stats(&self) -> Result<DatabaseStats> {
        let conn = self.conn.lock().unwrap();
        let count = |table: &str| -> Result<usize> {
            let n: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
            Ok(n as usize)
        };
        Ok(DatabaseStats {
            users: count("users")?,
            artists: count("artists")?,
            albums: count("albums")?,
            tracks: count("tracks")?,
            playlists: count("playlists")?,
            audio_features: count("audio_features")?,
            audio_analysis: count("audio_analysis")?,
            saved_tracks: count("saved_tracks")?,
            user_top_tracks: count("user_top_tracks")?,
            user_top_artists: count("user_top_artists")?,
        })
    }
}

impl SqliteSnapshotStore {
    /// Shared SELECT for the two ranked tables: rows ordered by time range
    /// (short, medium, long) then rank, optionally filtered to one range.
    fn read_top_rows(
        conn: &Connection,
        table: &str,
        id_column: &str,
        user_id: &str,
        time_range: Option<TimeRange>,
    ) -> Result<Vec<(String, String, i32)>> {
        let range_order = "CASE time_range
            WHEN 'short_term' THEN 0
            WHEN 'medium_term' THEN 1
            WHEN 'long_term' THEN 2
        END";

        let rows = match time_range {
            Some(range) => {
                let mut stmt = conn.prepare_cached(&format!(
                    "SELECT {}, time_range, rank FROM {}
                     WHERE user_id = ?1 AND time_range = ?2
                     ORDER BY rank",
                    id_column, table
                ))?;
                let rows = stmt
                    .query_map(params![user_id, range.to_db_str()], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare_cached(&format!(
                    "SELECT {}, time_range, rank FROM {}
                     WHERE user_id = ?1
                     ORDER BY {}, rank",
                    id_column, table, range_order
                ))?;
                let rows = stmt
                    .query_map(params![user_id], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(rows)
    }
}
