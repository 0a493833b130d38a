//! One sync pass over a single transaction.
//!
//! `SyncSession` owns the identity map for the pass: every entity id it has
//! written is recorded, so an entity appearing in several places in one
//! payload graph (the same artist inside a track's artist list and inside
//! the embedded album's) resolves to exactly one row. Resolution checks the
//! staged map first, then rows committed by earlier syncs; only a genuinely
//! new id takes the insert path.

use crate::payload::{
    AlbumPayload, ArtistPayload, PlaylistItemPayload, PlaylistPayload, SavedTrackPayload,
    TrackPayload, UserPayload,
};
use crate::snapshot_store::models::{SyncReport, TimeRange};
use crate::snapshot_store::normalize::{self, ItemError};
use anyhow::{bail, Result};
use chrono::Utc;
use rusqlite::{params, Transaction};
use std::collections::HashMap;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum EntityKind {
    User,
    Artist,
    Album,
    Track,
    Playlist,
}

impl EntityKind {
    fn table(&self) -> &'static str {
        match self {
            EntityKind::User => "users",
            EntityKind::Artist => "artists",
            EntityKind::Album => "albums",
            EntityKind::Track => "tracks",
            EntityKind::Playlist => "playlists",
        }
    }
}

/// Where a resolved entity row lives, from the perspective of this pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// Written earlier in this transaction
    Staged,
    /// Committed by a previous sync
    Committed,
}

#[derive(Default)]
struct SyncCounts {
    users: usize,
    artists: usize,
    albums: usize,
    tracks: usize,
    playlists: usize,
    playlist_tracks: usize,
    saved_tracks: usize,
    top_tracks: usize,
    top_artists: usize,
    skipped: usize,
}

pub(crate) struct SyncSession<'tx> {
    tx: &'tx Transaction<'tx>,
    seen: HashMap<(EntityKind, String), Resolution>,
    now: i64,
    counts: SyncCounts,
}

impl<'tx> SyncSession<'tx> {
    pub fn new(tx: &'tx Transaction<'tx>) -> Self {
        SyncSession {
            tx,
            seen: HashMap::new(),
            now: Utc::now().timestamp(),
            counts: SyncCounts::default(),
        }
    }

    pub fn into_report(self, user_id: String) -> SyncReport {
        SyncReport {
            user_id,
            users: self.counts.users,
            artists: self.counts.artists,
            albums: self.counts.albums,
            tracks: self.counts.tracks,
            playlists: self.counts.playlists,
            playlist_tracks: self.counts.playlist_tracks,
            saved_tracks: self.counts.saved_tracks,
            top_tracks: self.counts.top_tracks,
            top_artists: self.counts.top_artists,
            skipped_items: self.counts.skipped,
        }
    }

    /// Find the row for `(kind, id)` within this pass: staged entries first,
    /// then rows already committed by earlier syncs. `None` means genuinely
    /// new.
    fn resolve(&self, kind: EntityKind, id: &str) -> Result<Option<Resolution>> {
        if let Some(resolution) = self.seen.get(&(kind, id.to_string())) {
            return Ok(Some(*resolution));
        }
        match self.tx.query_row(
            &format!("SELECT 1 FROM {} WHERE id = ?1", kind.table()),
            params![id],
            |_| Ok(()),
        ) {
            Ok(()) => Ok(Some(Resolution::Committed)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Record the entity in the pass's identity map. Returns true the first
    /// time this pass touches the id.
    fn mark_seen(&mut self, kind: EntityKind, id: &str, resolution: Option<Resolution>) -> bool {
        self.seen
            .insert(
                (kind, id.to_string()),
                resolution.unwrap_or(Resolution::Staged),
            )
            .is_none()
    }

    fn skip(&mut self, err: &ItemError) {
        debug!("Skipping item: {}", err);
        self.counts.skipped += 1;
    }

    // =========================================================================
    // Upserts
    // =========================================================================

    /// Upsert the sync's user. A user payload without an id aborts the sync:
    /// there is nothing to attach the snapshot to.
    pub fn upsert_user(&mut self, payload: &UserPayload) -> Result<String> {
        let row = match normalize::user_row(payload) {
            Ok(row) => row,
            Err(e) => bail!("cannot sync without a user id: {}", e),
        };
        let resolution = self.resolve(EntityKind::User, &row.id)?;
        match resolution {
            Some(_) => {
                self.tx.execute(
                    "UPDATE users SET display_name = ?2, email = ?3, country = ?4,
                            followers_total = ?5, product = ?6, spotify_url = ?7,
                            href = ?8, uri = ?9, updated = ?10
                     WHERE id = ?1",
                    params![
                        row.id,
                        row.display_name,
                        row.email,
                        row.country,
                        row.followers_total,
                        row.product,
                        row.spotify_url,
                        row.href,
                        row.uri,
                        self.now,
                    ],
                )?;
            }
            None => {
                self.tx.execute(
                    "INSERT INTO users (id, display_name, email, country, followers_total,
                                        product, spotify_url, href, uri, created, updated)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                    params![
                        row.id,
                        row.display_name,
                        row.email,
                        row.country,
                        row.followers_total,
                        row.product,
                        row.spotify_url,
                        row.href,
                        row.uri,
                        self.now,
                    ],
                )?;
            }
        }
        if self.mark_seen(EntityKind::User, &row.id, resolution) {
            self.counts.users += 1;
        }
        Ok(row.id)
    }

    /// Upsert one artist. Returns the canonical id, or `None` when the
    /// payload has no id and the item was skipped.
    pub fn upsert_artist(&mut self, payload: &ArtistPayload) -> Result<Option<String>> {
        let row = match normalize::artist_row(payload) {
            Ok(row) => row,
            Err(e) => {
                self.skip(&e);
                return Ok(None);
            }
        };
        let resolution = self.resolve(EntityKind::Artist, &row.id)?;
        match resolution {
            Some(_) => {
                self.tx.execute(
                    "UPDATE artists SET name = ?2, genres = ?3, popularity = ?4,
                            followers_total = ?5, spotify_url = ?6, href = ?7,
                            uri = ?8, images = ?9, updated = ?10
                     WHERE id = ?1",
                    params![
                        row.id,
                        row.name,
                        row.genres,
                        row.popularity,
                        row.followers_total,
                        row.spotify_url,
                        row.href,
                        row.uri,
                        row.images,
                        self.now,
                    ],
                )?;
            }
            None => {
                self.tx.execute(
                    "INSERT INTO artists (id, name, genres, popularity, followers_total,
                                          spotify_url, href, uri, images, created, updated)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                    params![
                        row.id,
                        row.name,
                        row.genres,
                        row.popularity,
                        row.followers_total,
                        row.spotify_url,
                        row.href,
                        row.uri,
                        row.images,
                        self.now,
                    ],
                )?;
            }
        }
        if self.mark_seen(EntityKind::Artist, &row.id, resolution) {
            self.counts.artists += 1;
        }
        Ok(Some(row.id))
    }

    /// Upsert one album and its embedded artists, then replace the
    /// album↔artist edges with the payload's current artist set.
    pub fn upsert_album(&mut self, payload: &AlbumPayload) -> Result<Option<String>> {
        let row = match normalize::album_row(payload) {
            Ok(row) => row,
            Err(e) => {
                self.skip(&e);
                return Ok(None);
            }
        };

        // Children first: the edge rows need the artist rows in place
        let mut artist_ids = Vec::with_capacity(payload.artists.len());
        for artist in &payload.artists {
            if let Some(artist_id) = self.upsert_artist(artist)? {
                artist_ids.push(artist_id);
            }
        }

        let resolution = self.resolve(EntityKind::Album, &row.id)?;
        match resolution {
            Some(_) => {
                self.tx.execute(
                    "UPDATE albums SET name = ?2, album_type = ?3, total_tracks = ?4,
                            release_date = ?5, release_date_precision = ?6,
                            available_markets = ?7, label = ?8, popularity = ?9,
                            spotify_url = ?10, href = ?11, uri = ?12, images = ?13,
                            updated = ?14
                     WHERE id = ?1",
                    params![
                        row.id,
                        row.name,
                        row.album_type.to_db_str(),
                        row.total_tracks,
                        row.release_date,
                        row.release_date_precision,
                        row.available_markets,
                        row.label,
                        row.popularity,
                        row.spotify_url,
                        row.href,
                        row.uri,
                        row.images,
                        self.now,
                    ],
                )?;
            }
            None => {
                self.tx.execute(
                    "INSERT INTO albums (id, name, album_type, total_tracks, release_date,
                                         release_date_precision, available_markets, label,
                                         popularity, spotify_url, href, uri, images,
                                         created, updated)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
                    params![
                        row.id,
                        row.name,
                        row.album_type.to_db_str(),
                        row.total_tracks,
                        row.release_date,
                        row.release_date_precision,
                        row.available_markets,
                        row.label,
                        row.popularity,
                        row.spotify_url,
                        row.href,
                        row.uri,
                        row.images,
                        self.now,
                    ],
                )?;
            }
        }
        if self.mark_seen(EntityKind::Album, &row.id, resolution) {
            self.counts.albums += 1;
        }

        // Edges reflect the current payload, not an accumulation across syncs
        self.tx.execute(
            "DELETE FROM album_artists WHERE album_id = ?1",
            params![row.id],
        )?;
        for artist_id in &artist_ids {
            self.tx.execute(
                "INSERT OR IGNORE INTO album_artists (album_id, artist_id) VALUES (?1, ?2)",
                params![row.id, artist_id],
            )?;
        }

        Ok(Some(row.id))
    }

    /// Upsert one track and everything embedded in it: album (with its
    /// artists) first, then the track's artists, then the track row, then
    /// the track↔artist edges.
    pub fn upsert_track(&mut self, payload: &TrackPayload) -> Result<Option<String>> {
        let row = match normalize::track_row(payload) {
            Ok(row) => row,
            Err(e) => {
                self.skip(&e);
                return Ok(None);
            }
        };

        let album_id = match &payload.album {
            Some(album) => self.upsert_album(album)?,
            None => None,
        };

        let mut artist_ids = Vec::with_capacity(payload.artists.len());
        for artist in &payload.artists {
            if let Some(artist_id) = self.upsert_artist(artist)? {
                artist_ids.push(artist_id);
            }
        }

        let resolution = self.resolve(EntityKind::Track, &row.id)?;
        match resolution {
            Some(_) => {
                self.tx.execute(
                    "UPDATE tracks SET name = ?2, duration_ms = ?3, explicit = ?4,
                            popularity = ?5, preview_url = ?6, track_number = ?7,
                            disc_number = ?8, is_local = ?9, available_markets = ?10,
                            external_ids = ?11, spotify_url = ?12, href = ?13, uri = ?14,
                            album_id = ?15, updated = ?16
                     WHERE id = ?1",
                    params![
                        row.id,
                        row.name,
                        row.duration_ms,
                        row.explicit,
                        row.popularity,
                        row.preview_url,
                        row.track_number,
                        row.disc_number,
                        row.is_local,
                        row.available_markets,
                        row.external_ids,
                        row.spotify_url,
                        row.href,
                        row.uri,
                        album_id,
                        self.now,
                    ],
                )?;
            }
            None => {
                self.tx.execute(
                    "INSERT INTO tracks (id, name, duration_ms, explicit, popularity,
                                         preview_url, track_number, disc_number, is_local,
                                         available_markets, external_ids, spotify_url,
                                         href, uri, album_id, created, updated)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                             ?15, ?16, ?16)",
                    params![
                        row.id,
                        row.name,
                        row.duration_ms,
                        row.explicit,
                        row.popularity,
                        row.preview_url,
                        row.track_number,
                        row.disc_number,
                        row.is_local,
                        row.available_markets,
                        row.external_ids,
                        row.spotify_url,
                        row.href,
                        row.uri,
                        album_id,
                        self.now,
                    ],
                )?;
            }
        }
        if self.mark_seen(EntityKind::Track, &row.id, resolution) {
            self.counts.tracks += 1;
        }

        self.tx.execute(
            "DELETE FROM track_artists WHERE track_id = ?1",
            params![row.id],
        )?;
        for artist_id in &artist_ids {
            self.tx.execute(
                "INSERT OR IGNORE INTO track_artists (track_id, artist_id) VALUES (?1, ?2)",
                params![row.id, artist_id],
            )?;
        }

        Ok(Some(row.id))
    }

    /// Upsert one playlist owned by `owner_id`.
    pub fn upsert_playlist(
        &mut self,
        payload: &PlaylistPayload,
        owner_id: &str,
    ) -> Result<Option<String>> {
        let row = match normalize::playlist_row(payload) {
            Ok(row) => row,
            Err(e) => {
                self.skip(&e);
                return Ok(None);
            }
        };
        let resolution = self.resolve(EntityKind::Playlist, &row.id)?;
        match resolution {
            Some(_) => {
                self.tx.execute(
                    "UPDATE playlists SET name = ?2, description = ?3, public = ?4,
                            collaborative = ?5, followers_total = ?6, snapshot_id = ?7,
                            spotify_url = ?8, href = ?9, uri = ?10, images = ?11,
                            owner_id = ?12, updated = ?13
                     WHERE id = ?1",
                    params![
                        row.id,
                        row.name,
                        row.description,
                        row.public,
                        row.collaborative,
                        row.followers_total,
                        row.snapshot_id,
                        row.spotify_url,
                        row.href,
                        row.uri,
                        row.images,
                        owner_id,
                        self.now,
                    ],
                )?;
            }
            None => {
                self.tx.execute(
                    "INSERT INTO playlists (id, name, description, public, collaborative,
                                            followers_total, snapshot_id, spotify_url, href,
                                            uri, images, owner_id, created, updated)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
                    params![
                        row.id,
                        row.name,
                        row.description,
                        row.public,
                        row.collaborative,
                        row.followers_total,
                        row.snapshot_id,
                        row.spotify_url,
                        row.href,
                        row.uri,
                        row.images,
                        owner_id,
                        self.now,
                    ],
                )?;
            }
        }
        if self.mark_seen(EntityKind::Playlist, &row.id, resolution) {
            self.counts.playlists += 1;
        }
        Ok(Some(row.id))
    }

    // =========================================================================
    // Scoped Association Replacement
    // =========================================================================

    /// Replace a playlist's membership with the given items. `track_ids` is
    /// the per-item outcome of the preceding track upserts; items whose
    /// track was skipped are excluded. Surviving members keep input order
    /// and are numbered densely from position 0.
    pub fn replace_playlist_tracks(
        &mut self,
        playlist_id: &str,
        items: &[PlaylistItemPayload],
        track_ids: &[Option<String>],
    ) -> Result<usize> {
        self.tx.execute(
            "DELETE FROM playlist_tracks WHERE playlist_id = ?1",
            params![playlist_id],
        )?;

        let mut position = 0i32;
        for (item, track_id) in items.iter().zip(track_ids.iter()) {
            let Some(track_id) = track_id else { continue };
            let added_at = match &item.added_at {
                Some(value) => match normalize::parse_added_at(value) {
                    Ok(ts) => Some(ts),
                    Err(e) => {
                        self.skip(&e);
                        continue;
                    }
                },
                None => None,
            };
            let added_by_id = item.added_by.as_ref().and_then(|by| by.id.clone());
            self.tx.execute(
                "INSERT INTO playlist_tracks (playlist_id, track_id, position, added_at,
                                              added_by_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![playlist_id, track_id, position, added_at, added_by_id],
            )?;
            position += 1;
        }

        self.counts.playlist_tracks += position as usize;
        Ok(position as usize)
    }

    /// Replace the user's saved-tracks set.
    pub fn replace_saved_tracks(
        &mut self,
        user_id: &str,
        items: &[SavedTrackPayload],
        track_ids: &[Option<String>],
    ) -> Result<usize> {
        self.tx.execute(
            "DELETE FROM saved_tracks WHERE user_id = ?1",
            params![user_id],
        )?;

        let mut inserted = 0usize;
        for (item, track_id) in items.iter().zip(track_ids.iter()) {
            let Some(track_id) = track_id else { continue };
            let added_at = match &item.added_at {
                Some(value) => match normalize::parse_added_at(value) {
                    Ok(ts) => Some(ts),
                    Err(e) => {
                        self.skip(&e);
                        continue;
                    }
                },
                None => None,
            };
            inserted += self.tx.execute(
                "INSERT OR IGNORE INTO saved_tracks (user_id, track_id, added_at)
                 VALUES (?1, ?2, ?3)",
                params![user_id, track_id, added_at],
            )?;
        }

        self.counts.saved_tracks += inserted;
        Ok(inserted)
    }

    /// Replace the user's ranked top tracks for one time range. Ranks are
    /// 1-based in input order.
    pub fn replace_top_tracks(
        &mut self,
        user_id: &str,
        time_range: TimeRange,
        track_ids: &[String],
    ) -> Result<usize> {
        self.tx.execute(
            "DELETE FROM user_top_tracks WHERE user_id = ?1 AND time_range = ?2",
            params![user_id, time_range.to_db_str()],
        )?;
        for (index, track_id) in track_ids.iter().enumerate() {
            self.tx.execute(
                "INSERT INTO user_top_tracks (user_id, track_id, time_range, rank)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, track_id, time_range.to_db_str(), (index + 1) as i32],
            )?;
        }
        self.counts.top_tracks += track_ids.len();
        Ok(track_ids.len())
    }

    /// Replace the user's ranked top artists for one time range.
    pub fn replace_top_artists(
        &mut self,
        user_id: &str,
        time_range: TimeRange,
        artist_ids: &[String],
    ) -> Result<usize> {
        self.tx.execute(
            "DELETE FROM user_top_artists WHERE user_id = ?1 AND time_range = ?2",
            params![user_id, time_range.to_db_str()],
        )?;
        for (index, artist_id) in artist_ids.iter().enumerate() {
            self.tx.execute(
                "INSERT INTO user_top_artists (user_id, artist_id, time_range, rank)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    user_id,
                    artist_id,
                    time_range.to_db_str(),
                    (index + 1) as i32
                ],
            )?;
        }
        self.counts.top_artists += artist_ids.len();
        Ok(artist_ids.len())
    }

    pub fn count_skipped_item(&mut self) {
        self.counts.skipped += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot_store::schema::VAULT_VERSIONED_SCHEMAS;
    use rusqlite::Connection;

    fn open_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        VAULT_VERSIONED_SCHEMAS[0].create(&conn).unwrap();
        conn
    }

    fn artist(id: &str, name: &str) -> ArtistPayload {
        ArtistPayload {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_artist_duplicated_in_pass_resolves_to_one_row() {
        let mut conn = open_db();
        let tx = conn.transaction().unwrap();
        {
            let mut session = SyncSession::new(&tx);
            session.upsert_artist(&artist("a1", "First Name")).unwrap();
            session.upsert_artist(&artist("a1", "Second Name")).unwrap();
            let report = session.into_report("u1".to_string());
            assert_eq!(report.artists, 1);
        }
        tx.commit().unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM artists", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
        // Second occurrence in the pass still overwrote the row
        let name: String = conn
            .query_row("SELECT name FROM artists WHERE id = 'a1'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(name, "Second Name");
    }

    #[test]
    fn test_resolve_checks_staged_before_committed() {
        let mut conn = open_db();
        conn.execute(
            "INSERT INTO artists (id, name, genres, followers_total, images)
             VALUES ('a1', 'Committed', '[]', 0, '[]')",
            [],
        )
        .unwrap();

        let tx = conn.transaction().unwrap();
        let mut session = SyncSession::new(&tx);
        assert_eq!(
            session.resolve(EntityKind::Artist, "a1").unwrap(),
            Some(Resolution::Committed)
        );
        session.upsert_artist(&artist("a2", "Staged")).unwrap();
        assert_eq!(
            session.resolve(EntityKind::Artist, "a2").unwrap(),
            Some(Resolution::Staged)
        );
        assert_eq!(session.resolve(EntityKind::Artist, "a3").unwrap(), None);
    }

    #[test]
    fn test_track_upsert_replaces_artist_edges() {
        let mut conn = open_db();

        // First sync: track credited to a1 and a2
        let tx = conn.transaction().unwrap();
        {
            let mut session = SyncSession::new(&tx);
            let payload = TrackPayload {
                id: Some("t1".to_string()),
                name: Some("Song".to_string()),
                artists: vec![artist("a1", "One"), artist("a2", "Two")],
                ..Default::default()
            };
            session.upsert_track(&payload).unwrap();
        }
        tx.commit().unwrap();

        // Second sync: credit moved to a3 only; stale edges must go
        let tx = conn.transaction().unwrap();
        {
            let mut session = SyncSession::new(&tx);
            let payload = TrackPayload {
                id: Some("t1".to_string()),
                name: Some("Song".to_string()),
                artists: vec![artist("a3", "Three")],
                ..Default::default()
            };
            session.upsert_track(&payload).unwrap();
        }
        tx.commit().unwrap();

        let edges: Vec<String> = conn
            .prepare("SELECT artist_id FROM track_artists WHERE track_id = 't1'")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(edges, vec!["a3".to_string()]);
    }

    #[test]
    fn test_top_tracks_scope_replacement_leaves_other_ranges_alone() {
        let mut conn = open_db();
        let tx = conn.transaction().unwrap();
        {
            let mut session = SyncSession::new(&tx);
            session
                .upsert_user(&UserPayload {
                    id: Some("u1".to_string()),
                    ..Default::default()
                })
                .unwrap();
            for id in ["t1", "t2", "t3"] {
                session
                    .upsert_track(&TrackPayload {
                        id: Some(id.to_string()),
                        name: Some(id.to_string()),
                        ..Default::default()
                    })
                    .unwrap();
            }
            session
                .replace_top_tracks(
                    "u1",
                    TimeRange::ShortTerm,
                    &["t1".to_string(), "t2".to_string()],
                )
                .unwrap();
            session
                .replace_top_tracks("u1", TimeRange::LongTerm, &["t3".to_string()])
                .unwrap();
            // Re-derive short_term only
            session
                .replace_top_tracks("u1", TimeRange::ShortTerm, &["t3".to_string()])
                .unwrap();
        }
        tx.commit().unwrap();

        let short: Vec<(String, i32)> = conn
            .prepare(
                "SELECT track_id, rank FROM user_top_tracks
                 WHERE user_id = 'u1' AND time_range = 'short_term' ORDER BY rank",
            )
            .unwrap()
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(short, vec![("t3".to_string(), 1)]);

        let long_count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM user_top_tracks
                 WHERE user_id = 'u1' AND time_range = 'long_term'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(long_count, 1);
    }

    #[test]
    fn test_malformed_added_at_drops_the_row_and_counts_it() {
        let mut conn = open_db();
        let tx = conn.transaction().unwrap();
        let report = {
            let mut session = SyncSession::new(&tx);
            session
                .upsert_user(&UserPayload {
                    id: Some("u1".to_string()),
                    ..Default::default()
                })
                .unwrap();
            session
                .upsert_track(&TrackPayload {
                    id: Some("t1".to_string()),
                    name: Some("Song".to_string()),
                    ..Default::default()
                })
                .unwrap();
            let items = vec![SavedTrackPayload {
                track: Some(TrackPayload {
                    id: Some("t1".to_string()),
                    ..Default::default()
                }),
                added_at: Some("not-a-timestamp".to_string()),
            }];
            session
                .replace_saved_tracks("u1", &items, &[Some("t1".to_string())])
                .unwrap();
            session.into_report("u1".to_string())
        };
        tx.commit().unwrap();

        assert_eq!(report.saved_tracks, 0);
        assert_eq!(report.skipped_items, 1);
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM saved_tracks", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
