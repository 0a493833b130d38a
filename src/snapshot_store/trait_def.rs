//! SnapshotStore trait definition.
//!
//! Abstracts the vault behind its write entry point and read projections so
//! consumers depend on the contract rather than the SQLite implementation.

use super::models::{
    DatabaseStats, ResolvedPlaylist, ResolvedTrack, SavedTrackEntry, SyncReport, TimeRange,
    TopArtistEntry, TopTrackEntry, User,
};
use crate::payload::LibrarySnapshot;
use anyhow::Result;

pub trait SnapshotStore: Send + Sync {
    // =========================================================================
    // Write Entry Point
    // =========================================================================

    /// Persist one complete library snapshot for its user, atomically.
    /// Returns the canonical user id and the persisted counts.
    fn store_user_snapshot(&self, snapshot: &LibrarySnapshot) -> Result<SyncReport>;

    // =========================================================================
    // Read Projections
    // =========================================================================

    /// Get a user profile by id.
    fn get_user(&self, id: &str) -> Result<Option<User>>;

    /// Get a user's playlists with their ordered membership, tracks resolved
    /// down to album and artists.
    fn get_user_playlists(&self, user_id: &str) -> Result<Vec<ResolvedPlaylist>>;

    /// Get a user's saved tracks, newest first.
    fn get_saved_tracks(&self, user_id: &str) -> Result<Vec<SavedTrackEntry>>;

    /// Get a user's ranked top tracks, ordered by time range then rank,
    /// optionally filtered to one range.
    fn get_user_top_tracks(
        &self,
        user_id: &str,
        time_range: Option<TimeRange>,
    ) -> Result<Vec<TopTrackEntry>>;

    /// Get a user's ranked top artists, ordered by time range then rank,
    /// optionally filtered to one range.
    fn get_user_top_artists(
        &self,
        user_id: &str,
        time_range: Option<TimeRange>,
    ) -> Result<Vec<TopArtistEntry>>;

    /// Get a resolved track by id.
    fn get_track(&self, id: &str) -> Result<Option<ResolvedTrack>>;

    /// Get resolved tracks for a list of ids; unknown ids are omitted.
    fn get_tracks(&self, ids: &[String]) -> Result<Vec<ResolvedTrack>>;

    /// Row counts for the primary vault tables.
    fn get_database_stats(&self) -> Result<DatabaseStats>;
}
