//! MusiVault Library
//!
//! Persists a snapshot of a user's streaming library (profile, playlists,
//! saved tracks, ranked top items, audio enrichments) into a normalized
//! SQLite database, and serves it back in the external payload shape.

pub mod config;
pub mod payload;
pub mod snapshot_store;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use payload::LibrarySnapshot;
pub use snapshot_store::{SnapshotStore, SqliteSnapshotStore, SyncReport, TimeRange};
