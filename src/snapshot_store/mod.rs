mod models;
mod normalize;
mod schema;
mod store;
mod sync;
mod trait_def;

pub use models::{
    Album, AlbumType, Artist, AudioFeatures, DatabaseStats, Image, Playlist, PlaylistEntry,
    ResolvedPlaylist, ResolvedTrack, SavedTrackEntry, SyncReport, TimeRange, TopArtistEntry,
    TopTrackEntry, Track, User,
};
pub use normalize::ItemError;
pub use store::SqliteSnapshotStore;
pub use trait_def::SnapshotStore;
