//! Vault Import Tool
//!
//! This binary imports an already-fetched library snapshot (a directory of
//! payload JSON files produced by the API access layer) into the vault
//! database: one atomic sync, followed by audio enrichment upserts.

use anyhow::{Context, Result};
use clap::Parser;
use musivault::config::{AppConfig, CliConfig, FileConfig};
use musivault::payload::{AudioAnalysisItem, AudioFeaturesPayload, LibrarySnapshot};
use musivault::snapshot_store::{SnapshotStore, SqliteSnapshotStore};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "vault-import")]
#[command(about = "Import a fetched library snapshot into the vault database")]
struct Args {
    /// Path to the snapshot directory (user.json, playlists.json, ...)
    #[arg(value_name = "SNAPSHOT_DIR")]
    snapshot_dir: Option<PathBuf>,

    /// Path to the vault SQLite database file
    #[arg(long = "db", value_name = "DB_PATH")]
    db_path: Option<PathBuf>,

    /// Optional TOML config file
    #[arg(long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Max audio analysis payloads to store this run
    #[arg(long, default_value_t = 100)]
    audio_analysis_limit: usize,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let file_config = match &args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli = CliConfig {
        db_path: args.db_path.clone(),
        snapshot_dir: args.snapshot_dir.clone(),
        audio_analysis_limit: args.audio_analysis_limit,
    };
    let config = AppConfig::resolve(&cli, file_config)?;

    info!("Vault Import Tool v{}", env!("CARGO_PKG_VERSION"));
    info!("====================");
    info!("Snapshot directory: {}", config.snapshot_dir.display());
    info!("Vault database: {}", config.db_path.display());

    let snapshot = load_snapshot(&config.snapshot_dir)?;
    let store = SqliteSnapshotStore::new(&config.db_path)?;

    info!("Starting sync...");
    let report = store.store_user_snapshot(&snapshot)?;

    let features_stored = store_audio_features(&store, &config.snapshot_dir)?;
    let analysis_stored =
        store_audio_analysis(&store, &config.snapshot_dir, config.audio_analysis_limit)?;

    info!("");
    info!("Import Summary");
    info!("==============");
    info!("User: {}", report.user_id);
    info!("Artists: {}", report.artists);
    info!("Albums: {}", report.albums);
    info!("Tracks: {}", report.tracks);
    info!("Playlists: {} ({} memberships)", report.playlists, report.playlist_tracks);
    info!("Saved tracks: {}", report.saved_tracks);
    info!(
        "Top items: {}",
        report.top_tracks + report.top_artists
    );
    info!("Audio features: {}", features_stored);
    info!("Audio analysis: {}", analysis_stored);
    if report.skipped_items > 0 {
        warn!("Items skipped: {}", report.skipped_items);
    }

    let stats = store.get_database_stats()?;
    info!("");
    info!("Vault now contains:");
    info!("  {} users", stats.users);
    info!("  {} artists", stats.artists);
    info!("  {} albums", stats.albums);
    info!("  {} tracks", stats.tracks);
    info!("  {} playlists", stats.playlists);
    info!("  {} saved tracks", stats.saved_tracks);
    info!(
        "  {} top items",
        stats.user_top_tracks + stats.user_top_artists
    );
    info!("  {} audio features", stats.audio_features);

    let missing_features = store.track_ids_missing_audio_features()?;
    if !missing_features.is_empty() {
        info!(
            "{} tracks still missing audio features; re-run after the next fetch",
            missing_features.len()
        );
    }

    info!("");
    info!("Import completed successfully!");
    Ok(())
}

/// Read one payload file; a missing optional file yields the default (empty)
/// value so partial snapshots import cleanly.
fn load_optional<T: DeserializeOwned + Default>(dir: &Path, file_name: &str) -> Result<T> {
    let path = dir.join(file_name);
    if !path.exists() {
        return Ok(T::default());
    }
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn load_snapshot(dir: &Path) -> Result<LibrarySnapshot> {
    let user_path = dir.join("user.json");
    let raw = std::fs::read_to_string(&user_path)
        .with_context(|| format!("Snapshot is missing {}", user_path.display()))?;
    let user = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", user_path.display()))?;

    Ok(LibrarySnapshot {
        user,
        playlists: load_optional(dir, "playlists.json")?,
        saved_tracks: load_optional(dir, "saved_tracks.json")?,
        top_tracks: load_optional(dir, "top_tracks.json")?,
        top_artists: load_optional(dir, "top_artists.json")?,
        followed_artists: load_optional(dir, "followed_artists.json")?,
    })
}

fn store_audio_features(store: &SqliteSnapshotStore, dir: &Path) -> Result<usize> {
    let features: Vec<AudioFeaturesPayload> = load_optional(dir, "audio_features.json")?;
    let mut stored = 0usize;
    for payload in &features {
        if store.store_audio_features(payload)? {
            stored += 1;
        }
    }
    Ok(stored)
}

fn store_audio_analysis(store: &SqliteSnapshotStore, dir: &Path, limit: usize) -> Result<usize> {
    let items: Vec<AudioAnalysisItem> = load_optional(dir, "audio_analysis.json")?;
    let mut stored = 0usize;
    for item in items.iter().take(limit) {
        if store.store_audio_analysis(&item.track_id, &item.analysis)? {
            stored += 1;
        }
    }
    if items.len() > limit {
        warn!(
            "Audio analysis capped at {} of {} payloads",
            limit,
            items.len()
        );
    }
    Ok(stored)
}
