// crates/server/src/config.rs
//! Command-line / environment configuration for the server binary.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use leveling_sync_core::{SyncConfig, DEFAULT_TAIL_WINDOW};

/// Default port for the server.
pub const DEFAULT_PORT: u16 = 47990;

#[derive(Debug, Clone, Parser)]
#[command(name = "leveling-sync", version, about = "Sync a leveling checklist with the game client log")]
pub struct Args {
    /// Port to listen on (falls back to $PORT, then 47990).
    #[arg(long, env = "LEVELING_SYNC_PORT")]
    pub port: Option<u16>,

    /// Guide document (JSON) with the general section and acts.
    #[arg(long, env = "LEVELING_SYNC_CHECKLIST")]
    pub checklist: PathBuf,

    /// Where checkbox state is saved. Defaults to the user data directory.
    #[arg(long, env = "LEVELING_SYNC_PROGRESS")]
    pub progress: Option<PathBuf>,

    /// Game client log to attach to on startup.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[arg(long, default_value_t = 2000)]
    pub poll_interval_ms: u64,

    /// Trailing bytes read on attach to recover the current act and zone.
    #[arg(long, default_value_t = DEFAULT_TAIL_WINDOW)]
    pub tail_window_bytes: u64,

    /// Frontend assets served at `/`.
    #[arg(long, env = "STATIC_DIR")]
    pub static_dir: Option<PathBuf>,
}

impl Args {
    pub fn port(&self) -> u16 {
        self.port
            .or_else(|| std::env::var("PORT").ok().and_then(|p| p.parse().ok()))
            .unwrap_or(DEFAULT_PORT)
    }

    /// Explicit `--progress`, else `<data_dir>/leveling-sync/progress.json`.
    pub fn progress_path(&self) -> anyhow::Result<PathBuf> {
        if let Some(path) = &self.progress {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory; pass --progress"))?;
        Ok(data_dir.join("leveling-sync").join("progress.json"))
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            // A zero interval would make `tokio::time::interval` panic.
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            tail_window: self.tail_window_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["leveling-sync", "--checklist", "guide.json"]).unwrap();
        assert_eq!(args.checklist, PathBuf::from("guide.json"));
        assert_eq!(args.sync_config(), SyncConfig::default());
        assert!(args.log_file.is_none());
    }

    #[test]
    fn explicit_flags() {
        let args = Args::try_parse_from([
            "leveling-sync",
            "--checklist",
            "guide.json",
            "--port",
            "8080",
            "--progress",
            "/tmp/p.json",
            "--poll-interval-ms",
            "500",
            "--tail-window-bytes",
            "4096",
        ])
        .unwrap();
        assert_eq!(args.port(), 8080);
        assert_eq!(args.progress_path().unwrap(), PathBuf::from("/tmp/p.json"));
        assert_eq!(args.sync_config().poll_interval, Duration::from_millis(500));
        assert_eq!(args.sync_config().tail_window, 4096);
    }

    #[test]
    fn zero_interval_is_clamped() {
        let args = Args::try_parse_from([
            "leveling-sync",
            "--checklist",
            "g.json",
            "--poll-interval-ms",
            "0",
        ])
        .unwrap();
        assert_eq!(args.sync_config().poll_interval, Duration::from_millis(1));
    }

    #[test]
    fn checklist_is_required() {
        assert!(Args::try_parse_from(["leveling-sync"]).is_err());
    }
}
