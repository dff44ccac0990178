//! Sync session lifecycle: attach, poll on a timer, stop.

pub mod broadcast;
mod session;

pub use broadcast::SyncBroadcaster;
pub use session::SyncManager;
