// crates/server/src/sync/session.rs
//! One active sync session at a time.
//!
//! A session owns a [`TailReader`] and a [`SyncEngine`] behind one async
//! mutex. The timer task and `POST /api/sync/poll` both `try_lock` it: a
//! poll request that arrives while another poll is running is dropped, never
//! queued. Stopping cancels the timer, waits for an in-flight poll to finish
//! (its result is discarded) and then fires `SourceEnded` exactly once.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use leveling_sync_core::{
    Checklist, IngestReport, JsonProgressStore, PollOutcome, SyncConfig, SyncEngine, SyncObserver,
    TailError, TailReader,
};
use leveling_sync_types::{EndReason, SyncStatus};
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::sync::SyncBroadcaster;

/// State shared by the manager, route handlers and the poll task.
struct SyncContext {
    checklist: Arc<Checklist>,
    progress: Mutex<JsonProgressStore>,
    broadcaster: SyncBroadcaster,
}

impl SyncContext {
    /// The progress lock is never held across an `.await`.
    fn lock_progress(&self) -> MutexGuard<'_, JsonProgressStore> {
        self.progress.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run `text` through `engine`. Blocking: may write the progress file.
    fn ingest(&self, engine: &mut SyncEngine, text: &str) -> IngestReport {
        let mut store = self.lock_progress();
        let report = engine.ingest(text, &self.checklist, &mut *store, &self.broadcaster);
        metrics::record_events(&report.events);
        report
    }
}

struct Poller {
    reader: TailReader,
    engine: SyncEngine,
}

#[derive(Debug)]
enum PollError {
    Busy,
    Ended,
    Source(TailError),
}

impl From<PollError> for ApiError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::Busy => ApiError::PollInProgress,
            PollError::Ended => ApiError::NotSyncing,
            PollError::Source(e) => ApiError::Tail(e),
        }
    }
}

struct Session {
    path: PathBuf,
    cancel: CancellationToken,
    ended: AtomicBool,
    poller: Arc<tokio::sync::Mutex<Poller>>,
}

impl Session {
    fn is_live(&self) -> bool {
        !self.ended.load(Ordering::SeqCst)
    }

    /// Read what was appended and run it through the engine.
    async fn poll_once(&self, ctx: &Arc<SyncContext>) -> Result<(), PollError> {
        if self.cancel.is_cancelled() {
            return Err(PollError::Ended);
        }
        let Ok(mut poller) = self.poller.clone().try_lock_owned() else {
            tracing::debug!(path = %self.path.display(), "Poll already in flight; dropping request");
            return Err(PollError::Busy);
        };

        let started = Instant::now();
        let offset_before = poller.reader.offset();
        let outcome = match poller.reader.poll().await {
            Ok(outcome) => outcome,
            Err(e) => {
                metrics::record_poll("error", 0, started.elapsed());
                return Err(PollError::Source(e));
            }
        };
        let bytes_read = poller.reader.offset().saturating_sub(offset_before);
        self.finish_poll(ctx, poller, outcome, bytes_read, started).await
    }

    /// Act on what one read returned, unless the session was stopped while
    /// the read was in flight. Holds the poller until done.
    async fn finish_poll(
        &self,
        ctx: &Arc<SyncContext>,
        poller: OwnedMutexGuard<Poller>,
        outcome: PollOutcome,
        bytes_read: u64,
        started: Instant,
    ) -> Result<(), PollError> {
        if self.cancel.is_cancelled() {
            tracing::debug!(path = %self.path.display(), "Session stopped during poll; discarding result");
            return Err(PollError::Ended);
        }

        let label = match &outcome {
            PollOutcome::Idle => "idle",
            PollOutcome::Text(_) => "text",
            PollOutcome::Reset => "reset",
            PollOutcome::Malformed => "malformed",
        };

        let _poller = match outcome {
            PollOutcome::Text(text) if !text.is_empty() => {
                let ctx = ctx.clone();
                let mut poller = poller;
                let joined = tokio::task::spawn_blocking(move || {
                    ctx.ingest(&mut poller.engine, &text);
                    poller
                })
                .await;
                match joined {
                    Ok(poller) => Some(poller),
                    Err(e) => {
                        tracing::error!(path = %self.path.display(), error = %e, "Ingest task panicked");
                        None
                    }
                }
            }
            _ => Some(poller),
        };

        metrics::record_poll(label, bytes_read, started.elapsed());
        ctx.broadcaster.mark_polled();
        Ok(())
    }

    /// End the session. Returns `false` if it had already ended.
    async fn end(&self, ctx: &SyncContext, reason: EndReason) -> bool {
        if self.ended.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.cancel.cancel();
        // Wait out an in-flight poll so no event follows `SourceEnded`.
        let _poller = self.poller.lock().await;
        ctx.broadcaster.on_source_ended(reason);
        metrics::set_sync_active(false);
        tracing::info!(path = %self.path.display(), reason = ?reason, "Sync session ended");
        true
    }
}

async fn run_poll_loop(session: Arc<Session>, ctx: Arc<SyncContext>, period: Duration) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = session.cancel.cancelled() => break,
            _ = ticker.tick() => match session.poll_once(&ctx).await {
                Ok(()) | Err(PollError::Busy) => {}
                Err(PollError::Ended) => break,
                Err(PollError::Source(e)) => {
                    tracing::warn!(error = %e, "Log file unavailable; ending sync session");
                    session.end(&ctx, EndReason::SourceUnavailable).await;
                    break;
                }
            },
        }
    }
}

struct SessionHandle {
    session: Arc<Session>,
    task: JoinHandle<()>,
}

/// Owns the (at most one) active session plus the checklist and progress
/// store it writes to.
pub struct SyncManager {
    config: SyncConfig,
    ctx: Arc<SyncContext>,
    slot: tokio::sync::Mutex<Option<SessionHandle>>,
}

impl SyncManager {
    pub fn new(config: SyncConfig, checklist: Arc<Checklist>, progress: JsonProgressStore) -> Self {
        Self {
            config,
            ctx: Arc::new(SyncContext {
                checklist,
                progress: Mutex::new(progress),
                broadcaster: SyncBroadcaster::new(),
            }),
            slot: tokio::sync::Mutex::new(None),
        }
    }

    pub fn checklist(&self) -> &Checklist {
        &self.ctx.checklist
    }

    /// Lock the progress store for a manual edit. Do not hold across `.await`.
    pub fn progress(&self) -> MutexGuard<'_, JsonProgressStore> {
        self.ctx.lock_progress()
    }

    pub fn broadcaster(&self) -> &SyncBroadcaster {
        &self.ctx.broadcaster
    }

    pub fn status(&self) -> SyncStatus {
        self.ctx.broadcaster.status()
    }

    /// Start syncing `path`, replacing any active session.
    ///
    /// The new file is opened before the old session is stopped, so a bad
    /// path leaves the current session running.
    pub async fn attach(&self, path: &Path) -> ApiResult<SyncStatus> {
        let (reader, bootstrap) = TailReader::attach(path, self.config.tail_window).await?;

        let mut slot = self.slot.lock().await;
        if let Some(old) = slot.take() {
            Self::shut_down(old, &self.ctx).await;
        }

        self.ctx.broadcaster.set_attached(&path.display().to_string());
        metrics::set_sync_active(true);

        let ctx = self.ctx.clone();
        let joined = tokio::task::spawn_blocking(move || {
            let mut engine = SyncEngine::new();
            let report = ctx.ingest(&mut engine, &bootstrap);
            (engine, report)
        })
        .await;
        let engine = match joined {
            Ok((engine, report)) => {
                tracing::info!(
                    path = %path.display(),
                    events = report.events.len(),
                    reached = ?report.reached.map(|s| s.to_string()),
                    "Bootstrapped from log tail"
                );
                engine
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Bootstrap task panicked; starting from an empty position");
                SyncEngine::new()
            }
        };

        let session = Arc::new(Session {
            path: path.to_path_buf(),
            cancel: CancellationToken::new(),
            ended: AtomicBool::new(false),
            poller: Arc::new(tokio::sync::Mutex::new(Poller { reader, engine })),
        });
        let task = tokio::spawn(run_poll_loop(
            session.clone(),
            self.ctx.clone(),
            self.config.poll_interval,
        ));
        *slot = Some(SessionHandle { session, task });

        Ok(self.status())
    }

    /// Stop syncing. `NotSyncing` if no session is active.
    pub async fn stop(&self) -> ApiResult<()> {
        let mut slot = self.slot.lock().await;
        let Some(handle) = slot.take() else {
            return Err(ApiError::NotSyncing);
        };
        if Self::shut_down(handle, &self.ctx).await {
            Ok(())
        } else {
            Err(ApiError::NotSyncing)
        }
    }

    /// Poll the active session now instead of waiting for the timer.
    pub async fn poll_now(&self) -> ApiResult<SyncStatus> {
        let session = {
            let slot = self.slot.lock().await;
            match slot.as_ref() {
                Some(handle) if handle.session.is_live() => handle.session.clone(),
                _ => return Err(ApiError::NotSyncing),
            }
        };

        match session.poll_once(&self.ctx).await {
            Ok(()) => Ok(self.status()),
            Err(PollError::Source(e)) => {
                tracing::warn!(error = %e, "Log file unavailable; ending sync session");
                session.end(&self.ctx, EndReason::SourceUnavailable).await;
                Err(ApiError::Tail(e))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn is_syncing(&self) -> bool {
        self.slot
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| handle.session.is_live())
    }

    /// Stop any session on server shutdown.
    pub async fn shutdown(&self) {
        if let Some(handle) = self.slot.lock().await.take() {
            Self::shut_down(handle, &self.ctx).await;
        }
    }

    async fn shut_down(handle: SessionHandle, ctx: &SyncContext) -> bool {
        let ended = handle.session.end(ctx, EndReason::Stopped).await;
        if let Err(e) = handle.task.await {
            tracing::warn!(error = %e, "Poll task did not exit cleanly");
        }
        ended
    }
}
