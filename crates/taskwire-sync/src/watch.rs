use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use taskwire_core::backend::TaskBackend;
use taskwire_core::input::local_today;
use taskwire_core::sync::{EventGate, SyncEngine, SETTLE_DELAY};

/// Content writes to the watched file. Metadata, create and remove events
/// are ignored, as are events for sibling files in the directory.
pub fn is_content_change(event: &Event, file_name: &OsStr) -> bool {
    let modified = matches!(
        event.kind,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any)
    );
    modified
        && event
            .paths
            .iter()
            .any(|path| path.file_name() == Some(file_name))
}

/// What the loop did with one event; used for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ignored,
    Debounced,
    Pushed,
    PollSkipped,
    Refreshed,
    UpToDate,
    Failed,
}

/// Event handlers of the sync loop. Handlers run to completion one at a time.
pub struct SyncLoop<B> {
    engine: SyncEngine<B>,
    gate: EventGate,
    file_name: OsString,
    settle: Duration,
}

impl<B: TaskBackend> SyncLoop<B> {
    pub fn new(engine: SyncEngine<B>, poll_interval: Duration) -> Result<Self> {
        let file_name = engine
            .path()
            .file_name()
            .ok_or_else(|| anyhow!("{} has no file name", engine.path().display()))?
            .to_os_string();
        Ok(Self {
            engine,
            gate: EventGate::new(poll_interval),
            file_name,
            settle: SETTLE_DELAY,
        })
    }

    pub fn with_settle_delay(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn engine(&self) -> &SyncEngine<B> {
        &self.engine
    }

    pub async fn startup(&self) {
        match self.engine.export(local_today()).await {
            Ok(count) => info!(count, "initial export done"),
            Err(err) => warn!(error = %err, "initial export failed"),
        }
    }

    pub async fn on_file_event(&mut self, event: &Event, now: Instant) -> Outcome {
        if !is_content_change(event, &self.file_name) {
            return Outcome::Ignored;
        }
        if !self.gate.admit_local_edit(now) {
            debug!("edit inside debounce window");
            return Outcome::Debounced;
        }
        info!("document changed, syncing");
        tokio::time::sleep(self.settle).await;
        match self.engine.sync_local_edits(local_today()).await {
            Ok(report) => {
                info!(
                    parsed = report.parsed,
                    updated = report.updated,
                    missing = report.missing,
                    failed = report.failed,
                    "local edits pushed"
                );
                Outcome::Pushed
            }
            Err(err) => {
                warn!(error = %err, "sync from document failed");
                Outcome::Failed
            }
        }
    }

    pub async fn on_tick(&mut self, now: Instant) -> Outcome {
        if !self.gate.admit_poll(now) {
            debug!("recent local edit; skipping poll");
            return Outcome::PollSkipped;
        }
        match self.engine.refresh_if_drifted(local_today()).await {
            Ok(Some(count)) => {
                self.gate.record_poll(now);
                info!(count, "document refreshed from backend");
                Outcome::Refreshed
            }
            Ok(None) => {
                self.gate.record_poll(now);
                Outcome::UpToDate
            }
            Err(err) => {
                warn!(error = %err, "poll failed");
                Outcome::Failed
            }
        }
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Directory to watch, created up front so the watcher can start even when
/// the first export fails.
fn prepare_watch_dir(path: &Path) -> Result<PathBuf> {
    let dir = watch_dir(path);
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    Ok(dir)
}

/// Export once, then serve watcher events and poll ticks until ctrl-c.
pub async fn run<B: TaskBackend>(engine: SyncEngine<B>, poll_interval: Duration) -> Result<()> {
    let dir = prepare_watch_dir(engine.path())?;
    let mut sync = SyncLoop::new(engine, poll_interval)?;
    sync.startup().await;

    let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = tx.send(res);
    })
    .context("failed to create file watcher")?;
    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", dir.display()))?;
    info!(
        path = %sync.engine().path().display(),
        poll_secs = poll_interval.as_secs(),
        "watching document"
    );

    let first_tick = tokio::time::Instant::now() + poll_interval;
    let mut ticker = tokio::time::interval_at(first_tick, poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            Some(res) = rx.recv() => match res {
                Ok(event) => {
                    sync.on_file_event(&event, Instant::now()).await;
                }
                Err(err) => warn!(error = %err, "watcher error"),
            },
            _ = ticker.tick() => {
                sync.on_tick(Instant::now()).await;
            }
            _ = &mut shutdown => {
                info!("stopping sync");
                break;
            }
        }
    }
    Ok(())
}
