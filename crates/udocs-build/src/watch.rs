//! Rebuild-on-change for a local docs directory.
//!
//! [`watch_markdown`] reports Markdown changes as [`WatchEvent`]s on a channel.
//! [`supervise`] consumes them on the caller's thread, running a rebuild per
//! change until the watcher fails or a rebuild errors.

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::BuildError;

/// Error reported by the file watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("File watcher failed: {0}")]
    Notify(#[from] notify::Error),
}

/// A change notification.
#[derive(Debug)]
pub enum WatchEvent {
    /// A Markdown file changed.
    Rebuild(PathBuf),
    /// The watcher failed and will report nothing further.
    Failed(WatchError),
}

/// Receiver for watch events.
pub struct WatchEventReceiver {
    rx: mpsc::Receiver<WatchEvent>,
}

impl WatchEventReceiver {
    pub(crate) fn new(rx: mpsc::Receiver<WatchEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next event (blocking).
    ///
    /// Rebuild requests already queued behind the first one are folded into it,
    /// since editors emit several events per save. A queued failure takes
    /// precedence. Returns `None` when the watcher is gone.
    #[must_use]
    pub fn recv(&self) -> Option<WatchEvent> {
        let first = self.rx.recv().ok()?;
        if matches!(first, WatchEvent::Failed(_)) {
            return Some(first);
        }
        while let Ok(next) = self.rx.try_recv() {
            if matches!(next, WatchEvent::Failed(_)) {
                return Some(next);
            }
        }
        Some(first)
    }
}

/// Handle keeping the watcher alive. Dropping it stops watching.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
}

impl WatchHandle {
    /// Stop watching immediately.
    pub fn stop(self) {}
}

/// Markdown path touched by a filesystem event, if the event warrants a rebuild.
///
/// Reads and metadata-only changes (permissions, timestamps) are ignored.
fn markdown_change(event: &notify::Event) -> Option<&PathBuf> {
    if matches!(
        event.kind,
        EventKind::Access(_) | EventKind::Modify(ModifyKind::Metadata(_))
    ) {
        return None;
    }
    event
        .paths
        .iter()
        .find(|path| path.as_os_str().to_string_lossy().ends_with(".md"))
}

/// Watch `dir` recursively for Markdown changes.
pub fn watch_markdown(dir: &Path) -> Result<(WatchEventReceiver, WatchHandle), WatchError> {
    let (tx, rx) = mpsc::channel();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        let event = match res {
            Ok(event) => match markdown_change(&event) {
                Some(path) => WatchEvent::Rebuild(path.clone()),
                None => return,
            },
            Err(e) => WatchEvent::Failed(WatchError::Notify(e)),
        };
        if tx.send(event).is_err() {
            tracing::debug!("Watch receiver dropped, discarding event");
        }
    })?;
    watcher.watch(dir, RecursiveMode::Recursive)?;

    tracing::info!(dir = %dir.display(), "Watching for Markdown changes");
    Ok((
        WatchEventReceiver::new(rx),
        WatchHandle { _watcher: watcher },
    ))
}

/// Run `rebuild` for every change until the event stream ends.
///
/// Returns the first rebuild error or watcher failure. Returns `Ok(())` once
/// the watcher is dropped.
pub fn supervise(
    events: &WatchEventReceiver,
    mut rebuild: impl FnMut(&Path) -> Result<(), BuildError>,
) -> Result<(), BuildError> {
    while let Some(event) = events.recv() {
        match event {
            WatchEvent::Rebuild(path) => {
                tracing::info!(path = %path.display(), "File modified, rebuilding");
                rebuild(&path)?;
            }
            WatchEvent::Failed(e) => return Err(e.into()),
        }
    }
    Ok(())
}
