//! Watching a source file so its spans can be re-detected after edits.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Coalescing window applied after the first change event.
const SETTLE: Duration = Duration::from_millis(50);

/// Reports modifications of one file.
///
/// The parent directory is watched rather than the file itself, so editors that save by
/// replacing the file keep being tracked.
pub struct SourceWatcher {
    path: PathBuf,
    events: Receiver<()>,
    _watcher: RecommendedWatcher,
}

impl std::fmt::Debug for SourceWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceWatcher")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SourceWatcher {
    pub fn new(path: &Path) -> Result<Self> {
        let path = path
            .canonicalize()
            .with_context(|| format!("failed to resolve {}", path.display()))?;
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .with_context(|| format!("{} has no parent directory", path.display()))?;

        let (tx, rx) = mpsc::channel();
        let target = path.clone();
        let mut watcher = RecommendedWatcher::new(
            move |result: notify::Result<Event>| match result {
                Ok(event) if is_change_to(&event, &target) => {
                    let _ = tx.send(());
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(error = %err, "file watch error"),
            },
            NotifyConfig::default(),
        )
        .context("failed to create file watcher")?;
        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", parent.display()))?;

        tracing::debug!(path = %path.display(), "watching source");
        Ok(Self {
            path,
            events: rx,
            _watcher: watcher,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drain pending events without blocking. Returns `true` if the file changed.
    pub fn poll_changed(&self) -> bool {
        let mut changed = false;
        while self.events.try_recv().is_ok() {
            changed = true;
        }
        changed
    }

    /// Block until the file changes or `timeout` elapses. Bursts of events are coalesced.
    pub fn wait_changed(&self, timeout: Duration) -> Result<bool> {
        match self.events.recv_timeout(timeout) {
            Ok(()) => {
                std::thread::sleep(SETTLE);
                self.poll_changed();
                Ok(true)
            }
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => {
                anyhow::bail!("file watcher for {} stopped", self.path.display())
            }
        }
    }
}

fn is_change_to(event: &Event, target: &Path) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Any
    ) && event.paths.iter().any(|path| path == target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use tempfile::tempdir;

    #[test]
    fn only_changes_to_the_target_count() {
        let target = Path::new("/tmp/project/app.py");
        let modify = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(target.to_path_buf());
        let create = Event::new(EventKind::Create(CreateKind::File)).add_path(target.to_path_buf());
        let other = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/tmp/project/other.py"));
        let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path(target.to_path_buf());

        assert!(is_change_to(&modify, target));
        assert!(is_change_to(&create, target));
        assert!(!is_change_to(&other, target));
        assert!(!is_change_to(&removed, target));
    }

    #[test]
    fn missing_file_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        assert!(SourceWatcher::new(&dir.path().join("missing.py")).is_err());
        Ok(())
    }

    #[test]
    fn new_watcher_reports_no_changes() -> Result<()> {
        let dir = tempdir()?;
        let file = dir.path().join("app.py");
        std::fs::write(&file, "def a():\n    pass\n")?;

        let watcher = SourceWatcher::new(&file)?;
        assert_eq!(watcher.path(), file.canonicalize()?);
        assert!(!watcher.poll_changed());
        Ok(())
    }
}
