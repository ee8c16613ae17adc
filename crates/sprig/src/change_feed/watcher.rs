//
// change_feed/watcher.rs
//
// Filesystem watcher used when the client cannot watch files for us
//

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::dispatcher::ChangeSender;
use super::{ChangeEvent, ChangeKind};
use crate::classpath::is_archive_path;

#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    #[error("failed to create watcher: {0}")]
    Create(#[source] notify::Error),
    #[error("failed to watch {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Watches classpath roots and forwards artifact changes to a dispatcher.
pub struct FsWatcher {
    watched: Vec<PathBuf>,
    // Dropping the watcher stops event delivery
    watcher: RecommendedWatcher,
}

impl FsWatcher {
    pub fn new(sender: ChangeSender) -> Result<Self, WatcherError> {
        let watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    let batch = convert_event(event);
                    if !batch.is_empty() {
                        // Receiver gone means the server is shutting down
                        let _ = sender.send(batch);
                    }
                }
                Err(e) => log::warn!("File watcher error: {}", e),
            }
        })
        .map_err(WatcherError::Create)?;

        Ok(Self {
            watched: Vec::new(),
            watcher,
        })
    }

    /// Watch `path` recursively. Archives are watched directly; missing
    /// paths are watched through their nearest existing ancestor.
    pub fn watch(&mut self, path: &Path) -> Result<(), WatcherError> {
        if self.watched.iter().any(|w| path.starts_with(w)) {
            return Ok(());
        }
        let target = nearest_existing(path).unwrap_or_else(|| path.to_path_buf());
        self.watcher
            .watch(&target, RecursiveMode::Recursive)
            .map_err(|source| WatcherError::Watch {
                path: target.clone(),
                source,
            })?;
        log::info!("Watching {} for classpath changes", target.display());
        self.watched.push(target);
        Ok(())
    }

    pub fn watched_paths(&self) -> &[PathBuf] {
        &self.watched
    }
}

fn nearest_existing(path: &Path) -> Option<PathBuf> {
    path.ancestors().find(|p| p.exists()).map(Path::to_path_buf)
}

/// Class files and archives are relevant on create/modify; any removal may
/// be a directory so all removals are forwarded.
fn is_artifact(path: &Path) -> bool {
    is_archive_path(path) || path.extension().is_some_and(|ext| ext == "class")
}

fn convert_event(event: Event) -> Vec<ChangeEvent> {
    let mut batch = Vec::new();
    let mut push = |kind: ChangeKind, path: &Path| {
        if let Some(change) = ChangeEvent::for_path(kind, path) {
            batch.push(change);
        }
    };

    match event.kind {
        EventKind::Create(_) => {
            for path in &event.paths {
                if is_artifact(path) || path.is_dir() {
                    push(ChangeKind::Created, path);
                }
            }
        }
        EventKind::Remove(_) => {
            for path in &event.paths {
                push(ChangeKind::Deleted, path);
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            for path in &event.paths {
                push(ChangeKind::Deleted, path);
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            for path in &event.paths {
                if is_artifact(path) || path.is_dir() {
                    push(ChangeKind::Created, path);
                }
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            if let [from, to] = event.paths.as_slice() {
                push(ChangeKind::Deleted, from);
                if is_artifact(to) || to.is_dir() {
                    push(ChangeKind::Created, to);
                }
            }
        }
        EventKind::Modify(_) => {
            for path in &event.paths {
                if is_artifact(path) {
                    push(ChangeKind::Changed, path);
                }
            }
        }
        _ => {}
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};
    use tempfile::TempDir;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    fn kinds(batch: &[ChangeEvent]) -> Vec<(ChangeKind, PathBuf)> {
        batch
            .iter()
            .map(|e| (e.kind, e.path().unwrap()))
            .collect()
    }

    #[test]
    fn test_create_and_modify_filter_artifacts() {
        let batch = convert_event(event(
            EventKind::Create(CreateKind::File),
            &["/out/a/A.class", "/out/a/A.java", "/lib/x.jar"],
        ));
        assert_eq!(
            kinds(&batch),
            vec![
                (ChangeKind::Created, PathBuf::from("/out/a/A.class")),
                (ChangeKind::Created, PathBuf::from("/lib/x.jar")),
            ]
        );

        let batch = convert_event(event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["/out/a/A.class", "/out/notes.txt"],
        ));
        assert_eq!(
            kinds(&batch),
            vec![(ChangeKind::Changed, PathBuf::from("/out/a/A.class"))]
        );
    }

    #[test]
    fn test_removals_always_forwarded() {
        let batch = convert_event(event(
            EventKind::Remove(RemoveKind::Any),
            &["/out/a", "/out/b/B.class"],
        ));
        assert_eq!(
            kinds(&batch),
            vec![
                (ChangeKind::Deleted, PathBuf::from("/out/a")),
                (ChangeKind::Deleted, PathBuf::from("/out/b/B.class")),
            ]
        );
    }

    #[test]
    fn test_rename_becomes_delete_then_create() {
        let batch = convert_event(event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/out/A.class.tmp", "/out/A.class"],
        ));
        assert_eq!(
            kinds(&batch),
            vec![
                (ChangeKind::Deleted, PathBuf::from("/out/A.class.tmp")),
                (ChangeKind::Created, PathBuf::from("/out/A.class")),
            ]
        );
    }

    #[test]
    fn test_access_events_ignored() {
        let batch = convert_event(event(
            EventKind::Access(notify::event::AccessKind::Any),
            &["/out/A.class"],
        ));
        assert!(batch.is_empty());
    }

    #[test]
    fn test_watch_missing_path_uses_existing_ancestor() {
        let dir = TempDir::new().unwrap();
        let (sender, _receiver) = tokio::sync::mpsc::unbounded_channel();
        let mut watcher = FsWatcher::new(sender).unwrap();

        let missing = dir.path().join("target").join("classes");
        watcher.watch(&missing).unwrap();
        assert_eq!(watcher.watched_paths(), &[dir.path().to_path_buf()]);

        // Already covered
        watcher.watch(&dir.path().join("lib")).unwrap();
        assert_eq!(watcher.watched_paths().len(), 1);
    }
}
