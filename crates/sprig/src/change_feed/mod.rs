//
// change_feed/mod.rs
//
// Push-based notifications about compiled artifacts on disk
//
// Listeners subscribe to a path prefix and receive every event whose file
// lies under it, plus deletions of the prefix's ancestors. `FileObserver`
// fans events out synchronously on the calling thread, so events published
// from one thread reach a listener in order.
//

pub mod dispatcher;
pub mod watcher;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use tower_lsp::lsp_types::Url;

pub use dispatcher::ChangeDispatcher;
pub use watcher::FsWatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Deleted,
    Changed,
}

/// One file-system change, consumed once by each interested listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub uri: Url,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, uri: Url) -> Self {
        Self { kind, uri }
    }

    /// Build an event from a filesystem path. Returns `None` for relative paths.
    pub fn for_path(kind: ChangeKind, path: &Path) -> Option<Self> {
        Url::from_file_path(path).ok().map(|uri| Self { kind, uri })
    }

    /// Filesystem path of the event, if the URI is a `file:` URI.
    pub fn path(&self) -> Option<PathBuf> {
        self.uri.to_file_path().ok()
    }
}

/// Receiver of change events for one subscribed prefix.
pub trait ChangeListener: Send + Sync {
    fn on_change(&self, event: &ChangeEvent);
}

/// Source of change events.
pub trait ChangeFeed: Send + Sync {
    /// Deliver events for files under `prefix` to `listener` until the
    /// returned subscription is dropped.
    fn subscribe(&self, prefix: &Path, listener: Arc<dyn ChangeListener>) -> Subscription;
}

/// Handle for an active subscription. Dropping it unsubscribes.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

struct Registration {
    id: u64,
    prefix: PathBuf,
    listener: Arc<dyn ChangeListener>,
}

#[derive(Default)]
struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: RwLock<Vec<Registration>>,
}

impl ListenerRegistry {
    fn remove(&self, id: u64) {
        if let Ok(mut guard) = self.listeners.write() {
            guard.retain(|registration| registration.id != id);
        }
    }
}

/// In-process change feed. Producers (LSP notifications, the filesystem
/// watcher, tests) call `notify_*`; subscribers are invoked synchronously.
#[derive(Clone, Default)]
pub struct FileObserver {
    registry: Arc<ListenerRegistry>,
}

impl FileObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notify_file_created(&self, uri: &Url) {
        self.notify(&ChangeEvent::new(ChangeKind::Created, uri.clone()));
    }

    pub fn notify_file_deleted(&self, uri: &Url) {
        self.notify(&ChangeEvent::new(ChangeKind::Deleted, uri.clone()));
    }

    pub fn notify_file_changed(&self, uri: &Url) {
        self.notify(&ChangeEvent::new(ChangeKind::Changed, uri.clone()));
    }

    /// Deliver `event` to every listener whose prefix contains the event path,
    /// and deletions to listeners whose prefix lies under the deleted path.
    pub fn notify(&self, event: &ChangeEvent) {
        let Some(path) = event.path() else {
            log::trace!("Ignoring change event for non-file URI: {}", event.uri);
            return;
        };

        // Collect first so listeners run without the registry lock held
        let targets: Vec<Arc<dyn ChangeListener>> = match self.registry.listeners.read() {
            Ok(guard) => guard
                .iter()
                .filter(|registration| {
                    path.starts_with(&registration.prefix)
                        || (event.kind == ChangeKind::Deleted
                            && registration.prefix.starts_with(&path))
                })
                .map(|registration| registration.listener.clone())
                .collect(),
            Err(_) => return,
        };

        log::trace!(
            "{:?} {} -> {} listener(s)",
            event.kind,
            event.uri,
            targets.len()
        );
        for listener in targets {
            listener.on_change(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry
            .listeners
            .read()
            .map(|guard| guard.len())
            .unwrap_or(0)
    }
}

impl ChangeFeed for FileObserver {
    fn subscribe(&self, prefix: &Path, listener: Arc<dyn ChangeListener>) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.registry.listeners.write() {
            guard.push(Registration {
                id,
                prefix: prefix.to_path_buf(),
                listener,
            });
        }
        log::trace!("Subscribed listener {} to {}", id, prefix.display());

        let registry: Weak<ListenerRegistry> = Arc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.remove(id);
            }
        })
    }
}
