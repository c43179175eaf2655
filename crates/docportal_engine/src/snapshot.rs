/* 📖 # Why reload lazily after a change instead of inside the watcher callback?

Editors save in bursts (temp file, rename, metadata update) and every step can
produce an event. The watcher callback only marks the snapshot dirty; the next
request that needs the listing reloads it once. Bursts collapse into a single
reload, and the reload runs on a request thread where its error can be reported
instead of on the watcher thread where it would be lost.

If a reload fails, the previous listing keeps being served and the snapshot
stays dirty, so the next request tries again.
*/

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use docportal_base::pal::{FileChangeEvent, WatchHandle};
use docportal_base::{FilePath, PalHandle, PortalResult, ResultExt};

use crate::config::RefreshPolicy;
use crate::document::Document;
use crate::loader::load_documents;

/// Files whose changes trigger a reload, relative to the docs directory.
pub const WATCH_GLOBS: &[&str] = &["**/*.md"];

type ChangeListener = Box<dyn Fn() + Send + Sync>;

struct ChangeState {
    dirty: AtomicBool,
    listeners: Mutex<Vec<ChangeListener>>,
}

impl ChangeState {
    fn notify(&self, event: &FileChangeEvent) {
        debug!(changed = event.changed_files.len(), "docs changed, marking snapshot dirty");
        self.dirty.store(true, Ordering::Release);
        for listener in self.listeners.lock().iter() {
            listener();
        }
    }
}

/// The document listing, kept current according to a [`RefreshPolicy`].
pub struct DocumentSnapshot {
    pal: PalHandle,
    docs_dir: FilePath,
    policy: RefreshPolicy,
    current: Mutex<Option<Arc<Vec<Document>>>>,
    changes: Arc<ChangeState>,
    _watch: Option<WatchHandle>,
}

impl std::fmt::Debug for DocumentSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSnapshot")
            .field("docs_dir", &self.docs_dir)
            .field("policy", &self.policy)
            .field("dirty", &self.changes.dirty.load(Ordering::Acquire))
            .finish()
    }
}

impl DocumentSnapshot {
    /// Create a snapshot. In watch mode the docs directory is loaded and
    /// watched right away, so startup fails if it is missing.
    pub fn new(pal: PalHandle, docs_dir: FilePath, policy: RefreshPolicy) -> PortalResult<Self> {
        let changes = Arc::new(ChangeState {
            dirty: AtomicBool::new(false),
            listeners: Mutex::new(Vec::new()),
        });
        let mut snapshot = Self {
            pal,
            docs_dir,
            policy,
            current: Mutex::new(None),
            changes,
            _watch: None,
        };
        if policy == RefreshPolicy::Watch {
            let documents = load_documents(&snapshot.pal, &snapshot.docs_dir)?;
            info!(
                count = documents.len(),
                docs_dir = %snapshot.docs_dir,
                "watching docs for changes"
            );
            *snapshot.current.lock() = Some(Arc::new(documents));

            let globs: Vec<String> = WATCH_GLOBS.iter().map(|glob| glob.to_string()).collect();
            let changes = snapshot.changes.clone();
            let handle = snapshot
                .pal
                .watch_directory(
                    &snapshot.docs_dir,
                    &globs,
                    Box::new(move |event: FileChangeEvent| changes.notify(&event)),
                )
                .with_context(|| format!("Failed to watch {}", snapshot.docs_dir))?;
            snapshot._watch = Some(handle);
        }
        Ok(snapshot)
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    pub fn docs_dir(&self) -> &FilePath {
        &self.docs_dir
    }

    /// Register a callback run (on the watcher thread) whenever the docs change.
    pub fn on_change(&self, listener: impl Fn() + Send + Sync + 'static) {
        self.changes.listeners.lock().push(Box::new(listener));
    }

    /// The current document listing.
    ///
    /// `per_request` walks the docs directory on every call; `watch` returns the
    /// loaded listing, reloading it first if a change was reported.
    pub fn documents(&self) -> PortalResult<Arc<Vec<Document>>> {
        match self.policy {
            RefreshPolicy::PerRequest => Ok(Arc::new(load_documents(&self.pal, &self.docs_dir)?)),
            RefreshPolicy::Watch => self.watched_documents(),
        }
    }

    fn watched_documents(&self) -> PortalResult<Arc<Vec<Document>>> {
        let mut current = self.current.lock();
        let dirty = self.changes.dirty.swap(false, Ordering::AcqRel);
        if let (Some(documents), false) = (&*current, dirty) {
            return Ok(documents.clone());
        }
        match load_documents(&self.pal, &self.docs_dir) {
            Ok(documents) => {
                info!(count = documents.len(), "reloaded documents");
                let documents = Arc::new(documents);
                *current = Some(documents.clone());
                Ok(documents)
            }
            Err(e) => {
                self.changes.dirty.store(true, Ordering::Release);
                match &*current {
                    Some(previous) => {
                        warn!(error = %e, "reloading documents failed, serving previous listing");
                        Ok(previous.clone())
                    }
                    None => Err(e),
                }
            }
        }
    }
}
