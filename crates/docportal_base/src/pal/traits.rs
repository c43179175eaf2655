use std::any::Any;
use std::io::{Read, Seek, Write};
use std::sync::{Arc, Mutex};

use crate::PortalResult;

use super::file_path::FilePath;
use super::http::{HttpServerConfig, HttpServerHandle, HttpService};

/* 📖 # What is the Platform Abstraction Layer (PAL)?

Every byte the portal reads (markdown under `_docs`, message catalogs, public
assets) and every request it answers goes through the `Pal` trait. Engine code
never touches `std::fs` or a socket directly, so each module can be tested
against MockPal with a handful of in-memory files.
*/

/// Trait combining Read + Seek for file operations.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DirEntry {
    /// Full path of the entry, relative to the PAL base directory.
    pub path: FilePath,
    /// Final path component.
    pub name: String,
    /// True for directories.
    pub is_dir: bool,
}

/// File change event delivered to watch callbacks.
#[derive(Debug, Clone)]
pub struct FileChangeEvent {
    /// Paths that changed, relative to the PAL base directory.
    pub changed_files: Vec<FilePath>,
}

/// Callback invoked when watched files change.
pub type FileChangeCallback = Box<dyn Fn(FileChangeEvent) + Send + Sync>;

/// Keeps a directory watch alive. The watch stops when the handle is dropped.
///
/// The guard is never touched again, the mutex only makes the handle `Sync`
/// for watchers that are merely `Send`.
pub struct WatchHandle {
    _guard: Option<Mutex<Box<dyn Any + Send>>>,
}

impl WatchHandle {
    /// Wrap whatever object keeps the underlying watcher running.
    pub fn new(guard: impl Any + Send) -> Self {
        Self {
            _guard: Some(Mutex::new(Box::new(guard))),
        }
    }

    /// A handle for implementations without background resources.
    pub fn detached() -> Self {
        Self { _guard: None }
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("active", &self._guard.is_some())
            .finish()
    }
}

/// Platform Abstraction Layer (PAL) trait providing filesystem and HTTP access.
///
/// Two implementations are provided:
/// - `RealPal`: the real filesystem and a tiny_http server
/// - `MockPal`: in-memory implementation for testing
pub trait Pal: std::fmt::Debug + Send + Sync + 'static {
    /// Check if a file or directory exists at the given path.
    fn file_exists(&self, path: &FilePath) -> PortalResult<bool>;

    /// Open a file for reading.
    fn read_file(&self, path: &FilePath) -> PortalResult<Box<dyn ReadSeek + 'static>>;

    /// Read entire file contents as a UTF-8 string.
    fn read_file_to_string(&self, path: &FilePath) -> PortalResult<String> {
        let mut reader = self.read_file(path)?;
        let mut contents = Vec::new();
        reader
            .read_to_end(&mut contents)
            .map_err(|e| Box::new(crate::PortalError::file(path.as_path(), e)))?;
        String::from_utf8(contents).map_err(|_e| crate::err!("File is not valid UTF-8: {}", path))
    }

    /// List the immediate children of a directory, sorted by name.
    ///
    /// Fails if the directory does not exist or cannot be read.
    fn list_directory(&self, path: &FilePath) -> PortalResult<Vec<DirEntry>>;

    /// Create a new file, overwriting if it exists.
    fn create_file(&self, path: &FilePath) -> PortalResult<Box<dyn Write>>;

    /// Create a directory and all parent directories.
    fn create_directory_all(&self, path: &FilePath) -> PortalResult<()>;

    /// Remove a directory and all its contents.
    fn remove_directory_all(&self, path: &FilePath) -> PortalResult<()>;

    /// Watch a directory recursively for changes to files matching `globs`.
    ///
    /// Globs are matched against paths relative to `directory`. The callback
    /// runs on a background thread; the watch lasts as long as the returned
    /// handle.
    fn watch_directory(
        &self,
        directory: &FilePath,
        globs: &[String],
        callback: FileChangeCallback,
    ) -> PortalResult<WatchHandle>;

    /// Start an HTTP server with the given service.
    ///
    /// The server listens immediately. Dropping the handle (or calling
    /// `shutdown()`) stops the accept loop.
    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> PortalResult<HttpServerHandle>;
}

/* 📖 # Why use Arc<dyn Pal> with PalHandle?

The page service, the document snapshot and the watch callback all need the
same PAL from different threads. Arc makes the handle cheap to clone and
Deref keeps call sites as short as with a plain reference.
*/

/// Handle to a PAL implementation, enabling shared ownership.
///
/// # Examples
///
/// ```no_run
/// use docportal_base::{PalHandle, RealPal};
///
/// let pal = PalHandle::new(RealPal::new("example-site".into()));
/// let pal_clone = pal.clone();
/// ```
#[derive(Debug, Clone)]
pub struct PalHandle(Arc<dyn Pal>);

impl PalHandle {
    /// Create a new PalHandle from a Pal implementation.
    pub fn new(pal: impl Pal + 'static) -> Self {
        Self(Arc::new(pal))
    }
}

impl std::ops::Deref for PalHandle {
    type Target = dyn Pal;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}
