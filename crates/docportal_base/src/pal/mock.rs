use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

use globset::GlobSet;

use crate::{PortalError, PortalResult};

use super::FilePath;
use super::http::{HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService};
use super::real_pal::build_glob_set;
use super::traits::{DirEntry, FileChangeCallback, FileChangeEvent, Pal, ReadSeek, WatchHandle};

/* 📖 # Why keep MockPal state in maps behind Arc<Mutex<_>>?

Tests build a site tree with `add_file`, hand a clone of the MockPal to the
code under test and then inspect or mutate the very same state (write a new
markdown file, fire a change event). Clones share the maps, so there is no
need to get the PAL back out of a PalHandle.

Directories are implied by the files below them, matching how the loader sees
a real docs tree. `add_directory` exists for empty directories.
*/

/// In-memory PAL implementation for testing.
///
/// # Examples
///
/// ```
/// use docportal_base::{FilePath, MockPal, Pal};
///
/// let mock = MockPal::new();
/// mock.add_file("_docs/v1/en/intro.md", "# Intro");
/// let entries = mock.list_directory(&FilePath::from("_docs/v1")).unwrap();
/// assert_eq!(entries[0].name, "en");
/// assert!(entries[0].is_dir);
/// ```
#[derive(Debug, Clone)]
pub struct MockPal {
    files: Arc<Mutex<BTreeMap<FilePath, Vec<u8>>>>,
    directories: Arc<Mutex<BTreeSet<FilePath>>>,
    unreadable: Arc<Mutex<HashSet<FilePath>>>,
    watchers: Arc<Mutex<Vec<MockWatch>>>,
    http_servers: Arc<Mutex<HashMap<u16, Box<dyn HttpService>>>>,
    next_port: Arc<AtomicU16>,
}

struct MockWatch {
    directory: FilePath,
    glob_set: GlobSet,
    callback: FileChangeCallback,
}

impl std::fmt::Debug for MockWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockWatch")
            .field("directory", &self.directory)
            .finish()
    }
}

const FIRST_MOCK_PORT: u16 = 10000;

fn not_found(path: &FilePath) -> Box<PortalError> {
    Box::new(PortalError::file(
        path.as_path(),
        std::io::Error::new(std::io::ErrorKind::NotFound, format!("not found: {}", path)),
    ))
}

impl MockPal {
    /// Create a new empty MockPal.
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(BTreeMap::new())),
            directories: Arc::new(Mutex::new(BTreeSet::new())),
            unreadable: Arc::new(Mutex::new(HashSet::new())),
            watchers: Arc::new(Mutex::new(Vec::new())),
            http_servers: Arc::new(Mutex::new(HashMap::new())),
            next_port: Arc::new(AtomicU16::new(FIRST_MOCK_PORT)),
        }
    }

    /// Add (or replace) a file.
    pub fn add_file(&self, path: impl Into<FilePath>, content: impl Into<Vec<u8>>) {
        let path = path.into().normalize();
        self.files.lock().unwrap().insert(path, content.into());
    }

    /// Remove a file, returning true if it existed.
    pub fn remove_file(&self, path: impl Into<FilePath>) -> bool {
        let path = path.into().normalize();
        self.files.lock().unwrap().remove(&path).is_some()
    }

    /// Register an empty directory.
    pub fn add_directory(&self, path: impl Into<FilePath>) {
        let path = path.into().normalize();
        self.directories.lock().unwrap().insert(path);
    }

    /// Make reads of `path` fail with a permission error.
    pub fn add_unreadable(&self, path: impl Into<FilePath>) {
        let path = path.into().normalize();
        self.unreadable.lock().unwrap().insert(path);
    }

    /// Read back a file, e.g. one written through `create_file`.
    pub fn get_file(&self, path: impl Into<FilePath>) -> Option<Vec<u8>> {
        let path = path.into().normalize();
        self.files.lock().unwrap().get(&path).cloned()
    }

    /// All file paths currently stored, sorted.
    pub fn file_paths(&self) -> Vec<FilePath> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    /// Fire the callbacks of every watch whose directory and globs match `path`.
    ///
    /// Returns the number of callbacks invoked.
    pub fn trigger_change(&self, path: impl Into<FilePath>) -> usize {
        let path = path.into().normalize();
        let watchers = self.watchers.lock().unwrap();
        let mut invoked = 0;
        for watch in watchers.iter() {
            let Some(relative) = path.strip_base(&watch.directory) else {
                continue;
            };
            if watch.glob_set.is_match(relative.as_path()) {
                (watch.callback)(FileChangeEvent {
                    changed_files: vec![path.clone()],
                });
                invoked += 1;
            }
        }
        invoked
    }

    /// Simulate an HTTP request to a server started on this MockPal.
    pub fn simulate_request(&self, port: u16, request: HttpRequest) -> PortalResult<HttpResponse> {
        let servers = self.http_servers.lock().unwrap();
        let service = servers
            .get(&port)
            .ok_or_else(|| crate::err!("No HTTP server registered on port {}", port))?;
        service.handle_request(request)
    }

    /// Get the number of registered HTTP servers.
    pub fn http_server_count(&self) -> usize {
        self.http_servers.lock().unwrap().len()
    }

    fn is_directory(&self, path: &FilePath) -> bool {
        if self
            .directories
            .lock()
            .unwrap()
            .iter()
            .any(|dir| path.contains(dir))
        {
            return true;
        }
        let files = self.files.lock().unwrap();
        files
            .keys()
            .any(|file| file != path && path.contains(file))
    }
}

impl Default for MockPal {
    fn default() -> Self {
        Self::new()
    }
}

impl Pal for MockPal {
    fn file_exists(&self, path: &FilePath) -> PortalResult<bool> {
        let path = path.normalize();
        Ok(self.files.lock().unwrap().contains_key(&path) || self.is_directory(&path))
    }

    fn read_file(&self, path: &FilePath) -> PortalResult<Box<dyn ReadSeek + 'static>> {
        let path = path.normalize();
        if self.unreadable.lock().unwrap().contains(&path) {
            return Err(Box::new(PortalError::file(
                path.as_path(),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied"),
            )));
        }
        let content = self
            .files
            .lock()
            .unwrap()
            .get(&path)
            .cloned()
            .ok_or_else(|| not_found(&path))?;
        Ok(Box::new(Cursor::new(content)))
    }

    fn list_directory(&self, path: &FilePath) -> PortalResult<Vec<DirEntry>> {
        let path = path.normalize();
        if self.unreadable.lock().unwrap().contains(&path) {
            return Err(Box::new(PortalError::file(
                path.as_path(),
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "permission denied"),
            )));
        }
        if !self.is_directory(&path) {
            return Err(not_found(&path));
        }

        // name -> is_dir
        let mut children: BTreeMap<String, bool> = BTreeMap::new();
        let files = self.files.lock().unwrap();
        let directories = self.directories.lock().unwrap();
        let candidates = files
            .keys()
            .map(|file| (file, false))
            .chain(directories.iter().map(|dir| (dir, true)));
        for (candidate, is_dir) in candidates {
            let Some(relative) = candidate.strip_base(&path) else {
                continue;
            };
            let relative = relative.to_string();
            let mut parts = relative.split('/').filter(|part| !part.is_empty());
            let Some(first) = parts.next() else {
                continue;
            };
            let nested = parts.next().is_some();
            let entry = children.entry(first.to_string()).or_insert(false);
            *entry |= nested || is_dir;
        }

        Ok(children
            .into_iter()
            .map(|(name, is_dir)| DirEntry {
                path: path.join(&name),
                name,
                is_dir,
            })
            .collect())
    }

    fn create_file(&self, path: &FilePath) -> PortalResult<Box<dyn Write>> {
        Ok(Box::new(MockFileWriter {
            path: path.normalize(),
            files: Arc::clone(&self.files),
            buffer: Vec::new(),
        }))
    }

    fn create_directory_all(&self, path: &FilePath) -> PortalResult<()> {
        self.directories.lock().unwrap().insert(path.normalize());
        Ok(())
    }

    fn remove_directory_all(&self, path: &FilePath) -> PortalResult<()> {
        let path = path.normalize();
        if !self.is_directory(&path) {
            return Err(not_found(&path));
        }
        self.files
            .lock()
            .unwrap()
            .retain(|file, _| !path.contains(file));
        self.directories
            .lock()
            .unwrap()
            .retain(|dir| !path.contains(dir));
        Ok(())
    }

    fn watch_directory(
        &self,
        directory: &FilePath,
        globs: &[String],
        callback: FileChangeCallback,
    ) -> PortalResult<WatchHandle> {
        let directory = directory.normalize();
        if !self.is_directory(&directory) {
            return Err(not_found(&directory));
        }
        let glob_set = build_glob_set(globs)?;
        self.watchers.lock().unwrap().push(MockWatch {
            directory,
            glob_set,
            callback,
        });
        Ok(WatchHandle::detached())
    }

    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> PortalResult<HttpServerHandle> {
        let port = match config.port {
            Some(port) => port,
            None => self.next_port.fetch_add(1, Ordering::SeqCst),
        };
        self.http_servers.lock().unwrap().insert(port, service);
        Ok(HttpServerHandle::new(port))
    }
}

/// Writer that stores its buffer in the MockPal when dropped.
struct MockFileWriter {
    path: FilePath,
    files: Arc<Mutex<BTreeMap<FilePath, Vec<u8>>>>,
    buffer: Vec<u8>,
}

impl Write for MockFileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Drop for MockFileWriter {
    fn drop(&mut self) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(self.path.clone(), std::mem::take(&mut self.buffer));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pal::http::HttpMethod;
    use std::io::Read;
    use std::sync::atomic::AtomicUsize;

    fn docs_tree() -> MockPal {
        let pal = MockPal::new();
        pal.add_file("_docs/v1/en/intro.md", "# Intro");
        pal.add_file("_docs/v1/en/setup.md", "# Setup");
        pal.add_file("_docs/v1/fr/intro.md", "# Intro FR");
        pal.add_file("_docs/v2/en/intro.md", "# Intro v2");
        pal.add_file("_docs/notes.txt", "not a version");
        pal
    }

    #[test]
    fn test_read_file() {
        let pal = docs_tree();
        let content = pal
            .read_file_to_string(&FilePath::from("_docs/v1/en/intro.md"))
            .unwrap();
        assert_eq!(content, "# Intro");
    }

    #[test]
    fn test_read_file_not_found() {
        let pal = MockPal::new();
        let err = pal.read_file(&FilePath::from("missing.md")).err().unwrap();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_read_unreadable_file() {
        let pal = docs_tree();
        pal.add_unreadable("_docs/v1/en/intro.md");
        let err = pal
            .read_file(&FilePath::from("_docs/v1/en/intro.md"))
            .err()
            .unwrap();
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_file_exists_for_files_and_implied_directories() {
        let pal = docs_tree();
        assert!(pal.file_exists(&FilePath::from("_docs/v1/en/intro.md")).unwrap());
        assert!(pal.file_exists(&FilePath::from("_docs/v1")).unwrap());
        assert!(!pal.file_exists(&FilePath::from("_docs/v3")).unwrap());
    }

    #[test]
    fn test_list_directory_mixed_entries() {
        let pal = docs_tree();
        let entries = pal.list_directory(&FilePath::from("_docs")).unwrap();
        let summary: Vec<_> = entries
            .iter()
            .map(|e| (e.path.to_string(), e.is_dir))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("_docs/notes.txt".to_string(), false),
                ("_docs/v1".to_string(), true),
                ("_docs/v2".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_list_directory_leaf_files() {
        let pal = docs_tree();
        let names: Vec<_> = pal
            .list_directory(&FilePath::from("_docs/v1/en"))
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["intro.md", "setup.md"]);
    }

    #[test]
    fn test_list_directory_missing_or_file() {
        let pal = docs_tree();
        assert!(
            pal.list_directory(&FilePath::from("_docs/v9"))
                .unwrap_err()
                .is_not_found()
        );
        assert!(pal.list_directory(&FilePath::from("_docs/notes.txt")).is_err());
    }

    #[test]
    fn test_list_empty_directory() {
        let pal = MockPal::new();
        pal.add_directory("_docs");
        assert!(pal.list_directory(&FilePath::from("_docs")).unwrap().is_empty());
    }

    #[test]
    fn test_create_file_and_remove_directory() {
        let pal = MockPal::new();
        pal.create_directory_all(&FilePath::from("out/en")).unwrap();
        let mut writer = pal.create_file(&FilePath::from("out/en/index.html")).unwrap();
        writer.write_all(b"<p>hi</p>").unwrap();
        drop(writer);

        assert_eq!(pal.get_file("out/en/index.html"), Some(b"<p>hi</p>".to_vec()));
        let mut reader = pal.read_file(&FilePath::from("out/en/index.html")).unwrap();
        let mut content = String::new();
        reader.read_to_string(&mut content).unwrap();
        assert_eq!(content, "<p>hi</p>");

        pal.remove_directory_all(&FilePath::from("out")).unwrap();
        assert!(pal.file_paths().is_empty());
        assert!(!pal.file_exists(&FilePath::from("out/en")).unwrap());
    }

    #[test]
    fn test_trigger_change_respects_directory_and_globs() {
        let pal = docs_tree();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let _handle = pal
            .watch_directory(
                &FilePath::from("_docs"),
                &["**/*.md".to_string()],
                Box::new(move |event: FileChangeEvent| {
                    assert_eq!(event.changed_files.len(), 1);
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert_eq!(pal.trigger_change("_docs/v1/en/intro.md"), 1);
        assert_eq!(pal.trigger_change("_docs/notes.txt"), 0);
        assert_eq!(pal.trigger_change("public/openapi.json"), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_watch_missing_directory_fails() {
        let pal = MockPal::new();
        let result = pal.watch_directory(&FilePath::from("_docs"), &[], Box::new(|_| {}));
        assert!(result.is_err());
    }

    #[derive(Debug)]
    struct PathService;

    impl HttpService for PathService {
        fn handle_request(&self, request: HttpRequest) -> PortalResult<HttpResponse> {
            match request.path().as_str() {
                "/api/ping" => Ok(HttpResponse::json(r#"{"status":"ok"}"#)),
                _ => Ok(HttpResponse::not_found()),
            }
        }
    }

    #[test]
    fn test_start_http_server_assigns_ports() {
        let pal = MockPal::new();
        let first = pal
            .start_http_server(Box::new(PathService), HttpServerConfig::default())
            .unwrap();
        let second = pal
            .start_http_server(
                Box::new(PathService),
                HttpServerConfig::default().with_port(8080),
            )
            .unwrap();
        assert_eq!(first.port(), FIRST_MOCK_PORT);
        assert_eq!(second.port(), 8080);
        assert_eq!(pal.http_server_count(), 2);
    }

    #[test]
    fn test_simulate_request() {
        let pal = MockPal::new();
        let handle = pal
            .start_http_server(Box::new(PathService), HttpServerConfig::default())
            .unwrap();

        let ok = pal
            .simulate_request(handle.port(), HttpRequest::new(HttpMethod::Get, "/api/ping"))
            .unwrap();
        assert_eq!(ok.status().as_u16(), 200);

        let missing = pal
            .simulate_request(handle.port(), HttpRequest::new(HttpMethod::Get, "/nope"))
            .unwrap();
        assert_eq!(missing.status().as_u16(), 404);

        assert!(
            pal.simulate_request(9999, HttpRequest::new(HttpMethod::Get, "/"))
                .is_err()
        );
    }
}
