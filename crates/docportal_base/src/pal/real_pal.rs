use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use notify::{RecursiveMode, Watcher};
use tracing::{debug, error, instrument, warn};
use walkdir::WalkDir;

use crate::{PortalError, PortalResult};

use super::FilePath;
use super::http::{
    HttpMethod, HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService,
    HttpStatusCode,
};
use super::traits::{DirEntry, FileChangeCallback, FileChangeEvent, Pal, ReadSeek, WatchHandle};

/* 📖 # Why std::fs and a thread-per-request server instead of async?

The portal reads a few hundred small markdown files and answers one request at
a time per visitor. Blocking I/O on plain threads is enough for that load and
keeps the call stacks (and span traces) straightforward.
*/

/// How long the accept loop blocks before checking the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Concrete PAL implementation using the real filesystem via std::fs.
///
/// All file paths are resolved relative to a configured base directory.
#[derive(Debug)]
pub struct RealPal {
    base_dir: PathBuf,
}

impl RealPal {
    /// Create a new RealPal with the given base directory.
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Resolve a FilePath to a filesystem path below the base directory.
    fn resolve_path(&self, path: &FilePath) -> PathBuf {
        self.base_dir.join(path.as_path())
    }
}

/// Compile glob patterns into a single matcher.
pub(crate) fn build_glob_set(globs: &[String]) -> PortalResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for glob in globs {
        let compiled = GlobBuilder::new(glob)
            .literal_separator(false)
            .build()
            .map_err(|e| {
                debug!(pattern = %glob, error = %e, "failed to compile glob pattern");
                crate::err!("Invalid glob pattern '{}': {}", glob, e)
            })?;
        builder.add(compiled);
    }
    builder
        .build()
        .map_err(|e| crate::err!("Failed to build glob set: {}", e))
}

fn file_error(path: impl Into<PathBuf>, source: std::io::Error) -> Box<PortalError> {
    Box::new(PortalError::file(path, source))
}

impl Pal for RealPal {
    #[instrument(skip(self), fields(path = %path))]
    fn file_exists(&self, path: &FilePath) -> PortalResult<bool> {
        let resolved = self.resolve_path(path);
        let exists = resolved.exists();
        debug!(exists, resolved = %resolved.display(), "checked file existence");
        Ok(exists)
    }

    #[instrument(skip(self), fields(path = %path))]
    fn read_file(&self, path: &FilePath) -> PortalResult<Box<dyn ReadSeek + 'static>> {
        let resolved = self.resolve_path(path);
        let file = fs::File::open(&resolved).map_err(|e| {
            debug!(error = %e, "failed to open file");
            file_error(&resolved, e)
        })?;
        Ok(Box::new(file))
    }

    #[instrument(skip(self), fields(path = %path))]
    fn list_directory(&self, path: &FilePath) -> PortalResult<Vec<DirEntry>> {
        let resolved = self.resolve_path(path);
        let mut entries = Vec::new();
        for entry in WalkDir::new(&resolved)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let failed = e.path().map(PathBuf::from).unwrap_or_else(|| resolved.clone());
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                file_error(failed, source)
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            entries.push(DirEntry {
                path: path.join(&name),
                name,
                is_dir: entry.file_type().is_dir(),
            });
        }
        debug!(count = entries.len(), "listed directory");
        Ok(entries)
    }

    #[instrument(skip(self), fields(path = %path))]
    fn create_file(&self, path: &FilePath) -> PortalResult<Box<dyn Write>> {
        let resolved = self.resolve_path(path);
        let file = fs::File::create(&resolved).map_err(|e| file_error(&resolved, e))?;
        Ok(Box::new(file))
    }

    #[instrument(skip(self), fields(path = %path))]
    fn create_directory_all(&self, path: &FilePath) -> PortalResult<()> {
        let resolved = self.resolve_path(path);
        fs::create_dir_all(&resolved).map_err(|e| file_error(&resolved, e))
    }

    #[instrument(skip(self), fields(path = %path))]
    fn remove_directory_all(&self, path: &FilePath) -> PortalResult<()> {
        let resolved = self.resolve_path(path);
        fs::remove_dir_all(&resolved).map_err(|e| file_error(&resolved, e))
    }

    #[instrument(skip(self, callback), fields(directory = %directory, globs = ?globs))]
    fn watch_directory(
        &self,
        directory: &FilePath,
        globs: &[String],
        callback: FileChangeCallback,
    ) -> PortalResult<WatchHandle> {
        let resolved = self.resolve_path(directory);
        let canonical = fs::canonicalize(&resolved).map_err(|e| file_error(&resolved, e))?;
        let glob_set = build_glob_set(globs)?;
        let watched = directory.clone();
        let root = canonical.clone();

        let mut watcher = notify::recommended_watcher(
            move |result: notify::Result<notify::Event>| match result {
                Ok(event) => {
                    if event.kind.is_access() {
                        return;
                    }
                    let changed_files: Vec<FilePath> = event
                        .paths
                        .iter()
                        .filter_map(|changed| changed.strip_prefix(&root).ok())
                        .filter(|relative| glob_set.is_match(relative))
                        .map(|relative| watched.join(FilePath::from(relative).to_string()))
                        .collect();
                    if !changed_files.is_empty() {
                        debug!(count = changed_files.len(), "watched files changed");
                        callback(FileChangeEvent { changed_files });
                    }
                }
                Err(e) => warn!(error = %e, "file watcher error"),
            },
        )
        .map_err(|e| crate::err!("Failed to create file watcher: {}", e))?;

        watcher
            .watch(&canonical, RecursiveMode::Recursive)
            .map_err(|e| crate::err!("Failed to watch {}: {}", canonical.display(), e))?;
        debug!(path = %canonical.display(), "watching directory");
        Ok(WatchHandle::new(watcher))
    }

    #[instrument(skip(self, service), fields(address = %config.address()))]
    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> PortalResult<HttpServerHandle> {
        let server = tiny_http::Server::http(config.address())
            .map_err(|e| crate::err!("Failed to bind {}: {}", config.address(), e))?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| crate::err!("Server is not listening on an IP address"))?;

        let service: Arc<dyn HttpService> = Arc::from(service);
        let shutdown = Arc::new(AtomicBool::new(false));
        let loop_shutdown = Arc::clone(&shutdown);
        let server_name = config.server_name.clone();
        let max_body_bytes = config.max_body_bytes;

        let thread = std::thread::Builder::new()
            .name("http-accept".to_string())
            .spawn(move || {
                while !loop_shutdown.load(Ordering::SeqCst) {
                    match server.recv_timeout(ACCEPT_POLL_INTERVAL) {
                        Ok(Some(request)) => {
                            let service = Arc::clone(&service);
                            let server_name = server_name.clone();
                            std::thread::spawn(move || {
                                handle_connection(
                                    service.as_ref(),
                                    request,
                                    &server_name,
                                    max_body_bytes,
                                )
                            });
                        }
                        Ok(None) => {}
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                            break;
                        }
                    }
                }
                debug!("HTTP accept loop stopped");
            })
            .map_err(|e| crate::err!("Failed to spawn accept thread: {}", e))?;

        debug!(port, "HTTP server listening");
        Ok(HttpServerHandle::with_thread(port, shutdown, thread))
    }
}

/// Read the request body, refusing anything longer than `limit` bytes.
fn read_body(request: &mut tiny_http::Request, limit: usize) -> Result<Vec<u8>, HttpStatusCode> {
    if request.body_length().is_some_and(|length| length > limit) {
        return Err(HttpStatusCode::PayloadTooLarge);
    }
    let mut body = Vec::new();
    request
        .as_reader()
        .take(limit as u64 + 1)
        .read_to_end(&mut body)
        .map_err(|e| {
            warn!(error = %e, "failed to read request body");
            HttpStatusCode::BadRequest
        })?;
    if body.len() > limit {
        return Err(HttpStatusCode::PayloadTooLarge);
    }
    Ok(body)
}

/// Translate one tiny_http request, run the service and write the response.
fn handle_connection(
    service: &dyn HttpService,
    mut request: tiny_http::Request,
    server_name: &str,
    max_body_bytes: usize,
) {
    let response = match read_body(&mut request, max_body_bytes) {
        Ok(body) => {
            let method = HttpMethod::parse(&request.method().to_string());
            let mut converted = HttpRequest::new(method, request.url());
            for header in request.headers() {
                converted =
                    converted.with_header(header.field.to_string(), header.value.to_string());
            }
            match service.handle_request(converted.with_body(body)) {
                Ok(response) => response,
                Err(e) => {
                    error!(error = ?e, url = %request.url(), "request failed");
                    HttpResponse::internal_error()
                        .with_content_type("text/plain; charset=utf-8")
                        .with_body(e.to_string())
                }
            }
        }
        Err(status) => {
            debug!(url = %request.url(), status = status.as_u16(), "rejected request body");
            HttpResponse::new(status)
                .with_content_type("text/plain; charset=utf-8")
                .with_body(status.reason_phrase())
        }
    };

    let status = response.status().as_u16();
    let mut headers: Vec<tiny_http::Header> = response
        .headers()
        .iter()
        .filter_map(|(key, value)| {
            tiny_http::Header::from_bytes(key.as_bytes(), value.as_bytes()).ok()
        })
        .collect();
    if let Ok(server) = tiny_http::Header::from_bytes(&b"Server"[..], server_name.as_bytes()) {
        headers.push(server);
    }
    let body = response.into_body().into_bytes();
    let length = body.len();
    let response = tiny_http::Response::new(
        tiny_http::StatusCode(status),
        headers,
        Cursor::new(body),
        Some(length),
        None,
    );
    if let Err(e) = request.respond(response) {
        warn!(error = %e, "failed to send response");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn setup_test_dir() -> (TempDir, RealPal) {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let pal = RealPal::new(temp_dir.path().to_path_buf());
        (temp_dir, pal)
    }

    #[test]
    fn test_file_exists() {
        let (temp_dir, pal) = setup_test_dir();
        fs::write(temp_dir.path().join("test.md"), "content").unwrap();

        assert!(pal.file_exists(&FilePath::from("test.md")).unwrap());
        assert!(!pal.file_exists(&FilePath::from("missing.md")).unwrap());
    }

    #[test]
    fn test_read_file_to_string() {
        let (temp_dir, pal) = setup_test_dir();
        fs::write(temp_dir.path().join("test.md"), "# Hello").unwrap();

        let result = pal.read_file_to_string(&FilePath::from("test.md")).unwrap();
        assert_eq!(result, "# Hello");
    }

    #[test]
    fn test_read_file_not_found_is_not_found() {
        let (_temp_dir, pal) = setup_test_dir();

        let err = pal.read_file(&FilePath::from("missing.md")).err().unwrap();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_directory_sorted_with_kinds() {
        let (temp_dir, pal) = setup_test_dir();
        fs::create_dir_all(temp_dir.path().join("_docs/v2")).unwrap();
        fs::create_dir_all(temp_dir.path().join("_docs/v1")).unwrap();
        fs::write(temp_dir.path().join("_docs/README.txt"), "").unwrap();

        let entries = pal.list_directory(&FilePath::from("_docs")).unwrap();
        let summary: Vec<_> = entries
            .iter()
            .map(|e| (e.path.to_string(), e.is_dir))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("_docs/README.txt".to_string(), false),
                ("_docs/v1".to_string(), true),
                ("_docs/v2".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_list_directory_missing() {
        let (_temp_dir, pal) = setup_test_dir();

        let err = pal.list_directory(&FilePath::from("_docs")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_create_file_and_directories() {
        let (temp_dir, pal) = setup_test_dir();
        pal.create_directory_all(&FilePath::from("out/en/docs")).unwrap();

        let mut writer = pal
            .create_file(&FilePath::from("out/en/docs/index.html"))
            .unwrap();
        writer.write_all(b"<html></html>").unwrap();
        drop(writer);

        let content = fs::read_to_string(temp_dir.path().join("out/en/docs/index.html")).unwrap();
        assert_eq!(content, "<html></html>");

        pal.remove_directory_all(&FilePath::from("out")).unwrap();
        assert!(!temp_dir.path().join("out").exists());
    }

    #[test]
    fn test_watch_directory_not_found() {
        let (_temp_dir, pal) = setup_test_dir();
        let callback: FileChangeCallback = Box::new(|_event| {});

        let result =
            pal.watch_directory(&FilePath::from("missing"), &["**/*.md".to_string()], callback);
        assert!(result.is_err());
    }

    #[test]
    fn test_watch_directory_invalid_glob() {
        let (temp_dir, pal) = setup_test_dir();
        fs::create_dir(temp_dir.path().join("_docs")).unwrap();
        let callback: FileChangeCallback = Box::new(|_event| {});

        let result =
            pal.watch_directory(&FilePath::from("_docs"), &["[invalid".to_string()], callback);
        assert!(result.is_err());
    }

    #[test]
    fn test_watch_directory_reports_markdown_changes() {
        let (temp_dir, pal) = setup_test_dir();
        fs::create_dir_all(temp_dir.path().join("_docs/v1/en")).unwrap();
        let (sender, receiver) = mpsc::channel();
        let sender = std::sync::Mutex::new(sender);
        let callback: FileChangeCallback = Box::new(move |event: FileChangeEvent| {
            let _ = sender.lock().unwrap().send(event.changed_files);
        });

        let _handle = pal
            .watch_directory(&FilePath::from("_docs"), &["**/*.md".to_string()], callback)
            .unwrap();
        fs::write(temp_dir.path().join("_docs/v1/en/intro.md"), "# Intro").unwrap();

        let changed = receiver.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(changed.contains(&FilePath::from("_docs/v1/en/intro.md")));
    }

    #[derive(Debug)]
    struct EchoService;

    impl HttpService for EchoService {
        fn handle_request(&self, request: HttpRequest) -> PortalResult<HttpResponse> {
            match request.path().as_str() {
                "/fail" => Err(crate::err!("service exploded")),
                "/body" => Ok(HttpResponse::text(format!("received {}", request.body().len()))),
                path => Ok(HttpResponse::text(format!("{} {}", request.method(), path))),
            }
        }
    }

    fn http_post(port: u16, path: &str, body: &[u8]) -> String {
        use std::net::TcpStream;
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        write!(
            stream,
            "POST {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Length: {}\r\n\r\n",
            path,
            body.len()
        )
        .unwrap();
        stream.write_all(body).unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    fn http_get(port: u16, path: &str) -> String {
        use std::net::TcpStream;
        let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        write!(
            stream,
            "GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
            path
        )
        .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    #[test]
    fn test_http_server_round_trip() {
        let (_temp_dir, pal) = setup_test_dir();
        let handle = pal
            .start_http_server(Box::new(EchoService), HttpServerConfig::default())
            .unwrap();

        let response = http_get(handle.port(), "/en/docs?q=1");
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("GET /en/docs"));

        let response = http_get(handle.port(), "/fail");
        assert!(response.starts_with("HTTP/1.1 500"));
        assert!(response.ends_with("service exploded"));

        handle.shutdown();
        handle.wait();
    }

    #[test]
    fn test_http_server_limits_request_body() {
        let (_temp_dir, pal) = setup_test_dir();
        let config = HttpServerConfig::default().with_max_body_bytes(1024);
        let handle = pal.start_http_server(Box::new(EchoService), config).unwrap();

        let response = http_post(handle.port(), "/body", &[b'a'; 1024]);
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.ends_with("received 1024"));

        let response = http_post(handle.port(), "/body", &[b'a'; 8 * 1024]);
        assert!(response.starts_with("HTTP/1.1 413"));
        assert!(response.ends_with("Payload Too Large"));

        handle.shutdown();
        handle.wait();
    }
}
