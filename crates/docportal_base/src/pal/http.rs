/* 📖 # Why a dedicated HTTP module in the PAL?

The portal answers page and API requests through one `HttpService`. Keeping
the request/response types here, independent of tiny_http, lets MockPal drive
the exact same service in unit tests without opening sockets.
*/

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use percent_encoding::percent_decode_str;

/// HTTP methods the portal distinguishes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Other(String),
}

impl HttpMethod {
    /// Parse an HTTP method from a string, case-insensitively.
    pub fn parse(method: &str) -> Self {
        match method.to_uppercase().as_str() {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "OPTIONS" => Self::Options,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Other(method) => method,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// HTTP headers collection. Names are compared case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHeaders {
    inner: HashMap<String, (String, String)>,
}

impl HttpHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any header with the same name.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.inner
            .insert(key.to_ascii_lowercase(), (key, value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner
            .get(&key.to_ascii_lowercase())
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(&key.to_ascii_lowercase())
    }

    /// Iterate over `(name, value)` pairs with names as originally inserted.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .values()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// HTTP message body.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct HttpBody(Vec<u8>);

impl HttpBody {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Get content as a string if valid UTF-8.
    pub fn as_string(&self) -> Option<String> {
        String::from_utf8(self.0.clone()).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl std::fmt::Debug for HttpBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("HttpBody").field(&self.0.len()).finish()
    }
}

impl From<Vec<u8>> for HttpBody {
    fn from(v: Vec<u8>) -> Self {
        Self(v)
    }
}

impl From<String> for HttpBody {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&str> for HttpBody {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

/// Decode one `application/x-www-form-urlencoded` component.
pub fn decode_form_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Parse `a=1&b=two` into decoded pairs, keeping order.
pub fn parse_form_pairs(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_form_component(key), decode_form_component(value))
        })
        .collect()
}

/// HTTP request structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    method: HttpMethod,
    url: String,
    headers: HttpHeaders,
    body: HttpBody,
}

impl HttpRequest {
    /// Create a new HTTP request for a URL (path plus optional query).
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HttpHeaders::new(),
            body: HttpBody::empty(),
        }
    }

    pub fn method(&self) -> &HttpMethod {
        &self.method
    }

    /// The full request target as received, including the query string.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The percent-decoded path without the query string.
    pub fn path(&self) -> String {
        let raw = self.url.split(['?', '#']).next().unwrap_or_default();
        percent_decode_str(raw).decode_utf8_lossy().into_owned()
    }

    /// The raw query string, if any.
    pub fn query(&self) -> Option<&str> {
        self.url
            .split_once('?')
            .map(|(_, query)| query.split('#').next().unwrap_or_default())
    }

    /// The first decoded value of the named query parameter.
    pub fn query_param(&self, name: &str) -> Option<String> {
        parse_form_pairs(self.query()?)
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    pub fn body(&self) -> &HttpBody {
        &self.body
    }

    pub fn with_body(mut self, body: impl Into<HttpBody>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }
}

/// HTTP status codes used by the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatusCode {
    Ok = 200,
    Created = 201,
    NoContent = 204,
    Found = 302,
    NotModified = 304,
    BadRequest = 400,
    NotFound = 404,
    MethodNotAllowed = 405,
    PayloadTooLarge = 413,
    InternalServerError = 500,
}

impl HttpStatusCode {
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    pub fn reason_phrase(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Created => "Created",
            Self::NoContent => "No Content",
            Self::Found => "Found",
            Self::NotModified => "Not Modified",
            Self::BadRequest => "Bad Request",
            Self::NotFound => "Not Found",
            Self::MethodNotAllowed => "Method Not Allowed",
            Self::PayloadTooLarge => "Payload Too Large",
            Self::InternalServerError => "Internal Server Error",
        }
    }
}

/// HTTP response structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: HttpStatusCode,
    headers: HttpHeaders,
    body: HttpBody,
}

impl HttpResponse {
    pub fn new(status: HttpStatusCode) -> Self {
        Self {
            status,
            headers: HttpHeaders::new(),
            body: HttpBody::empty(),
        }
    }

    pub fn ok() -> Self {
        Self::new(HttpStatusCode::Ok)
    }

    pub fn created() -> Self {
        Self::new(HttpStatusCode::Created)
    }

    pub fn bad_request() -> Self {
        Self::new(HttpStatusCode::BadRequest)
    }

    pub fn not_found() -> Self {
        Self::new(HttpStatusCode::NotFound)
    }

    pub fn internal_error() -> Self {
        Self::new(HttpStatusCode::InternalServerError)
    }

    /// A 302 redirect to `location`.
    pub fn redirect(location: impl Into<String>) -> Self {
        Self::new(HttpStatusCode::Found).with_header("Location", location)
    }

    pub fn status(&self) -> HttpStatusCode {
        self.status
    }

    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    pub fn body(&self) -> &HttpBody {
        &self.body
    }

    pub fn into_body(self) -> HttpBody {
        self.body
    }

    pub fn with_body(mut self, body: impl Into<HttpBody>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn with_content_type(self, content_type: impl Into<String>) -> Self {
        self.with_header("Content-Type", content_type)
    }

    pub fn with_status(mut self, status: HttpStatusCode) -> Self {
        self.status = status;
        self
    }

    /// Create a 200 JSON response.
    pub fn json(body: impl Into<String>) -> Self {
        Self::ok()
            .with_content_type("application/json")
            .with_body(body.into())
    }

    /// Create a 200 HTML response.
    pub fn html(body: impl Into<String>) -> Self {
        Self::ok()
            .with_content_type("text/html; charset=utf-8")
            .with_body(body.into())
    }

    /// Create a 200 plain text response.
    pub fn text(body: impl Into<String>) -> Self {
        Self::ok()
            .with_content_type("text/plain; charset=utf-8")
            .with_body(body.into())
    }
}

/// Default request body limit of the HTTP server (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on. If None, the OS will assign an available port.
    pub port: Option<u16>,
    /// Server name sent in the `Server` header.
    pub server_name: String,
    /// Largest request body the server reads; longer bodies get 413.
    pub max_body_bytes: usize,
}

impl HttpServerConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// The bind address (`host:port`, port 0 for OS-assigned).
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port.unwrap_or(0))
    }
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: None,
            server_name: "docportal".to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/* 📖 # Why a single HttpService trait?

The service receives raw HttpRequest objects and returns HttpResponse objects,
doing its own routing. The portal has a handful of routes, so a route
registration API would be more machinery than the routing itself.
*/

/// Trait for handling HTTP requests.
pub trait HttpService: std::fmt::Debug + Send + Sync + 'static {
    /// Handle an HTTP request and return a response.
    ///
    /// Errors are turned into HTTP 500 responses by the PAL implementation.
    fn handle_request(&self, request: HttpRequest) -> crate::PortalResult<HttpResponse>;
}

/// Handle to a running HTTP server.
///
/// Dropping the handle signals the accept loop to stop.
#[derive(Debug)]
pub struct HttpServerHandle {
    port: u16,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl HttpServerHandle {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            shutdown: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    /// Create a handle owning the accept loop thread.
    pub fn with_thread(port: u16, shutdown: Arc<AtomicBool>, thread: JoinHandle<()>) -> Self {
        Self {
            port,
            shutdown,
            thread: Some(thread),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Signal the server to stop accepting connections.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Block until the accept loop exits.
    pub fn wait(mut self) {
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::error!("HTTP accept loop panicked");
        }
    }
}

impl Drop for HttpServerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_method_parse() {
        assert_eq!(HttpMethod::parse("GET"), HttpMethod::Get);
        assert_eq!(HttpMethod::parse("post"), HttpMethod::Post);
        assert_eq!(
            HttpMethod::parse("PATCH"),
            HttpMethod::Other("PATCH".to_string())
        );
        assert_eq!(HttpMethod::Get.to_string(), "GET");
    }

    #[test]
    fn test_http_headers_case_insensitive() {
        let mut headers = HttpHeaders::new();
        headers.insert("Content-Type", "application/json");

        assert_eq!(headers.get("content-type"), Some("application/json"));
        assert!(headers.contains("CONTENT-TYPE"));
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec![("Content-Type", "application/json")]
        );
    }

    #[test]
    fn test_request_path_and_query() {
        let request = HttpRequest::new(HttpMethod::Get, "/en/search?q=quick+start&page=2");
        assert_eq!(request.path(), "/en/search");
        assert_eq!(request.query(), Some("q=quick+start&page=2"));
        assert_eq!(request.query_param("q"), Some("quick start".to_string()));
        assert_eq!(request.query_param("page"), Some("2".to_string()));
        assert_eq!(request.query_param("missing"), None);
    }

    #[test]
    fn test_request_path_is_percent_decoded() {
        let request = HttpRequest::new(HttpMethod::Get, "/en/docs/v1/caf%C3%A9?q=%C3%A9t%C3%A9");
        assert_eq!(request.path(), "/en/docs/v1/café");
        assert_eq!(request.query_param("q"), Some("été".to_string()));
    }

    #[test]
    fn test_parse_form_pairs() {
        assert_eq!(
            parse_form_pairs("page=%2Fen%2Fdocs&message=Great+docs%21&flag"),
            vec![
                ("page".to_string(), "/en/docs".to_string()),
                ("message".to_string(), "Great docs!".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_http_response_helpers() {
        let json = HttpResponse::json("[]");
        assert_eq!(json.status(), HttpStatusCode::Ok);
        assert_eq!(json.headers().get("Content-Type"), Some("application/json"));

        let html = HttpResponse::html("<p>hi</p>");
        assert_eq!(
            html.headers().get("content-type"),
            Some("text/html; charset=utf-8")
        );
        assert_eq!(html.body().as_string(), Some("<p>hi</p>".to_string()));

        let redirect = HttpResponse::redirect("/en");
        assert_eq!(redirect.status().as_u16(), 302);
        assert_eq!(redirect.headers().get("location"), Some("/en"));
    }

    #[test]
    fn test_http_server_config() {
        let config = HttpServerConfig::new("0.0.0.0").with_port(3000);
        assert_eq!(config.address(), "0.0.0.0:3000");
        assert_eq!(HttpServerConfig::default().address(), "127.0.0.1:0");
    }

    #[test]
    fn test_http_server_handle_shutdown() {
        let handle = HttpServerHandle::new(8080);
        assert_eq!(handle.port(), 8080);
        assert!(!handle.is_shutdown());
        handle.shutdown();
        assert!(handle.is_shutdown());
    }
}
