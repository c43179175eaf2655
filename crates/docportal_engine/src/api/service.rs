/* 📖 # Why a single service for pages, API and static files?

The portal registers exactly one `HttpService` with the PAL. It maps the
request path to an operation on the shared `Site` and turns the result into a
response:

- `/api/search` -> document listing, or matching ids with `?q=`
- `/api/feedback` -> record (POST) or list (GET) feedback
- `/assets/portal.css`, `/assets/highlight.css` -> generated stylesheets
- `/`, `/{locale}` -> home page
- `/{locale}/docs/{version}/{slug}` -> document page or fallback page
- `/{locale}/search`, `/{locale}/api-reference` -> search and API reference pages
- everything else -> file from the public directory, else the 404 page

Handlers return `Err` only for failures the client cannot fix (the docs tree
vanished, a file is unreadable). The PAL answers those with HTTP 500.
*/

use serde::Serialize;
use tracing::{debug, instrument};

use docportal_base::PortalResult;
use docportal_base::pal::http::{HttpMethod, HttpRequest, HttpResponse, HttpService, HttpStatusCode};

use crate::api::assets::{PORTAL_CSS, serve_public_file};
use crate::feedback::FeedbackSubmission;
use crate::pages::FEEDBACK_THANKS_ANCHOR;
use crate::site::SiteHandle;

/// Largest feedback request body accepted, in bytes.
pub const MAX_FEEDBACK_BODY_BYTES: usize = 64 * 1024;

const CSS_CONTENT_TYPE: &str = "text/css; charset=utf-8";
const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// One entry of the `/api/search` listing.
#[derive(Serialize)]
struct DocumentResponse<'a> {
    id: &'a str,
    content: &'a str,
}

/// HTTP front end of a [`Site`](crate::site::Site).
#[derive(Clone)]
pub struct PortalService {
    site: SiteHandle,
}

impl PortalService {
    pub fn new(site: SiteHandle) -> Self {
        Self { site }
    }

    pub fn site(&self) -> &SiteHandle {
        &self.site
    }

    /// Serialize data to JSON and wrap it in an HTTP 200 response.
    fn serialize_json_response<T: Serialize>(data: &T) -> PortalResult<HttpResponse> {
        serde_json::to_string(data)
            .map(HttpResponse::json)
            .map_err(|e| docportal_base::err!("JSON serialization error: {}", e))
    }

    fn handle_search_request(&self, request: &HttpRequest) -> PortalResult<HttpResponse> {
        match request.query_param("q") {
            Some(query) => {
                let results = self.site.search(&query)?;
                let ids: Vec<&str> = results.iter().map(|id| id.as_str()).collect();
                Self::serialize_json_response(&ids)
            }
            None => {
                let documents = self.site.documents()?;
                let listing: Vec<DocumentResponse> = documents
                    .iter()
                    .map(|doc| DocumentResponse {
                        id: doc.id().as_str(),
                        content: doc.content(),
                    })
                    .collect();
                Self::serialize_json_response(&listing)
            }
        }
    }

    fn handle_feedback_submission(&self, request: &HttpRequest) -> PortalResult<HttpResponse> {
        let body = request.body();
        if body.len() > MAX_FEEDBACK_BODY_BYTES {
            return Ok(HttpResponse::new(HttpStatusCode::PayloadTooLarge)
                .with_content_type(TEXT_CONTENT_TYPE)
                .with_body(format!(
                    "Feedback body exceeds {} bytes",
                    MAX_FEEDBACK_BODY_BYTES
                )));
        }
        let content_type = request.headers().get("Content-Type");
        let is_json =
            content_type.is_some_and(|ct| ct.trim_start().starts_with("application/json"));
        let submission = match FeedbackSubmission::from_body(content_type, body.as_bytes()) {
            Ok(submission) => submission,
            Err(e) => {
                debug!(error = %e, "rejected feedback");
                return Ok(HttpResponse::bad_request()
                    .with_content_type(TEXT_CONTENT_TYPE)
                    .with_body(e.to_string()));
            }
        };
        let entry = self.site.feedback().record(submission);
        if is_json {
            return Ok(Self::serialize_json_response(&entry)?.with_status(HttpStatusCode::Created));
        }
        Ok(HttpResponse::redirect(format!(
            "{}#{}",
            local_redirect_target(&entry.page),
            FEEDBACK_THANKS_ANCHOR
        )))
    }

    fn handle_feedback_list(&self) -> PortalResult<HttpResponse> {
        Self::serialize_json_response(&self.site.feedback().entries())
    }

    /// Route page, asset and public file requests.
    fn handle_page_request(&self, request: &HttpRequest, path: &str) -> PortalResult<HttpResponse> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let locales = self.site.locales();
        let first = segments.first().copied().unwrap_or_default();

        // 📖 # Why look in the public directory before the locale routes?
        // A first segment that is not a supported locale may still name a
        // public file (`/openapi.json`, `/img/logo.png`). Only when no such file
        // exists do the routes below apply, with the default locale standing in
        // for the unsupported one.
        if !first.is_empty() && !locales.is_supported(first) {
            let public_dir = self.site.config().public_dir();
            if let Some(response) = serve_public_file(self.site.pal(), &public_dir, path)? {
                return Ok(response);
            }
        }

        let response = match segments.as_slice() {
            [""] => {
                let locale = locales.negotiate(request.headers().get("Accept-Language"));
                debug!(locale, "negotiated locale for home page");
                HttpResponse::html(self.site.home_page(locale))
            }
            ["assets", "portal.css"] => HttpResponse::ok()
                .with_content_type(CSS_CONTENT_TYPE)
                .with_body(PORTAL_CSS),
            ["assets", "highlight.css"] => HttpResponse::ok()
                .with_content_type(CSS_CONTENT_TYPE)
                .with_body(self.site.highlight_css()),
            [locale] if locales.is_supported(locale) => {
                HttpResponse::html(self.site.home_page(locale))
            }
            [locale, "search"] => {
                let query = request.query_param("q").unwrap_or_default();
                HttpResponse::html(self.site.search_page(locale, &query)?)
            }
            [locale, "api-reference"] => HttpResponse::html(self.site.api_reference_page(locale)),
            [locale, "docs", version, slug] => {
                let page = self.site.doc_page(locale, version, slug);
                let cache_control = if page.found {
                    self.site.cache().cache_control()
                } else {
                    "no-cache".to_string()
                };
                HttpResponse::html(page.html.to_string())
                    .with_header("Cache-Control", cache_control)
            }
            _ => {
                debug!(path, "no route or public file");
                let locale = locales.resolve(first);
                HttpResponse::html(self.site.not_found_page(locale, path))
                    .with_status(HttpStatusCode::NotFound)
            }
        };
        Ok(response)
    }
}

/// Only same-site absolute paths are followed after a form post.
fn local_redirect_target(page: &str) -> &str {
    if page.starts_with('/') && !page.starts_with("//") && !page.contains(['\\', '\r', '\n', '#']) {
        page
    } else {
        "/"
    }
}

impl std::fmt::Debug for PortalService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalService")
            .field("title", &self.site.config().title)
            .finish()
    }
}

impl HttpService for PortalService {
    #[instrument(skip_all, fields(method = %request.method(), url = request.url()))]
    fn handle_request(&self, request: HttpRequest) -> PortalResult<HttpResponse> {
        let path = request.path();
        match (request.method(), path.as_str()) {
            (HttpMethod::Get, "/api/search") => self.handle_search_request(&request),
            (HttpMethod::Post, "/api/feedback") => self.handle_feedback_submission(&request),
            (HttpMethod::Get, "/api/feedback") => self.handle_feedback_list(),
            (HttpMethod::Get | HttpMethod::Head, _) if !path.starts_with("/api/") => {
                self.handle_page_request(&request, &path)
            }
            (HttpMethod::Get | HttpMethod::Head, _) => {
                Ok(HttpResponse::not_found()
                    .with_content_type(TEXT_CONTENT_TYPE)
                    .with_body("Unknown API endpoint"))
            }
            (method, _) => {
                debug!(%method, "method not allowed");
                let allow = if path == "/api/feedback" { "GET, POST" } else { "GET, HEAD" };
                Ok(HttpResponse::new(HttpStatusCode::MethodNotAllowed)
                    .with_header("Allow", allow)
                    .with_content_type(TEXT_CONTENT_TYPE)
                    .with_body(format!("Method {} not allowed", method)))
            }
        }
    }
}
