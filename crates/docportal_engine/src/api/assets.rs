/* 📖 # Why read public files through the Pal on every request?

The public directory holds a few small files (`openapi.json`, images used by
the docs). Reading them on demand means edits show up without a restart and
tests can serve assets from MockPal. The request path is checked segment by
segment before it is joined to the public directory, so `..` can never leave
it.
*/

use tracing::debug;

use docportal_base::pal::http::{HttpResponse, HttpStatusCode};
use docportal_base::{FilePath, PalHandle, PortalResult, ResultExt};

use crate::render::is_valid_segment;

/// Stylesheet for the page chrome, served at `/assets/portal.css`.
pub const PORTAL_CSS: &str = r#"
*{box-sizing:border-box}
body{margin:0;font-family:system-ui,-apple-system,"Segoe UI",sans-serif;color:#1f2933;background:#fff;line-height:1.6}
a{color:#2563eb;text-decoration:none}a:hover{text-decoration:underline}
.site-header{position:sticky;top:0;z-index:50;display:flex;align-items:center;justify-content:space-between;gap:1rem;height:4rem;padding:0 1rem;border-bottom:1px solid #e5e7eb;background:rgba(255,255,255,.95)}
.site-title{font-weight:600;font-size:1.1rem;color:inherit}
.controls{display:flex;align-items:center;gap:.5rem}
.controls select,.controls input,.controls button{height:2.25rem;padding:0 .75rem;border:1px solid #d1d5db;border-radius:.375rem;background:#fff}
.layout{display:flex}
.sidebar{width:16rem;flex-shrink:0;padding:1rem;border-right:1px solid #e5e7eb;min-height:calc(100vh - 4rem)}
.sidebar h3{font-size:.8rem;text-transform:uppercase;letter-spacing:.05em;color:#6b7280}
.sidebar ul{list-style:none;margin:0;padding:0 0 0 1rem}
.sidebar summary{cursor:pointer;padding:.5rem;border-radius:.5rem;font-weight:500}
.nav-section.active>summary{background:#2563eb;color:#fff}
.sidebar li a{display:block;padding:.4rem .5rem;border-radius:.375rem;color:#6b7280}
.sidebar li a.active{background:rgba(37,99,235,.1);color:#2563eb;font-weight:500}
.sidebar footer{margin-top:1.5rem;padding-top:1rem;border-top:1px solid #e5e7eb;font-size:.75rem;color:#6b7280}
main{flex:1;min-width:0;max-width:56rem;margin:0 auto;padding:2rem}
.doc{display:flex;gap:3rem}.prose{flex:1;min-width:0}
.doc-aside{width:16rem;flex-shrink:0}
.toc,.feedback{padding:1rem;border:1px solid #e5e7eb;border-radius:.375rem;background:#f9fafb}
.toc ul{list-style:none;padding:0}.toc-level-3{padding-left:1rem}
.feedback{margin-top:2rem}.feedback textarea{width:100%;margin-bottom:.5rem}
.feedback-thanks{display:none;color:#15803d}.feedback-thanks:target{display:block}
.code-block{position:relative}
.code-block pre{overflow-x:auto;padding:1rem;border-radius:.375rem;background:#f6f8fa}
.code-block-copy{position:absolute;top:.5rem;right:.5rem;font-size:.8rem}
.muted{color:#6b7280}
.hero{text-align:center;padding:4rem 1rem}
.button{display:inline-block;margin:.25rem;padding:.75rem 2rem;border:1px solid #d1d5db;border-radius:.375rem}
.button.primary{background:#2563eb;border-color:#2563eb;color:#fff}
@media (max-width:1024px){.sidebar,.doc-aside{display:none}.doc{display:block}}
"#;

/// Guess the MIME type based on file extension.
pub fn guess_content_type(path: &str) -> &'static str {
    let extension = path
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "yaml" | "yml" => "application/yaml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "wasm" => "application/wasm",
        "xml" => "application/xml",
        "txt" | "md" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Map a request path to a file below `public_dir`, None if it would escape it.
pub fn public_file_path(public_dir: &FilePath, request_path: &str) -> Option<FilePath> {
    let relative = request_path.trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }
    let mut path = public_dir.clone();
    for segment in relative.split('/') {
        if !is_valid_segment(segment) {
            return None;
        }
        path = path.join(segment);
    }
    Some(path)
}

/// Serve a file from the public directory, None if there is no such file.
pub fn serve_public_file(
    pal: &PalHandle,
    public_dir: &FilePath,
    request_path: &str,
) -> PortalResult<Option<HttpResponse>> {
    let Some(path) = public_file_path(public_dir, request_path) else {
        return Ok(None);
    };
    let mut reader = match pal.read_file(&path) {
        Ok(reader) => reader,
        Err(e) if e.is_not_found() => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to serve {}", path)),
    };
    let mut content = Vec::new();
    std::io::Read::read_to_end(&mut reader, &mut content)
        .map_err(|e| Box::new(docportal_base::PortalError::file(path.as_path(), e)))?;
    let content_type = guess_content_type(request_path);
    debug!(path = %path, content_type, size = content.len(), "serving public file");
    Ok(Some(
        HttpResponse::new(HttpStatusCode::Ok)
            .with_content_type(content_type)
            .with_body(content),
    ))
}
