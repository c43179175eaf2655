/* 📖 # Why an api module in docportal_engine?

The api module is the HTTP face of a `Site`. `PortalService` implements the
`HttpService` trait from docportal_base, so the same routing runs under
RealPal (tiny_http) in production and under MockPal in tests. Static files and
the generated stylesheets live in `assets`.
*/

mod assets;
mod service;

pub use assets::{PORTAL_CSS, guess_content_type, public_file_path, serve_public_file};
pub use service::{MAX_FEEDBACK_BODY_BYTES, PortalService};
