pub mod api;
pub mod cache;
pub mod config;
pub mod document;
pub mod export;
pub mod feedback;
pub mod frontmatter;
pub mod highlight;
pub mod loader;
pub mod locale;
pub mod navigation;
pub mod pages;
pub mod render;
pub mod search;
pub mod site;
pub mod snapshot;

pub use api::PortalService;
pub use cache::PageCache;
pub use config::{CONFIG_FILE_NAME, Config, RefreshPolicy, ServerConfig, load_config};
pub use document::{DocPath, Document, DocumentId};
pub use export::{ExportSummary, export_site};
pub use feedback::{FeedbackEntry, FeedbackLog, FeedbackSubmission};
pub use frontmatter::{FrontMatter, split_front_matter};
pub use loader::load_documents;
pub use locale::{LocaleSet, MessageCatalog, Messages};
pub use navigation::{NavItem, NavSection, build_sidebar, default_sections};
pub use render::{Heading, RenderedPage, render_document, render_markdown};
pub use search::{SearchIndex, tokenize};
pub use site::{DocPageHtml, Site, SiteHandle};
pub use snapshot::DocumentSnapshot;
