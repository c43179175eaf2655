/* 📖 # Why one Site value shared by the service, the exporter and the CLI?

Serving a page, exporting it and printing it from the command line must produce
the same HTML. Site owns everything a page depends on (config, locale
catalog, document snapshot, page cache, feedback log) and exposes the
operations in terms of paths and slugs. The HTTP service then only maps
requests to these operations, and the other front ends reuse them unchanged.
*/

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use docportal_base::{PalHandle, PortalResult};

use crate::cache::PageCache;
use crate::config::Config;
use crate::document::{DocPath, Document, DocumentId};
use crate::feedback::FeedbackLog;
use crate::highlight::highlight_css;
use crate::locale::{LocaleSet, MessageCatalog, Messages};
use crate::pages::{self, PageContext};
use crate::render::render_document;
use crate::search::SearchIndex;
use crate::snapshot::DocumentSnapshot;

/// A rendered documentation page and whether its document exists.
#[derive(Debug, Clone)]
pub struct DocPageHtml {
    pub html: Arc<str>,
    pub found: bool,
}

/// A documentation site: configuration plus all runtime state.
#[derive(Debug)]
pub struct Site {
    pal: PalHandle,
    config: Config,
    locales: LocaleSet,
    messages: MessageCatalog,
    snapshot: DocumentSnapshot,
    cache: Arc<PageCache>,
    feedback: FeedbackLog,
    highlight_css: String,
}

pub type SiteHandle = Arc<Site>;

impl Site {
    /// Open the site described by `config`, relative to the root of `pal`.
    #[instrument(skip_all, fields(title = %config.title))]
    pub fn open(pal: PalHandle, config: Config) -> PortalResult<Self> {
        config.validate()?;
        let locales = LocaleSet::new(config.locales.clone(), config.default_locale.clone());
        let messages = MessageCatalog::load(&pal, &config.messages_dir(), &locales);
        let snapshot = DocumentSnapshot::new(pal.clone(), config.docs_dir(), config.refresh)?;
        let cache = Arc::new(PageCache::new(Duration::from_secs(config.revalidate_seconds)));
        let cache_on_change = cache.clone();
        snapshot.on_change(move || cache_on_change.clear());
        let highlight_css = highlight_css()?;
        info!(
            locales = ?config.locales,
            versions = ?config.versions,
            refresh = ?config.refresh,
            "site opened"
        );
        Ok(Self {
            pal,
            feedback: FeedbackLog::new(config.feedback_capacity),
            config,
            locales,
            messages,
            snapshot,
            cache,
            highlight_css,
        })
    }

    pub fn pal(&self) -> &PalHandle {
        &self.pal
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn locales(&self) -> &LocaleSet {
        &self.locales
    }

    pub fn cache(&self) -> &PageCache {
        &self.cache
    }

    pub fn feedback(&self) -> &FeedbackLog {
        &self.feedback
    }

    pub fn highlight_css(&self) -> &str {
        &self.highlight_css
    }

    /// Messages for a (possibly unsupported) locale tag.
    pub fn messages(&self, locale: &str) -> Arc<Messages> {
        self.messages.messages(self.locales.resolve(locale))
    }

    /// The flat document listing served by `/api/search`.
    pub fn documents(&self) -> PortalResult<Arc<Vec<Document>>> {
        self.snapshot.documents()
    }

    /// Ids of documents matching `query`, in listing order.
    #[instrument(skip(self))]
    pub fn search(&self, query: &str) -> PortalResult<Vec<DocumentId>> {
        let documents = self.documents()?;
        let index = SearchIndex::from_documents(documents.iter());
        let results = index.search(query);
        debug!(results = results.len(), "search done");
        Ok(results)
    }

    fn with_page_context<R>(
        &self,
        locale: &str,
        version: &str,
        path: &str,
        current_slug: Option<&str>,
        f: impl FnOnce(&PageContext) -> R,
    ) -> R {
        let locale = self.locales.resolve(locale);
        let messages = self.messages.messages(locale);
        let ctx = PageContext {
            config: &self.config,
            messages: &messages,
            locale,
            version,
            path,
            current_slug,
        };
        f(&ctx)
    }

    /// The page for one document, or the fallback page if it cannot be rendered.
    ///
    /// An unsupported locale renders the default locale's content. Found pages
    /// are cached by their canonical path; fallback pages are not, so a document
    /// shows up as soon as its file exists.
    pub fn doc_page(&self, locale: &str, version: &str, slug: &str) -> DocPageHtml {
        let locale = self.locales.resolve(locale);
        let path = DocPath::new(locale, version, slug).id().to_string();

        let rendered = self.cache.get_or_render(&path, || {
            let page = render_document(&self.pal, &self.config.docs_dir(), version, locale, slug)?;
            Ok(self.with_page_context(locale, version, &path, Some(slug), |ctx| {
                pages::doc_page(ctx, &page)
            }))
        });
        match rendered {
            Ok(html) => DocPageHtml { html, found: true },
            Err(e) => {
                if e.is_not_found() {
                    debug!(path = path.as_str(), "document not found, rendering fallback");
                } else {
                    warn!(
                        path = path.as_str(),
                        error = %e,
                        "failed to render document, rendering fallback"
                    );
                }
                let html = self.with_page_context(locale, version, &path, Some(slug), |ctx| {
                    pages::fallback_page(ctx, slug)
                });
                DocPageHtml {
                    html: Arc::from(html),
                    found: false,
                }
            }
        }
    }

    pub fn home_page(&self, locale: &str) -> String {
        let path = format!("/{}", self.locales.resolve(locale));
        self.with_page_context(locale, &self.config.default_version, &path, None, pages::home_page)
    }

    pub fn search_page(&self, locale: &str, query: &str) -> PortalResult<String> {
        let results = if query.trim().is_empty() {
            Vec::new()
        } else {
            self.search(query)?
        };
        let path = format!("/{}/search", self.locales.resolve(locale));
        Ok(self.with_page_context(locale, &self.config.default_version, &path, None, |ctx| {
            pages::search_page(ctx, query, &results)
        }))
    }

    pub fn api_reference_page(&self, locale: &str) -> String {
        let path = format!("/{}/api-reference", self.locales.resolve(locale));
        self.with_page_context(
            locale,
            &self.config.default_version,
            &path,
            None,
            pages::api_reference_page,
        )
    }

    pub fn not_found_page(&self, locale: &str, path: &str) -> String {
        self.with_page_context(
            locale,
            &self.config.default_version,
            path,
            None,
            pages::not_found_page,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RefreshPolicy;
    use docportal_base::MockPal;

    fn site_with(mock: &MockPal, config: Config) -> Site {
        Site::open(PalHandle::new(mock.clone()), config).unwrap()
    }

    fn sample_pal() -> MockPal {
        let mock = MockPal::new();
        mock.add_file(
            "_docs/v1/en/introduction.md",
            "---\ntitle: Welcome\n---\n# Introduction\n\nInstall things.",
        );
        mock.add_file("_docs/v1/es/introduction.md", "# Introducción\n\nInstalar cosas.");
        mock.add_file("messages/es.json", r#"{ "Header": { "search": "Buscar" } }"#);
        mock
    }

    #[test]
    fn test_doc_page_found() {
        let site = site_with(&sample_pal(), Config::default());
        let page = site.doc_page("en", "v1", "introduction");
        assert!(page.found);
        assert!(page.html.contains("<title>Welcome | Documentation Portal</title>"));
        assert!(!page.html.contains("title: Welcome"));
    }

    #[test]
    fn test_doc_page_missing_renders_fallback() {
        let site = site_with(&sample_pal(), Config::default());
        let page = site.doc_page("fr", "v1", "quick-start");
        assert!(!page.found);
        assert!(page.html.contains("This documentation page is being created."));
        assert!(page.html.contains("<h1>Quick Start</h1>"));
    }

    #[test]
    fn test_unsupported_locale_uses_default_content() {
        let site = site_with(&sample_pal(), Config::default());
        let page = site.doc_page("it", "v1", "introduction");
        assert!(page.found);
        assert!(page.html.contains("<html lang=\"en\">"));
        assert!(page.html.contains("Install things."));
    }

    #[test]
    fn test_localized_messages() {
        let site = site_with(&sample_pal(), Config::default());
        let page = site.doc_page("es", "v1", "introduction");
        assert!(page.html.contains(">Buscar</button>"));
        assert!(page.html.contains("Instalar cosas."));
    }

    #[test]
    fn test_doc_pages_are_cached() {
        let mock = sample_pal();
        let site = site_with(&mock, Config::default());
        site.doc_page("en", "v1", "introduction");
        mock.add_file("_docs/v1/en/introduction.md", "# Changed");

        let page = site.doc_page("en", "v1", "introduction");
        assert!(page.html.contains("Install things."));
        assert_eq!(site.cache().len(), 1);
    }

    #[test]
    fn test_watch_mode_clears_cache_on_change() {
        let mock = sample_pal();
        let config = Config {
            refresh: RefreshPolicy::Watch,
            ..Config::default()
        };
        let site = site_with(&mock, config);
        site.doc_page("en", "v1", "introduction");
        mock.add_file("_docs/v1/en/introduction.md", "# Changed");
        mock.trigger_change("_docs/v1/en/introduction.md");

        let page = site.doc_page("en", "v1", "introduction");
        assert!(page.html.contains("<h1 id=\"changed\">Changed</h1>"));
    }

    #[test]
    fn test_search() {
        let site = site_with(&sample_pal(), Config::default());
        let ids: Vec<String> = site
            .search("inst")
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(ids, vec!["/en/docs/v1/introduction", "/es/docs/v1/introduction"]);
        assert!(site.search("").unwrap().is_empty());
    }

    #[test]
    fn test_search_page_with_missing_docs_dir_fails() {
        let site = site_with(&MockPal::new(), Config::default());
        assert!(site.search_page("en", "x").is_err());
        // an empty query never touches the listing
        assert!(site.search_page("en", "").is_ok());
    }
}
