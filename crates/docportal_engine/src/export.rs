/* 📖 # Why export through the same Site that serves requests?

A static export is the served site frozen to files: every page is produced by
the same `Site` operations the HTTP service calls, so an exported page is
byte-for-byte what the server would answer. Pages are written as
`{route}/index.html`, which any static file server maps back to the route.

Which doc pages exist is the union of the document listing and the sidebar
entries for every configured locale and version. Sidebar entries without a
file are exported as fallback pages, so no sidebar link dangles.
*/

use std::collections::BTreeSet;
use std::io::Write;

use serde::Serialize;
use tracing::{debug, info, instrument};

use docportal_base::{FilePath, PalHandle, PortalError, PortalResult, ResultExt};

use crate::api::PORTAL_CSS;
use crate::document::DocPath;
use crate::site::Site;

/// Counts of what an export wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// HTML pages, fallback pages included.
    pub pages: usize,
    /// Documents that had no file and were exported as fallback pages.
    pub fallback_pages: usize,
    /// Stylesheets, the search listing and copied public files.
    pub files: usize,
}

#[derive(Serialize)]
struct ListingEntry<'a> {
    id: &'a str,
    content: &'a str,
}

struct Exporter<'a> {
    site: &'a Site,
    pal: &'a PalHandle,
    out_dir: &'a FilePath,
    summary: ExportSummary,
}

impl Exporter<'_> {
    fn write(&mut self, relative: &str, content: &[u8]) -> PortalResult<()> {
        let path = relative
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.out_dir.clone(), |path, segment| path.join(segment));
        if let Some(parent) = path.parent() {
            self.pal.create_directory_all(&parent)?;
        }
        let mut file = self
            .pal
            .create_file(&path)
            .with_context(|| format!("Failed to create {}", path))?;
        file.write_all(content)
            .and_then(|()| file.flush())
            .map_err(|e| Box::new(PortalError::file(path.as_path(), e)))?;
        debug!(path = %path, size = content.len(), "wrote export file");
        Ok(())
    }

    fn write_page(&mut self, route: &str, html: &str) -> PortalResult<()> {
        self.write(&format!("{}/index.html", route), html.as_bytes())?;
        self.summary.pages += 1;
        Ok(())
    }

    fn write_file(&mut self, relative: &str, content: &[u8]) -> PortalResult<()> {
        self.write(relative, content)?;
        self.summary.files += 1;
        Ok(())
    }

    fn export_pages(&mut self) -> PortalResult<()> {
        let site = self.site;
        let default_locale = site.locales().default_locale();
        self.write_page("", &site.home_page(default_locale))?;
        self.write("404.html", site.not_found_page(default_locale, "/404").as_bytes())?;
        for locale in site.locales().locales() {
            self.write_page(locale, &site.home_page(locale))?;
            self.write_page(&format!("{}/search", locale), &site.search_page(locale, "")?)?;
            self.write_page(
                &format!("{}/api-reference", locale),
                &site.api_reference_page(locale),
            )?;
        }

        for doc_path in self.doc_paths()? {
            let page = site.doc_page(&doc_path.locale, &doc_path.version, &doc_path.slug);
            if !page.found {
                self.summary.fallback_pages += 1;
            }
            self.write_page(doc_path.id().as_str(), &page.html)?;
        }
        Ok(())
    }

    /// Every doc page to export: listed documents plus sidebar entries.
    fn doc_paths(&self) -> PortalResult<BTreeSet<DocPath>> {
        let config = self.site.config();
        let mut paths = BTreeSet::new();
        for document in self.site.documents()?.iter() {
            match DocPath::parse(document.id().as_str()) {
                Some(path)
                    if self.site.locales().is_supported(&path.locale)
                        && config.versions.contains(&path.version) =>
                {
                    paths.insert(path);
                }
                _ => debug!(
                    id = %document.id(),
                    "skipping document outside configured locales and versions"
                ),
            }
        }
        for locale in &config.locales {
            for version in &config.versions {
                for section in &config.sections {
                    for item in &section.children {
                        paths.insert(DocPath::new(
                            locale.as_str(),
                            version.as_str(),
                            item.slug.as_str(),
                        ));
                    }
                }
            }
        }
        Ok(paths)
    }

    fn export_assets(&mut self) -> PortalResult<()> {
        let site = self.site;
        self.write_file("assets/portal.css", PORTAL_CSS.as_bytes())?;
        self.write_file("assets/highlight.css", site.highlight_css().as_bytes())?;

        let documents = site.documents()?;
        let listing: Vec<ListingEntry> = documents
            .iter()
            .map(|doc| ListingEntry {
                id: doc.id().as_str(),
                content: doc.content(),
            })
            .collect();
        let json = serde_json::to_string(&listing)
            .map_err(|e| docportal_base::err!("JSON serialization error: {}", e))?;
        self.write_file("api/search.json", json.as_bytes())
    }

    fn export_public_dir(&mut self, dir: &FilePath, relative: &str) -> PortalResult<()> {
        for entry in self.pal.list_directory(dir)? {
            let target = format!("{}/{}", relative, entry.name);
            if entry.is_dir {
                self.export_public_dir(&entry.path, &target)?;
            } else {
                let content = read_all(self.pal, &entry.path)?;
                self.write_file(&target, &content)?;
            }
        }
        Ok(())
    }
}

fn read_all(pal: &PalHandle, path: &FilePath) -> PortalResult<Vec<u8>> {
    let mut reader = pal.read_file(path)?;
    let mut content = Vec::new();
    std::io::Read::read_to_end(&mut reader, &mut content)
        .map_err(|e| Box::new(PortalError::file(path.as_path(), e)))?;
    Ok(content)
}

/// Write the whole site as static files below `out_dir`.
///
/// Existing files in `out_dir` are overwritten, other files are left alone.
/// The search listing goes to `api/search.json`.
#[instrument(skip(site), fields(out_dir = %out_dir))]
pub fn export_site(site: &Site, out_dir: &FilePath) -> PortalResult<ExportSummary> {
    let mut exporter = Exporter {
        site,
        pal: site.pal(),
        out_dir,
        summary: ExportSummary::default(),
    };
    exporter.export_pages()?;
    exporter.export_assets()?;

    let public_dir = site.config().public_dir();
    if site.pal().file_exists(&public_dir)? {
        exporter
            .export_public_dir(&public_dir, "")
            .with_context(|| format!("Failed to copy public directory {}", public_dir))?;
    }

    let summary = exporter.summary;
    info!(
        pages = summary.pages,
        fallback_pages = summary.fallback_pages,
        files = summary.files,
        "site exported"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::navigation::{NavItem, NavSection};
    use docportal_base::MockPal;

    fn small_config() -> Config {
        Config {
            locales: vec!["en".to_string(), "fr".to_string()],
            versions: vec!["v1".to_string()],
            sections: vec![NavSection {
                title: "Getting Started".to_string(),
                slug: "getting-started".to_string(),
                children: vec![
                    NavItem {
                        label: "Introduction".to_string(),
                        slug: "introduction".to_string(),
                    },
                    NavItem {
                        label: "Quick Start".to_string(),
                        slug: "quick-start".to_string(),
                    },
                ],
            }],
            ..Config::default()
        }
    }

    fn exported(mock: &MockPal, path: &str) -> String {
        let content = mock
            .get_file(path)
            .unwrap_or_else(|| panic!("{} not exported", path));
        String::from_utf8(content).unwrap()
    }

    #[test]
    fn test_export_site() {
        let mock = MockPal::new();
        mock.add_file("_docs/v1/en/introduction.md", "# Introduction\n\nHello.");
        mock.add_file("_docs/v1/en/changelog.md", "# Changelog");
        mock.add_file("_docs/v9/en/ancient.md", "# Ancient");
        mock.add_file("public/openapi.json", "{}");
        mock.add_file("public/img/logo.svg", "<svg/>");
        let site = Site::open(PalHandle::new(mock.clone()), small_config()).unwrap();

        let summary = export_site(&site, &FilePath::from("out")).unwrap();

        // home, per locale (home, search, api-reference),
        // en/fr x (introduction, quick-start) and changelog
        assert_eq!(
            summary,
            ExportSummary {
                pages: 12,
                fallback_pages: 3,
                files: 5,
            }
        );
        assert!(exported(&mock, "out/en/docs/v1/introduction/index.html").contains("Hello."));
        assert!(
            exported(&mock, "out/en/docs/v1/changelog/index.html")
                .contains("<h1 id=\"changelog\">")
        );
        assert!(
            exported(&mock, "out/fr/docs/v1/quick-start/index.html")
                .contains("data-testid=\"fallback-page\"")
        );
        assert!(exported(&mock, "out/index.html").contains("<html lang=\"en\">"));
        assert!(exported(&mock, "out/404.html").contains("Page not found"));
        assert!(
            exported(&mock, "out/api/search.json").contains("\"id\":\"/en/docs/v1/changelog\"")
        );
        assert_eq!(exported(&mock, "out/img/logo.svg"), "<svg/>");
        assert_eq!(exported(&mock, "out/openapi.json"), "{}");
        assert!(mock.get_file("out/en/docs/v9/ancient/index.html").is_none());
    }

    #[test]
    fn test_export_without_public_dir() {
        let mock = MockPal::new();
        mock.add_file("_docs/v1/en/introduction.md", "# Introduction");
        let site = Site::open(PalHandle::new(mock.clone()), small_config()).unwrap();

        let summary = export_site(&site, &FilePath::from("out")).unwrap();
        assert_eq!(summary.files, 3);
        assert!(mock.get_file("out/assets/portal.css").is_some());
    }

    #[test]
    fn test_export_fails_without_docs() {
        let mock = MockPal::new();
        let site = Site::open(PalHandle::new(mock), small_config()).unwrap();
        assert!(export_site(&site, &FilePath::from("out")).is_err());
    }
}
