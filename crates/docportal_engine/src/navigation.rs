/* 📖 # Why is the sidebar computed per request instead of stored?

Section definitions come from the config and never change at runtime, but the
active/expanded flags and every link depend on the locale, version and slug of
the page being rendered. Building the small view model on each render keeps the
configuration immutable and makes the rendering code a plain function of its
inputs.
*/

use serde::Deserialize;

use crate::document::DocPath;

/// A link inside a sidebar section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NavItem {
    pub label: String,
    pub slug: String,
}

/// A titled group of sidebar links.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NavSection {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub children: Vec<NavItem>,
}

impl NavSection {
    fn new(title: &str, slug: &str, children: &[(&str, &str)]) -> Self {
        Self {
            title: title.to_string(),
            slug: slug.to_string(),
            children: children
                .iter()
                .map(|(label, slug)| NavItem {
                    label: label.to_string(),
                    slug: slug.to_string(),
                })
                .collect(),
        }
    }

    /// True if `slug` is this section or one of its children.
    pub fn contains_slug(&self, slug: &str) -> bool {
        self.slug == slug || self.children.iter().any(|child| child.slug == slug)
    }
}

/// The sidebar used when the configuration defines no sections.
pub fn default_sections() -> Vec<NavSection> {
    vec![
        NavSection::new(
            "Getting Started",
            "getting-started",
            &[
                ("Introduction", "introduction"),
                ("Quick Start", "quick-start"),
                ("Basic Concepts", "basic-concepts"),
            ],
        ),
        NavSection::new(
            "Installation",
            "installation",
            &[
                ("System Requirements", "requirements"),
                ("Installation Guide", "guide"),
                ("Configuration", "configuration"),
            ],
        ),
        NavSection::new(
            "API Reference",
            "api-reference",
            &[
                ("Authentication", "authentication"),
                ("Endpoints", "endpoints"),
                ("Error Handling", "errors"),
            ],
        ),
        NavSection::new(
            "Examples",
            "examples",
            &[
                ("Basic Usage", "basic-usage"),
                ("Advanced Examples", "advanced"),
                ("Best Practices", "best-practices"),
            ],
        ),
    ]
}

/// Sidebar link resolved for one page view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarLink {
    pub label: String,
    pub href: String,
    pub active: bool,
}

/// Sidebar section resolved for one page view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarSection {
    pub title: String,
    pub slug: String,
    pub active: bool,
    pub expanded: bool,
    pub links: Vec<SidebarLink>,
}

/// Resolve the sidebar for a page at `locale`/`version`, highlighting `current_slug`.
///
/// The section holding the current page is expanded. Without one, the first
/// section is expanded so the sidebar never renders fully collapsed.
pub fn build_sidebar(
    sections: &[NavSection],
    locale: &str,
    version: &str,
    current_slug: Option<&str>,
) -> Vec<SidebarSection> {
    let any_active = current_slug
        .map(|slug| sections.iter().any(|section| section.contains_slug(slug)))
        .unwrap_or(false);

    sections
        .iter()
        .enumerate()
        .map(|(index, section)| {
            let active = current_slug
                .map(|slug| section.contains_slug(slug))
                .unwrap_or(false);
            let links = section
                .children
                .iter()
                .map(|child| SidebarLink {
                    label: child.label.clone(),
                    href: DocPath::new(locale, version, &child.slug).id().to_string(),
                    active: current_slug == Some(child.slug.as_str()),
                })
                .collect();
            SidebarSection {
                title: section.title.clone(),
                slug: section.slug.clone(),
                active,
                expanded: active || (!any_active && index == 0),
                links,
            }
        })
        .collect()
}

/// The same document in another version, or None if `path` is not a document path.
pub fn switch_version(path: &str, version: &str) -> Option<String> {
    let doc_path = DocPath::parse(path)?;
    Some(
        DocPath {
            version: version.to_string(),
            ..doc_path
        }
        .id()
        .to_string(),
    )
}

/// Replace the locale segment (the first one) of `path`.
pub fn switch_locale(path: &str, locale: &str) -> String {
    let rest = path.strip_prefix('/').unwrap_or(path);
    match rest.split_once('/') {
        _ if rest.is_empty() => format!("/{}", locale),
        Some((_, tail)) => format!("/{}/{}", locale, tail),
        None => format!("/{}", locale),
    }
}
