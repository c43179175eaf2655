/* 📖 # Why can message loading never fail a request?

Translations are presentation only. A missing or broken `{locale}.json` must
not take down page rendering, so every lookup resolves to something: the
locale's own file, then the default locale's file, then the English strings
compiled into the binary. Problems are logged once at startup instead.
*/

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, instrument, warn};

use docportal_base::{FilePath, PalHandle, PortalResult, ResultExt};

/// The closed set of locales a site is published in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleSet {
    locales: Vec<String>,
    default_locale: String,
}

impl LocaleSet {
    /// `default_locale` is expected to be a member of `locales` (see `Config::validate`).
    pub fn new(locales: Vec<String>, default_locale: impl Into<String>) -> Self {
        Self {
            locales,
            default_locale: default_locale.into(),
        }
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn locales(&self) -> &[String] {
        &self.locales
    }

    pub fn is_supported(&self, tag: &str) -> bool {
        self.locales.iter().any(|locale| locale == tag)
    }

    /// `tag` if supported, the default locale otherwise.
    pub fn resolve<'a>(&'a self, tag: &'a str) -> &'a str {
        if self.is_supported(tag) {
            tag
        } else {
            &self.default_locale
        }
    }

    /// Pick the best supported locale from an `Accept-Language` header.
    ///
    /// Region subtags are ignored (`fr-CH` matches `fr`). Ties keep header order.
    pub fn negotiate(&self, accept_language: Option<&str>) -> &str {
        let Some(header) = accept_language else {
            return &self.default_locale;
        };
        let mut best: Option<(&str, f32)> = None;
        for item in header.split(',') {
            let mut parts = item.split(';');
            let tag = parts.next().unwrap_or_default().trim();
            let quality = parts
                .find_map(|param| param.trim().strip_prefix("q="))
                .and_then(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            let primary = tag.split('-').next().unwrap_or_default().to_lowercase();
            let Some(locale) = self.locales.iter().find(|locale| **locale == primary) else {
                continue;
            };
            if quality > 0.0 && best.is_none_or(|(_, best_quality)| quality > best_quality) {
                best = Some((locale.as_str(), quality));
            }
        }
        best.map(|(locale, _)| locale).unwrap_or(self.default_locale.as_str())
    }
}

/// User-facing strings of one locale, grouped by the page element using them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct Messages {
    #[serde(rename = "Header")]
    pub header: HeaderMessages,
    #[serde(rename = "Sidebar")]
    pub sidebar: SidebarMessages,
    #[serde(rename = "DocPage")]
    pub doc_page: DocPageMessages,
    #[serde(rename = "Feedback")]
    pub feedback: FeedbackMessages,
    #[serde(rename = "Search")]
    pub search: SearchMessages,
    #[serde(rename = "Home")]
    pub home: HomeMessages,
    #[serde(rename = "NotFound")]
    pub not_found: NotFoundMessages,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeaderMessages {
    pub search: String,
    pub edit: String,
    pub language: String,
    pub version: String,
    pub api_reference: String,
}

impl Default for HeaderMessages {
    fn default() -> Self {
        Self {
            search: "Search".to_string(),
            edit: "Edit".to_string(),
            language: "Language".to_string(),
            version: "Version".to_string(),
            api_reference: "API Reference".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SidebarMessages {
    pub documentation: String,
    pub last_updated: String,
}

impl Default for SidebarMessages {
    fn default() -> Self {
        Self {
            documentation: "Documentation".to_string(),
            last_updated: "Last updated: Recently".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DocPageMessages {
    pub table_of_contents: String,
    pub fallback: String,
    pub fallback_hint: String,
}

impl Default for DocPageMessages {
    fn default() -> Self {
        Self {
            table_of_contents: "Table of Contents".to_string(),
            fallback: "This documentation page is being created. Content will be available soon."
                .to_string(),
            fallback_hint: "In the meantime, you can explore other sections of documentation or return to the homepage.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedbackMessages {
    pub title: String,
    pub placeholder: String,
    pub submit: String,
    pub thanks: String,
}

impl Default for FeedbackMessages {
    fn default() -> Self {
        Self {
            title: "Feedback".to_string(),
            placeholder: "Your feedback...".to_string(),
            submit: "Submit".to_string(),
            thanks: "Feedback submitted!".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchMessages {
    pub placeholder: String,
    pub results: String,
    pub no_results: String,
}

impl Default for SearchMessages {
    fn default() -> Self {
        Self {
            placeholder: "Search...".to_string(),
            results: "Search results".to_string(),
            no_results: "No pages match your search.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HomeMessages {
    pub tagline: String,
    pub get_started: String,
    pub view_api_reference: String,
    pub quick_navigation: String,
}

impl Default for HomeMessages {
    fn default() -> Self {
        Self {
            tagline: "Comprehensive guides, API references, and examples to help you get started with our platform.".to_string(),
            get_started: "Get Started".to_string(),
            view_api_reference: "View API Reference".to_string(),
            quick_navigation: "Quick Navigation".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotFoundMessages {
    pub title: String,
    pub message: String,
}

impl Default for NotFoundMessages {
    fn default() -> Self {
        Self {
            title: "Page not found".to_string(),
            message: "The page you are looking for does not exist.".to_string(),
        }
    }
}

impl Messages {
    pub fn from_json(source: &str) -> PortalResult<Self> {
        serde_json::from_str(source).map_err(|e| docportal_base::err!("Invalid messages: {}", e))
    }
}

/// Messages of every supported locale, loaded once.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    by_locale: HashMap<String, Arc<Messages>>,
    fallback: Arc<Messages>,
}

fn load_messages_file(pal: &PalHandle, path: &FilePath) -> PortalResult<Option<Messages>> {
    if !pal.file_exists(path)? {
        return Ok(None);
    }
    let source = pal
        .read_file_to_string(path)
        .with_context(|| format!("Failed to read messages {}", path))?;
    let messages = Messages::from_json(&source).with_context(|| format!("In {}", path))?;
    Ok(Some(messages))
}

impl MessageCatalog {
    /// A catalog holding only the built-in English strings.
    pub fn builtin() -> Self {
        Self {
            by_locale: HashMap::new(),
            fallback: Arc::new(Messages::default()),
        }
    }

    /// Load `{messages_dir}/{locale}.json` for every locale in `locales`.
    ///
    /// Locales whose file is missing or broken use the default locale's
    /// messages, which in turn fall back to the built-in strings.
    #[instrument(skip(pal, locales), fields(messages_dir = %messages_dir))]
    pub fn load(pal: &PalHandle, messages_dir: &FilePath, locales: &LocaleSet) -> Self {
        let mut loaded = HashMap::new();
        for locale in locales.locales() {
            let path = messages_dir.join(format!("{}.json", locale));
            match load_messages_file(pal, &path) {
                Ok(Some(messages)) => {
                    debug!(locale = locale.as_str(), "loaded messages");
                    loaded.insert(locale.clone(), Arc::new(messages));
                }
                Ok(None) => {
                    warn!(
                        locale = locale.as_str(),
                        path = %path,
                        "no messages file, using fallback"
                    );
                }
                Err(e) => {
                    warn!(
                        locale = locale.as_str(),
                        error = %e,
                        "failed to load messages, using fallback"
                    );
                }
            }
        }
        let fallback = loaded
            .get(locales.default_locale())
            .cloned()
            .unwrap_or_else(|| Arc::new(Messages::default()));
        Self {
            by_locale: loaded,
            fallback,
        }
    }

    /// Messages for `locale`, falling back to the default locale's.
    pub fn messages(&self, locale: &str) -> Arc<Messages> {
        self.by_locale
            .get(locale)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
