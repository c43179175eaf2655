/* 📖 # Why does every config field have a default?

A docs site that follows the conventional layout (`_docs/`, `messages/`,
`public/`) should run without any `docportal.toml` at all. The file only needs
to mention what differs, and a missing file is not an error.
*/

use serde::Deserialize;
use tracing::{debug, info, instrument};

use docportal_base::{FilePath, PalHandle, PortalResult, ResultExt};

use crate::navigation::{NavSection, default_sections};

/// Default name of the site configuration file.
pub const CONFIG_FILE_NAME: &str = "docportal.toml";

/// How the document listing is kept up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPolicy {
    /// Walk the docs directory on every listing request.
    #[default]
    PerRequest,
    /// Load once and reload after the file watcher reports changes.
    Watch,
}

/// Configuration for a documentation site.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Title shown in the header and on the home page.
    pub title: String,
    /// Directory holding `{version}/{locale}/{slug}.md`.
    pub docs_dir: String,
    /// Directory holding `{locale}.json` message catalogs.
    pub messages_dir: String,
    /// Directory served as static files (e.g. `openapi.json`).
    pub public_dir: String,
    /// Supported locales, in selector order.
    pub locales: Vec<String>,
    pub default_locale: String,
    /// Known versions, in selector order.
    pub versions: Vec<String>,
    pub default_version: String,
    /// Seconds a rendered page stays fresh; 0 disables the page cache.
    pub revalidate_seconds: u64,
    /// Maximum number of feedback entries kept in memory.
    pub feedback_capacity: usize,
    pub refresh: RefreshPolicy,
    pub server: ServerConfig,
    /// Sidebar sections.
    #[serde(rename = "section")]
    pub sections: Vec<NavSection>,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Documentation Portal".to_string(),
            docs_dir: "_docs".to_string(),
            messages_dir: "messages".to_string(),
            public_dir: "public".to_string(),
            locales: ["en", "es", "fr", "de"].map(String::from).to_vec(),
            default_locale: "en".to_string(),
            versions: ["v1", "v2", "v3"].map(String::from).to_vec(),
            default_version: "v1".to_string(),
            revalidate_seconds: 60,
            feedback_capacity: 1000,
            refresh: RefreshPolicy::default(),
            server: ServerConfig::default(),
            sections: default_sections(),
        }
    }
}

impl Config {
    pub fn docs_dir(&self) -> FilePath {
        FilePath::from(self.docs_dir.as_str())
    }

    pub fn messages_dir(&self) -> FilePath {
        FilePath::from(self.messages_dir.as_str())
    }

    pub fn public_dir(&self) -> FilePath {
        FilePath::from(self.public_dir.as_str())
    }

    /// Parse a TOML document and validate it.
    pub fn from_toml(source: &str) -> PortalResult<Self> {
        let config: Config = toml::from_str(source)
            .map_err(|e| docportal_base::err!("Invalid configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> PortalResult<()> {
        if self.locales.is_empty() {
            docportal_base::bail!("At least one locale must be configured");
        }
        if !self.locales.contains(&self.default_locale) {
            docportal_base::bail!(
                "Default locale '{}' is not one of the configured locales {:?}",
                self.default_locale,
                self.locales
            );
        }
        if self.versions.is_empty() {
            docportal_base::bail!("At least one version must be configured");
        }
        if !self.versions.contains(&self.default_version) {
            docportal_base::bail!(
                "Default version '{}' is not one of the configured versions {:?}",
                self.default_version,
                self.versions
            );
        }
        for value in self.locales.iter().chain(&self.versions) {
            if value.is_empty() || value.contains(['/', '\\']) || value == ".." {
                docportal_base::bail!("Invalid path segment '{}' in configuration", value);
            }
        }
        Ok(())
    }
}

/// Load the site configuration, falling back to defaults when the file is missing.
#[instrument(skip(pal), fields(path = %path))]
pub fn load_config(pal: &PalHandle, path: &FilePath) -> PortalResult<Config> {
    if !pal.file_exists(path)? {
        info!("no configuration file found, using defaults");
        return Ok(Config::default());
    }
    let source = pal
        .read_file_to_string(path)
        .with_context(|| format!("Failed to read configuration file {}", path))?;
    let config = Config::from_toml(&source).with_context(|| format!("In {}", path))?;
    debug!(
        locales = ?config.locales,
        versions = ?config.versions,
        refresh = ?config.refresh,
        "configuration loaded"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docportal_base::MockPal;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.locales, vec!["en", "es", "fr", "de"]);
        assert_eq!(config.default_locale, "en");
        assert_eq!(config.versions, vec!["v1", "v2", "v3"]);
        assert_eq!(config.revalidate_seconds, 60);
        assert_eq!(config.refresh, RefreshPolicy::PerRequest);
        assert_eq!(config.sections.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            title = "Acme Docs"
            refresh = "watch"

            [server]
            port = 8080
            "#,
        )
        .unwrap();
        assert_eq!(config.title, "Acme Docs");
        assert_eq!(config.refresh, RefreshPolicy::Watch);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.docs_dir, "_docs");
    }

    #[test]
    fn test_sections_from_toml() {
        let config = Config::from_toml(
            r#"
            [[section]]
            title = "Guides"
            slug = "guides"
            children = [
                { label = "First Steps", slug = "first-steps" },
            ]
            "#,
        )
        .unwrap();
        assert_eq!(config.sections.len(), 1);
        assert_eq!(config.sections[0].children[0].slug, "first-steps");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = Config::from_toml("colour = \"blue\"").unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));
    }

    #[test]
    fn test_default_locale_must_be_supported() {
        let err = Config::from_toml("locales = [\"en\", \"fr\"]\ndefault_locale = \"de\"")
            .unwrap_err();
        assert!(err.to_string().contains("Default locale 'de'"));
    }

    #[test]
    fn test_versions_must_be_path_segments() {
        let err = Config::from_toml("versions = [\"v1\", \"../etc\"]").unwrap_err();
        assert!(err.to_string().contains("Invalid path segment"));
    }

    #[test]
    fn test_load_config_missing_file_uses_defaults() {
        let pal = PalHandle::new(MockPal::new());
        let config = load_config(&pal, &FilePath::from(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config.title, "Documentation Portal");
    }

    #[test]
    fn test_load_config_reports_file_in_error() {
        let mock = MockPal::new();
        mock.add_file(CONFIG_FILE_NAME, "revalidate_seconds = \"soon\"");
        let pal = PalHandle::new(mock);

        let err = load_config(&pal, &FilePath::from(CONFIG_FILE_NAME)).unwrap_err();
        assert!(err.to_string().starts_with("In docportal.toml: Invalid configuration"));
    }

    #[test]
    fn test_example_site_config() {
        let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../example-site");
        let pal = PalHandle::new(docportal_base::RealPal::new(root));
        let config = load_config(&pal, &FilePath::from(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config.title, "Acme Platform Docs");
        assert_eq!(config.default_version, "v2");
        assert_eq!(config.refresh, RefreshPolicy::Watch);
        assert_eq!(config.sections.len(), 2);
        assert_eq!(config.sections[1].children[1].slug, "errors");
    }
}
