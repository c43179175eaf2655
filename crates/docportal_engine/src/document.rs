/* 📖 # Why does the document id mirror the URL?

Documents live at `{docs_dir}/{version}/{locale}/{slug}.md` and are served at
`/{locale}/docs/{version}/{slug}`. Using the URL path as the identifier means a
search hit can be rendered as a link without any lookup, and the id alone is
enough to find the file again (see `DocPath`).
*/

use serde::{Deserialize, Serialize};

use docportal_base::FilePath;

/// Markdown file extension that marks a document.
pub const MARKDOWN_EXTENSION: &str = "md";

/// Unique identifier of a document, of the form `/{locale}/docs/{version}/{slug}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wrap an existing id string without validation.
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&DocPath> for DocumentId {
    fn from(path: &DocPath) -> Self {
        Self(format!(
            "/{}/docs/{}/{}",
            path.locale, path.version, path.slug
        ))
    }
}

/// The three coordinates that locate a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath {
    pub locale: String,
    pub version: String,
    pub slug: String,
}

impl DocPath {
    pub fn new(
        locale: impl Into<String>,
        version: impl Into<String>,
        slug: impl Into<String>,
    ) -> Self {
        Self {
            locale: locale.into(),
            version: version.into(),
            slug: slug.into(),
        }
    }

    /// Parse a URL path of the form `/{locale}/docs/{version}/{slug}`.
    ///
    /// A trailing slash is tolerated, anything else returns None.
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.strip_prefix('/')?.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').collect();
        match segments.as_slice() {
            [locale, "docs", version, slug]
                if !locale.is_empty() && !version.is_empty() && !slug.is_empty() =>
            {
                Some(Self::new(*locale, *version, *slug))
            }
            _ => None,
        }
    }

    pub fn id(&self) -> DocumentId {
        DocumentId::from(self)
    }

    /// Location of the markdown file below `docs_dir`.
    pub fn file_path(&self, docs_dir: &FilePath) -> FilePath {
        docs_dir
            .join(&self.version)
            .join(&self.locale)
            .join(format!("{}.{}", self.slug, MARKDOWN_EXTENSION))
    }

    /// The same page in another locale.
    pub fn with_locale(&self, locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            ..self.clone()
        }
    }
}

/// A markdown document as found on disk.
///
/// `content` is the raw file text, front matter included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub content: String,
}

impl Document {
    pub fn new(id: DocumentId, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
        }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_doc_path() {
        let path = DocPath::new("fr", "v2", "quick-start");
        assert_eq!(path.id().as_str(), "/fr/docs/v2/quick-start");
    }

    #[test]
    fn test_file_path_mirrors_id() {
        let path = DocPath::new("en", "v1", "introduction");
        assert_eq!(
            path.file_path(&FilePath::from("_docs")).to_string(),
            "_docs/v1/en/introduction.md"
        );
    }

    #[test]
    fn test_parse_doc_path() {
        assert_eq!(
            DocPath::parse("/en/docs/v1/introduction"),
            Some(DocPath::new("en", "v1", "introduction"))
        );
        assert_eq!(
            DocPath::parse("/en/docs/v1/introduction/"),
            Some(DocPath::new("en", "v1", "introduction"))
        );
        assert_eq!(DocPath::parse("/en/docs/v1"), None);
        assert_eq!(DocPath::parse("/en/blog/v1/introduction"), None);
        assert_eq!(DocPath::parse("/en/docs/v1/a/b"), None);
        assert_eq!(DocPath::parse("en/docs/v1/introduction"), None);
        assert_eq!(DocPath::parse("/en/docs//introduction"), None);
    }

    #[test]
    fn test_with_locale_keeps_version_and_slug() {
        let path = DocPath::new("en", "v3", "errors").with_locale("de");
        assert_eq!(path.id().as_str(), "/de/docs/v3/errors");
    }

    #[test]
    fn test_document_json_shape() {
        let doc = Document::new(
            DocumentId::from_string("/en/docs/v1/intro"),
            "---\ntitle: Intro\n---\n# Intro",
        );
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(
            json,
            r#"{"id":"/en/docs/v1/intro","content":"---\ntitle: Intro\n---\n# Intro"}"#
        );
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }
}
