use relative_path::{RelativePath, RelativePathBuf};
use std::path::Path;

/* 📖 # Why use RelativePathBuf for FilePath?

Every path the portal touches (`_docs/v1/en/intro.md`, `messages/fr.json`,
`public/openapi.json`) is relative to the site root handed to the PAL. Wrapping
RelativePathBuf keeps absolute system paths out of the engine and gives us
platform independent joins and component access.
*/

/// Type-safe wrapper for file paths relative to the PAL base directory.
///
/// # Examples
///
/// ```
/// use docportal_base::FilePath;
///
/// let docs = FilePath::from("_docs");
/// let file = docs.join("v1").join("en").join("intro.md");
/// assert_eq!(file.to_string(), "_docs/v1/en/intro.md");
/// assert_eq!(file.file_stem(), Some("intro"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilePath(RelativePathBuf);

impl FilePath {
    /// Returns the underlying RelativePath.
    pub fn as_relative(&self) -> &RelativePath {
        &self.0
    }

    /// Converts to a regular Path, without any base directory.
    pub fn as_path(&self) -> &Path {
        Path::new(self.as_relative().as_str())
    }

    /// Returns a new path with `segment` appended.
    pub fn join(&self, segment: impl AsRef<str>) -> FilePath {
        Self(self.0.join(segment.as_ref()))
    }

    /// Returns the final component, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name()
    }

    /// Returns the final component without its extension.
    pub fn file_stem(&self) -> Option<&str> {
        self.0.file_stem()
    }

    /// Returns the extension of the final component.
    pub fn extension(&self) -> Option<&str> {
        self.0.extension()
    }

    /// Returns the parent path, if any.
    pub fn parent(&self) -> Option<FilePath> {
        self.0.parent().map(FilePath::from)
    }

    /// Returns the path with `.` and `..` components resolved lexically.
    pub fn normalize(&self) -> FilePath {
        Self(self.0.normalize())
    }

    /// Returns the part of this path below `base`, if it lies below it.
    pub fn strip_base(&self, base: &FilePath) -> Option<FilePath> {
        let own = self.0.normalize();
        let base = base.0.normalize();
        own.strip_prefix(&base).ok().map(FilePath::from)
    }

    /// Returns true if `other` equals this path or lies below it.
    pub fn contains(&self, other: &FilePath) -> bool {
        let base = self.0.normalize();
        let other = other.0.normalize();
        other.starts_with(&base)
    }
}

impl From<&str> for FilePath {
    fn from(s: &str) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl From<String> for FilePath {
    fn from(s: String) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl From<RelativePathBuf> for FilePath {
    fn from(p: RelativePathBuf) -> Self {
        Self(p)
    }
}

impl From<&RelativePath> for FilePath {
    fn from(p: &RelativePath) -> Self {
        Self(p.to_relative_path_buf())
    }
}

impl From<&Path> for FilePath {
    fn from(p: &Path) -> Self {
        Self(RelativePathBuf::from(
            p.to_string_lossy().replace('\\', "/"),
        ))
    }
}

impl std::fmt::Display for FilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<RelativePath> for FilePath {
    fn as_ref(&self) -> &RelativePath {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_path_from_str() {
        let path = FilePath::from("_docs/v1/en/intro.md");
        assert_eq!(path.as_path(), Path::new("_docs/v1/en/intro.md"));
    }

    #[test]
    fn test_file_path_join_and_components() {
        let path = FilePath::from("_docs").join("v2").join("fr").join("guide.md");
        assert_eq!(path.to_string(), "_docs/v2/fr/guide.md");
        assert_eq!(path.file_name(), Some("guide.md"));
        assert_eq!(path.file_stem(), Some("guide"));
        assert_eq!(path.extension(), Some("md"));
        assert_eq!(path.parent(), Some(FilePath::from("_docs/v2/fr")));
    }

    #[test]
    fn test_file_path_from_windows_style_path() {
        let path = FilePath::from(Path::new("_docs\\v1\\en"));
        assert_eq!(path.to_string(), "_docs/v1/en");
    }

    #[test]
    fn test_file_path_contains() {
        let docs = FilePath::from("_docs");
        assert!(docs.contains(&FilePath::from("_docs/v1/en/intro.md")));
        assert!(docs.contains(&FilePath::from("_docs")));
        assert!(!docs.contains(&FilePath::from("public/openapi.json")));
    }

    #[test]
    fn test_file_path_strip_base() {
        let file = FilePath::from("_docs/v1/en/intro.md");
        assert_eq!(
            file.strip_base(&FilePath::from("_docs")),
            Some(FilePath::from("v1/en/intro.md"))
        );
        assert_eq!(file.strip_base(&FilePath::from("public")), None);
        assert_eq!(
            FilePath::from("./_docs/../public/a.json").normalize(),
            FilePath::from("public/a.json")
        );
    }

    #[test]
    fn test_file_path_ordering() {
        let mut paths = vec![FilePath::from("b.md"), FilePath::from("a.md")];
        paths.sort();
        assert_eq!(paths, vec![FilePath::from("a.md"), FilePath::from("b.md")]);
    }
}
