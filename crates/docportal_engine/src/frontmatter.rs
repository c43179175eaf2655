/* 📖 # Why strip front matter by hand instead of using the markdown parser?

The block has to disappear from the HTML even when its YAML is broken, and
its values feed the page title. Splitting on the `---` delimiter lines first
gives us the body as a plain sub-slice of the file (no copy) and leaves YAML
errors as a metadata concern only.
*/

use std::collections::BTreeMap;

use tracing::debug;

/// A markdown file split into its metadata block and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter<'a> {
    /// Scalar values of the YAML block, stringified.
    pub metadata: BTreeMap<String, String>,
    /// Everything after the closing delimiter.
    pub body: &'a str,
    /// True if a delimited block was found (and stripped).
    pub present: bool,
}

impl FrontMatter<'_> {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == "---"
}

/// Split a leading `---` delimited block off `content`.
///
/// The opening delimiter must be the first line. Without a closing delimiter
/// the content is treated as having no front matter.
pub fn split_front_matter(content: &str) -> FrontMatter<'_> {
    let content_without_bom = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content_without_bom.split_inclusive('\n');
    let no_front_matter = FrontMatter {
        metadata: BTreeMap::new(),
        body: content,
        present: false,
    };

    let first_line = match lines.next() {
        Some(first) if is_delimiter(first) => first,
        _ => return no_front_matter,
    };

    let bom_len = content.len() - content_without_bom.len();
    let yaml_start = bom_len + first_line.len();
    let mut offset = yaml_start;
    for line in lines {
        if is_delimiter(line) {
            let yaml = &content[yaml_start..offset];
            return FrontMatter {
                metadata: parse_metadata(yaml),
                body: &content[offset + line.len()..],
                present: true,
            };
        }
        offset += line.len();
    }
    no_front_matter
}

/// Parse the YAML block into a flat map of scalar values.
///
/// Invalid YAML and non-mapping documents yield an empty map.
fn parse_metadata(yaml: &str) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    if yaml.trim().is_empty() {
        return metadata;
    }
    let mapping = match serde_yaml::from_str::<serde_yaml::Value>(yaml) {
        Ok(serde_yaml::Value::Mapping(mapping)) => mapping,
        Ok(_) => {
            debug!("front matter is not a mapping, ignoring it");
            return metadata;
        }
        Err(e) => {
            debug!(error = %e, "invalid front matter YAML, ignoring it");
            return metadata;
        }
    };
    for (key, value) in mapping {
        let serde_yaml::Value::String(key) = key else {
            continue;
        };
        let value = match value {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::Bool(b) => b.to_string(),
            _ => continue,
        };
        metadata.insert(key, value);
    }
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_front_matter() {
        let parsed = split_front_matter("# Title\n\nBody");
        assert!(!parsed.present);
        assert_eq!(parsed.body, "# Title\n\nBody");
        assert!(parsed.metadata.is_empty());
    }

    #[test]
    fn test_front_matter_scalars() {
        let parsed = split_front_matter(
            "---\ntitle: Quick Start\norder: 2\ndraft: false\ntags: [a, b]\n---\n# Heading\n",
        );
        assert!(parsed.present);
        assert_eq!(parsed.body, "# Heading\n");
        assert_eq!(parsed.get("title"), Some("Quick Start"));
        assert_eq!(parsed.get("order"), Some("2"));
        assert_eq!(parsed.get("draft"), Some("false"));
        assert_eq!(parsed.get("tags"), None);
    }

    #[test]
    fn test_crlf_line_endings() {
        let parsed = split_front_matter("---\r\ntitle: Windows\r\n---\r\nBody\r\n");
        assert_eq!(parsed.get("title"), Some("Windows"));
        assert_eq!(parsed.body, "Body\r\n");
    }

    #[test]
    fn test_invalid_yaml_is_still_stripped() {
        let parsed = split_front_matter("---\ntitle: [unclosed\n---\nBody");
        assert!(parsed.present);
        assert!(parsed.metadata.is_empty());
        assert_eq!(parsed.body, "Body");
    }

    #[test]
    fn test_empty_block() {
        let parsed = split_front_matter("---\n---\nBody");
        assert!(parsed.present);
        assert!(parsed.metadata.is_empty());
        assert_eq!(parsed.body, "Body");
    }

    #[test]
    fn test_unclosed_block_is_body() {
        let parsed = split_front_matter("---\ntitle: nope\n\nBody");
        assert!(!parsed.present);
        assert_eq!(parsed.body, "---\ntitle: nope\n\nBody");
    }

    #[test]
    fn test_delimiter_must_be_first_line() {
        let parsed = split_front_matter("\n---\ntitle: nope\n---\nBody");
        assert!(!parsed.present);
    }

    #[test]
    fn test_block_at_end_of_file() {
        let parsed = split_front_matter("---\ntitle: Only metadata\n---");
        assert_eq!(parsed.get("title"), Some("Only metadata"));
        assert_eq!(parsed.body, "");
    }

    #[test]
    fn test_byte_order_mark() {
        let parsed = split_front_matter("\u{feff}---\ntitle: Bom\n---\nBody");
        assert_eq!(parsed.get("title"), Some("Bom"));
        assert_eq!(parsed.body, "Body");
    }
}
