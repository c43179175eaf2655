/* 📖 # Why is a missing or unreadable directory fatal here?

The listing feeds the search index. A partial listing would silently drop
pages from search results, so any filesystem error aborts the whole load and
surfaces as a server error to the caller. The only things skipped are entries
that cannot be documents at all: stray files next to version or locale
directories and non-markdown files inside a locale.
*/

use tracing::{debug, instrument};

use docportal_base::{DirEntry, FilePath, PalHandle, PortalResult, ResultExt};

use crate::document::{DocPath, Document, MARKDOWN_EXTENSION};

/// Walk `{docs_dir}/{version}/{locale}/{slug}.md` and return every document.
///
/// Documents are returned in path order (version, then locale, then file name).
#[instrument(skip(pal), fields(docs_dir = %docs_dir))]
pub fn load_documents(pal: &PalHandle, docs_dir: &FilePath) -> PortalResult<Vec<Document>> {
    let mut documents = Vec::new();
    for version in subdirectories(pal, docs_dir)? {
        for locale in subdirectories(pal, &version.path)? {
            let entries = pal
                .list_directory(&locale.path)
                .with_context(|| format!("Failed to list locale directory {}", locale.path))?;
            for entry in entries {
                let Some(slug) = markdown_slug(&entry) else {
                    debug!(path = %entry.path, "skipping non-markdown entry");
                    continue;
                };
                let doc_path = DocPath::new(&locale.name, &version.name, slug);
                let content = pal
                    .read_file_to_string(&entry.path)
                    .with_context(|| format!("Failed to read document {}", entry.path))?;
                documents.push(Document::new(doc_path.id(), content));
            }
        }
    }
    debug!(count = documents.len(), "loaded documents");
    Ok(documents)
}

fn subdirectories(pal: &PalHandle, dir: &FilePath) -> PortalResult<Vec<DirEntry>> {
    let entries = pal
        .list_directory(dir)
        .with_context(|| format!("Failed to list directory {}", dir))?;
    Ok(entries
        .into_iter()
        .filter(|entry| {
            if !entry.is_dir {
                debug!(path = %entry.path, "skipping file outside the version/locale layout");
            }
            entry.is_dir
        })
        .collect())
}

/// The slug of a markdown file entry, None for anything else.
fn markdown_slug(entry: &DirEntry) -> Option<&str> {
    if entry.is_dir {
        return None;
    }
    let slug = entry
        .name
        .strip_suffix(MARKDOWN_EXTENSION)?
        .strip_suffix('.')?;
    (!slug.is_empty()).then_some(slug)
}
