/* 📖 # Why rewrite the pulldown-cmark event stream?

pulldown-cmark renders headings without anchors and code blocks as bare
`<pre><code>`. The pages need both: heading ids feed the table of contents, and
code blocks get syntax highlighting plus a copy button. Collecting the events
once and rewriting the two constructs keeps every other construct on the stock
HTML writer, so tables, footnotes and task lists need no code here.
*/

use std::collections::{BTreeMap, HashSet};

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd, html};
use pulldown_cmark_escape::escape_html;
use tracing::{debug, instrument};

use docportal_base::{FilePath, PalHandle, PortalError, PortalResult, ResultExt};

use crate::document::DocPath;
use crate::frontmatter::split_front_matter;
use crate::highlight::{highlight_code, language_token};

/// A heading of a rendered page, as listed in its table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub id: String,
}

/// HTML for exactly one document, plus what the page chrome needs from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub html: String,
    pub title: String,
    pub metadata: BTreeMap<String, String>,
    pub headings: Vec<Heading>,
}

fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Human readable title for a slug: `quick-start` → `Quick Start`.
pub fn title_from_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Anchor id for a heading text: lowercase words joined by `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if (c.is_whitespace() || c == '-' || c == '_') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug.to_string()
    }
}

fn unique_id(candidate: String, used: &mut HashSet<String>) -> String {
    if used.insert(candidate.clone()) {
        return candidate;
    }
    let mut n = 1;
    loop {
        let numbered = format!("{}-{}", candidate, n);
        if used.insert(numbered.clone()) {
            return numbered;
        }
        n += 1;
    }
}

fn code_block_html(code: &str, info: Option<&str>) -> String {
    let language = info.and_then(language_token);
    let mut html = String::from(
        "<div class=\"code-block\"><button type=\"button\" class=\"code-block-copy\" data-testid=\"code-block-copy\">Copy</button><pre class=\"code\"><code",
    );
    if let Some(language) = language {
        html.push_str(" class=\"language-");
        let _ = escape_html(&mut html, language);
        html.push('"');
    }
    html.push('>');
    html.push_str(&highlight_code(code, language));
    html.push_str("</code></pre></div>\n");
    html
}

/// Rewrite headings (ids) and code blocks (highlighting) in a parsed event stream.
///
/// Raw HTML written in the markdown is dropped, only the renderer emits markup.
fn rewrite_events<'a>(events: Vec<Event<'a>>, headings: &mut Vec<Heading>) -> Vec<Event<'a>> {
    let mut used_ids = HashSet::new();
    let mut output = Vec::with_capacity(events.len());
    let mut iter = events.into_iter();

    while let Some(event) = iter.next() {
        match event {
            Event::Start(Tag::Heading {
                level,
                id,
                classes,
                attrs,
            }) => {
                let mut inner = Vec::new();
                let mut text = String::new();
                for event in iter.by_ref() {
                    let is_end = matches!(event, Event::End(TagEnd::Heading(_)));
                    if let Event::Text(t) | Event::Code(t) = &event {
                        text.push_str(t);
                    }
                    inner.push(event);
                    if is_end {
                        break;
                    }
                }
                let text = text.trim().to_string();
                let candidate = match id {
                    Some(explicit) => explicit.to_string(),
                    None => slugify(&text),
                };
                let id = unique_id(candidate, &mut used_ids);
                headings.push(Heading {
                    level: level as u8,
                    text,
                    id: id.clone(),
                });
                output.push(Event::Start(Tag::Heading {
                    level,
                    id: Some(CowStr::from(id)),
                    classes,
                    attrs,
                }));
                output.extend(inner);
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                let mut code = String::new();
                for event in iter.by_ref() {
                    match event {
                        Event::End(TagEnd::CodeBlock) => break,
                        Event::Text(t) => code.push_str(&t),
                        _ => {}
                    }
                }
                let info = match &kind {
                    CodeBlockKind::Fenced(info) => Some(&info[..]),
                    CodeBlockKind::Indented => None,
                };
                output.push(Event::Html(CowStr::from(code_block_html(&code, info))));
            }
            Event::Html(raw) | Event::InlineHtml(raw) => {
                debug!(len = raw.len(), "dropping raw HTML from markdown");
            }
            other => output.push(other),
        }
    }
    output
}

/// Render markdown source (front matter included) to a page.
///
/// `fallback_title` is used when neither the front matter nor a level one
/// heading provides a title.
pub fn render_markdown(source: &str, fallback_title: &str) -> RenderedPage {
    let front_matter = split_front_matter(source);
    let events: Vec<Event> = Parser::new_ext(front_matter.body, markdown_options()).collect();

    let mut headings = Vec::new();
    let events = rewrite_events(events, &mut headings);

    let mut html_output = String::with_capacity(front_matter.body.len() * 3 / 2);
    html::push_html(&mut html_output, events.into_iter());

    let title = front_matter
        .get("title")
        .map(str::to_string)
        .or_else(|| {
            headings
                .iter()
                .find(|heading| heading.level == 1)
                .map(|heading| heading.text.clone())
        })
        .unwrap_or_else(|| fallback_title.to_string());

    RenderedPage {
        html: html_output,
        title,
        metadata: front_matter.metadata,
        headings,
    }
}

/// True if `segment` can be used as one path component below the docs directory.
pub fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}

/// Load `{docs_dir}/{version}/{locale}/{slug}.md` and render it.
///
/// Returns a not-found error for a missing file and for segments that do not
/// form a path below the docs directory.
#[instrument(skip(pal, docs_dir))]
pub fn render_document(
    pal: &PalHandle,
    docs_dir: &FilePath,
    version: &str,
    locale: &str,
    slug: &str,
) -> PortalResult<RenderedPage> {
    if ![version, locale, slug].iter().all(|segment| is_valid_segment(segment)) {
        return Err(Box::new(PortalError::not_found(format!(
            "document {}/{}/{}",
            version, locale, slug
        ))));
    }
    let path = DocPath::new(locale, version, slug).file_path(docs_dir);
    let source = pal
        .read_file_to_string(&path)
        .with_context(|| format!("Failed to read document {}", path))?;
    let page = render_markdown(&source, &title_from_slug(slug));
    debug!(path = %path, headings = page.headings.len(), "rendered document");
    Ok(page)
}
