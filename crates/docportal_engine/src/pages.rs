/* 📖 # Why format! templates instead of a template engine?

The portal has a handful of fixed pages and every dynamic value is a short
string. Plain `format!` with an escaping `Display` wrapper keeps the markup
next to the code that fills it, and every interpolated value goes through
`Escaped` unless it is HTML we produced ourselves (rendered markdown, nested
fragments).
*/

use std::fmt;

use pulldown_cmark_escape::{FmtWriter, escape_href, escape_html};

use crate::config::Config;
use crate::document::{DocPath, DocumentId};
use crate::locale::Messages;
use crate::navigation::{build_sidebar, switch_locale, switch_version};
use crate::render::{RenderedPage, title_from_slug};

/// Swagger UI release loaded by the API reference page.
pub const SWAGGER_UI_VERSION: &str = "5";
/// Where the API reference page loads the OpenAPI document from.
pub const OPENAPI_URL: &str = "/openapi.json";

/// HTML-escaping display wrapper for text and attribute values.
pub struct Escaped<'a>(pub &'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        escape_html(FmtWriter(f), self.0)
    }
}

/// URL-escaping display wrapper for `href` values.
pub struct Href<'a>(pub &'a str);

impl fmt::Display for Href<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        escape_href(FmtWriter(f), self.0)
    }
}

/// Everything the page chrome needs to know about the current request.
#[derive(Debug, Clone, Copy)]
pub struct PageContext<'a> {
    pub config: &'a Config,
    pub messages: &'a Messages,
    pub locale: &'a str,
    pub version: &'a str,
    /// Request path, used to build locale and version switch links.
    pub path: &'a str,
    pub current_slug: Option<&'a str>,
}

const COPY_SCRIPT: &str = r#"<script>
document.addEventListener("click", function (event) {
  var button = event.target.closest(".code-block-copy");
  if (!button) return;
  var code = button.parentElement.querySelector("code");
  navigator.clipboard.writeText(code.innerText).then(function () {
    var label = button.textContent;
    button.textContent = "Copied!";
    setTimeout(function () { button.textContent = label; }, 1500);
  });
});
</script>"#;

fn locale_selector(ctx: &PageContext) -> String {
    let options: String = ctx
        .config
        .locales
        .iter()
        .map(|locale| {
            format!(
                "<option value=\"{}\"{}>{}</option>",
                Escaped(&switch_locale(ctx.path, locale)),
                if locale == ctx.locale { " selected" } else { "" },
                Escaped(&locale.to_uppercase())
            )
        })
        .collect();
    format!(
        "<select class=\"locale-selector\" data-testid=\"locale-selector\" aria-label=\"{}\" onchange=\"location.href=this.value\">{}</select>",
        Escaped(&ctx.messages.header.language),
        options
    )
}

/// Version selector, only on document pages.
fn version_selector(ctx: &PageContext) -> String {
    if DocPath::parse(ctx.path).is_none() {
        return String::new();
    }
    let options: String = ctx
        .config
        .versions
        .iter()
        .filter_map(|version| {
            let target = switch_version(ctx.path, version)?;
            Some(format!(
                "<option value=\"{}\"{}>{}</option>",
                Escaped(&target),
                if version == ctx.version { " selected" } else { "" },
                Escaped(&version.to_uppercase())
            ))
        })
        .collect();
    format!(
        "<select class=\"version-selector\" data-testid=\"version-selector\" aria-label=\"{}\" onchange=\"location.href=this.value\">{}</select>",
        Escaped(&ctx.messages.header.version),
        options
    )
}

fn search_form(ctx: &PageContext, query: &str) -> String {
    format!(
        "<form class=\"search\" data-testid=\"full-text-search\" method=\"get\" action=\"/{}/search\"><input type=\"search\" name=\"q\" value=\"{}\" placeholder=\"{}\"><button type=\"submit\">{}</button></form>",
        Escaped(ctx.locale),
        Escaped(query),
        Escaped(&ctx.messages.search.placeholder),
        Escaped(&ctx.messages.header.search)
    )
}

fn header(ctx: &PageContext, query: &str) -> String {
    format!(
        "<header class=\"site-header\"><a class=\"site-title\" href=\"/{}\">{}</a><nav class=\"controls\">{}{}{}<a href=\"/{}/api-reference\">{}</a></nav></header>",
        Escaped(ctx.locale),
        Escaped(&ctx.config.title),
        search_form(ctx, query),
        locale_selector(ctx),
        version_selector(ctx),
        Escaped(ctx.locale),
        Escaped(&ctx.messages.header.api_reference)
    )
}

fn sidebar(ctx: &PageContext) -> String {
    let mut html = format!(
        "<aside class=\"sidebar\" data-testid=\"sidebar-navigation\"><h3>{}</h3>",
        Escaped(&ctx.messages.sidebar.documentation)
    );
    for section in build_sidebar(&ctx.config.sections, ctx.locale, ctx.version, ctx.current_slug) {
        html.push_str(&format!(
            "<details class=\"nav-section{}\"{}><summary>{}</summary><ul>",
            if section.active { " active" } else { "" },
            if section.expanded { " open" } else { "" },
            Escaped(&section.title)
        ));
        for link in &section.links {
            html.push_str(&format!(
                "<li><a href=\"{}\"{}>{}</a></li>",
                Href(&link.href),
                if link.active { " class=\"active\" aria-current=\"page\"" } else { "" },
                Escaped(&link.label)
            ));
        }
        html.push_str("</ul></details>");
    }
    html.push_str(&format!(
        "<footer><span>{}</span></footer></aside>",
        Escaped(&ctx.messages.sidebar.last_updated)
    ));
    html
}

/// Wrap `main` into the full page: header, sidebar and scripts.
pub fn layout(ctx: &PageContext, title: &str, query: &str, main: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"{lang}\"><head><meta charset=\"utf-8\"><meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"><title>{title} | {site}</title><link rel=\"stylesheet\" href=\"/assets/portal.css\"><link rel=\"stylesheet\" href=\"/assets/highlight.css\"></head><body>{header}<div class=\"layout\">{sidebar}<main>{main}</main></div>{script}</body></html>\n",
        lang = Escaped(ctx.locale),
        title = Escaped(title),
        site = Escaped(&ctx.config.title),
        header = header(ctx, query),
        sidebar = sidebar(ctx),
        main = main,
        script = COPY_SCRIPT
    )
}

/// Fragment a successful form submission redirects to.
pub const FEEDBACK_THANKS_ANCHOR: &str = "feedback-thanks";

/// Feedback form posting to `/api/feedback`.
///
/// The thank-you note is hidden until the page is opened with
/// `#feedback-thanks`, so the cached page needs no per-request state.
pub fn feedback_widget(ctx: &PageContext) -> String {
    format!(
        "<form class=\"feedback\" data-testid=\"feedback-widget\" method=\"post\" action=\"/api/feedback\"><h3>{}</h3><p class=\"feedback-thanks\" id=\"{}\">{}</p><input type=\"hidden\" name=\"page\" value=\"{}\"><textarea name=\"message\" rows=\"3\" required placeholder=\"{}\"></textarea><button type=\"submit\">{}</button></form>",
        Escaped(&ctx.messages.feedback.title),
        FEEDBACK_THANKS_ANCHOR,
        Escaped(&ctx.messages.feedback.thanks),
        Escaped(ctx.path),
        Escaped(&ctx.messages.feedback.placeholder),
        Escaped(&ctx.messages.feedback.submit)
    )
}

/// Table of contents listing level two and three headings.
pub fn table_of_contents(ctx: &PageContext, page: &RenderedPage) -> String {
    let items: String = page
        .headings
        .iter()
        .filter(|heading| (2..=3).contains(&heading.level))
        .map(|heading| {
            format!(
                "<li class=\"toc-level-{}\"><a href=\"#{}\">{}</a></li>",
                heading.level,
                Escaped(&heading.id),
                Escaped(&heading.text)
            )
        })
        .collect();
    format!(
        "<nav class=\"toc\" data-testid=\"table-of-contents\"><h3>{}</h3><ul>{}</ul></nav>",
        Escaped(&ctx.messages.doc_page.table_of_contents),
        items
    )
}

pub fn doc_page(ctx: &PageContext, page: &RenderedPage) -> String {
    let main = format!(
        "<div class=\"doc\"><article class=\"prose\">{}{}</article><aside class=\"doc-aside\">{}</aside></div>",
        page.html,
        feedback_widget(ctx),
        table_of_contents(ctx, page)
    );
    layout(ctx, &page.title, "", &main)
}

/// Page shown for documents that do not exist (yet).
pub fn fallback_page(ctx: &PageContext, slug: &str) -> String {
    let title = title_from_slug(slug);
    let main = format!(
        "<div class=\"doc fallback\" data-testid=\"fallback-page\"><h1>{}</h1><p class=\"muted\">{}</p><p>{}</p>{}</div>",
        Escaped(&title),
        Escaped(&ctx.messages.doc_page.fallback),
        Escaped(&ctx.messages.doc_page.fallback_hint),
        feedback_widget(ctx)
    );
    layout(ctx, &title, "", &main)
}

fn section_start(ctx: &PageContext, index: usize) -> Option<String> {
    let section = ctx.config.sections.get(index)?;
    let slug = section
        .children
        .first()
        .map(|child| child.slug.as_str())
        .unwrap_or(section.slug.as_str());
    Some(DocPath::new(ctx.locale, ctx.version, slug).id().to_string())
}

pub fn home_page(ctx: &PageContext) -> String {
    let get_started = section_start(ctx, 0)
        .map(|href| {
            format!(
                "<a class=\"button primary\" href=\"{}\">{}</a>",
                Href(&href),
                Escaped(&ctx.messages.home.get_started)
            )
        })
        .unwrap_or_default();
    let quick_navigation: String = (0..ctx.config.sections.len())
        .filter_map(|index| {
            let href = section_start(ctx, index)?;
            Some(format!(
                "<li><a href=\"{}\">{}</a></li>",
                Href(&href),
                Escaped(&ctx.config.sections[index].title)
            ))
        })
        .collect();
    let main = format!(
        "<section class=\"hero\"><h1>{}</h1><p>{}</p>{}<a class=\"button\" href=\"/{}/api-reference\">{}</a></section><section class=\"quick-navigation\"><h3>{}</h3><ul>{}</ul></section>",
        Escaped(&ctx.config.title),
        Escaped(&ctx.messages.home.tagline),
        get_started,
        Escaped(ctx.locale),
        Escaped(&ctx.messages.home.view_api_reference),
        Escaped(&ctx.messages.home.quick_navigation),
        quick_navigation
    );
    layout(ctx, &ctx.config.title, "", &main)
}

/// Search results for `query`. An empty query shows only the form.
pub fn search_page(ctx: &PageContext, query: &str, results: &[DocumentId]) -> String {
    let body = if query.trim().is_empty() {
        String::new()
    } else if results.is_empty() {
        format!("<p class=\"muted\">{}</p>", Escaped(&ctx.messages.search.no_results))
    } else {
        let items: String = results
            .iter()
            .map(|id| {
                format!(
                    "<li><a href=\"{}\">{}</a></li>",
                    Href(id.as_str()),
                    Escaped(id.as_str())
                )
            })
            .collect();
        format!("<ul class=\"search-results\" data-testid=\"search-results\">{}</ul>", items)
    };
    let main = format!(
        "<div class=\"search-page\"><h1>{}</h1>{}{}</div>",
        Escaped(&ctx.messages.search.results),
        search_form(ctx, query),
        body
    );
    layout(ctx, &ctx.messages.search.results, query, &main)
}

/// Swagger UI pointed at the OpenAPI document in the public directory.
pub fn api_reference_page(ctx: &PageContext) -> String {
    let main = format!(
        "<link rel=\"stylesheet\" href=\"https://unpkg.com/swagger-ui-dist@{v}/swagger-ui.css\"><div id=\"swagger-ui\" data-testid=\"api-reference\"></div><script src=\"https://unpkg.com/swagger-ui-dist@{v}/swagger-ui-bundle.js\"></script><script>window.addEventListener(\"load\", function () {{ SwaggerUIBundle({{ url: \"{url}\", dom_id: \"#swagger-ui\" }}); }});</script>",
        v = SWAGGER_UI_VERSION,
        url = OPENAPI_URL
    );
    layout(ctx, &ctx.messages.header.api_reference, "", &main)
}

pub fn not_found_page(ctx: &PageContext) -> String {
    let main = format!(
        "<div class=\"not-found\"><h1>{}</h1><p>{}</p><a href=\"/{}\">{}</a></div>",
        Escaped(&ctx.messages.not_found.title),
        Escaped(&ctx.messages.not_found.message),
        Escaped(ctx.locale),
        Escaped(&ctx.config.title)
    );
    layout(ctx, &ctx.messages.not_found.title, "", &main)
}
