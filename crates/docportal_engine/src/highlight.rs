/* 📖 # Why class-based highlighting instead of inline styles?

syntect can emit either inline `style` attributes or CSS classes. With classes
the rendered pages stay small, the page cache holds less, and the colours live
in one stylesheet served at `/assets/highlight.css`. The syntax set is loaded
once per process; loading it is by far the most expensive part of highlighting.
*/

use std::sync::LazyLock;

use pulldown_cmark_escape::escape_html;
use syntect::highlighting::ThemeSet;
use syntect::html::{ClassStyle, ClassedHTMLGenerator, css_for_theme_with_class_style};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use tracing::warn;

use docportal_base::PortalResult;

/// Theme the stylesheet is generated from.
pub const HIGHLIGHT_THEME: &str = "InspiredGitHub";

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// The language token of a fenced code block info string (`rust,ignore` → `rust`).
pub fn language_token(info: &str) -> Option<&str> {
    info.split([',', ' ', '\t', '{'])
        .next()
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Highlight `code` as `language`, returning the inner HTML of a `<code>` element.
///
/// Unknown languages and highlighting failures fall back to escaped plain text.
pub fn highlight_code(code: &str, language: Option<&str>) -> String {
    let syntax = language.and_then(|language| SYNTAX_SET.find_syntax_by_token(language));
    if let Some(syntax) = syntax {
        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, ClassStyle::Spaced);
        let highlighted = LinesWithEndings::from(code)
            .try_for_each(|line| generator.parse_html_for_line_which_includes_newline(line));
        match highlighted {
            Ok(()) => return generator.finalize(),
            Err(e) => warn!(
                language = syntax.name.as_str(),
                error = %e,
                "failed to highlight code block"
            ),
        }
    }
    let mut escaped = String::with_capacity(code.len());
    let _ = escape_html(&mut escaped, code);
    escaped
}

/// Stylesheet for the classes emitted by [`highlight_code`].
pub fn highlight_css() -> PortalResult<String> {
    let themes = ThemeSet::load_defaults();
    let theme = themes
        .themes
        .get(HIGHLIGHT_THEME)
        .ok_or_else(|| {
            docportal_base::err!("Highlight theme '{}' is not available", HIGHLIGHT_THEME)
        })?;
    css_for_theme_with_class_style(theme, ClassStyle::Spaced)
        .map_err(|e| docportal_base::err!("Failed to generate highlight CSS: {}", e))
}
