use std::sync::Arc;

use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{css_for_theme_with_class_style, ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

use crate::ApiResult;

const THEME: &str = "InspiredGitHub";
const CLASS_STYLE: ClassStyle = ClassStyle::Spaced;

/// Output representation selected by the caller from client classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Markup,
    Terminal,
}

/// A rendered document. `Markup` keeps the highlighted fragment and the
/// stylesheet separate; combining them is the rendering layer's business.
#[derive(Debug, Clone)]
pub enum Rendered {
    Markup { html: String, css: String },
    Terminal(String),
}

/// Syntax highlighting engine: a syntect syntax set plus a fixed theme,
/// loaded once and shared.
#[derive(Clone)]
pub struct Highlighter {
    inner: Arc<Inner>,
}

struct Inner {
    syntaxes: SyntaxSet,
    theme: Theme,
}

impl Highlighter {
    pub fn new() -> Self {
        let syntaxes = SyntaxSet::load_defaults_newlines();
        let theme = ThemeSet::load_defaults()
            .themes
            .remove(THEME)
            .expect("default theme set is missing the configured theme");
        Highlighter {
            inner: Arc::new(Inner { syntaxes, theme }),
        }
    }

    /// Resolve a lexer by explicit name, or guess one from the document's
    /// first line. Unknown names and failed guesses fall back to plain text;
    /// this never fails.
    pub fn resolve(&self, explicit_name: Option<&str>, document: &str) -> &SyntaxReference {
        let syntaxes = &self.inner.syntaxes;
        let found = match explicit_name {
            Some(name) => syntaxes.find_syntax_by_token(name),
            None => syntaxes.find_syntax_by_first_line(document.lines().next().unwrap_or("")),
        };
        found.unwrap_or_else(|| syntaxes.find_syntax_plain_text())
    }

    pub fn render(
        &self,
        document: &str,
        syntax: &SyntaxReference,
        target: Target,
    ) -> ApiResult<Rendered> {
        match target {
            Target::Markup => self.render_markup(document, syntax),
            Target::Terminal => self.render_terminal(document, syntax),
        }
    }

    fn render_markup(&self, document: &str, syntax: &SyntaxReference) -> ApiResult<Rendered> {
        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.inner.syntaxes, CLASS_STYLE);
        for line in LinesWithEndings::from(document) {
            generator.parse_html_for_line_which_includes_newline(line)?;
        }
        let html = generator.finalize();
        let css = css_for_theme_with_class_style(&self.inner.theme, CLASS_STYLE)?;
        Ok(Rendered::Markup { html, css })
    }

    fn render_terminal(&self, document: &str, syntax: &SyntaxReference) -> ApiResult<Rendered> {
        let mut highlighter = HighlightLines::new(syntax, &self.inner.theme);
        let mut out = String::new();
        for line in LinesWithEndings::from(document) {
            let regions = highlighter.highlight_line(line, &self.inner.syntaxes)?;
            out.push_str(&as_24_bit_terminal_escaped(&regions, false));
        }
        out.push_str("\x1b[0m");
        Ok(Rendered::Terminal(out))
    }
}
