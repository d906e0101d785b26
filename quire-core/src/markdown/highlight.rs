//! Code syntax highlighting using syntect.
//!
//! Spans carry scope classes (`ClassStyle::Spaced`) rather than inline
//! colors; the matching stylesheet comes from [`highlight_css`].

use super::pipeline::{Stage, TransformContext};
use quire_types::dom::{Dom, NodeKind, Selector};
use std::sync::OnceLock;
use syntect::highlighting::ThemeSet;
use syntect::html::{css_for_theme_with_class_style, ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use thiserror::Error;

/// Theme used for the exported stylesheet
pub const THEME_NAME: &str = "InspiredGitHub";

const CLASS_STYLE: ClassStyle = ClassStyle::Spaced;

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();

fn syntax_set() -> &'static SyntaxSet {
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("Theme not found: {0}")]
    MissingTheme(String),

    #[error("Highlighting failed: {0}")]
    Syntect(#[from] syntect::Error),
}

pub struct HighlightStage;

impl Stage for HighlightStage {
    fn name(&self) -> &'static str {
        "highlight"
    }

    fn apply(&self, dom: &mut Dom, ctx: &mut TransformContext) {
        for pre in dom.select(&Selector::tag("pre").attr("data-language")) {
            let language = dom.attr(pre, "data-language").unwrap_or_default().to_string();
            if ctx.options().is_diagram(&language) {
                continue;
            }
            let Some(code) = dom.select_first_within(pre, &Selector::tag("code")) else {
                continue;
            };
            if !ctx.mark_visited(self.name(), code) {
                continue;
            }
            // Only plain text children: anything else was highlighted already
            let plain = dom
                .children(code)
                .iter()
                .all(|c| matches!(dom.kind(*c), NodeKind::Text(_)));
            if !plain {
                continue;
            }

            let source = dom.text_content(code);
            match highlight_code(&source, &language) {
                Ok(html) => {
                    dom.clear_children(code);
                    let raw = dom.create_raw(html);
                    dom.append_child(code, raw);
                }
                Err(e) => {
                    tracing::warn!(language = %language, "Failed to highlight code block: {}", e);
                }
            }
        }
    }
}

/// Highlight `code` as class-annotated spans
pub fn highlight_code(code: &str, language: &str) -> Result<String, HighlightError> {
    let ss = syntax_set();
    let syntax = ss
        .find_syntax_by_token(language)
        .or_else(|| ss.find_syntax_by_extension(language))
        .unwrap_or_else(|| ss.find_syntax_plain_text());

    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, ss, CLASS_STYLE);
    for line in LinesWithEndings::from(code) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }
    Ok(generator.finalize())
}

/// Stylesheet matching the classes emitted by [`highlight_code`]
pub fn highlight_css() -> Result<String, HighlightError> {
    let themes = ThemeSet::load_defaults();
    let theme = themes
        .themes
        .get(THEME_NAME)
        .ok_or_else(|| HighlightError::MissingTheme(THEME_NAME.to_string()))?;
    Ok(css_for_theme_with_class_style(theme, CLASS_STYLE)?)
}
