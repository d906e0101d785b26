//! Image source normalization.

use super::pipeline::{Stage, TransformContext};
use crate::config::BuildMode;
use quire_types::dom::{Dom, Selector};

pub struct ImagePathStage;

impl Stage for ImagePathStage {
    fn name(&self) -> &'static str {
        "image-paths"
    }

    fn apply(&self, dom: &mut Dom, ctx: &mut TransformContext) {
        if ctx.options().mode != BuildMode::Publish {
            return;
        }
        let prefix = ctx.options().static_prefix.clone();

        for img in dom.select(&Selector::tag("img")) {
            if !ctx.mark_visited(self.name(), img) {
                continue;
            }
            let Some(src) = dom.attr(img, "src") else {
                continue;
            };
            if let Some(normalized) = normalize_src(src, &prefix) {
                dom.set_attr(img, "src", normalized);
            }
        }
    }
}

/// Strip the static prefix from a local image reference for publishing.
///
/// `None` leaves the source as authored: external URLs and references that do
/// not start with the prefix are never touched.
pub fn normalize_src(src: &str, static_prefix: &str) -> Option<String> {
    let trimmed = src.trim();
    let prefix = static_prefix.trim_end_matches('/');
    if trimmed.is_empty() || prefix.is_empty() || is_external(trimmed) {
        return None;
    }

    let rest = trimmed.strip_prefix(prefix)?;
    if !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    if rest.is_empty() {
        return Some("/".to_string());
    }
    Some(rest.to_string())
}

/// Absolute URLs, protocol-relative URLs and `data:` URIs are left alone
fn is_external(src: &str) -> bool {
    if src.starts_with("//") {
        return true;
    }
    match src.find(':') {
        Some(colon) => !src[..colon].contains('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::pipeline::TransformOptions;
    use quire_types::dom::Element;

    #[test]
    fn test_normalize_src() {
        assert_eq!(normalize_src("/public/a.png", "/public"), Some("/a.png".into()));
        assert_eq!(normalize_src("/public/img/a.png", "/public/"), Some("/img/a.png".into()));
        assert_eq!(normalize_src("images/a.png", "/public"), None);
        assert_eq!(normalize_src("./a.png", "/public"), None);
        assert_eq!(normalize_src("../shared/a.png", "/public"), None);
        assert_eq!(normalize_src("/a.png", "/public"), None);
        assert_eq!(normalize_src("/publications/a.png", "/public"), None);
        assert_eq!(normalize_src("https://cdn.dev/a.png", "/public"), None);
        assert_eq!(normalize_src("http://cdn.dev/a.png", "/public"), None);
        assert_eq!(normalize_src("data:image/png;base64,AA", "/public"), None);
    }

    fn dom_with_img(src: &str) -> Dom {
        let mut dom = Dom::new();
        let root = dom.root();
        let img = dom.create_element(Element::new("img").with_attr("src", src));
        dom.append_child(root, img);
        dom
    }

    #[test]
    fn test_publish_mode_rewrites() {
        let mut dom = dom_with_img("/public/hero.jpg");
        let mut ctx = TransformContext::default();
        ImagePathStage.apply(&mut dom, &mut ctx);
        assert_eq!(dom.to_html(), r#"<img src="/hero.jpg">"#);
    }

    #[test]
    fn test_relative_reference_untouched() {
        let mut dom = dom_with_img("./diagrams/flow.png");
        ImagePathStage.apply(&mut dom, &mut TransformContext::default());
        assert_eq!(dom.to_html(), r#"<img src="./diagrams/flow.png">"#);
    }

    #[test]
    fn test_development_mode_keeps_source() {
        let mut dom = dom_with_img("/public/hero.jpg");
        let mut ctx = TransformContext::new(TransformOptions {
            mode: BuildMode::Development,
            ..TransformOptions::default()
        });
        ImagePathStage.apply(&mut dom, &mut ctx);
        assert_eq!(dom.to_html(), r#"<img src="/public/hero.jpg">"#);
    }
}
