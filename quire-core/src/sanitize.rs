//! Allow-list markup filtering.
//!
//! Two independent policies: [`Policy::article`] for build-time prose and
//! [`Policy::diagram`] for SVG produced by the runtime diagram engine. Input is
//! parsed with html5ever (via [`Dom::parse_fragment`]) and re-serialized,
//! emitting only what the policy allows.

use quire_types::dom::{escape_attr, escape_text, is_void_element, Dom, NodeId, NodeKind};
use quire_types::AlertKind;
use std::collections::{HashMap, HashSet};

/// Which classes an allowed tag may carry
#[derive(Debug, Clone)]
pub enum ClassRule {
    Any,
    Only(HashSet<String>),
}

impl ClassRule {
    fn only<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ClassRule::Only(classes.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, Default)]
struct TagRule {
    attrs: HashSet<&'static str>,
    classes: Option<ClassRule>,
}

impl TagRule {
    fn with_attrs(attrs: &[&'static str]) -> Self {
        Self {
            attrs: attrs.iter().copied().collect(),
            classes: None,
        }
    }

    fn classes(mut self, rule: ClassRule) -> Self {
        self.classes = Some(rule);
        self
    }
}

/// A sanitization allow-list
#[derive(Debug, Clone)]
pub struct Policy {
    name: &'static str,
    /// Keyed by lowercase tag name
    tags: HashMap<&'static str, TagRule>,
    /// Attributes allowed on every allowed tag (lowercase)
    global_attrs: HashSet<&'static str>,
    /// Tags removed together with everything inside them
    clean_content: HashSet<&'static str>,
    allow_data_attrs: bool,
    allow_aria_attrs: bool,
    url_schemes: HashSet<&'static str>,
    /// Links may only point inside the document (`#...`)
    fragment_only_links: bool,
}

const URL_ATTRS: &[&str] = &["href", "src", "xlink:href", "cite", "poster"];

impl Policy {
    /// Build-time policy for rendered articles
    pub fn article() -> Self {
        let mut tags = HashMap::new();

        for tag in [
            "ul", "li", "strong", "em", "b", "i", "u", "s", "del", "ins", "mark", "small",
            "sub", "blockquote", "table", "thead", "tbody", "tfoot", "tr", "hr", "br", "details",
            "summary", "figure", "figcaption", "dl", "dt", "dd", "abbr", "kbd", "section",
        ] {
            tags.insert(tag, TagRule::default());
        }
        for heading in ["h1", "h2", "h3", "h4", "h5", "h6"] {
            tags.insert(heading, TagRule::default());
        }
        tags.insert("ol", TagRule::with_attrs(&["start"]));
        tags.insert("a", TagRule::with_attrs(&["href", "rel"]));
        tags.insert("th", TagRule::with_attrs(&["align", "colspan", "rowspan"]));
        tags.insert("td", TagRule::with_attrs(&["align", "colspan", "rowspan"]));
        tags.insert("input", TagRule::with_attrs(&["type", "checked", "disabled"]));
        tags.insert("code", TagRule::default().classes(ClassRule::Any));
        tags.insert("pre", TagRule::default().classes(ClassRule::Any));
        tags.insert("span", TagRule::default().classes(ClassRule::Any));
        tags.insert(
            "img",
            TagRule::with_attrs(&["src", "alt", "style", "width", "height", "loading"])
                .classes(ClassRule::only(["floating-image"])),
        );
        tags.insert(
            "p",
            TagRule::default().classes(ClassRule::only(["alert-title"])),
        );
        tags.insert(
            "sup",
            TagRule::default().classes(ClassRule::only(["footnote-ref", "footnote-label"])),
        );

        let mut div_classes = vec![
            "alert".to_string(),
            "alert-content".to_string(),
            "code-block".to_string(),
            "code-block-label".to_string(),
            "table-scroll".to_string(),
            "table-fade".to_string(),
            "footnote".to_string(),
        ];
        div_classes.extend(AlertKind::ALL.iter().map(|k| format!("alert-{}", k.as_str())));
        tags.insert(
            "div",
            TagRule::with_attrs(&["aria-hidden"]).classes(ClassRule::only(div_classes)),
        );

        Self {
            name: "article",
            tags,
            global_attrs: ["id", "title"].into_iter().collect(),
            clean_content: [
                "script", "style", "iframe", "object", "embed", "noscript", "template",
            ]
            .into_iter()
            .collect(),
            allow_data_attrs: true,
            allow_aria_attrs: false,
            url_schemes: ["http", "https", "mailto"].into_iter().collect(),
            fragment_only_links: false,
        }
    }

    /// Runtime policy for diagram engine output (SVG plus `foreignObject` labels)
    pub fn diagram() -> Self {
        let mut tags = HashMap::new();
        for tag in [
            // SVG structure
            "svg", "g", "path", "rect", "circle", "ellipse", "line", "polyline", "polygon",
            "text", "tspan", "textpath", "defs", "marker", "clippath", "lineargradient",
            "radialgradient", "stop", "title", "desc", "use", "style", "symbol", "pattern",
            "mask", "foreignobject",
            // HTML labels inside foreignObject
            "div", "span", "p", "br", "b", "i", "em", "strong", "code", "small",
        ] {
            tags.insert(tag, TagRule::default().classes(ClassRule::Any));
        }

        let global_attrs = [
            "id", "style", "viewbox", "preserveaspectratio", "xmlns", "version", "role",
            "d", "fill", "fill-opacity", "fill-rule", "stroke", "stroke-width",
            "stroke-dasharray", "stroke-linecap", "stroke-linejoin", "stroke-opacity",
            "opacity", "transform", "x", "y", "x1", "y1", "x2", "y2", "cx", "cy", "r", "rx",
            "ry", "dx", "dy", "width", "height", "points", "marker-start", "marker-mid",
            "marker-end", "markerwidth", "markerheight", "markerunits", "refx", "refy",
            "orient", "clip-path", "gradientunits", "offset", "stop-color", "stop-opacity",
            "text-anchor", "dominant-baseline", "alignment-baseline", "font-family",
            "font-size", "font-weight", "href", "xlink:href",
        ]
        .into_iter()
        .collect();

        Self {
            name: "diagram",
            tags,
            global_attrs,
            clean_content: ["script", "iframe", "object", "embed", "noscript", "template"]
                .into_iter()
                .collect(),
            allow_data_attrs: true,
            allow_aria_attrs: true,
            url_schemes: HashSet::new(),
            fragment_only_links: true,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn allows_tag(&self, tag: &str) -> bool {
        self.tags.contains_key(tag.to_ascii_lowercase().as_str())
    }

    /// Filter `html` down to what this policy allows
    pub fn clean(&self, html: &str) -> String {
        let dom = Dom::parse_fragment(html);
        let mut out = String::with_capacity(html.len());
        for child in dom.children(dom.root()) {
            self.write_node(&dom, *child, &mut out);
        }
        out
    }

    fn write_node(&self, dom: &Dom, id: NodeId, out: &mut String) {
        let el = match dom.kind(id) {
            NodeKind::Text(text) => {
                out.push_str(&escape_text(text));
                return;
            }
            // Fragments parsed from markup never hold raw nodes
            NodeKind::Raw(_) | NodeKind::Root => return,
            NodeKind::Element(el) => el,
        };

        let tag = el.tag.to_ascii_lowercase();
        if self.clean_content.contains(tag.as_str()) {
            return;
        }

        let Some(rule) = self.tags.get(tag.as_str()) else {
            // Unknown tag: drop it, keep what it wraps
            for child in dom.children(id) {
                self.write_node(dom, *child, out);
            }
            return;
        };

        out.push('<');
        out.push_str(&el.tag);
        for (name, value) in &el.attrs {
            if let Some(value) = self.filter_attr(rule, name, value) {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&escape_attr(&value));
                out.push('"');
            }
        }
        out.push('>');

        if is_void_element(&tag) {
            return;
        }
        for child in dom.children(id) {
            self.write_node(dom, *child, out);
        }
        out.push_str("</");
        out.push_str(&el.tag);
        out.push('>');
    }

    fn filter_attr(&self, rule: &TagRule, name: &str, value: &str) -> Option<String> {
        let lower = name.to_ascii_lowercase();

        if lower.starts_with("on") {
            return None;
        }

        if lower == "class" {
            return match rule.classes.as_ref()? {
                ClassRule::Any => Some(value.to_string()),
                ClassRule::Only(allowed) => {
                    let kept = value
                        .split_whitespace()
                        .filter(|c| allowed.contains(*c))
                        .collect::<Vec<_>>();
                    (!kept.is_empty()).then(|| kept.join(" "))
                }
            };
        }

        let allowed = rule.attrs.contains(lower.as_str())
            || self.global_attrs.contains(lower.as_str())
            || (self.allow_data_attrs && lower.starts_with("data-"))
            || (self.allow_aria_attrs && lower.starts_with("aria-"));
        if !allowed {
            return None;
        }

        if URL_ATTRS.contains(&lower.as_str()) && !self.url_allowed(value) {
            return None;
        }

        if lower == "style" && !style_allowed(value) {
            return None;
        }

        Some(value.to_string())
    }

    fn url_allowed(&self, value: &str) -> bool {
        let compact = value
            .chars()
            .filter(|c| !c.is_whitespace() && !c.is_control())
            .collect::<String>()
            .to_ascii_lowercase();

        if compact.starts_with('#') {
            return true;
        }
        if self.fragment_only_links {
            return false;
        }

        let scheme_end = compact.find(':');
        let path_start = compact.find(['/', '?', '#']);
        match (scheme_end, path_start) {
            (Some(colon), Some(slash)) if slash < colon => true,
            (Some(colon), _) => self.url_schemes.contains(&compact[..colon]),
            (None, _) => true,
        }
    }
}

fn style_allowed(value: &str) -> bool {
    let compact = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    !compact.contains("expression(") && !compact.contains("javascript:")
}
