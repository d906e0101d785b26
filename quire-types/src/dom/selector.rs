//! Compound selectors: one tag, classes and attribute tests.
//!
//! Only the subset the pipeline and injectors need: one tag, any number of
//! classes, attribute presence and exact attribute value.

use super::Element;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selector {
    tag: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl Selector {
    /// Matches every element
    pub fn any() -> Self {
        Self::default()
    }

    pub fn tag(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            ..Self::default()
        }
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    /// Require the attribute to be present
    pub fn attr(mut self, name: &str) -> Self {
        self.attrs.push((name.to_string(), None));
        self
    }

    /// Require the attribute to equal `value`
    pub fn attr_eq(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_string(), Some(value.to_string())));
        self
    }

    pub fn matches(&self, el: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if !el.tag.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| el.has_class(c)) {
            return false;
        }
        self.attrs.iter().all(|(name, expected)| match expected {
            None => el.has_attr(name),
            Some(value) => el.attr(name) == Some(value.as_str()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn el(tag: &str, attrs: &[(&str, &str)]) -> Element {
        let mut el = Element::new(tag);
        for (k, v) in attrs {
            el.set_attr(*k, *v);
        }
        el
    }

    #[test]
    fn test_attr_value_matching() {
        let sel = Selector::tag("pre").attr_eq("data-language", "mermaid");
        assert!(sel.matches(&el("pre", &[("data-language", "mermaid")])));
        assert!(!sel.matches(&el("pre", &[("data-language", "rust")])));
        assert!(!sel.matches(&el("pre", &[])));
    }

    #[test]
    fn test_class_matching() {
        let sel = Selector::tag("div").class("code-block");
        assert!(sel.matches(&el("div", &[("class", "x code-block")])));
        assert!(!sel.matches(&el("div", &[("class", "code-blocks")])));
    }
}
