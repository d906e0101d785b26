//! Code-block wrapper with a language label.

use super::pipeline::{Stage, TransformContext};
use quire_types::dom::{Dom, Element, NodeId, Selector};

/// Label shown above diagram blocks
pub const DIAGRAM_LABEL: &str = "Diagram";

pub struct CodeBlockWrapStage;

impl Stage for CodeBlockWrapStage {
    fn name(&self) -> &'static str {
        "code-blocks"
    }

    fn apply(&self, dom: &mut Dom, ctx: &mut TransformContext) {
        for pre in dom.select(&Selector::tag("pre").attr("data-language")) {
            if ctx.is_visited(self.name(), pre) || is_wrapped(dom, pre) {
                continue;
            }
            ctx.mark_visited(self.name(), pre);

            let language = dom.attr(pre, "data-language").unwrap_or_default().to_string();
            let diagram = ctx.options().is_diagram(&language);
            let label = if diagram {
                DIAGRAM_LABEL.to_string()
            } else {
                language.to_uppercase()
            };

            if diagram {
                dom.set_attr(pre, "data-diagram", "true");
            }

            let wrapper = dom.create_element(
                Element::new("div")
                    .with_attr("class", "code-block")
                    .with_attr("data-language", &language),
            );
            let label = dom.create_element_with_text(
                Element::new("div").with_attr("class", "code-block-label"),
                &label,
            );
            dom.wrap(pre, wrapper);
            dom.prepend_child(wrapper, label);
        }
    }
}

fn is_wrapped(dom: &Dom, pre: NodeId) -> bool {
    dom.parent(pre)
        .is_some_and(|parent| dom.has_class(parent, "code-block"))
}
