//! Horizontal-scroll wrapper for tables.

use super::pipeline::{Stage, TransformContext};
use quire_types::dom::{Dom, Element, NodeId, Selector};

pub struct TableWrapStage;

impl Stage for TableWrapStage {
    fn name(&self) -> &'static str {
        "tables"
    }

    fn apply(&self, dom: &mut Dom, ctx: &mut TransformContext) {
        for table in dom.select(&Selector::tag("table")) {
            if ctx.is_visited(self.name(), table) || is_wrapped(dom, table) {
                continue;
            }
            ctx.mark_visited(self.name(), table);

            let wrapper =
                dom.create_element(Element::new("div").with_attr("class", "table-scroll"));
            let fade = dom.create_element(
                Element::new("div")
                    .with_attr("class", "table-fade")
                    .with_attr("aria-hidden", "true"),
            );
            dom.wrap(table, wrapper);
            dom.append_child(wrapper, fade);
        }
    }
}

fn is_wrapped(dom: &Dom, table: NodeId) -> bool {
    dom.parent(table)
        .is_some_and(|parent| dom.has_class(parent, "table-scroll"))
}
