use crate::conversion::{DowncastMode, ElementDowncast};
use crate::model::{ElementNode, Node};
use crate::plugin::EditorPlugin;
use crate::schema::{ChildConstraint, NodeRole, NodeSpec};
use crate::view::ViewElement;
use crate::widget::to_widget_editable;

pub const EDITABLE_KIND: &str = "layout-editable";

/// An independently editable block container. It can only live where a
/// parent names it explicitly, and content never splits out of it.
pub struct EditablePlugin;

impl EditorPlugin for EditablePlugin {
    fn id(&self) -> &'static str {
        "editable"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::new(EDITABLE_KIND, NodeRole::Nested, ChildConstraint::BlockOnly).limit()]
    }

    fn downcasts(&self) -> Vec<Box<dyn ElementDowncast>> {
        vec![
            Box::new(EditableDowncast(DowncastMode::Data)),
            Box::new(EditableDowncast(DowncastMode::Editing)),
        ]
    }
}

/// Appends one empty editable region as the last child of `parent`.
pub fn create_layout_editable(parent: &mut ElementNode) {
    parent.children.push(editable_with(Vec::new()));
}

pub fn editable_with(children: Vec<Node>) -> Node {
    Node::Element(ElementNode::new(EDITABLE_KIND).with_children(children))
}

struct EditableDowncast(DowncastMode);

impl ElementDowncast for EditableDowncast {
    fn model_kind(&self) -> &'static str {
        EDITABLE_KIND
    }

    fn mode(&self) -> DowncastMode {
        self.0
    }

    fn to_view(&self, _element: &ElementNode) -> ViewElement {
        let div = ViewElement::new("div");
        match self.0 {
            DowncastMode::Data => div,
            DowncastMode::Editing => to_widget_editable(div),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_appends_empty_regions_in_order() {
        let mut parent = ElementNode::new("layout-column")
            .with_children(vec![editable_with(vec![Node::paragraph("A")])]);

        create_layout_editable(&mut parent);
        create_layout_editable(&mut parent);

        assert_eq!(parent.children.len(), 3);
        assert_eq!(parent.children[0].text_content(), "A");
        assert!(parent.children[1..]
            .iter()
            .all(|region| region.kind() == EDITABLE_KIND
                && region.as_element().is_some_and(|el| el.children.is_empty())));
    }
}
