use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::model::{Document, ElementNode, Marks, Node, TextNode};
use crate::plugin::PluginRegistry;
use crate::view::{ViewElement, ViewNode};

/// Which view a model is rendered for: the persisted markup or the live
/// editing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DowncastMode {
    Data,
    Editing,
}

/// Renders one model element kind in one mode. The pipeline appends the
/// rendered model children after whatever children `to_view` returns.
pub trait ElementDowncast: Send + Sync {
    fn model_kind(&self) -> &'static str;
    fn mode(&self) -> DowncastMode;
    fn to_view(&self, element: &ElementNode) -> ViewElement;
}

#[derive(Default)]
pub struct DowncastTable {
    converters: HashMap<(String, DowncastMode), Box<dyn ElementDowncast>>,
}

impl DowncastTable {
    pub fn register(&mut self, converter: Box<dyn ElementDowncast>) -> Result<(), RegistryError> {
        let key = (converter.model_kind().to_string(), converter.mode());
        if self.converters.contains_key(&key) {
            return Err(RegistryError::DuplicateDowncast {
                kind: key.0,
                mode: key.1,
            });
        }
        self.converters.insert(key, converter);
        Ok(())
    }

    pub fn get(&self, kind: &str, mode: DowncastMode) -> Option<&dyn ElementDowncast> {
        self.converters
            .get(&(kind.to_string(), mode))
            .map(Box::as_ref)
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

/// Renders the whole document under a `$root` view element.
pub fn downcast(doc: &Document, registry: &PluginRegistry, mode: DowncastMode) -> ViewElement {
    let mut root = ViewElement::root(Vec::new());
    render_children(&doc.children, registry.downcasts(), mode, &mut root.children);
    root
}

fn render_children(
    children: &[Node],
    table: &DowncastTable,
    mode: DowncastMode,
    out: &mut Vec<ViewNode>,
) {
    for node in children {
        match node {
            Node::Text(text) => out.push(render_text(text)),
            Node::Element(el) => match table.get(&el.kind, mode) {
                Some(converter) => {
                    let mut view = converter.to_view(el);
                    render_children(&el.children, table, mode, &mut view.children);
                    out.push(ViewNode::Element(view));
                }
                None => {
                    tracing::trace!(target: "plate_layout::downcast", kind = %el.kind, ?mode, "no converter, rendering children in place");
                    render_children(&el.children, table, mode, out);
                }
            },
        }
    }
}

fn render_text(text: &TextNode) -> ViewNode {
    let Marks { bold, italic } = text.marks;
    let mut node = ViewNode::text(text.text.clone());
    if italic {
        node = ViewElement::new("i").with_child(node).into();
    }
    if bold {
        node = ViewElement::new("strong").with_child(node).into();
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_wrap_bold_outside_italic() {
        let text = TextNode {
            text: "x".to_string(),
            marks: Marks {
                bold: true,
                italic: true,
            },
        };
        let ViewNode::Element(el) = render_text(&text) else {
            panic!("expected element");
        };
        assert_eq!(el.to_html(), "<strong><i>x</i></strong>");
    }

    #[test]
    fn unknown_kinds_render_children_in_place() {
        let registry = PluginRegistry::default();
        let doc = Document::new(vec![Node::Element(
            ElementNode::new("mystery").with_children(vec![Node::text("a"), Node::text("b")]),
        )]);
        let view = downcast(&doc, &registry, DowncastMode::Data);
        assert_eq!(view.inner_html(), "ab");
    }
}
