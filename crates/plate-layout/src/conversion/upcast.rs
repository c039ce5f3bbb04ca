use crate::conversion::consumable::{ConsumePattern, Consumables, ViewPath};
use crate::error::WriterError;
use crate::model::{Document, ElementNode, ModelRange, Node, Path, Position, ROOT_KIND};
use crate::plugin::PluginRegistry;
use crate::schema::Schema;
use crate::view::{ViewElement, ViewNode};
use crate::writer::ModelWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpcastTarget {
    Element(&'static str),
    AnyElement,
    Text,
}

impl UpcastTarget {
    pub fn accepts(&self, node: &ViewNode) -> bool {
        match (self, node) {
            (UpcastTarget::Element(name), ViewNode::Element(el)) => el.name == *name,
            (UpcastTarget::AnyElement, ViewNode::Element(_)) => true,
            (UpcastTarget::Text, ViewNode::Text(_)) => true,
            _ => false,
        }
    }
}

/// A view node together with its place in the converted view tree.
#[derive(Debug, Clone)]
pub struct ViewItem<'v> {
    pub node: &'v ViewNode,
    pub path: ViewPath,
}

impl<'v> ViewItem<'v> {
    pub fn element(&self) -> Option<&'v ViewElement> {
        self.node.as_element()
    }

    pub fn children(&self) -> Vec<ViewItem<'v>> {
        match self.node {
            ViewNode::Element(el) => child_items(&el.children, &self.path),
            ViewNode::Text(_) | ViewNode::Ui(_) => Vec::new(),
        }
    }
}

fn child_items<'v>(nodes: &'v [ViewNode], parent: &[usize]) -> Vec<ViewItem<'v>> {
    nodes
        .iter()
        .enumerate()
        .map(|(ix, node)| {
            let mut path = parent.to_vec();
            path.push(ix);
            ViewItem { node, path }
        })
        .collect()
}

/// Per-item conversion state. A converter that handles the item sets
/// `model_range` and moves `model_cursor` to where the next sibling goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionData {
    pub model_cursor: Position,
    pub model_range: Option<ModelRange>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub model_range: ModelRange,
    pub model_cursor: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitResult {
    pub position: Position,
    /// Set when an ancestor had to be split; conversion continues at its start.
    pub cursor_parent: Option<Path>,
}

pub trait UpcastConverter: Send + Sync {
    fn id(&self) -> &'static str;
    fn target(&self) -> UpcastTarget;
    fn convert(&self, item: &ViewItem<'_>, data: &mut ConversionData, cx: &mut UpcastContext<'_>);
}

/// Everything a converter may touch while one view tree is converted: the
/// writer of the model tree being filled, the shared record of consumed view
/// aspects, the schema and the converters for recursive conversion.
pub struct UpcastContext<'a> {
    writer: ModelWriter<'a>,
    consumable: &'a mut Consumables,
    schema: &'a Schema,
    converters: &'a [Box<dyn UpcastConverter>],
}

impl<'a> UpcastContext<'a> {
    pub fn new(
        doc: &'a mut Document,
        consumable: &'a mut Consumables,
        schema: &'a Schema,
        converters: &'a [Box<dyn UpcastConverter>],
    ) -> Self {
        Self {
            writer: ModelWriter::new(doc),
            consumable,
            schema,
            converters,
        }
    }

    pub fn writer(&mut self) -> &mut ModelWriter<'a> {
        &mut self.writer
    }

    pub fn doc(&self) -> &Document {
        self.writer.doc()
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn consumable(&mut self) -> &mut Consumables {
        self.consumable
    }

    pub fn consumables(&self) -> &Consumables {
        self.consumable
    }

    /// Inserts `element` at `position`, dropping attributes its kind does not
    /// declare.
    pub fn insert_element(
        &mut self,
        mut element: ElementNode,
        position: &Position,
    ) -> Result<(), WriterError> {
        let schema = self.schema;
        let kind = element.kind.clone();
        element.attrs.retain(|key, _| {
            let allowed = schema.allows_attribute(&kind, key);
            if !allowed {
                tracing::debug!(target: "plate_layout::upcast", %kind, attribute = %key, "dropping undeclared attribute");
            }
            allowed
        });
        self.writer.insert(Node::Element(element), position)
    }

    pub fn check_child(&self, position: &Position, kind: &str) -> bool {
        self.writer
            .parent_kind(position)
            .is_some_and(|parent| self.schema.allows_child(parent, kind))
    }

    /// Finds the nearest ancestor of `position` that accepts `kind` and splits
    /// everything in between. `None` when no ancestor up to the first limit
    /// element accepts it.
    pub fn split_to_allowed_parent(
        &mut self,
        kind: &str,
        position: &Position,
    ) -> Option<SplitResult> {
        let parent = position.parent_path();
        let mut allowed_depth = None;
        for depth in (0..=parent.len()).rev() {
            let ancestor_kind = self.writer.doc().parent_kind(&parent[..depth])?;
            if self.schema.allows_child(ancestor_kind, kind) {
                allowed_depth = Some(depth);
                break;
            }
            if self.schema.is_limit(ancestor_kind) {
                break;
            }
        }
        let depth = allowed_depth?;

        if depth == parent.len() {
            return Some(SplitResult {
                position: position.clone(),
                cursor_parent: None,
            });
        }

        match self.writer.split(position, &parent[..depth]) {
            Ok(outcome) => Some(SplitResult {
                position: outcome.position,
                cursor_parent: Some(outcome.cursor_parent),
            }),
            Err(err) => {
                tracing::warn!(target: "plate_layout::upcast", %err, kind, "split to allowed parent failed");
                None
            }
        }
    }

    pub fn convert_item(&mut self, item: &ViewItem<'_>, cursor: Position) -> ConversionData {
        let mut data = ConversionData {
            model_cursor: cursor,
            model_range: None,
        };

        let converters = self.converters;
        for converter in converters.iter().filter(|c| c.target().accepts(item.node)) {
            converter.convert(item, &mut data, self);
        }

        if data.model_range.is_none() {
            self.convert_by_default(item, &mut data);
        }
        data
    }

    pub fn convert_children(&mut self, parent: &ViewItem<'_>, cursor: Position) -> ConversionResult {
        self.convert_items(&parent.children(), cursor)
    }

    pub fn convert_items(&mut self, items: &[ViewItem<'_>], cursor: Position) -> ConversionResult {
        let start = cursor.clone();
        let mut cursor = cursor;
        for item in items {
            cursor = self.convert_item(item, cursor).model_cursor;
        }
        ConversionResult {
            model_range: ModelRange::new(start, cursor.clone()),
            model_cursor: cursor,
        }
    }

    /// Converts the children of `parent` into a fresh fragment whose root
    /// behaves like a `root_kind` element, and hands back its content.
    /// Nothing outside the fragment can be split from in here.
    pub fn convert_children_detached(&mut self, parent: &ViewItem<'_>, root_kind: &str) -> Vec<Node> {
        let mut fragment = Document::with_root(root_kind);
        {
            let mut nested =
                UpcastContext::new(&mut fragment, self.consumable, self.schema, self.converters);
            nested.convert_children(parent, Position::root(0));
            nested.finish();
        }
        fragment.children
    }

    /// Removes the empty halves left behind by splitting.
    pub fn finish(mut self) -> usize {
        self.writer.remove_empty_split_parts()
    }

    fn convert_by_default(&mut self, item: &ViewItem<'_>, data: &mut ConversionData) {
        match item.node {
            ViewNode::Element(el) => {
                if !self.consumable.consume_name(&item.path, item.node) {
                    return;
                }
                tracing::trace!(target: "plate_layout::upcast", name = %el.name, "converting children of unhandled element");
                let result = self.convert_children(item, data.model_cursor.clone());
                data.model_range = Some(result.model_range);
                data.model_cursor = result.model_cursor;
            }
            ViewNode::Text(t) => {
                if self.consumable.test(&item.path, item.node, &ConsumePattern::name()) {
                    tracing::debug!(target: "plate_layout::upcast", text = %t.data, "dropping text with no place in the model");
                }
            }
            ViewNode::Ui(_) => {}
        }
    }
}

/// Converts a view element into `element`, placed at the nearest allowed
/// ancestor of the cursor, and converts the view children into it. When the
/// children split the new element the range spans every fragment.
pub fn convert_element_to_element(
    item: &ViewItem<'_>,
    data: &mut ConversionData,
    cx: &mut UpcastContext<'_>,
    pattern: &ConsumePattern,
    element: ElementNode,
) {
    if !cx.consumables().test(&item.path, item.node, pattern) {
        return;
    }

    let Some(split) = cx.split_to_allowed_parent(&element.kind, &data.model_cursor) else {
        return;
    };

    // Tracked from here on: the insert and the children may both move it.
    let continue_in = split
        .cursor_parent
        .map(|path| cx.writer().track(path));
    if let Err(err) = cx.insert_element(element, &split.position) {
        tracing::warn!(target: "plate_layout::upcast", %err, "element insertion failed");
        return;
    }
    cx.consumable().consume(&item.path, item.node, pattern);

    let element_path = split.position.path.clone();

    let inner = cx.convert_children(item, Position::at(&element_path, 0));
    let last_fragment = inner
        .model_cursor
        .path
        .get(..element_path.len())
        .map(<[usize]>::to_vec)
        .unwrap_or_else(|| element_path.clone());

    let range = ModelRange::new(
        Position::before(&element_path),
        Position::after(&last_fragment),
    );
    data.model_cursor = match continue_in {
        Some(handle) => Position::at(cx.writer().tracked_path(handle), 0),
        None => range.end.clone(),
    };
    data.model_range = Some(range);
}

/// Converts the children of a view root into a `$root` document.
pub fn upcast(view_root: &ViewElement, registry: &PluginRegistry) -> Document {
    upcast_into(
        view_root,
        ROOT_KIND,
        registry.schema(),
        registry.upcast_converters(),
    )
}

/// Converts the children of `view_root` into a new document whose root is of
/// `root_kind`.
pub fn upcast_into(
    view_root: &ViewElement,
    root_kind: &str,
    schema: &Schema,
    converters: &[Box<dyn UpcastConverter>],
) -> Document {
    let mut doc = Document::with_root(root_kind);
    let mut consumables = Consumables::default();
    {
        let mut cx = UpcastContext::new(&mut doc, &mut consumables, schema, converters);
        let items = child_items(&view_root.children, &[]);
        cx.convert_items(&items, Position::root(0));
        let removed = cx.finish();
        if removed > 0 {
            tracing::trace!(target: "plate_layout::upcast", removed, "removed empty split fragments");
        }
    }
    doc
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::{ChildConstraint, NodeRole, NodeSpec};

    #[test]
    fn inserted_elements_keep_only_declared_attributes() {
        let mut schema = Schema::default();
        schema
            .register(NodeSpec::new(ROOT_KIND, NodeRole::Block, ChildConstraint::BlockOnly).limit())
            .unwrap();
        schema
            .register(
                NodeSpec::new("grid", NodeRole::Block, ChildConstraint::None).attributes(["size"]),
            )
            .unwrap();

        let mut doc = Document::default();
        let mut consumables = Consumables::default();
        let mut cx = UpcastContext::new(&mut doc, &mut consumables, &schema, &[]);
        let grid = ElementNode::new("grid")
            .with_attr("size", json!(2))
            .with_attr("width", json!(300));
        cx.insert_element(grid, &Position::root(0)).unwrap();
        drop(cx);

        assert_eq!(
            doc.children,
            vec![Node::Element(ElementNode::new("grid").with_attr("size", json!(2)))]
        );
    }
}
