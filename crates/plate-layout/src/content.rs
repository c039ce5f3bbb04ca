use crate::conversion::{
    convert_element_to_element, ConsumePattern, ConversionData, DowncastMode, ElementDowncast,
    UpcastContext, UpcastConverter, UpcastTarget, ViewItem,
};
use crate::model::{
    Document, ElementNode, Marks, ModelRange, Node, Position, PARAGRAPH_KIND, ROOT_KIND, TEXT_KIND,
};
use crate::ops::Op;
use crate::plugin::{EditorPlugin, NormalizePass, PluginRegistry};
use crate::schema::{ChildConstraint, NodeRole, NodeSpec};
use crate::view::{ViewElement, ViewNode};

/// Root, text and paragraph: the content every other block nests.
pub struct ContentPlugin;

impl EditorPlugin for ContentPlugin {
    fn id(&self) -> &'static str {
        "content"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::new(ROOT_KIND, NodeRole::Block, ChildConstraint::BlockOnly).limit(),
            NodeSpec::new(TEXT_KIND, NodeRole::Inline, ChildConstraint::None),
            NodeSpec::new(PARAGRAPH_KIND, NodeRole::Block, ChildConstraint::InlineOnly),
        ]
    }

    fn upcast_converters(&self) -> Vec<Box<dyn UpcastConverter>> {
        vec![
            Box::new(ParagraphUpcast),
            Box::new(TextUpcast),
            Box::new(MarkUpcast::new("strong", |m| m.bold = true)),
            Box::new(MarkUpcast::new("b", |m| m.bold = true)),
            Box::new(MarkUpcast::new("em", |m| m.italic = true)),
            Box::new(MarkUpcast::new("i", |m| m.italic = true)),
        ]
    }

    fn downcasts(&self) -> Vec<Box<dyn ElementDowncast>> {
        vec![
            Box::new(ParagraphDowncast(DowncastMode::Data)),
            Box::new(ParagraphDowncast(DowncastMode::Editing)),
        ]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![
            Box::new(EnsureNonEmptyDocument),
            Box::new(MergeAdjacentTextLeaves),
        ]
    }
}

struct ParagraphUpcast;

impl UpcastConverter for ParagraphUpcast {
    fn id(&self) -> &'static str {
        "content.paragraph"
    }

    fn target(&self) -> UpcastTarget {
        UpcastTarget::Element("p")
    }

    fn convert(&self, item: &ViewItem<'_>, data: &mut ConversionData, cx: &mut UpcastContext<'_>) {
        convert_element_to_element(
            item,
            data,
            cx,
            &ConsumePattern::name(),
            ElementNode::new(PARAGRAPH_KIND),
        );
    }
}

/// Text goes where text is allowed. Where only blocks are allowed it is
/// wrapped in a paragraph of its own, unless it is only whitespace.
struct TextUpcast;

impl UpcastConverter for TextUpcast {
    fn id(&self) -> &'static str {
        "content.text"
    }

    fn target(&self) -> UpcastTarget {
        UpcastTarget::Text
    }

    fn convert(&self, item: &ViewItem<'_>, data: &mut ConversionData, cx: &mut UpcastContext<'_>) {
        let ViewNode::Text(text) = item.node else {
            return;
        };
        if !cx.consumables().test(&item.path, item.node, &ConsumePattern::name()) {
            return;
        }

        let cursor = data.model_cursor.clone();
        let node = if cx.check_child(&cursor, TEXT_KIND) {
            Node::text(text.data.clone())
        } else if cx.check_child(&cursor, PARAGRAPH_KIND) && !text.data.trim().is_empty() {
            Node::paragraph(text.data.clone())
        } else {
            return;
        };

        if cx.writer().insert(node, &cursor).is_err() {
            return;
        }
        cx.consumable().consume_name(&item.path, item.node);

        let end = Position::after(&cursor.path);
        data.model_range = Some(ModelRange::new(cursor, end.clone()));
        data.model_cursor = end;
    }
}

/// Converts the children of an inline formatting element in place and sets a
/// mark on every text node they produced.
struct MarkUpcast {
    name: &'static str,
    apply: fn(&mut Marks),
}

impl MarkUpcast {
    fn new(name: &'static str, apply: fn(&mut Marks)) -> Self {
        Self { name, apply }
    }
}

impl UpcastConverter for MarkUpcast {
    fn id(&self) -> &'static str {
        "content.mark"
    }

    fn target(&self) -> UpcastTarget {
        UpcastTarget::Element(self.name)
    }

    fn convert(&self, item: &ViewItem<'_>, data: &mut ConversionData, cx: &mut UpcastContext<'_>) {
        if !cx.consumable().consume_name(&item.path, item.node) {
            return;
        }

        let result = cx.convert_children(item, data.model_cursor.clone());
        cx.writer().update_marks(&result.model_range, self.apply);

        data.model_range = Some(result.model_range);
        data.model_cursor = result.model_cursor;
    }
}

struct ParagraphDowncast(DowncastMode);

impl ElementDowncast for ParagraphDowncast {
    fn model_kind(&self) -> &'static str {
        PARAGRAPH_KIND
    }

    fn mode(&self) -> DowncastMode {
        self.0
    }

    fn to_view(&self, _element: &ElementNode) -> ViewElement {
        ViewElement::new("p")
    }
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "content.ensure_non_empty"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        if doc.root != ROOT_KIND || !doc.children.is_empty() {
            return Vec::new();
        }
        vec![Op::InsertNode {
            path: vec![0],
            node: Node::paragraph(""),
        }]
    }
}

/// Joins runs of sibling text nodes that carry the same marks.
struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "content.merge_text"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        fn walk(children: &[Node], parent: &mut Vec<usize>, ops: &mut Vec<Vec<Op>>) {
            let mut ix = 0;
            while ix < children.len() {
                let Node::Text(first) = &children[ix] else {
                    if let Node::Element(el) = &children[ix] {
                        parent.push(ix);
                        walk(&el.children, parent, ops);
                        parent.pop();
                    }
                    ix += 1;
                    continue;
                };

                let mut end = ix + 1;
                let mut tail = String::new();
                while let Some(Node::Text(next)) = children.get(end) {
                    if next.marks != first.marks {
                        break;
                    }
                    tail.push_str(&next.text);
                    end += 1;
                }

                if end > ix + 1 {
                    let mut run = Vec::new();
                    let mut first_path = parent.clone();
                    first_path.push(ix);
                    run.push(Op::InsertText {
                        path: first_path,
                        offset: first.text.len(),
                        text: tail,
                    });
                    for removed in (ix + 1..end).rev() {
                        let mut path = parent.clone();
                        path.push(removed);
                        run.push(Op::RemoveNode { path });
                    }
                    ops.push(run);
                }
                ix = end;
            }
        }

        let mut runs = Vec::new();
        walk(&doc.children, &mut Vec::new(), &mut runs);
        // Last run first: its removals never shift an earlier run's paths.
        runs.into_iter().rev().flatten().collect()
    }
}
