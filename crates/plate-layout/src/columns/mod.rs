mod downcast;
mod upcast;

use std::num::NonZeroUsize;

use serde_json::{json, Value};

use crate::config::LayoutConfig;
use crate::conversion::{DowncastMode, ElementDowncast, UpcastConverter};
use crate::editable::{create_layout_editable, EDITABLE_KIND};
use crate::editor::Editor;
use crate::error::CommandError;
use crate::model::{Document, ElementNode, Node, Position, Selection};
use crate::ops::{Op, Transaction};
use crate::plugin::{
    CommandSpec, EditorPlugin, NormalizePass, PluginRegistry, QuerySpec, ToolbarItem,
};
use crate::schema::{ChildConstraint, NodeRole, NodeSpec};
use crate::writer::find_insertion_path;

pub use downcast::{layout_container, LayoutDowncast};
pub use upcast::{recognize, LayoutMatch, LayoutUpcast};

pub const LAYOUT_KIND: &str = "layout-column";
pub const COLUMNS_ATTR: &str = "columns";
pub const LAYOUT_CLASS: &str = "ck-layout-columns";
/// View element name of one column inside a layout container.
pub const COLUMN_CONTAINER_NAME: &str = "div";
pub const CMD_LAYOUT_COLUMN: &str = "layout-column";
pub const TOOLBAR_GROUP: &str = "layout";

/// The multi-column layout block: a `layout-column` element holding exactly
/// `columns` editable regions.
pub struct LayoutColumnPlugin {
    presets: Vec<usize>,
    max_columns: usize,
}

impl LayoutColumnPlugin {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            presets: config.column_presets.clone(),
            max_columns: config.max_columns,
        }
    }
}

impl Default for LayoutColumnPlugin {
    fn default() -> Self {
        Self::new(&LayoutConfig::default())
    }
}

impl EditorPlugin for LayoutColumnPlugin {
    fn id(&self) -> &'static str {
        "layout-column"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::new(
                LAYOUT_KIND,
                NodeRole::Block,
                ChildConstraint::Only(vec![EDITABLE_KIND.to_string()]),
            )
            .attributes([COLUMNS_ATTR])
            .object(),
        ]
    }

    fn upcast_converters(&self) -> Vec<Box<dyn UpcastConverter>> {
        vec![Box::new(LayoutUpcast {
            max_columns: self.max_columns,
        })]
    }

    fn downcasts(&self) -> Vec<Box<dyn ElementDowncast>> {
        vec![
            Box::new(LayoutDowncast(DowncastMode::Data)),
            Box::new(LayoutDowncast(DowncastMode::Editing)),
        ]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(EnforceLayoutArity)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        let max_columns = self.max_columns;
        vec![
            CommandSpec::new(CMD_LAYOUT_COLUMN, "Insert column layout", move |editor, args| {
                let columns = parse_column_count(args.as_ref(), max_columns)?;
                let tx = insert_layout(editor, columns)?;
                editor.apply(tx)?;
                Ok(())
            })
            .description("Insert a block of side-by-side editable columns.")
            .keywords(["columns", "layout", "grid", "multi-column"])
            .args_example(json!({ "columns": 2 })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("layout.is_active", |editor, _args| {
                let active = nearest_layout(editor.doc(), &editor.selection().focus).is_some();
                Ok(Value::Bool(active))
            }),
            QuerySpec::new("layout.column_count", |editor, _args| {
                let count = nearest_layout(editor.doc(), &editor.selection().focus)
                    .and_then(|path| editor.doc().element(&path))
                    .and_then(|el| el.attr_u64(COLUMNS_ATTR));
                Ok(json!(count))
            }),
        ]
    }

    fn toolbar_items(&self) -> Vec<ToolbarItem> {
        self.presets
            .iter()
            .filter(|&&n| n <= self.max_columns)
            .filter_map(|&n| NonZeroUsize::new(n))
            .map(|n| ToolbarItem {
                id: format!("{CMD_LAYOUT_COLUMN}-{n}"),
                label: preset_label(n),
                command: CMD_LAYOUT_COLUMN.to_string(),
                args: Some(json!({ COLUMNS_ATTR: n.get() })),
                group: Some(TOOLBAR_GROUP.to_string()),
            })
            .collect()
    }
}

fn preset_label(columns: NonZeroUsize) -> String {
    let word = match columns.get() {
        1 => "One",
        2 => "Two",
        3 => "Three",
        4 => "Four",
        5 => "Five",
        6 => "Six",
        n => return format!("{n} Column"),
    };
    format!("{word} Column")
}

/// Accepts `{"columns": n}` or a bare `n`, with `1 <= n <= max_columns`.
pub fn parse_column_count(
    args: Option<&Value>,
    max_columns: usize,
) -> Result<NonZeroUsize, CommandError> {
    let raw = match args {
        Some(Value::Object(map)) => map.get(COLUMNS_ATTR),
        Some(other) => Some(other),
        None => None,
    }
    .ok_or_else(|| CommandError::InvalidArgument("missing column count".to_string()))?;

    let columns = raw
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| {
            CommandError::InvalidArgument(format!("column count must be at least 1, got {raw}"))
        })?;
    if columns.get() > max_columns {
        return Err(CommandError::InvalidArgument(format!(
            "column count must be at most {max_columns}, got {raw}"
        )));
    }
    Ok(columns)
}

/// A detached layout block with `columns` empty regions.
pub fn layout_node(columns: NonZeroUsize) -> ElementNode {
    let mut layout = ElementNode::new(LAYOUT_KIND).with_attr(COLUMNS_ATTR, json!(columns.get()));
    for _ in 0..columns.get() {
        create_layout_editable(&mut layout);
    }
    layout
}

fn insert_layout(editor: &Editor, columns: NonZeroUsize) -> Result<Transaction, CommandError> {
    let focus = &editor.selection().focus;
    let path = find_insertion_path(editor.doc(), editor.registry().schema(), focus, LAYOUT_KIND)
        .ok_or_else(|| CommandError::NoInsertionPoint(LAYOUT_KIND.to_string()))?;

    let mut first_region = path.clone();
    first_region.push(0);

    Ok(Transaction::new(vec![Op::InsertNode {
        path,
        node: Node::Element(layout_node(columns)),
    }])
    .selection_after(Selection::collapsed(Position::at(&first_region, 0)))
    .source(format!("command:{CMD_LAYOUT_COLUMN}")))
}

/// Path of the innermost layout block containing `position`.
fn nearest_layout(doc: &Document, position: &Position) -> Option<Vec<usize>> {
    let parent = position.parent_path();
    (1..=parent.len())
        .rev()
        .map(|depth| &parent[..depth])
        .find(|path| doc.element(path).is_some_and(|el| el.kind == LAYOUT_KIND))
        .map(<[usize]>::to_vec)
}

/// Keeps every layout block at exactly `columns` regions after edits: drops
/// children that are not regions, drops regions past the count and pads with
/// empty ones. Blocks without a usable count are left alone.
struct EnforceLayoutArity;

impl NormalizePass for EnforceLayoutArity {
    fn id(&self) -> &'static str {
        "layout.enforce_arity"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        fn walk(children: &[Node], parent: &mut Vec<usize>, out: &mut Vec<Vec<Op>>) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                parent.push(ix);
                if el.kind == LAYOUT_KIND {
                    let ops = arity_fix(el, parent);
                    if !ops.is_empty() {
                        out.push(ops);
                    }
                }
                walk(&el.children, parent, out);
                parent.pop();
            }
        }

        let mut fixes = Vec::new();
        walk(&doc.children, &mut Vec::new(), &mut fixes);
        // Deepest and last first, so earlier fixes keep valid paths.
        fixes.into_iter().rev().flatten().collect()
    }
}

fn arity_fix(layout: &ElementNode, layout_path: &[usize]) -> Vec<Op> {
    let Some(columns) = layout
        .attr_u64(COLUMNS_ATTR)
        .and_then(|n| usize::try_from(n).ok())
        .filter(|&n| n > 0)
    else {
        return Vec::new();
    };

    let mut kept = 0;
    let mut removed = Vec::new();
    for (ix, child) in layout.children.iter().enumerate() {
        if child.kind() == EDITABLE_KIND && kept < columns {
            kept += 1;
        } else {
            removed.push(ix);
        }
    }

    let mut ops = Vec::new();
    for ix in removed.into_iter().rev() {
        let mut path = layout_path.to_vec();
        path.push(ix);
        ops.push(Op::RemoveNode { path });
    }
    for ix in kept..columns {
        let mut path = layout_path.to_vec();
        path.push(ix);
        ops.push(Op::InsertNode {
            path,
            node: crate::editable::editable_with(Vec::new()),
        });
    }

    if !ops.is_empty() {
        tracing::debug!(target: "plate_layout::editor", ?layout_path, columns, kept, "restoring layout arity");
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editable::editable_with;

    #[test]
    fn column_count_accepts_object_or_bare_number() {
        assert_eq!(parse_column_count(Some(&json!({ "columns": 3 })), 12).unwrap().get(), 3);
        assert_eq!(parse_column_count(Some(&json!(2)), 12).unwrap().get(), 2);
        for bad in [json!(0), json!(-1), json!("2"), json!({ "cols": 2 }), json!(1.5)] {
            assert!(matches!(
                parse_column_count(Some(&bad), 12),
                Err(CommandError::InvalidArgument(_))
            ));
        }
        assert!(parse_column_count(None, 12).is_err());
    }

    #[test]
    fn column_count_is_capped() {
        assert_eq!(parse_column_count(Some(&json!(4)), 4).unwrap().get(), 4);
        for bad in [json!(5), json!(u64::MAX), json!(1e12)] {
            assert!(matches!(
                parse_column_count(Some(&bad), 4),
                Err(CommandError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn presets_above_the_cap_get_no_toolbar_item() {
        let plugin = LayoutColumnPlugin::new(&LayoutConfig {
            column_presets: vec![2, 6, 3],
            max_columns: 4,
        });
        let ids: Vec<String> = plugin.toolbar_items().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["layout-column-2", "layout-column-3"]);
    }

    #[test]
    fn labels_spell_out_small_counts() {
        let label = |n| preset_label(NonZeroUsize::new(n).unwrap());
        assert_eq!(label(2), "Two Column");
        assert_eq!(label(3), "Three Column");
        assert_eq!(label(12), "12 Column");
    }

    #[test]
    fn arity_fix_drops_strays_then_pads() {
        let layout = ElementNode::new(LAYOUT_KIND)
            .with_attr(COLUMNS_ATTR, json!(3))
            .with_children(vec![Node::paragraph("stray"), editable_with(Vec::new())]);

        assert_eq!(
            arity_fix(&layout, &[4]),
            vec![
                Op::RemoveNode { path: vec![4, 0] },
                Op::InsertNode {
                    path: vec![4, 1],
                    node: editable_with(Vec::new()),
                },
                Op::InsertNode {
                    path: vec![4, 2],
                    node: editable_with(Vec::new()),
                },
            ]
        );
    }

    #[test]
    fn arity_fix_ignores_layouts_without_a_count() {
        let layout = ElementNode::new(LAYOUT_KIND).with_children(vec![editable_with(Vec::new())]);
        assert!(arity_fix(&layout, &[0]).is_empty());
    }
}
