use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::EditorConfig;
use crate::conversion::{downcast, upcast, DowncastMode};
use crate::error::{ApplyError, CommandError, QueryError, RegistryError};
use crate::model::{Document, Node, Position, Selection};
use crate::ops::{Op, Transaction};
use crate::plugin::PluginRegistry;
use crate::view::ViewElement;
use crate::writer::{shift_for_insert, shift_for_remove};

#[derive(Debug, Clone)]
pub struct UndoRecord {
    pub inverse_ops: Vec<Op>,
    pub selection_before: Selection,
    pub selection_after: Selection,
}

pub struct Editor {
    doc: Document,
    selection: Selection,
    registry: PluginRegistry,
    config: EditorConfig,
    undo_stack: Vec<UndoRecord>,
    redo_stack: Vec<UndoRecord>,
}

impl Editor {
    pub fn new(
        doc: Document,
        selection: Selection,
        registry: PluginRegistry,
        config: EditorConfig,
    ) -> Self {
        let mut editor = Self {
            doc,
            selection,
            registry,
            config,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        };
        editor.normalize_in_place();
        editor
    }

    pub fn with_config(config: EditorConfig) -> Result<Self, RegistryError> {
        let registry = PluginRegistry::layout(&config.layout)?;
        let doc = Document::new(vec![Node::paragraph("")]);
        let selection = Selection::collapsed(Position::new(vec![0, 0]));
        Ok(Self::new(doc, selection, registry, config))
    }

    pub fn with_layout_plugins() -> Result<Self, RegistryError> {
        Self::with_config(EditorConfig::default())
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
        self.normalize_selection_in_place();
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Replaces the document with the upcast of `view`. History is dropped.
    pub fn set_data(&mut self, view: &ViewElement) {
        self.doc = upcast(view, &self.registry);
        self.selection = Selection::collapsed(first_position(&self.doc));
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.normalize_in_place();
        tracing::debug!(target: "plate_layout::editor", blocks = self.doc.children.len(), "loaded data");
    }

    pub fn data(&self) -> ViewElement {
        downcast(&self.doc, &self.registry, DowncastMode::Data)
    }

    pub fn data_html(&self) -> String {
        self.data().inner_html()
    }

    pub fn editing_view(&self) -> ViewElement {
        downcast(&self.doc, &self.registry, DowncastMode::Editing)
    }

    pub fn undo(&mut self) -> bool {
        let Some(record) = self.undo_stack.pop() else {
            return false;
        };

        let UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        } = record;

        let mut redo_ops: Vec<Op> = Vec::new();
        for op in inverse_ops.iter().cloned() {
            match self.apply_op(op) {
                Ok(inv) => redo_ops.push(inv),
                Err(err) => {
                    tracing::warn!(target: "plate_layout::editor", %err, "undo stopped early");
                    break;
                }
            }
        }
        redo_ops.reverse();

        self.selection = selection_before.clone();
        self.normalize_in_place();

        self.redo_stack.push(UndoRecord {
            selection_before,
            selection_after,
            inverse_ops: redo_ops,
        });
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(record) = self.redo_stack.pop() else {
            return false;
        };

        let UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        } = record;

        let mut undo_ops: Vec<Op> = Vec::new();
        for op in inverse_ops.iter().cloned() {
            match self.apply_op(op) {
                Ok(inv) => undo_ops.push(inv),
                Err(err) => {
                    tracing::warn!(target: "plate_layout::editor", %err, "redo stopped early");
                    break;
                }
            }
        }
        undo_ops.reverse();

        self.selection = selection_after.clone();
        self.normalize_in_place();

        self.undo_stack.push(UndoRecord {
            selection_before,
            selection_after,
            inverse_ops: undo_ops,
        });
        true
    }

    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        tracing::debug!(
            target: "plate_layout::editor",
            source = tx.meta.source.as_deref().unwrap_or("-"),
            ops = tx.ops.len(),
            "applying transaction"
        );
        let selection_before = self.selection.clone();

        let mut inverse_ops: Vec<Op> = Vec::new();
        for op in tx.ops.iter().cloned() {
            let inv = self.apply_op(op)?;
            inverse_ops.push(inv);
        }

        if let Some(sel) = tx.selection_after {
            self.selection = sel;
        }

        let mut inverse_normalize = self.normalize_with_inverse_ops()?;
        inverse_ops.append(&mut inverse_normalize);
        inverse_ops.reverse();

        self.normalize_selection_in_place();

        let selection_after = self.selection.clone();

        self.undo_stack.push(UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        });
        self.redo_stack.clear();
        if self.undo_stack.len() > self.config.max_undo {
            self.undo_stack.remove(0);
        }

        Ok(())
    }

    pub fn run_command(&mut self, id: &str, args: Option<Value>) -> Result<(), CommandError> {
        let Some(command) = self.registry.command(id) else {
            return Err(CommandError::Unknown(id.to_string()));
        };
        (command.handler)(self, args)
    }

    /// Runs the command behind a toolbar item with the item's arguments.
    pub fn trigger(&mut self, toolbar_id: &str) -> Result<(), CommandError> {
        let item = self
            .registry
            .toolbar_item(toolbar_id)
            .cloned()
            .ok_or_else(|| CommandError::UnknownToolbarItem(toolbar_id.to_string()))?;
        self.run_command(&item.command, item.args)
    }

    pub fn run_query_json(&self, id: &str, args: Option<Value>) -> Result<Value, QueryError> {
        let Some(query) = self.registry.query(id) else {
            return Err(QueryError::Unknown(id.to_string()));
        };
        (query.handler)(self, args)
    }

    pub fn run_query<T>(&self, id: &str, args: Option<Value>) -> Result<T, QueryError>
    where
        T: DeserializeOwned,
    {
        let value = self.run_query_json(id, args)?;
        Ok(serde_json::from_value(value)?)
    }

    fn normalize_in_place(&mut self) {
        if let Err(err) = self.normalize_with_inverse_ops() {
            tracing::warn!(target: "plate_layout::editor", %err, "normalization failed");
        }
        self.normalize_selection_in_place();
    }

    fn normalize_selection_in_place(&mut self) {
        for position in [&mut self.selection.anchor, &mut self.selection.focus] {
            if !is_valid_position(&self.doc, position) {
                *position = first_position(&self.doc);
            }
        }
    }

    fn normalize_with_inverse_ops(&mut self) -> Result<Vec<Op>, ApplyError> {
        let mut inverse_ops: Vec<Op> = Vec::new();
        for _ in 0..self.config.max_normalize_iterations {
            let ops = self.registry.normalize(&self.doc);
            if ops.is_empty() {
                return Ok(inverse_ops);
            }
            for op in ops {
                let inv = self.apply_op(op)?;
                inverse_ops.push(inv);
            }
        }
        Err(ApplyError::NormalizeDidNotConverge(
            self.config.max_normalize_iterations,
        ))
    }

    fn apply_op(&mut self, op: Op) -> Result<Op, ApplyError> {
        apply_op_to(&mut self.doc, &mut self.selection, op)
    }
}

fn apply_op_to(doc: &mut Document, selection: &mut Selection, op: Op) -> Result<Op, ApplyError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let text_node = doc.text_mut(&path)?;
            let offset = clamp_to_char_boundary(&text_node.text, offset);
            text_node.text.insert_str(offset, &text);
            Ok(Op::RemoveText {
                path,
                range: offset..offset + text.len(),
            })
        }
        Op::RemoveText { path, range } => {
            let text_node = doc.text_mut(&path)?;
            let start = clamp_to_char_boundary(&text_node.text, range.start);
            let end = clamp_to_char_boundary(&text_node.text, range.end);
            if start >= end {
                return Ok(Op::InsertText {
                    path,
                    offset: start,
                    text: String::new(),
                });
            }
            let removed = text_node.text[start..end].to_string();
            text_node.text.replace_range(start..end, "");
            Ok(Op::InsertText {
                path,
                offset: start,
                text: removed,
            })
        }
        Op::InsertNode { path, node } => {
            doc.insert_node(&path, node)?;
            for position in [&mut selection.anchor, &mut selection.focus] {
                shift_for_insert(&mut position.path, &path);
            }
            Ok(Op::RemoveNode { path })
        }
        Op::RemoveNode { path } => {
            let removed = doc.remove_node(&path)?;
            for position in [&mut selection.anchor, &mut selection.focus] {
                shift_for_remove(&mut position.path, &path);
            }
            Ok(Op::InsertNode {
                path,
                node: removed,
            })
        }
    }
}

fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

fn is_valid_position(doc: &Document, position: &Position) -> bool {
    !position.path.is_empty()
        && doc
            .children(position.parent_path())
            .is_some_and(|children| position.offset() <= children.len())
}

/// Start of the deepest element reached by following first children.
fn first_position(doc: &Document) -> Position {
    let mut parent = Vec::new();
    let mut children = doc.children.as_slice();
    while let Some(Node::Element(el)) = children.first() {
        parent.push(0);
        children = &el.children;
    }
    Position::at(&parent, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ElementNode;

    #[test]
    fn first_position_descends_first_children() {
        let doc = Document::new(vec![Node::Element(ElementNode::new("outer").with_children(
            vec![Node::paragraph("x")],
        ))]);
        assert_eq!(first_position(&doc), Position::new(vec![0, 0, 0]));
        assert_eq!(first_position(&Document::default()), Position::root(0));
    }

    #[test]
    fn text_ops_invert() {
        let mut doc = Document::new(vec![Node::paragraph("héllo")]);
        let mut selection = Selection::collapsed(Position::new(vec![0, 0]));

        let inverse = apply_op_to(
            &mut doc,
            &mut selection,
            Op::RemoveText {
                path: vec![0, 0],
                range: 1..3,
            },
        )
        .unwrap();
        assert_eq!(doc.children[0].text_content(), "hllo");

        apply_op_to(&mut doc, &mut selection, inverse).unwrap();
        assert_eq!(doc.children[0].text_content(), "héllo");
    }
}
