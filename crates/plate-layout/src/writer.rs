use crate::error::WriterError;
use crate::model::{Document, ElementNode, Marks, ModelRange, Node, Path, Position};
use crate::schema::Schema;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOutcome {
    /// Between the outermost left and right fragments.
    pub position: Position,
    /// The innermost right-hand fragment, where the split position used to be.
    pub cursor_parent: Path,
}

/// Handle to a path the writer keeps current across inserts and splits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedPath(usize);

/// Mutates one model tree on behalf of a conversion or command.
///
/// Elements produced or cut by [`ModelWriter::split`] are remembered (and
/// re-pathed on every later insert or split) so that halves left empty can be
/// dropped once the whole conversion is done.
pub struct ModelWriter<'a> {
    doc: &'a mut Document,
    split_parts: Vec<Path>,
    tracked: Vec<Path>,
}

impl<'a> ModelWriter<'a> {
    pub fn new(doc: &'a mut Document) -> Self {
        Self {
            doc,
            split_parts: Vec::new(),
            tracked: Vec::new(),
        }
    }

    pub fn track(&mut self, path: Path) -> TrackedPath {
        self.tracked.push(path);
        TrackedPath(self.tracked.len() - 1)
    }

    pub fn tracked_path(&self, handle: TrackedPath) -> &[usize] {
        self.tracked.get(handle.0).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn doc(&self) -> &Document {
        self.doc
    }

    pub fn parent_kind(&self, position: &Position) -> Option<&str> {
        self.doc.parent_kind(position.parent_path())
    }

    pub fn insert(&mut self, node: Node, position: &Position) -> Result<(), WriterError> {
        self.doc.insert_node(&position.path, node)?;
        for part in self.split_parts.iter_mut().chain(self.tracked.iter_mut()) {
            shift_for_insert(part, &position.path);
        }
        Ok(())
    }

    /// Appends `node` as the last child of `parent` and returns its path.
    pub fn append(&mut self, node: Node, parent: &[usize]) -> Result<Path, WriterError> {
        let len = self
            .doc
            .children(parent)
            .map(<[Node]>::len)
            .ok_or(crate::error::PathError::NotContainer {
                depth: parent.len().saturating_sub(1),
            })?;
        let position = Position::at(parent, len);
        self.insert(node, &position)?;
        Ok(position.path)
    }

    /// Splits every element between `position` and `limit` (exclusive).
    pub fn split(
        &mut self,
        position: &Position,
        limit: &[usize],
    ) -> Result<SplitOutcome, WriterError> {
        let start_parent = position.parent_path();
        if start_parent.len() <= limit.len() || !start_parent.starts_with(limit) {
            return Err(WriterError::InvalidSplitLimit);
        }

        let mut parent: Path = start_parent.to_vec();
        let mut offset = position.offset();
        let mut cursor_parent: Option<Path> = None;

        while parent.len() > limit.len() {
            let Some((&index, grand)) = parent.split_last() else {
                break;
            };
            let grand = grand.to_vec();

            let element = self.doc.element_mut(&parent)?;
            if offset > element.children.len() {
                return Err(crate::error::PathError::OutOfBounds {
                    depth: parent.len(),
                    index: offset,
                    len: element.children.len(),
                }
                .into());
            }
            let right = ElementNode {
                kind: element.kind.clone(),
                attrs: element.attrs.clone(),
                children: element.children.split_off(offset),
            };

            let mut right_path = grand.clone();
            right_path.push(index + 1);
            self.doc.insert_node(&right_path, Node::Element(right))?;

            for part in self
                .split_parts
                .iter_mut()
                .chain(self.tracked.iter_mut())
                .chain(cursor_parent.iter_mut())
            {
                shift_for_split(part, &parent, offset);
            }
            self.split_parts.push(parent.clone());
            self.split_parts.push(right_path.clone());
            if cursor_parent.is_none() {
                cursor_parent = Some(right_path);
            }

            offset = index + 1;
            parent = grand;
        }

        let cursor_parent = cursor_parent.ok_or(WriterError::InvalidSplitLimit)?;
        Ok(SplitOutcome {
            position: Position::at(&parent, offset),
            cursor_parent,
        })
    }

    /// Applies `update` to every text node whose place lies inside `range`.
    pub fn update_marks(&mut self, range: &ModelRange, update: impl Fn(&mut Marks)) {
        let mut text_paths = Vec::new();
        collect_text_paths(&self.doc.children, &mut Vec::new(), &mut text_paths);
        for path in text_paths {
            if range.start.path <= path && path < range.end.path {
                if let Ok(text) = self.doc.text_mut(&path) {
                    update(&mut text.marks);
                }
            }
        }
    }

    /// Drops split fragments that ended up without children. Returns how many
    /// were removed.
    pub fn remove_empty_split_parts(&mut self) -> usize {
        let mut parts = std::mem::take(&mut self.split_parts);
        parts.sort();
        parts.dedup();

        let mut removed = 0;
        // Descending order: a removal only shifts paths that sort after it.
        for path in parts.into_iter().rev() {
            let empty = matches!(
                self.doc.node(&path),
                Some(Node::Element(el)) if el.children.is_empty()
            );
            if empty && self.doc.remove_node(&path).is_ok() {
                removed += 1;
            }
        }
        removed
    }
}

fn collect_text_paths(children: &[Node], path: &mut Vec<usize>, out: &mut Vec<Path>) {
    for (ix, node) in children.iter().enumerate() {
        path.push(ix);
        match node {
            Node::Text(_) => out.push(path.clone()),
            Node::Element(el) => collect_text_paths(&el.children, path, out),
        }
        path.pop();
    }
}

/// Re-paths `tracked` after a node was inserted at `inserted`.
pub(crate) fn shift_for_insert(tracked: &mut Path, inserted: &[usize]) {
    let Some((&index, parent)) = inserted.split_last() else {
        return;
    };
    let depth = parent.len();
    if tracked.len() > depth && tracked.starts_with(parent) && tracked[depth] >= index {
        tracked[depth] += 1;
    }
}

/// Re-paths `tracked` after the node at `removed` was taken out. Paths inside
/// the removed subtree collapse onto the place it occupied.
pub(crate) fn shift_for_remove(tracked: &mut Path, removed: &[usize]) {
    let Some((&index, parent)) = removed.split_last() else {
        return;
    };
    let depth = parent.len();
    if tracked.len() <= depth || !tracked.starts_with(parent) {
        return;
    }
    if tracked[depth] > index {
        tracked[depth] -= 1;
    } else if tracked[depth] == index && tracked.len() > depth + 1 {
        tracked.truncate(depth + 1);
    }
}

/// Re-paths `tracked` after the element at `split` was cut at `offset` and
/// its tail moved into a new right sibling.
fn shift_for_split(tracked: &mut Path, split: &[usize], offset: usize) {
    let Some((&index, grand)) = split.split_last() else {
        return;
    };
    let depth = split.len();
    if tracked.len() > depth && tracked.starts_with(split) && tracked[depth] >= offset {
        let mut moved = grand.to_vec();
        moved.push(index + 1);
        moved.push(tracked[depth] - offset);
        moved.extend_from_slice(&tracked[depth + 1..]);
        *tracked = moved;
    } else if tracked.len() >= depth && tracked.starts_with(grand) && tracked[depth - 1] > index {
        tracked[depth - 1] += 1;
    }
}

/// Where a user-initiated insertion of `kind` lands for a caret at
/// `position`: at the caret when its parent accepts `kind`, otherwise right
/// after the ancestor that holds the caret, at the nearest level that accepts
/// `kind`. Never splits and never leaves a limit element.
pub fn find_insertion_path(
    doc: &Document,
    schema: &Schema,
    position: &Position,
    kind: &str,
) -> Option<Path> {
    let parent = position.parent_path();
    for depth in (0..=parent.len()).rev() {
        let ancestor = &parent[..depth];
        let ancestor_kind = doc.parent_kind(ancestor)?;
        if schema.allows_child(ancestor_kind, kind) {
            let mut path = ancestor.to_vec();
            if depth == parent.len() {
                let len = doc.children(ancestor).map(<[Node]>::len).unwrap_or(0);
                path.push(position.offset().min(len));
            } else {
                path.push(parent[depth] + 1);
            }
            return Some(path);
        }
        if schema.is_limit(ancestor_kind) {
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PARAGRAPH_KIND;

    fn para(children: Vec<Node>) -> Node {
        Node::Element(ElementNode::new(PARAGRAPH_KIND).with_children(children))
    }

    fn quote(children: Vec<Node>) -> Node {
        Node::Element(ElementNode::new("quote").with_children(children))
    }

    #[test]
    fn split_single_level_reports_cursor_parent() {
        let mut doc = Document::new(vec![para(vec![Node::text("a"), Node::text("b")])]);
        let mut writer = ModelWriter::new(&mut doc);

        let outcome = writer.split(&Position::new(vec![0, 1]), &[]).unwrap();

        assert_eq!(outcome.position, Position::root(1));
        assert_eq!(outcome.cursor_parent, vec![1]);
        assert_eq!(
            doc.children,
            vec![para(vec![Node::text("a")]), para(vec![Node::text("b")])]
        );
    }

    #[test]
    fn split_multi_level_moves_cursor_parent_into_outer_fragment() {
        let mut doc = Document::new(vec![quote(vec![
            para(vec![Node::text("x")]),
            para(vec![Node::text("a"), Node::text("b")]),
            para(vec![Node::text("y")]),
        ])]);
        let mut writer = ModelWriter::new(&mut doc);

        let outcome = writer.split(&Position::new(vec![0, 1, 1]), &[]).unwrap();

        assert_eq!(outcome.position, Position::root(1));
        assert_eq!(outcome.cursor_parent, vec![1, 0]);
        assert_eq!(
            doc.children,
            vec![
                quote(vec![para(vec![Node::text("x")]), para(vec![Node::text("a")])]),
                quote(vec![para(vec![Node::text("b")]), para(vec![Node::text("y")])]),
            ]
        );
    }

    #[test]
    fn split_rejects_limit_that_is_not_an_ancestor() {
        let mut doc = Document::new(vec![para(vec![Node::text("a")])]);
        let mut writer = ModelWriter::new(&mut doc);
        assert_eq!(
            writer.split(&Position::root(0), &[]),
            Err(WriterError::InvalidSplitLimit)
        );
    }

    #[test]
    fn empty_split_parts_are_removed_and_tracked_across_inserts() {
        let mut doc = Document::new(vec![para(vec![Node::text("a")])]);
        let mut writer = ModelWriter::new(&mut doc);

        // Split at the very end leaves an empty right half.
        let outcome = writer.split(&Position::new(vec![0, 1]), &[]).unwrap();
        writer
            .insert(Node::Element(ElementNode::new("widget")), &outcome.position)
            .unwrap();
        writer
            .insert(para(vec![]), &Position::root(0))
            .unwrap();

        assert_eq!(writer.remove_empty_split_parts(), 1);
        assert_eq!(
            doc.children,
            vec![
                para(vec![]),
                para(vec![Node::text("a")]),
                Node::Element(ElementNode::new("widget")),
            ]
        );
    }

    #[test]
    fn tracked_paths_follow_splits_of_their_parent() {
        let mut doc = Document::new(vec![
            para(vec![Node::text("a"), Node::text("b")]),
            para(vec![Node::text("c")]),
        ]);
        let mut writer = ModelWriter::new(&mut doc);
        let second = writer.track(vec![1]);

        writer.split(&Position::new(vec![0, 1]), &[]).unwrap();

        assert_eq!(writer.tracked_path(second), &[2]);
    }

    #[test]
    fn append_returns_the_new_child_path() {
        let mut doc = Document::new(vec![quote(vec![para(vec![])])]);
        let mut writer = ModelWriter::new(&mut doc);

        assert_eq!(writer.append(para(vec![]), &[0]), Ok(vec![0, 1]));
        assert_eq!(writer.append(Node::text("t"), &[0, 0]), Ok(vec![0, 0, 0]));
        assert!(writer.append(para(vec![]), &[3]).is_err());
    }

    #[test]
    fn update_marks_touches_only_text_inside_range() {
        let mut doc = Document::new(vec![
            para(vec![Node::text("a")]),
            para(vec![Node::text("b")]),
            para(vec![Node::text("c")]),
        ]);
        let mut writer = ModelWriter::new(&mut doc);

        writer.update_marks(
            &ModelRange::new(Position::root(1), Position::root(2)),
            |marks| marks.bold = true,
        );

        let bold: Vec<bool> = doc
            .children
            .iter()
            .map(|p| match &p.as_element().unwrap().children[0] {
                Node::Text(t) => t.marks.bold,
                Node::Element(_) => false,
            })
            .collect();
        assert_eq!(bold, vec![false, true, false]);
    }

    #[test]
    fn shift_helpers_follow_sibling_changes() {
        let mut tracked = vec![1, 2];
        shift_for_insert(&mut tracked, &[1, 0]);
        assert_eq!(tracked, vec![1, 3]);
        shift_for_insert(&mut tracked, &[2]);
        assert_eq!(tracked, vec![1, 3]);

        shift_for_remove(&mut tracked, &[0]);
        assert_eq!(tracked, vec![0, 3]);
        shift_for_remove(&mut tracked, &[0]);
        assert_eq!(tracked, vec![0]);
    }
}
