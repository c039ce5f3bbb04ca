use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PathError;

pub type Path = Vec<usize>;
pub type Attrs = BTreeMap<String, serde_json::Value>;
pub type ElementKind = String;

pub const ROOT_KIND: &str = "$root";
pub const TEXT_KIND: &str = "$text";
pub const PARAGRAPH_KIND: &str = "paragraph";

fn default_root() -> ElementKind {
    ROOT_KIND.to_string()
}

/// A model tree. The root is not a node itself: `root` names its kind so
/// the schema can decide what may live directly inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default = "default_root")]
    pub root: ElementKind,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            root: default_root(),
            children: Vec::new(),
        }
    }
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self {
            root: default_root(),
            children,
        }
    }

    /// An empty detached fragment whose root behaves like an element of `root`.
    pub fn with_root(root: impl Into<ElementKind>) -> Self {
        Self {
            root: root.into(),
            children: Vec::new(),
        }
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let (&first, rest) = path.split_first()?;
        let mut node = self.children.get(first)?;
        for &ix in rest {
            node = match node {
                Node::Element(el) => el.children.get(ix)?,
                Node::Text(_) => return None,
            };
        }
        Some(node)
    }

    pub fn node_mut(&mut self, path: &[usize]) -> Result<&mut Node, PathError> {
        node_mut_in(&mut self.children, path, 0)
    }

    pub fn element(&self, path: &[usize]) -> Option<&ElementNode> {
        match self.node(path)? {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn element_mut(&mut self, path: &[usize]) -> Result<&mut ElementNode, PathError> {
        let depth = path.len().saturating_sub(1);
        match self.node_mut(path)? {
            Node::Element(el) => Ok(el),
            Node::Text(_) => Err(PathError::NotContainer { depth }),
        }
    }

    pub fn children(&self, parent: &[usize]) -> Option<&[Node]> {
        if parent.is_empty() {
            return Some(&self.children);
        }
        self.element(parent).map(|el| el.children.as_slice())
    }

    pub fn children_mut(&mut self, parent: &[usize]) -> Result<&mut Vec<Node>, PathError> {
        if parent.is_empty() {
            return Ok(&mut self.children);
        }
        Ok(&mut self.element_mut(parent)?.children)
    }

    /// Kind of the container at `parent`; the root kind for the empty path.
    pub fn parent_kind(&self, parent: &[usize]) -> Option<&str> {
        if parent.is_empty() {
            return Some(&self.root);
        }
        self.element(parent).map(|el| el.kind.as_str())
    }

    pub fn insert_node(&mut self, path: &[usize], node: Node) -> Result<(), PathError> {
        let (&index, parent) = path.split_last().ok_or(PathError::Empty)?;
        let children = self.children_mut(parent)?;
        if index > children.len() {
            return Err(PathError::OutOfBounds {
                depth: parent.len(),
                index,
                len: children.len(),
            });
        }
        children.insert(index, node);
        Ok(())
    }

    pub fn remove_node(&mut self, path: &[usize]) -> Result<Node, PathError> {
        let (&index, parent) = path.split_last().ok_or(PathError::Empty)?;
        let children = self.children_mut(parent)?;
        if index >= children.len() {
            return Err(PathError::OutOfBounds {
                depth: parent.len(),
                index,
                len: children.len(),
            });
        }
        Ok(children.remove(index))
    }

    pub fn text_mut(&mut self, path: &[usize]) -> Result<&mut TextNode, PathError> {
        match self.node_mut(path)? {
            Node::Text(t) => Ok(t),
            Node::Element(_) => Err(PathError::NotText),
        }
    }
}

fn node_mut_in<'a>(
    children: &'a mut [Node],
    path: &[usize],
    depth: usize,
) -> Result<&'a mut Node, PathError> {
    let (&ix, rest) = path.split_first().ok_or(PathError::Empty)?;
    let len = children.len();
    let node = children.get_mut(ix).ok_or(PathError::OutOfBounds {
        depth,
        index: ix,
        len,
    })?;
    if rest.is_empty() {
        return Ok(node);
    }
    match node {
        Node::Element(el) => node_mut_in(&mut el.children, rest, depth + 1),
        Node::Text(_) => Err(PathError::NotContainer { depth }),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
}

impl Node {
    pub fn paragraph(text: impl Into<String>) -> Self {
        let text = text.into();
        let children = if text.is_empty() {
            Vec::new()
        } else {
            vec![Node::text(text)]
        };
        Node::Element(ElementNode {
            kind: PARAGRAPH_KIND.to_string(),
            attrs: Attrs::default(),
            children,
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks: Marks::default(),
        })
    }

    pub fn kind(&self) -> &str {
        match self {
            Node::Element(el) => &el.kind,
            Node::Text(_) => TEXT_KIND,
        }
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        }
    }

    pub fn text_content(&self) -> String {
        match self {
            Node::Element(el) => el.text_content(),
            Node::Text(t) => t.text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub kind: ElementKind,
    #[serde(default)]
    pub attrs: Attrs,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl ElementNode {
    pub fn new(kind: impl Into<ElementKind>) -> Self {
        Self {
            kind: kind.into(),
            attrs: Attrs::default(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    pub fn attr_u64(&self, key: &str) -> Option<u64> {
        self.attrs.get(key).and_then(|v| v.as_u64())
    }

    pub fn text_content(&self) -> String {
        self.children.iter().map(Node::text_content).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Marks {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
}

/// A place between two nodes: every index but the last addresses an
/// ancestor, the last one is the offset inside that ancestor's children.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub path: Path,
}

impl Position {
    pub fn new(path: Path) -> Self {
        debug_assert!(!path.is_empty(), "position path must not be empty");
        Self { path }
    }

    pub fn at(parent: &[usize], offset: usize) -> Self {
        let mut path = parent.to_vec();
        path.push(offset);
        Self { path }
    }

    pub fn root(offset: usize) -> Self {
        Self { path: vec![offset] }
    }

    pub fn before(node_path: &[usize]) -> Self {
        Self {
            path: node_path.to_vec(),
        }
    }

    pub fn after(node_path: &[usize]) -> Self {
        let mut path = node_path.to_vec();
        if let Some(last) = path.last_mut() {
            *last += 1;
        }
        Self { path }
    }

    pub fn parent_path(&self) -> &[usize] {
        self.path.split_last().map(|(_, p)| p).unwrap_or(&[])
    }

    pub fn offset(&self) -> usize {
        self.path.last().copied().unwrap_or(0)
    }

    pub fn with_offset(&self, offset: usize) -> Self {
        Self::at(self.parent_path(), offset)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRange {
    pub start: Position,
    pub end: Position,
}

impl ModelRange {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn collapsed(position: Position) -> Self {
        Self {
            start: position.clone(),
            end: position,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Whether both ends share a parent, i.e. the range covers whole siblings.
    pub fn is_flat(&self) -> bool {
        self.start.parent_path() == self.end.parent_path()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
}

impl Selection {
    pub fn collapsed(position: Position) -> Self {
        Self {
            anchor: position.clone(),
            focus: position,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}
