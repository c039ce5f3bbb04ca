use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Name of the element wrapping a whole converted document.
pub const VIEW_ROOT_NAME: &str = "$root";

const VOID_ELEMENTS: &[&str] = &["br", "hr", "img"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum ViewNode {
    Element(ViewElement),
    Text(ViewText),
    /// Editing-only decoration. Rendered, never converted back to the model.
    Ui(ViewElement),
}

impl ViewNode {
    pub fn text(data: impl Into<String>) -> Self {
        ViewNode::Text(ViewText { data: data.into() })
    }

    pub fn as_element(&self) -> Option<&ViewElement> {
        match self {
            ViewNode::Element(el) => Some(el),
            ViewNode::Text(_) | ViewNode::Ui(_) => None,
        }
    }
}

impl From<ViewElement> for ViewNode {
    fn from(value: ViewElement) -> Self {
        ViewNode::Element(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewText {
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewElement {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    /// Properties visible to the editing layer only; not rendered.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<ViewNode>,
}

impl ViewElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            classes: Vec::new(),
            attrs: BTreeMap::new(),
            custom: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn root(children: Vec<ViewNode>) -> Self {
        Self::new(VIEW_ROOT_NAME).with_children(children)
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.add_class(class);
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: impl Into<ViewNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_text(mut self, data: impl Into<String>) -> Self {
        self.children.push(ViewNode::text(data));
        self
    }

    pub fn with_children(mut self, children: Vec<ViewNode>) -> Self {
        self.children = children;
        self
    }

    pub fn add_class(&mut self, class: impl Into<String>) {
        let class = class.into();
        if !self.has_class(&class) {
            self.classes.push(class);
        }
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(key.into(), value.into());
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_element(self, &mut out);
        out
    }

    pub fn inner_html(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            write_node(child, &mut out);
        }
        out
    }
}

fn write_node(node: &ViewNode, out: &mut String) {
    match node {
        ViewNode::Element(el) | ViewNode::Ui(el) => write_element(el, out),
        ViewNode::Text(t) => escape_into(&t.data, false, out),
    }
}

fn write_element(el: &ViewElement, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    if !el.classes.is_empty() {
        out.push_str(" class=\"");
        escape_into(&el.classes.join(" "), true, out);
        out.push('"');
    }
    for (key, value) in &el.attrs {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        escape_into(value, true, out);
        out.push('"');
    }
    out.push('>');

    if VOID_ELEMENTS.contains(&el.name.as_str()) {
        return;
    }

    for child in &el.children {
        write_node(child, out);
    }
    out.push_str("</");
    out.push_str(&el.name);
    out.push('>');
}

fn escape_into(s: &str, attribute: bool, out: &mut String) {
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_renders_class_first_then_sorted_attrs() {
        let el = ViewElement::new("div")
            .with_attr("data-b", "2")
            .with_class("one")
            .with_attr("columns", "3")
            .with_class("two")
            .with_text("a < b");
        assert_eq!(
            el.to_html(),
            r#"<div class="one two" columns="3" data-b="2">a &lt; b</div>"#
        );
    }

    #[test]
    fn attribute_values_are_escaped() {
        let el = ViewElement::new("p").with_attr("title", r#"say "hi" & go"#);
        assert_eq!(
            el.to_html(),
            r#"<p title="say &quot;hi&quot; &amp; go"></p>"#
        );
    }

    #[test]
    fn inner_html_skips_the_wrapper() {
        let root = ViewElement::root(vec![
            ViewElement::new("p").with_text("x").into(),
            ViewElement::new("hr").into(),
        ]);
        assert_eq!(root.inner_html(), "<p>x</p><hr>");
    }
}
