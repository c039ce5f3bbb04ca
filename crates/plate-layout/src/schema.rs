use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Block,
    Inline,
    /// Only placeable where a parent lists it by kind.
    Nested,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChildConstraint {
    None,
    BlockOnly,
    InlineOnly,
    Any,
    Only(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: String,
    pub role: NodeRole,
    pub children: ChildConstraint,
    #[serde(default)]
    pub attributes: Vec<String>,
    /// Splitting never crosses a limit element.
    #[serde(default)]
    pub is_limit: bool,
    #[serde(default)]
    pub is_object: bool,
}

impl NodeSpec {
    pub fn new(kind: impl Into<String>, role: NodeRole, children: ChildConstraint) -> Self {
        Self {
            kind: kind.into(),
            role,
            children,
            attributes: Vec::new(),
            is_limit: false,
            is_object: false,
        }
    }

    pub fn attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn limit(mut self) -> Self {
        self.is_limit = true;
        self
    }

    pub fn object(mut self) -> Self {
        self.is_object = true;
        self.is_limit = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    specs: HashMap<String, NodeSpec>,
}

impl Schema {
    pub fn register(&mut self, spec: NodeSpec) -> Result<(), RegistryError> {
        if self.specs.contains_key(&spec.kind) {
            return Err(RegistryError::DuplicateNodeSpec(spec.kind));
        }
        self.specs.insert(spec.kind.clone(), spec);
        Ok(())
    }

    pub fn spec(&self, kind: &str) -> Option<&NodeSpec> {
        self.specs.get(kind)
    }

    pub fn specs(&self) -> &HashMap<String, NodeSpec> {
        &self.specs
    }

    pub fn is_known_kind(&self, kind: &str) -> bool {
        self.specs.contains_key(kind)
    }

    pub fn allows_child(&self, parent_kind: &str, child_kind: &str) -> bool {
        let (Some(parent), Some(child)) = (self.specs.get(parent_kind), self.specs.get(child_kind))
        else {
            return false;
        };
        match &parent.children {
            ChildConstraint::None => false,
            ChildConstraint::BlockOnly => child.role == NodeRole::Block,
            ChildConstraint::InlineOnly => child.role == NodeRole::Inline,
            ChildConstraint::Any => child.role != NodeRole::Nested,
            ChildConstraint::Only(kinds) => kinds.iter().any(|k| k == child_kind),
        }
    }

    pub fn allows_attribute(&self, kind: &str, attribute: &str) -> bool {
        self.specs
            .get(kind)
            .is_some_and(|spec| spec.attributes.iter().any(|a| a == attribute))
    }

    pub fn is_limit(&self, kind: &str) -> bool {
        self.specs.get(kind).is_some_and(|spec| spec.is_limit)
    }
}
