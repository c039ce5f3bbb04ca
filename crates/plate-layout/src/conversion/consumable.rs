use std::collections::HashSet;

use crate::view::ViewNode;

/// Child-index path of a view node below the converted view root.
pub type ViewPath = Vec<usize>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Aspect {
    Name,
    Attribute(String),
    Class(String),
}

/// The parts of a view node a converter wants to test or claim.
#[derive(Debug, Clone, Default)]
pub struct ConsumePattern {
    name: bool,
    attributes: Vec<&'static str>,
    classes: Vec<&'static str>,
}

impl ConsumePattern {
    pub fn name() -> Self {
        Self {
            name: true,
            ..Self::default()
        }
    }

    pub fn attribute(mut self, attribute: &'static str) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn class(mut self, class: &'static str) -> Self {
        self.classes.push(class);
        self
    }

    fn aspects(&self) -> impl Iterator<Item = Aspect> + '_ {
        self.name
            .then_some(Aspect::Name)
            .into_iter()
            .chain(
                self.attributes
                    .iter()
                    .map(|a| Aspect::Attribute((*a).to_string())),
            )
            .chain(self.classes.iter().map(|c| Aspect::Class((*c).to_string())))
    }
}

/// Which aspects of which view nodes were already claimed by a converter.
///
/// An aspect the node does not carry (a missing attribute or class) never
/// tests as available.
#[derive(Debug, Default)]
pub struct Consumables {
    consumed: HashSet<(ViewPath, Aspect)>,
}

impl Consumables {
    pub fn test(&self, path: &[usize], node: &ViewNode, pattern: &ConsumePattern) -> bool {
        let present = match node {
            ViewNode::Ui(_) => return false,
            ViewNode::Text(_) => pattern.attributes.is_empty() && pattern.classes.is_empty(),
            ViewNode::Element(el) => {
                pattern.attributes.iter().all(|a| el.attrs.contains_key(*a))
                    && pattern.classes.iter().all(|c| el.has_class(c))
            }
        };
        present
            && pattern
                .aspects()
                .all(|aspect| !self.is_consumed(path, &aspect))
    }

    pub fn consume(&mut self, path: &[usize], node: &ViewNode, pattern: &ConsumePattern) -> bool {
        if !self.test(path, node, pattern) {
            return false;
        }
        for aspect in pattern.aspects() {
            self.consumed.insert((path.to_vec(), aspect));
        }
        true
    }

    pub fn consume_name(&mut self, path: &[usize], node: &ViewNode) -> bool {
        self.consume(path, node, &ConsumePattern::name())
    }

    pub fn is_consumed(&self, path: &[usize], aspect: &Aspect) -> bool {
        self.consumed.contains(&(path.to_vec(), aspect.clone()))
    }

    pub fn len(&self) -> usize {
        self.consumed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.consumed.is_empty()
    }
}
