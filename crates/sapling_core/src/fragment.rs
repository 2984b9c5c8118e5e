//! Fragments: elements rendering a list of children
//!
//! Each child element is rendered into its own child node. On rerender, a node is
//! reused for the first new child it can render (same instance, or same type and
//! key); nodes left without a child are disposed.

use crate::element::{Element, ElementRef};
use crate::error::Result;
use crate::hooks::{current_node, use_children};
use crate::key::ElementKey;
use crate::node::Node;

/// An element rendering several children side by side
///
/// ```rust
/// use sapling_core::{define_component, Fragment, RootNode};
///
/// let list = Fragment::new([
///     define_component(|| Ok(None)),
///     define_component(|| Ok(None)),
/// ]);
///
/// let root = RootNode::new();
/// root.render(list).unwrap();
/// assert_eq!(root.node().children().len(), 2);
/// ```
#[derive(Default)]
pub struct Fragment {
    key: Option<ElementKey>,
    children: Vec<ElementRef>,
}

impl Fragment {
    pub fn new(children: impl IntoIterator<Item = ElementRef>) -> Self {
        Self {
            key: None,
            children: children.into_iter().collect(),
        }
    }

    pub fn with_key(mut self, key: impl Into<ElementKey>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn children(&self) -> &[ElementRef] {
        &self.children
    }
}

impl FromIterator<ElementRef> for Fragment {
    fn from_iter<I: IntoIterator<Item = ElementRef>>(iter: I) -> Self {
        Fragment::new(iter)
    }
}

impl From<Vec<ElementRef>> for Fragment {
    fn from(children: Vec<ElementRef>) -> Self {
        Fragment::new(children)
    }
}

impl Element for Fragment {
    fn key(&self) -> Option<&ElementKey> {
        self.key.as_ref()
    }

    fn props_eq(&self, previous: &dyn Element) -> bool {
        previous
            .as_any()
            .downcast_ref::<Fragment>()
            .is_some_and(|previous| children_identical(&self.children, &previous.children))
    }

    fn render_subtree(&self) -> Result<bool> {
        reconcile_children(&self.children)
    }
}

/// Whether both lists hold the same element instances in the same order
pub(crate) fn children_identical(a: &[ElementRef], b: &[ElementRef]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.ptr_eq(b))
}

/// Render `children` into the current node's child list.
///
/// Returns whether any child rendered or the set of child nodes changed.
pub(crate) fn reconcile_children(children: &[ElementRef]) -> Result<bool> {
    let children_ref = use_children()?;
    let parent = current_node()?;

    let mut previous: Vec<Node> = children_ref
        .get()
        .into_iter()
        .filter(Node::is_alive)
        .collect();
    let previous_ids: Vec<_> = previous.iter().map(Node::id).collect();

    let mut next = Vec::with_capacity(children.len());
    let mut changed = false;

    for child in children {
        let reusable = previous
            .iter()
            .position(|node| node.can_render_element(Some(child)));
        let node = match reusable {
            Some(index) => previous.remove(index),
            None => parent.create_child()?,
        };
        changed |= node.render_element(child)?.is_rendered();
        next.push(node);
    }

    for stale in previous {
        stale.dispose()?;
        changed = true;
    }

    if !changed {
        changed = next.iter().map(Node::id).ne(previous_ids.iter().copied());
    }

    children_ref.set(next);
    Ok(changed)
}
