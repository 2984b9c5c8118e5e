//! Root node and render loop
//!
//! [`RootNode`] owns a render tree. A top-level render binds the element to the root
//! node and then keeps looping until the tree settles:
//!
//! 1. Rerender every node marked by [`Node::invalidate`], using its last element
//! 2. Invoke pending effects in registration order
//! 3. Repeat while effects invalidated more nodes
//!
//! All of it is synchronous and runs on the calling thread.

use std::cell::RefCell;
use std::ops::Deref;
use std::rc::Rc;

use crate::config::RenderConfig;
use crate::diagnostics::RenderDiagnostics;
use crate::effect::invoke_effect;
use crate::element::ElementRef;
use crate::error::{RenderError, Result};
use crate::node::Node;
use crate::tree::{NodeId, SharedTree, Tree, TreeStats};

/// Owner of a render tree
///
/// Dereferences to the root [`Node`]. Dropping the root disposes the whole tree,
/// running every outstanding effect cleanup.
///
/// # Example
///
/// ```rust
/// use sapling_core::{define_component, RootNode};
///
/// let root = RootNode::new();
/// let app = define_component(|| Ok(None));
///
/// assert!(!root.render_element(&app).unwrap());
/// ```
pub struct RootNode {
    tree: SharedTree,
    node: Node,
}

impl Default for RootNode {
    fn default() -> Self {
        Self::new()
    }
}

impl RootNode {
    /// Create a root with the default configuration
    pub fn new() -> Self {
        Self::with_config(RenderConfig::default())
    }

    pub fn with_config(config: RenderConfig) -> Self {
        let tree = Rc::new(RefCell::new(Tree::new(config)));
        let id = tree.borrow().root;
        let node = Node::new(Rc::downgrade(&tree), id);
        tracing::debug!(root = ?id, "render tree created");
        Self { tree, node }
    }

    /// The root node
    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn config(&self) -> RenderConfig {
        self.tree.borrow().config.clone()
    }

    pub fn stats(&self) -> TreeStats {
        self.tree.borrow().stats()
    }

    /// Events of the most recent top-level render, if diagnostics are enabled
    pub fn diagnostics(&self) -> Option<RenderDiagnostics> {
        self.tree.borrow().diagnostics.clone()
    }

    /// Handle to a live node of this tree
    pub fn node_by_id(&self, id: NodeId) -> Option<Node> {
        self.tree
            .borrow()
            .nodes
            .contains_key(id)
            .then(|| Node::new(Rc::downgrade(&self.tree), id))
    }

    /// Render anything convertible into an element
    pub fn render(&self, element: impl Into<ElementRef>) -> Result<bool> {
        self.render_element(&element.into())
    }

    /// Render `element` at the root and run the tree to quiescence.
    ///
    /// Returns `false` if the element cannot be bound to the root (it differs in
    /// type or key from the last root element). Otherwise returns whether anything
    /// rendered or any effect ran.
    pub fn render_element(&self, element: &ElementRef) -> Result<bool> {
        self.begin()?;

        if !self.node.can_render_element(Some(element)) {
            tracing::debug!(%element, "root cannot render element");
            return Ok(false);
        }

        let span = tracing::debug_span!("render", %element);
        let _enter = span.enter();

        let rendered = self.node.render_element(element)?.is_rendered();
        self.settle(rendered)
    }

    /// Process pending rerenders and effects without rendering the root element.
    ///
    /// Returns whether any node rendered or any effect ran.
    pub fn flush(&self) -> Result<bool> {
        self.begin()?;
        let span = tracing::debug_span!("flush");
        let _enter = span.enter();
        self.settle(false)
    }

    /// Reset diagnostics; fails if the root was disposed
    fn begin(&self) -> Result<()> {
        let mut tree = self.tree.borrow_mut();
        if let Some(diagnostics) = tree.diagnostics.as_mut() {
            diagnostics.clear();
        }
        tree.node(self.node.id())?;
        Ok(())
    }

    fn settle(&self, mut rendered: bool) -> Result<bool> {
        let limit = self.tree.borrow().config.max_passes;
        let mut passes = 0usize;

        loop {
            while let Some(nodes) = self.take_rerender_snapshot() {
                passes += 1;
                if let Some(limit) = limit {
                    if passes > limit {
                        let err = RenderError::PassLimitExceeded { limit };
                        tracing::error!(%err, "render loop aborted");
                        return Err(err);
                    }
                }
                tracing::trace!(pass = passes, nodes = nodes.len(), "rerender pass");
                rendered |= self.rerender(&nodes)?;
            }

            loop {
                let next = self.tree.borrow_mut().pending_effects.pop_front();
                let Some(effect) = next else {
                    break;
                };
                invoke_effect(&self.tree, effect)?;
                rendered = true;
            }

            if self.tree.borrow().rerender.is_empty() {
                break;
            }
        }

        tracing::debug!(rendered, passes, "render settled");
        Ok(rendered)
    }

    fn take_rerender_snapshot(&self) -> Option<Vec<NodeId>> {
        let tree = self.tree.borrow();
        if tree.rerender.is_empty() {
            None
        } else {
            Some(tree.rerender.iter().copied().collect())
        }
    }

    /// Rerender each node with its last element
    fn rerender(&self, nodes: &[NodeId]) -> Result<bool> {
        let mut rendered = false;
        for &id in nodes {
            let element = self
                .tree
                .borrow()
                .nodes
                .get(id)
                .map(|data| data.element.clone());
            match element {
                // disposed since the snapshot was taken
                None => {}
                Some(Some(element)) => {
                    let node = Node::new(Rc::downgrade(&self.tree), id);
                    rendered |= node.render_element(&element)?.is_rendered();
                }
                Some(None) => {
                    self.tree.borrow_mut().rerender.shift_remove(&id);
                }
            }
        }
        Ok(rendered)
    }

    /// Dispose the whole tree and drop anything still queued
    pub fn dispose(&self) -> Result<()> {
        self.node.dispose()?;
        let mut tree = self.tree.borrow_mut();
        tree.rerender.clear();
        tree.pending_effects.clear();
        Ok(())
    }
}

impl Deref for RootNode {
    type Target = Node;

    fn deref(&self) -> &Node {
        &self.node
    }
}

impl Drop for RootNode {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        if let Err(err) = self.dispose() {
            tracing::warn!(%err, "failed to dispose render tree");
        }
    }
}
