//! Node arena backing a render tree
//!
//! All persistent data of a tree lives in one [`Tree`] shared between the
//! [`RootNode`](crate::RootNode) and every [`Node`](crate::Node) handle:
//! - Node data (state, effects, context, hook bookkeeping) in a slot map keyed by [`NodeId`]
//! - Effects in a slot map keyed by [`EffectId`]
//! - The rerender set and the pending-effects queue driven by the root's render loop
//!
//! Borrows of the tree are always short: user code (renders, effects, cleanups,
//! prop comparisons) never runs while the tree is borrowed.

use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use crate::config::RenderConfig;
use crate::diagnostics::{DiagnosticEvent, RenderDiagnostics};
use crate::effect::EffectInfo;
use crate::element::ElementRef;
use crate::error::{RenderError, Result};
use crate::state::StateMap;

new_key_type! {
    /// Unique identifier for a node within its tree
    pub struct NodeId;
    /// Unique identifier for an effect within its tree
    pub struct EffectId;
}

/// Insertion-ordered set with a fast hasher
pub(crate) type FxIndexSet<T> = IndexSet<T, FxBuildHasher>;

/// Shared ownership of a tree (held by the root)
pub(crate) type SharedTree = Rc<RefCell<Tree>>;

/// Non-owning reference to a tree (held by node handles and refs)
pub(crate) type WeakTree = Weak<RefCell<Tree>>;

/// Internal node storage
pub(crate) struct NodeData {
    /// Parent node (None for the root)
    pub parent: Option<NodeId>,
    /// Child nodes created through this node
    pub children: SmallVec<[NodeId; 4]>,
    /// Named and positional hook state
    pub state: StateMap,
    /// Effects registered by this node's renders
    pub effects: SmallVec<[EffectId; 2]>,
    /// Context value visible to this node and its descendants
    pub context: Option<Rc<dyn Any>>,
    /// Descendants that read this node's context
    pub context_consumers: SmallVec<[NodeId; 4]>,
    /// Always rerender regardless of props
    pub always_invalid: bool,
    /// Next positional hook index; Some only while rendering
    pub hook_cursor: Option<usize>,
    /// Hook count of the first successful render
    pub hook_baseline: Option<usize>,
    /// Last element bound to this node
    pub element: Option<ElementRef>,
    /// Whether an element is currently bound
    pub bound: bool,
}

impl NodeData {
    pub(crate) fn new(parent: Option<NodeId>) -> Self {
        Self {
            parent,
            children: SmallVec::new(),
            state: StateMap::new(),
            effects: SmallVec::new(),
            context: None,
            context_consumers: SmallVec::new(),
            always_invalid: false,
            hook_cursor: None,
            hook_baseline: None,
            element: None,
            bound: false,
        }
    }

    /// Description of the bound element for error messages
    pub(crate) fn describe_element(&self) -> String {
        self.element
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "<none>".to_string())
    }
}

/// Persistent storage of one render tree
pub(crate) struct Tree {
    pub nodes: SlotMap<NodeId, NodeData>,
    pub effects: SlotMap<EffectId, EffectInfo>,
    /// Nodes marked for rerender
    pub rerender: FxIndexSet<NodeId>,
    /// Effects to invoke after the current pass
    pub pending_effects: VecDeque<EffectId>,
    pub root: NodeId,
    pub config: RenderConfig,
    pub diagnostics: Option<RenderDiagnostics>,
}

impl Tree {
    /// Create a tree holding only a root node
    pub(crate) fn new(config: RenderConfig) -> Self {
        let mut nodes = SlotMap::with_key();
        let mut root = NodeData::new(None);
        root.always_invalid = true;
        let root = nodes.insert(root);

        let diagnostics = config.diagnostics.then(RenderDiagnostics::new);

        Self {
            nodes,
            effects: SlotMap::with_key(),
            rerender: FxIndexSet::default(),
            pending_effects: VecDeque::with_capacity(64),
            root,
            config,
            diagnostics,
        }
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&NodeData> {
        self.nodes.get(id).ok_or(RenderError::NodeDisposed(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData> {
        self.nodes.get_mut(id).ok_or(RenderError::NodeDisposed(id))
    }

    /// Record a diagnostics event if diagnostics are enabled
    #[inline]
    pub(crate) fn record(&mut self, event: DiagnosticEvent) {
        if let Some(diagnostics) = self.diagnostics.as_mut() {
            diagnostics.record(event);
        }
    }

    /// Allocate a child node under `parent`
    pub(crate) fn insert_child(&mut self, parent: NodeId) -> Result<NodeId> {
        self.node(parent)?;
        let child = self.nodes.insert(NodeData::new(Some(parent)));
        self.node_mut(parent)?.children.push(child);
        Ok(child)
    }

    /// `id` followed by all of its descendants, parents before children
    pub(crate) fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.get(next) {
                out.push(next);
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    /// Nearest node at or above `id` whose context has exactly the type `type_id`
    pub(crate) fn find_context(
        &self,
        id: NodeId,
        type_id: TypeId,
    ) -> Option<(NodeId, Rc<dyn Any>)> {
        let mut current = Some(id);
        while let Some(next) = current {
            let node = self.nodes.get(next)?;
            if let Some(context) = &node.context {
                if (**context).type_id() == type_id {
                    return Some((next, context.clone()));
                }
            }
            current = node.parent;
        }
        None
    }

    /// Remove a node from the arena, detaching it from its parent
    pub(crate) fn remove_node(&mut self, id: NodeId) -> Option<NodeData> {
        let data = self.nodes.remove(id)?;
        if let Some(parent) = data.parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|c| *c != id);
        }
        self.rerender.shift_remove(&id);
        Some(data)
    }

    pub(crate) fn stats(&self) -> TreeStats {
        TreeStats {
            node_count: self.nodes.len(),
            effect_count: self.effects.len(),
            pending_rerenders: self.rerender.len(),
            pending_effects: self.pending_effects.len(),
        }
    }
}

/// Statistics about a render tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeStats {
    pub node_count: usize,
    pub effect_count: usize,
    pub pending_rerenders: usize,
    pub pending_effects: usize,
}
