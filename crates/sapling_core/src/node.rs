//! Node handles
//!
//! A [`Node`] is a persistent position in the render tree. Nodes outlive the
//! elements rendered into them: an element is an immutable description, the node
//! keeps the state, effects, and context across renders.
//!
//! `Node` is a cheap handle (tree reference + [`NodeId`]). Handles do not keep the
//! tree alive; operations on a handle whose tree was dropped or whose node was
//! disposed fail with [`RenderError::TreeDropped`] or [`RenderError::NodeDisposed`].

use smallvec::SmallVec;
use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::binding::BindScope;
use crate::diagnostics::DiagnosticEvent;
use crate::effect::{cleanup_effect, EffectInfo};
use crate::element::ElementRef;
use crate::error::{RenderError, Result};
use crate::state::{RefObject, StateKey};
use crate::tree::{NodeId, SharedTree, WeakTree};

/// Outcome of [`Node::render_element`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderResult {
    /// Nothing was rendered: props were unchanged, or the subtree rendered nothing
    Skipped,
    /// The element rendered
    Rendered,
    /// The element cannot be rendered by this node (type or key differs)
    Mismatch,
}

impl RenderResult {
    pub fn is_rendered(self) -> bool {
        matches!(self, RenderResult::Rendered)
    }
}

/// Handle to a node of a render tree
#[derive(Clone)]
pub struct Node {
    tree: WeakTree,
    id: NodeId,
}

impl Node {
    pub(crate) fn new(tree: WeakTree, id: NodeId) -> Self {
        Self { tree, id }
    }

    pub(crate) fn tree(&self) -> Result<SharedTree> {
        self.tree.upgrade().ok_or(RenderError::TreeDropped)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Whether the node still exists in a live tree
    pub fn is_alive(&self) -> bool {
        self.tree
            .upgrade()
            .is_some_and(|tree| tree.borrow().nodes.contains_key(self.id))
    }

    pub fn parent(&self) -> Option<Node> {
        let tree = self.tree.upgrade()?;
        let parent = tree.borrow().nodes.get(self.id)?.parent?;
        Some(Node::new(self.tree.clone(), parent))
    }

    /// Child nodes in creation order
    pub fn children(&self) -> Vec<Node> {
        let Some(tree) = self.tree.upgrade() else {
            return Vec::new();
        };
        let tree = tree.borrow();
        tree.nodes
            .get(self.id)
            .map(|data| {
                data.children
                    .iter()
                    .map(|child| Node::new(self.tree.clone(), *child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The element last bound to this node
    pub fn element(&self) -> Option<ElementRef> {
        let tree = self.tree.upgrade()?;
        let element = tree.borrow().nodes.get(self.id)?.element.clone();
        element
    }

    /// Whether an element is bound right now (rendering or running an effect)
    pub fn is_bound(&self) -> bool {
        self.tree.upgrade().is_some_and(|tree| {
            tree.borrow()
                .nodes
                .get(self.id)
                .is_some_and(|data| data.bound)
        })
    }

    pub fn always_invalid(&self) -> bool {
        self.tree.upgrade().is_some_and(|tree| {
            tree.borrow()
                .nodes
                .get(self.id)
                .is_some_and(|data| data.always_invalid)
        })
    }

    /// Make the node rerender on every render regardless of props
    pub fn set_always_invalid(&self, always_invalid: bool) -> Result<()> {
        let tree = self.tree()?;
        let mut tree = tree.borrow_mut();
        tree.node_mut(self.id)?.always_invalid = always_invalid;
        Ok(())
    }

    /// Number of occupied state slots
    pub fn state_len(&self) -> usize {
        self.tree.upgrade().map_or(0, |tree| {
            tree.borrow()
                .nodes
                .get(self.id)
                .map_or(0, |data| data.state.len())
        })
    }

    /// Number of effects registered by this node
    pub fn effect_count(&self) -> usize {
        self.tree.upgrade().map_or(0, |tree| {
            tree.borrow()
                .nodes
                .get(self.id)
                .map_or(0, |data| data.effects.len())
        })
    }

    /// Context value of this node itself
    pub fn local_context(&self) -> Option<Rc<dyn Any>> {
        let tree = self.tree.upgrade()?;
        let context = tree.borrow().nodes.get(self.id)?.context.clone();
        context
    }

    /// Set the context value visible to this node and its descendants
    pub fn set_local_context<T: 'static>(&self, value: Rc<T>) -> Result<()> {
        let tree = self.tree()?;
        let previous = {
            let mut tree = tree.borrow_mut();
            tree.node_mut(self.id)?.context.replace(value)
        };
        drop(previous);
        Ok(())
    }

    /// Remove this node's context value
    pub fn clear_local_context(&self) -> Result<()> {
        let tree = self.tree()?;
        let previous = tree.borrow_mut().node_mut(self.id)?.context.take();
        drop(previous);
        Ok(())
    }

    /// Nearest context of type `T` on this node or its ancestors
    pub fn find_nearest_context<T: 'static>(&self) -> Option<Rc<T>> {
        self.find_nearest_context_of(TypeId::of::<T>())
            .and_then(|context| context.downcast::<T>().ok())
    }

    /// Nearest context whose concrete type is exactly `type_id`
    pub fn find_nearest_context_of(&self, type_id: TypeId) -> Option<Rc<dyn Any>> {
        let tree = self.tree.upgrade()?;
        let found = tree.borrow().find_context(self.id, type_id);
        found.map(|(_, context)| context)
    }

    /// Like [`Node::find_nearest_context`], also subscribing this node to the
    /// provider so it is invalidated when the provider's value changes
    pub(crate) fn consume_context<T: 'static>(&self) -> Result<Option<Rc<T>>> {
        let tree = self.tree()?;
        let mut guard = tree.borrow_mut();
        let tree = &mut *guard;
        let Some((provider, context)) = tree.find_context(self.id, TypeId::of::<T>()) else {
            return Ok(None);
        };
        if provider != self.id {
            let consumers = &mut tree.node_mut(provider)?.context_consumers;
            if !consumers.contains(&self.id) {
                consumers.push(self.id);
            }
        }
        Ok(context.downcast::<T>().ok())
    }

    /// Invalidate every live node that consumed this node's context
    pub(crate) fn invalidate_context_consumers(&self) -> Result<usize> {
        let tree = self.tree()?;
        let consumers: SmallVec<[NodeId; 4]> = {
            let mut tree = tree.borrow_mut();
            let tree = &mut *tree;
            let consumers = std::mem::take(&mut tree.node_mut(self.id)?.context_consumers);
            consumers
                .into_iter()
                .filter(|id| tree.nodes.contains_key(*id))
                .collect()
        };
        let mut count = 0;
        for id in consumers {
            if Node::new(self.tree.clone(), id).invalidate() {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Named state slot, seeded with `initial` if absent
    ///
    /// Unlike positional hooks, named refs can be used outside of rendering.
    pub fn named_ref<T: 'static>(
        &self,
        name: impl Into<Cow<'static, str>>,
        initial: T,
    ) -> Result<RefObject<T>> {
        let tree = self.tree()?;
        RefObject::bind(&tree, self.id, StateKey::named(name), || initial)
    }

    /// Next positional hook slot, seeded with `initial` if absent
    pub fn hook_ref<T: 'static>(&self, initial: T) -> Result<RefObject<T>> {
        self.hook_ref_with(None, || initial)
    }

    /// Positional hook slot
    ///
    /// With `index` set the slot at that position is used and the hook cursor is
    /// left untouched, otherwise the next position is taken. `init` runs only when
    /// the slot is first created.
    pub fn hook_ref_with<T: 'static>(
        &self,
        index: Option<usize>,
        init: impl FnOnce() -> T,
    ) -> Result<RefObject<T>> {
        let tree = self.tree()?;
        let key = {
            let mut tree = tree.borrow_mut();
            let data = tree.node_mut(self.id)?;
            let Some(cursor) = data.hook_cursor else {
                return Err(RenderError::HookOutsideRender {
                    element: data.describe_element(),
                });
            };
            let index = match index {
                Some(index) => index,
                None => {
                    data.hook_cursor = Some(cursor + 1);
                    cursor
                }
            };
            StateKey::Hook(index)
        };
        RefObject::bind(&tree, self.id, key, init)
    }

    /// Mark the node for rerender in the current or next render pass.
    ///
    /// Returns `true` if the node was newly marked. Invalidating a disposed node
    /// is a no-op.
    pub fn invalidate(&self) -> bool {
        let Some(tree) = self.tree.upgrade() else {
            return false;
        };
        let mut tree = tree.borrow_mut();
        if !tree.nodes.contains_key(self.id) || !tree.rerender.insert(self.id) {
            return false;
        }
        tree.record(DiagnosticEvent::NodeInvalidated(self.id));
        tracing::trace!(node = ?self.id, "node invalidated");
        true
    }

    /// Create a child node under this node
    pub fn create_child(&self) -> Result<Node> {
        let tree = self.tree()?;
        let child = tree.borrow_mut().insert_child(self.id)?;
        Ok(Node::new(self.tree.clone(), child))
    }

    /// Whether this node can render `element`.
    ///
    /// A node that never rendered accepts anything. Otherwise the element must be
    /// the same instance as the last one, or share its concrete type and key.
    pub fn can_render_element(&self, element: Option<&ElementRef>) -> bool {
        let Some(element) = element else {
            return false;
        };
        let Some(tree) = self.tree.upgrade() else {
            return false;
        };
        let current = {
            let tree = tree.borrow();
            match tree.nodes.get(self.id) {
                Some(data) => data.element.clone(),
                None => return false,
            }
        };
        current.map_or(true, |current| current.same_identity(element))
    }

    /// Render `element` into this node.
    ///
    /// The node rerenders when it was invalidated, is always invalid, never rendered
    /// before, or the element's props differ from the last element. Otherwise the
    /// render is skipped without running any user code.
    pub fn render_element(&self, element: &ElementRef) -> Result<RenderResult> {
        let tree = self.tree()?;
        if !self.can_render_element(Some(element)) {
            return Ok(RenderResult::Mismatch);
        }

        let (invalidated, always_invalid, previous) = {
            let mut tree = tree.borrow_mut();
            let invalidated = tree.rerender.shift_remove(&self.id);
            let data = tree.node(self.id)?;
            (invalidated, data.always_invalid, data.element.clone())
        };

        let should_render = invalidated
            || always_invalid
            || previous.map_or(true, |previous| !element.get().props_eq(previous.get()));

        if !should_render {
            tree.borrow_mut()
                .record(DiagnosticEvent::NodeRenderSkipped(self.id));
            tracing::trace!(node = ?self.id, %element, "render skipped");
            return Ok(RenderResult::Skipped);
        }

        let result = self.render_bound(&tree, element);
        if let Err(err) = &result {
            tree.borrow_mut()
                .record(DiagnosticEvent::Error(err.to_string()));
            tracing::error!(node = ?self.id, %element, %err, "render failed");
        }
        result
    }

    fn render_bound(&self, tree: &SharedTree, element: &ElementRef) -> Result<RenderResult> {
        let scope = BindScope::enter(tree, self.id, element, true)?;
        tree.borrow_mut().record(DiagnosticEvent::NodeRendering {
            node: self.id,
            element: element.type_name(),
        });
        tracing::trace!(node = ?self.id, %element, "rendering");

        element.get().on_bind(self)?;
        let rendered = element.get().render_subtree()?;

        if rendered && tree.borrow().config.validate_hooks {
            let actual = scope.hook_count().unwrap_or(0);
            let mut tree = tree.borrow_mut();
            let data = tree.node_mut(self.id)?;
            match data.hook_baseline {
                None => data.hook_baseline = Some(actual),
                Some(expected) if expected != actual => {
                    return Err(RenderError::HookCountMismatch { expected, actual });
                }
                Some(_) => {}
            }
        }

        drop(scope);
        Ok(if rendered {
            RenderResult::Rendered
        } else {
            RenderResult::Skipped
        })
    }

    /// Dispose this node and its whole subtree.
    ///
    /// Descendants are disposed before their parents. For each node the cleanup of
    /// every effect is called, then its state, effects, and element are released
    /// and the node leaves the tree. Disposing twice is a no-op.
    pub fn dispose(&self) -> Result<()> {
        let Some(tree) = self.tree.upgrade() else {
            return Ok(());
        };
        let nodes = tree.borrow().subtree(self.id);
        for id in nodes.into_iter().rev() {
            dispose_node(&tree, id)?;
        }
        Ok(())
    }
}

fn dispose_node(tree: &SharedTree, id: NodeId) -> Result<()> {
    let effects = match tree.borrow().nodes.get(id) {
        Some(data) => data.effects.clone(),
        None => return Ok(()),
    };

    for effect in &effects {
        cleanup_effect(tree, *effect)?;
    }

    let released: (Option<_>, Vec<EffectInfo>) = {
        let mut tree = tree.borrow_mut();
        let infos = effects
            .iter()
            .filter_map(|effect| tree.effects.remove(*effect))
            .collect();
        tree.pending_effects.retain(|effect| !effects.contains(effect));
        let data = tree.remove_node(id);
        tree.record(DiagnosticEvent::NodeDisposed(id));
        (data, infos)
    };
    // state values and closures may run arbitrary drop code
    drop(released);

    tracing::trace!(node = ?id, "node disposed");
    Ok(())
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Weak::ptr_eq(&self.tree, &other.tree)
    }
}

impl Eq for Node {}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Node").field(&self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::element::Element;
    use crate::hooks::{current_element, current_node, use_effect_with_cleanup, use_ref};
    use crate::root::RootNode;
    use crate::testing::{entries, init_tracing, log, Leaf, OtherLeaf};
    use crate::effect::Cleanup;
    use crate::deps;
    use std::cell::Cell;

    /// Uses a configurable number of positional hooks
    struct HookUser {
        hooks: Rc<Cell<usize>>,
    }

    impl Element for HookUser {
        fn render_subtree(&self) -> Result<bool> {
            for i in 0..self.hooks.get() {
                use_ref(i)?;
            }
            Ok(true)
        }
    }

    /// Renders `inner` into its own node while bound
    struct Reenter {
        inner: Option<ElementRef>,
    }

    impl Element for Reenter {
        fn render_subtree(&self) -> Result<bool> {
            match &self.inner {
                Some(inner) => current_node()?.render_element(inner).map(RenderResult::is_rendered),
                None => Ok(true),
            }
        }
    }

    /// Renders its own element into a fresh child node
    struct SelfNesting;

    impl Element for SelfNesting {
        fn render_subtree(&self) -> Result<bool> {
            let child = current_node()?.create_child()?;
            child.render_element(&current_element()?).map(RenderResult::is_rendered)
        }
    }

    #[test]
    fn test_can_render_element_truth_table() {
        init_tracing();
        let root = RootNode::new();
        let events = log();
        let node = root.create_child().unwrap();

        let leaf = ElementRef::new(Leaf::new(1, &events));
        assert!(!node.can_render_element(None));
        assert!(node.can_render_element(Some(&leaf)));
        assert!(node.can_render_element(Some(&ElementRef::new(OtherLeaf {
            key: None,
            log: events.clone(),
        }))));

        node.render_element(&leaf).unwrap();

        assert!(node.can_render_element(Some(&leaf)));
        assert!(node.can_render_element(Some(&ElementRef::new(Leaf::new(9, &events)))));
        assert!(!node.can_render_element(Some(&ElementRef::new(Leaf::keyed("a", 1, &events)))));
        assert!(!node.can_render_element(Some(&ElementRef::new(OtherLeaf {
            key: None,
            log: events.clone(),
        }))));

        let keyed = root.create_child().unwrap();
        keyed
            .render_element(&ElementRef::new(Leaf::keyed("a", 1, &events)))
            .unwrap();
        assert!(keyed.can_render_element(Some(&ElementRef::new(Leaf::keyed("a", 2, &events)))));
        assert!(!keyed.can_render_element(Some(&ElementRef::new(Leaf::keyed("b", 1, &events)))));
        assert!(!keyed.can_render_element(Some(&ElementRef::new(Leaf::new(1, &events)))));
    }

    #[test]
    fn test_mismatch_is_reported() {
        let root = RootNode::new();
        let events = log();
        let node = root.create_child().unwrap();

        node.render_element(&ElementRef::new(Leaf::new(1, &events)))
            .unwrap();
        let result = node
            .render_element(&ElementRef::new(OtherLeaf {
                key: None,
                log: events.clone(),
            }))
            .unwrap();

        assert_eq!(result, RenderResult::Mismatch);
        assert_eq!(entries(&events), vec!["leaf 1"]);
    }

    #[test]
    fn test_equal_props_skip_without_user_code() {
        let root = RootNode::new();
        let events = log();
        let node = root.create_child().unwrap();

        let first = node
            .render_element(&ElementRef::new(Leaf::new(1, &events)))
            .unwrap();
        let second = node
            .render_element(&ElementRef::new(Leaf::new(1, &events)))
            .unwrap();
        let third = node
            .render_element(&ElementRef::new(Leaf::new(2, &events)))
            .unwrap();

        assert_eq!(first, RenderResult::Rendered);
        assert_eq!(second, RenderResult::Skipped);
        assert_eq!(third, RenderResult::Rendered);
        assert_eq!(entries(&events), vec!["leaf 1", "leaf 2"]);
    }

    #[test]
    fn test_invalidate_and_always_invalid_force_render() {
        let root = RootNode::new();
        let events = log();
        let node = root.create_child().unwrap();
        node.render_element(&ElementRef::new(Leaf::new(1, &events)))
            .unwrap();

        assert!(node.invalidate());
        assert!(!node.invalidate());
        let result = node
            .render_element(&ElementRef::new(Leaf::new(1, &events)))
            .unwrap();
        assert_eq!(result, RenderResult::Rendered);

        // the rerender consumed the mark
        assert!(node.invalidate());
        node.render_element(&ElementRef::new(Leaf::new(1, &events)))
            .unwrap();

        node.set_always_invalid(true).unwrap();
        node.render_element(&ElementRef::new(Leaf::new(1, &events)))
            .unwrap();
        assert_eq!(entries(&events).len(), 4);
    }

    #[test]
    fn test_invalidate_disposed_node() {
        let root = RootNode::new();
        let node = root.create_child().unwrap();
        node.dispose().unwrap();

        assert!(!node.is_alive());
        assert!(!node.invalidate());
        assert_eq!(root.stats().pending_rerenders, 0);
    }

    #[test]
    fn test_hooks_outside_render() {
        let root = RootNode::new();
        let node = root.create_child().unwrap();

        assert!(matches!(
            node.hook_ref(1),
            Err(RenderError::HookOutsideRender { .. })
        ));
        // named refs do not need a render
        let named = node.named_ref("label", "x").unwrap();
        assert_eq!(named.get(), "x");
        assert_eq!(node.state_len(), 1);
    }

    #[test]
    fn test_hook_count_mismatch_on_second_render() {
        init_tracing();
        let root = RootNode::new();
        let node = root.create_child().unwrap();
        node.set_always_invalid(true).unwrap();
        let hooks = Rc::new(Cell::new(2));
        let element = ElementRef::new(HookUser {
            hooks: hooks.clone(),
        });

        node.render_element(&element).unwrap();
        node.render_element(&element).unwrap();

        hooks.set(3);
        assert_eq!(
            node.render_element(&element),
            Err(RenderError::HookCountMismatch {
                expected: 2,
                actual: 3
            })
        );
        // unbound even though the render failed
        assert!(!node.is_bound());
    }

    #[test]
    fn test_hook_count_validation_disabled() {
        let root = RootNode::with_config(RenderConfig::default().validate_hooks(false));
        let node = root.create_child().unwrap();
        node.set_always_invalid(true).unwrap();
        let hooks = Rc::new(Cell::new(1));
        let element = ElementRef::new(HookUser {
            hooks: hooks.clone(),
        });

        node.render_element(&element).unwrap();
        hooks.set(4);
        assert!(node.render_element(&element).is_ok());
        assert_eq!(node.state_len(), 4);
    }

    #[test]
    fn test_binding_conflicts() {
        let root = RootNode::new();

        let node = root.create_child().unwrap();
        let nested = ElementRef::new(Reenter {
            inner: Some(ElementRef::new(Reenter { inner: None })),
        });
        assert!(matches!(
            node.render_element(&nested),
            Err(RenderError::BindingConflict { .. })
        ));
        assert!(!node.is_bound());

        let node = root.create_child().unwrap();
        assert!(matches!(
            node.render_element(&ElementRef::new(SelfNesting)),
            Err(RenderError::ElementAlreadyBound { .. })
        ));
    }

    #[test]
    fn test_dispose_cleans_subtree_once() {
        init_tracing();
        let root = RootNode::new();
        let events = log();

        struct WithEffect {
            name: &'static str,
            log: crate::testing::Log,
        }

        impl Element for WithEffect {
            fn render_subtree(&self) -> Result<bool> {
                use_ref(0u8)?;
                let log = self.log.clone();
                let name = self.name;
                use_effect_with_cleanup(
                    move || Cleanup::new(move || log.borrow_mut().push(format!("cleanup {name}"))),
                    deps![],
                )?;
                Ok(true)
            }
        }

        let parent = root.create_child().unwrap();
        let child = parent.create_child().unwrap();
        parent
            .render_element(&ElementRef::new(WithEffect {
                name: "parent",
                log: events.clone(),
            }))
            .unwrap();
        child
            .render_element(&ElementRef::new(WithEffect {
                name: "child",
                log: events.clone(),
            }))
            .unwrap();

        // run the queued effects through a root render
        root.render(Leaf::new(0, &events)).unwrap();
        assert_eq!(parent.effect_count(), 1);
        assert_eq!(parent.state_len(), 2);

        parent.dispose().unwrap();
        parent.dispose().unwrap();

        assert_eq!(
            entries(&events),
            vec!["leaf 0", "cleanup child", "cleanup parent"]
        );
        assert!(!parent.is_alive());
        assert!(!child.is_alive());
        assert_eq!(parent.state_len(), 0);
        assert_eq!(root.stats().effect_count, 0);
        assert!(root.children().is_empty());
    }

    #[test]
    fn test_handles_after_tree_drop() {
        let root = RootNode::new();
        let node = root.create_child().unwrap();
        drop(root);

        assert!(!node.is_alive());
        assert!(node.parent().is_none());
        assert_eq!(node.create_child().err(), Some(RenderError::TreeDropped));
        assert!(node.dispose().is_ok());
    }
}
