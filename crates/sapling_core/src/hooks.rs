//! Hook functions
//!
//! Hooks read and write state of the node currently rendering on this thread.
//! Positional hooks ([`use_ref`], [`use_state`], [`use_effect`], ...) are addressed by
//! call order, so every render of a node must call the same hooks in the same
//! order. A changed hook count is reported as
//! [`RenderError::HookCountMismatch`] when hook validation is enabled.
//!
//! ```rust
//! use sapling_core::hooks::{use_effect, use_state};
//! use sapling_core::{define_component, deps, RootNode};
//!
//! let counter = define_component(|| {
//!     let (count, set_count) = use_state(0u32)?;
//!     use_effect(
//!         move || {
//!             if count < 3 {
//!                 set_count.set(count + 1);
//!             }
//!         },
//!         deps![count],
//!     )?;
//!     Ok(None)
//! });
//!
//! let root = RootNode::new();
//! root.render_element(&counter).unwrap();
//! ```

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use crate::binding;
use crate::effect::{self, Cleanup, Deps, EffectFn, EffectInfo};
use crate::element::ElementRef;
use crate::error::{RenderError, Result};
use crate::node::Node;
use crate::state::RefObject;
use crate::tree::EffectId;

/// The node currently rendering (or running an effect) on this thread
pub fn current_node() -> Result<Node> {
    binding::current()
        .map(|(tree, node, _)| Node::new(tree, node))
        .ok_or(RenderError::NoActiveBinding)
}

/// The element currently bound on this thread
pub fn current_element() -> Result<ElementRef> {
    binding::current()
        .map(|(_, _, element)| element)
        .ok_or(RenderError::NoActiveBinding)
}

/// Whether any element is bound on this thread
pub fn is_rendering() -> bool {
    binding::depth() > 0
}

/// Build a custom hook on top of the current node
///
/// The closure receives `None` when called outside of a render.
pub fn define_hook<T>(hook: impl FnOnce(Option<&Node>) -> T) -> T {
    let node = current_node().ok();
    hook(node.as_ref())
}

/// Positional ref, seeded with `initial` on the first render
pub fn use_ref<T: 'static>(initial: T) -> Result<RefObject<T>> {
    current_node()?.hook_ref(initial)
}

/// Positional ref, seeded lazily on the first render
pub fn use_ref_with<T: 'static>(init: impl FnOnce() -> T) -> Result<RefObject<T>> {
    current_node()?.hook_ref_with(None, init)
}

/// Named ref on the current node
pub fn use_named_ref<T: 'static>(
    name: impl Into<Cow<'static, str>>,
    initial: T,
) -> Result<RefObject<T>> {
    current_node()?.named_ref(name, initial)
}

/// Positional state whose setter rerenders the node
pub fn use_state<T: Clone + 'static>(initial: T) -> Result<(T, StateSetter<T>)> {
    let node = current_node()?;
    let cell = node.hook_ref(initial)?;
    let value = cell
        .try_get()
        .ok_or_else(|| RenderError::HookTypeMismatch {
            key: cell.key().to_string(),
        })?;
    Ok((value, StateSetter { cell, node }))
}

/// Setter returned by [`use_state`]
pub struct StateSetter<T> {
    cell: RefObject<T>,
    node: Node,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            node: self.node.clone(),
        }
    }
}

impl<T: 'static> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter")
            .field("node", &self.node)
            .field("key", self.cell.key())
            .finish()
    }
}

impl<T: 'static> StateSetter<T> {
    /// Store `value` and invalidate the node
    pub fn set(&self, value: T) {
        self.cell.set(value);
        self.node.invalidate();
    }

    /// Replace the value using a function and invalidate the node
    pub fn update(&self, f: impl FnOnce(T) -> T)
    where
        T: Clone + Default,
    {
        self.cell.update(f);
        self.node.invalidate();
    }

    /// Node owning the state
    pub fn node(&self) -> &Node {
        &self.node
    }
}

/// Run `effect` after the render pass whenever `deps` changed.
///
/// An empty dependency list runs the effect after every render.
pub fn use_effect(effect: impl FnOnce() + 'static, deps: Deps) -> Result<()> {
    register_effect(
        Box::new(move || {
            effect();
            None
        }),
        deps,
    )
}

/// Like [`use_effect`], with a cleanup run before the next invocation and on dispose
pub fn use_effect_with_cleanup(effect: impl FnOnce() -> Cleanup + 'static, deps: Deps) -> Result<()> {
    register_effect(Box::new(move || Some(effect())), deps)
}

fn register_effect(effect: EffectFn, deps: Deps) -> Result<()> {
    let node = current_node()?;
    let slot = node.hook_ref::<Option<EffectId>>(None)?;
    let tree = node.tree()?;

    let existing = slot
        .try_get()
        .flatten()
        .filter(|id| tree.borrow().effects.contains_key(*id));
    let id = match existing {
        Some(id) => id,
        None => {
            let id = tree.borrow_mut().effects.insert(EffectInfo::new());
            slot.set(Some(id));
            id
        }
    };

    effect::set_effect(&tree, id, node.id(), effect, deps)?;
    Ok(())
}

/// Nearest context of type `T` provided above the current node.
///
/// The current node is rerendered when the providing node changes its value.
pub fn use_context<T: 'static>() -> Result<Option<Rc<T>>> {
    current_node()?.consume_context::<T>()
}

/// Positional slot holding an optional child node
pub fn use_child() -> Result<RefObject<Option<Node>>> {
    current_node()?.hook_ref(None)
}

/// Positional slot holding a list of child nodes
pub fn use_children() -> Result<RefObject<Vec<Node>>> {
    current_node()?.hook_ref(Vec::new())
}
