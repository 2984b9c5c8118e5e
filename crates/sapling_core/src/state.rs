//! Node state slots and typed references
//!
//! Each node owns a [`StateMap`]: type-erased value slots addressed by a [`StateKey`].
//! A key is either a name chosen by the caller or the zero-based position of a hook
//! within the node's render (displayed as `^N`).
//!
//! [`RefObject<T>`] is a typed view over one slot. It does not own the value: the
//! slot lives as long as the node, and a ref to a disposed node reads as empty.
//!
//! ```ignore
//! use sapling_core::hooks::use_ref;
//!
//! // Inside a render: the slot is seeded with 0 on the first render only
//! let clicks = use_ref(0u32)?;
//! clicks.set(clicks.get() + 1);
//! ```

use rustc_hash::FxHashMap;
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::marker::PhantomData;

use crate::error::Result;
use crate::tree::{NodeId, SharedTree, WeakTree};

/// Key of a node state slot
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StateKey {
    /// Named slot
    Named(Cow<'static, str>),
    /// Positional hook slot
    Hook(usize),
}

impl StateKey {
    /// Create a named key
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        StateKey::Named(name.into())
    }

    /// Create a positional hook key
    pub fn hook(index: usize) -> Self {
        StateKey::Hook(index)
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateKey::Named(name) => f.write_str(name),
            StateKey::Hook(index) => write!(f, "^{index}"),
        }
    }
}

/// Type-erased value slots of a node
#[derive(Default)]
pub(crate) struct StateMap {
    slots: FxHashMap<StateKey, Box<dyn Any>>,
}

impl StateMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get<T: 'static>(&self, key: &StateKey) -> Option<&T> {
        self.slots.get(key).and_then(|v| v.downcast_ref::<T>())
    }

    /// Store `value`, returning the previous slot content for the caller to drop
    pub(crate) fn insert<T: 'static>(&mut self, key: StateKey, value: T) -> Option<Box<dyn Any>> {
        self.slots.insert(key, Box::new(value))
    }

    pub(crate) fn contains(&self, key: &StateKey) -> bool {
        self.slots.contains_key(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

/// A persistent, typed reference into a node's state
///
/// Refs are cheap handles: cloning one yields another view of the same slot.
/// Writing through a ref does not trigger a rerender; use
/// [`use_state`](crate::hooks::use_state) for values that should.
pub struct RefObject<T> {
    tree: WeakTree,
    node: NodeId,
    key: StateKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for RefObject<T> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
            node: self.node,
            key: self.key.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for RefObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefObject")
            .field("node", &self.node)
            .field("key", &self.key)
            .finish()
    }
}

impl<T: 'static> RefObject<T> {
    /// Bind to a slot, seeding it with `init()` if the key is absent
    pub(crate) fn bind(
        tree: &SharedTree,
        node: NodeId,
        key: StateKey,
        init: impl FnOnce() -> T,
    ) -> Result<Self> {
        let present = tree.borrow().node(node)?.state.contains(&key);

        if !present {
            // init may be user code; evaluate it outside the borrow
            let value = init();
            let unused = {
                let mut tree = tree.borrow_mut();
                let data = tree.node_mut(node)?;
                if data.state.contains(&key) {
                    Some(value)
                } else {
                    data.state.insert(key.clone(), value);
                    None
                }
            };
            drop(unused);
        }

        Ok(Self {
            tree: std::rc::Rc::downgrade(tree),
            node,
            key,
            _marker: PhantomData,
        })
    }

    /// Key of the referenced slot
    pub fn key(&self) -> &StateKey {
        &self.key
    }

    /// Node owning the referenced slot
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    /// Get the current value, or `None` if the node is gone or the slot holds another type
    pub fn try_get(&self) -> Option<T>
    where
        T: Clone,
    {
        let tree = self.tree.upgrade()?;
        let tree = tree.borrow();
        tree.nodes.get(self.node)?.state.get::<T>(&self.key).cloned()
    }

    /// Get the current value, falling back to `T::default()`
    pub fn get(&self) -> T
    where
        T: Clone + Default,
    {
        self.try_get().unwrap_or_default()
    }

    /// Replace the current value
    ///
    /// Writing to a ref of a disposed node is a no-op.
    pub fn set(&self, value: T) {
        let Some(tree) = self.tree.upgrade() else {
            return;
        };
        let previous = {
            let mut tree = tree.borrow_mut();
            match tree.nodes.get_mut(self.node) {
                Some(node) => node.state.insert(self.key.clone(), value),
                None => return,
            }
        };
        // the old value's Drop may reach back into the tree
        drop(previous);
    }

    /// Update the value using a function
    pub fn update(&self, f: impl FnOnce(T) -> T)
    where
        T: Clone + Default,
    {
        let next = f(self.get());
        self.set(next);
    }

    /// Create a callback that writes its argument into this ref
    pub fn setter(&self) -> impl Fn(T) + 'static {
        let this = self.clone();
        move |value| this.set(value)
    }
}
