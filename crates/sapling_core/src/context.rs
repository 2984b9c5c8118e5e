//! Context providers
//!
//! A [`ContextProvider`] stores a value on its node. Any descendant can read the
//! nearest value of a given type with [`use_context`](crate::hooks::use_context);
//! readers are rerendered when the provider is rendered with a different value.

use std::rc::Rc;

use crate::element::{Element, ElementRef};
use crate::error::Result;
use crate::fragment::{children_identical, reconcile_children};
use crate::hooks::current_node;
use crate::key::ElementKey;

/// Provides a value of type `T` to a subtree
///
/// Values are compared by identity: rendering a provider with a new `Rc` (or
/// through [`ContextProvider::new`]) counts as a change.
pub struct ContextProvider<T: 'static> {
    key: Option<ElementKey>,
    value: Rc<T>,
    children: Vec<ElementRef>,
}

impl<T: 'static> ContextProvider<T> {
    pub fn new(value: T, children: impl IntoIterator<Item = ElementRef>) -> Self {
        Self::from_rc(Rc::new(value), children)
    }

    /// Provide an existing shared value
    pub fn from_rc(value: Rc<T>, children: impl IntoIterator<Item = ElementRef>) -> Self {
        Self {
            key: None,
            value,
            children: children.into_iter().collect(),
        }
    }

    pub fn with_key(mut self, key: impl Into<ElementKey>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn value(&self) -> &Rc<T> {
        &self.value
    }
}

impl<T: 'static> Element for ContextProvider<T> {
    fn key(&self) -> Option<&ElementKey> {
        self.key.as_ref()
    }

    fn props_eq(&self, previous: &dyn Element) -> bool {
        previous
            .as_any()
            .downcast_ref::<ContextProvider<T>>()
            .is_some_and(|previous| {
                Rc::ptr_eq(&self.value, &previous.value)
                    && children_identical(&self.children, &previous.children)
            })
    }

    fn render_subtree(&self) -> Result<bool> {
        let node = current_node()?;

        let changed = node
            .local_context()
            .and_then(|previous| previous.downcast::<T>().ok())
            .map_or(true, |previous| !Rc::ptr_eq(&previous, &self.value));

        if changed {
            node.set_local_context(self.value.clone())?;
            let count = node.invalidate_context_consumers()?;
            if count > 0 {
                tracing::trace!(node = ?node.id(), count, "context changed");
            }
        }

        reconcile_children(&self.children)
    }
}
