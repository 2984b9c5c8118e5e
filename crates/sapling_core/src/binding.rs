//! Ambient element binding
//!
//! While a node renders an element (or runs one of its effects), the pair is pushed
//! onto a thread-local stack so that hook functions can find "the node currently
//! being rendered" without it being passed around. A [`BindScope`] guard pops the
//! stack and releases the node when dropped, including during unwinding.

use std::cell::RefCell;
use std::rc::Rc;

use crate::element::ElementRef;
use crate::error::{RenderError, Result};
use crate::tree::{NodeId, SharedTree, WeakTree};

/// One active binding
struct BindFrame {
    tree: WeakTree,
    node: NodeId,
    element: ElementRef,
}

thread_local! {
    static BIND_STACK: RefCell<Vec<BindFrame>> = const { RefCell::new(Vec::new()) };
}

/// Guard that unbinds an element from its node on drop.
#[must_use = "BindScope unbinds the element on drop"]
pub(crate) struct BindScope {
    tree: WeakTree,
    node: NodeId,
}

impl BindScope {
    /// Bind `element` to `node` and make the pair current on this thread.
    ///
    /// With `hooks` set, the node's hook cursor is opened at zero so positional
    /// hooks can be used for the lifetime of the scope.
    pub(crate) fn enter(
        tree: &SharedTree,
        node: NodeId,
        element: &ElementRef,
        hooks: bool,
    ) -> Result<Self> {
        let already_bound = BIND_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .any(|frame| frame.element.ptr_eq(element))
        });
        if already_bound {
            let err = RenderError::ElementAlreadyBound {
                element: element.to_string(),
            };
            tracing::error!(%err, "binding rejected");
            return Err(err);
        }

        {
            let mut tree = tree.borrow_mut();
            let data = tree.node_mut(node)?;
            if data.bound {
                let err = RenderError::BindingConflict {
                    node,
                    bound: data.describe_element(),
                };
                tracing::error!(%err, "binding rejected");
                return Err(err);
            }
            data.bound = true;
            data.element = Some(element.clone());
            if hooks {
                data.hook_cursor = Some(0);
            }
        }

        BIND_STACK.with(|stack| {
            stack.borrow_mut().push(BindFrame {
                tree: Rc::downgrade(tree),
                node,
                element: element.clone(),
            });
        });

        Ok(Self {
            tree: Rc::downgrade(tree),
            node,
        })
    }

    /// Number of positional hooks used so far in this scope
    pub(crate) fn hook_count(&self) -> Option<usize> {
        let tree = self.tree.upgrade()?;
        let tree = tree.borrow();
        tree.nodes.get(self.node)?.hook_cursor
    }
}

impl Drop for BindScope {
    fn drop(&mut self) {
        BIND_STACK.with(|stack| {
            if let Ok(mut stack) = stack.try_borrow_mut() {
                stack.pop();
            }
        });

        if let Some(tree) = self.tree.upgrade() {
            if let Ok(mut tree) = tree.try_borrow_mut() {
                if let Some(data) = tree.nodes.get_mut(self.node) {
                    data.bound = false;
                    data.hook_cursor = None;
                }
            }
        }
    }
}

/// The innermost binding on this thread
pub(crate) fn current() -> Option<(WeakTree, NodeId, ElementRef)> {
    BIND_STACK.with(|stack| {
        stack
            .borrow()
            .last()
            .map(|frame| (frame.tree.clone(), frame.node, frame.element.clone()))
    })
}

/// Number of active bindings on this thread
pub(crate) fn depth() -> usize {
    BIND_STACK.with(|stack| stack.borrow().len())
}
