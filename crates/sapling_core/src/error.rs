//! Error types for sapling_core

use thiserror::Error;

use crate::tree::NodeId;

/// Errors raised while binding, rendering, or disposing nodes
///
/// Every variant except [`RenderError::Other`] signals a programming error in the
/// element tree. None of them are retried internally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The element is already bound to a node further up the render stack
    #[error("Element {element} is already bound to another node")]
    ElementAlreadyBound {
        /// Description of the element
        element: String,
    },

    /// The node already has an element bound to it
    #[error("Node {node:?} is already bound to element {bound}")]
    BindingConflict {
        /// Node that was already bound
        node: NodeId,
        /// Description of the element currently bound
        bound: String,
    },

    /// A positional hook was requested while the node is not rendering
    #[error("Cannot use hooks outside the rendering method ({element})")]
    HookOutsideRender {
        /// Description of the element bound to the node, if any
        element: String,
    },

    /// A hook was called with no element bound on this thread
    #[error("No element is currently bound on this thread")]
    NoActiveBinding,

    /// The number of positional hooks changed between two successful renders
    #[error(
        "The number of hooks ({actual}) does not match with the previous render ({expected})"
    )]
    HookCountMismatch {
        /// Hook count recorded by the first successful render
        expected: usize,
        /// Hook count of the offending render
        actual: usize,
    },

    /// A hook slot holds a value of another type, usually because hook order changed
    #[error("Hook state {key} holds a value of a different type")]
    HookTypeMismatch {
        /// Key of the offending slot
        key: String,
    },

    /// The node has been disposed
    #[error("Node {0:?} has been disposed")]
    NodeDisposed(NodeId),

    /// The tree owning the node was dropped
    #[error("The render tree has been dropped")]
    TreeDropped,

    /// The render loop did not settle within the configured number of passes
    #[error("Render loop did not converge within {limit} passes")]
    PassLimitExceeded {
        /// Configured pass limit
        limit: usize,
    },

    /// Error raised by user render code
    #[error("{0}")]
    Other(String),
}

impl RenderError {
    /// Create an error from user render code
    pub fn other(message: impl Into<String>) -> Self {
        RenderError::Other(message.into())
    }
}

/// Result type for sapling_core operations
pub type Result<T> = std::result::Result<T, RenderError>;
