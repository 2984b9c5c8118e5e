//! Sapling Core Runtime
//!
//! This crate provides a hooks-based reconciler for declarative element trees:
//!
//! - **Elements**: Immutable descriptions of what to render, matched to nodes by type and key
//! - **Nodes**: Persistent tree positions owning state, effects, and context
//! - **Hooks**: Positional state, refs, effects, and context lookup during render
//! - **Render Loop**: Invalidated nodes rerender and pending effects run until the tree settles
//!
//! Rendering is single-threaded and synchronous. Elements are shared with `Rc`,
//! the tree is owned by a [`RootNode`] and nodes are referenced by cheap [`Node`] handles.
//!
//! # Example
//!
//! ```rust
//! use sapling_core::hooks::{use_effect, use_state};
//! use sapling_core::{define_component, deps, RootNode};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let seen = Rc::new(Cell::new(0));
//!
//! let app = define_component({
//!     let seen = seen.clone();
//!     move || {
//!         let (count, set_count) = use_state(0)?;
//!         let seen = seen.clone();
//!         use_effect(
//!             move || {
//!                 seen.set(count);
//!                 if count < 2 {
//!                     set_count.set(count + 1);
//!                 }
//!             },
//!             deps![count],
//!         )?;
//!         Ok(None)
//!     }
//! });
//!
//! let root = RootNode::new();
//! root.render_element(&app).unwrap();
//! assert_eq!(seen.get(), 2);
//! ```

mod binding;
pub mod component;
pub mod config;
pub mod context;
pub mod diagnostics;
pub mod effect;
pub mod element;
pub mod error;
pub mod fragment;
pub mod hooks;
pub mod key;
pub mod node;
pub mod root;
pub mod state;
mod tree;

#[cfg(test)]
pub(crate) mod testing;

pub use component::{define_component, Component, FunctionComponent};
pub use config::RenderConfig;
pub use context::ContextProvider;
pub use diagnostics::{DiagnosticEvent, RenderDiagnostics};
pub use effect::{Cleanup, Dependency, Deps};
pub use element::{same_props, AsAny, Element, ElementRef};
pub use error::{RenderError, Result};
pub use fragment::Fragment;
pub use hooks::StateSetter;
pub use key::ElementKey;
pub use node::{Node, RenderResult};
pub use root::RootNode;
pub use state::{RefObject, StateKey};
pub use tree::{EffectId, NodeId, TreeStats};
