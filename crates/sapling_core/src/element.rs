//! Elements: immutable descriptions of what a node should render
//!
//! An element is any `'static` type implementing [`Element`]. Elements are shared
//! through [`ElementRef`], a cheap reference-counted handle that also remembers the
//! concrete type so the reconciler can match elements to nodes by type and key.
//!
//! Most user types implement [`Component`](crate::Component) instead, which provides
//! `Element` through a blanket impl.

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::key::{keys_equal, ElementKey};
use crate::node::Node;

/// Upcast to `&dyn Any` for downcasting trait objects
pub trait AsAny: 'static {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Something a node can render
pub trait Element: AsAny {
    /// Key telling this element apart from siblings of the same type
    fn key(&self) -> Option<&ElementKey> {
        None
    }

    /// Whether rendering this element would produce the same output as `previous`.
    ///
    /// `previous` is the element last rendered by the node; it has the same type
    /// and key as `self`. Returning `true` lets the node skip rendering entirely.
    ///
    /// The default reports every element as changed, since the trait cannot see
    /// which fields are props. Elements without props, or with comparable props,
    /// override it (see [`same_props`]). [`FunctionComponent`](crate::FunctionComponent)
    /// treats two elements without props as equal.
    fn props_eq(&self, previous: &dyn Element) -> bool {
        let _ = previous;
        false
    }

    /// Called with the element bound, before [`Element::render_subtree`]
    fn on_bind(&self, node: &Node) -> Result<()> {
        let _ = node;
        Ok(())
    }

    /// Render the element's subtree. Returns whether anything was rendered.
    ///
    /// Runs with the element bound to its node, so hooks are available.
    fn render_subtree(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Compare props of two elements of the same `PartialEq` type
///
/// Helper for [`Element::props_eq`] implementations:
///
/// ```rust
/// use sapling_core::{same_props, Component, Element, ElementRef, Result};
///
/// #[derive(PartialEq)]
/// struct Label(String);
///
/// impl Component for Label {
///     fn props_eq(&self, previous: &dyn Element) -> bool {
///         same_props(self, previous)
///     }
///
///     fn render(&self) -> Result<Option<ElementRef>> {
///         Ok(None)
///     }
/// }
/// ```
pub fn same_props<E: PartialEq + 'static>(this: &E, previous: &dyn Element) -> bool {
    previous
        .as_any()
        .downcast_ref::<E>()
        .is_some_and(|previous| this == previous)
}

/// Shared handle to an element
#[derive(Clone)]
pub struct ElementRef {
    inner: Rc<dyn Element>,
    type_id: TypeId,
    type_name: &'static str,
}

impl ElementRef {
    pub fn new<E: Element>(element: E) -> Self {
        Self {
            inner: Rc::new(element),
            type_id: TypeId::of::<E>(),
            type_name: std::any::type_name::<E>(),
        }
    }

    /// The element itself
    pub fn get(&self) -> &dyn Element {
        &*self.inner
    }

    pub fn key(&self) -> Option<&ElementKey> {
        self.get().key()
    }

    /// `TypeId` of the concrete element type
    pub fn element_type(&self) -> TypeId {
        self.type_id
    }

    /// Name of the concrete element type
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<E: Element>(&self) -> bool {
        self.type_id == TypeId::of::<E>()
    }

    pub fn downcast_ref<E: Element>(&self) -> Option<&E> {
        self.get().as_any().downcast_ref::<E>()
    }

    /// Whether both handles point at the same element instance
    pub fn ptr_eq(&self, other: &ElementRef) -> bool {
        std::ptr::eq(
            Rc::as_ptr(&self.inner) as *const u8,
            Rc::as_ptr(&other.inner) as *const u8,
        )
    }

    /// Whether `other` may be rendered by a node that last rendered `self`:
    /// same instance, or same concrete type and equal keys
    pub fn same_identity(&self, other: &ElementRef) -> bool {
        self.ptr_eq(other) || (self.type_id == other.type_id && keys_equal(self.key(), other.key()))
    }
}

impl<E: Element> From<E> for ElementRef {
    fn from(element: E) -> Self {
        ElementRef::new(element)
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // strip the module path, keeping generic arguments
        let (path, generics) = self
            .type_name
            .split_at(self.type_name.find('<').unwrap_or(self.type_name.len()));
        let name = path.rsplit("::").next().unwrap_or(path);
        let name = format!("{name}{generics}");
        match self.key() {
            Some(key) => write!(f, "{name} key='{key}'"),
            None => f.write_str(&name),
        }
    }
}

impl fmt::Debug for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementRef")
            .field("type", &self.type_name)
            .field("key", &self.key())
            .finish()
    }
}
