//! Components: elements that render to at most one child element
//!
//! A [`Component`] returns an element (or nothing) from [`Component::render`]. The
//! returned element is rendered into a child node that persists across renders as
//! long as its type and key stay the same. Returning `None` disposes the child.

use crate::effect::Dependency;
use crate::element::{Element, ElementRef};
use crate::error::Result;
use crate::hooks::{current_node, use_child};
use crate::key::ElementKey;
use crate::node::{Node, RenderResult};

/// An element with a single rendered child
///
/// # Example
///
/// ```rust
/// use sapling_core::{same_props, Component, Element, ElementRef, Result, RootNode};
///
/// #[derive(PartialEq)]
/// struct Greeting {
///     name: String,
/// }
///
/// impl Component for Greeting {
///     fn props_eq(&self, previous: &dyn Element) -> bool {
///         same_props(self, previous)
///     }
///
///     fn render(&self) -> Result<Option<ElementRef>> {
///         Ok(None)
///     }
/// }
///
/// let root = RootNode::new();
/// root.render(Greeting { name: "world".into() }).unwrap();
/// ```
pub trait Component: 'static {
    /// Key telling this component apart from siblings of the same type
    fn key(&self) -> Option<&ElementKey> {
        None
    }

    /// Whether `previous` (same type and key) renders identically; see [`Element::props_eq`]
    fn props_eq(&self, previous: &dyn Element) -> bool {
        let _ = previous;
        false
    }

    /// Called with the component bound, before [`Component::render`]
    fn on_bind(&self, node: &Node) -> Result<()> {
        let _ = node;
        Ok(())
    }

    /// Produce the child element. Hooks may be used here.
    fn render(&self) -> Result<Option<ElementRef>>;
}

impl<C: Component> Element for C {
    fn key(&self) -> Option<&ElementKey> {
        Component::key(self)
    }

    fn props_eq(&self, previous: &dyn Element) -> bool {
        Component::props_eq(self, previous)
    }

    fn on_bind(&self, node: &Node) -> Result<()> {
        Component::on_bind(self, node)
    }

    fn render_subtree(&self) -> Result<bool> {
        render_component(self)
    }
}

fn render_component<C: Component>(component: &C) -> Result<bool> {
    let child_ref = use_child()?;
    let existing = child_ref.get().filter(Node::is_alive);

    let Some(child) = component.render()? else {
        if let Some(node) = existing {
            node.dispose()?;
        }
        child_ref.set(None);
        return Ok(false);
    };

    let parent = current_node()?;
    let node = match existing {
        Some(node) => node,
        None => {
            let node = parent.create_child()?;
            child_ref.set(Some(node.clone()));
            node
        }
    };

    let mut result = node.render_element(&child)?;
    if result == RenderResult::Mismatch {
        tracing::trace!(node = ?node.id(), %child, "child replaced");
        node.dispose()?;
        let fresh = parent.create_child()?;
        child_ref.set(Some(fresh.clone()));
        result = fresh.render_element(&child)?;
    }
    Ok(result.is_rendered())
}

type RenderFn = Box<dyn Fn() -> Result<Option<ElementRef>>>;

/// Component built from a closure
///
/// A function component only rerenders when its node is invalidated, when it is
/// first rendered, or when its props (see [`FunctionComponent::with_props`]) differ
/// from the previous element's. Two elements without props compare equal.
pub struct FunctionComponent {
    render: RenderFn,
    key: Option<ElementKey>,
    props: Option<Box<dyn Dependency>>,
}

impl FunctionComponent {
    pub fn new(render: impl Fn() -> Result<Option<ElementRef>> + 'static) -> Self {
        Self {
            render: Box::new(render),
            key: None,
            props: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<ElementKey>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Props compared against the previous element to decide whether to rerender
    pub fn with_props<P: PartialEq + 'static>(mut self, props: P) -> Self {
        self.props = Some(Box::new(props));
        self
    }
}

impl Component for FunctionComponent {
    fn key(&self) -> Option<&ElementKey> {
        self.key.as_ref()
    }

    fn props_eq(&self, previous: &dyn Element) -> bool {
        let Some(previous) = previous.as_any().downcast_ref::<FunctionComponent>() else {
            return false;
        };
        match (&self.props, &previous.props) {
            (None, None) => true,
            (Some(props), Some(previous)) => (**props).dep_eq(&**previous),
            _ => false,
        }
    }

    fn render(&self) -> Result<Option<ElementRef>> {
        (self.render)()
    }
}

/// Create a [`FunctionComponent`] element from a render closure
pub fn define_component(render: impl Fn() -> Result<Option<ElementRef>> + 'static) -> ElementRef {
    ElementRef::new(FunctionComponent::new(render))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::root::RootNode;
    use crate::testing::{entries, init_tracing, log, Leaf, OtherLeaf, Wrapper};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_empty_render_disposes_child() {
        init_tracing();
        let root = RootNode::new();
        let events = log();
        let show = Rc::new(Cell::new(true));

        let app = {
            let events = events.clone();
            let show = show.clone();
            define_component(move || {
                Ok(show
                    .get()
                    .then(|| ElementRef::new(Leaf::new(1, &events))))
            })
        };

        assert!(root.render_element(&app).unwrap());
        let first = root.children();
        assert_eq!(first.len(), 1);

        show.set(false);
        assert!(!root.render_element(&app).unwrap());
        assert!(root.children().is_empty());
        assert!(!first[0].is_alive());

        show.set(true);
        root.render_element(&app).unwrap();
        let second = root.children();
        assert_eq!(second.len(), 1);
        assert_ne!(second[0], first[0]);
    }

    #[test]
    fn test_type_change_replaces_child() {
        let root = RootNode::new();
        let events = log();
        let other = Rc::new(Cell::new(false));

        let app = {
            let events = events.clone();
            let other = other.clone();
            define_component(move || {
                let key = Some(ElementKey::from("slot"));
                Ok(Some(if other.get() {
                    ElementRef::new(OtherLeaf {
                        key,
                        log: events.clone(),
                    })
                } else {
                    ElementRef::new(Leaf {
                        key,
                        value: 1,
                        log: events.clone(),
                    })
                }))
            })
        };

        root.render_element(&app).unwrap();
        let before = root.children();

        other.set(true);
        assert!(root.render_element(&app).unwrap());
        let after = root.children();

        assert_eq!(after.len(), 1);
        assert_ne!(after[0], before[0]);
        assert!(!before[0].is_alive());
        assert!(after[0].element().is_some_and(|e| e.is::<OtherLeaf>()));
        assert_eq!(entries(&events), vec!["leaf 1", "other"]);
    }

    #[test]
    fn test_pure_component_skips_equal_props() {
        let root = RootNode::new();
        let events = log();
        let value = Rc::new(Cell::new(1));

        let app = {
            let events = events.clone();
            let value = value.clone();
            define_component(move || {
                Ok(Some(ElementRef::new(Wrapper {
                    value: value.get(),
                    child: Some(ElementRef::new(Leaf::new(value.get(), &events))),
                    log: events.clone(),
                })))
            })
        };

        root.render_element(&app).unwrap();
        root.render_element(&app).unwrap();
        value.set(2);
        root.render_element(&app).unwrap();

        assert_eq!(
            entries(&events),
            vec!["wrapper 1", "leaf 1", "wrapper 2", "leaf 2"]
        );
    }

    #[test]
    fn test_function_component_rerenders_on_props_change() {
        let root = RootNode::new();
        let renders = Rc::new(Cell::new(0));
        let props = Rc::new(Cell::new(1u32));

        let app = {
            let renders = renders.clone();
            let props = props.clone();
            define_component(move || {
                let renders = renders.clone();
                let inner = FunctionComponent::new(move || {
                    renders.set(renders.get() + 1);
                    Ok(None)
                })
                .with_props(props.get());
                Ok(Some(ElementRef::new(inner)))
            })
        };

        root.render_element(&app).unwrap();
        root.render_element(&app).unwrap();
        assert_eq!(renders.get(), 1);

        props.set(2);
        root.render_element(&app).unwrap();
        assert_eq!(renders.get(), 2);
    }

    #[test]
    fn test_function_component_props_eq() {
        let plain = FunctionComponent::new(|| Ok(None));
        let also_plain = FunctionComponent::new(|| Ok(None));
        let one = FunctionComponent::new(|| Ok(None)).with_props(1u32);
        let other_one = FunctionComponent::new(|| Ok(None)).with_props(1u32);
        let two = FunctionComponent::new(|| Ok(None)).with_props(2u32);

        assert!(Component::props_eq(&plain, &also_plain));
        assert!(Component::props_eq(&one, &other_one));
        assert!(!Component::props_eq(&one, &two));
        assert!(!Component::props_eq(&one, &plain));
        assert_eq!(Component::key(&one.with_key(3)), Some(&ElementKey::from(3)));
    }
}
