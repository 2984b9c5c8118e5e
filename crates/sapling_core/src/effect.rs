//! Effects and dependency lists
//!
//! An effect is a deferred side effect registered by a render. It runs after the
//! render pass that registered it, but only when its dependency list changed since
//! the previous registration. Before it runs again (and when its node is disposed)
//! the cleanup returned by its previous invocation is called.
//!
//! Dependencies are compared element-wise with `PartialEq`. An empty list never
//! compares equal, so an effect without dependencies runs after every render.

use smallvec::SmallVec;
use std::any::Any;
use std::fmt;

use crate::binding::BindScope;
use crate::diagnostics::DiagnosticEvent;
use crate::error::Result;
use crate::tree::{EffectId, NodeId, SharedTree};

/// A value that can be compared against another dependency of unknown type
pub trait Dependency: 'static {
    /// Equal only if `other` has the same concrete type and compares equal
    fn dep_eq(&self, other: &dyn Dependency) -> bool;

    /// Upcast for downcasting
    fn as_dependency_any(&self) -> &dyn Any;
}

impl<T: PartialEq + 'static> Dependency for T {
    fn dep_eq(&self, other: &dyn Dependency) -> bool {
        other
            .as_dependency_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }

    fn as_dependency_any(&self) -> &dyn Any {
        self
    }
}

/// Ordered list of effect dependencies
///
/// Usually built with the [`deps!`](crate::deps) macro.
#[derive(Default)]
pub struct Deps {
    items: SmallVec<[Box<dyn Dependency>; 4]>,
}

impl Deps {
    /// Create an empty dependency list
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a dependency
    pub fn push<T: PartialEq + 'static>(&mut self, value: T) {
        self.items.push(Box::new(value));
    }

    /// Append a dependency (builder form)
    pub fn with<T: PartialEq + 'static>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Element-wise comparison; lists of different lengths are never equal
    pub fn same_as(&self, other: &Deps) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(other.items.iter())
                .all(|(a, b)| (**a).dep_eq(&**b))
    }
}

impl fmt::Debug for Deps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deps").field("len", &self.items.len()).finish()
    }
}

/// Build a [`Deps`] list from expressions
///
/// ```rust
/// use sapling_core::deps;
///
/// let id = 7u32;
/// let deps = deps![id, "title"];
/// assert_eq!(deps.len(), 2);
/// assert!(deps![].is_empty());
/// ```
#[macro_export]
macro_rules! deps {
    () => {
        $crate::Deps::new()
    };
    ($($dep:expr),+ $(,)?) => {{
        let mut deps = $crate::Deps::new();
        $( deps.push($dep); )+
        deps
    }};
}

/// Whether a new dependency list leaves a previously registered effect up to date
pub(crate) fn deps_equal(previous: Option<&Deps>, next: &Deps) -> bool {
    match previous {
        Some(previous) if !next.is_empty() => previous.same_as(next),
        _ => false,
    }
}

/// Callback returned by an effect, run before the effect runs again or when its node is disposed
pub struct Cleanup(Box<dyn FnOnce()>);

impl Cleanup {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Box::new(f))
    }

    pub(crate) fn run(self) {
        (self.0)()
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Cleanup")
    }
}

pub(crate) type EffectFn = Box<dyn FnOnce() -> Option<Cleanup>>;

/// Persistent record of one effect slot
#[derive(Default)]
pub(crate) struct EffectInfo {
    /// Owning node; None until the first registration
    pub node: Option<NodeId>,
    /// Dependencies of the last registration
    pub dependencies: Option<Deps>,
    /// Effect waiting to run
    pub effect: Option<EffectFn>,
    /// Cleanup returned by the last invocation
    pub cleanup: Option<Cleanup>,
}

impl EffectInfo {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

/// Register an effect for `node`, queueing it if its dependencies changed.
///
/// Returns whether the effect was queued.
pub(crate) fn set_effect(
    tree: &SharedTree,
    id: EffectId,
    node: NodeId,
    effect: EffectFn,
    dependencies: Deps,
) -> Result<bool> {
    let mut guard = tree.borrow_mut();
    let tree = &mut *guard;
    tree.node(node)?;

    let Some(info) = tree.effects.get_mut(id) else {
        return Ok(false);
    };
    let pending =
        info.node.is_none() || !deps_equal(info.dependencies.as_ref(), &dependencies);

    info.node = Some(node);
    info.dependencies = Some(dependencies);
    // a queued run always uses the closure from the latest render
    if pending || info.effect.is_some() {
        info.effect = Some(effect);
    }

    let data = tree.node_mut(node)?;
    if !data.effects.contains(&id) {
        data.effects.push(id);
    }

    if pending {
        tree.pending_effects.push_back(id);
        tracing::trace!(?id, ?node, "effect queued");
    }
    Ok(pending)
}

/// Run the pending effect `id`, first calling the cleanup of its previous run.
///
/// The effect runs with its node's element bound so hooks like
/// [`current_node`](crate::hooks::current_node) resolve. An effect that was
/// already consumed (or removed) is a no-op.
pub(crate) fn invoke_effect(tree: &SharedTree, id: EffectId) -> Result<()> {
    let node = {
        let tree = tree.borrow();
        match tree.effects.get(id) {
            Some(info) if info.effect.is_some() => info.node,
            _ => None,
        }
    };
    let Some(node) = node else {
        return Ok(());
    };

    cleanup_effect(tree, id)?;

    let (effect, element) = {
        let mut guard = tree.borrow_mut();
        let tree = &mut *guard;
        let effect = tree.effects.get_mut(id).and_then(|info| info.effect.take());
        let element = tree.nodes.get(node).and_then(|data| data.element.clone());
        if effect.is_some() {
            tree.record(DiagnosticEvent::EffectInvoking { effect: id, node });
        }
        (effect, element)
    };
    let Some(effect) = effect else {
        return Ok(());
    };

    tracing::trace!(?id, ?node, "invoking effect");
    let cleanup = {
        let _scope = match &element {
            Some(element) => Some(BindScope::enter(tree, node, element, false)?),
            None => None,
        };
        effect()
    };

    // the effect may have disposed its own node
    let orphaned = {
        let mut tree = tree.borrow_mut();
        match tree.effects.get_mut(id) {
            Some(info) => {
                info.cleanup = cleanup;
                None
            }
            None => cleanup,
        }
    };
    if let Some(cleanup) = orphaned {
        cleanup.run();
    }
    Ok(())
}

/// Call and forget the cleanup of the last invocation of `id`, if any
pub(crate) fn cleanup_effect(tree: &SharedTree, id: EffectId) -> Result<()> {
    let (cleanup, node, element) = {
        let mut guard = tree.borrow_mut();
        let tree = &mut *guard;
        let Some(info) = tree.effects.get_mut(id) else {
            return Ok(());
        };
        let Some(cleanup) = info.cleanup.take() else {
            return Ok(());
        };
        let node = info.node;
        let element = node
            .and_then(|node| tree.nodes.get(node))
            .and_then(|data| data.element.clone());
        (cleanup, node, element)
    };

    let _scope = match (node, &element) {
        (Some(node), Some(element)) => Some(BindScope::enter(tree, node, element, false)?),
        _ => None,
    };
    cleanup.run();
    Ok(())
}
