//! Frame-driven render loop
//!
//! A [`RenderLoop`] owns a [`RootNode`] and a factory producing the root element.
//! Each [`RenderLoop::tick`] applies invalidations queued since the last frame, then
//! either renders a fresh root element (first frame or on request) or only
//! rerenders the invalidated nodes.
//!
//! The tree itself is single-threaded. Other threads interact with it through an
//! [`InvalidationHandle`], which only queues requests for the next tick.
//!
//! ```rust
//! use sapling_core::define_component;
//! use sapling_runtime::RenderLoop;
//!
//! let mut render_loop = RenderLoop::new(|| Ok(define_component(|| Ok(None))));
//! let handle = render_loop.handle();
//! let root = render_loop.root().id();
//!
//! render_loop.tick().unwrap();
//!
//! std::thread::spawn(move || handle.invalidate(root)).join().unwrap();
//! assert!(render_loop.is_dirty());
//! ```

use sapling_core::{ElementRef, NodeId, RenderConfig, RootNode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::Result;

/// Shared dirty flag for triggering a tick
pub type DirtyFlag = Arc<AtomicBool>;

/// Requests queued between ticks
#[derive(Default)]
struct Requests {
    nodes: Vec<NodeId>,
    full_render: bool,
}

/// Thread-safe handle for scheduling work on a [`RenderLoop`]
#[derive(Clone)]
pub struct InvalidationHandle {
    requests: Arc<Mutex<Requests>>,
    dirty: DirtyFlag,
}

impl InvalidationHandle {
    /// Rerender `node` on the next tick
    pub fn invalidate(&self, node: NodeId) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .nodes
            .push(node);
        self.dirty.store(true, Ordering::Release);
    }

    /// Render a fresh root element on the next tick
    pub fn request_render(&self) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .full_render = true;
        self.dirty.store(true, Ordering::Release);
    }

    /// Whether requests are waiting for the next tick
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }
}

/// Drives a render tree frame by frame
pub struct RenderLoop<F> {
    root: RootNode,
    factory: F,
    requests: Arc<Mutex<Requests>>,
    dirty: DirtyFlag,
    frame: u64,
}

impl<F> RenderLoop<F>
where
    F: FnMut() -> anyhow::Result<ElementRef>,
{
    pub fn new(factory: F) -> Self {
        Self::with_config(RenderConfig::default(), factory)
    }

    pub fn with_config(config: RenderConfig, factory: F) -> Self {
        Self {
            root: RootNode::with_config(config),
            factory,
            requests: Arc::new(Mutex::new(Requests::default())),
            dirty: Arc::new(AtomicBool::new(false)),
            frame: 0,
        }
    }

    pub fn root(&self) -> &RootNode {
        &self.root
    }

    /// Create a handle for scheduling work from any thread
    pub fn handle(&self) -> InvalidationHandle {
        InvalidationHandle {
            requests: Arc::clone(&self.requests),
            dirty: Arc::clone(&self.dirty),
        }
    }

    /// Number of completed ticks
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Whether the next tick has anything to do
    pub fn is_dirty(&self) -> bool {
        self.frame == 0 || self.dirty.load(Ordering::Acquire)
    }

    /// Render one frame. Returns whether anything rendered or any effect ran.
    pub fn tick(&mut self) -> Result<bool> {
        let Requests { nodes, full_render } = self.take_requests();

        let mut stale = 0usize;
        for id in nodes {
            match self.root.node_by_id(id) {
                Some(node) => {
                    node.invalidate();
                }
                None => stale += 1,
            }
        }
        if stale > 0 {
            tracing::debug!(stale, "ignored invalidations of disposed nodes");
        }

        let rendered = if self.frame == 0 || full_render {
            let element = (self.factory)()?;
            self.root.render_element(&element)?
        } else {
            self.root.flush()?
        };

        self.frame += 1;
        tracing::trace!(frame = self.frame, rendered, "tick");
        Ok(rendered)
    }

    /// Tick until nothing is pending, at most `max_frames` times.
    ///
    /// Returns the number of ticks performed.
    pub fn run_until_idle(&mut self, max_frames: usize) -> Result<usize> {
        let mut frames = 0;
        while frames < max_frames && self.is_dirty() {
            self.tick()?;
            frames += 1;
        }
        Ok(frames)
    }

    fn take_requests(&self) -> Requests {
        self.dirty.store(false, Ordering::Release);
        std::mem::take(&mut *self.requests.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use sapling_core::define_component;
    use sapling_core::hooks::use_ref;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_app(renders: &Rc<Cell<u32>>) -> ElementRef {
        let renders = renders.clone();
        define_component(move || {
            renders.set(renders.get() + 1);
            use_ref(0u8)?;
            Ok(None)
        })
    }

    #[test]
    fn test_first_tick_renders() {
        let renders = Rc::new(Cell::new(0));
        let app = counting_app(&renders);
        let mut render_loop = RenderLoop::new(move || Ok(app.clone()));

        assert!(render_loop.is_dirty());
        render_loop.tick().unwrap();
        assert_eq!(renders.get(), 1);
        assert_eq!(render_loop.frame(), 1);

        assert!(!render_loop.is_dirty());
        assert!(!render_loop.tick().unwrap());
        assert_eq!(renders.get(), 1);
    }

    #[test]
    fn test_invalidation_from_another_thread() {
        let renders = Rc::new(Cell::new(0));
        let app = counting_app(&renders);
        let mut render_loop = RenderLoop::new(move || Ok(app.clone()));
        render_loop.tick().unwrap();

        let handle = render_loop.handle();
        let root = render_loop.root().id();
        std::thread::spawn(move || {
            handle.invalidate(root);
            assert!(handle.is_dirty());
        })
        .join()
        .unwrap();

        assert!(render_loop.is_dirty());
        assert!(render_loop.tick().unwrap());
        assert_eq!(renders.get(), 2);
        assert!(!render_loop.is_dirty());
    }

    #[test]
    fn test_request_render_calls_factory() {
        let calls = Rc::new(Cell::new(0));
        let renders = Rc::new(Cell::new(0));
        let mut render_loop = RenderLoop::new({
            let calls = calls.clone();
            let renders = renders.clone();
            move || {
                calls.set(calls.get() + 1);
                Ok(counting_app(&renders))
            }
        });

        render_loop.tick().unwrap();
        render_loop.handle().request_render();
        assert_eq!(render_loop.run_until_idle(10).unwrap(), 1);

        assert_eq!(calls.get(), 2);
        assert_eq!(renders.get(), 2);
    }

    #[test]
    fn test_stale_invalidation_is_ignored() {
        let renders = Rc::new(Cell::new(0));
        let app = counting_app(&renders);
        let mut render_loop = RenderLoop::new(move || Ok(app.clone()));
        render_loop.tick().unwrap();

        let child = render_loop.root().create_child().unwrap();
        child.dispose().unwrap();
        render_loop.handle().invalidate(child.id());

        assert!(!render_loop.tick().unwrap());
        assert_eq!(renders.get(), 1);
    }

    #[test]
    fn test_factory_error() {
        let mut render_loop = RenderLoop::new(|| Err(anyhow::anyhow!("no root element")));

        match render_loop.tick() {
            Err(RuntimeError::Factory(message)) => assert_eq!(message, "no root element"),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        assert_eq!(render_loop.frame(), 0);
    }

    #[test]
    fn test_render_error_is_wrapped() {
        let app = define_component(|| {
            use_ref(0u8)?;
            Err(sapling_core::RenderError::other("render failed"))
        });
        let mut render_loop = RenderLoop::new(move || Ok(app.clone()));

        assert!(matches!(
            render_loop.tick(),
            Err(RuntimeError::Render(sapling_core::RenderError::Other(_)))
        ));
    }
}
