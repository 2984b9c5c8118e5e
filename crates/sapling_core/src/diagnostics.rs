//! Render diagnostics
//!
//! When [`RenderConfig::diagnostics`](crate::RenderConfig::diagnostics) is enabled, the
//! root records what happened during its most recent top-level render. The log is
//! cleared at the start of every [`RootNode::render_element`](crate::RootNode::render_element).

use crate::tree::{EffectId, NodeId};

/// A single recorded render event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// A node began rendering an element
    NodeRendering {
        /// Node being rendered
        node: NodeId,
        /// Type name of the bound element
        element: &'static str,
    },
    /// A node skipped rendering because nothing changed
    NodeRenderSkipped(NodeId),
    /// A node was newly marked for rerender
    NodeInvalidated(NodeId),
    /// A node was disposed
    NodeDisposed(NodeId),
    /// An effect is about to be invoked
    EffectInvoking {
        /// Effect being invoked
        effect: EffectId,
        /// Node that owns the effect
        node: NodeId,
    },
    /// A render failed
    Error(String),
}

/// Event log of the most recent root render
#[derive(Clone, Debug, Default)]
pub struct RenderDiagnostics {
    events: Vec<DiagnosticEvent>,
}

impl RenderDiagnostics {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    pub fn record(&mut self, event: DiagnosticEvent) {
        self.events.push(event);
    }

    /// Forget all recorded events
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// All events in the order they happened
    pub fn events(&self) -> &[DiagnosticEvent] {
        &self.events
    }

    /// Number of node renders that were not skipped
    pub fn rendered_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, DiagnosticEvent::NodeRendering { .. }))
            .count()
    }

    /// Number of node renders that were skipped
    pub fn skipped_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, DiagnosticEvent::NodeRenderSkipped(_)))
            .count()
    }

    /// Number of effect invocations
    pub fn effect_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, DiagnosticEvent::EffectInvoking { .. }))
            .count()
    }
}
