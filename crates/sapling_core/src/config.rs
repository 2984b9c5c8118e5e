//! Render tree configuration

/// Configuration for a render tree, fixed when the [`RootNode`](crate::RootNode) is created
///
/// # Example
///
/// ```rust
/// use sapling_core::RenderConfig;
///
/// let config = RenderConfig::default()
///     .diagnostics(true)
///     .max_passes(64);
///
/// assert!(config.validate_hooks);
/// assert_eq!(config.max_passes, Some(64));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    /// Fail a render when a node changes its number of positional hooks
    pub validate_hooks: bool,
    /// Record [`RenderDiagnostics`](crate::RenderDiagnostics) events for each root render
    pub diagnostics: bool,
    /// Upper bound on render loop iterations per root render (`None` = unbounded)
    pub max_passes: Option<usize>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            validate_hooks: true,
            diagnostics: cfg!(debug_assertions),
            max_passes: None,
        }
    }
}

impl RenderConfig {
    /// Enable or disable hook-count validation
    pub fn validate_hooks(mut self, enabled: bool) -> Self {
        self.validate_hooks = enabled;
        self
    }

    /// Enable or disable diagnostics recording
    pub fn diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    /// Abort a root render after this many loop iterations
    pub fn max_passes(mut self, limit: usize) -> Self {
        self.max_passes = Some(limit);
        self
    }

    /// Let the render loop run until nothing is pending
    pub fn unbounded(mut self) -> Self {
        self.max_passes = None;
        self
    }
}
