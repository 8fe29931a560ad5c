use crate::renderer::RendererSettings;

/// Threading and rendering configuration of a [`Framework`](super::Framework).
#[derive(Debug, Clone, PartialEq)]
pub struct FrameworkSettings {
    /// Number of worker threads. Task groups are spread across them.
    pub worker_threads: usize,
    /// Prefix of worker thread names; the worker index is appended.
    pub thread_name: String,
    /// Settings of the render manager created for every surface.
    pub renderer: RendererSettings,
}

impl Default for FrameworkSettings {
    fn default() -> Self {
        Self {
            worker_threads: 1,
            thread_name: "aster-worker".to_owned(),
            renderer: RendererSettings::default(),
        }
    }
}

impl FrameworkSettings {
    #[must_use]
    pub fn with_worker_threads(mut self, count: usize) -> Self {
        self.worker_threads = count.max(1);
        self
    }

    #[must_use]
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: RendererSettings) -> Self {
        self.renderer = renderer;
        self
    }
}
