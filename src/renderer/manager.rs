//! Render Manager
//!
//! The per-context frame scheduler. A [`RenderManager`] owns the attached
//! [`RenderContext`] and drives one frame at a time:
//!
//! ```text
//! StartFrame tasks
//!   -> late init listeners (once)
//!   -> FrameListener::start_frame
//!   -> updatables
//!   -> passes, in registration order
//!   -> FrameListener::end_frame
//! EndFrame tasks
//! ```
//!
//! The first error stops the frame. It is kept until [`RenderManager::render`]
//! has finished its bookkeeping (buffer swap, statistics) and is then
//! returned wrapped in [`AsterError::Frame`].
//!
//! A manager is driven from a single thread; it is `Send` so it can be
//! handed to that thread.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use super::context::RenderContext;
use super::pass::RenderPass;
use super::settings::RendererSettings;
use super::statistics::FrameStatistics;
use super::task::{AttachPoint, AttachedTasks, Task, TaskCompleteListener};
use crate::errors::{AsterError, Result};

/// Hooks around every frame.
pub trait FrameListener: Send + Sync {
    fn start_frame(&self, _ctx: &mut RenderContext) -> Result<()> {
        Ok(())
    }

    fn end_frame(&self, _ctx: &mut RenderContext) -> Result<()> {
        Ok(())
    }
}

/// Ticked once per frame, before the passes render.
pub trait Updatable: Send + Sync {
    fn update(&self, ctx: &mut RenderContext) -> Result<()>;
}

/// Fired when the context is (re)initialised.
pub trait InitListener: Send + Sync {
    fn on_init(&self, ctx: &mut RenderContext) -> Result<()>;
}

/// Fired when the context surface changes size.
pub trait ReshapeListener: Send + Sync {
    fn on_reshape(&self, old: (u32, u32), new: (u32, u32));
}

fn remove_ptr<T: ?Sized>(list: &mut Vec<Arc<T>>, item: &Arc<T>) -> bool {
    let before = list.len();
    list.retain(|x| !Arc::ptr_eq(x, item));
    list.len() != before
}

pub struct RenderManager {
    context: Option<RenderContext>,
    settings: RendererSettings,
    passes: Vec<RenderPass>,
    updatables: Vec<Arc<dyn Updatable>>,
    frame_listeners: Vec<Arc<dyn FrameListener>>,
    init_listeners: Vec<Arc<dyn InitListener>>,
    late_init: Vec<Arc<dyn InitListener>>,
    reshape_listeners: Vec<Arc<dyn ReshapeListener>>,
    tasks: AttachedTasks,
    stats: FrameStatistics,
    frame_error: Option<AsterError>,
    initialized: bool,
    destroyed: bool,
    width: u32,
    height: u32,
}

impl fmt::Debug for RenderManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderManager")
            .field("context", &self.context)
            .field("passes", &self.passes.len())
            .field("tasks", &self.tasks)
            .field("stats", &self.stats)
            .field("initialized", &self.initialized)
            .field("destroyed", &self.destroyed)
            .field("size", &(self.width, self.height))
            .finish_non_exhaustive()
    }
}

impl Default for RenderManager {
    fn default() -> Self {
        Self::new(RendererSettings::default())
    }
}

impl RenderManager {
    #[must_use]
    pub fn new(settings: RendererSettings) -> Self {
        Self {
            context: None,
            settings,
            passes: Vec::new(),
            updatables: Vec::new(),
            frame_listeners: Vec::new(),
            init_listeners: Vec::new(),
            late_init: Vec::new(),
            reshape_listeners: Vec::new(),
            tasks: AttachedTasks::new(&[AttachPoint::StartFrame, AttachPoint::EndFrame]),
            stats: FrameStatistics::new(),
            frame_error: None,
            initialized: false,
            destroyed: false,
            width: 0,
            height: 0,
        }
    }

    // ========================================================================
    // Context
    // ========================================================================

    /// Attaches the context this manager renders into. Only one context
    /// can ever be attached.
    pub fn attach_context(&mut self, context: RenderContext) -> Result<()> {
        if self.destroyed {
            return Err(AsterError::ContextDestroyed);
        }
        if self.context.is_some() {
            return Err(AsterError::ContextAlreadyAttached);
        }
        self.width = context.context_width();
        self.height = context.context_height();
        self.context = Some(context);
        Ok(())
    }

    #[must_use]
    pub fn context(&self) -> Option<&RenderContext> {
        self.context.as_ref()
    }

    pub fn context_mut(&mut self) -> Option<&mut RenderContext> {
        self.context.as_mut()
    }

    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    #[must_use]
    pub fn stats(&self) -> &FrameStatistics {
        &self.stats
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Appends a pass; passes render in registration order. Returns its
    /// index.
    pub fn add_pass(&mut self, pass: RenderPass) -> usize {
        self.passes.push(pass);
        self.passes.len() - 1
    }

    /// Creates an empty pass configured with this manager's settings.
    pub fn new_pass(&mut self) -> &mut RenderPass {
        let index = self.add_pass(RenderPass::with_settings(&self.settings));
        &mut self.passes[index]
    }

    pub fn remove_pass(&mut self, index: usize) -> Option<RenderPass> {
        (index < self.passes.len()).then(|| self.passes.remove(index))
    }

    #[must_use]
    pub fn passes(&self) -> &[RenderPass] {
        &self.passes
    }

    pub fn pass_mut(&mut self, index: usize) -> Option<&mut RenderPass> {
        self.passes.get_mut(index)
    }

    pub fn add_updatable(&mut self, updatable: Arc<dyn Updatable>) {
        self.updatables.push(updatable);
    }

    pub fn remove_updatable(&mut self, updatable: &Arc<dyn Updatable>) -> bool {
        remove_ptr(&mut self.updatables, updatable)
    }

    pub fn add_frame_listener(&mut self, listener: Arc<dyn FrameListener>) {
        self.frame_listeners.push(listener);
    }

    pub fn remove_frame_listener(&mut self, listener: &Arc<dyn FrameListener>) -> bool {
        remove_ptr(&mut self.frame_listeners, listener)
    }

    /// Listeners added after initialisation fire at the start of the next
    /// frame.
    pub fn add_init_listener(&mut self, listener: Arc<dyn InitListener>) {
        if self.initialized {
            self.late_init.push(listener);
        } else {
            self.init_listeners.push(listener);
        }
    }

    pub fn remove_init_listener(&mut self, listener: &Arc<dyn InitListener>) -> bool {
        remove_ptr(&mut self.init_listeners, listener) | remove_ptr(&mut self.late_init, listener)
    }

    pub fn add_reshape_listener(&mut self, listener: Arc<dyn ReshapeListener>) {
        self.reshape_listeners.push(listener);
    }

    pub fn remove_reshape_listener(&mut self, listener: &Arc<dyn ReshapeListener>) -> bool {
        remove_ptr(&mut self.reshape_listeners, listener)
    }

    /// Only `StartFrame` and `EndFrame` are valid for the manager.
    pub fn attach_task(&mut self, task: Arc<dyn Task>, point: AttachPoint) -> Result<()> {
        self.tasks.attach(task, point)
    }

    pub fn detach_task(&mut self, task: &Arc<dyn Task>, point: AttachPoint) -> Result<bool> {
        self.tasks.detach(task, point)
    }

    pub fn add_task_complete_listener(&mut self, listener: Arc<dyn TaskCompleteListener>) {
        self.tasks.add_listener(listener);
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    /// Fires every init listener against the attached context.
    pub fn notify_init(&mut self) -> Result<()> {
        let ctx = self.context.as_mut().ok_or(AsterError::NoContext)?;
        self.init_listeners.append(&mut self.late_init);
        for listener in &self.init_listeners {
            listener.on_init(ctx)?;
        }
        self.initialized = true;
        log::debug!("Render manager initialised ({} listeners)", self.init_listeners.len());
        Ok(())
    }

    pub fn notify_reshape(&mut self, width: u32, height: u32) {
        let old = (self.width, self.height);
        self.width = width;
        self.height = height;
        for listener in &self.reshape_listeners {
            listener.on_reshape(old, (width, height));
        }
    }

    /// Runs one frame. An error stops the frame and is kept for
    /// [`RenderManager::render`].
    pub fn notify_render_frame(&mut self) {
        if let Err(err) = self.run_frame() {
            log::debug!("Frame aborted: {err}");
            self.frame_error = Some(err);
        }
    }

    fn run_frame(&mut self) -> Result<()> {
        let ctx = self.context.as_mut().ok_or(AsterError::NoContext)?;
        self.stats.reset();

        self.tasks.drain(AttachPoint::StartFrame, ctx)?;

        while !self.late_init.is_empty() {
            let listener = self.late_init.remove(0);
            self.init_listeners.push(Arc::clone(&listener));
            listener.on_init(ctx)?;
        }

        for listener in &self.frame_listeners {
            listener.start_frame(ctx)?;
        }
        for updatable in &self.updatables {
            updatable.update(ctx)?;
        }
        for pass in &mut self.passes {
            pass.render_pass(ctx, &mut self.stats)?;
        }
        for listener in &self.frame_listeners {
            listener.end_frame(ctx)?;
        }

        self.tasks.drain(AttachPoint::EndFrame, ctx)?;
        log::trace!(
            "Frame rendered {} atoms, {} vertices, {} polygons",
            self.stats.atom_count(),
            self.stats.vertex_count(),
            self.stats.polygon_count()
        );
        Ok(())
    }

    /// Makes the context current, runs a frame, presents it and records
    /// its duration. Returns the error that stopped the frame, if any.
    pub fn render(&mut self) -> Result<()> {
        if self.destroyed {
            return Err(AsterError::ContextDestroyed);
        }
        let start = Instant::now();
        self.context.as_mut().ok_or(AsterError::NoContext)?.make_current()?;

        self.notify_render_frame();
        let frame_error = self.frame_error.take();

        let swapped = match self.context.as_mut() {
            Some(ctx) => ctx.swap_buffers(),
            None => Ok(()),
        };
        self.stats.finish_frame(start.elapsed());

        // The frame error wins over a failed swap.
        match frame_error {
            Some(err) => Err(AsterError::Frame(Box::new(err))),
            None => swapped,
        }
    }

    /// Destroys the context and drops every pass and listener. Calling it
    /// again does nothing.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Some(mut ctx) = self.context.take() {
            ctx.destroy();
        }
        self.passes.clear();
        self.updatables.clear();
        self.frame_listeners.clear();
        self.init_listeners.clear();
        self.late_init.clear();
        self.reshape_listeners.clear();
        log::debug!("Render manager destroyed");
    }
}
