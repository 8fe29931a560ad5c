//! Framework
//!
//! Thread-confined access to the graphics hardware. Callers never touch a
//! context directly; they queue tasks that run on framework workers and
//! receive a [`HardwareAccessLayer`]:
//!
//! ```text
//! caller ── queue(task, group) ──> worker mailbox ──> task(&mut HardwareAccessLayer)
//!    ^                                                        │
//!    └──────────────────── TaskFuture<T> <────────────────────┘
//! ```
//!
//! Resource status queries ([`Framework::get_status`]) read the shared
//! [`ResourceManager`] directly and never update anything.
//!
//! Once [`Framework::destroy`] has run, every operation is a neutral
//! no-op: statuses read [`Status::Disposed`], messages are `None` and
//! queued tasks resolve to [`AsterError::Cancelled`].

pub mod display;
pub mod future;
pub mod hal;
pub mod resource;
pub mod settings;
pub mod surface;
mod worker;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

pub use display::{DisplayMode, PixelFormat};
pub use future::TaskFuture;
pub use hal::HardwareAccessLayer;
pub use resource::{DriverHandle, ResourceDriver, ResourceManager, Status};
pub use settings::FrameworkSettings;
pub use surface::{Surface, SurfaceFactory, SurfaceOptions};

use crate::errors::{AsterError, Result};
use crate::renderer::{RenderContext, RenderManager};
use crate::resources::Resource;
use hal::OnDemandResolver;
use worker::{Job, WorkerPool};

/// Group used by the framework's own blocking helpers.
pub const DEFAULT_GROUP: &str = "default";

pub(crate) struct FrameworkShared {
    settings: FrameworkSettings,
    pub(crate) resources: Mutex<ResourceManager>,
    pub(crate) pool: WorkerPool,
    factory: Box<dyn SurfaceFactory>,
    surfaces: Mutex<Vec<Weak<Surface>>>,
    closed: AtomicBool,
}

impl FrameworkShared {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

pub struct Framework {
    shared: Arc<FrameworkShared>,
}

impl fmt::Debug for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Framework")
            .field("settings", &self.shared.settings)
            .field("workers", &self.shared.pool.worker_count())
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}

impl Framework {
    /// Starts the worker threads. `drivers` decide which resource kinds
    /// are supported; `factory` creates the contexts behind surfaces.
    pub fn new(
        settings: FrameworkSettings,
        drivers: Vec<Box<dyn ResourceDriver>>,
        factory: Box<dyn SurfaceFactory>,
    ) -> Result<Self> {
        let workers = settings.worker_threads.max(1);
        let thread_name = settings.thread_name.clone();
        let shared = Arc::new(FrameworkShared {
            settings,
            resources: Mutex::new(ResourceManager::new(drivers)),
            pool: WorkerPool::default(),
            factory,
            surfaces: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        });
        if let Err(err) = shared.pool.spawn(&shared, workers, &thread_name) {
            shared.closed.store(true, Ordering::Release);
            shared.pool.shutdown();
            return Err(err);
        }
        log::debug!("Framework started with {workers} workers");
        Ok(Self { shared })
    }

    #[must_use]
    pub fn settings(&self) -> &FrameworkSettings {
        &self.shared.settings
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.shared.is_closed()
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    /// Runs `task` on the worker pinned to `group`. Tasks of one group run
    /// in the order they were queued.
    ///
    /// Blocking on the returned future from inside a task of the same group
    /// deadlocks.
    pub fn queue<T, F>(&self, group: &str, task: F) -> TaskFuture<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut HardwareAccessLayer) -> Result<T> + Send + 'static,
    {
        if self.is_destroyed() {
            return TaskFuture::cancelled();
        }
        let (promise, future) = TaskFuture::channel();
        let job: Job = Box::new(move |hal: &mut HardwareAccessLayer| promise.complete(task(hal)));
        if !self.shared.pool.submit(group, job) {
            log::warn!("Task for group '{group}' dropped: framework is shut down");
        }
        future
    }

    /// Blocks until every task queued before this call, on any group, has
    /// completed.
    pub fn sync(&self) {
        let mut pending = Vec::new();
        self.shared.pool.broadcast(|| {
            let (promise, future) = TaskFuture::<()>::channel();
            pending.push(future);
            let job: Job = Box::new(move |_: &mut HardwareAccessLayer| promise.complete(Ok(())));
            job
        });
        for future in pending {
            // A cancelled barrier means the framework shut down, which
            // also ends the wait.
            let _ = future.get();
        }
    }

    // ========================================================================
    // Resources
    // ========================================================================

    /// Updates `resource` on a worker and waits for the new status.
    pub fn update(&self, resource: &Arc<dyn Resource>) -> Status {
        self.refresh(resource).get().unwrap_or(Status::Disposed)
    }

    /// Queues an update of `resource` without waiting.
    pub fn refresh(&self, resource: &Arc<dyn Resource>) -> TaskFuture<Status> {
        let resource = Arc::clone(resource);
        self.queue(DEFAULT_GROUP, move |hal| Ok(hal.update(&resource)))
    }

    /// Disposes `resource` on a worker and waits. Disposing twice, or after
    /// the framework is destroyed, does nothing.
    pub fn dispose(&self, resource: &Arc<dyn Resource>) -> Result<()> {
        let resource = Arc::clone(resource);
        match self.queue(DEFAULT_GROUP, move |hal| hal.dispose(&resource)).get() {
            Err(AsterError::Cancelled) => Ok(()),
            other => other,
        }
    }

    /// Makes the next update of `resource` a full upload.
    pub fn reset(&self, resource: &Arc<dyn Resource>) {
        let resource = Arc::clone(resource);
        let _ = self
            .queue(DEFAULT_GROUP, move |hal| {
                hal.reset(&resource);
                Ok(())
            })
            .get();
    }

    /// Current status. Never updates the resource.
    #[must_use]
    pub fn get_status(&self, resource: &dyn Resource) -> Status {
        self.shared.resources.lock().status(resource)
    }

    /// `None` once the framework is destroyed.
    #[must_use]
    pub fn get_status_message(&self, resource: &dyn Resource) -> Option<String> {
        self.shared.resources.lock().status_message(resource)
    }

    /// Marks whether `resource` may be disposed. Resources bound to a live
    /// render target should not be.
    pub fn set_disposable(&self, resource: &Arc<dyn Resource>, disposable: bool) {
        self.shared.resources.lock().set_disposable(resource, disposable);
    }

    // ========================================================================
    // Surfaces
    // ========================================================================

    /// Creates a surface with a fresh [`RenderManager`]. The platform
    /// context is created on a worker.
    pub fn create_surface(&self, options: SurfaceOptions) -> Result<Arc<Surface>> {
        if self.is_destroyed() {
            return Err(AsterError::SurfaceCreation("framework is destroyed".into()));
        }
        let shared = Arc::clone(&self.shared);
        let backend = self
            .queue(DEFAULT_GROUP, move |_hal| shared.factory.create_backend(&options))
            .get()?;

        let mut context = RenderContext::new(backend);
        context.set_resource_resolver(Some(Box::new(OnDemandResolver::new(Arc::downgrade(&self.shared)))));
        let mut manager = RenderManager::new(self.shared.settings.renderer.clone());
        manager.attach_context(context)?;
        let surface = Arc::new(Surface::new(&options, manager, Arc::downgrade(&self.shared)));

        let mut surfaces = self.shared.surfaces.lock();
        surfaces.retain(|weak| weak.strong_count() > 0);
        surfaces.push(Arc::downgrade(&surface));
        log::debug!("Created surface {} ({}x{})", surface.id(), options.width, options.height);
        Ok(surface)
    }

    /// Renders one frame of `surface` on the worker pinned to `group` and
    /// waits for it.
    ///
    /// The manager is initialised on its first flush, and reshape listeners
    /// fire when the surface was resized since the last one. Flushing a
    /// destroyed surface does nothing.
    pub fn flush(&self, surface: &Arc<Surface>, group: &str) -> Result<()> {
        let surface = Arc::clone(surface);
        let future = self.queue(group, move |hal| {
            let (width, height) = (surface.width(), surface.height());
            let Some(manager) = hal.set_active_surface(Some(&surface)) else {
                return Ok(());
            };
            if !manager.is_initialized() {
                manager.notify_init()?;
            }
            if (width, height) != (manager.width(), manager.height()) {
                manager.notify_reshape(width, height);
            }
            manager.render()
        });
        match future.get() {
            Err(AsterError::Cancelled) => Ok(()),
            other => other,
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Stops the workers, cancels tasks that have not started, destroys the
    /// remaining surfaces and disposes every resource handle. Calling it
    /// again does nothing.
    pub fn destroy(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shared.pool.shutdown();

        let surfaces = std::mem::take(&mut *self.shared.surfaces.lock());
        for surface in surfaces.iter().filter_map(Weak::upgrade) {
            surface.destroy_detached();
        }
        self.shared.resources.lock().destroy();
        log::debug!("Framework destroyed");
    }
}

impl Drop for Framework {
    fn drop(&mut self) {
        self.destroy();
    }
}
