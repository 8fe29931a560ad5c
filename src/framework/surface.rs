//! Render surfaces.
//!
//! A [`Surface`] owns the [`RenderManager`] of one window or offscreen
//! target. A worker borrows the manager while the surface is active on
//! its [`HardwareAccessLayer`](super::HardwareAccessLayer) and hands it
//! back when the task finishes. Destruction waits for that handoff.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex, MutexGuard};

use super::display::DisplayMode;
use super::future::TaskFuture;
use super::FrameworkShared;
use crate::errors::Result;
use crate::renderer::{ContextBackend, RenderManager};

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

/// Requested properties of a new surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceOptions {
    pub width: u32,
    pub height: u32,
    /// Fullscreen mode, or `None` for a windowed / offscreen surface.
    pub display_mode: Option<DisplayMode>,
}

impl SurfaceOptions {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            display_mode: None,
        }
    }

    #[must_use]
    pub fn with_display_mode(mut self, mode: DisplayMode) -> Self {
        self.display_mode = Some(mode);
        self
    }
}

/// Creates the platform context behind a surface.
pub trait SurfaceFactory: Send + Sync {
    fn create_backend(&self, options: &SurfaceOptions) -> Result<Box<dyn ContextBackend>>;
}

struct SurfaceState {
    manager: Option<RenderManager>,
    owner: Option<ThreadId>,
    destroyed: bool,
}

impl SurfaceState {
    fn destroy(&mut self) {
        self.destroyed = true;
        if let Some(mut manager) = self.manager.take() {
            manager.destroy();
        }
    }
}

pub struct Surface {
    id: u64,
    width: AtomicU32,
    height: AtomicU32,
    display_mode: Option<DisplayMode>,
    state: Mutex<SurfaceState>,
    released: Condvar,
    framework: Weak<FrameworkShared>,
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("id", &self.id)
            .field("width", &self.width())
            .field("height", &self.height())
            .field("display_mode", &self.display_mode)
            .field("destroyed", &self.is_destroyed())
            .finish_non_exhaustive()
    }
}

impl Surface {
    pub(crate) fn new(
        options: &SurfaceOptions,
        manager: RenderManager,
        framework: Weak<FrameworkShared>,
    ) -> Self {
        Self {
            id: NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed),
            width: AtomicU32::new(options.width),
            height: AtomicU32::new(options.height),
            display_mode: options.display_mode,
            state: Mutex::new(SurfaceState {
                manager: Some(manager),
                owner: None,
                destroyed: false,
            }),
            released: Condvar::new(),
            framework,
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn display_mode(&self) -> Option<DisplayMode> {
        self.display_mode
    }

    /// Records a new size; reshape listeners fire on the next flush.
    pub fn resize(&self, width: u32, height: u32) {
        self.width.store(width, Ordering::Release);
        self.height.store(height, Ordering::Release);
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    /// Whether this surface belongs to the given framework state.
    pub(crate) fn belongs_to(&self, shared: &Arc<FrameworkShared>) -> bool {
        std::ptr::eq(self.framework.as_ptr(), Arc::as_ptr(shared))
    }

    /// Takes the manager for the calling thread, blocking while another
    /// thread has it. `None` once destroyed.
    pub(crate) fn acquire(&self) -> Option<RenderManager> {
        let current = thread::current().id();
        let mut state = self.state.lock();
        self.wait_released(&mut state, Some(current));
        if state.destroyed {
            return None;
        }
        let manager = state.manager.take()?;
        state.owner = Some(current);
        Some(manager)
    }

    /// Returns the manager taken by [`Surface::acquire`]. If the surface
    /// was destroyed meanwhile, the manager is destroyed instead.
    pub(crate) fn release(&self, mut manager: RenderManager) {
        let mut state = self.state.lock();
        state.owner = None;
        if state.destroyed {
            manager.destroy();
            log::debug!("Surface {} released after destroy", self.id);
        } else {
            state.manager = Some(manager);
        }
        drop(state);
        self.released.notify_all();
    }

    fn wait_released(&self, state: &mut MutexGuard<'_, SurfaceState>, except: Option<ThreadId>) {
        while state.owner.is_some() && state.owner != except {
            self.released.wait(state);
        }
    }

    /// Destroys the surface and its context.
    ///
    /// On the thread that has the surface active, or when no thread has
    /// it, this happens before returning; the active manager is destroyed
    /// when it is released. Otherwise a dedicated thread waits for the
    /// surface to be released and destroys it, so no framework worker is
    /// tied up by the wait. Calling it again returns a completed future.
    pub fn destroy(self: &Arc<Self>) -> TaskFuture<()> {
        let mut state = self.state.lock();
        if state.destroyed {
            return TaskFuture::ready(Ok(()));
        }
        let current = thread::current().id();
        if state.owner.is_none() || state.owner == Some(current) {
            state.destroy();
            log::debug!("Surface {} destroyed", self.id);
            return TaskFuture::ready(Ok(()));
        }
        drop(state);

        let (promise, future) = TaskFuture::channel();
        let surface = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("aster-surface-{}-destroy", self.id))
            .spawn(move || {
                let mut state = surface.state.lock();
                surface.wait_released(&mut state, None);
                if !state.destroyed {
                    state.destroy();
                    log::debug!("Surface {} destroyed after release", surface.id);
                }
                promise.complete(Ok(()));
            });
        if let Err(err) = spawned {
            // The promise went down with the closure: the future reads as
            // cancelled.
            log::warn!("Could not wait for surface {} release: {err}", self.id);
        }
        future
    }

    /// Destroys without waiting. Only valid when no worker can hold the
    /// surface anymore.
    pub(crate) fn destroy_detached(&self) {
        let mut state = self.state.lock();
        if !state.destroyed {
            state.destroy();
        }
    }
}
