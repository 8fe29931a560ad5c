//! Hardware Access Layer
//!
//! The worker-side view of a framework. Every task queued on a
//! [`Framework`](super::Framework) receives the `HardwareAccessLayer` of the
//! worker that runs it; resource updates and surface rendering only happen
//! through it.

use std::sync::{Arc, Weak};

use super::resource::{DriverHandle, Status};
use super::surface::Surface;
use super::FrameworkShared;
use crate::errors::Result;
use crate::renderer::{RenderContext, RenderManager, ResourceResolver};
use crate::resources::Resource;

pub struct HardwareAccessLayer {
    shared: Arc<FrameworkShared>,
    active: Option<(Arc<Surface>, RenderManager)>,
}

impl std::fmt::Debug for HardwareAccessLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardwareAccessLayer")
            .field("active", &self.active.as_ref().map(|(surface, _)| surface.id()))
            .finish_non_exhaustive()
    }
}

impl HardwareAccessLayer {
    pub(crate) fn new(shared: Arc<FrameworkShared>) -> Self {
        Self {
            shared,
            active: None,
        }
    }

    // ========================================================================
    // Surfaces
    // ========================================================================

    /// Makes `surface` the target of subsequent rendering and returns its
    /// manager. The previously active surface is released first.
    ///
    /// Passing `None` only deactivates. A destroyed surface, or one from
    /// another framework, yields `None`. Blocks while another worker has
    /// the surface active.
    pub fn set_active_surface(&mut self, surface: Option<&Arc<Surface>>) -> Option<&mut RenderManager> {
        self.release_surface();
        let surface = surface?;
        if !surface.belongs_to(&self.shared) {
            log::warn!("Surface {} belongs to another framework", surface.id());
            return None;
        }
        let manager = surface.acquire()?;
        self.active = Some((Arc::clone(surface), manager));
        self.active.as_mut().map(|(_, manager)| manager)
    }

    #[must_use]
    pub fn active_surface(&self) -> Option<&Arc<Surface>> {
        self.active.as_ref().map(|(surface, _)| surface)
    }

    /// Manager of the active surface; `None` once it has been destroyed.
    pub fn current_manager(&mut self) -> Option<&mut RenderManager> {
        match &mut self.active {
            Some((surface, manager)) if !surface.is_destroyed() => Some(manager),
            _ => None,
        }
    }

    pub fn current_context(&mut self) -> Option<&mut RenderContext> {
        self.current_manager()?.context_mut()
    }

    pub(crate) fn release_surface(&mut self) {
        if let Some((surface, manager)) = self.active.take() {
            surface.release(manager);
        }
    }

    // ========================================================================
    // Resources
    // ========================================================================

    /// Pushes pending changes of `resource` and returns its new status.
    pub fn update(&mut self, resource: &Arc<dyn Resource>) -> Status {
        self.shared.resources.lock().update(resource)
    }

    pub fn dispose(&mut self, resource: &Arc<dyn Resource>) -> Result<()> {
        self.shared.resources.lock().dispose(resource.as_ref())
    }

    pub fn reset(&mut self, resource: &Arc<dyn Resource>) {
        self.shared.resources.lock().reset(resource.as_ref());
    }

    /// Runs `f` on the driver handle of `resource`, updating `OnDemand`
    /// resources first. `None` if the resource is not usable.
    pub fn with_handle<R>(
        &mut self,
        resource: &Arc<dyn Resource>,
        f: impl FnOnce(&mut DriverHandle) -> R,
    ) -> Option<R> {
        self.shared.resources.lock().with_handle(resource, f)
    }

    #[must_use]
    pub fn status(&self, resource: &dyn Resource) -> Status {
        self.shared.resources.lock().status(resource)
    }
}

/// Installed on every surface context: `OnDemand` resources are updated
/// right before a draw or texture apply uses them.
pub(crate) struct OnDemandResolver {
    shared: Weak<FrameworkShared>,
}

impl OnDemandResolver {
    pub(crate) fn new(shared: Weak<FrameworkShared>) -> Self {
        Self { shared }
    }
}

impl ResourceResolver for OnDemandResolver {
    fn resolve(&mut self, resource: &Arc<dyn Resource>) {
        if let Some(shared) = self.shared.upgrade() {
            shared.resources.lock().with_handle(resource, |_| ());
        }
    }
}

impl Drop for HardwareAccessLayer {
    fn drop(&mut self) {
        self.release_surface();
    }
}
