//! Resource Status Machine
//!
//! Every resource a framework has seen gets one [`ResourceEntry`] keyed by
//! its [`ResourceId`]. Entries hold a `Weak` reference, so dropping the last
//! `Arc` of a resource does not leak its driver handle: the next sweep
//! ([`ResourceManager::collect_orphans`]) disposes it.
//!
//! ```text
//!              update ok                 update err
//!   (unseen) ───────────> Ok <──────────────────────> Error
//!      │                   │                            │
//!      │ no driver         └────────── dispose ─────────┴──> Disposed
//!      v                                                       │
//!  Unsupported                          update (re-init) <─────┘
//! ```

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use rustc_hash::FxHashMap;

use crate::errors::{AsterError, Result};
use crate::resources::{Resource, ResourceId, ResourceKind, UpdatePolicy};

/// Lifecycle status of a resource within one framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The driver uploaded the resource and it can be used for rendering.
    Ok,
    /// The last update failed; see the status message.
    Error,
    /// No driver handle exists. The resource may be updated again.
    Disposed,
    /// No driver is registered for the resource's kind.
    Unsupported,
}

/// Driver-owned GPU object of a resource.
pub type DriverHandle = Box<dyn Any + Send>;

/// Uploads one kind of resource.
///
/// Update failures caused by missing capabilities are reported as
/// `Err(message)` and end up as [`Status::Error`], never as an
/// [`AsterError`].
pub trait ResourceDriver: Send {
    fn kind(&self) -> ResourceKind;

    /// Creates an empty handle. Called before the first update.
    fn init(&mut self, resource: &dyn Resource) -> DriverHandle;

    /// Pushes pending changes. `Ok` carries an optional informational
    /// message.
    fn update(
        &mut self,
        resource: &dyn Resource,
        handle: &mut DriverHandle,
    ) -> std::result::Result<Option<String>, String>;

    /// Forgets which parts were uploaded so the next update is a full one.
    fn reset(&mut self, resource: &dyn Resource, handle: &mut DriverHandle);

    fn dispose(&mut self, handle: DriverHandle);
}

struct ResourceEntry {
    resource: Weak<dyn Resource>,
    kind: ResourceKind,
    handle: Option<DriverHandle>,
    status: Status,
    message: String,
    disposable: bool,
}

impl ResourceEntry {
    fn new(resource: &Arc<dyn Resource>) -> Self {
        Self {
            resource: Arc::downgrade(resource),
            kind: resource.kind(),
            handle: None,
            status: Status::Disposed,
            message: String::new(),
            disposable: true,
        }
    }
}

/// Driver registry plus the per-resource entries of one framework.
pub struct ResourceManager {
    drivers: FxHashMap<ResourceKind, Box<dyn ResourceDriver>>,
    entries: FxHashMap<ResourceId, ResourceEntry>,
    destroyed: bool,
}

impl fmt::Debug for ResourceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManager")
            .field("drivers", &self.drivers.keys().collect::<Vec<_>>())
            .field("entries", &self.entries.len())
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl ResourceManager {
    #[must_use]
    pub fn new(drivers: Vec<Box<dyn ResourceDriver>>) -> Self {
        let mut map = FxHashMap::default();
        for driver in drivers {
            let kind = driver.kind();
            if map.insert(kind, driver).is_some() {
                log::warn!("Duplicate driver for {kind:?}; keeping the last one");
            }
        }
        Self {
            drivers: map,
            entries: FxHashMap::default(),
            destroyed: false,
        }
    }

    #[must_use]
    pub fn has_driver(&self, kind: ResourceKind) -> bool {
        self.drivers.contains_key(&kind)
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Current status; never triggers an update.
    #[must_use]
    pub fn status(&self, resource: &dyn Resource) -> Status {
        if self.destroyed {
            return Status::Disposed;
        }
        match self.entries.get(&resource.id()) {
            Some(entry) => entry.status,
            None if self.has_driver(resource.kind()) => Status::Disposed,
            None => Status::Unsupported,
        }
    }

    /// `None` once the manager is destroyed; empty when nothing was
    /// reported.
    #[must_use]
    pub fn status_message(&self, resource: &dyn Resource) -> Option<String> {
        if self.destroyed {
            return None;
        }
        Some(
            self.entries
                .get(&resource.id())
                .map(|entry| entry.message.clone())
                .unwrap_or_default(),
        )
    }

    fn entry(&mut self, resource: &Arc<dyn Resource>) -> Option<&mut ResourceEntry> {
        if self.destroyed || !self.has_driver(resource.kind()) {
            return None;
        }
        Some(
            self.entries
                .entry(resource.id())
                .or_insert_with(|| ResourceEntry::new(resource)),
        )
    }

    /// Initialises the handle on first use and pushes pending changes.
    pub fn update(&mut self, resource: &Arc<dyn Resource>) -> Status {
        if self.destroyed {
            return Status::Disposed;
        }
        let kind = resource.kind();
        let Some(driver) = self.drivers.get_mut(&kind) else {
            return Status::Unsupported;
        };
        let entry = self
            .entries
            .entry(resource.id())
            .or_insert_with(|| ResourceEntry::new(resource));

        let handle = entry.handle.get_or_insert_with(|| {
            log::debug!("Initialising {kind:?} resource {}", resource.id());
            driver.init(resource.as_ref())
        });
        match driver.update(resource.as_ref(), handle) {
            Ok(message) => {
                entry.status = Status::Ok;
                entry.message = message.unwrap_or_default();
            }
            Err(message) => {
                log::debug!("Update of resource {} failed: {message}", resource.id());
                entry.status = Status::Error;
                entry.message = message;
            }
        }
        entry.status
    }

    /// Releases the driver handle. Disposing an already disposed or
    /// unknown resource does nothing.
    pub fn dispose(&mut self, resource: &dyn Resource) -> Result<()> {
        if self.destroyed {
            return Ok(());
        }
        let Some(entry) = self.entries.get_mut(&resource.id()) else {
            return Ok(());
        };
        if !entry.disposable {
            return Err(AsterError::NotDisposable(resource.id().get()));
        }
        if let Some(handle) = entry.handle.take() {
            if let Some(driver) = self.drivers.get_mut(&entry.kind) {
                driver.dispose(handle);
            }
            log::debug!("Disposed resource {}", resource.id());
        }
        entry.status = Status::Disposed;
        entry.message.clear();
        Ok(())
    }

    /// Discards the driver's upload baseline. No-op without a handle.
    pub fn reset(&mut self, resource: &dyn Resource) {
        let Some(entry) = self.entries.get_mut(&resource.id()) else {
            return;
        };
        if let (Some(handle), Some(driver)) = (entry.handle.as_mut(), self.drivers.get_mut(&entry.kind)) {
            driver.reset(resource, handle);
        }
    }

    /// Unsupported resources are ignored. A disposed resource keeps the
    /// flag for its next initialisation.
    pub fn set_disposable(&mut self, resource: &Arc<dyn Resource>, disposable: bool) {
        if let Some(entry) = self.entry(resource) {
            entry.disposable = disposable;
        }
    }

    /// Gives `f` the driver handle of a usable resource. `OnDemand`
    /// resources are updated first; anything not [`Status::Ok`] afterwards
    /// yields `None`.
    pub fn with_handle<R>(
        &mut self,
        resource: &Arc<dyn Resource>,
        f: impl FnOnce(&mut DriverHandle) -> R,
    ) -> Option<R> {
        if resource.update_policy() == UpdatePolicy::OnDemand {
            self.update(resource);
        }
        let entry = self.entries.get_mut(&resource.id())?;
        if entry.status != Status::Ok {
            return None;
        }
        entry.handle.as_mut().map(f)
    }

    /// Disposes the handles of resources that no longer exist.
    pub fn collect_orphans(&mut self) -> usize {
        let orphans: Vec<ResourceId> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.resource.strong_count() == 0)
            .map(|(id, _)| *id)
            .collect();
        for id in &orphans {
            let Some(entry) = self.entries.remove(id) else {
                continue;
            };
            if let Some(handle) = entry.handle {
                log::warn!("Resource {id} was dropped without dispose; releasing its handle");
                if let Some(driver) = self.drivers.get_mut(&entry.kind) {
                    driver.dispose(handle);
                }
            }
        }
        orphans.len()
    }

    /// Disposes every remaining handle. Afterwards all statuses read
    /// [`Status::Disposed`].
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        let mut disposed = 0_usize;
        for (_, entry) in self.entries.drain() {
            if let Some(handle) = entry.handle {
                if let Some(driver) = self.drivers.get_mut(&entry.kind) {
                    driver.dispose(handle);
                }
                disposed += 1;
            }
        }
        log::debug!("Resource manager destroyed, {disposed} handles disposed");
    }
}
