//! Render Context
//!
//! [`RenderContext`] wraps a driver [`ContextBackend`] and keeps the
//! bookkeeping the render core needs on top of it:
//!
//! - the active state atom per `(StateType, unit)` so redundant
//!   applications never reach the driver,
//! - the active [`StateManager`] per type,
//! - the atom currently between `begin_atom` and `end_atom`,
//! - the spatial (light / fog) unit assignment,
//! - an optional [`ResourceResolver`] that readies buffers and textures
//!   right before the driver consumes them.
//!
//! A context is owned by exactly one thread at a time; nothing here locks.

use std::sync::Arc;

use glam::Affine3A;
use smallvec::SmallVec;

use super::atom::RenderAtom;
use super::backend::{ClearFlags, ContextBackend};
use super::spatial::{SpatialChange, SpatialStateRecord};
use crate::errors::{AsterError, Result};
use crate::resources::{Geometry, Resource};
use crate::scene::{Plane, View, Viewport};
use crate::state::{StateAtom, StateManager, StateType, StateUnit};

type AtomSlots = SmallVec<[Option<Arc<StateAtom>>; 1]>;

/// Called with every resource a draw or texture apply is about to use.
pub trait ResourceResolver: Send {
    fn resolve(&mut self, resource: &Arc<dyn Resource>);
}

pub struct RenderContext {
    backend: Box<dyn ContextBackend>,
    resolver: Option<Box<dyn ResourceResolver>>,
    managers: [Option<Arc<StateManager>>; StateType::COUNT],
    atoms: [AtomSlots; StateType::COUNT],
    spatial: SpatialStateRecord,
    current_atom: Option<u64>,
    destroyed: bool,
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("current_atom", &self.current_atom)
            .field("destroyed", &self.destroyed)
            .field("resolver", &self.resolver.is_some())
            .finish_non_exhaustive()
    }
}

impl RenderContext {
    #[must_use]
    pub fn new(backend: Box<dyn ContextBackend>) -> Self {
        Self {
            backend,
            resolver: None,
            managers: Default::default(),
            atoms: std::array::from_fn(|i| {
                let units = StateType::ALL[i].unit_count() as usize;
                SmallVec::from_elem(None, units)
            }),
            spatial: SpatialStateRecord::default(),
            current_atom: None,
            destroyed: false,
        }
    }

    pub fn backend(&self) -> &dyn ContextBackend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn ContextBackend {
        self.backend.as_mut()
    }

    pub fn set_resource_resolver(&mut self, resolver: Option<Box<dyn ResourceResolver>>) {
        self.resolver = resolver;
    }

    fn resolve(&mut self, resource: &Arc<dyn Resource>) {
        if let Some(resolver) = self.resolver.as_mut() {
            resolver.resolve(resource);
        }
    }

    // ========================================================================
    // State records
    // ========================================================================

    /// Applies `atom` on `unit` unless it already is the active atom there.
    pub fn apply_state_atom(&mut self, atom: &Arc<StateAtom>, unit: StateUnit) -> Result<()> {
        let slot = self.slot_mut(atom.state_type(), unit)?;
        if slot.as_ref().is_some_and(|active| Arc::ptr_eq(active, atom)) {
            return Ok(());
        }
        *slot = Some(Arc::clone(atom));
        if let StateAtom::Texture(texture) = atom.as_ref() {
            self.resolve(&(Arc::clone(texture) as Arc<dyn Resource>));
        }
        self.backend.apply_state(atom, unit);
        Ok(())
    }

    /// Returns the axis of `atom` on `unit` to its driver default.
    pub fn restore_state_atom(&mut self, atom: &Arc<StateAtom>, unit: StateUnit) -> Result<()> {
        *self.slot_mut(atom.state_type(), unit)? = None;
        self.backend.restore_state(atom, unit);
        Ok(())
    }

    #[must_use]
    pub fn active_state_atom(&self, state_type: StateType, unit: StateUnit) -> Option<&Arc<StateAtom>> {
        if !state_type.accepts(unit) {
            return None;
        }
        self.atoms[state_type.index()].get(unit.ordinal()).and_then(Option::as_ref)
    }

    /// Every active atom with its type and unit, in type order.
    pub fn active_state_atoms(&self) -> impl Iterator<Item = (StateType, StateUnit, &Arc<StateAtom>)> {
        StateType::ALL.into_iter().flat_map(move |ty| {
            self.atoms[ty.index()].iter().enumerate().filter_map(move |(i, slot)| {
                let unit = if ty.is_numeric() {
                    StateUnit::Numeric(i as u16)
                } else {
                    StateUnit::Null
                };
                slot.as_ref().map(|atom| (ty, unit, atom))
            })
        })
    }

    pub fn set_active_state_manager(&mut self, state_type: StateType, manager: Option<Arc<StateManager>>) {
        debug_assert!(manager.as_ref().is_none_or(|m| m.state_type() == state_type));
        self.managers[state_type.index()] = manager;
    }

    #[must_use]
    pub fn active_state_manager(&self, state_type: StateType) -> Option<&Arc<StateManager>> {
        self.managers[state_type.index()].as_ref()
    }

    fn slot_mut(&mut self, state_type: StateType, unit: StateUnit) -> Result<&mut Option<Arc<StateAtom>>> {
        if !state_type.accepts(unit) {
            return Err(AsterError::InvalidStateUnit { state_type, unit });
        }
        Ok(&mut self.atoms[state_type.index()][unit.ordinal()])
    }

    // ========================================================================
    // Atom rendering
    // ========================================================================

    /// Opens `atom`. Spatial states gathered for the previous atom are
    /// forgotten; the unit assignment itself is kept for diffing.
    pub fn begin_atom(&mut self, atom: &RenderAtom) -> Result<()> {
        if self.current_atom.is_some() {
            return Err(AsterError::AtomAlreadyBegun);
        }
        self.current_atom = Some(atom.id());
        self.spatial.reset_pending();
        Ok(())
    }

    /// Applies the spatial states gathered since `begin_atom`, then draws
    /// the atom's geometry under its world transform.
    pub fn end_atom(&mut self, atom: &RenderAtom) -> Result<()> {
        if self.current_atom != Some(atom.id()) {
            return Err(AsterError::AtomMismatch);
        }
        self.current_atom = None;

        let geometry = atom.geometry().ok_or(AsterError::IncompleteAtom("no geometry"))?;
        let changes = self.spatial.resolve();
        self.run_spatial_changes(changes)?;

        for buffer in geometry.vertices().into_iter().chain(geometry.indices()) {
            self.resolve(&(Arc::clone(buffer) as Arc<dyn Resource>));
        }
        self.backend.push_model_transform(atom.spatial_link().world_transform());
        self.backend.render_geometry(geometry);
        self.backend.pop_model_transform();
        Ok(())
    }

    /// Closes the open atom without drawing it.
    pub(crate) fn abort_atom(&mut self) {
        self.current_atom = None;
    }

    /// Registers a spatial state for the open atom. Only applied at
    /// `end_atom`, and only if it wins a unit.
    pub fn add_spatial_state(&mut self, state: &Arc<StateAtom>, influence: f32) -> Result<()> {
        let state_type = state.state_type();
        if !state_type.is_spatial() {
            return Err(AsterError::StateTypeMismatch {
                expected: StateType::Light,
                found: state_type,
            });
        }
        self.spatial.add(Arc::clone(state), influence);
        Ok(())
    }

    /// Restores every spatial state still bound to a unit.
    pub fn clear_spatial_states(&mut self) -> Result<()> {
        let changes = self.spatial.restore_all();
        self.run_spatial_changes(changes)
    }

    fn run_spatial_changes(&mut self, changes: SmallVec<[SpatialChange; 8]>) -> Result<()> {
        for change in changes {
            match change {
                SpatialChange::Apply(atom, unit) => self.apply_state_atom(&atom, unit)?,
                SpatialChange::Restore(atom, unit) => self.restore_state_atom(&atom, unit)?,
            }
        }
        Ok(())
    }

    // ========================================================================
    // Backend delegates
    // ========================================================================

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.backend.set_viewport(viewport);
    }

    pub fn set_projection_view(&mut self, view: &View) {
        self.backend.set_projection_view(view);
    }

    pub fn push_model_transform(&mut self, transform: &Affine3A) {
        self.backend.push_model_transform(transform);
    }

    pub fn pop_model_transform(&mut self) {
        self.backend.pop_model_transform();
    }

    pub fn render_geometry(&mut self, geometry: &Geometry) {
        self.backend.render_geometry(geometry);
    }

    pub fn set_user_clip_plane(&mut self, plane: Plane, index: usize) {
        self.backend.set_user_clip_plane(plane, index);
    }

    pub fn enable_user_clip_plane(&mut self, index: usize) {
        self.backend.enable_user_clip_plane(index);
    }

    pub fn disable_user_clip_plane(&mut self, index: usize) {
        self.backend.disable_user_clip_plane(index);
    }

    pub fn clear_buffers(&mut self, flags: ClearFlags, color: [f32; 4], depth: f32, stencil: i32) {
        self.backend.clear_buffers(flags, color, depth, stencil);
    }

    #[must_use]
    pub fn context_width(&self) -> u32 {
        self.backend.context_width()
    }

    #[must_use]
    pub fn context_height(&self) -> u32 {
        self.backend.context_height()
    }

    pub fn make_current(&mut self) -> Result<()> {
        if self.destroyed {
            return Err(AsterError::ContextDestroyed);
        }
        self.backend.make_current()
    }

    pub fn swap_buffers(&mut self) -> Result<()> {
        if self.destroyed {
            return Err(AsterError::ContextDestroyed);
        }
        self.backend.swap_buffers()
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Releases the driver context. Calling it again does nothing.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.current_atom = None;
        self.managers = Default::default();
        for slots in &mut self.atoms {
            slots.iter_mut().for_each(|slot| *slot = None);
        }
        self.backend.destroy_context();
        log::debug!("Render context destroyed");
    }
}
