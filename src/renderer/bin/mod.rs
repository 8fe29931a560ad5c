//! Render Atom Bins
//!
//! A [`RenderAtomBin`] collects the atoms a scene submits for one pass,
//! sorts them so atoms sharing state are adjacent, and replays them through
//! the context with minimal state changes.
//!
//! The replay order is owned by an injected [`BinStrategy`]:
//!
//! - [`OpaqueStrategy`]: straight state-sorted order.
//! - [`TransparentStrategy`]: depth pre-pass, then far-to-near bands drawn
//!   back faces first.
//!
//! A bin built with [`RenderAtomBin::with_settings`] is opaque and owns a
//! nested transparent bin; blended atoms are routed there on add and drawn
//! after the opaque ones.
//!
//! Storage keeps an empty slot before the first and after the last atom so
//! neighbour lookups never need bounds checks.

mod sort;
pub mod transparent;

use std::fmt;
use std::sync::Arc;

pub use transparent::{Band, TransparentStrategy, band_partition};

use super::atom::RenderAtom;
use super::context::RenderContext;
use super::policy::StatePolicy;
use super::settings::{DEFAULT_INCREMENT, RendererSettings};
use super::statistics::FrameStatistics;
use crate::errors::Result;
use crate::scene::{InfluenceLeaf, View};
use crate::state::{AlphaState, BlendState, DrawModeState, StateAtom, StateUnit, ZBufferState};

// ============================================================================
// Strategy
// ============================================================================

/// Replay order of a bin.
pub trait BinStrategy: Send {
    /// Called for every accepted atom, before it is stored.
    fn atom_added(&mut self, _atom: &RenderAtom) {}

    /// Called when the bin is cleared for a new frame.
    fn clear(&mut self) {}

    /// Draws every atom of the bin.
    fn render_all(
        &mut self,
        atoms: &BinAtoms<'_>,
        ctx: &mut RenderContext,
        policy: &mut StatePolicy,
        view: &View,
        defaults: &DefaultStates,
    ) -> Result<()>;
}

/// State-sorted replay.
#[derive(Debug, Default)]
pub struct OpaqueStrategy;

impl BinStrategy for OpaqueStrategy {
    fn render_all(
        &mut self,
        atoms: &BinAtoms<'_>,
        ctx: &mut RenderContext,
        policy: &mut StatePolicy,
        _view: &View,
        defaults: &DefaultStates,
    ) -> Result<()> {
        render_opaque(atoms, ctx, policy, defaults)
    }
}

/// Applies `defaults`, draws every accepted atom in storage order, then
/// unwinds all state back to where it started.
pub fn render_opaque(
    atoms: &BinAtoms<'_>,
    ctx: &mut RenderContext,
    policy: &StatePolicy,
    defaults: &DefaultStates,
) -> Result<()> {
    defaults.apply(ctx, policy)?;

    let mut prev: Option<&RenderAtom> = None;
    for atom in atoms.iter() {
        if !policy.accepts(atom) {
            continue;
        }
        atoms.render_atom(prev, atom, ctx, policy)?;
        prev = Some(atom);
    }

    ctx.clear_spatial_states()?;
    RenderAtom::apply_states(prev, None, ctx, policy)?;
    defaults.restore(ctx, policy)
}

/// Baseline fixed-function state a bin renders against.
#[derive(Debug, Clone)]
pub struct DefaultStates {
    pub zbuffer: Arc<StateAtom>,
    pub draw: Arc<StateAtom>,
    pub alpha: Arc<StateAtom>,
    pub blend: Arc<StateAtom>,
}

impl Default for DefaultStates {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultStates {
    /// Depth write with LEQUAL, CCW front faces filled, alpha test and
    /// blending off.
    #[must_use]
    pub fn new() -> Self {
        Self {
            zbuffer: Arc::new(ZBufferState::default().into()),
            draw: Arc::new(DrawModeState::default().into()),
            alpha: Arc::new(AlphaState::default().into()),
            blend: Arc::new(BlendState::default().into()),
        }
    }

    fn atoms(&self) -> [&Arc<StateAtom>; 4] {
        [&self.zbuffer, &self.draw, &self.alpha, &self.blend]
    }

    pub fn apply(&self, ctx: &mut RenderContext, policy: &StatePolicy) -> Result<()> {
        for atom in self.atoms() {
            if !policy.is_masked(atom.state_type()) {
                policy.apply_state(ctx, atom, StateUnit::Null)?;
            }
        }
        Ok(())
    }

    pub fn restore(&self, ctx: &mut RenderContext, policy: &StatePolicy) -> Result<()> {
        for atom in self.atoms() {
            if !policy.is_masked(atom.state_type()) {
                policy.restore_state(ctx, atom, StateUnit::Null)?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Stored atoms
// ============================================================================

/// The atoms and influence leaves a strategy replays.
#[derive(Debug, Clone, Copy)]
pub struct BinAtoms<'a> {
    atoms: &'a [Option<RenderAtom>],
    influences: &'a [InfluenceLeaf],
}

impl<'a> BinAtoms<'a> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&'a RenderAtom> {
        self.atoms.get(index).and_then(Option::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a RenderAtom> + 'a {
        self.atoms.iter().flatten()
    }

    #[must_use]
    pub fn influences(&self) -> &'a [InfluenceLeaf] {
        self.influences
    }

    /// Draws `curr` after `prev`: diffs state, gathers spatial states from
    /// every influence leaf reaching the atom, then submits the geometry.
    /// The atom is closed even when a step fails.
    pub fn render_atom(
        &self,
        prev: Option<&RenderAtom>,
        curr: &RenderAtom,
        ctx: &mut RenderContext,
        policy: &StatePolicy,
    ) -> Result<()> {
        ctx.begin_atom(curr)?;
        let result = self.draw_open_atom(prev, curr, ctx, policy);
        if result.is_err() {
            ctx.abort_atom();
        }
        result
    }

    fn draw_open_atom(
        &self,
        prev: Option<&RenderAtom>,
        curr: &RenderAtom,
        ctx: &mut RenderContext,
        policy: &StatePolicy,
    ) -> Result<()> {
        RenderAtom::apply_states(prev, Some(curr), ctx, policy)?;
        for leaf in self.influences {
            let Some(state) = leaf.state() else { continue };
            if policy.is_masked(state.state_type()) || !leaf.influences(curr.spatial_link()) {
                continue;
            }
            ctx.add_spatial_state(state, leaf.influence(curr.spatial_link()))?;
        }
        ctx.end_atom(curr)
    }
}

// ============================================================================
// Bin
// ============================================================================

pub struct RenderAtomBin {
    slots: Vec<Option<RenderAtom>>,
    count: usize,
    increment: usize,
    influences: Vec<InfluenceLeaf>,
    strategy: Box<dyn BinStrategy>,
    transparent: Option<Box<RenderAtomBin>>,
}

impl fmt::Debug for RenderAtomBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderAtomBin")
            .field("count", &self.count)
            .field("capacity", &self.capacity())
            .field("influences", &self.influences.len())
            .field("transparent", &self.transparent)
            .finish_non_exhaustive()
    }
}

impl Default for RenderAtomBin {
    fn default() -> Self {
        Self::with_settings(&RendererSettings::default())
    }
}

impl RenderAtomBin {
    /// Opaque bin with a nested transparent bin, both starting at
    /// `capacity`.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_settings(&RendererSettings::default().with_bin_capacity(capacity))
    }

    #[must_use]
    pub fn with_settings(settings: &RendererSettings) -> Self {
        let mut bin = Self::with_strategy(
            settings.bin_capacity,
            settings.bin_increment,
            Box::new(OpaqueStrategy),
        );
        bin.transparent = Some(Box::new(Self::transparent(settings)));
        bin
    }

    /// Stand-alone transparent bin.
    #[must_use]
    pub fn transparent(settings: &RendererSettings) -> Self {
        Self::with_strategy(
            settings.bin_capacity,
            settings.bin_increment,
            Box::new(TransparentStrategy::new(settings.band_depth, settings.slice_policy)),
        )
    }

    /// Bin replaying through `strategy`, without a nested transparent bin.
    #[must_use]
    pub fn with_strategy(capacity: usize, increment: usize, strategy: Box<dyn BinStrategy>) -> Self {
        let mut slots = Vec::new();
        slots.resize_with(capacity + 2, || None);
        Self {
            slots,
            count: 0,
            increment: if increment == 0 { DEFAULT_INCREMENT } else { increment },
            influences: Vec::new(),
            strategy,
            transparent: None,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len() - 2
    }

    /// Atoms stored in this bin, not counting the nested transparent bin.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn transparent_bin(&self) -> Option<&RenderAtomBin> {
        self.transparent.as_deref()
    }

    /// Stored atoms in replay order.
    pub fn atoms(&self) -> impl Iterator<Item = &RenderAtom> {
        self.slots[1..=self.count].iter().flatten()
    }

    #[must_use]
    pub fn influence_leaves(&self) -> &[InfluenceLeaf] {
        &self.influences
    }

    pub fn ensure_capacity(&mut self, capacity: usize) {
        if self.capacity() < capacity {
            self.slots.resize_with(capacity + 2, || None);
        }
        if let Some(transparent) = self.transparent.as_mut() {
            transparent.ensure_capacity(capacity);
        }
    }

    /// Drops every atom and influence leaf. Storage is kept.
    pub fn clear(&mut self) {
        for slot in &mut self.slots[1..=self.count] {
            *slot = None;
        }
        self.count = 0;
        self.influences.clear();
        self.strategy.clear();
        if let Some(transparent) = self.transparent.as_mut() {
            transparent.clear();
        }
    }

    /// Appends without any routing or checks, growing by the fixed
    /// increment when full.
    pub fn add(&mut self, atom: RenderAtom) {
        if self.count + 2 >= self.slots.len() {
            let grown = self.slots.len() + self.increment;
            self.slots.resize_with(grown, || None);
        }
        self.count += 1;
        self.slots[self.count] = Some(atom);
    }

    /// Accepts an atom for this frame.
    ///
    /// Atoms without a state link or geometry are ignored. Blended atoms go
    /// to the nested transparent bin when there is one.
    pub fn add_render_atom(&mut self, mut atom: RenderAtom, stats: &mut FrameStatistics) {
        let Some(leaf) = atom.state_link() else { return };
        let Some(geometry) = leaf.geometry() else { return };

        if let Some(transparent) = self.transparent.as_mut() {
            if leaf.is_transparent() {
                transparent.add_render_atom(atom, stats);
                return;
            }
        }

        let sort_index = leaf.sort_index();
        let (vertices, polygons) = (geometry.vertex_count(), geometry.polygon_count());
        atom.set_state_sorted_index(sort_index);
        self.strategy.atom_added(&atom);
        self.add(atom);
        stats.add(1, vertices, polygons);
    }

    /// Registers a spatial state reaching atoms this frame. Leaves without
    /// a state are ignored.
    pub fn add_influence_leaf(&mut self, leaf: InfluenceLeaf) {
        if leaf.state().is_none() {
            return;
        }
        if let Some(transparent) = self.transparent.as_mut() {
            transparent.add_influence_leaf(leaf.clone());
        }
        self.influences.push(leaf);
    }

    /// Groups atoms with equal sort keys together.
    pub fn optimize(&mut self) {
        sort::three_way_sort(&mut self.slots[1..=self.count], &|slot: &Option<RenderAtom>| {
            slot.as_ref().map_or(0, RenderAtom::state_sorted_index)
        });
    }

    /// Replays this bin, then the nested transparent bin.
    pub fn render_atoms(&mut self, ctx: &mut RenderContext, policy: &mut StatePolicy, view: &View) -> Result<()> {
        if self.count > 0 {
            self.slots[0] = None;
            self.slots[self.count + 1] = None;

            let defaults = DefaultStates::new();
            let atoms = BinAtoms {
                atoms: &self.slots[1..=self.count],
                influences: &self.influences,
            };
            log::trace!("Rendering {} atoms", self.count);
            self.strategy.render_all(&atoms, ctx, policy, view, &defaults)?;
        }

        if let Some(transparent) = self.transparent.as_mut() {
            transparent.optimize();
            transparent.render_atoms(ctx, policy, view)?;
        }
        Ok(())
    }
}

/// Write handle a [`Scene`](crate::scene::Scene) submits into.
pub struct RenderQueue<'a> {
    bin: &'a mut RenderAtomBin,
    stats: &'a mut FrameStatistics,
}

impl<'a> RenderQueue<'a> {
    pub fn new(bin: &'a mut RenderAtomBin, stats: &'a mut FrameStatistics) -> Self {
        Self { bin, stats }
    }

    pub fn add_render_atom(&mut self, atom: RenderAtom) {
        self.bin.add_render_atom(atom, self.stats);
    }

    pub fn add_influence_leaf(&mut self, leaf: InfluenceLeaf) {
        self.bin.add_influence_leaf(leaf);
    }
}
