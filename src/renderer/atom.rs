//! Render atoms and state diffing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::context::RenderContext;
use super::policy::StatePolicy;
use crate::errors::Result;
use crate::resources::Geometry;
use crate::scene::SpatialLeaf;
use crate::state::{DrawFace, StateLeaf, StateManager};

static NEXT_ATOM_ID: AtomicU64 = AtomicU64::new(1);

/// One drawable unit: where it is, how it is shaded and its sort key.
///
/// Clones share the id, so a clone can stand in for the original between
/// `begin_atom` and `end_atom`. Atoms without a state link or geometry are
/// valid values but are never accepted by a bin.
#[derive(Debug, Clone)]
pub struct RenderAtom {
    id: u64,
    spatial: Arc<SpatialLeaf>,
    state: Option<Arc<StateLeaf>>,
    state_sorted_index: u32,
}

impl RenderAtom {
    #[must_use]
    pub fn new(spatial: Arc<SpatialLeaf>, state: Arc<StateLeaf>) -> Self {
        Self {
            id: NEXT_ATOM_ID.fetch_add(1, Ordering::Relaxed),
            state_sorted_index: state.sort_index(),
            spatial,
            state: Some(state),
        }
    }

    #[must_use]
    pub fn without_state(spatial: Arc<SpatialLeaf>) -> Self {
        Self {
            id: NEXT_ATOM_ID.fetch_add(1, Ordering::Relaxed),
            spatial,
            state: None,
            state_sorted_index: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn spatial_link(&self) -> &Arc<SpatialLeaf> {
        &self.spatial
    }

    #[must_use]
    pub fn state_link(&self) -> Option<&Arc<StateLeaf>> {
        self.state.as_ref()
    }

    #[must_use]
    pub fn geometry(&self) -> Option<&Arc<Geometry>> {
        self.state.as_ref().and_then(|leaf| leaf.geometry())
    }

    /// Merged manager slots, empty without a state link.
    #[must_use]
    pub fn states(&self) -> &[Option<Arc<StateManager>>] {
        self.state.as_ref().map_or(&[], |leaf| leaf.managers())
    }

    #[inline]
    #[must_use]
    pub fn state_sorted_index(&self) -> u32 {
        self.state_sorted_index
    }

    pub fn set_state_sorted_index(&mut self, index: u32) {
        self.state_sorted_index = index;
    }

    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.state.as_ref().is_some_and(|leaf| leaf.is_transparent())
    }

    #[must_use]
    pub fn draw_face(&self) -> Option<DrawFace> {
        self.state.as_ref().and_then(|leaf| leaf.draw_face())
    }

    /// Same atom, drawn with only `face` rasterised. The shared state leaf
    /// is left untouched.
    pub(crate) fn pinned_to(&self, face: DrawFace) -> Self {
        Self {
            state: self.state.as_ref().map(|leaf| Arc::new(leaf.pinned_to_face(face))),
            ..self.clone()
        }
    }

    /// Moves the context from the state of `prev` to the state of `next`.
    ///
    /// Managers of `prev` with no counterpart in `next` are restored, then
    /// every manager of `next` is applied. The context skips atoms that are
    /// already active, so shared managers cost nothing. Masked types are
    /// left alone in both directions.
    pub fn apply_states(
        prev: Option<&RenderAtom>,
        next: Option<&RenderAtom>,
        ctx: &mut RenderContext,
        policy: &StatePolicy,
    ) -> Result<()> {
        let next_states = next.map_or(&[][..], RenderAtom::states);

        if let Some(prev) = prev {
            for (i, manager) in prev.states().iter().enumerate() {
                let Some(manager) = manager else { continue };
                if next_states.get(i).is_none_or(Option::is_none) {
                    manager.restore(ctx, policy)?;
                }
            }
        }

        for manager in next_states.iter().flatten() {
            manager.apply(ctx, policy)?;
        }
        Ok(())
    }
}
