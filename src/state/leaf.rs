use std::sync::Arc;

use super::{DrawFace, StateManager, StateType};
use crate::resources::Geometry;

/// Merged state of one drawable: a manager slot per [`StateType`], the
/// geometry to draw and the sort key used to batch equal state.
///
/// The manager array only grows as far as the highest populated type, so
/// lookups past its end mean "absent", exactly like an empty slot.
#[derive(Debug, Clone, Default)]
pub struct StateLeaf {
    managers: Vec<Option<Arc<StateManager>>>,
    geometry: Option<Arc<Geometry>>,
    sort_index: u32,
}

impl StateLeaf {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_geometry(mut self, geometry: Arc<Geometry>) -> Self {
        self.geometry = Some(geometry);
        self
    }

    #[must_use]
    pub fn with_manager(mut self, manager: impl Into<Arc<StateManager>>) -> Self {
        self.set_manager(manager.into());
        self
    }

    #[must_use]
    pub fn with_sort_index(mut self, sort_index: u32) -> Self {
        self.sort_index = sort_index;
        self
    }

    pub fn set_manager(&mut self, manager: Arc<StateManager>) {
        let index = manager.state_type().index();
        if self.managers.len() <= index {
            self.managers.resize(index + 1, None);
        }
        self.managers[index] = Some(manager);
    }

    pub fn remove_manager(&mut self, state_type: StateType) -> Option<Arc<StateManager>> {
        self.managers.get_mut(state_type.index()).and_then(Option::take)
    }

    /// Manager slots indexed by [`StateType::index`].
    #[inline]
    #[must_use]
    pub fn managers(&self) -> &[Option<Arc<StateManager>>] {
        &self.managers
    }

    #[must_use]
    pub fn manager(&self, state_type: StateType) -> Option<&Arc<StateManager>> {
        self.managers.get(state_type.index()).and_then(Option::as_ref)
    }

    #[must_use]
    pub fn geometry(&self) -> Option<&Arc<Geometry>> {
        self.geometry.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn sort_index(&self) -> u32 {
        self.sort_index
    }

    /// Blended leaves carry an enabled blend atom.
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.manager(StateType::Blend)
            .is_some_and(|m| m.bindings().iter().any(|(_, atom)| atom.is_blend_enabled()))
    }

    #[must_use]
    pub fn draw_face(&self) -> Option<DrawFace> {
        self.manager(StateType::DrawMode).and_then(|m| m.atom().draw_face())
    }

    /// Combines a parent leaf with a child: child slots win, empty child
    /// slots inherit the parent's manager. Geometry and sort key come from
    /// the child when it has them.
    #[must_use]
    pub fn merged(parent: &StateLeaf, child: &StateLeaf) -> StateLeaf {
        let len = parent.managers.len().max(child.managers.len());
        let managers = (0..len)
            .map(|i| {
                child
                    .managers
                    .get(i)
                    .cloned()
                    .flatten()
                    .or_else(|| parent.managers.get(i).cloned().flatten())
            })
            .collect();
        StateLeaf {
            managers,
            geometry: child.geometry.clone().or_else(|| parent.geometry.clone()),
            sort_index: if child.sort_index != 0 { child.sort_index } else { parent.sort_index },
        }
    }

    /// Copy whose draw-mode atoms render only `face`. Used to pin
    /// double-sided atoms to one side without touching shared atoms.
    #[must_use]
    pub(crate) fn pinned_to_face(&self, face: DrawFace) -> StateLeaf {
        let mut pinned = self.clone();
        if let Some(manager) = self.manager(StateType::DrawMode) {
            let replaced = manager.map_atoms(|atom| {
                atom.with_draw_face(face).map_or_else(|| Arc::clone(atom), Arc::new)
            });
            pinned.set_manager(Arc::new(replaced));
        }
        pinned
    }
}
