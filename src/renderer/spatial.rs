//! Spatial state tracking.
//!
//! Spatial states (lights, fog) reach an atom through influence leaves
//! rather than through its merged state. Each state type gets a tracker
//! with one slot per unit; between consecutive atoms a unit keeps a state
//! it already holds, vacant units take the remaining states, and only the
//! difference is pushed to the driver.

use std::sync::Arc;

use smallvec::SmallVec;

use crate::state::{StateAtom, StateType, StateUnit};

/// Driver work produced when the tracker settles on a new assignment.
#[derive(Debug, Clone)]
pub(crate) enum SpatialChange {
    Apply(Arc<StateAtom>, StateUnit),
    Restore(Arc<StateAtom>, StateUnit),
}

#[derive(Debug)]
struct DynamicUnit {
    unit: StateUnit,
    previous: Option<Arc<StateAtom>>,
    next: Option<Arc<StateAtom>>,
}

#[derive(Debug)]
struct DynamicStateTracker {
    states: Vec<(Arc<StateAtom>, f32)>,
    units: Vec<DynamicUnit>,
}

impl DynamicStateTracker {
    fn new(state_type: StateType) -> Self {
        Self {
            states: Vec::new(),
            units: state_type
                .units()
                .into_iter()
                .map(|unit| DynamicUnit {
                    unit,
                    previous: None,
                    next: None,
                })
                .collect(),
        }
    }

    fn resolve(&mut self, changes: &mut SmallVec<[SpatialChange; 8]>) {
        if self.states.len() > self.units.len() {
            self.states.sort_by(|a, b| b.1.total_cmp(&a.1));
        }
        let mut pending: SmallVec<[Option<Arc<StateAtom>>; 8]> =
            self.states.drain(..).map(|(state, _)| Some(state)).collect();

        // Units keep states they already hold.
        for slot in &mut pending {
            let Some(state) = slot.as_ref() else { continue };
            if let Some(unit) = self.units.iter_mut().find(|u| {
                u.next.is_none() && u.previous.as_ref().is_some_and(|p| Arc::ptr_eq(p, state))
            }) {
                unit.next = slot.take();
            }
        }
        // Remaining states fill vacant units in order.
        for slot in &mut pending {
            if slot.is_none() {
                continue;
            }
            if let Some(unit) = self.units.iter_mut().find(|u| u.next.is_none()) {
                unit.next = slot.take();
            }
        }

        for unit in &mut self.units {
            match (&unit.previous, &unit.next) {
                (prev, Some(next)) if !prev.as_ref().is_some_and(|p| Arc::ptr_eq(p, next)) => {
                    changes.push(SpatialChange::Apply(Arc::clone(next), unit.unit));
                }
                (Some(prev), None) => {
                    changes.push(SpatialChange::Restore(Arc::clone(prev), unit.unit));
                }
                _ => {}
            }
            unit.previous = unit.next.take();
        }
    }

    fn restore_all(&mut self, changes: &mut SmallVec<[SpatialChange; 8]>) {
        for unit in &mut self.units {
            if let Some(prev) = unit.previous.take() {
                changes.push(SpatialChange::Restore(prev, unit.unit));
            }
            unit.next = None;
        }
    }
}

/// One lazily created tracker per spatial state type.
#[derive(Debug, Default)]
pub(crate) struct SpatialStateRecord {
    trackers: [Option<DynamicStateTracker>; StateType::COUNT],
}

impl SpatialStateRecord {
    /// Forgets states gathered for the previous atom.
    pub(crate) fn reset_pending(&mut self) {
        for tracker in self.trackers.iter_mut().flatten() {
            tracker.states.clear();
        }
    }

    pub(crate) fn add(&mut self, state: Arc<StateAtom>, influence: f32) {
        let state_type = state.state_type();
        self.trackers[state_type.index()]
            .get_or_insert_with(|| DynamicStateTracker::new(state_type))
            .states
            .push((state, influence));
    }

    pub(crate) fn resolve(&mut self) -> SmallVec<[SpatialChange; 8]> {
        let mut changes = SmallVec::new();
        for tracker in self.trackers.iter_mut().flatten() {
            tracker.resolve(&mut changes);
        }
        changes
    }

    pub(crate) fn restore_all(&mut self) -> SmallVec<[SpatialChange; 8]> {
        let mut changes = SmallVec::new();
        for tracker in self.trackers.iter_mut().flatten() {
            tracker.restore_all(&mut changes);
        }
        changes
    }
}
