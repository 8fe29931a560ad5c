use std::sync::Arc;

use smallvec::SmallVec;

use super::{StateAtom, StateType, StateUnit};
use crate::errors::{AsterError, Result};
use crate::renderer::context::RenderContext;
use crate::renderer::policy::StatePolicy;

/// A state axis bound to one or more unit slots.
///
/// All bound atoms share the manager's [`StateType`] and sit on units that
/// type accepts; both are checked at construction. Managers are applied and
/// restored through a pass's [`StatePolicy`], which owns masking and
/// filtering.
#[derive(Debug, Clone)]
pub struct StateManager {
    state_type: StateType,
    bindings: SmallVec<[(StateUnit, Arc<StateAtom>); 1]>,
}

impl StateManager {
    /// Binds a single atom to its type's default unit.
    pub fn new(atom: impl Into<Arc<StateAtom>>) -> Result<Self> {
        let atom = atom.into();
        let unit = atom.state_type().default_unit();
        Self::with_units(atom.state_type(), [(unit, atom)])
    }

    /// Binds several atoms of `state_type`, one per unit.
    pub fn with_units(
        state_type: StateType,
        bindings: impl IntoIterator<Item = (StateUnit, Arc<StateAtom>)>,
    ) -> Result<Self> {
        let bindings: SmallVec<[(StateUnit, Arc<StateAtom>); 1]> = bindings.into_iter().collect();
        if bindings.is_empty() {
            return Err(AsterError::EmptyStateManager(state_type));
        }
        for (unit, atom) in &bindings {
            if atom.state_type() != state_type {
                return Err(AsterError::StateTypeMismatch {
                    expected: state_type,
                    found: atom.state_type(),
                });
            }
            if !state_type.accepts(*unit) {
                return Err(AsterError::InvalidStateUnit {
                    state_type,
                    unit: *unit,
                });
            }
        }
        Ok(Self {
            state_type,
            bindings,
        })
    }

    #[inline]
    #[must_use]
    pub fn state_type(&self) -> StateType {
        self.state_type
    }

    #[must_use]
    pub fn bindings(&self) -> &[(StateUnit, Arc<StateAtom>)] {
        &self.bindings
    }

    /// The first bound atom.
    #[must_use]
    pub fn atom(&self) -> &Arc<StateAtom> {
        &self.bindings[0].1
    }

    /// Copy of this manager with every atom replaced by `f(atom)`.
    pub(crate) fn map_atoms(&self, f: impl Fn(&Arc<StateAtom>) -> Arc<StateAtom>) -> Self {
        Self {
            state_type: self.state_type,
            bindings: self.bindings.iter().map(|(unit, atom)| (*unit, f(atom))).collect(),
        }
    }

    /// Pushes every binding through the pass policy and records this
    /// manager as the active one for its type. Masked types are skipped.
    pub fn apply(self: &Arc<Self>, ctx: &mut RenderContext, policy: &StatePolicy) -> Result<()> {
        if policy.is_masked(self.state_type) {
            return Ok(());
        }
        // Units bound by the outgoing manager but not by this one.
        if let Some(previous) = ctx.active_state_manager(self.state_type).cloned() {
            if !Arc::ptr_eq(&previous, self) {
                for (unit, atom) in previous.bindings() {
                    if !self.bindings.iter().any(|(u, _)| u == unit) {
                        policy.restore_state(ctx, atom, *unit)?;
                    }
                }
            }
        }
        for (unit, atom) in &self.bindings {
            policy.apply_state(ctx, atom, *unit)?;
        }
        ctx.set_active_state_manager(self.state_type, Some(Arc::clone(self)));
        Ok(())
    }

    /// Restores every binding and clears the active manager record.
    pub fn restore(self: &Arc<Self>, ctx: &mut RenderContext, policy: &StatePolicy) -> Result<()> {
        if policy.is_masked(self.state_type) {
            return Ok(());
        }
        for (unit, atom) in &self.bindings {
            policy.restore_state(ctx, atom, *unit)?;
        }
        ctx.set_active_state_manager(self.state_type, None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AlphaState, ZBufferState};

    fn zbuffer() -> Arc<StateAtom> {
        Arc::new(StateAtom::ZBuffer(ZBufferState::default()))
    }

    #[test]
    fn single_atom_takes_default_unit() {
        let manager = StateManager::new(StateAtom::ZBuffer(ZBufferState::default())).unwrap();
        assert_eq!(manager.state_type(), StateType::ZBuffer);
        assert_eq!(manager.bindings().len(), 1);
        assert_eq!(manager.bindings()[0].0, StateUnit::Null);
    }

    #[test]
    fn bindings_are_validated() {
        assert!(matches!(
            StateManager::with_units(StateType::ZBuffer, []),
            Err(AsterError::EmptyStateManager(StateType::ZBuffer))
        ));
        assert!(matches!(
            StateManager::with_units(StateType::ZBuffer, [(StateUnit::Numeric(1), zbuffer())]),
            Err(AsterError::InvalidStateUnit { .. })
        ));
        let alpha = Arc::new(StateAtom::Alpha(AlphaState::default()));
        assert!(matches!(
            StateManager::with_units(StateType::ZBuffer, [(StateUnit::Null, alpha)]),
            Err(AsterError::StateTypeMismatch {
                expected: StateType::ZBuffer,
                found: StateType::Alpha
            })
        ));
    }
}
