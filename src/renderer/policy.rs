//! Per-pass state policy: type masking, atom filtering and atom masking.

use std::fmt;
use std::sync::Arc;

use super::atom::RenderAtom;
use super::context::RenderContext;
use crate::errors::{AsterError, Result};
use crate::state::{StateAtom, StateType, StateUnit};

/// Rewrites state atoms before they reach the context.
///
/// Returning `None` means "leave this slot at whatever is active", which
/// the policy turns into a restore of the currently active atom.
pub trait StateAtomFilter: Send + Sync {
    fn filter(&self, atom: &Arc<StateAtom>, unit: StateUnit) -> Option<Arc<StateAtom>>;
}

/// Per-atom render predicate consulted by the bins.
pub trait RenderAtomMask: Send + Sync {
    fn is_valid_for_render(&self, atom: &RenderAtom) -> bool;
}

/// Set of masked state types, keyed by [`StateType::index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateMask(u32);

impl StateMask {
    #[inline]
    #[must_use]
    pub fn contains(self, state_type: StateType) -> bool {
        self.0 & (1 << state_type.index()) != 0
    }

    pub fn set(&mut self, state_type: StateType, masked: bool) {
        if masked {
            self.0 |= 1 << state_type.index();
        } else {
            self.0 &= !(1 << state_type.index());
        }
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// How a pass lets state managers touch the context.
#[derive(Default)]
pub struct StatePolicy {
    mask: StateMask,
    filter: Option<Box<dyn StateAtomFilter>>,
    atom_mask: Option<Box<dyn RenderAtomMask>>,
}

impl fmt::Debug for StatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatePolicy")
            .field("mask", &self.mask)
            .field("filter", &self.filter.is_some())
            .field("atom_mask", &self.atom_mask.is_some())
            .finish()
    }
}

impl StatePolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn is_masked(&self, state_type: StateType) -> bool {
        self.mask.contains(state_type)
    }

    /// Masked types are neither applied nor restored.
    pub fn set_masked(&mut self, state_type: StateType, masked: bool) {
        self.mask.set(state_type, masked);
    }

    #[must_use]
    pub fn mask(&self) -> StateMask {
        self.mask
    }

    pub fn set_filter(&mut self, filter: Option<Box<dyn StateAtomFilter>>) {
        self.filter = filter;
    }

    pub fn set_atom_mask(&mut self, mask: Option<Box<dyn RenderAtomMask>>) {
        self.atom_mask = mask;
    }

    /// Whether `atom` should be drawn at all in this pass.
    #[must_use]
    pub fn accepts(&self, atom: &RenderAtom) -> bool {
        self.atom_mask.as_ref().is_none_or(|mask| mask.is_valid_for_render(atom))
    }

    /// Applies `atom` on `unit`, after running it through the filter.
    pub fn apply_state(&self, ctx: &mut RenderContext, atom: &Arc<StateAtom>, unit: StateUnit) -> Result<()> {
        let state_type = atom.state_type();
        let Some(filter) = self.filter.as_ref() else {
            return ctx.apply_state_atom(atom, unit);
        };
        match filter.filter(atom, unit) {
            Some(filtered) if filtered.state_type() != state_type => Err(AsterError::StateTypeMismatch {
                expected: state_type,
                found: filtered.state_type(),
            }),
            Some(filtered) => ctx.apply_state_atom(&filtered, unit),
            None => match ctx.active_state_atom(state_type, unit).cloned() {
                Some(active) => ctx.restore_state_atom(&active, unit),
                None => Ok(()),
            },
        }
    }

    /// Restores the slot of `atom`. The active atom is restored when there
    /// is one, since a filter may have substituted it.
    pub fn restore_state(&self, ctx: &mut RenderContext, atom: &Arc<StateAtom>, unit: StateUnit) -> Result<()> {
        match ctx.active_state_atom(atom.state_type(), unit).cloned() {
            Some(active) => ctx.restore_state_atom(&active, unit),
            None if self.filter.is_none() => ctx.restore_state_atom(atom, unit),
            None => Ok(()),
        }
    }
}
