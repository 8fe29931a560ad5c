//! State axes and unit slots.
//!
//! Every state atom belongs to exactly one [`StateType`]. The enum is closed,
//! so its discriminant doubles as the dense "dynamic type" index used by the
//! context records and the merged state arrays.

use smallvec::SmallVec;

/// One axis of GPU state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum StateType {
    ZBuffer,
    DrawMode,
    Alpha,
    Blend,
    Material,
    Texture,
    Fog,
    Light,
}

impl StateType {
    /// Number of state axes.
    pub const COUNT: usize = 8;

    /// All state axes in index order.
    pub const ALL: [StateType; Self::COUNT] = [
        StateType::ZBuffer,
        StateType::DrawMode,
        StateType::Alpha,
        StateType::Blend,
        StateType::Material,
        StateType::Texture,
        StateType::Fog,
        StateType::Light,
    ];

    /// Dense index of this axis, stable for the lifetime of the program.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Number of unit slots this axis exposes.
    #[must_use]
    pub const fn unit_count(self) -> u16 {
        match self {
            StateType::Texture => 16,
            StateType::Light => 8,
            _ => 1,
        }
    }

    /// Whether atoms of this axis are bound to numbered units.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, StateType::Texture | StateType::Light)
    }

    /// Spatial states reach atoms through influence leaves rather than
    /// through merged state arrays.
    #[must_use]
    pub const fn is_spatial(self) -> bool {
        matches!(self, StateType::Fog | StateType::Light)
    }

    /// The unit used when a binding does not name one.
    #[must_use]
    pub const fn default_unit(self) -> StateUnit {
        if self.is_numeric() {
            StateUnit::Numeric(0)
        } else {
            StateUnit::Null
        }
    }

    #[must_use]
    pub fn accepts(self, unit: StateUnit) -> bool {
        match unit {
            StateUnit::Null => !self.is_numeric(),
            StateUnit::Numeric(n) => self.is_numeric() && n < self.unit_count(),
        }
    }

    /// Every unit slot of this axis, in ordinal order.
    #[must_use]
    pub fn units(self) -> SmallVec<[StateUnit; 8]> {
        if self.is_numeric() {
            (0..self.unit_count()).map(StateUnit::Numeric).collect()
        } else {
            smallvec::smallvec![StateUnit::Null]
        }
    }
}

/// Slot a state atom is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StateUnit {
    /// The single slot of a non-numeric axis.
    #[default]
    Null,
    /// A numbered slot (texture unit, light index).
    Numeric(u16),
}

impl StateUnit {
    #[inline]
    #[must_use]
    pub const fn ordinal(self) -> usize {
        match self {
            StateUnit::Null => 0,
            StateUnit::Numeric(n) => n as usize,
        }
    }
}
