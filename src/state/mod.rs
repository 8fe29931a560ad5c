//! State model: axes, unit slots, atom values, managers and merged leaves.

pub mod atom;
pub mod leaf;
pub mod manager;
pub mod types;

pub use atom::{
    AlphaState, BlendFactor, BlendFunction, BlendState, DrawFace, DrawModeState, DrawStyle,
    FogEquation, FogState, FragmentTest, LightKind, LightState, MaterialState, StateAtom, Winding,
    ZBufferState,
};
pub use leaf::StateLeaf;
pub use manager::StateManager;
pub use types::{StateType, StateUnit};
