#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Aster
//!
//! A driver-agnostic render core: render atoms are collected into bins,
//! sorted to minimise state changes, and drawn through a
//! [`ContextBackend`] that the graphics driver implements. Access to the
//! hardware is confined to [`Framework`] worker threads.

pub mod errors;
pub mod framework;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod state;

pub use errors::{AsterError, Result};
pub use framework::{
    DisplayMode, Framework, FrameworkSettings, HardwareAccessLayer, PixelFormat, ResourceDriver,
    Status, Surface, SurfaceFactory, SurfaceOptions, TaskFuture,
};
pub use renderer::{
    AttachPoint, ContextBackend, RenderAtom, RenderAtomBin, RenderContext, RenderManager,
    RenderPass, RendererSettings, StatePolicy,
};
pub use resources::{Resource, ResourceId, ResourceKind, UpdatePolicy};
pub use scene::{AtomListScene, InfluenceLeaf, Scene, SpatialLeaf, View};
pub use state::{StateAtom, StateLeaf, StateManager, StateType, StateUnit};
