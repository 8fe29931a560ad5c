//! Render core: context bookkeeping, atom bins, passes and frame
//! scheduling.
//!
//! ```text
//! RenderManager ── owns ──> RenderContext ── drives ──> dyn ContextBackend
//!      │
//!      └── RenderPass* ── RenderAtomBin (opaque) ── RenderAtomBin (transparent)
//! ```

pub mod atom;
pub mod backend;
pub mod bin;
pub mod context;
pub mod manager;
pub mod pass;
pub mod policy;
pub mod settings;
mod spatial;
pub mod statistics;
pub mod task;
mod transfer;

pub use atom::RenderAtom;
pub use backend::{ClearFlags, ContextBackend};
pub use bin::{
    Band, BinAtoms, BinStrategy, DefaultStates, OpaqueStrategy, RenderAtomBin, RenderQueue,
    TransparentStrategy,
};
pub use context::{RenderContext, ResourceResolver};
pub use manager::{FrameListener, InitListener, RenderManager, ReshapeListener, Updatable};
pub use pass::{ClearSettings, PassTarget, RenderPass, RenderToTexture};
pub use policy::{RenderAtomMask, StateAtomFilter, StateMask, StatePolicy};
pub use settings::{RendererSettings, SlicePolicy};
pub use statistics::FrameStatistics;
pub use task::{AttachPoint, AttachedTasks, Task, TaskCompleteListener, TaskContext};
