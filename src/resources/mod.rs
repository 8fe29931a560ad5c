//! GPU-backed resource types.
//!
//! Resources are shared as `Arc<dyn Resource>`. Their contents only change
//! through interior write guards that bump a version, which drivers use to
//! decide between incremental and full uploads.

pub mod buffer;
pub mod geometry;
pub mod shader;
pub mod texture;

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

pub use buffer::{BufferArray, BufferData, BufferWriteGuard, DataType};
pub use geometry::{Geometry, PrimitiveType};
pub use shader::Shader;
pub use texture::{Block, CubeFace, Slice, Texture, TextureFormat, TextureTarget, TextureType};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide unique resource identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u64);

impl ResourceId {
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Driver family a resource belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Buffer,
    Texture,
    Shader,
}

/// When the framework pushes a resource's contents to the GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UpdatePolicy {
    /// Updated automatically right before a renderer uses it.
    #[default]
    OnDemand,
    /// Updated only through an explicit update call.
    Manual,
}

/// A GPU-backed object managed by a framework.
pub trait Resource: Send + Sync + 'static {
    fn id(&self) -> ResourceId;

    fn kind(&self) -> ResourceKind;

    fn update_policy(&self) -> UpdatePolicy;

    fn as_any(&self) -> &dyn Any;
}
