//! Scene-side collaborators of the render core.
//!
//! The render core does not own a scene graph. A [`Scene`] only has to
//! submit the atoms and influence leaves visible from a [`View`]; the
//! bundled [`AtomListScene`] does that for a flat list with frustum culling.

pub mod bounds;
pub mod leaf;
pub mod view;

use parking_lot::RwLock;

pub use bounds::{Aabb, Plane};
pub use leaf::{InfluenceLeaf, SpatialLeaf};
pub use view::{Frustum, Projection, View, Viewport};

use crate::renderer::atom::RenderAtom;
use crate::renderer::bin::RenderQueue;

/// Source of render atoms for a pass.
pub trait Scene: Send + Sync {
    /// Pushes everything visible from `view` into `queue`.
    fn submit(&self, view: &View, queue: &mut RenderQueue<'_>);
}

/// A flat list of atoms and influence leaves.
#[derive(Debug, Default)]
pub struct AtomListScene {
    atoms: RwLock<Vec<RenderAtom>>,
    influences: RwLock<Vec<InfluenceLeaf>>,
    cull: bool,
}

impl AtomListScene {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cull: true,
            ..Self::default()
        }
    }

    /// Disables frustum culling; every atom is submitted.
    #[must_use]
    pub fn without_culling(mut self) -> Self {
        self.cull = false;
        self
    }

    pub fn add_atom(&self, atom: RenderAtom) {
        self.atoms.write().push(atom);
    }

    pub fn add_influence(&self, leaf: InfluenceLeaf) {
        self.influences.write().push(leaf);
    }

    pub fn clear(&self) {
        self.atoms.write().clear();
        self.influences.write().clear();
    }

    pub fn len(&self) -> usize {
        self.atoms.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.read().is_empty()
    }
}

impl Scene for AtomListScene {
    fn submit(&self, view: &View, queue: &mut RenderQueue<'_>) {
        let frustum = view.frustum();
        for leaf in self.influences.read().iter() {
            queue.add_influence_leaf(leaf.clone());
        }
        for atom in self.atoms.read().iter() {
            if self.cull && !frustum.intersects_box(atom.spatial_link().world_bounds()) {
                continue;
            }
            queue.add_render_atom(atom.clone());
        }
    }
}
