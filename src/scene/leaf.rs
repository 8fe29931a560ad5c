use std::sync::Arc;

use glam::{Affine3A, Vec3};

use super::Aabb;
use crate::state::StateAtom;

/// Placement of a drawable in the world: its transform and world bounds.
#[derive(Debug, Clone)]
pub struct SpatialLeaf {
    world_transform: Affine3A,
    world_bounds: Aabb,
}

impl SpatialLeaf {
    #[must_use]
    pub fn new(world_transform: Affine3A, world_bounds: Aabb) -> Self {
        Self {
            world_transform,
            world_bounds,
        }
    }

    /// Places `local_bounds` with `world_transform`.
    #[must_use]
    pub fn from_local(world_transform: Affine3A, local_bounds: &Aabb) -> Self {
        Self::new(world_transform, local_bounds.transform(&world_transform))
    }

    pub fn world_transform(&self) -> &Affine3A {
        &self.world_transform
    }

    pub fn world_bounds(&self) -> &Aabb {
        &self.world_bounds
    }
}

/// A spatial state (light, fog) together with the region it reaches.
///
/// Atoms whose world bounds intersect the region are rendered under the
/// state; when more states reach an atom than the state type has units,
/// the most influential ones win.
#[derive(Debug, Clone)]
pub struct InfluenceLeaf {
    state: Option<Arc<StateAtom>>,
    region: Aabb,
}

impl InfluenceLeaf {
    #[must_use]
    pub fn new(state: Option<Arc<StateAtom>>, region: Aabb) -> Self {
        Self { state, region }
    }

    pub fn state(&self) -> Option<&Arc<StateAtom>> {
        self.state.as_ref()
    }

    pub fn region(&self) -> &Aabb {
        &self.region
    }

    pub fn influences(&self, leaf: &SpatialLeaf) -> bool {
        self.region.intersects(leaf.world_bounds())
    }

    /// Falls off with the squared distance between region and atom centers.
    pub fn influence(&self, leaf: &SpatialLeaf) -> f32 {
        let d: Vec3 = self.region.center() - leaf.world_bounds().center();
        1.0 / (1.0 + d.length_squared())
    }
}
