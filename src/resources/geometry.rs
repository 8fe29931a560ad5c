use std::sync::Arc;

use super::BufferData;
use crate::scene::Aabb;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveType {
    #[default]
    Triangles,
    Lines,
    Points,
}

/// Drawable vertex data and the counts frame statistics are built from.
#[derive(Debug, Clone)]
pub struct Geometry {
    vertex_count: usize,
    polygon_count: usize,
    primitive: PrimitiveType,
    bounds: Aabb,
    vertices: Option<Arc<BufferData>>,
    indices: Option<Arc<BufferData>>,
}

impl Geometry {
    #[must_use]
    pub fn new(vertex_count: usize, polygon_count: usize, bounds: Aabb) -> Self {
        Self {
            vertex_count,
            polygon_count,
            primitive: PrimitiveType::Triangles,
            bounds,
            vertices: None,
            indices: None,
        }
    }

    #[must_use]
    pub fn with_primitive(mut self, primitive: PrimitiveType) -> Self {
        self.primitive = primitive;
        self
    }

    #[must_use]
    pub fn with_buffers(mut self, vertices: Arc<BufferData>, indices: Option<Arc<BufferData>>) -> Self {
        self.vertices = Some(vertices);
        self.indices = indices;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn polygon_count(&self) -> usize {
        self.polygon_count
    }

    pub fn primitive(&self) -> PrimitiveType {
        self.primitive
    }

    /// Bounds in model space.
    pub fn bounds(&self) -> &Aabb {
        &self.bounds
    }

    pub fn vertices(&self) -> Option<&Arc<BufferData>> {
        self.vertices.as_ref()
    }

    pub fn indices(&self) -> Option<&Arc<BufferData>> {
        self.indices.as_ref()
    }
}
