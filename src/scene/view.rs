use glam::{Affine3A, Mat4, Vec3, Vec4};

use super::Aabb;

/// Fractions of the context surface a view renders into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            left: 0.0,
            right: 1.0,
            top: 1.0,
            bottom: 0.0,
        }
    }
}

impl Viewport {
    /// Pixel size of this viewport on a surface of the given size.
    pub fn pixel_size(&self, width: u32, height: u32) -> (u32, u32) {
        let w = ((self.right - self.left) * width as f32).round().max(0.0);
        let h = ((self.top - self.bottom) * height as f32).round().max(0.0);
        (w as u32, h as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective { fov: f32, aspect: f32 },
    Orthographic { size: f32, aspect: f32 },
}

/// A camera: world transform, projection and viewport, plus the matrices
/// derived from them by [`View::update_view`].
#[derive(Debug, Clone)]
pub struct View {
    projection: Projection,
    near: f32,
    far: f32,
    viewport: Viewport,
    world_transform: Affine3A,

    view_matrix: Mat4,
    projection_matrix: Mat4,
    view_projection_matrix: Mat4,
    frustum: Frustum,
}

impl View {
    /// `fov` is in degrees.
    #[must_use]
    pub fn new_perspective(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::with_projection(
            Projection::Perspective {
                fov: fov.to_radians(),
                aspect,
            },
            near,
            far,
        )
    }

    #[must_use]
    pub fn new_orthographic(size: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self::with_projection(Projection::Orthographic { size, aspect }, near, far)
    }

    fn with_projection(projection: Projection, near: f32, far: f32) -> Self {
        let mut view = Self {
            projection,
            near,
            far,
            viewport: Viewport::default(),
            world_transform: Affine3A::IDENTITY,
            view_matrix: Mat4::IDENTITY,
            projection_matrix: Mat4::IDENTITY,
            view_projection_matrix: Mat4::IDENTITY,
            frustum: Frustum::default(),
        };
        view.update_view();
        view
    }

    /// Recomputes view, projection and frustum from the current settings.
    pub fn update_view(&mut self) {
        self.projection_matrix = match self.projection {
            Projection::Perspective { fov, aspect } => {
                Mat4::perspective_rh_gl(fov, aspect, self.near, self.far)
            }
            Projection::Orthographic { size, aspect } => {
                let w = size * aspect;
                Mat4::orthographic_rh_gl(-w, w, -size, size, self.near, self.far)
            }
        };
        self.view_matrix = Mat4::from(self.world_transform).inverse();
        self.view_projection_matrix = self.projection_matrix * self.view_matrix;
        self.frustum = Frustum::from_matrix(self.view_projection_matrix);
    }

    pub fn set_world_transform(&mut self, transform: Affine3A) {
        self.world_transform = transform;
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn set_frustum_depth(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
    }

    pub fn world_transform(&self) -> &Affine3A {
        &self.world_transform
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn frustum_near(&self) -> f32 {
        self.near
    }

    pub fn frustum_far(&self) -> f32 {
        self.far
    }

    /// World-space viewing direction (the local -Z axis).
    pub fn direction(&self) -> Vec3 {
        (-Vec3::from(self.world_transform.matrix3.z_axis)).normalize_or_zero()
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from(self.world_transform.translation)
    }

    pub fn view_matrix(&self) -> &Mat4 {
        &self.view_matrix
    }

    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection_matrix
    }

    pub fn view_projection_matrix(&self) -> &Mat4 {
        &self.view_projection_matrix
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }
}

/// Six clip planes extracted from a view-projection matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct Frustum {
    planes: [Vec4; 6], // Left, Right, Bottom, Top, Near, Far
}

impl Frustum {
    /// Gribb-Hartmann extraction for a GL-style [-1, 1] depth range.
    pub fn from_matrix(m: Mat4) -> Self {
        let rows = [m.row(0), m.row(1), m.row(2), m.row(3)];

        let mut planes = [
            rows[3] + rows[0],
            rows[3] - rows[0],
            rows[3] + rows[1],
            rows[3] - rows[1],
            rows[3] + rows[2],
            rows[3] - rows[2],
        ];

        for plane in &mut planes {
            let length = Vec3::new(plane.x, plane.y, plane.z).length();
            if length > 0.0 {
                *plane /= length;
            }
        }

        Self { planes }
    }

    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.truncate().dot(center) + plane.w >= -radius)
    }

    /// Conservative box test: rejects only boxes fully behind one plane.
    pub fn intersects_box(&self, bounds: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            let normal = plane.truncate();
            let corner = bounds.furthest_extent(normal);
            normal.dot(corner) + plane.w >= 0.0
        })
    }
}
