use glam::{Affine3A, Vec3, Vec4};

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    #[must_use]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    #[must_use]
    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Grows this box so it also contains `other`.
    pub fn enclose(&mut self, other: &Aabb) {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    pub fn transform(&self, matrix: &Affine3A) -> Self {
        let corners = [
            Vec3::new(self.min.x, self.min.y, self.min.z),
            Vec3::new(self.min.x, self.min.y, self.max.z),
            Vec3::new(self.min.x, self.max.y, self.min.z),
            Vec3::new(self.min.x, self.max.y, self.max.z),
            Vec3::new(self.max.x, self.min.y, self.min.z),
            Vec3::new(self.max.x, self.min.y, self.max.z),
            Vec3::new(self.max.x, self.max.y, self.min.z),
            Vec3::new(self.max.x, self.max.y, self.max.z),
        ];

        let mut new_min = Vec3::splat(f32::INFINITY);
        let mut new_max = Vec3::splat(f32::NEG_INFINITY);
        for point in corners {
            let transformed = matrix.transform_point3(point);
            new_min = new_min.min(transformed);
            new_max = new_max.max(transformed);
        }

        Self {
            min: new_min,
            max: new_max,
        }
    }

    /// Corner reaching furthest along `dir`.
    pub fn furthest_extent(&self, dir: Vec3) -> Vec3 {
        Vec3::select(dir.cmpge(Vec3::ZERO), self.max, self.min)
    }

    /// Corner reaching least far along `dir`.
    pub fn closest_extent(&self, dir: Vec3) -> Vec3 {
        Vec3::select(dir.cmpge(Vec3::ZERO), self.min, self.max)
    }
}

/// Plane `normal · p + d = 0`; points with a positive distance are kept by
/// a user clip plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub d: f32,
}

impl Plane {
    #[must_use]
    pub fn new(normal: Vec3, d: f32) -> Self {
        Self { normal, d }
    }

    pub fn distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.d
    }

    /// Moves a plane expressed in a local frame into the frame described
    /// by `transform`. The transform is assumed rigid.
    pub fn transform(&self, transform: &Affine3A) -> Self {
        let normal = transform.matrix3 * glam::Vec3A::from(self.normal);
        let normal = Vec3::from(normal);
        let translation = Vec3::from(transform.translation);
        Self {
            normal,
            d: self.d - normal.dot(translation),
        }
    }

    pub fn to_vec4(&self) -> Vec4 {
        self.normal.extend(self.d)
    }
}
