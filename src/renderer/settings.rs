//! Renderer Settings
//!
//! Tunables for atom binning and transparency banding.
//!
//! ```rust,ignore
//! use aster::renderer::{RendererSettings, SlicePolicy};
//!
//! let settings = RendererSettings {
//!     band_depth: 20.0,
//!     ..Default::default()
//! };
//! let bin = RenderAtomBin::with_settings(&settings);
//! ```

/// Default starting capacity of a bin.
pub const DEFAULT_BIN_CAPACITY: usize = 10;

/// Fixed growth step of a bin's backing storage.
pub const DEFAULT_INCREMENT: usize = 10;

/// Nominal depth of one transparency band, in world units.
pub const BAND_DEPTH: f32 = 10.0;

/// How finely a transparency band is sliced.
///
/// Bands far from the camera get one slice; near bands are sliced finer
/// when few atoms occupy them. Visual quality only, not correctness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlicePolicy {
    /// Bands starting further than this use a single slice.
    pub far_distance: f32,
    /// Bands starting further than this use two slices.
    pub mid_distance: f32,
    /// Near bands with more atoms than this use a single slice.
    pub dense_count: usize,
    /// Near bands with more atoms than this use two slices, otherwise four.
    pub sparse_count: usize,
}

impl Default for SlicePolicy {
    fn default() -> Self {
        Self {
            far_distance: 50.0,
            mid_distance: 15.0,
            dense_count: 5,
            sparse_count: 2,
        }
    }
}

impl SlicePolicy {
    /// Depth of one slice of a band spanning `[znear, zfar]` that holds
    /// `count` atoms.
    #[must_use]
    pub fn slice_depth(&self, znear: f32, zfar: f32, count: usize) -> f32 {
        let depth = zfar - znear;
        if znear > self.far_distance {
            depth
        } else if znear > self.mid_distance {
            depth / 2.0
        } else if count > self.dense_count {
            depth
        } else if count > self.sparse_count {
            depth / 2.0
        } else {
            depth / 4.0
        }
    }
}

/// Binning configuration shared by every pass of a manager.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererSettings {
    pub bin_capacity: usize,
    pub bin_increment: usize,
    pub band_depth: f32,
    pub slice_policy: SlicePolicy,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            bin_capacity: DEFAULT_BIN_CAPACITY,
            bin_increment: DEFAULT_INCREMENT,
            band_depth: BAND_DEPTH,
            slice_policy: SlicePolicy::default(),
        }
    }
}

impl RendererSettings {
    #[must_use]
    pub fn with_bin_capacity(mut self, capacity: usize) -> Self {
        self.bin_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_bin_increment(mut self, increment: usize) -> Self {
        self.bin_increment = increment.max(1);
        self
    }

    #[must_use]
    pub fn with_band_depth(mut self, depth: f32) -> Self {
        self.band_depth = depth;
        self
    }

    #[must_use]
    pub fn with_slice_policy(mut self, policy: SlicePolicy) -> Self {
        self.slice_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_depth_thresholds() {
        let p = SlicePolicy::default();
        assert_eq!(p.slice_depth(60.0, 70.0, 1), 10.0);
        assert_eq!(p.slice_depth(20.0, 30.0, 1), 5.0);
        assert_eq!(p.slice_depth(1.0, 11.0, 6), 10.0);
        assert_eq!(p.slice_depth(1.0, 11.0, 3), 5.0);
        assert_eq!(p.slice_depth(1.0, 11.0, 2), 2.5);
    }
}
