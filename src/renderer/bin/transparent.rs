//! Transparent replay.
//!
//! Blended atoms cannot be state-sorted freely: they have to composite back
//! to front. The strategy approximates that without per-atom depth sorting:
//!
//! 1. An opaque pre-pass with alpha test on and blending masked lays down
//!    depth for the fully opaque texels.
//! 2. The depth range the atoms occupy is cut into bands, far to near.
//!    Each band is sliced further depending on its distance and crowding.
//! 3. For every slice, clip planes 0 and 1 bound the slice and the atoms of
//!    its band are drawn blended, back faces first, then front faces.
//!
//! Clip planes 0 and 1 belong to this strategy while it runs.

use std::sync::Arc;

use glam::Vec3;

use super::{BinAtoms, BinStrategy, DefaultStates, render_opaque};
use crate::errors::Result;
use crate::renderer::atom::RenderAtom;
use crate::renderer::context::RenderContext;
use crate::renderer::policy::StatePolicy;
use crate::renderer::settings::SlicePolicy;
use crate::scene::{Aabb, Plane, View};
use crate::state::{
    AlphaState, BlendState, DrawFace, FragmentTest, StateAtom, StateType, StateUnit, ZBufferState,
};

/// A depth bucket of the transparent bin, in view-direction distance.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    indices: Vec<usize>,
    znear: f32,
    zfar: f32,
}

impl Band {
    /// Indices of the atoms overlapping this band.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    #[must_use]
    pub fn znear(&self) -> f32 {
        self.znear
    }

    #[must_use]
    pub fn zfar(&self) -> f32 {
        self.zfar
    }
}

/// Cuts `[znear, zfar]` into bands of nominal `depth`, far to near.
///
/// Bands are contiguous: each band's far bound is the previous band's near
/// bound, the first starts at `zfar` and the last ends exactly at `znear`.
#[must_use]
pub fn band_partition(znear: f32, zfar: f32, depth: f32) -> Vec<Band> {
    if zfar <= znear {
        return Vec::new();
    }
    let count = if depth > 0.0 {
        ((zfar - znear) / depth).ceil().max(1.0) as usize
    } else {
        1
    };

    let mut bands = Vec::with_capacity(count);
    let mut far = zfar;
    for i in 0..count {
        let near = if i + 1 == count {
            znear
        } else {
            (zfar - (i + 1) as f32 * depth).max(znear)
        };
        bands.push(Band {
            indices: Vec::new(),
            znear: near,
            zfar: far,
        });
        far = near;
    }
    bands
}

/// Replay strategy for blended atoms.
#[derive(Debug)]
pub struct TransparentStrategy {
    drawn_region: Option<Aabb>,
    bands: Vec<Band>,
    band_depth: f32,
    slice_policy: SlicePolicy,
}

impl TransparentStrategy {
    #[must_use]
    pub fn new(band_depth: f32, slice_policy: SlicePolicy) -> Self {
        Self {
            drawn_region: None,
            bands: Vec::new(),
            band_depth,
            slice_policy,
        }
    }

    /// World region covered by the atoms added this frame.
    #[must_use]
    pub fn drawn_region(&self) -> Option<&Aabb> {
        self.drawn_region.as_ref()
    }

    /// Bands built by the last render.
    #[must_use]
    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Index of the band holding distance `d`, assuming `d` lies inside
    /// the banded range.
    fn band_index(&self, d: f32, zfar: f32) -> usize {
        let last = self.bands.len() - 1;
        let mut index = if self.band_depth > 0.0 {
            (((zfar - d) / self.band_depth) as usize).min(last)
        } else {
            0
        };
        while index > 0 && self.bands[index].zfar < d {
            index -= 1;
        }
        while index < last && self.bands[index].znear > d {
            index += 1;
        }
        index
    }

    fn assign_bands(&mut self, atoms: &BinAtoms<'_>, dir: Vec3, pos: Vec3, znear: f32, zfar: f32) {
        for (i, atom) in atoms.iter().enumerate() {
            let Some(geometry) = atom.geometry() else { continue };
            let bounds = geometry.bounds().transform(atom.spatial_link().world_transform());

            let far = dir.dot(bounds.furthest_extent(dir) - pos);
            let near = dir.dot(bounds.closest_extent(dir) - pos);
            if far < znear || near > zfar {
                continue;
            }

            let far_index = self.band_index(far.clamp(znear, zfar), zfar);
            let near_index = self.band_index(near.clamp(znear, zfar), zfar);
            for band in &mut self.bands[far_index..=near_index] {
                band.indices.push(i);
            }
        }
    }

    /// Draws the atoms of `band` with only `face` rasterised.
    fn render_side(
        band: &Band,
        face: DrawFace,
        atoms: &BinAtoms<'_>,
        ctx: &mut RenderContext,
        policy: &StatePolicy,
        defaults: &DefaultStates,
    ) -> Result<()> {
        let draw = defaults
            .draw
            .with_draw_face(face)
            .map_or_else(|| Arc::clone(&defaults.draw), Arc::new);
        let draw_masked = policy.is_masked(StateType::DrawMode);
        if !draw_masked {
            policy.apply_state(ctx, &draw, StateUnit::Null)?;
        }

        let mut prev: Option<RenderAtom> = None;
        for &index in &band.indices {
            let Some(atom) = atoms.get(index) else { continue };
            if !policy.accepts(atom) {
                continue;
            }
            let curr = match atom.draw_face() {
                Some(DrawFace::FrontAndBack) => atom.pinned_to(face),
                Some(own) if own == face.opposite() => continue,
                _ => atom.clone(),
            };
            atoms.render_atom(prev.as_ref(), &curr, ctx, policy)?;
            prev = Some(curr);
        }

        ctx.clear_spatial_states()?;
        RenderAtom::apply_states(prev.as_ref(), None, ctx, policy)?;
        if !draw_masked {
            policy.restore_state(ctx, &draw, StateUnit::Null)?;
        }
        Ok(())
    }
}

impl BinStrategy for TransparentStrategy {
    fn atom_added(&mut self, atom: &RenderAtom) {
        let bounds = atom.spatial_link().world_bounds();
        match self.drawn_region.as_mut() {
            Some(region) => region.enclose(bounds),
            None => self.drawn_region = Some(*bounds),
        }
    }

    fn clear(&mut self) {
        self.drawn_region = None;
        self.bands.clear();
    }

    fn render_all(
        &mut self,
        atoms: &BinAtoms<'_>,
        ctx: &mut RenderContext,
        policy: &mut StatePolicy,
        view: &View,
        defaults: &DefaultStates,
    ) -> Result<()> {
        // Depth pre-pass of the opaque texels.
        let prepass = DefaultStates {
            draw: defaults
                .draw
                .with_draw_face(DrawFace::FrontAndBack)
                .map_or_else(|| Arc::clone(&defaults.draw), Arc::new),
            alpha: Arc::new(StateAtom::Alpha(AlphaState {
                enabled: true,
                ..AlphaState::default()
            })),
            ..defaults.clone()
        };
        let blend_masked = policy.is_masked(StateType::Blend);
        policy.set_masked(StateType::Blend, true);
        let prepass_result = render_opaque(atoms, ctx, policy, &prepass);
        policy.set_masked(StateType::Blend, blend_masked);
        prepass_result?;

        let Some(region) = self.drawn_region else {
            return Ok(());
        };
        let dir = view.direction();
        let pos = view.position();
        let zfar = view.frustum_far().min(dir.dot(region.furthest_extent(dir) - pos));
        let znear = view.frustum_near().max(dir.dot(region.closest_extent(dir) - pos));

        self.bands = band_partition(znear, zfar, self.band_depth);
        if self.bands.is_empty() {
            return Ok(());
        }
        self.assign_bands(atoms, dir, pos, znear, zfar);

        let blended = [
            Arc::new(StateAtom::ZBuffer(ZBufferState::default())),
            Arc::new(StateAtom::Alpha(AlphaState {
                enabled: true,
                test: FragmentTest::Less,
                reference: 1.0,
            })),
            Arc::new(StateAtom::Blend(BlendState::alpha_blended())),
        ];
        let policy: &StatePolicy = policy;
        for atom in &blended {
            if !policy.is_masked(atom.state_type()) {
                policy.apply_state(ctx, atom, StateUnit::Null)?;
            }
        }
        ctx.enable_user_clip_plane(0);
        ctx.enable_user_clip_plane(1);

        let to_world = view.world_transform();
        for band in &self.bands {
            let depth = band.zfar - band.znear;
            let slice = self.slice_policy.slice_depth(band.znear, band.zfar, band.indices.len());
            let slices = if slice > 0.0 {
                (depth / slice).round().max(1.0) as usize
            } else {
                1
            };

            let mut far = band.zfar;
            for s in 0..slices {
                let near = if s + 1 == slices {
                    band.znear
                } else {
                    band.zfar - (s + 1) as f32 * (depth / slices as f32)
                };
                let near_plane = Plane::new(Vec3::NEG_Z, -near).transform(to_world);
                let far_plane = Plane::new(Vec3::Z, far).transform(to_world);
                ctx.set_user_clip_plane(near_plane, 0);
                ctx.set_user_clip_plane(far_plane, 1);

                for face in [DrawFace::Back, DrawFace::Front] {
                    Self::render_side(band, face, atoms, ctx, policy, defaults)?;
                }
                far = near;
            }
        }

        ctx.disable_user_clip_plane(0);
        ctx.disable_user_clip_plane(1);
        for atom in &blended {
            if !policy.is_masked(atom.state_type()) {
                policy.restore_state(ctx, atom, StateUnit::Null)?;
            }
        }
        Ok(())
    }
}
