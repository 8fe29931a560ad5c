//! Driver Backend Interface
//!
//! [`ContextBackend`] is the seam between the render core and a concrete
//! graphics driver. The core never issues driver calls itself: it tracks
//! which state is active, decides what to apply or restore, validates
//! transfers, and forwards the result here.
//!
//! Implementations are expected to be cheap to call repeatedly; the core
//! already filters redundant state applications.

use bitflags::bitflags;
use glam::Affine3A;

use crate::errors::Result;
use crate::renderer::pass::PassTarget;
use crate::resources::{Block, BufferArray, CubeFace, Geometry, Slice, Texture, TextureFormat, TextureType};
use crate::scene::{Plane, View, Viewport};
use crate::state::{StateAtom, StateUnit};

bitflags! {
    /// Buffers cleared at the start of a pass.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// Operations a graphics driver provides to a [`RenderContext`].
///
/// [`RenderContext`]: crate::renderer::context::RenderContext
pub trait ContextBackend: Send {
    // ─── Transforms & Viewport ─────────────────────────────────────────────

    fn set_projection_view(&mut self, view: &View);

    fn set_viewport(&mut self, viewport: Viewport);

    fn push_model_transform(&mut self, transform: &Affine3A);

    fn pop_model_transform(&mut self);

    // ─── Drawing ───────────────────────────────────────────────────────────

    fn render_geometry(&mut self, geometry: &Geometry);

    /// Plane in world space; index 0 and 1 are used by transparency banding.
    fn set_user_clip_plane(&mut self, plane: Plane, index: usize);

    fn enable_user_clip_plane(&mut self, index: usize);

    fn disable_user_clip_plane(&mut self, index: usize);

    fn clear_buffers(&mut self, flags: ClearFlags, color: [f32; 4], depth: f32, stencil: i32);

    // ─── State ─────────────────────────────────────────────────────────────

    /// Makes `atom` the driver state of its axis on `unit`.
    fn apply_state(&mut self, atom: &StateAtom, unit: StateUnit);

    /// Returns the axis on `unit` to its driver default.
    fn restore_state(&mut self, atom: &StateAtom, unit: StateUnit);

    // ─── Surface ───────────────────────────────────────────────────────────

    fn context_width(&self) -> u32;

    fn context_height(&self) -> u32;

    fn aux_buffer_count(&self) -> u32 {
        0
    }

    fn max_draw_buffers(&self) -> u32 {
        1
    }

    /// Binds the target a pass renders into.
    fn prepare_pass(&mut self, _target: &PassTarget) -> Result<()> {
        Ok(())
    }

    /// Resolves / unbinds the target after a pass.
    fn finish_pass(&mut self, _target: &PassTarget) -> Result<()> {
        Ok(())
    }

    fn make_current(&mut self) -> Result<()>;

    /// Presents the finished frame.
    fn swap_buffers(&mut self) -> Result<()>;

    fn is_current(&self) -> bool;

    fn is_initialized(&self) -> bool;

    fn destroy_context(&mut self);

    // ─── Texture Transfers (pre-validated) ─────────────────────────────────

    /// Texture is already bound to unit 0.
    fn set_texture_data(
        &mut self,
        texture: &Texture,
        region: Block,
        face: Option<CubeFace>,
        level: usize,
        data: &BufferArray,
        slice: Slice,
    );

    /// Texture is already bound to unit 0.
    fn get_texture_data(
        &mut self,
        texture: &Texture,
        face: Option<CubeFace>,
        level: usize,
        out: &mut BufferArray,
        slice: Slice,
    );

    /// Copies framebuffer pixels starting at `(sx, sy)` into `region`.
    fn copy_texture_data(
        &mut self,
        texture: &Texture,
        region: Block,
        face: Option<CubeFace>,
        level: usize,
        sx: i32,
        sy: i32,
    );

    fn read_pixels(
        &mut self,
        out: &mut BufferArray,
        slice: Slice,
        ty: TextureType,
        format: TextureFormat,
        region: Block,
    );
}
