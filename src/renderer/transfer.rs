//! Texture transfers.
//!
//! Validated entry points for moving texel data between client buffers,
//! textures and the framebuffer. Every precondition is checked before the
//! backend sees the call; the texture is bound to unit 0 for the duration
//! of the transfer and the previously bound texture is put back afterwards.

use std::sync::Arc;

use super::context::RenderContext;
use crate::errors::{AsterError, Result};
use crate::resources::{
    Block, BufferArray, CubeFace, DataType, Slice, Texture, TextureFormat, TextureTarget,
    TextureType,
};
use crate::state::{StateAtom, StateType, StateUnit};

const TRANSFER_UNIT: StateUnit = StateUnit::Numeric(0);

impl RenderContext {
    /// Uploads `slice` of `data` into `region` of mipmap `level`.
    ///
    /// The slice must be exactly as long as the whole level, matching the
    /// texture's element type.
    pub fn set_texture_region(
        &mut self,
        texture: &Arc<Texture>,
        region: Block,
        face: Option<CubeFace>,
        level: usize,
        data: &BufferArray,
        slice: Slice,
    ) -> Result<()> {
        validate_face(texture, face)?;
        validate_type_primitive(texture.data_type(), data.data_type())?;
        validate_mipmap(level, texture.mipmap_count())?;
        let (width, height, depth) = texture.level_size(level);
        validate_region(region, width, height, depth)?;
        let required = texture.format().buffer_size(texture.data_type(), width, height, depth);
        validate_buffer(required, data.len(), slice)?;

        self.with_bound_texture(texture, |ctx| {
            ctx.backend_mut()
                .set_texture_data(texture, region, face, level, data, slice);
        })
    }

    /// Reads mipmap `level` back from the driver into `slice` of `out`.
    pub fn get_texture(
        &mut self,
        texture: &Arc<Texture>,
        face: Option<CubeFace>,
        level: usize,
        out: &mut BufferArray,
        slice: Slice,
    ) -> Result<()> {
        validate_face(texture, face)?;
        validate_type_primitive(texture.data_type(), out.data_type())?;
        validate_mipmap(level, texture.mipmap_count())?;
        let (width, height, depth) = texture.level_size(level);
        let required = texture.format().buffer_size(texture.data_type(), width, height, depth);
        validate_buffer(required, out.len(), slice)?;

        self.with_bound_texture(texture, |ctx| {
            ctx.backend_mut()
                .get_texture_data(texture, face, level, out, slice);
        })
    }

    /// Copies framebuffer pixels starting at `(sx, sy)` into `region` of
    /// mipmap `level`. Only one layer is copied; for 3D textures
    /// `region.z` selects it.
    pub fn copy_frame_pixels(
        &mut self,
        texture: &Arc<Texture>,
        region: Block,
        face: Option<CubeFace>,
        level: usize,
        sx: i32,
        sy: i32,
    ) -> Result<()> {
        if texture.format().is_compressed() {
            return Err(AsterError::InvalidTransfer(
                "frame pixels cannot be copied into compressed textures".into(),
            ));
        }
        validate_face(texture, face)?;
        validate_mipmap(level, texture.mipmap_count())?;
        let (width, height, depth) = texture.level_size(level);
        let layer = Block { depth: 1, ..region };
        validate_region(layer, width, height, depth)?;
        validate_region(
            Block::new_2d(sx, sy, region.width, region.height),
            self.context_width() as usize,
            self.context_height() as usize,
            1,
        )?;

        self.with_bound_texture(texture, |ctx| {
            ctx.backend_mut()
                .copy_texture_data(texture, layer, face, level, sx, sy);
        })
    }

    /// Reads the 2D `region` of the framebuffer into `slice` of `out`,
    /// converted to `ty` and `format`.
    pub fn read_frame_pixels(
        &mut self,
        out: &mut BufferArray,
        slice: Slice,
        ty: TextureType,
        format: TextureFormat,
        region: Block,
    ) -> Result<()> {
        if !format.is_type_compatible(ty) || format.is_compressed() {
            return Err(AsterError::InvalidTransfer(format!(
                "cannot read pixels as {format:?} / {ty:?}"
            )));
        }
        validate_type_primitive(ty, out.data_type())?;
        let region = Block { z: 0, depth: 1, ..region };
        validate_region(
            region,
            self.context_width() as usize,
            self.context_height() as usize,
            1,
        )?;
        let required = format.buffer_size(ty, region.width as usize, region.height as usize, 1);
        validate_buffer(required, out.len(), slice)?;

        self.backend_mut().read_pixels(out, slice, ty, format, region);
        Ok(())
    }

    /// Binds `texture` to the transfer unit around `f`, then puts back
    /// whatever was bound before.
    fn with_bound_texture(&mut self, texture: &Arc<Texture>, f: impl FnOnce(&mut Self)) -> Result<()> {
        let previous = self.active_state_atom(StateType::Texture, TRANSFER_UNIT).cloned();
        let atom = Arc::new(StateAtom::Texture(Arc::clone(texture)));
        self.apply_state_atom(&atom, TRANSFER_UNIT)?;

        f(self);

        match previous {
            Some(prev) => self.apply_state_atom(&prev, TRANSFER_UNIT),
            None => self.restore_state_atom(&atom, TRANSFER_UNIT),
        }
    }
}

fn validate_face(texture: &Texture, face: Option<CubeFace>) -> Result<()> {
    match (texture.target(), face) {
        (TextureTarget::CubeMap, None) => Err(AsterError::InvalidTransfer(
            "cube map transfers require a face".into(),
        )),
        (TextureTarget::Texture2d | TextureTarget::Texture3d, Some(face)) => Err(
            AsterError::InvalidTransfer(format!("face {face:?} given for a non-cube texture")),
        ),
        _ => Ok(()),
    }
}

pub(crate) fn validate_region(region: Block, width: usize, height: usize, depth: usize) -> Result<()> {
    if region.x < 0 || region.y < 0 || region.z < 0 {
        return Err(AsterError::InvalidTransfer("region must have positive offsets".into()));
    }
    if region.width < 0 || region.height < 0 || region.depth < 0 {
        return Err(AsterError::InvalidTransfer("region must have positive dimensions".into()));
    }
    let fits = |offset: i32, extent: i32, bound: usize| {
        (offset as usize).checked_add(extent as usize).is_some_and(|end| end <= bound)
    };
    if !fits(region.x, region.width, width)
        || !fits(region.y, region.height, height)
        || !fits(region.z, region.depth, depth)
    {
        return Err(AsterError::InvalidTransfer(
            "region extends beyond texture dimensions".into(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_buffer(required: usize, capacity: usize, slice: Slice) -> Result<()> {
    if slice.offset.checked_add(slice.length).is_none_or(|end| end > capacity) {
        return Err(AsterError::InvalidTransfer(format!(
            "slice extends beyond the buffer limits: offset {}, length {}, capacity {capacity}",
            slice.offset, slice.length
        )));
    }
    if slice.length != required {
        return Err(AsterError::InvalidTransfer(format!(
            "buffer slice has the wrong length: provided {}, required {required}",
            slice.length
        )));
    }
    Ok(())
}

pub(crate) fn validate_mipmap(level: usize, provided: usize) -> Result<()> {
    if level >= provided {
        return Err(AsterError::InvalidTransfer(format!(
            "mipmap level {level} out of range (texture has {provided})"
        )));
    }
    Ok(())
}

pub(crate) fn validate_type_primitive(ty: TextureType, data: DataType) -> Result<()> {
    let valid = match data {
        DataType::Float => ty == TextureType::Float,
        DataType::Byte | DataType::UnsignedByte => ty == TextureType::UnsignedByte,
        DataType::Int | DataType::UnsignedInt => {
            matches!(ty, TextureType::UnsignedInt | TextureType::PackedInt8888)
        }
        DataType::Short | DataType::UnsignedShort => matches!(
            ty,
            TextureType::UnsignedShort
                | TextureType::PackedShort4444
                | TextureType::PackedShort5551
                | TextureType::PackedShort565
        ),
        DataType::Double => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AsterError::InvalidTransfer(format!(
            "{data:?} buffers cannot hold {ty:?} texels"
        )))
    }
}
