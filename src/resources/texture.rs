use std::any::Any;

use parking_lot::RwLock;

use super::{BufferArray, Resource, ResourceId, ResourceKind, UpdatePolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    Texture2d,
    Texture3d,
    CubeMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

/// Pixel element type of texture data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureType {
    Float,
    UnsignedByte,
    UnsignedShort,
    UnsignedInt,
    PackedInt8888,
    PackedShort4444,
    PackedShort5551,
    PackedShort565,
}

impl TextureType {
    #[must_use]
    pub const fn is_packed(self) -> bool {
        matches!(
            self,
            TextureType::PackedInt8888
                | TextureType::PackedShort4444
                | TextureType::PackedShort5551
                | TextureType::PackedShort565
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba,
    Bgra,
    Rgb,
    Bgr,
    LuminanceAlpha,
    Luminance,
    Alpha,
    Depth,
    Dxt1,
    Dxt3,
    Dxt5,
}

impl TextureFormat {
    #[must_use]
    pub const fn components(self) -> usize {
        match self {
            TextureFormat::Rgba | TextureFormat::Bgra => 4,
            TextureFormat::Rgb | TextureFormat::Bgr => 3,
            TextureFormat::LuminanceAlpha => 2,
            TextureFormat::Luminance
            | TextureFormat::Alpha
            | TextureFormat::Depth
            | TextureFormat::Dxt1
            | TextureFormat::Dxt3
            | TextureFormat::Dxt5 => 1,
        }
    }

    #[must_use]
    pub const fn is_compressed(self) -> bool {
        matches!(self, TextureFormat::Dxt1 | TextureFormat::Dxt3 | TextureFormat::Dxt5)
    }

    #[must_use]
    pub fn is_type_compatible(self, ty: TextureType) -> bool {
        if self.is_compressed() {
            return ty == TextureType::UnsignedByte;
        }
        match ty {
            TextureType::PackedInt8888
            | TextureType::PackedShort4444
            | TextureType::PackedShort5551 => {
                matches!(self, TextureFormat::Rgba | TextureFormat::Bgra)
            }
            TextureType::PackedShort565 => matches!(self, TextureFormat::Rgb | TextureFormat::Bgr),
            _ => true,
        }
    }

    /// Elements a buffer must hold for an image of the given size.
    #[must_use]
    pub fn buffer_size(self, ty: TextureType, width: usize, height: usize, depth: usize) -> usize {
        match self {
            TextureFormat::Dxt1 => width.div_ceil(4) * height.div_ceil(4) * depth * 8,
            TextureFormat::Dxt3 | TextureFormat::Dxt5 => {
                width.div_ceil(4) * height.div_ceil(4) * depth * 16
            }
            _ if ty.is_packed() => width * height * depth,
            _ => self.components() * width * height * depth,
        }
    }
}

/// A texel region: offsets and extents. Signed so bad input is reportable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Block {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub width: i32,
    pub height: i32,
    pub depth: i32,
}

impl Block {
    #[must_use]
    pub fn new_2d(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            z: 0,
            width,
            height,
            depth: 1,
        }
    }
}

/// A window of a buffer, in elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slice {
    pub offset: usize,
    pub length: usize,
}

impl Slice {
    #[must_use]
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }
}

/// Texture image descriptor and client data, one array per mipmap level.
#[derive(Debug)]
pub struct Texture {
    id: ResourceId,
    target: TextureTarget,
    format: TextureFormat,
    data_type: TextureType,
    width: usize,
    height: usize,
    depth: usize,
    mipmaps: RwLock<Vec<Option<BufferArray>>>,
    policy: UpdatePolicy,
}

impl Texture {
    #[must_use]
    pub fn new_2d(
        format: TextureFormat,
        data_type: TextureType,
        width: usize,
        height: usize,
        mipmap_count: usize,
    ) -> Self {
        Self::new(TextureTarget::Texture2d, format, data_type, width, height, 1, mipmap_count)
    }

    #[must_use]
    pub fn new_3d(
        format: TextureFormat,
        data_type: TextureType,
        width: usize,
        height: usize,
        depth: usize,
        mipmap_count: usize,
    ) -> Self {
        Self::new(TextureTarget::Texture3d, format, data_type, width, height, depth, mipmap_count)
    }

    #[must_use]
    pub fn new_cube(
        format: TextureFormat,
        data_type: TextureType,
        side: usize,
        mipmap_count: usize,
    ) -> Self {
        Self::new(TextureTarget::CubeMap, format, data_type, side, side, 1, mipmap_count)
    }

    fn new(
        target: TextureTarget,
        format: TextureFormat,
        data_type: TextureType,
        width: usize,
        height: usize,
        depth: usize,
        mipmap_count: usize,
    ) -> Self {
        Self {
            id: ResourceId::next(),
            target,
            format,
            data_type,
            width,
            height,
            depth,
            mipmaps: RwLock::new(vec![None; mipmap_count.max(1)]),
            policy: UpdatePolicy::OnDemand,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: UpdatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn target(&self) -> TextureTarget {
        self.target
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn data_type(&self) -> TextureType {
        self.data_type
    }

    pub fn mipmap_count(&self) -> usize {
        self.mipmaps.read().len()
    }

    /// `(width, height, depth)` of a mipmap level.
    pub fn level_size(&self, level: usize) -> (usize, usize, usize) {
        let shrink = |v: usize| (v >> level).max(1);
        match self.target {
            TextureTarget::Texture3d => (shrink(self.width), shrink(self.height), shrink(self.depth)),
            TextureTarget::Texture2d | TextureTarget::CubeMap => {
                (shrink(self.width), shrink(self.height), 1)
            }
        }
    }

    /// Replaces the client data of one level.
    pub fn set_level_data(&self, level: usize, data: Option<BufferArray>) {
        let mut mipmaps = self.mipmaps.write();
        if let Some(slot) = mipmaps.get_mut(level) {
            *slot = data;
        }
    }

    pub fn level_data(&self, level: usize) -> Option<BufferArray> {
        self.mipmaps.read().get(level).cloned().flatten()
    }
}

impl Resource for Texture {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Texture
    }

    fn update_policy(&self) -> UpdatePolicy {
        self.policy
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
