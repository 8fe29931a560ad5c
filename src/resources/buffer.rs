use std::any::Any;
use std::ops::Range;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{Resource, ResourceId, ResourceKind, UpdatePolicy};

/// Primitive element type of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Float,
    Double,
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
}

impl DataType {
    #[must_use]
    pub const fn byte_size(self) -> usize {
        match self {
            DataType::Byte | DataType::UnsignedByte => 1,
            DataType::Short | DataType::UnsignedShort => 2,
            DataType::Float | DataType::Int | DataType::UnsignedInt => 4,
            DataType::Double => 8,
        }
    }
}

/// Typed client-side element storage.
#[derive(Debug, Clone, PartialEq)]
pub enum BufferArray {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
}

impl BufferArray {
    /// Zero-filled array of `len` elements of `data_type`.
    #[must_use]
    pub fn zeroed(data_type: DataType, len: usize) -> Self {
        match data_type {
            DataType::Float => BufferArray::F32(vec![0.0; len]),
            DataType::Double => BufferArray::F64(vec![0.0; len]),
            DataType::Byte => BufferArray::I8(vec![0; len]),
            DataType::UnsignedByte => BufferArray::U8(vec![0; len]),
            DataType::Short => BufferArray::I16(vec![0; len]),
            DataType::UnsignedShort => BufferArray::U16(vec![0; len]),
            DataType::Int => BufferArray::I32(vec![0; len]),
            DataType::UnsignedInt => BufferArray::U32(vec![0; len]),
        }
    }

    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            BufferArray::F32(_) => DataType::Float,
            BufferArray::F64(_) => DataType::Double,
            BufferArray::I8(_) => DataType::Byte,
            BufferArray::U8(_) => DataType::UnsignedByte,
            BufferArray::I16(_) => DataType::Short,
            BufferArray::U16(_) => DataType::UnsignedShort,
            BufferArray::I32(_) => DataType::Int,
            BufferArray::U32(_) => DataType::UnsignedInt,
        }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            BufferArray::F32(v) => v.len(),
            BufferArray::F64(v) => v.len(),
            BufferArray::I8(v) => v.len(),
            BufferArray::U8(v) => v.len(),
            BufferArray::I16(v) => v.len(),
            BufferArray::U16(v) => v.len(),
            BufferArray::I32(v) => v.len(),
            BufferArray::U32(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw bytes for a backend upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            BufferArray::F32(v) => bytemuck::cast_slice(v),
            BufferArray::F64(v) => bytemuck::cast_slice(v),
            BufferArray::I8(v) => bytemuck::cast_slice(v),
            BufferArray::U8(v) => v,
            BufferArray::I16(v) => bytemuck::cast_slice(v),
            BufferArray::U16(v) => bytemuck::cast_slice(v),
            BufferArray::I32(v) => bytemuck::cast_slice(v),
            BufferArray::U32(v) => bytemuck::cast_slice(v),
        }
    }

    /// Mutable raw bytes for a backend readback.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self {
            BufferArray::F32(v) => bytemuck::cast_slice_mut(v),
            BufferArray::F64(v) => bytemuck::cast_slice_mut(v),
            BufferArray::I8(v) => bytemuck::cast_slice_mut(v),
            BufferArray::U8(v) => v,
            BufferArray::I16(v) => bytemuck::cast_slice_mut(v),
            BufferArray::U16(v) => bytemuck::cast_slice_mut(v),
            BufferArray::I32(v) => bytemuck::cast_slice_mut(v),
            BufferArray::U32(v) => bytemuck::cast_slice_mut(v),
        }
    }
}

/// Buffer contents plus the change record drivers diff against.
#[derive(Debug)]
pub struct BufferContents {
    array: BufferArray,
    version: u64,
    dirty: Option<Range<usize>>,
}

impl BufferContents {
    pub fn array(&self) -> &BufferArray {
        &self.array
    }

    /// Incremented on every write.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Element range written since the last [`BufferData::take_dirty`].
    pub fn dirty(&self) -> Option<&Range<usize>> {
        self.dirty.as_ref()
    }
}

/// Write guard - bumps the version and widens the dirty range on drop.
pub struct BufferWriteGuard<'a> {
    contents: RwLockWriteGuard<'a, BufferContents>,
    range: Range<usize>,
}

impl std::ops::Deref for BufferWriteGuard<'_> {
    type Target = BufferArray;

    fn deref(&self) -> &Self::Target {
        &self.contents.array
    }
}

impl std::ops::DerefMut for BufferWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.contents.array
    }
}

impl Drop for BufferWriteGuard<'_> {
    fn drop(&mut self) {
        let range = self.range.clone();
        let contents = &mut *self.contents;
        contents.version = contents.version.wrapping_add(1);
        contents.dirty = Some(match contents.dirty.take() {
            Some(prev) => prev.start.min(range.start)..prev.end.max(range.end),
            None => range,
        });
    }
}

/// A vertex, index or pixel buffer resource.
#[derive(Debug)]
pub struct BufferData {
    id: ResourceId,
    policy: UpdatePolicy,
    contents: RwLock<BufferContents>,
}

impl BufferData {
    #[must_use]
    pub fn new(array: BufferArray, policy: UpdatePolicy) -> Self {
        let len = array.len();
        Self {
            id: ResourceId::next(),
            policy,
            contents: RwLock::new(BufferContents {
                array,
                version: 0,
                dirty: Some(0..len),
            }),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, BufferContents> {
        self.contents.read()
    }

    /// Opens the whole buffer for writing.
    pub fn write(&self) -> BufferWriteGuard<'_> {
        let contents = self.contents.write();
        let len = contents.array.len();
        BufferWriteGuard { contents, range: 0..len }
    }

    /// Opens the buffer for writing, recording only `range` as changed.
    pub fn write_range(&self, range: Range<usize>) -> BufferWriteGuard<'_> {
        BufferWriteGuard {
            contents: self.contents.write(),
            range,
        }
    }

    /// Marks everything dirty so the next update re-uploads the buffer.
    pub fn mark_all_dirty(&self) {
        let mut contents = self.contents.write();
        let len = contents.array.len();
        contents.dirty = Some(0..len);
    }

    /// Hands the pending dirty range to a driver.
    pub fn take_dirty(&self) -> Option<Range<usize>> {
        self.contents.write().dirty.take()
    }

    pub fn version(&self) -> u64 {
        self.contents.read().version
    }

    pub fn data_type(&self) -> DataType {
        self.contents.read().array.data_type()
    }

    pub fn capacity(&self) -> usize {
        self.contents.read().array.len()
    }
}

impl Resource for BufferData {
    fn id(&self) -> ResourceId {
        self.id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Buffer
    }

    fn update_policy(&self) -> UpdatePolicy {
        self.policy
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
