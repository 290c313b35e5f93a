//! Zero-copy tensor descriptors over batched field memory.
//!
//! A [`TensorView`] names a region of a manager's batched memory together
//! with its element type, shape and placement. It never owns or copies the
//! data: the view borrows from the manager, so it cannot outlive it and
//! cannot be held across a `step()`.

use smallvec::SmallVec;
use std::fmt;

/// Tensor shape, outermost dimension first. The first dimension is always
/// the world count.
pub type Shape = SmallVec<[usize; 4]>;

/// Element type of an exported buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// 32-bit signed integer.
    Int32,
    /// 8-bit unsigned integer (used for 0/1 flags).
    UInt8,
    /// 32-bit IEEE float.
    Float32,
}

impl ElementType {
    /// Size of one element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            Self::Int32 | Self::Float32 => 4,
            Self::UInt8 => 1,
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int32 => "int32",
            Self::UInt8 => "uint8",
            Self::Float32 => "float32",
        };
        f.write_str(name)
    }
}

/// Where the viewed memory lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Placement {
    /// Host memory owned by the host-threaded backend.
    Host,
    /// Memory owned by a device context.
    ///
    /// The bundled software device keeps its buffers in ordinary host
    /// memory, so [`TensorView::as_ptr`] and the typed accessors are
    /// readable from the host for this placement too. The tag records
    /// which backend owns the buffers, not which address space they are in.
    Device {
        /// Device ordinal.
        ordinal: i32,
    },
}

/// Borrowed, typed element data of a view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TensorData<'a> {
    /// int32 elements.
    I32(&'a [i32]),
    /// uint8 elements.
    U8(&'a [u8]),
    /// float32 elements.
    F32(&'a [f32]),
}

impl TensorData<'_> {
    /// Element type of the borrowed data.
    pub fn element_type(&self) -> ElementType {
        match self {
            Self::I32(_) => ElementType::Int32,
            Self::U8(_) => ElementType::UInt8,
            Self::F32(_) => ElementType::Float32,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::I32(s) => s.len(),
            Self::U8(s) => s.len(),
            Self::F32(s) => s.len(),
        }
    }

    /// Whether there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A non-owning view of one batched field.
#[derive(Clone, Debug, PartialEq)]
pub struct TensorView<'a> {
    name: &'static str,
    data: TensorData<'a>,
    shape: Shape,
    placement: Placement,
}

impl<'a> TensorView<'a> {
    /// Describe `data` as a tensor of `shape`.
    ///
    /// The product of `shape` must equal the element count of `data`.
    pub fn new(name: &'static str, data: TensorData<'a>, shape: Shape, placement: Placement) -> Self {
        debug_assert_eq!(
            shape.iter().product::<usize>(),
            data.len(),
            "shape {shape:?} does not cover {} elements of {name}",
            data.len()
        );
        Self {
            name,
            data,
            shape,
            placement,
        }
    }

    /// Export name (e.g. `"reward"`).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Element type.
    pub fn element_type(&self) -> ElementType {
        self.data.element_type()
    }

    /// Shape, world dimension first.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Size of the leading (world) dimension.
    pub fn world_dim(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    /// Memory placement.
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Total element count.
    pub fn num_elements(&self) -> usize {
        self.data.len()
    }

    /// Total size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.num_elements() * self.element_type().size_bytes()
    }

    /// Address of the first element, for binding layers that wrap the
    /// memory without copying. Valid only while the view is alive.
    pub fn as_ptr(&self) -> *const u8 {
        match self.data {
            TensorData::I32(s) => s.as_ptr().cast(),
            TensorData::U8(s) => s.as_ptr(),
            TensorData::F32(s) => s.as_ptr().cast(),
        }
    }

    /// The borrowed data.
    pub fn data(&self) -> TensorData<'a> {
        self.data
    }

    /// The data as int32 elements, if that is the element type.
    pub fn as_i32(&self) -> Option<&'a [i32]> {
        match self.data {
            TensorData::I32(s) => Some(s),
            _ => None,
        }
    }

    /// The data as uint8 elements, if that is the element type.
    pub fn as_u8(&self) -> Option<&'a [u8]> {
        match self.data {
            TensorData::U8(s) => Some(s),
            _ => None,
        }
    }

    /// The data as float32 elements, if that is the element type.
    pub fn as_f32(&self) -> Option<&'a [f32]> {
        match self.data {
            TensorData::F32(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn view_reports_layout() {
        let data = vec![1.0f32; 12];
        let view = TensorView::new(
            "lidar",
            TensorData::F32(&data),
            smallvec![2, 2, 3],
            Placement::Host,
        );
        assert_eq!(view.name(), "lidar");
        assert_eq!(view.element_type(), ElementType::Float32);
        assert_eq!(view.shape(), &[2, 2, 3]);
        assert_eq!(view.world_dim(), 2);
        assert_eq!(view.num_elements(), 12);
        assert_eq!(view.size_bytes(), 48);
        assert_eq!(view.as_ptr(), data.as_ptr().cast::<u8>());
        assert!(view.as_i32().is_none());
        assert_eq!(view.as_f32(), Some(&data[..]));
    }

    #[test]
    fn device_views_read_like_host_views() {
        let reward = vec![0.5f32, -1.0];
        let host = TensorView::new("reward", TensorData::F32(&reward), smallvec![2, 1], Placement::Host);
        let device = TensorView::new(
            "reward",
            TensorData::F32(&reward),
            smallvec![2, 1],
            Placement::Device { ordinal: 0 },
        );
        assert_ne!(host.placement(), device.placement());
        assert_eq!(device.as_ptr(), host.as_ptr());
        assert_eq!(device.as_f32(), Some(&reward[..]));
    }

    #[test]
    fn flag_views_are_one_byte_elements() {
        let done = vec![0u8, 1, 0];
        let view = TensorView::new(
            "done",
            TensorData::U8(&done),
            smallvec![3, 1],
            Placement::Device { ordinal: 0 },
        );
        assert_eq!(view.size_bytes(), 3);
        assert_eq!(view.placement(), Placement::Device { ordinal: 0 });
        assert_eq!(view.element_type().to_string(), "uint8");
    }
}
