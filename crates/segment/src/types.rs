use {
    crate::SegmentError,
    base::byte_count,
    std::{borrow::Cow, fmt},
};

/// Tensor element type as reported by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Float64,
    Float32,
    Float16,
    Int64,
    Int32,
    Int16,
    Int8,
    UInt64,
    UInt32,
    UInt16,
    UInt8,
    Bool,
    Complex64,
    /// Runtime type code with no mapping here.
    Other(i32),
}

impl ElementType {
    /// Size of one element in bytes, `None` for unmapped types.
    pub fn size(&self) -> Option<usize> {
        match self {
            ElementType::Float64
            | ElementType::Int64
            | ElementType::UInt64
            | ElementType::Complex64 => Some(8),
            ElementType::Float32 | ElementType::Int32 | ElementType::UInt32 => Some(4),
            ElementType::Float16 | ElementType::Int16 | ElementType::UInt16 => Some(2),
            ElementType::Int8 | ElementType::UInt8 | ElementType::Bool => Some(1),
            ElementType::Other(_) => None,
        }
    }

    /// Whether an image can be normalized into a tensor of this type.
    pub fn is_image_input(&self) -> bool {
        matches!(self, ElementType::Float32 | ElementType::UInt8)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::Float64 => write!(f, "float64"),
            ElementType::Float32 => write!(f, "float32"),
            ElementType::Float16 => write!(f, "float16"),
            ElementType::Int64 => write!(f, "int64"),
            ElementType::Int32 => write!(f, "int32"),
            ElementType::Int16 => write!(f, "int16"),
            ElementType::Int8 => write!(f, "int8"),
            ElementType::UInt64 => write!(f, "uint64"),
            ElementType::UInt32 => write!(f, "uint32"),
            ElementType::UInt16 => write!(f, "uint16"),
            ElementType::UInt8 => write!(f, "uint8"),
            ElementType::Bool => write!(f, "bool"),
            ElementType::Complex64 => write!(f, "complex64"),
            ElementType::Other(code) => write!(f, "type#{code}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizationParams {
    pub scale: f32,
    pub zero_point: i32,
}

/// Metadata of one input or output tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorInfo {
    pub name: String,
    pub shape: Vec<usize>,
    pub element_type: ElementType,
    pub byte_size: usize,
    pub quantization: Option<QuantizationParams>,
}

impl TensorInfo {
    /// `element size * product(shape)`.
    pub fn expected_byte_size(&self) -> Result<usize, SegmentError> {
        let size = self.element_type.size().ok_or_else(|| {
            SegmentError::Allocation(format!(
                "tensor {} has element type {} with unknown size",
                self.name, self.element_type
            ))
        })?;
        byte_count(&self.shape, size)
            .map_err(|e| SegmentError::InvalidShape(format!("tensor {}: {}", self.name, e)))
    }

    /// Checks that the runtime-reported byte size matches the shape.
    pub fn validate(&self) -> Result<(), SegmentError> {
        let expected = self.expected_byte_size()?;
        if expected != self.byte_size {
            return Err(SegmentError::Allocation(format!(
                "tensor {} holds {} bytes, shape {:?} of {} needs {}",
                self.name, self.byte_size, self.shape, self.element_type, expected
            )));
        }
        Ok(())
    }
}

impl fmt::Display for TensorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:?} {} ({} bytes)",
            self.name, self.shape, self.element_type, self.byte_size
        )?;
        if let Some(q) = &self.quantization {
            write!(f, " scale {} zero point {}", q.scale, q.zero_point)?;
        }
        Ok(())
    }
}

/// Tensor slot of an execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SlotId {
    Input(usize),
    Output(usize),
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotId::Input(i) => write!(f, "input {i}"),
            SlotId::Output(i) => write!(f, "output {i}"),
        }
    }
}

/// Per-cell class ids, `width * height` cells in the input tensor's grid.
///
/// Borrowed straight from the output tensor when its storage is aligned for
/// `i32`, copied otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMap<'a> {
    pub width: usize,
    pub height: usize,
    pub classes: Cow<'a, [i32]>,
}

impl<'a> ClassMap<'a> {
    pub fn new(width: usize, height: usize, classes: impl Into<Cow<'a, [i32]>>) -> Self {
        Self {
            width,
            height,
            classes: classes.into(),
        }
    }

    /// Reinterprets native-endian `i32` bytes.
    pub fn from_bytes(width: usize, height: usize, bytes: &'a [u8]) -> Self {
        let classes = match bytemuck::try_cast_slice::<u8, i32>(bytes) {
            Ok(classes) => Cow::Borrowed(classes),
            Err(_) => Cow::Owned(
                bytes
                    .chunks_exact(4)
                    .map(|chunk| i32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                    .collect(),
            ),
        };
        Self {
            width,
            height,
            classes,
        }
    }
}
