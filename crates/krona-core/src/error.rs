use crate::dtype::DType;

/// Errors surfaced by tensor construction and ops.
#[derive(Debug, thiserror::Error)]
pub enum KronaError {
    /// An input tensor's rank or dimensions are wrong for the operation.
    /// The message carries the offending shape(s).
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// Two tensors were expected to agree in shape and did not.
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    /// Inner dimensions of a matrix product disagree.
    #[error("cannot multiply [{m}, {k1}] by [{k2}, {n}]: inner dims differ")]
    MatmulDimMismatch {
        m: usize,
        k1: usize,
        k2: usize,
        n: usize,
    },

    /// The op kernel does not support this dtype.
    #[error("unsupported dtype {0}")]
    UnsupportedDType(DType),

    /// Binary op received operands of different dtypes.
    #[error("dtype mismatch: expected {expected}, got {got}")]
    DTypeMismatch { expected: DType, got: DType },

    /// Reshape target is incompatible with the element count.
    #[error("cannot reshape tensor of {numel} elements to {shape:?}")]
    InvalidReshape { numel: usize, shape: Vec<usize> },

    /// Axis index out of range for the tensor's rank.
    #[error("axis {axis} out of range for {ndim}-dimensional tensor")]
    InvalidAxis { axis: usize, ndim: usize },

    /// Storage-level or otherwise uncategorized failure.
    #[error("{0}")]
    Op(String),
}
