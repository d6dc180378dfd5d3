//! # krona-core
//!
//! Dense tensor runtime for the krona K-FAC library.
//!
//! Provides the foundational `Tensor` type with:
//! - F32 compute with F64 storage for accumulator headroom
//! - Zero-copy views (reshape, transpose share storage)
//! - Copy-on-write in-place mutation
//! - Elementwise, matrix-multiply, and concatenation ops

pub mod dtype;
pub mod error;
pub mod ops;
pub mod prelude;
pub mod shape;
pub mod storage;
pub mod tensor;

pub use dtype::DType;
pub use error::KronaError;
pub use shape::Shape;
pub use storage::Storage;
pub use tensor::Tensor;

pub type Result<T> = std::result::Result<T, KronaError>;
