//! Convenience re-exports for common krona-core types.
//!
//! ```rust
//! use krona_core::prelude::*;
//! ```

pub use crate::DType;
pub use crate::KronaError;
pub use crate::Result;
pub use crate::Shape;
pub use crate::Tensor;
