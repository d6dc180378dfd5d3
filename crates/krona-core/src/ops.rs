//! Tensor operations.
//!
//! All ops return new tensors unless suffixed with `_`, which marks the
//! in-place variants (e.g. `add_`, `mul_scalar_`).

pub mod arithmetic;
pub mod manipulation;
