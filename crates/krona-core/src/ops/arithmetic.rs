//! Elementwise arithmetic, scalar ops, their in-place variants, and
//! matrix multiplication.

use rayon::prelude::*;

use crate::dtype::DType;
use crate::error::KronaError;
use crate::tensor::Tensor;
use crate::Result;

/// Output element count past which matmul rows go to the rayon pool.
const PAR_THRESHOLD: usize = 8192;

impl Tensor {
    /// Elementwise addition: self + other. Shapes must match exactly.
    pub fn add(&self, other: &Tensor) -> Result<Tensor> {
        binary_op(self, other, |a, b| a + b)
    }

    /// Elementwise multiplication: self * other.
    pub fn mul(&self, other: &Tensor) -> Result<Tensor> {
        binary_op(self, other, |a, b| a * b)
    }

    /// Elementwise division: self / other.
    pub fn div(&self, other: &Tensor) -> Result<Tensor> {
        binary_op(self, other, |a, b| a / b)
    }

    /// Scalar addition: self + scalar.
    pub fn add_scalar(&self, scalar: f32) -> Result<Tensor> {
        unary_op(self, |a| a + scalar)
    }

    /// Scalar multiplication: self * scalar.
    pub fn mul_scalar(&self, scalar: f32) -> Result<Tensor> {
        unary_op(self, |a| a * scalar)
    }

    /// Scalar division: self / scalar.
    pub fn div_scalar(&self, scalar: f32) -> Result<Tensor> {
        unary_op(self, |a| a / scalar)
    }

    /// In-place elementwise addition: self += other.
    ///
    /// The destination must be contiguous; a shared buffer is copied on
    /// write, so sibling views keep their values.
    pub fn add_(&mut self, other: &Tensor) -> Result<()> {
        if self.dtype() != other.dtype() {
            return Err(KronaError::DTypeMismatch {
                expected: self.dtype(),
                got: other.dtype(),
            });
        }
        if self.dtype() != DType::F32 {
            return Err(KronaError::UnsupportedDType(self.dtype()));
        }
        if self.shape() != other.shape() {
            return Err(KronaError::ShapeMismatch {
                expected: self.shape().dims().to_vec(),
                got: other.shape().dims().to_vec(),
            });
        }

        let rhs = other.contiguous();
        let src = rhs.as_f32_slice().expect("contiguous f32 by construction");
        let dst = self
            .as_f32_slice_mut()
            .ok_or_else(|| KronaError::Op("add_: destination must be contiguous".into()))?;
        for (d, s) in dst.iter_mut().zip(src) {
            *d += s;
        }
        Ok(())
    }

    /// In-place scalar multiplication: self *= scalar.
    pub fn mul_scalar_(&mut self, scalar: f32) -> Result<()> {
        if self.dtype() != DType::F32 {
            return Err(KronaError::UnsupportedDType(self.dtype()));
        }
        let dst = self
            .as_f32_slice_mut()
            .ok_or_else(|| KronaError::Op("mul_scalar_: destination must be contiguous".into()))?;
        for v in dst.iter_mut() {
            *v *= scalar;
        }
        Ok(())
    }

    /// Matrix multiplication: [M, K] @ [K, N] → [M, N].
    ///
    /// Rows of the output are computed in parallel once the result is
    /// large enough to amortize the fork.
    pub fn matmul(&self, other: &Tensor) -> Result<Tensor> {
        if self.dtype() != DType::F32 || other.dtype() != DType::F32 {
            let bad = if self.dtype() != DType::F32 {
                self.dtype()
            } else {
                other.dtype()
            };
            return Err(KronaError::UnsupportedDType(bad));
        }
        if self.ndim() != 2 || other.ndim() != 2 {
            return Err(KronaError::InvalidShape(format!(
                "matmul expects 2-dimensional operands, got shapes {} and {}",
                self.shape(),
                other.shape()
            )));
        }

        let a = self.contiguous();
        let b = other.contiguous();
        let (m, k1) = (a.shape().dims()[0], a.shape().dims()[1]);
        let (k2, n) = (b.shape().dims()[0], b.shape().dims()[1]);
        if k1 != k2 {
            return Err(KronaError::MatmulDimMismatch { m, k1, k2, n });
        }

        let a_data = a.as_f32_slice().expect("contiguous f32 by construction");
        let b_data = b.as_f32_slice().expect("contiguous f32 by construction");
        let mut out = vec![0.0f32; m * n];

        let row = |i: usize, dst: &mut [f32]| {
            for j in 0..n {
                let mut acc = 0.0f32;
                for p in 0..k1 {
                    acc += a_data[i * k1 + p] * b_data[p * n + j];
                }
                dst[j] = acc;
            }
        };

        if m * n >= PAR_THRESHOLD {
            out.par_chunks_mut(n)
                .enumerate()
                .for_each(|(i, dst)| row(i, dst));
        } else {
            for (i, dst) in out.chunks_mut(n).enumerate() {
                row(i, dst);
            }
        }

        Ok(Tensor::from_f32(&out, &[m, n]))
    }
}

/// Apply a unary f32 operation elementwise.
fn unary_op(a: &Tensor, op: impl Fn(f32) -> f32) -> Result<Tensor> {
    if a.dtype() != DType::F32 {
        return Err(KronaError::UnsupportedDType(a.dtype()));
    }
    let a = a.contiguous();
    let data = a.as_f32_slice().expect("contiguous f32 by construction");
    let out: Vec<f32> = data.iter().map(|&v| op(v)).collect();
    Ok(Tensor::from_f32(&out, a.shape().dims()))
}

/// Apply a binary f32 operation elementwise. Shapes must match exactly.
fn binary_op(a: &Tensor, b: &Tensor, op: impl Fn(f32, f32) -> f32) -> Result<Tensor> {
    if a.dtype() != b.dtype() {
        return Err(KronaError::DTypeMismatch {
            expected: a.dtype(),
            got: b.dtype(),
        });
    }
    if a.dtype() != DType::F32 {
        return Err(KronaError::UnsupportedDType(a.dtype()));
    }
    if a.shape() != b.shape() {
        return Err(KronaError::ShapeMismatch {
            expected: a.shape().dims().to_vec(),
            got: b.shape().dims().to_vec(),
        });
    }

    let a = a.contiguous();
    let b = b.contiguous();
    let a_data = a.as_f32_slice().expect("contiguous f32 by construction");
    let b_data = b.as_f32_slice().expect("contiguous f32 by construction");
    let out: Vec<f32> = a_data
        .iter()
        .zip(b_data)
        .map(|(&x, &y)| op(x, y))
        .collect();
    Ok(Tensor::from_f32(&out, a.shape().dims()))
}
