//! Tensor assembly: concatenation along an axis.

use crate::error::KronaError;
use crate::tensor::Tensor;
use crate::Result;

impl Tensor {
    /// Concatenate tensors along `axis` (negative counts from the back).
    ///
    /// Inputs must agree in rank and in every dimension other than `axis`.
    pub fn cat(tensors: &[&Tensor], axis: isize) -> Result<Tensor> {
        let first = *tensors
            .first()
            .ok_or_else(|| KronaError::Op("cat: empty tensor list".into()))?;
        let ndim = first.ndim();
        if ndim == 0 {
            return Err(KronaError::Op("cat: cannot concatenate scalars".into()));
        }

        let axis = if axis < 0 {
            let resolved = ndim as isize + axis;
            if resolved < 0 {
                return Err(KronaError::InvalidAxis {
                    axis: axis.unsigned_abs(),
                    ndim,
                });
            }
            resolved as usize
        } else {
            axis as usize
        };
        if axis >= ndim {
            return Err(KronaError::InvalidAxis { axis, ndim });
        }

        for t in &tensors[1..] {
            let agrees = t.ndim() == ndim
                && t.shape()
                    .dims()
                    .iter()
                    .zip(first.shape().dims())
                    .enumerate()
                    .all(|(d, (a, b))| d == axis || a == b);
            if !agrees {
                return Err(KronaError::ShapeMismatch {
                    expected: first.shape().dims().to_vec(),
                    got: t.shape().dims().to_vec(),
                });
            }
        }

        let mut out_shape: Vec<usize> = first.shape().dims().to_vec();
        let total_axis: usize = tensors.iter().map(|t| t.shape().dims()[axis]).sum();
        out_shape[axis] = total_axis;

        let outer: usize = out_shape[..axis].iter().product();
        let inner: usize = out_shape[axis + 1..].iter().product();
        let mut out = vec![0.0f32; out_shape.iter().product()];

        let mut written = 0;
        for t in tensors {
            let src_t = t.contiguous();
            let src = src_t
                .as_f32_slice()
                .ok_or_else(|| KronaError::UnsupportedDType(t.dtype()))?;
            let axis_size = t.shape().dims()[axis];

            for o in 0..outer {
                for a in 0..axis_size {
                    let src_start = (o * axis_size + a) * inner;
                    let dst_start = (o * total_axis + written + a) * inner;
                    out[dst_start..dst_start + inner]
                        .copy_from_slice(&src[src_start..src_start + inner]);
                }
            }
            written += axis_size;
        }

        Ok(Tensor::from_f32(&out, &out_shape))
    }
}
