use std::fmt;

use smallvec::SmallVec;

use crate::dtype::DType;
use crate::error::KronaError;
use crate::shape::Shape;
use crate::storage::Storage;
use crate::Result;

/// A dense multi-dimensional array over reference-counted storage.
///
/// Reshape and transpose return zero-copy views sharing the same buffer;
/// in-place mutation goes through copy-on-write, so writing to a view
/// never corrupts its siblings.
///
/// # Examples
///
/// ```
/// use krona_core::Tensor;
///
/// let t = Tensor::from_f32(&[1.0, 2.0, 3.0, 4.0], &[2, 2]);
/// assert_eq!(t.shape().dims(), &[2, 2]);
///
/// let flat = t.reshape(&[4]).unwrap();
/// assert_eq!(flat.shape().dims(), &[4]);
/// ```
#[derive(Clone)]
pub struct Tensor {
    storage: Storage,
    shape: Shape,
    strides: SmallVec<[usize; 4]>,
}

impl Tensor {
    /// Create a tensor from f32 data with the given shape.
    pub fn from_f32(data: &[f32], shape: &[usize]) -> Self {
        let s = Shape::new(shape);
        assert_eq!(
            s.numel(),
            data.len(),
            "shape {:?} requires {} elements, got {}",
            shape,
            s.numel(),
            data.len()
        );
        let strides = s.contiguous_strides();
        Self {
            storage: Storage::from_f32(data),
            shape: s,
            strides,
        }
    }

    /// Create a tensor from f64 data with the given shape.
    pub fn from_f64(data: &[f64], shape: &[usize]) -> Self {
        let s = Shape::new(shape);
        assert_eq!(s.numel(), data.len());
        let strides = s.contiguous_strides();
        Self {
            storage: Storage::from_f64(data),
            shape: s,
            strides,
        }
    }

    /// Create a tensor of zeros with the given shape and dtype.
    pub fn zeros(shape: &[usize], dtype: DType) -> Self {
        let s = Shape::new(shape);
        let strides = s.contiguous_strides();
        Self {
            storage: Storage::zeros(dtype, s.numel()),
            shape: s,
            strides,
        }
    }

    /// Create a tensor of ones (f32).
    pub fn ones(shape: &[usize]) -> Self {
        let numel = Shape::new(shape).numel();
        Self::from_f32(&vec![1.0; numel], shape)
    }

    /// Create a tensor sampled from the standard normal N(0, 1).
    pub fn randn(shape: &[usize]) -> Self {
        use rand::Rng;
        let numel = Shape::new(shape).numel();
        let mut rng = rand::thread_rng();
        // Box-Muller transform
        let data: Vec<f32> = (0..numel)
            .map(|_| {
                let u: f32 = rng.gen_range(1e-7f32..1.0f32);
                let theta: f32 = rng.gen_range(0.0f32..std::f32::consts::TAU);
                (-2.0 * u.ln()).sqrt() * theta.cos()
            })
            .collect();
        Self::from_f32(&data, shape)
    }

    /// Create a 0-dimensional tensor from a single f32 value.
    pub fn scalar(value: f32) -> Self {
        Self {
            storage: Storage::from_f32(&[value]),
            shape: Shape::scalar(),
            strides: SmallVec::new(),
        }
    }

    /// Shape of the tensor.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.shape.numel()
    }

    /// Data type.
    pub fn dtype(&self) -> DType {
        self.storage.dtype()
    }

    /// Strides in elements, not bytes.
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Whether this tensor is densely packed in row-major order.
    pub fn is_contiguous(&self) -> bool {
        self.strides == self.shape.contiguous_strides()
    }

    /// The underlying f32 data (contiguous tensors only).
    pub fn as_f32_slice(&self) -> Option<&[f32]> {
        if !self.is_contiguous() {
            return None;
        }
        self.storage.as_f32_slice()
    }

    /// Mutable f32 data (contiguous only; copy-on-write if shared).
    pub fn as_f32_slice_mut(&mut self) -> Option<&mut [f32]> {
        if !self.is_contiguous() {
            return None;
        }
        self.storage.as_f32_slice_mut()
    }

    /// The underlying f64 data (contiguous tensors only).
    pub fn as_f64_slice(&self) -> Option<&[f64]> {
        if !self.is_contiguous() {
            return None;
        }
        self.storage.as_f64_slice()
    }

    /// A single f32 element by logical flat index, honoring strides.
    pub fn get_f32(&self, flat_index: usize) -> Option<f32> {
        let slice = self.storage.as_f32_slice()?;
        let physical = self.flat_to_physical(flat_index)?;
        slice.get(physical).copied()
    }

    /// Map a logical flat index to a physical storage index.
    fn flat_to_physical(&self, flat_index: usize) -> Option<usize> {
        if self.shape.is_scalar() {
            return (flat_index == 0).then_some(0);
        }
        if flat_index >= self.numel() {
            return None;
        }

        let dense = self.shape.contiguous_strides();
        let mut remaining = flat_index;
        let mut physical = 0;
        for (i, &ds) in dense.iter().enumerate() {
            physical += (remaining / ds) * self.strides[i];
            remaining %= ds;
        }
        Some(physical)
    }

    /// Reshape to a new shape (zero-copy; requires a contiguous tensor).
    ///
    /// At most one target dimension may be `-1` and is inferred from the
    /// element count.
    pub fn reshape(&self, new_shape: &[isize]) -> Result<Tensor> {
        let resolved =
            self.shape
                .resolve_reshape(new_shape)
                .ok_or_else(|| KronaError::InvalidReshape {
                    numel: self.numel(),
                    shape: new_shape.iter().map(|&d| d.unsigned_abs()).collect(),
                })?;

        if !self.is_contiguous() {
            return Err(KronaError::Op(
                "cannot reshape a non-contiguous tensor (call .contiguous() first)".into(),
            ));
        }

        let strides = resolved.contiguous_strides();
        Ok(Tensor {
            storage: self.storage.clone(),
            shape: resolved,
            strides,
        })
    }

    /// Swap the last two dimensions (zero-copy view).
    pub fn transpose(&self) -> Result<Tensor> {
        let shape = self
            .shape
            .transposed()
            .ok_or_else(|| KronaError::InvalidShape(format!(
                "transpose needs at least 2 dimensions, got shape {}",
                self.shape
            )))?;

        let n = self.ndim();
        let mut strides = self.strides.clone();
        strides.swap(n - 2, n - 1);

        Ok(Tensor {
            storage: self.storage.clone(),
            shape,
            strides,
        })
    }

    /// A densely packed copy, or a cheap clone if already contiguous.
    pub fn contiguous(&self) -> Tensor {
        if self.is_contiguous() {
            return self.clone();
        }

        // Only F32 tensors ever become non-contiguous (views come from
        // transpose, and op kernels are F32).
        let numel = self.numel();
        let mut data = vec![0.0f32; numel];
        for (i, slot) in data.iter_mut().enumerate() {
            *slot = self
                .get_f32(i)
                .expect("contiguous: index in range by construction");
        }
        Tensor::from_f32(&data, self.shape.dims())
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tensor(shape={}, dtype={}, contiguous={})",
            self.shape,
            self.dtype(),
            self.is_contiguous(),
        )
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(data) = self.as_f32_slice() {
            if self.numel() <= 20 {
                write!(f, "tensor({:?}, shape={})", data, self.shape)
            } else {
                write!(
                    f,
                    "tensor([{:.4}, {:.4}, ..., {:.4}], shape={})",
                    data[0],
                    data[1],
                    data[self.numel() - 1],
                    self.shape
                )
            }
        } else {
            write!(f, "tensor(shape={}, dtype={})", self.shape, self.dtype())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_f32() {
        let t = Tensor::from_f32(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        assert_eq!(t.shape().dims(), &[2, 3]);
        assert_eq!(t.ndim(), 2);
        assert_eq!(t.numel(), 6);
        assert_eq!(t.dtype(), DType::F32);
        assert!(t.is_contiguous());
    }

    #[test]
    fn test_zeros_and_ones() {
        let z = Tensor::zeros(&[3, 4], DType::F32);
        assert!(z.as_f32_slice().unwrap().iter().all(|&v| v == 0.0));

        let o = Tensor::ones(&[2, 2]);
        assert_eq!(o.as_f32_slice().unwrap(), &[1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_scalar() {
        let t = Tensor::scalar(3.5);
        assert!(t.shape().is_scalar());
        assert_eq!(t.numel(), 1);
        assert_eq!(t.get_f32(0), Some(3.5));
        assert_eq!(t.get_f32(1), None);
    }

    #[test]
    fn test_randn_shape() {
        let t = Tensor::randn(&[8, 3]);
        assert_eq!(t.numel(), 24);
        // Values are finite draws, not all identical
        let data = t.as_f32_slice().unwrap();
        assert!(data.iter().all(|v| v.is_finite()));
        assert!(data.windows(2).any(|w| w[0] != w[1]));
    }

    #[test]
    fn test_reshape() {
        let t = Tensor::from_f32(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let r = t.reshape(&[3, 2]).unwrap();
        assert_eq!(r.shape().dims(), &[3, 2]);
        assert_eq!(r.as_f32_slice().unwrap(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        let inferred = t.reshape(&[-1, 2]).unwrap();
        assert_eq!(inferred.shape().dims(), &[3, 2]);

        assert!(t.reshape(&[4, 2]).is_err());
    }

    #[test]
    fn test_transpose() {
        let t = Tensor::from_f32(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let tr = t.transpose().unwrap();
        assert_eq!(tr.shape().dims(), &[3, 2]);
        assert!(!tr.is_contiguous());

        assert_eq!(tr.get_f32(0), Some(1.0)); // [0,0]
        assert_eq!(tr.get_f32(1), Some(4.0)); // [0,1] ← original [1,0]
        assert_eq!(tr.get_f32(2), Some(2.0)); // [1,0] ← original [0,1]

        assert!(Tensor::from_f32(&[1.0], &[1]).transpose().is_err());
    }

    #[test]
    fn test_contiguous_copy() {
        let t = Tensor::from_f32(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]);
        let tr = t.transpose().unwrap();
        let c = tr.contiguous();
        assert!(c.is_contiguous());
        assert_eq!(c.shape().dims(), &[3, 2]);
        assert_eq!(c.as_f32_slice().unwrap(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }

    #[test]
    fn test_view_mutation_does_not_leak() {
        let t = Tensor::from_f32(&[1.0, 2.0, 3.0, 4.0], &[4]);
        let mut view = t.reshape(&[2, 2]).unwrap();
        view.as_f32_slice_mut().unwrap()[0] = 99.0;
        // Copy-on-write: the original buffer is untouched
        assert_eq!(t.as_f32_slice().unwrap()[0], 1.0);
        assert_eq!(view.as_f32_slice().unwrap()[0], 99.0);
    }

    #[test]
    fn test_debug_display() {
        let t = Tensor::from_f32(&[1.0, 2.0], &[2]);
        assert!(format!("{:?}", t).contains("Tensor"));
        assert!(format!("{}", t).contains("tensor"));
    }
}
