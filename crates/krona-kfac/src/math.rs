//! Stateless tensor-math helpers for K-FAC factor maintenance.
//!
//! Each function is a single-shot numeric transform; the only one that
//! mutates its input is `update_running_avg_`, marked by the in-place
//! suffix.

use krona_core::{KronaError, Result, Tensor};

/// Append a column of ones to the last dimension of a tensor.
///
/// For an input of shape `[4, 6]` the output has shape `[4, 7]` where the
/// last column is all ones. Works for any rank ≥ 1; the input is not
/// mutated.
pub fn append_bias_ones(tensor: &Tensor) -> Result<Tensor> {
    let mut ones_shape: Vec<usize> = tensor.shape().dims().to_vec();
    if let Some(last) = ones_shape.last_mut() {
        *last = 1;
    }
    let ones = Tensor::ones(&ones_shape);
    Tensor::cat(&[tensor, &ones], -1)
}

/// Compute the empirical second moment of a 2-D tensor.
///
/// With `b = None` this is `aᵗ @ (a / scale)`; with `b` given it is the
/// cross moment `aᵗ @ (b / scale)`. `scale` defaults to the first
/// dimension of `a`.
///
/// # Errors
///
/// `KronaError::InvalidShape` if `a` is not 2-dimensional, or if `b` is
/// given with a shape different from `a`'s.
pub fn get_cov(a: &Tensor, b: Option<&Tensor>, scale: Option<f32>) -> Result<Tensor> {
    if a.ndim() != 2 {
        return Err(KronaError::InvalidShape(format!(
            "input tensor must have 2 dimensions, got tensor with shape {}",
            a.shape()
        )));
    }
    if let Some(b) = b {
        if b.shape() != a.shape() {
            return Err(KronaError::InvalidShape(format!(
                "input tensors must have the same shape, got {} and {}",
                a.shape(),
                b.shape()
            )));
        }
    }

    let scale = scale.unwrap_or(a.shape().dims()[0] as f32);

    match b {
        None => {
            let cov = a.transpose()?.matmul(&a.div_scalar(scale)?)?;
            // aᵗa is symmetric up to rounding; folding with the transpose
            // keeps the factor exactly symmetric.
            cov.add(&cov.transpose()?)?.mul_scalar(0.5)
        }
        // Cross moments are legitimately asymmetric; return as computed.
        Some(b) => a.transpose()?.matmul(&b.div_scalar(scale)?),
    }
}

/// Reciprocal of every non-zero element.
///
/// Elements equal to `0.0` stay `0.0`. With `damping`, the reciprocal is
/// taken of `vector + damping` instead; the caller's tensor is never
/// mutated either way.
pub fn get_elementwise_inverse(vector: &Tensor, damping: Option<f32>) -> Result<Tensor> {
    let v = match damping {
        Some(d) => vector.add_scalar(d)?,
        None => vector.contiguous(),
    };
    let data = v
        .as_f32_slice()
        .ok_or_else(|| KronaError::UnsupportedDType(v.dtype()))?;
    let inv: Vec<f32> = data
        .iter()
        .map(|&x| if x == 0.0 { 0.0 } else { 1.0 / x })
        .collect();
    Ok(Tensor::from_f32(&inv, v.shape().dims()))
}

/// Concatenate buffered batch tensors into a single tensor.
///
/// Concatenates along axis 0 when `batch_first`, else axis 1. With
/// `collapse_dims`, a result of rank > 2 is flattened row-major into
/// `[-1, last_dim]` so the output is guaranteed 2-D.
///
/// # Errors
///
/// Propagates the concat error when tensors disagree in a non-batch
/// dimension or when `data_list` is empty.
pub fn reshape_data(data_list: &[Tensor], batch_first: bool, collapse_dims: bool) -> Result<Tensor> {
    let refs: Vec<&Tensor> = data_list.iter().collect();
    let axis = if batch_first { 0 } else { 1 };
    let mut data = Tensor::cat(&refs, axis)?;
    if collapse_dims && data.ndim() > 2 {
        let features = data.shape().dims()[data.ndim() - 1] as isize;
        data = data.reshape(&[-1, features])?;
    }
    Ok(data)
}

/// In-place exponential running average:
/// `current = alpha * current + (1 - alpha) * new`.
///
/// Computed as three in-place steps (scale, add, scale) so no scratch
/// tensor is allocated. `alpha == 1.0` leaves `current` untouched and
/// skips the steps entirely, since the scale factor `alpha / (1 - alpha)`
/// is undefined there. Values of `alpha` outside `[0, 1]` are accepted
/// as-is.
pub fn update_running_avg_(new: &Tensor, current: &mut Tensor, alpha: f32) -> Result<()> {
    if alpha == 1.0 {
        return Ok(());
    }
    current.mul_scalar_(alpha / (1.0 - alpha))?;
    current.add_(new)?;
    current.mul_scalar_(1.0 - alpha)
}
