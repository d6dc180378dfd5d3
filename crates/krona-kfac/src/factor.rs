//! Per-layer factor bookkeeping.
//!
//! A `FactorState` buffers batch tensors captured during forward or
//! backward passes, folds them into an exponentially averaged second
//! moment, and hands out damped diagonal inverses for preconditioning.

use krona_core::{KronaError, Result, Tensor};

use crate::math::{append_bias_ones, get_cov, get_elementwise_inverse, reshape_data, update_running_avg_};

/// Running second-moment factor for one layer's activations or gradients.
pub struct FactorState {
    /// Exponential decay applied when folding a fresh covariance into the
    /// running factor. The first covariance is installed as-is.
    decay: f32,
    /// Whether a bias column of ones is appended before the covariance.
    has_bias: bool,
    /// Batch tensors waiting to be folded in.
    buffer: Vec<Tensor>,
    factor: Option<Tensor>,
}

impl FactorState {
    pub fn new(decay: f32) -> Self {
        Self {
            decay,
            has_bias: false,
            buffer: Vec::new(),
            factor: None,
        }
    }

    /// Builder: append a bias column of ones before computing covariances.
    pub fn with_bias(mut self) -> Self {
        self.has_bias = true;
        self
    }

    /// Averaging decay.
    pub fn decay(&self) -> f32 {
        self.decay
    }

    /// Number of batch tensors currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// The current running factor, if at least one update has happened.
    pub fn factor(&self) -> Option<&Tensor> {
        self.factor.as_ref()
    }

    /// Buffer one batch tensor (activations or gradients).
    pub fn push(&mut self, batch: Tensor) {
        self.buffer.push(batch);
    }

    /// Drain the buffer and fold its covariance into the running factor.
    ///
    /// Buffered tensors are concatenated batch-first and collapsed to 2-D,
    /// the bias column is appended when configured, and the resulting
    /// second moment is averaged into the factor with the configured
    /// decay. A call with nothing buffered does nothing.
    pub fn update(&mut self, scale: Option<f32>) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let mut data = reshape_data(&self.buffer, true, true)?;
        self.buffer.clear();
        if self.has_bias {
            data = append_bias_ones(&data)?;
        }

        let cov = get_cov(&data, None, scale)?;
        match self.factor.as_mut() {
            None => self.factor = Some(cov),
            Some(factor) => update_running_avg_(&cov, factor, self.decay)?,
        }
        Ok(())
    }

    /// Damped elementwise inverse of the factor's diagonal.
    ///
    /// # Errors
    ///
    /// Fails if no update has happened yet.
    pub fn diagonal_inverse(&self, damping: Option<f32>) -> Result<Tensor> {
        let factor = self
            .factor
            .as_ref()
            .ok_or_else(|| KronaError::Op("factor not initialized: call update() first".into()))?;

        let d = factor.shape().dims()[0];
        let data = factor
            .as_f32_slice()
            .ok_or_else(|| KronaError::UnsupportedDType(factor.dtype()))?;
        let diag: Vec<f32> = (0..d).map(|i| data[i * d + i]).collect();
        get_elementwise_inverse(&Tensor::from_f32(&diag, &[d]), damping)
    }
}
