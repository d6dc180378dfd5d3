//! # krona-kfac
//!
//! Math layer for Kronecker-factored approximate curvature: empirical
//! second moments of activation/gradient matrices, damped elementwise
//! inverses, batch-buffer reshaping, bias-column append, and in-place
//! exponential running averages, plus the per-layer factor state that
//! drives them.

pub mod factor;
pub mod math;

pub use factor::FactorState;
pub use math::{
    append_bias_ones, get_cov, get_elementwise_inverse, reshape_data, update_running_avg_,
};
