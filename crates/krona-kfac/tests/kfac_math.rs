//! Cross-function properties of the K-FAC math helpers.

use krona_core::Tensor;
use krona_kfac::{
    append_bias_ones, get_cov, get_elementwise_inverse, reshape_data, update_running_avg_,
    FactorState,
};

#[test]
fn cov_of_random_matrix_is_symmetric() {
    let a = Tensor::randn(&[32, 8]);
    let cov = get_cov(&a, None, None).unwrap();
    assert_eq!(cov.shape().dims(), &[8, 8]);

    let data = cov.as_f32_slice().unwrap();
    for i in 0..8 {
        for j in 0..8 {
            let diff = (data[i * 8 + j] - data[j * 8 + i]).abs();
            assert!(diff < 1e-6, "cov[{i},{j}] vs cov[{j},{i}] differ by {diff}");
        }
    }
}

#[test]
fn appended_bias_column_survives_round_trip() {
    let t = Tensor::randn(&[4, 6]);
    let with_bias = append_bias_ones(&t).unwrap();
    assert_eq!(with_bias.shape().dims(), &[4, 7]);

    let src = t.as_f32_slice().unwrap();
    let out = with_bias.as_f32_slice().unwrap();
    for row in 0..4 {
        for col in 0..6 {
            assert_eq!(out[row * 7 + col], src[row * 6 + col]);
        }
        assert_eq!(out[row * 7 + 6], 1.0);
    }
}

#[test]
fn elementwise_inverse_is_an_involution_on_nonzero_input() {
    let v = Tensor::from_f32(&[0.5, -2.0, 4.0, 8.0, -0.125], &[5]);
    let twice =
        get_elementwise_inverse(&get_elementwise_inverse(&v, None).unwrap(), None).unwrap();
    let orig = v.as_f32_slice().unwrap();
    let back = twice.as_f32_slice().unwrap();
    for (a, b) in orig.iter().zip(back) {
        assert!((a - b).abs() < 1e-6, "{a} came back as {b}");
    }
}

#[test]
fn buffered_batches_concat_in_push_order() {
    let t1 = Tensor::from_f32(&(0..6).map(|v| v as f32).collect::<Vec<_>>(), &[2, 3]);
    let t2 = Tensor::from_f32(&(6..12).map(|v| v as f32).collect::<Vec<_>>(), &[2, 3]);
    let out = reshape_data(&[t1, t2], true, false).unwrap();
    assert_eq!(out.shape().dims(), &[4, 3]);
    let data = out.as_f32_slice().unwrap();
    assert_eq!(data[0], 0.0);
    assert_eq!(data[6], 6.0);
    assert_eq!(data[11], 11.0);
}

#[test]
fn running_average_converges_to_constant_input() {
    let new = Tensor::from_f32(&[10.0, -10.0], &[2]);
    let mut current = Tensor::from_f32(&[0.0, 0.0], &[2]);
    for _ in 0..200 {
        update_running_avg_(&new, &mut current, 0.9).unwrap();
    }
    let data = current.as_f32_slice().unwrap();
    assert!((data[0] - 10.0).abs() < 1e-3, "got {}", data[0]);
    assert!((data[1] + 10.0).abs() < 1e-3, "got {}", data[1]);
}

#[test]
fn factor_state_drives_the_full_helper_pipeline() {
    // Two training steps of a toy layer with bias, then a damped
    // diagonal preconditioner.
    let mut state = FactorState::new(0.95).with_bias();

    state.push(Tensor::randn(&[8, 4]));
    state.push(Tensor::randn(&[8, 4]));
    state.update(None).unwrap();

    state.push(Tensor::randn(&[16, 4]));
    state.update(None).unwrap();

    let factor = state.factor().unwrap();
    assert_eq!(factor.shape().dims(), &[5, 5]);

    // The bias-bias entry of an activation covariance is mean(1 * 1) = 1,
    // and stays 1 under averaging.
    let data = factor.as_f32_slice().unwrap();
    assert!((data[4 * 5 + 4] - 1.0).abs() < 1e-5);

    let inv = state.diagonal_inverse(Some(1e-2)).unwrap();
    assert_eq!(inv.shape().dims(), &[5]);
    // Damped diagonal of aᵗa/N is strictly positive, so no inverse is zero
    assert!(inv.as_f32_slice().unwrap().iter().all(|&v| v > 0.0));
}
