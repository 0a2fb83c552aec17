use candle_core::{DType, Device, Tensor};
use mmrag_embed::masked_mean_l2;

#[test]
fn masked_mean_l2_averages_only_unmasked_tokens() {
    let dev = Device::Cpu;
    // Three tokens, hidden dim 2; the last token is padding.
    let h = Tensor::from_slice(&[1.0f32, 0.0, 3.0, 4.0, 100.0, 100.0], (1, 3, 2), &dev).unwrap();
    let mask = Tensor::from_slice(&[1u32, 1, 0], (1, 3), &dev).unwrap().to_dtype(DType::F32).unwrap();

    let out: Vec<Vec<f32>> = masked_mean_l2(&h, &mask).unwrap().to_vec2().unwrap();
    // mean([1,0],[3,4]) = [2,2] -> normalised [1/sqrt2, 1/sqrt2]
    let expected = 1.0 / 2f32.sqrt();
    for v in &out[0] {
        assert!((v - expected).abs() < 1e-5, "v={v}");
    }
}

#[test]
fn masked_mean_l2_keeps_batch_rows_independent() {
    let dev = Device::Cpu;
    let h = Tensor::from_slice(&[3.0f32, 4.0, 0.0, 5.0], (2, 1, 2), &dev).unwrap();
    let mask = Tensor::ones((2, 1), DType::F32, &dev).unwrap();

    let out: Vec<Vec<f32>> = masked_mean_l2(&h, &mask).unwrap().to_vec2().unwrap();
    assert!((out[0][0] - 0.6).abs() < 1e-5 && (out[0][1] - 0.8).abs() < 1e-5);
    assert!(out[1][0].abs() < 1e-5 && (out[1][1] - 1.0).abs() < 1e-5);
}
