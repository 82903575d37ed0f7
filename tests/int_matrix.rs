use ocr_kernels::intmatrix::signmul::saturate_input;
use ocr_kernels::intmatrix::{self, KernelDescriptor, QuantizedMatrix, SCALAR};
use ocr_kernels::{int_dot_product, quantize_input};
use pretty_assertions::assert_eq;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn descriptors() -> Vec<&'static KernelDescriptor> {
    let d = intmatrix::runnable();
    assert_eq!(d.last().map(|d| d.name), Some("scalar"));
    d
}

fn random_matrix(rng: &mut SmallRng, dim1: usize, dim2: usize) -> QuantizedMatrix {
    let weights: Vec<i8> = (0..dim1 * dim2).map(|_| rng.gen_range(-127..=127)).collect();
    let scales: Vec<f32> = (0..dim1).map(|_| rng.gen_range(0.001f32..0.1)).collect();
    QuantizedMatrix::new(dim1, dim2, weights, scales).unwrap()
}

/// Row-by-row product with the bias meeting an input of 1 and inputs of
/// -128 read as -127.
fn naive(m: &QuantizedMatrix, u: &[i8]) -> Vec<f32> {
    let u: Vec<i8> = u[..m.num_inputs()].iter().map(|&x| saturate_input(x)).collect();
    (0..m.dim1())
        .map(|r| {
            let row = m.row(r);
            let total = int_dot_product(&row[..m.num_inputs()], &u) + i32::from(m.bias(r));
            total as f32 * m.scales()[r]
        })
        .collect()
}

#[test]
fn zero_input_yields_scaled_bias() {
    for d in descriptors() {
        for k in [0usize, 1, 5, 16, 64, 100] {
            let mut weights = vec![3i8; k + 1];
            weights[k] = -57;
            let m = QuantizedMatrix::new(1, k + 1, weights, vec![0.25]).unwrap();
            let packed = d.pack(&m);
            let u = vec![0i8; k];
            let mut v = [f32::NAN];
            d.matrix_dot_vector(&packed, &u, &mut v);
            assert_eq!(v[0], -57.0 * 0.25, "{} k={}", d.name, k);
        }
    }
}

#[test]
fn alternating_weights_agree_on_every_kernel() {
    let (dim1, dim2) = (16, 65);
    let weights: Vec<i8> = (0..dim1 * dim2).map(|i| if (i % dim2) % 2 == 0 { 1 } else { -1 }).collect();
    let m = QuantizedMatrix::new(dim1, dim2, weights, vec![1.0; dim1]).unwrap();
    let u = vec![1i8; dim2 - 1];
    // 64 alternating terms cancel; the bias column (index 64, even) is +1.
    let expected = vec![1.0f32; dim1];
    for d in descriptors() {
        let packed = d.pack(&m);
        let mut v = vec![0.0f32; dim1];
        d.matrix_dot_vector(&packed, &u, &mut v);
        assert_eq!(v, expected, "{}", d.name);
    }
}

#[test]
fn random_shapes_match_naive_exactly() {
    let mut rng = SmallRng::seed_from_u64(0x0c12);
    let rows = [1usize, 3, 4, 7, 8, 12, 16, 33, 64, 65, 100, 130, 257];
    let inputs = [0usize, 1, 3, 4, 5, 15, 16, 17, 31, 32, 33, 63, 64, 65, 100];
    for &dim1 in &rows {
        for &num_in in &inputs {
            let m = random_matrix(&mut rng, dim1, num_in + 1);
            let u: Vec<i8> = (0..num_in).map(|_| rng.gen_range(-127..=127)).collect();
            let expected = naive(&m, &u);
            for d in descriptors() {
                let packed = d.pack(&m);
                let mut v = vec![0.0f32; dim1];
                d.matrix_dot_vector(&packed, &u, &mut v);
                assert_eq!(v, expected, "{} dim1={} num_in={}", d.name, dim1, num_in);
            }
        }
    }
}

#[test]
fn extreme_weights_do_not_saturate() {
    let dim1 = 40;
    let num_in = 200;
    let weights: Vec<i8> = (0..dim1 * (num_in + 1)).map(|i| if i % 3 == 0 { -127 } else { 127 }).collect();
    let m = QuantizedMatrix::new(dim1, num_in + 1, weights, vec![1.0; dim1]).unwrap();
    let u: Vec<i8> = (0..num_in).map(|i| if i % 2 == 0 { 127 } else { -127 }).collect();
    let expected = naive(&m, &u);
    for d in descriptors() {
        let packed = d.pack(&m);
        let mut v = vec![0.0f32; dim1];
        d.matrix_dot_vector(&packed, &u, &mut v);
        assert_eq!(v, expected, "{}", d.name);
    }
}

#[test]
fn minimum_input_agrees_on_every_kernel() {
    let (dim1, num_in) = (16, 8);
    let weights: Vec<i8> = (0..dim1 * (num_in + 1)).map(|i| if i % (num_in + 1) == num_in { 0 } else { -1 }).collect();
    let m = QuantizedMatrix::new(dim1, num_in + 1, weights, vec![1.0; dim1]).unwrap();
    for d in descriptors() {
        let packed = d.pack(&m);
        let mut at_min = vec![0.0f32; dim1];
        d.matrix_dot_vector(&packed, &[i8::MIN; 8], &mut at_min);
        let mut at_127 = vec![0.0f32; dim1];
        d.matrix_dot_vector(&packed, &[-127; 8], &mut at_127);
        assert_eq!(at_min, vec![1016.0f32; dim1], "{}", d.name);
        assert_eq!(at_min, at_127, "{}", d.name);
    }
}

#[test]
fn full_byte_range_matches_naive_on_every_kernel() {
    let mut rng = SmallRng::seed_from_u64(0x80);
    for &(dim1, num_in) in &[(1usize, 7usize), (5, 64), (16, 65), (37, 100), (130, 33), (257, 17)] {
        let weights: Vec<i8> = (0..dim1 * (num_in + 1)).map(|_| rng.gen()).collect();
        let scales: Vec<f32> = (0..dim1).map(|_| rng.gen_range(0.001f32..0.1)).collect();
        let m = QuantizedMatrix::new(dim1, num_in + 1, weights, scales).unwrap();
        let u: Vec<i8> = (0..num_in).map(|_| if rng.gen_bool(0.25) { i8::MIN } else { rng.gen() }).collect();
        let expected = naive(&m, &u);
        for d in descriptors() {
            let mut v = vec![0.0f32; dim1];
            d.matrix_dot_vector(&d.pack(&m), &u, &mut v);
            assert_eq!(v, expected, "{} dim1={} num_in={}", d.name, dim1, num_in);
        }
    }
}

#[test]
fn outputs_past_dim1_are_untouched() {
    let mut rng = SmallRng::seed_from_u64(9);
    let m = random_matrix(&mut rng, 13, 20);
    let u: Vec<i8> = (0..19).map(|_| rng.gen_range(-127..=127)).collect();
    for d in descriptors() {
        let packed = d.pack(&m);
        let mut v = vec![-1.5f32; 32];
        d.matrix_dot_vector(&packed, &u, &mut v);
        assert!(v[13..].iter().all(|&x| x == -1.5), "{} wrote past dim1", d.name);
    }
}

#[test]
fn scalar_packing_is_row_major() {
    let mut rng = SmallRng::seed_from_u64(1);
    let m = random_matrix(&mut rng, 5, 9);
    let packed = SCALAR.pack(&m);
    assert_eq!(packed.shaped_weights(), m.weights());
    assert_eq!(packed.scales(), m.scales());
}

#[test]
fn packed_size_covers_padding_and_bias() {
    let mut rng = SmallRng::seed_from_u64(2);
    let (dim1, num_in) = (70, 10);
    let m = random_matrix(&mut rng, dim1, num_in + 1);
    for d in descriptors() {
        let packed = d.pack(&m);
        let per_reg = d.num_outputs_per_register();
        let blocked = dim1 - dim1 % per_reg;
        let rounded = ocr_kernels::roundup(num_in, d.num_inputs_per_group());
        let expected = blocked * (rounded + 1) + (dim1 - blocked) * (num_in + 1);
        assert_eq!(packed.shaped_weights().len(), expected, "{}", d.name);
    }
}

#[test]
fn quantized_round_trip_is_close() {
    let mut rng = SmallRng::seed_from_u64(3);
    let (dim1, dim2) = (8, 33);
    let values: Vec<f32> = (0..dim1 * dim2).map(|_| rng.gen_range(-0.5f32..0.5)).collect();
    let m = QuantizedMatrix::quantize(dim1, dim2, &values).unwrap();
    assert!(m.weights().iter().all(|&w| w != i8::MIN));
    for r in 0..dim1 {
        for c in 0..dim2 {
            let err = (m.dequantize(r, c) - values[r * dim2 + c]).abs();
            assert!(err <= m.scales()[r] * 0.5 + 1e-6, "r={} c={} err={}", r, c, err);
        }
    }

    let x: Vec<f32> = (0..dim2 - 1).map(|_| rng.gen_range(-1.0f32..1.0)).collect();
    let mut u = vec![0i8; dim2 - 1];
    quantize_input(&x, &mut u);
    let d = ocr_kernels::select_best();
    let mut v = vec![0.0f32; dim1];
    d.matrix_dot_vector(&d.pack(&m), &u, &mut v);
    for r in 0..dim1 {
        // Quantized inputs against float weights; only the weight rounding
        // (half a scale step per term) separates the two.
        let row = &values[r * dim2..(r + 1) * dim2];
        let exact: f32 = row[..dim2 - 1].iter().zip(&u).map(|(&w, &q)| w * f32::from(q)).sum::<f32>() + row[dim2 - 1];
        let weight_error = m.scales()[r] * 0.5 * (u.iter().map(|&q| f32::from(q).abs()).sum::<f32>() + 1.0);
        assert!((v[r] - exact).abs() <= weight_error + 1e-3, "row {}: {} vs {}", r, v[r], exact);
    }
}
