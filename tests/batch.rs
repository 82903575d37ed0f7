use ocr_kernels::batch::matrix_dot_vector_batch;
use ocr_kernels::intmatrix::{self, QuantizedMatrix};
use pretty_assertions::assert_eq;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

#[test]
fn batch_matches_one_timestep_at_a_time() {
    let mut rng = SmallRng::seed_from_u64(11);
    let (dim1, num_in, timesteps) = (37, 45, 23);
    let weights: Vec<i8> = (0..dim1 * (num_in + 1)).map(|_| rng.gen_range(-127..=127)).collect();
    let scales: Vec<f32> = (0..dim1).map(|_| rng.gen_range(0.01f32..0.02)).collect();
    let m = QuantizedMatrix::new(dim1, num_in + 1, weights, scales).unwrap();
    let inputs: Vec<i8> = (0..timesteps * num_in).map(|_| rng.gen_range(-127..=127)).collect();

    for d in intmatrix::runnable() {
        let packed = d.pack(&m);
        let mut outputs = vec![0.0f32; timesteps * dim1];
        assert_eq!(matrix_dot_vector_batch(d, &packed, &inputs, &mut outputs).unwrap(), timesteps);
        for t in 0..timesteps {
            let mut v = vec![0.0f32; dim1];
            d.matrix_dot_vector(&packed, &inputs[t * num_in..(t + 1) * num_in], &mut v);
            assert_eq!(&outputs[t * dim1..(t + 1) * dim1], &v[..], "{} timestep {}", d.name, t);
        }
    }
}

#[test]
fn bias_only_layers_batch_too() {
    let m = QuantizedMatrix::new(3, 1, vec![2, -4, 6], vec![0.5; 3]).unwrap();
    let d = ocr_kernels::select_best();
    let packed = d.pack(&m);
    let mut outputs = vec![0.0f32; 6];
    assert_eq!(matrix_dot_vector_batch(d, &packed, &[], &mut outputs).unwrap(), 2);
    assert_eq!(outputs, vec![1.0, -2.0, 3.0, 1.0, -2.0, 3.0]);
}

#[test]
fn empty_layer_is_a_no_op() {
    let m = QuantizedMatrix::new(0, 5, vec![], vec![]).unwrap();
    let d = ocr_kernels::select_best();
    assert_eq!(matrix_dot_vector_batch(d, &d.pack(&m), &[1, 2, 3, 4], &mut []).unwrap(), 0);
}
