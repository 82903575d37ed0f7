use criterion::{criterion_group, criterion_main, Criterion, black_box};
use ocr_kernels::dot;

fn make_vectors(n: usize) -> (Vec<f32>, Vec<f32>) {
    let mut seed = 0x9e37_79b9_7f4a_7c15u64;
    let mut next = || {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((seed >> 40) as f32 / (1u64 << 24) as f32) - 0.5
    };
    let u = (0..n).map(|_| next()).collect();
    let v = (0..n).map(|_| next()).collect();
    (u, v)
}

fn bench_dot(c: &mut Criterion) {
    // LSTM gate width in the line recognizer is a few hundred inputs.
    for n in [96usize, 512, 4096] {
        let (u, v) = make_vectors(n);
        let ud: Vec<f64> = u.iter().map(|&x| f64::from(x)).collect();
        let vd: Vec<f64> = v.iter().map(|&x| f64::from(x)).collect();
        for k in dot::runnable() {
            c.bench_function(&format!("dot_f32_{}_{}", k.name, n), |b| {
                b.iter(|| black_box((k.f32)(black_box(&u), black_box(&v))))
            });
            c.bench_function(&format!("dot_f64_{}_{}", k.name, n), |b| {
                b.iter(|| black_box((k.f64)(black_box(&ud), black_box(&vd))))
            });
        }
    }
}

criterion_group!(benches, bench_dot);
criterion_main!(benches);
