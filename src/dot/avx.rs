//! 256-bit AVX dot products, plus the compensated `f32` variant.

use std::arch::x86_64::*;

use super::tail;

pub fn dot_product_f64(u: &[f64], v: &[f64]) -> f64 {
    debug_assert_eq!(u.len(), v.len());
    let n = u.len().min(v.len());
    // SAFETY: reachable only through AVX descriptors, handed out after the
    // registry detected avx.
    unsafe { dot_f64(&u[..n], &v[..n]) }
}

pub fn dot_product_f32(u: &[f32], v: &[f32]) -> f32 {
    debug_assert_eq!(u.len(), v.len());
    let n = u.len().min(v.len());
    // SAFETY: see `dot_product_f64`.
    unsafe { dot_f32(&u[..n], &v[..n]) }
}

pub fn dot_product_f32_kahan(u: &[f32], v: &[f32]) -> f32 {
    debug_assert_eq!(u.len(), v.len());
    let n = u.len().min(v.len());
    // SAFETY: see `dot_product_f64`.
    unsafe { dot_f32_kahan(&u[..n], &v[..n]) }
}

#[target_feature(enable = "avx")]
unsafe fn dot_f64(u: &[f64], v: &[f64]) -> f64 {
    let n = u.len();
    let blocked = n - n % 8;
    let (pu, pv) = (u.as_ptr(), v.as_ptr());
    let mut t0 = _mm256_setzero_pd();
    let mut t1 = _mm256_setzero_pd();
    let mut k = 0;
    while k < blocked {
        let f0 = _mm256_mul_pd(_mm256_loadu_pd(pu.add(k)), _mm256_loadu_pd(pv.add(k)));
        t0 = _mm256_add_pd(t0, f0);
        let f1 = _mm256_mul_pd(_mm256_loadu_pd(pu.add(k + 4)), _mm256_loadu_pd(pv.add(k + 4)));
        t1 = _mm256_add_pd(t1, f1);
        k += 8;
    }
    let t = _mm256_hadd_pd(t0, t1);
    let mut lanes = [0.0f64; 4];
    _mm256_storeu_pd(lanes.as_mut_ptr(), t);
    let acc = (lanes[0] + lanes[1]) + (lanes[2] + lanes[3]);
    tail(&u[blocked..], &v[blocked..], acc)
}

#[target_feature(enable = "avx")]
unsafe fn dot_f32(u: &[f32], v: &[f32]) -> f32 {
    let n = u.len();
    let blocked = n - n % 16;
    let (pu, pv) = (u.as_ptr(), v.as_ptr());
    let mut t0 = _mm256_setzero_ps();
    let mut t1 = _mm256_setzero_ps();
    let mut k = 0;
    while k < blocked {
        let f0 = _mm256_mul_ps(_mm256_loadu_ps(pu.add(k)), _mm256_loadu_ps(pv.add(k)));
        t0 = _mm256_add_ps(t0, f0);
        let f1 = _mm256_mul_ps(_mm256_loadu_ps(pu.add(k + 8)), _mm256_loadu_ps(pv.add(k + 8)));
        t1 = _mm256_add_ps(t1, f1);
        k += 16;
    }
    tail(&u[blocked..], &v[blocked..], hsum_ps(_mm256_add_ps(t0, t1)))
}

#[target_feature(enable = "avx")]
#[inline]
unsafe fn hsum_ps(x: __m256) -> f32 {
    let mut lanes = [0.0f32; 8];
    _mm256_storeu_ps(lanes.as_mut_ptr(), x);
    ((lanes[0] + lanes[1]) + (lanes[2] + lanes[3])) + ((lanes[4] + lanes[5]) + (lanes[6] + lanes[7]))
}

/// One Kahan step on every lane: `sum += prod` with error feedback in `c`.
#[target_feature(enable = "avx")]
#[inline]
unsafe fn kahan_add(sum: &mut __m256, c: &mut __m256, prod: __m256) {
    let y = _mm256_sub_ps(prod, *c);
    let t = _mm256_add_ps(*sum, y);
    *c = _mm256_sub_ps(_mm256_sub_ps(t, *sum), y);
    *sum = t;
}

/// Merges `(sum_b, c_b)` into `(sum_a, c_a)` with compensation.
#[target_feature(enable = "avx")]
#[inline]
unsafe fn kahan_merge(sum_a: &mut __m256, c_a: &mut __m256, sum_b: __m256, c_b: __m256) {
    let c = _mm256_sub_ps(*c_a, c_b);
    let y = _mm256_sub_ps(sum_b, c);
    let t = _mm256_add_ps(*sum_a, y);
    *c_a = _mm256_sub_ps(_mm256_sub_ps(t, *sum_a), y);
    *sum_a = t;
}

#[target_feature(enable = "avx")]
unsafe fn dot_f32_kahan(u: &[f32], v: &[f32]) -> f32 {
    let n = u.len();
    if n == 0 {
        return 0.0;
    }
    let blocked = n - n % 32;
    let (pu, pv) = (u.as_ptr(), v.as_ptr());
    let mut sum = [_mm256_setzero_ps(); 4];
    let mut c = [_mm256_setzero_ps(); 4];
    let mut i = 0;
    while i < blocked {
        for r in 0..4 {
            let prod = _mm256_mul_ps(_mm256_loadu_ps(pu.add(i + 8 * r)), _mm256_loadu_ps(pv.add(i + 8 * r)));
            kahan_add(&mut sum[r], &mut c[r], prod);
        }
        i += 32;
    }
    // 4 -> 2 -> 1 registers.
    let (mut s0, mut c0) = (sum[0], c[0]);
    let (mut s2, mut c2) = (sum[2], c[2]);
    kahan_merge(&mut s0, &mut c0, sum[1], c[1]);
    kahan_merge(&mut s2, &mut c2, sum[3], c[3]);
    kahan_merge(&mut s0, &mut c0, s2, c2);

    let mut lanes = [0.0f32; 8];
    let mut comp = [0.0f32; 8];
    _mm256_storeu_ps(lanes.as_mut_ptr(), s0);
    _mm256_storeu_ps(comp.as_mut_ptr(), c0);
    let mut c = comp.iter().sum::<f32>();
    let mut total = 0.0f32;
    let mut step = |x: f32| {
        let y = x - c;
        let t = total + y;
        c = (t - total) - y;
        total = t;
    };
    for lane in lanes {
        step(lane);
    }
    for k in blocked..n {
        step(u[k] * v[k]);
    }
    total
}
