//! 256-bit dot products with fused multiply-add.

use std::arch::x86_64::*;

use super::tail;

pub fn dot_product_f64(u: &[f64], v: &[f64]) -> f64 {
    debug_assert_eq!(u.len(), v.len());
    let n = u.len().min(v.len());
    // SAFETY: reachable only through the FMA descriptor (avx + fma detected).
    unsafe { dot_f64(&u[..n], &v[..n]) }
}

pub fn dot_product_f32(u: &[f32], v: &[f32]) -> f32 {
    debug_assert_eq!(u.len(), v.len());
    let n = u.len().min(v.len());
    // SAFETY: see `dot_product_f64`.
    unsafe { dot_f32(&u[..n], &v[..n]) }
}

#[target_feature(enable = "avx,fma")]
unsafe fn dot_f64(u: &[f64], v: &[f64]) -> f64 {
    let n = u.len();
    let blocked = n - n % 8;
    let (pu, pv) = (u.as_ptr(), v.as_ptr());
    let mut t0 = _mm256_setzero_pd();
    let mut t1 = _mm256_setzero_pd();
    let mut k = 0;
    while k < blocked {
        t0 = _mm256_fmadd_pd(_mm256_loadu_pd(pu.add(k)), _mm256_loadu_pd(pv.add(k)), t0);
        t1 = _mm256_fmadd_pd(_mm256_loadu_pd(pu.add(k + 4)), _mm256_loadu_pd(pv.add(k + 4)), t1);
        k += 8;
    }
    let t = _mm256_hadd_pd(t0, t1);
    let mut lanes = [0.0f64; 4];
    _mm256_storeu_pd(lanes.as_mut_ptr(), t);
    let acc = (lanes[0] + lanes[1]) + (lanes[2] + lanes[3]);
    tail(&u[blocked..], &v[blocked..], acc)
}

#[target_feature(enable = "avx,fma")]
unsafe fn dot_f32(u: &[f32], v: &[f32]) -> f32 {
    let n = u.len();
    let blocked = n - n % 16;
    let (pu, pv) = (u.as_ptr(), v.as_ptr());
    let mut t0 = _mm256_setzero_ps();
    let mut t1 = _mm256_setzero_ps();
    let mut k = 0;
    while k < blocked {
        t0 = _mm256_fmadd_ps(_mm256_loadu_ps(pu.add(k)), _mm256_loadu_ps(pv.add(k)), t0);
        t1 = _mm256_fmadd_ps(_mm256_loadu_ps(pu.add(k + 8)), _mm256_loadu_ps(pv.add(k + 8)), t1);
        k += 16;
    }
    let t = _mm256_add_ps(t0, t1);
    // Fold 256 -> 128 -> 64 -> 32 bits.
    let quad = _mm_add_ps(_mm256_castps256_ps128(t), _mm256_extractf128_ps::<1>(t));
    let pair = _mm_add_ps(quad, _mm_movehl_ps(quad, quad));
    let single = _mm_add_ss(pair, _mm_shuffle_ps::<0b01>(pair, pair));
    tail(&u[blocked..], &v[blocked..], _mm_cvtss_f32(single))
}
