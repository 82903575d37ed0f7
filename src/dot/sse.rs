//! 128-bit SSE dot products: two lanes per register for `f64`, four for
//! `f32`, two accumulators each.

use std::arch::x86_64::*;

use super::tail;

pub fn dot_product_f64(u: &[f64], v: &[f64]) -> f64 {
    debug_assert_eq!(u.len(), v.len());
    let n = u.len().min(v.len());
    // SAFETY: reachable only through the SSE descriptor, which the registry
    // hands out after detecting sse4.1.
    unsafe { dot_f64(&u[..n], &v[..n]) }
}

pub fn dot_product_f32(u: &[f32], v: &[f32]) -> f32 {
    debug_assert_eq!(u.len(), v.len());
    let n = u.len().min(v.len());
    // SAFETY: see `dot_product_f64`.
    unsafe { dot_f32(&u[..n], &v[..n]) }
}

#[target_feature(enable = "sse4.1")]
unsafe fn dot_f64(u: &[f64], v: &[f64]) -> f64 {
    let n = u.len();
    let blocked = n - n % 4;
    let (pu, pv) = (u.as_ptr(), v.as_ptr());
    let mut t0 = _mm_setzero_pd();
    let mut t1 = _mm_setzero_pd();
    let mut k = 0;
    while k < blocked {
        let f0 = _mm_mul_pd(_mm_loadu_pd(pu.add(k)), _mm_loadu_pd(pv.add(k)));
        t0 = _mm_add_pd(t0, f0);
        let f1 = _mm_mul_pd(_mm_loadu_pd(pu.add(k + 2)), _mm_loadu_pd(pv.add(k + 2)));
        t1 = _mm_add_pd(t1, f1);
        k += 4;
    }
    let t = _mm_hadd_pd(t0, t1);
    let mut lanes = [0.0f64; 2];
    _mm_storeu_pd(lanes.as_mut_ptr(), t);
    tail(&u[blocked..], &v[blocked..], lanes[0] + lanes[1])
}

#[target_feature(enable = "sse4.1")]
unsafe fn dot_f32(u: &[f32], v: &[f32]) -> f32 {
    let n = u.len();
    let blocked = n - n % 8;
    let (pu, pv) = (u.as_ptr(), v.as_ptr());
    let mut t0 = _mm_setzero_ps();
    let mut t1 = _mm_setzero_ps();
    let mut k = 0;
    while k < blocked {
        let f0 = _mm_mul_ps(_mm_loadu_ps(pu.add(k)), _mm_loadu_ps(pv.add(k)));
        t0 = _mm_add_ps(t0, f0);
        let f1 = _mm_mul_ps(_mm_loadu_ps(pu.add(k + 4)), _mm_loadu_ps(pv.add(k + 4)));
        t1 = _mm_add_ps(t1, f1);
        k += 8;
    }
    let t = _mm_hadd_ps(t0, t1);
    let mut lanes = [0.0f32; 4];
    _mm_storeu_ps(lanes.as_mut_ptr(), t);
    let acc = (lanes[0] + lanes[1]) + (lanes[2] + lanes[3]);
    tail(&u[blocked..], &v[blocked..], acc)
}
