//! 512-bit AVX-512F dot products.

use std::arch::x86_64::*;

use super::tail;

pub fn dot_product_f64(u: &[f64], v: &[f64]) -> f64 {
    debug_assert_eq!(u.len(), v.len());
    let n = u.len().min(v.len());
    // SAFETY: reachable only through the AVX-512 descriptor (avx512f detected).
    unsafe { dot_f64(&u[..n], &v[..n]) }
}

pub fn dot_product_f32(u: &[f32], v: &[f32]) -> f32 {
    debug_assert_eq!(u.len(), v.len());
    let n = u.len().min(v.len());
    // SAFETY: see `dot_product_f64`.
    unsafe { dot_f32(&u[..n], &v[..n]) }
}

#[target_feature(enable = "avx512f")]
unsafe fn dot_f64(u: &[f64], v: &[f64]) -> f64 {
    let n = u.len();
    let blocked = n - n % 16;
    let (pu, pv) = (u.as_ptr(), v.as_ptr());
    let mut t0 = _mm512_setzero_pd();
    let mut t1 = _mm512_setzero_pd();
    let mut k = 0;
    while k < blocked {
        t0 = _mm512_fmadd_pd(_mm512_loadu_pd(pu.add(k)), _mm512_loadu_pd(pv.add(k)), t0);
        t1 = _mm512_fmadd_pd(_mm512_loadu_pd(pu.add(k + 8)), _mm512_loadu_pd(pv.add(k + 8)), t1);
        k += 16;
    }
    let acc = _mm512_reduce_add_pd(_mm512_add_pd(t0, t1));
    tail(&u[blocked..], &v[blocked..], acc)
}

#[target_feature(enable = "avx512f")]
unsafe fn dot_f32(u: &[f32], v: &[f32]) -> f32 {
    let n = u.len();
    let blocked = n - n % 32;
    let (pu, pv) = (u.as_ptr(), v.as_ptr());
    let mut t0 = _mm512_setzero_ps();
    let mut t1 = _mm512_setzero_ps();
    let mut k = 0;
    while k < blocked {
        t0 = _mm512_fmadd_ps(_mm512_loadu_ps(pu.add(k)), _mm512_loadu_ps(pv.add(k)), t0);
        t1 = _mm512_fmadd_ps(_mm512_loadu_ps(pu.add(k + 16)), _mm512_loadu_ps(pv.add(k + 16)), t1);
        k += 32;
    }
    let acc = _mm512_reduce_add_ps(_mm512_add_ps(t0, t1));
    tail(&u[blocked..], &v[blocked..], acc)
}
