//! 128-bit NEON dot products for aarch64.

use std::arch::aarch64::*;

use super::tail;

pub fn dot_product_f64(u: &[f64], v: &[f64]) -> f64 {
    debug_assert_eq!(u.len(), v.len());
    let n = u.len().min(v.len());
    // SAFETY: reachable only through the NEON descriptor (neon detected).
    unsafe { dot_f64(&u[..n], &v[..n]) }
}

pub fn dot_product_f32(u: &[f32], v: &[f32]) -> f32 {
    debug_assert_eq!(u.len(), v.len());
    let n = u.len().min(v.len());
    // SAFETY: see `dot_product_f64`.
    unsafe { dot_f32(&u[..n], &v[..n]) }
}

#[target_feature(enable = "neon")]
unsafe fn dot_f64(u: &[f64], v: &[f64]) -> f64 {
    let n = u.len();
    let blocked = n - n % 4;
    let (pu, pv) = (u.as_ptr(), v.as_ptr());
    let mut t0 = vdupq_n_f64(0.0);
    let mut t1 = vdupq_n_f64(0.0);
    let mut k = 0;
    while k < blocked {
        t0 = vfmaq_f64(t0, vld1q_f64(pu.add(k)), vld1q_f64(pv.add(k)));
        t1 = vfmaq_f64(t1, vld1q_f64(pu.add(k + 2)), vld1q_f64(pv.add(k + 2)));
        k += 4;
    }
    tail(&u[blocked..], &v[blocked..], vaddvq_f64(vaddq_f64(t0, t1)))
}

#[target_feature(enable = "neon")]
unsafe fn dot_f32(u: &[f32], v: &[f32]) -> f32 {
    let n = u.len();
    let blocked = n - n % 8;
    let (pu, pv) = (u.as_ptr(), v.as_ptr());
    let mut t0 = vdupq_n_f32(0.0);
    let mut t1 = vdupq_n_f32(0.0);
    let mut k = 0;
    while k < blocked {
        t0 = vfmaq_f32(t0, vld1q_f32(pu.add(k)), vld1q_f32(pv.add(k)));
        t1 = vfmaq_f32(t1, vld1q_f32(pu.add(k + 4)), vld1q_f32(pv.add(k + 4)));
        k += 8;
    }
    tail(&u[blocked..], &v[blocked..], vaddvq_f32(vaddq_f32(t0, t1)))
}
