//! Signed×signed products built from an unsigned×signed multiply.
//!
//! x86 only offers `u8 × i8` multiply-add for bytes (`pmaddubsw`). The
//! signed product `w * x` is recovered as `|w| * (x with the sign of w)`,
//! where a zero `w` zeroes the other operand instead of flipping it.
//!
//! [`emulated`] widens before negating and is exact for every pair. The
//! byte lanes of the SIMD kernels cannot negate an input of `-128`, so the
//! kernels first saturate inputs to `[-127, 127]` ([`saturate_input`]);
//! [`kernel_product`] is the product they compute. Weights of `-128` stay
//! exact since `|w|` is read as an unsigned byte. The SIMD paths below run
//! the matrix kernels' own operand preparation, one product per lane.

/// Naive widening product; the ground truth for the emulation.
#[inline]
pub fn reference(w: i8, x: i8) -> i16 { i16::from(w) * i16::from(x) }

/// How every kernel reads an input byte: `-128` becomes `-127`.
#[inline]
pub fn saturate_input(x: i8) -> i8 { x.max(-i8::MAX) }

/// `x` negated when `w < 0`, zeroed when `w == 0`, kept otherwise.
#[inline]
pub fn apply_sign(x: i8, w: i8) -> i16 {
    match w.signum() {
        0 => 0,
        1 => i16::from(x),
        _ => -i16::from(x),
    }
}

/// Unsigned magnitude times signed value, the shape of `pmaddubsw`.
#[inline]
fn unsigned_signed_mul(magnitude: u8, signed: i16) -> i16 { i16::from(magnitude) * signed }

/// Signed product via absolute value and conditional negation.
#[inline]
pub fn emulated(w: i8, x: i8) -> i16 { unsigned_signed_mul(w.unsigned_abs(), apply_sign(x, w)) }

/// The product the matrix kernels compute: [`emulated`] on a saturated
/// input.
#[inline]
pub fn kernel_product(w: i8, x: i8) -> i16 { emulated(w, saturate_input(x)) }

pub type SignMulSliceFn = fn(&[i8], &[i8], &mut [i16]);

/// A slice-wide implementation of [`kernel_product`].
#[derive(Debug)]
pub struct SignMulPath {
    pub name: &'static str,
    pub requires: &'static [crate::detect::Feature],
    pub run: SignMulSliceFn,
}

/// Element-wise [`kernel_product`] over the common length of the inputs.
pub fn kernel_product_slice(w: &[i8], x: &[i8], out: &mut [i16]) {
    for ((o, &a), &b) in out.iter_mut().zip(w).zip(x) {
        *o = kernel_product(a, b);
    }
}

pub static SCALAR_PATH: SignMulPath = SignMulPath { name: "scalar", requires: &[], run: kernel_product_slice };

#[cfg(all(target_arch = "x86_64", feature = "simd-sse"))]
pub(crate) static SSE_PATH: SignMulPath = SignMulPath {
    name: "sse",
    requires: &[crate::detect::Feature::Ssse3, crate::detect::Feature::Sse41],
    run: x86::sign_mul_sse,
};

#[cfg(all(target_arch = "x86_64", feature = "simd-avx2"))]
pub(crate) static AVX2_PATH: SignMulPath = SignMulPath {
    name: "avx2",
    requires: &[crate::detect::Feature::Avx2],
    run: x86::sign_mul_avx2,
};

#[cfg(all(target_arch = "x86_64", feature = "simd-avx512"))]
pub(crate) static AVX512_PATH: SignMulPath = SignMulPath {
    name: "avx512",
    requires: &[crate::detect::Feature::Avx512F, crate::detect::Feature::Avx512Bw],
    run: x86::sign_mul_avx512,
};

/// Compiled-in paths the host can run.
pub fn runnable_paths() -> Vec<&'static SignMulPath> {
    let host = crate::detect::Capabilities::host();
    let mut all: Vec<&'static SignMulPath> = vec![&SCALAR_PATH];
    #[cfg(all(target_arch = "x86_64", feature = "simd-sse"))]
    all.push(&SSE_PATH);
    #[cfg(all(target_arch = "x86_64", feature = "simd-avx2"))]
    all.push(&AVX2_PATH);
    #[cfg(all(target_arch = "x86_64", feature = "simd-avx512"))]
    all.push(&AVX512_PATH);
    all.into_iter().filter(|p| host.has_all(p.requires)).collect()
}

#[cfg(all(target_arch = "x86_64", any(feature = "simd-sse", feature = "simd-avx2", feature = "simd-avx512")))]
mod x86 {
    use std::arch::x86_64::*;

    /// One register of bytes, zero past the end of `s`.
    fn pad<const N: usize>(s: &[i8]) -> [i8; N] {
        let mut buf = [0i8; N];
        buf[..s.len()].copy_from_slice(s);
        buf
    }

    /// `unpacklo`/`unpackhi` work per 128-bit lane: `lo` holds bytes 0-7 of
    /// each lane, `hi` bytes 8-15. Puts the products back in input order.
    fn deinterleave(lo: &[i16], hi: &[i16], out: &mut [i16]) {
        for lane in 0..lo.len() / 8 {
            for i in 0..8 {
                if let Some(o) = out.get_mut(16 * lane + i) {
                    *o = lo[8 * lane + i];
                }
                if let Some(o) = out.get_mut(16 * lane + 8 + i) {
                    *o = hi[8 * lane + i];
                }
            }
        }
    }

    #[cfg(feature = "simd-sse")]
    pub fn sign_mul_sse(w: &[i8], x: &[i8], out: &mut [i16]) {
        let n = w.len().min(x.len()).min(out.len());
        // SAFETY: only reachable through SSE_PATH after ssse3/sse4.1 detection.
        unsafe { sse(&w[..n], &x[..n], &mut out[..n]) }
    }

    #[cfg(feature = "simd-avx2")]
    pub fn sign_mul_avx2(w: &[i8], x: &[i8], out: &mut [i16]) {
        let n = w.len().min(x.len()).min(out.len());
        // SAFETY: only reachable through AVX2_PATH after avx2 detection.
        unsafe { avx2(&w[..n], &x[..n], &mut out[..n]) }
    }

    #[cfg(feature = "simd-avx512")]
    pub fn sign_mul_avx512(w: &[i8], x: &[i8], out: &mut [i16]) {
        let n = w.len().min(x.len()).min(out.len());
        // SAFETY: only reachable through AVX512_PATH after avx512f/bw detection.
        unsafe { avx512(&w[..n], &x[..n], &mut out[..n]) }
    }

    // Each lane pairs a product with a zero byte, so `maddubs` yields the
    // single product.

    #[cfg(feature = "simd-sse")]
    #[target_feature(enable = "ssse3,sse4.1")]
    unsafe fn sse(w: &[i8], x: &[i8], out: &mut [i16]) {
        use crate::intmatrix::sse::{saturate, sign_split};
        let zero = _mm_setzero_si128();
        for ((w, x), out) in w.chunks(16).zip(x.chunks(16)).zip(out.chunks_mut(16)) {
            let (wb, xb) = (pad::<16>(w), pad::<16>(x));
            let weights = _mm_loadu_si128(wb.as_ptr() as *const __m128i);
            let inputs = saturate(_mm_loadu_si128(xb.as_ptr() as *const __m128i));
            let (magnitudes, reps) = sign_split(inputs, weights);
            let lo = _mm_maddubs_epi16(_mm_unpacklo_epi8(magnitudes, zero), _mm_unpacklo_epi8(reps, zero));
            let hi = _mm_maddubs_epi16(_mm_unpackhi_epi8(magnitudes, zero), _mm_unpackhi_epi8(reps, zero));
            let (mut l, mut h) = ([0i16; 8], [0i16; 8]);
            _mm_storeu_si128(l.as_mut_ptr() as *mut __m128i, lo);
            _mm_storeu_si128(h.as_mut_ptr() as *mut __m128i, hi);
            deinterleave(&l, &h, out);
        }
    }

    #[cfg(feature = "simd-avx2")]
    #[target_feature(enable = "avx2")]
    unsafe fn avx2(w: &[i8], x: &[i8], out: &mut [i16]) {
        use crate::intmatrix::avx2::{saturate, sign_split};
        let zero = _mm256_setzero_si256();
        for ((w, x), out) in w.chunks(32).zip(x.chunks(32)).zip(out.chunks_mut(32)) {
            let (wb, xb) = (pad::<32>(w), pad::<32>(x));
            let weights = _mm256_loadu_si256(wb.as_ptr() as *const __m256i);
            let inputs = saturate(_mm256_loadu_si256(xb.as_ptr() as *const __m256i));
            let (magnitudes, reps) = sign_split(inputs, weights);
            let lo = _mm256_maddubs_epi16(_mm256_unpacklo_epi8(magnitudes, zero), _mm256_unpacklo_epi8(reps, zero));
            let hi = _mm256_maddubs_epi16(_mm256_unpackhi_epi8(magnitudes, zero), _mm256_unpackhi_epi8(reps, zero));
            let (mut l, mut h) = ([0i16; 16], [0i16; 16]);
            _mm256_storeu_si256(l.as_mut_ptr() as *mut __m256i, lo);
            _mm256_storeu_si256(h.as_mut_ptr() as *mut __m256i, hi);
            deinterleave(&l, &h, out);
        }
    }

    #[cfg(feature = "simd-avx512")]
    #[target_feature(enable = "avx512f,avx512bw")]
    unsafe fn avx512(w: &[i8], x: &[i8], out: &mut [i16]) {
        use crate::intmatrix::avx512::{saturate, sign_split};
        let zero = _mm512_setzero_si512();
        for ((w, x), out) in w.chunks(64).zip(x.chunks(64)).zip(out.chunks_mut(64)) {
            let (wb, xb) = (pad::<64>(w), pad::<64>(x));
            let weights = _mm512_loadu_epi8(wb.as_ptr());
            let inputs = saturate(_mm512_loadu_epi8(xb.as_ptr()));
            let (magnitudes, reps) = sign_split(inputs, weights);
            let lo = _mm512_maddubs_epi16(_mm512_unpacklo_epi8(magnitudes, zero), _mm512_unpacklo_epi8(reps, zero));
            let hi = _mm512_maddubs_epi16(_mm512_unpackhi_epi8(magnitudes, zero), _mm512_unpackhi_epi8(reps, zero));
            let (mut l, mut h) = ([0i16; 32], [0i16; 32]);
            _mm512_storeu_epi16(l.as_mut_ptr(), lo);
            _mm512_storeu_epi16(h.as_mut_ptr(), hi);
            deinterleave(&l, &h, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_weight_zeroes_the_other_operand() {
        assert_eq!(apply_sign(-128, 0), 0);
        assert_eq!(apply_sign(5, -3), -5);
        assert_eq!(emulated(0, 0), 0);
        assert_eq!(emulated(-128, 127), -16256);
        assert_eq!(emulated(-128, -128), 16384);
    }

    #[test]
    fn kernel_product_saturates_the_input() {
        assert_eq!(saturate_input(-128), -127);
        assert_eq!(saturate_input(-127), -127);
        assert_eq!(kernel_product(-1, -128), 127);
        assert_eq!(kernel_product(-128, -128), 16256);
        assert_eq!(kernel_product(-128, 5), -640);
    }
}
