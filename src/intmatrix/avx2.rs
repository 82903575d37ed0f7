//! 256-bit kernel: 8 outputs per register, up to 8 registers (64 outputs
//! per block), 32 inputs per load broadcast 4 at a time.

use std::arch::x86_64::*;

use super::cascade::BlockKernel;
use super::Geometry;

const OUTPUTS: usize = 8;
const INPUTS: usize = 32;
const GROUP: usize = 4;
const GROUPS: usize = INPUTS / GROUP;

pub(crate) struct Avx2;

impl BlockKernel for Avx2 {
    const GEOMETRY: Geometry = Geometry {
        num_outputs_per_register: OUTPUTS,
        max_output_registers: 8,
        num_inputs_per_register: INPUTS,
        num_inputs_per_group: GROUP,
    };

    fn block(registers: usize, wi: &[i8], scales: &[f32], u: &[i8], num_in: usize, v: &mut [f32]) {
        // SAFETY: the AVX2 descriptor is only selected when avx2 is present.
        unsafe {
            match registers {
                8 => partial::<8>(wi, scales, u, num_in, v),
                4 => partial::<4>(wi, scales, u, num_in, v),
                2 => partial::<2>(wi, scales, u, num_in, v),
                1 => partial::<1>(wi, scales, u, num_in, v),
                _ => unreachable!("register count {registers}"),
            }
        }
    }
}

#[target_feature(enable = "avx2")]
#[inline]
pub(super) unsafe fn saturate(inputs: __m256i) -> __m256i { _mm256_max_epi8(inputs, _mm256_set1_epi8(-127)) }

/// `(|w|, inputs with the sign of w)`.
#[target_feature(enable = "avx2")]
#[inline]
pub(super) unsafe fn sign_split(inputs: __m256i, weights: __m256i) -> (__m256i, __m256i) {
    (_mm256_sign_epi8(weights, weights), _mm256_sign_epi8(inputs, weights))
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn load_inputs(u: &[i8], j: usize) -> __m256i {
    let inputs = if j + INPUTS <= u.len() {
        _mm256_loadu_si256(u.as_ptr().add(j) as *const __m256i)
    } else {
        let mut buf = [0i8; INPUTS];
        let avail = u.len().saturating_sub(j);
        buf[..avail].copy_from_slice(&u[j..j + avail]);
        _mm256_loadu_si256(buf.as_ptr() as *const __m256i)
    };
    saturate(inputs)
}

/// One set of 4×8 products of inputs and weights, added to `result`.
#[target_feature(enable = "avx2")]
#[inline]
unsafe fn multiply_group(rep_input: __m256i, ones: __m256i, wi: &[i8], result: &mut __m256i) {
    let weights = _mm256_loadu_si256(wi.as_ptr() as *const __m256i);
    let (magnitudes, reps) = sign_split(rep_input, weights);
    let pairs = _mm256_maddubs_epi16(magnitudes, reps);
    *result = _mm256_add_epi32(*result, _mm256_madd_epi16(pairs, ones));
}

#[target_feature(enable = "avx2")]
#[inline]
unsafe fn extract_results(result: __m256i, bias: &[i8], scales: &[f32], v: &mut [f32]) {
    debug_assert!(bias.len() >= OUTPUTS && scales.len() >= OUTPUTS && v.len() >= OUTPUTS);
    let bias = _mm256_cvtepi8_epi32(_mm_loadl_epi64(bias.as_ptr() as *const __m128i));
    let total = _mm256_add_epi32(result, bias);
    let out = _mm256_mul_ps(_mm256_cvtepi32_ps(total), _mm256_loadu_ps(scales.as_ptr()));
    _mm256_storeu_ps(v.as_mut_ptr(), out);
}

#[target_feature(enable = "avx2")]
unsafe fn partial<const REGS: usize>(wi: &[i8], scales: &[f32], u: &[i8], num_in: usize, v: &mut [f32]) {
    let ones = _mm256_set1_epi16(1);
    let shift_id = _mm256_set_epi32(0, 7, 6, 5, 4, 3, 2, 1);
    let mut results = [_mm256_setzero_si256(); REGS];
    let mut w = 0;
    let mut j = 0;
    while j < num_in {
        let mut inputs = load_inputs(u, j);
        let mut ig = 0;
        while ig < GROUPS && j < num_in {
            // Replicate the low 4 inputs into every 32-bit lane, then rotate
            // the register so the next 4 are at the bottom.
            let rep_input = _mm256_broadcastd_epi32(_mm256_castsi256_si128(inputs));
            inputs = _mm256_permutevar8x32_epi32(inputs, shift_id);
            for result in results.iter_mut() {
                multiply_group(rep_input, ones, &wi[w..w + OUTPUTS * GROUP], result);
                w += OUTPUTS * GROUP;
            }
            ig += 1;
            j += GROUP;
        }
    }
    for (r, &result) in results.iter().enumerate() {
        let o = r * OUTPUTS;
        extract_results(result, &wi[w + o..], &scales[o..], &mut v[o..]);
    }
}
