//! 128-bit kernel: 4 outputs per register, up to 8 registers, 16 inputs
//! per load broadcast 4 at a time.

use std::arch::x86_64::*;

use super::cascade::BlockKernel;
use super::Geometry;

const OUTPUTS: usize = 4;
const INPUTS: usize = 16;
const GROUP: usize = 4;
const GROUPS: usize = INPUTS / GROUP;

pub(crate) struct Sse;

impl BlockKernel for Sse {
    const GEOMETRY: Geometry = Geometry {
        num_outputs_per_register: OUTPUTS,
        max_output_registers: 8,
        num_inputs_per_register: INPUTS,
        num_inputs_per_group: GROUP,
    };

    fn block(registers: usize, wi: &[i8], scales: &[f32], u: &[i8], num_in: usize, v: &mut [f32]) {
        // SAFETY: the SSE descriptor is only selected with ssse3 and sse4.1.
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

/// Clamps `-128` input bytes to `-127`; `sign_epi8` cannot negate `-128`.
#[target_feature(enable = "ssse3,sse4.1")]
#[inline]
pub(super) unsafe fn saturate(inputs: __m128i) -> __m128i { _mm_max_epi8(inputs, _mm_set1_epi8(-127)) }

/// Operands for `maddubs`: `|w|` as unsigned bytes and the inputs carrying
/// the sign of `w` (zero where `w` is zero).
#[target_feature(enable = "ssse3,sse4.1")]
#[inline]
pub(super) unsafe fn sign_split(inputs: __m128i, weights: __m128i) -> (__m128i, __m128i) {
    (_mm_sign_epi8(weights, weights), _mm_sign_epi8(inputs, weights))
}

/// One register of saturated inputs starting at `j`, zero-filled past the
/// end of `u`.
#[target_feature(enable = "ssse3,sse4.1")]
#[inline]
unsafe fn load_inputs(u: &[i8], j: usize) -> __m128i {
    let inputs = if j + INPUTS <= u.len() {
        _mm_loadu_si128(u.as_ptr().add(j) as *const __m128i)
    } else {
        let mut buf = [0i8; INPUTS];
        let avail = u.len().saturating_sub(j);
        buf[..avail].copy_from_slice(&u[j..j + avail]);
        _mm_loadu_si128(buf.as_ptr() as *const __m128i)
    };
    saturate(inputs)
}

/// 4 inputs × 4 outputs, accumulated into `result`.
#[target_feature(enable = "ssse3,sse4.1")]
#[inline]
unsafe fn multiply_group(rep_input: __m128i, ones: __m128i, wi: &[i8], result: &mut __m128i) {
    let weights = _mm_loadu_si128(wi.as_ptr() as *const __m128i);
    let (magnitudes, reps) = sign_split(rep_input, weights);
    let pairs = _mm_maddubs_epi16(magnitudes, reps);
    *result = _mm_add_epi32(*result, _mm_madd_epi16(pairs, ones));
}

#[target_feature(enable = "ssse3,sse4.1")]
#[inline]
unsafe fn extract_results(result: __m128i, bias: &[i8], scales: &[f32], v: &mut [f32]) {
    debug_assert!(bias.len() >= OUTPUTS && scales.len() >= OUTPUTS && v.len() >= OUTPUTS);
    let word = i32::from_le_bytes([bias[0] as u8, bias[1] as u8, bias[2] as u8, bias[3] as u8]);
    let total = _mm_add_epi32(result, _mm_cvtepi8_epi32(_mm_cvtsi32_si128(word)));
    let out = _mm_mul_ps(_mm_cvtepi32_ps(total), _mm_loadu_ps(scales.as_ptr()));
    _mm_storeu_ps(v.as_mut_ptr(), out);
}

#[target_feature(enable = "ssse3,sse4.1")]
unsafe fn partial<const REGS: usize>(wi: &[i8], scales: &[f32], u: &[i8], num_in: usize, v: &mut [f32]) {
    let ones = _mm_set1_epi16(1);
    let mut results = [_mm_setzero_si128(); REGS];
    let mut w = 0;
    let mut j = 0;
    while j < num_in {
        let mut inputs = load_inputs(u, j);
        let mut ig = 0;
        while ig < GROUPS && j < num_in {
            let rep_input = _mm_shuffle_epi32::<0>(inputs);
            // Rotate the next four inputs into the low lane.
            inputs = _mm_shuffle_epi32::<0x39>(inputs);
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
