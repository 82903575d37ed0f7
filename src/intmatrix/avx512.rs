//! 512-bit kernel: 16 outputs per register, up to 8 registers (128 outputs
//! per block), 64 inputs per load broadcast 4 at a time.
//!
//! AVX-512 has no byte `sign` instruction, so the conditional negation is
//! done with mask registers: negate where the weight is negative, zero
//! where it is zero.

use std::arch::x86_64::*;

use super::cascade::BlockKernel;
use super::Geometry;

const OUTPUTS: usize = 16;
const INPUTS: usize = 64;
const GROUP: usize = 4;
const GROUPS: usize = INPUTS / GROUP;

pub(crate) struct Avx512;

impl BlockKernel for Avx512 {
    const GEOMETRY: Geometry = Geometry {
        num_outputs_per_register: OUTPUTS,
        max_output_registers: 8,
        num_inputs_per_register: INPUTS,
        num_inputs_per_group: GROUP,
    };

    fn block(registers: usize, wi: &[i8], scales: &[f32], u: &[i8], num_in: usize, v: &mut [f32]) {
        // SAFETY: the AVX-512 descriptor requires avx512f and avx512bw.
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

#[target_feature(enable = "avx512f,avx512bw")]
#[inline]
pub(super) unsafe fn saturate(inputs: __m512i) -> __m512i { _mm512_max_epi8(inputs, _mm512_set1_epi8(-127)) }

#[target_feature(enable = "avx512f,avx512bw")]
#[inline]
unsafe fn load_inputs(u: &[i8], j: usize) -> __m512i {
    let inputs = if j + INPUTS <= u.len() {
        _mm512_loadu_epi8(u.as_ptr().add(j))
    } else {
        let mut buf = [0i8; INPUTS];
        let avail = u.len().saturating_sub(j);
        buf[..avail].copy_from_slice(&u[j..j + avail]);
        _mm512_loadu_epi8(buf.as_ptr())
    };
    saturate(inputs)
}

/// `sign_epi8(a, b)` built from masks.
#[target_feature(enable = "avx512f,avx512bw")]
#[inline]
unsafe fn sign_epi8(a: __m512i, b: __m512i) -> __m512i {
    let zero = _mm512_setzero_si512();
    let negative = _mm512_movepi8_mask(b);
    let nonzero = _mm512_cmpneq_epi8_mask(b, zero);
    let flipped = _mm512_mask_sub_epi8(a, negative, zero, a);
    _mm512_maskz_mov_epi8(nonzero, flipped)
}

#[target_feature(enable = "avx512f,avx512bw")]
#[inline]
pub(super) unsafe fn sign_split(inputs: __m512i, weights: __m512i) -> (__m512i, __m512i) {
    (_mm512_abs_epi8(weights), sign_epi8(inputs, weights))
}

#[target_feature(enable = "avx512f,avx512bw")]
#[inline]
unsafe fn multiply_group(rep_input: __m512i, ones: __m512i, wi: &[i8], result: &mut __m512i) {
    let weights = _mm512_loadu_epi8(wi.as_ptr());
    let (magnitudes, reps) = sign_split(rep_input, weights);
    let pairs = _mm512_maddubs_epi16(magnitudes, reps);
    *result = _mm512_add_epi32(*result, _mm512_madd_epi16(pairs, ones));
}

#[target_feature(enable = "avx512f,avx512bw")]
#[inline]
unsafe fn extract_results(result: __m512i, bias: &[i8], scales: &[f32], v: &mut [f32]) {
    debug_assert!(bias.len() >= OUTPUTS && scales.len() >= OUTPUTS && v.len() >= OUTPUTS);
    let bias = _mm512_cvtepi8_epi32(_mm_loadu_si128(bias.as_ptr() as *const __m128i));
    let total = _mm512_add_epi32(result, bias);
    let out = _mm512_mul_ps(_mm512_cvtepi32_ps(total), _mm512_loadu_ps(scales.as_ptr()));
    _mm512_storeu_ps(v.as_mut_ptr(), out);
}

#[target_feature(enable = "avx512f,avx512bw")]
unsafe fn partial<const REGS: usize>(wi: &[i8], scales: &[f32], u: &[i8], num_in: usize, v: &mut [f32]) {
    let ones = _mm512_set1_epi16(1);
    let shift_id = _mm512_set_epi32(0, 15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1);
    let mut results = [_mm512_setzero_si512(); REGS];
    let mut w = 0;
    let mut j = 0;
    while j < num_in {
        let mut inputs = load_inputs(u, j);
        let mut ig = 0;
        while ig < GROUPS && j < num_in {
            let rep_input = _mm512_broadcastd_epi32(_mm512_castsi512_si128(inputs));
            inputs = _mm512_permutexvar_epi32(shift_id, inputs);
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
