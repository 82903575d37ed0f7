//! NEON kernel with the 128-bit x86 layout: 4 outputs per register, up to
//! 8 registers, 16 inputs per load in groups of 4. NEON has a signed
//! widening multiply, so no sign trick is needed.

use std::arch::aarch64::*;

use super::cascade::BlockKernel;
use super::signmul::saturate_input;
use super::Geometry;

const OUTPUTS: usize = 4;
const INPUTS: usize = 16;
const GROUP: usize = 4;

pub(crate) struct Neon;

impl BlockKernel for Neon {
    const GEOMETRY: Geometry = Geometry {
        num_outputs_per_register: OUTPUTS,
        max_output_registers: 8,
        num_inputs_per_register: INPUTS,
        num_inputs_per_group: GROUP,
    };

    fn block(registers: usize, wi: &[i8], scales: &[f32], u: &[i8], num_in: usize, v: &mut [f32]) {
        // SAFETY: the NEON descriptor is only selected when neon is present.
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

/// The 4 saturated inputs starting at `j` as one little-endian word, zero
/// past `u`.
#[inline]
fn group_word(u: &[i8], j: usize) -> i32 {
    let mut bytes = [0u8; GROUP];
    for (i, b) in bytes.iter_mut().enumerate() {
        if let Some(&x) = u.get(j + i) {
            *b = saturate_input(x) as u8;
        }
    }
    i32::from_le_bytes(bytes)
}

#[target_feature(enable = "neon")]
#[inline]
unsafe fn multiply_group(rep_input: int8x16_t, wi: &[i8], result: &mut int32x4_t) {
    let weights = vld1q_s8(wi.as_ptr());
    // Outputs 0-1 in the low half, 2-3 in the high half, 4 products each.
    let lo = vpaddlq_s16(vmull_s8(vget_low_s8(weights), vget_low_s8(rep_input)));
    let hi = vpaddlq_s16(vmull_high_s8(weights, rep_input));
    *result = vaddq_s32(*result, vpaddq_s32(lo, hi));
}

#[target_feature(enable = "neon")]
#[inline]
unsafe fn extract_results(result: int32x4_t, bias: &[i8], scales: &[f32], v: &mut [f32]) {
    debug_assert!(bias.len() >= OUTPUTS && scales.len() >= OUTPUTS && v.len() >= OUTPUTS);
    let bias = [i32::from(bias[0]), i32::from(bias[1]), i32::from(bias[2]), i32::from(bias[3])];
    let total = vaddq_s32(result, vld1q_s32(bias.as_ptr()));
    let out = vmulq_f32(vcvtq_f32_s32(total), vld1q_f32(scales.as_ptr()));
    vst1q_f32(v.as_mut_ptr(), out);
}

#[target_feature(enable = "neon")]
unsafe fn partial<const REGS: usize>(wi: &[i8], scales: &[f32], u: &[i8], num_in: usize, v: &mut [f32]) {
    let mut results = [vdupq_n_s32(0); REGS];
    let mut w = 0;
    let mut j = 0;
    while j < num_in {
        let rep_input = vreinterpretq_s8_s32(vdupq_n_s32(group_word(u, j)));
        for result in results.iter_mut() {
            multiply_group(rep_input, &wi[w..w + OUTPUTS * GROUP], result);
            w += OUTPUTS * GROUP;
        }
        j += GROUP;
    }
    for (r, &result) in results.iter().enumerate() {
        let o = r * OUTPUTS;
        extract_results(result, &wi[w + o..], &scales[o..], &mut v[o..]);
    }
}
