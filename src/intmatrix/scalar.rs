//! Scalar reference kernel. Its shaped layout is plain row-major, so it
//! also runs directly on [`QuantizedMatrix::weights`](super::QuantizedMatrix::weights).

use super::cascade::BlockKernel;
use super::signmul::saturate_input;
use super::Geometry;

/// Integer dot product of two byte vectors over their common length.
#[inline]
pub fn int_dot_product(u: &[i8], v: &[i8]) -> i32 {
    debug_assert_eq!(u.len(), v.len());
    u.iter().zip(v).map(|(&a, &b)| i32::from(a) * i32::from(b)).sum()
}

/// Row dot as the kernels see it: inputs of `-128` read as `-127`.
#[inline]
pub(crate) fn saturated_dot(w: &[i8], u: &[i8]) -> i32 {
    debug_assert_eq!(w.len(), u.len());
    w.iter().zip(u).map(|(&a, &b)| i32::from(a) * i32::from(saturate_input(b))).sum()
}

pub(crate) struct Scalar;

impl BlockKernel for Scalar {
    const GEOMETRY: Geometry = Geometry {
        num_outputs_per_register: 1,
        max_output_registers: 1,
        num_inputs_per_register: 1,
        num_inputs_per_group: 1,
    };

    fn block(registers: usize, wi: &[i8], scales: &[f32], u: &[i8], num_in: usize, v: &mut [f32]) {
        debug_assert_eq!(registers, 1);
        let total = saturated_dot(&wi[..num_in], u) + i32::from(wi[num_in]);
        v[0] = total as f32 * scales[0];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_dot_handles_extremes() {
        assert_eq!(int_dot_product(&[], &[]), 0);
        assert_eq!(int_dot_product(&[-128, 127], &[-128, 127]), 16384 + 16129);
    }

    #[test]
    fn saturated_dot_clamps_only_inputs() {
        assert_eq!(saturated_dot(&[-128, 127], &[-128, 127]), 16256 + 16129);
        assert_eq!(saturated_dot(&[-128, -1], &[1, -128]), -128 + 127);
    }
}
