//! Dimension handling shared by every kernel family: weight shaping and
//! the register-count cascade.
//!
//! Outputs are covered by blocks of `max`, `max / 2`, ... , 1 accumulator
//! registers; rows left over below one register are computed by a scalar
//! integer row dot product that saturates inputs the way the SIMD blocks
//! do. The input dimension is rounded up to the group
//! size, with zero weights in the padding.

use super::scalar::saturated_dot;
use super::{roundup, Geometry, QuantizedMatrix};

/// One ISA's register-blocked inner kernel.
pub(crate) trait BlockKernel {
    const GEOMETRY: Geometry;

    /// Computes `registers * num_outputs_per_register` outputs. `wi` is the
    /// shaped block (groups, then bias bytes), `u` the unpadded input and
    /// `num_in` the input length rounded up to a whole group.
    fn block(registers: usize, wi: &[i8], scales: &[f32], u: &[i8], num_in: usize, v: &mut [f32]);
}

/// Outputs that the register blocks cover; the rest go row by row.
#[inline]
fn blocked_outputs(geometry: &Geometry, num_out: usize) -> usize {
    num_out - num_out % geometry.num_outputs_per_register
}

/// Register counts of the cascade, widest first.
fn register_steps(geometry: &Geometry) -> impl Iterator<Item = usize> {
    std::iter::successors(Some(geometry.max_output_registers), |&r| (r > 1).then_some(r / 2))
}

pub(crate) fn shape(geometry: &Geometry, matrix: &QuantizedMatrix) -> Vec<i8> {
    let num_out = matrix.dim1();
    let num_in = matrix.num_inputs();
    let group = geometry.num_inputs_per_group;
    let rounded_num_in = roundup(num_in, group);
    let blocked = blocked_outputs(geometry, num_out);
    let mut shaped = Vec::with_capacity(blocked * (rounded_num_in + 1) + (num_out - blocked) * matrix.dim2());

    let mut output = 0;
    for registers in register_steps(geometry) {
        let set = registers * geometry.num_outputs_per_register;
        while output + set <= blocked {
            for input in (0..rounded_num_in).step_by(group) {
                for j in 0..set {
                    for i in 0..group {
                        let c = input + i;
                        shaped.push(if c < num_in { matrix.get(output + j, c) } else { 0 });
                    }
                }
            }
            shaped.extend((0..set).map(|j| matrix.bias(output + j)));
            output += set;
        }
    }
    for r in output..num_out {
        shaped.extend_from_slice(matrix.row(r));
    }
    shaped
}

pub(crate) fn matrix_dot_vector<K: BlockKernel>(
    dim1: usize,
    dim2: usize,
    wi: &[i8],
    scales: &[f32],
    u: &[i8],
    v: &mut [f32],
) {
    let geometry = K::GEOMETRY;
    let num_in = dim2 - 1;
    let rounded_num_in = roundup(num_in, geometry.num_inputs_per_group);
    let blocked = blocked_outputs(&geometry, dim1);
    let u = &u[..num_in];
    debug_assert!(v.len() >= dim1);

    let mut output = 0;
    let mut w = 0;
    for registers in register_steps(&geometry) {
        let set = registers * geometry.num_outputs_per_register;
        let w_step = (rounded_num_in + 1) * set;
        while output + set <= blocked {
            K::block(
                registers,
                &wi[w..w + w_step],
                &scales[output..output + set],
                u,
                rounded_num_in,
                &mut v[output..output + set],
            );
            output += set;
            w += w_step;
        }
    }
    for r in output..dim1 {
        let row = &wi[w..w + dim2];
        let total = saturated_dot(&row[..num_in], u) + i32::from(row[num_in]);
        v[r] = total as f32 * scales[r];
        w += dim2;
    }
}
