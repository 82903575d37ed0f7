//! Matrix × vector over many timesteps at once.
//!
//! Inputs and outputs are flat row-major buffers: timestep `t` reads
//! `inputs[t * num_inputs..]` and writes `outputs[t * dim1..]`. Timesteps
//! are independent, so they run in parallel on the rayon pool.

use log::trace;
use rayon::prelude::*;

use crate::error::{KernelError, Result};
use crate::intmatrix::{KernelDescriptor, PackedMatrix};

/// Runs `kernel` over every timestep in `inputs` and returns how many there
/// were. `packed` must come from `kernel.pack`; a matrix packed for another
/// kernel family panics.
pub fn matrix_dot_vector_batch(
    kernel: &KernelDescriptor,
    packed: &PackedMatrix,
    inputs: &[i8],
    outputs: &mut [f32],
) -> Result<usize> {
    let dim1 = packed.dim1();
    let num_in = packed.num_inputs();
    if dim1 == 0 {
        return Ok(0);
    }
    if outputs.len() % dim1 != 0 {
        return Err(KernelError::Shape { what: "batch outputs", expected: outputs.len() - outputs.len() % dim1, actual: outputs.len() });
    }
    let timesteps = outputs.len() / dim1;
    if inputs.len() != timesteps * num_in {
        return Err(KernelError::Shape { what: "batch inputs", expected: timesteps * num_in, actual: inputs.len() });
    }

    if num_in == 0 {
        outputs.par_chunks_mut(dim1).for_each(|v| kernel.matrix_dot_vector(packed, &[], v));
    } else {
        outputs
            .par_chunks_mut(dim1)
            .zip(inputs.par_chunks(num_in))
            .for_each(|(v, u)| kernel.matrix_dot_vector(packed, u, v));
    }
    trace!("batched {} timesteps through {}", timesteps, kernel.name);
    Ok(timesteps)
}
