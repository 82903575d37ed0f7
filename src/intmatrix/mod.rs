//! 8-bit quantized matrix × vector products.
//!
//! A [`QuantizedMatrix`] holds `dim1` rows of `dim2` signed bytes, the last
//! column being the bias weight, plus one `f32` scale per row. The input is
//! a vector of `dim2 - 1` quantized bytes; the bias column meets a
//! synthetic input of 1, so for row `r`
//!
//! ```text
//! v[r] = scale[r] * (Σ_c raw[r][c] * u[c] + raw[r][dim2 - 1])
//! ```
//!
//! Each ISA family streams weights in its own interleaved order, produced
//! once per matrix by [`KernelDescriptor::pack`]. Quantized inputs are
//! expected in `[-127, 127]`, which is what [`quantize_input`] produces; an
//! input byte of `-128` is read as `-127` by every kernel
//! ([`signmul::saturate_input`]). Weights use the full `i8` range.

use serde::Serialize;

use crate::detect::{Capabilities, Feature, IsaTier};
use crate::error::{KernelError, Result};

mod cascade;
pub mod scalar;
pub mod signmul;

#[cfg(all(target_arch = "x86_64", feature = "simd-sse"))]
mod sse;
#[cfg(all(target_arch = "x86_64", feature = "simd-avx2"))]
mod avx2;
#[cfg(all(target_arch = "x86_64", feature = "simd-avx512"))]
mod avx512;
#[cfg(all(target_arch = "aarch64", feature = "simd-neon"))]
mod neon;

pub use scalar::int_dot_product;

/// Smallest multiple of `multiple` that is `>= value`.
#[inline]
pub const fn roundup(value: usize, multiple: usize) -> usize {
    value.div_ceil(multiple) * multiple
}

/// Register-blocking shape of a kernel family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Geometry {
    /// 32-bit accumulators per register.
    pub num_outputs_per_register: usize,
    /// Accumulator registers live at once in the widest block.
    pub max_output_registers: usize,
    /// Input bytes loaded per register.
    pub num_inputs_per_register: usize,
    /// Input bytes broadcast to all accumulators per step.
    pub num_inputs_per_group: usize,
}

impl Geometry {
    /// Outputs covered by one full-width block.
    pub const fn max_block(&self) -> usize { self.num_outputs_per_register * self.max_output_registers }
}

/// `(dim1, dim2, shaped_weights, scales, input, output)`; `shaped_weights`
/// must come from [`KernelDescriptor::pack`] of the same descriptor.
pub type MatrixDotVectorFn = fn(usize, usize, &[i8], &[f32], &[i8], &mut [f32]);

/// An immutable, compiled-in matrix kernel and its blocking constants.
#[derive(Debug)]
pub struct KernelDescriptor {
    pub name: &'static str,
    pub tier: IsaTier,
    pub requires: &'static [Feature],
    pub kernel: MatrixDotVectorFn,
    pub geometry: Geometry,
}

impl KernelDescriptor {
    pub fn is_supported(&self, caps: Capabilities) -> bool { caps.has_all(self.requires) }

    pub fn num_outputs_per_register(&self) -> usize { self.geometry.num_outputs_per_register }
    pub fn max_output_registers(&self) -> usize { self.geometry.max_output_registers }
    pub fn num_inputs_per_register(&self) -> usize { self.geometry.num_inputs_per_register }
    pub fn num_inputs_per_group(&self) -> usize { self.geometry.num_inputs_per_group }

    /// Re-lays `matrix` into this kernel's streaming order. Done once per
    /// matrix, at load time.
    pub fn pack(&self, matrix: &QuantizedMatrix) -> PackedMatrix {
        PackedMatrix {
            dim1: matrix.dim1,
            dim2: matrix.dim2,
            geometry: self.geometry,
            shaped: cascade::shape(&self.geometry, matrix),
            scales: matrix.scales.clone(),
        }
    }

    /// Computes `v = W u` (bias folded) for a matrix packed by this
    /// descriptor. `u` holds at least `dim2 - 1` inputs, `v` at least `dim1`
    /// outputs.
    pub fn matrix_dot_vector(&self, packed: &PackedMatrix, u: &[i8], v: &mut [f32]) {
        assert_eq!(packed.geometry, self.geometry, "matrix was packed for a different kernel family");
        (self.kernel)(packed.dim1, packed.dim2, &packed.shaped, &packed.scales, u, v);
    }
}

pub static SCALAR: KernelDescriptor = KernelDescriptor {
    name: "scalar",
    tier: IsaTier::Scalar,
    requires: &[],
    kernel: cascade::matrix_dot_vector::<scalar::Scalar>,
    geometry: <scalar::Scalar as cascade::BlockKernel>::GEOMETRY,
};

#[cfg(all(target_arch = "x86_64", feature = "simd-sse"))]
pub(crate) static SSE: KernelDescriptor = KernelDescriptor {
    name: "sse",
    tier: IsaTier::Sse,
    requires: &[Feature::Ssse3, Feature::Sse41],
    kernel: cascade::matrix_dot_vector::<sse::Sse>,
    geometry: <sse::Sse as cascade::BlockKernel>::GEOMETRY,
};

#[cfg(all(target_arch = "x86_64", feature = "simd-avx2"))]
pub(crate) static AVX2: KernelDescriptor = KernelDescriptor {
    name: "avx2",
    tier: IsaTier::Avx2,
    requires: &[Feature::Avx2],
    kernel: cascade::matrix_dot_vector::<avx2::Avx2>,
    geometry: <avx2::Avx2 as cascade::BlockKernel>::GEOMETRY,
};

#[cfg(all(target_arch = "x86_64", feature = "simd-avx512"))]
pub(crate) static AVX512: KernelDescriptor = KernelDescriptor {
    name: "avx512",
    tier: IsaTier::Avx512,
    requires: &[Feature::Avx512F, Feature::Avx512Bw],
    kernel: cascade::matrix_dot_vector::<avx512::Avx512>,
    geometry: <avx512::Avx512 as cascade::BlockKernel>::GEOMETRY,
};

#[cfg(all(target_arch = "aarch64", feature = "simd-neon"))]
pub(crate) static NEON: KernelDescriptor = KernelDescriptor {
    name: "neon",
    tier: IsaTier::Neon,
    requires: &[Feature::Neon],
    kernel: cascade::matrix_dot_vector::<neon::Neon>,
    geometry: <neon::Neon as cascade::BlockKernel>::GEOMETRY,
};

/// Compiled-in descriptors, widest first; scalar is always last.
pub(crate) fn candidates() -> Vec<&'static KernelDescriptor> {
    let mut out: Vec<&'static KernelDescriptor> = Vec::new();
    #[cfg(all(target_arch = "x86_64", feature = "simd-avx512"))]
    out.push(&AVX512);
    #[cfg(all(target_arch = "x86_64", feature = "simd-avx2"))]
    out.push(&AVX2);
    #[cfg(all(target_arch = "x86_64", feature = "simd-sse"))]
    out.push(&SSE);
    #[cfg(all(target_arch = "aarch64", feature = "simd-neon"))]
    out.push(&NEON);
    out.push(&SCALAR);
    out
}

/// Compiled-in descriptors that can run on this CPU.
pub fn runnable() -> Vec<&'static KernelDescriptor> {
    let host = Capabilities::host();
    candidates().into_iter().filter(|d| d.is_supported(host)).collect()
}

/// Row-major int8 weights with a trailing bias column and per-row scales.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantizedMatrix {
    dim1: usize,
    dim2: usize,
    weights: Vec<i8>,
    scales: Vec<f32>,
}

impl QuantizedMatrix {
    pub fn new(dim1: usize, dim2: usize, weights: Vec<i8>, scales: Vec<f32>) -> Result<Self> {
        if dim2 == 0 {
            return Err(KernelError::Shape { what: "columns including bias", expected: 1, actual: 0 });
        }
        if weights.len() != dim1 * dim2 {
            return Err(KernelError::Shape { what: "weights", expected: dim1 * dim2, actual: weights.len() });
        }
        if scales.len() != dim1 {
            return Err(KernelError::Shape { what: "row scales", expected: dim1, actual: scales.len() });
        }
        Ok(Self { dim1, dim2, weights, scales })
    }

    /// Quantizes row-major `f32` weights (bias last) with a symmetric
    /// per-row scale `max_abs / 127`. All-zero rows get scale 0.
    pub fn quantize(dim1: usize, dim2: usize, values: &[f32]) -> Result<Self> {
        if values.len() != dim1 * dim2 {
            return Err(KernelError::Shape { what: "float weights", expected: dim1 * dim2, actual: values.len() });
        }
        let mut weights = Vec::with_capacity(values.len());
        let mut scales = Vec::with_capacity(dim1);
        for row in values.chunks(dim2.max(1)).take(dim1) {
            let max_abs = row.iter().fold(0.0f32, |m, x| m.max(x.abs()));
            let scale = max_abs / f32::from(i8::MAX);
            scales.push(scale);
            let divisor = if scale == 0.0 { 1.0 } else { scale };
            weights.extend(row.iter().map(|&x| (x / divisor).round().clamp(-127.0, 127.0) as i8));
        }
        Self::new(dim1, dim2, weights, scales)
    }

    pub fn dim1(&self) -> usize { self.dim1 }
    pub fn dim2(&self) -> usize { self.dim2 }
    /// Real inputs per row, excluding the bias column.
    pub fn num_inputs(&self) -> usize { self.dim2 - 1 }
    pub fn weights(&self) -> &[i8] { &self.weights }
    pub fn scales(&self) -> &[f32] { &self.scales }

    pub fn row(&self, r: usize) -> &[i8] { &self.weights[r * self.dim2..(r + 1) * self.dim2] }

    #[inline]
    pub fn get(&self, r: usize, c: usize) -> i8 { self.weights[r * self.dim2 + c] }

    pub fn bias(&self, r: usize) -> i8 { self.get(r, self.dim2 - 1) }

    pub fn dequantize(&self, r: usize, c: usize) -> f32 { f32::from(self.get(r, c)) * self.scales[r] }
}

/// A [`QuantizedMatrix`] re-laid for one kernel family.
#[derive(Debug, Clone)]
pub struct PackedMatrix {
    dim1: usize,
    dim2: usize,
    geometry: Geometry,
    shaped: Vec<i8>,
    scales: Vec<f32>,
}

impl PackedMatrix {
    pub fn dim1(&self) -> usize { self.dim1 }
    pub fn dim2(&self) -> usize { self.dim2 }
    pub fn num_inputs(&self) -> usize { self.dim2 - 1 }
    pub fn geometry(&self) -> Geometry { self.geometry }
    pub fn shaped_weights(&self) -> &[i8] { &self.shaped }
    pub fn scales(&self) -> &[f32] { &self.scales }
}

/// Maps activations in `[-1, 1]` to `[-127, 127]`, clipping outliers.
pub fn quantize_input(x: &[f32], out: &mut [i8]) {
    debug_assert_eq!(x.len(), out.len());
    let max = f32::from(i8::MAX);
    for (o, &v) in out.iter_mut().zip(x) {
        *o = (v * max).round().clamp(-max, max) as i8;
    }
}
