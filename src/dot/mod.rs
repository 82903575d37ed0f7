//! Dense dot products over `f32` / `f64` vectors.
//!
//! Every implementation computes `Σ u[i] * v[i]` over the common length of
//! the two slices and returns zero for empty input. None of them keeps a
//! single running sum: the scalar kernel uses four partial sums, the SIMD
//! kernels two vector accumulators (or compensated sums), so error growth
//! stays bounded for long vectors. Results are commutative bit-for-bit.
//!
//! ISA-specific kernels are only handed out after a match against the host
//! capabilities ([`runnable`] or the registry); [`NATIVE`] runs anywhere.

use crate::detect::{Capabilities, Feature, IsaTier};

pub mod scalar;

#[cfg(all(target_arch = "x86_64", feature = "simd-sse"))]
mod sse;
#[cfg(all(target_arch = "x86_64", feature = "simd-avx2"))]
mod avx;
#[cfg(all(target_arch = "x86_64", feature = "simd-avx2"))]
mod fma;
#[cfg(all(target_arch = "x86_64", feature = "simd-avx512"))]
mod avx512;
#[cfg(all(target_arch = "aarch64", feature = "simd-neon"))]
mod neon;

pub type DotF32Fn = fn(&[f32], &[f32]) -> f32;
pub type DotF64Fn = fn(&[f64], &[f64]) -> f64;

/// One compiled-in dot-product implementation.
#[derive(Debug)]
pub struct DotProductKernel {
    pub name: &'static str,
    pub tier: IsaTier,
    pub requires: &'static [Feature],
    pub f32: DotF32Fn,
    pub f64: DotF64Fn,
}

impl DotProductKernel {
    pub fn is_supported(&self, caps: Capabilities) -> bool { caps.has_all(self.requires) }
}

pub static NATIVE: DotProductKernel = DotProductKernel {
    name: "native",
    tier: IsaTier::Scalar,
    requires: &[],
    f32: scalar::dot_product_f32,
    f64: scalar::dot_product_f64,
};

#[cfg(all(target_arch = "x86_64", feature = "simd-sse"))]
pub(crate) static SSE: DotProductKernel = DotProductKernel {
    name: "sse",
    tier: IsaTier::Sse,
    requires: &[Feature::Sse41],
    f32: sse::dot_product_f32,
    f64: sse::dot_product_f64,
};

#[cfg(all(target_arch = "x86_64", feature = "simd-avx2"))]
pub(crate) static AVX: DotProductKernel = DotProductKernel {
    name: "avx",
    tier: IsaTier::Avx,
    requires: &[Feature::Avx],
    f32: avx::dot_product_f32,
    f64: avx::dot_product_f64,
};

/// AVX with Kahan-compensated `f32` accumulation; slower but much more
/// accurate for long vectors. The `f64` path is the plain AVX one.
#[cfg(all(target_arch = "x86_64", feature = "simd-avx2"))]
pub(crate) static AVX_KAHAN: DotProductKernel = DotProductKernel {
    name: "avx-kahan",
    tier: IsaTier::Avx,
    requires: &[Feature::Avx],
    f32: avx::dot_product_f32_kahan,
    f64: avx::dot_product_f64,
};

#[cfg(all(target_arch = "x86_64", feature = "simd-avx2"))]
pub(crate) static FMA: DotProductKernel = DotProductKernel {
    name: "fma",
    tier: IsaTier::Avx2,
    requires: &[Feature::Avx, Feature::Fma],
    f32: fma::dot_product_f32,
    f64: fma::dot_product_f64,
};

#[cfg(all(target_arch = "x86_64", feature = "simd-avx512"))]
pub(crate) static AVX512: DotProductKernel = DotProductKernel {
    name: "avx512",
    tier: IsaTier::Avx512,
    requires: &[Feature::Avx512F],
    f32: avx512::dot_product_f32,
    f64: avx512::dot_product_f64,
};

#[cfg(all(target_arch = "aarch64", feature = "simd-neon"))]
pub(crate) static NEON: DotProductKernel = DotProductKernel {
    name: "neon",
    tier: IsaTier::Neon,
    requires: &[Feature::Neon],
    f32: neon::dot_product_f32,
    f64: neon::dot_product_f64,
};

/// Compiled-in kernels in automatic selection order, best first. The
/// compensated variant is left out: it is only used when asked for.
pub(crate) fn candidates() -> Vec<&'static DotProductKernel> {
    let mut out: Vec<&'static DotProductKernel> = Vec::new();
    #[cfg(all(target_arch = "x86_64", feature = "simd-avx512"))]
    out.push(&AVX512);
    #[cfg(all(target_arch = "x86_64", feature = "simd-avx2"))]
    {
        out.push(&FMA);
        out.push(&AVX);
    }
    #[cfg(all(target_arch = "x86_64", feature = "simd-sse"))]
    out.push(&SSE);
    #[cfg(all(target_arch = "aarch64", feature = "simd-neon"))]
    out.push(&NEON);
    out.push(&NATIVE);
    out
}

/// Every compiled-in kernel, including ones never picked automatically.
pub(crate) fn all_kernels() -> Vec<&'static DotProductKernel> {
    let mut out = candidates();
    #[cfg(all(target_arch = "x86_64", feature = "simd-avx2"))]
    out.push(&AVX_KAHAN);
    out
}

/// Kernels from [`all_kernels`] that can run on this CPU.
pub fn runnable() -> Vec<&'static DotProductKernel> {
    let host = Capabilities::host();
    all_kernels().into_iter().filter(|k| k.is_supported(host)).collect()
}

/// Element types with a dot-product kernel.
pub trait DotScalar: Copy + sealed::Sealed {
    fn kernel_fn(kernel: &DotProductKernel) -> fn(&[Self], &[Self]) -> Self;
}

impl DotScalar for f32 {
    #[inline]
    fn kernel_fn(kernel: &DotProductKernel) -> DotF32Fn { kernel.f32 }
}

impl DotScalar for f64 {
    #[inline]
    fn kernel_fn(kernel: &DotProductKernel) -> DotF64Fn { kernel.f64 }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Plain loop over the elements a blocked kernel left over.
#[inline]
pub(crate) fn tail<T>(u: &[T], v: &[T], mut acc: T) -> T
where
    T: Copy + std::ops::Mul<Output = T> + std::ops::Add<Output = T>,
{
    for (&a, &b) in u.iter().zip(v) {
        acc = acc + a * b;
    }
    acc
}
