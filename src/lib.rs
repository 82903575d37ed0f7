//! Runtime-dispatched numeric kernels for OCR network inference: dense
//! `f32`/`f64` dot products and 8-bit quantized matrix × vector products,
//! each with scalar, SSE, AVX, AVX-512 and NEON implementations.
//!
//! The widest implementation the CPU supports is picked once per process
//! (see [`registry`]); overrides come from [`config::KernelConfig`].

pub mod batch;
pub mod config;
pub mod detect;
pub mod dot;
pub mod error;
pub mod intmatrix;
pub mod registry;

pub use config::{DotProductChoice, KernelConfig, MatrixChoice};
pub use detect::{Capabilities, Feature, IsaTier};
pub use dot::{DotProductKernel, DotScalar};
pub use error::{KernelError, Result};
pub use intmatrix::{int_dot_product, quantize_input, roundup, Geometry, KernelDescriptor, PackedMatrix, QuantizedMatrix};
pub use registry::{dot_product, select_best, select_for};
