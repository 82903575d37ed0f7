//! Kernel selection and the process-wide dispatcher.
//!
//! A [`Registry`] pairs one dot-product kernel with one matrix kernel,
//! chosen against a capability set. The global registry is built once,
//! either explicitly with [`install`] or lazily on first use from the
//! environment, and never changes afterwards.

use std::sync::OnceLock;

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::{DotProductChoice, KernelConfig, MatrixChoice};
use crate::detect::{Capabilities, IsaTier};
use crate::dot::{self, DotProductKernel, DotScalar};
use crate::error::{KernelError, Result};
use crate::intmatrix::{self, KernelDescriptor};

#[derive(Debug, Clone, Copy)]
pub struct Registry {
    caps: Capabilities,
    dot: &'static DotProductKernel,
    matrix: &'static KernelDescriptor,
}

/// Names of the selected kernels, for logs and reports.
#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    pub capabilities: Capabilities,
    pub dot_product: &'static str,
    pub dot_product_tier: IsaTier,
    pub int_matrix: &'static str,
    pub int_matrix_tier: IsaTier,
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

impl Registry {
    /// Widest kernels runnable with `caps`. `caps` is intersected with the
    /// host, so a simulated set can only narrow the choice.
    pub fn auto(caps: Capabilities) -> Self {
        let caps = caps.intersect(Capabilities::host());
        Self { caps, dot: best_dot(caps), matrix: best_matrix(caps) }
    }

    /// Applies `config` on top of [`auto`](Self::auto). A forced choice that
    /// is not compiled in or not runnable with `caps` is an error.
    pub fn select(caps: Capabilities, config: &KernelConfig) -> Result<Self> {
        let mut reg = Self::auto(caps);
        if config.dot_product != DotProductChoice::Auto {
            reg.dot = forced_dot(reg.caps, config.dot_product)?;
        }
        if config.int_matrix != MatrixChoice::Auto {
            reg.matrix = forced_matrix(reg.caps, config.int_matrix)?;
        }
        Ok(reg)
    }

    pub fn capabilities(&self) -> Capabilities { self.caps }
    pub fn dot_kernel(&self) -> &'static DotProductKernel { self.dot }
    pub fn matrix_kernel(&self) -> &'static KernelDescriptor { self.matrix }

    pub fn selection(&self) -> Selection {
        Selection {
            capabilities: self.caps,
            dot_product: self.dot.name,
            dot_product_tier: self.dot.tier,
            int_matrix: self.matrix.name,
            int_matrix_tier: self.matrix.tier,
        }
    }

    #[inline]
    pub fn dot_product<T: DotScalar>(&self, u: &[T], v: &[T]) -> T { T::kernel_fn(self.dot)(u, v) }
}

fn best_dot(caps: Capabilities) -> &'static DotProductKernel {
    for k in dot::candidates() {
        if k.is_supported(caps) {
            return k;
        }
        debug!("dot product {} rejected: needs {:?}", k.name, k.requires);
    }
    &dot::NATIVE
}

fn best_matrix(caps: Capabilities) -> &'static KernelDescriptor {
    for d in intmatrix::candidates() {
        if d.is_supported(caps) {
            return d;
        }
        debug!("int matrix {} rejected: needs {:?}", d.name, d.requires);
    }
    &intmatrix::SCALAR
}

fn forced_dot(caps: Capabilities, choice: DotProductChoice) -> Result<&'static DotProductKernel> {
    let unsupported = || KernelError::Unsupported { name: choice.name(), tier: choice.tier().unwrap_or(IsaTier::Scalar) };
    let k = choice.kernel().ok_or_else(unsupported)?;
    if k.is_supported(caps) { Ok(k) } else { Err(unsupported()) }
}

fn forced_matrix(caps: Capabilities, choice: MatrixChoice) -> Result<&'static KernelDescriptor> {
    let unsupported = || KernelError::Unsupported { name: choice.name(), tier: choice.tier().unwrap_or(IsaTier::Scalar) };
    let d = choice.descriptor().ok_or_else(unsupported)?;
    if d.is_supported(caps) { Ok(d) } else { Err(unsupported()) }
}

fn log_selection(reg: &Registry) {
    info!(
        "kernels: dot product {} ({}), int matrix {} ({}); cpu {:?}",
        reg.dot.name,
        reg.dot.tier,
        reg.matrix.name,
        reg.matrix.tier,
        reg.caps
    );
}

/// Installs the global registry from `config`. Fails if a forced kernel is
/// unavailable or if the registry was already built.
pub fn install(config: &KernelConfig) -> Result<&'static Registry> {
    let reg = Registry::select(Capabilities::host(), config)?;
    REGISTRY.set(reg).map_err(|_| KernelError::AlreadyInstalled)?;
    log_selection(&reg);
    Ok(registry())
}

/// The global registry, built from the environment on first use.
pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| {
        let host = Capabilities::host();
        let reg = match KernelConfig::from_env().and_then(|c| Registry::select(host, &c)) {
            Ok(reg) => reg,
            Err(e) => {
                warn!("ignoring kernel override: {e}; using automatic selection");
                Registry::auto(host)
            }
        };
        log_selection(&reg);
        reg
    })
}

/// The matrix kernel of the global registry.
pub fn select_best() -> &'static KernelDescriptor { registry().matrix }

/// Widest matrix kernel runnable with a simulated capability set.
pub fn select_for(caps: Capabilities) -> &'static KernelDescriptor { Registry::auto(caps).matrix }

/// Matrix kernel of exactly `tier`, if compiled in and runnable here.
pub fn descriptor_for(tier: IsaTier) -> Option<&'static KernelDescriptor> {
    intmatrix::runnable().into_iter().find(|d| d.tier == tier)
}

/// Dot product through the global registry.
#[inline]
pub fn dot_product<T: DotScalar>(u: &[T], v: &[T]) -> T { registry().dot_product(u, v) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_extensions_means_scalar() {
        let reg = Registry::auto(Capabilities::none());
        assert_eq!(reg.matrix_kernel().name, "scalar");
        assert_eq!(reg.dot_kernel().name, "native");
    }

    #[test]
    fn forced_choice_must_be_runnable() {
        let config = KernelConfig { dot_product: DotProductChoice::Native, int_matrix: MatrixChoice::Sse };
        let err = Registry::select(Capabilities::none(), &config).unwrap_err();
        assert!(matches!(err, KernelError::Unsupported { name: "sse", .. }));
    }
}
