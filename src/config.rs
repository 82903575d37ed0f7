//! Kernel selection overrides.
//!
//! Both choices default to `auto`, which picks the widest implementation
//! the CPU supports. A forced choice must be compiled in and runnable,
//! otherwise [`crate::registry::install`] fails.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::detect::IsaTier;
use crate::dot::{self, DotProductKernel};
use crate::error::{KernelError, Result};
use crate::intmatrix::{self, KernelDescriptor};

pub const DOTPRODUCT_ENV: &str = "OCR_KERNELS_DOTPRODUCT";
pub const INTMATRIX_ENV: &str = "OCR_KERNELS_INTMATRIX";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DotProductChoice {
    #[default]
    Auto,
    Native,
    Sse,
    Avx,
    AvxKahan,
    Fma,
    Avx512,
    Neon,
}

impl DotProductChoice {
    pub const ALL: [DotProductChoice; 8] = [
        DotProductChoice::Auto,
        DotProductChoice::Native,
        DotProductChoice::Sse,
        DotProductChoice::Avx,
        DotProductChoice::AvxKahan,
        DotProductChoice::Fma,
        DotProductChoice::Avx512,
        DotProductChoice::Neon,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DotProductChoice::Auto => "auto",
            DotProductChoice::Native => "native",
            DotProductChoice::Sse => "sse",
            DotProductChoice::Avx => "avx",
            DotProductChoice::AvxKahan => "avx-kahan",
            DotProductChoice::Fma => "fma",
            DotProductChoice::Avx512 => "avx512",
            DotProductChoice::Neon => "neon",
        }
    }

    pub fn tier(self) -> Option<IsaTier> {
        match self {
            DotProductChoice::Auto => None,
            DotProductChoice::Native => Some(IsaTier::Scalar),
            DotProductChoice::Sse => Some(IsaTier::Sse),
            DotProductChoice::Avx | DotProductChoice::AvxKahan => Some(IsaTier::Avx),
            DotProductChoice::Fma => Some(IsaTier::Avx2),
            DotProductChoice::Avx512 => Some(IsaTier::Avx512),
            DotProductChoice::Neon => Some(IsaTier::Neon),
        }
    }

    /// The compiled-in kernel this choice names; `None` for `auto` or when
    /// the build does not include it.
    pub(crate) fn kernel(self) -> Option<&'static DotProductKernel> {
        dot::all_kernels().into_iter().find(|k| k.name == self.name())
    }
}

impl fmt::Display for DotProductChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for DotProductChoice {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| KernelError::UnknownChoice(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatrixChoice {
    #[default]
    Auto,
    Scalar,
    Sse,
    Avx2,
    Avx512,
    Neon,
}

impl MatrixChoice {
    pub const ALL: [MatrixChoice; 6] = [
        MatrixChoice::Auto,
        MatrixChoice::Scalar,
        MatrixChoice::Sse,
        MatrixChoice::Avx2,
        MatrixChoice::Avx512,
        MatrixChoice::Neon,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MatrixChoice::Auto => "auto",
            MatrixChoice::Scalar => "scalar",
            MatrixChoice::Sse => "sse",
            MatrixChoice::Avx2 => "avx2",
            MatrixChoice::Avx512 => "avx512",
            MatrixChoice::Neon => "neon",
        }
    }

    pub fn tier(self) -> Option<IsaTier> {
        match self {
            MatrixChoice::Auto => None,
            MatrixChoice::Scalar => Some(IsaTier::Scalar),
            MatrixChoice::Sse => Some(IsaTier::Sse),
            MatrixChoice::Avx2 => Some(IsaTier::Avx2),
            MatrixChoice::Avx512 => Some(IsaTier::Avx512),
            MatrixChoice::Neon => Some(IsaTier::Neon),
        }
    }

    pub(crate) fn descriptor(self) -> Option<&'static KernelDescriptor> {
        intmatrix::candidates().into_iter().find(|d| d.name == self.name())
    }
}

impl fmt::Display for MatrixChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

impl FromStr for MatrixChoice {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| KernelError::UnknownChoice(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct KernelConfig {
    pub dot_product: DotProductChoice,
    pub int_matrix: MatrixChoice,
}

impl KernelConfig {
    /// Reads the overrides from `OCR_KERNELS_DOTPRODUCT` and
    /// `OCR_KERNELS_INTMATRIX`. Unset or empty variables mean `auto`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = lookup(DOTPRODUCT_ENV).filter(|v| !v.trim().is_empty()) {
            config.dot_product = v.parse()?;
        }
        if let Some(v) = lookup(INTMATRIX_ENV).filter(|v| !v.trim().is_empty()) {
            config.int_matrix = v.parse()?;
        }
        Ok(config)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for c in DotProductChoice::ALL {
            assert_eq!(c.name().parse::<DotProductChoice>().unwrap(), c);
        }
        for c in MatrixChoice::ALL {
            assert_eq!(c.name().parse::<MatrixChoice>().unwrap(), c);
        }
        assert_eq!(" AVX2 ".parse::<MatrixChoice>().unwrap(), MatrixChoice::Avx2);
    }

    #[test]
    fn native_and_scalar_always_compiled_in() {
        assert_eq!(DotProductChoice::Native.kernel().map(|k| k.name), Some("native"));
        assert_eq!(MatrixChoice::Scalar.descriptor().map(|d| d.name), Some("scalar"));
        assert!(DotProductChoice::Auto.kernel().is_none());
        assert!(MatrixChoice::Auto.descriptor().is_none());
    }
}
