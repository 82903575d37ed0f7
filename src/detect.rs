//! Host CPU capability detection.
//!
//! Detection runs once per process; every later query reads the cached
//! [`Capabilities`] value.

use std::fmt;
use std::sync::OnceLock;

use log::debug;
use serde::Serialize;

/// A single CPU extension a kernel may depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Feature {
    Ssse3,
    Sse41,
    Avx,
    Avx2,
    Fma,
    Avx512F,
    Avx512Bw,
    Neon,
}

impl Feature {
    pub const ALL: [Feature; 8] = [
        Feature::Ssse3,
        Feature::Sse41,
        Feature::Avx,
        Feature::Avx2,
        Feature::Fma,
        Feature::Avx512F,
        Feature::Avx512Bw,
        Feature::Neon,
    ];

    #[inline]
    fn bit(self) -> u32 { 1 << (self as u32) }

    pub fn name(self) -> &'static str {
        match self {
            Feature::Ssse3 => "ssse3",
            Feature::Sse41 => "sse4.1",
            Feature::Avx => "avx",
            Feature::Avx2 => "avx2",
            Feature::Fma => "fma",
            Feature::Avx512F => "avx512f",
            Feature::Avx512Bw => "avx512bw",
            Feature::Neon => "neon",
        }
    }
}

/// Register-width tier of an implementation, ordered narrowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IsaTier {
    Scalar,
    Sse,
    Neon,
    Avx,
    Avx2,
    Avx512,
}

impl fmt::Display for IsaTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IsaTier::Scalar => "scalar",
            IsaTier::Sse => "sse",
            IsaTier::Neon => "neon",
            IsaTier::Avx => "avx",
            IsaTier::Avx2 => "avx2",
            IsaTier::Avx512 => "avx512",
        };
        f.write_str(s)
    }
}

/// Set of CPU extensions, stored as a bitmask.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(u32);

static HOST: OnceLock<Capabilities> = OnceLock::new();

impl Capabilities {
    /// No extensions at all; only the scalar kernels qualify.
    pub const fn none() -> Self { Self(0) }

    pub fn from_features(features: &[Feature]) -> Self {
        features.iter().fold(Self::none(), |c, &f| c.with(f))
    }

    #[must_use]
    pub fn with(self, feature: Feature) -> Self { Self(self.0 | feature.bit()) }

    #[must_use]
    pub fn without(self, feature: Feature) -> Self { Self(self.0 & !feature.bit()) }

    #[must_use]
    pub fn intersect(self, other: Self) -> Self { Self(self.0 & other.0) }

    #[inline]
    pub fn has(self, feature: Feature) -> bool { self.0 & feature.bit() != 0 }

    pub fn has_all(self, features: &[Feature]) -> bool {
        features.iter().all(|&f| self.has(f))
    }

    pub fn features(self) -> Vec<Feature> {
        Feature::ALL.into_iter().filter(|&f| self.has(f)).collect()
    }

    /// Capabilities of the running CPU, detected on first call.
    pub fn host() -> Self { *HOST.get_or_init(Self::detect) }

    fn detect() -> Self {
        let mut caps = Self::none();
        #[cfg(target_arch = "x86_64")]
        {
            let checks = [
                (Feature::Ssse3, is_x86_feature_detected!("ssse3")),
                (Feature::Sse41, is_x86_feature_detected!("sse4.1")),
                (Feature::Avx, is_x86_feature_detected!("avx")),
                (Feature::Avx2, is_x86_feature_detected!("avx2")),
                (Feature::Fma, is_x86_feature_detected!("fma")),
                (Feature::Avx512F, is_x86_feature_detected!("avx512f")),
                (Feature::Avx512Bw, is_x86_feature_detected!("avx512bw")),
            ];
            for (feature, present) in checks {
                if present { caps = caps.with(feature); }
            }
        }
        #[cfg(target_arch = "aarch64")]
        {
            if std::arch::is_aarch64_feature_detected!("neon") {
                caps = caps.with(Feature::Neon);
            }
        }
        debug!("detected CPU capabilities: {:?}", caps);
        caps
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.features().iter().map(|x| x.name())).finish()
    }
}

impl Serialize for Capabilities {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.features())
    }
}
