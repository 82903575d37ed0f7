use thiserror::Error;

use crate::detect::IsaTier;

/// Errors from the fallible setup paths (configuration, registry install,
/// matrix construction). The kernels themselves never fail.
#[derive(Debug, Error)]
pub enum KernelError {
    #[error("{name} kernel ({tier}) is not compiled in or not supported by this CPU")]
    Unsupported { name: &'static str, tier: IsaTier },

    #[error("unknown kernel choice: {0:?}")]
    UnknownChoice(String),

    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    Shape { what: &'static str, expected: usize, actual: usize },

    #[error("kernel registry is already installed")]
    AlreadyInstalled,

    #[error("read kernel config")]
    Io(#[from] std::io::Error),

    #[error("parse kernel config")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, KernelError>;
