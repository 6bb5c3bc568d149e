//! Kernel transport error types.

use std::path::PathBuf;

/// Errors from the direct kernel transport.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// BPF syscalls are not available on this platform.
    #[error("BPF syscalls not available on this platform")]
    NotAvailable,

    /// No entry exists for the requested key.
    #[error("no entry for the given key")]
    KeyNotFound,

    /// Mounting the BPF filesystem failed.
    #[error("failed to mount bpf filesystem at {path}: {source}")]
    Mount {
        /// Requested mount point.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Reading the mount table failed.
    #[error("failed to read mount table: {0}")]
    MountTable(#[source] std::io::Error),

    /// Opening a map descriptor from a pin failed.
    #[error("failed to open pin {path}: {source}")]
    OpenPin {
        /// Pin path passed to `BPF_OBJ_GET`.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// A system call failed.
    #[error("{call} failed: {source}")]
    Syscall {
        /// The failing call, e.g. `bpf(BPF_MAP_UPDATE_ELEM)`.
        call: &'static str,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// A path contained an interior NUL byte and cannot be passed to the
    /// kernel.
    #[error("invalid pin path: {0:?}")]
    InvalidPath(PathBuf),
}

impl KernelError {
    /// Returns true if this is the distinguished key-absent outcome.
    #[must_use]
    pub fn is_key_not_found(&self) -> bool {
        matches!(self, KernelError::KeyNotFound)
    }
}
