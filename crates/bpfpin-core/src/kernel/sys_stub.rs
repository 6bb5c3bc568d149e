//! Stub kernel transport for non-Linux platforms.
//!
//! Mirrors the Linux [`SysKernel`] API so the crate compiles everywhere;
//! every operation fails with [`KernelError::NotAvailable`].

use std::path::{Path, PathBuf};

use super::{KernelError, MapFd, MapKernel};

/// Direct kernel transport stub for platforms without `bpf(2)`.
#[derive(Debug)]
pub struct SysKernel {
    #[allow(dead_code)]
    bpffs_root: PathBuf,
}

impl SysKernel {
    /// Creates the stub; accepted for API parity with the Linux transport.
    #[must_use]
    pub fn new(bpffs_root: impl Into<PathBuf>) -> Self {
        Self {
            bpffs_root: bpffs_root.into(),
        }
    }
}

impl MapKernel for SysKernel {
    fn ensure_mounted(&self) -> Result<bool, KernelError> {
        Err(KernelError::NotAvailable)
    }

    fn open_pin(&self, _path: &Path) -> Result<MapFd, KernelError> {
        Err(KernelError::NotAvailable)
    }

    fn lookup_elem(
        &self,
        _fd: MapFd,
        _key: &[u8],
        _value_size: usize,
    ) -> Result<Vec<u8>, KernelError> {
        Err(KernelError::NotAvailable)
    }

    fn update_elem(&self, _fd: MapFd, _key: &[u8], _value: &[u8]) -> Result<(), KernelError> {
        Err(KernelError::NotAvailable)
    }

    fn close(&self, _fd: MapFd) -> Result<(), KernelError> {
        Err(KernelError::NotAvailable)
    }
}
