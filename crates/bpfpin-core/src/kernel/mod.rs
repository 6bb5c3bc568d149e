//! Direct kernel transport for single-key map operations.
//!
//! Wraps the small set of `bpf(2)` commands the map manager needs: opening
//! a descriptor from a filesystem pin, single-key lookup and update, and
//! closing the descriptor. Also owns the BPF filesystem mount check, since
//! every pin path lives under it.
//!
//! Bulk iteration and keyed deletion deliberately do not go through this
//! transport; they use the external administrative interface in
//! [`crate::tool`], which speaks JSON rather than raw binary.
//!
//! ## Platform Support
//!
//! - Linux: real syscalls ([`SysKernel`])
//! - Other platforms: stub that fails with [`KernelError::NotAvailable`]

mod error;
#[cfg(target_os = "linux")]
mod sys_linux;
#[cfg(not(target_os = "linux"))]
mod sys_stub;

pub use error::KernelError;

#[cfg(target_os = "linux")]
pub use sys_linux::SysKernel;

#[cfg(not(target_os = "linux"))]
pub use sys_stub::SysKernel;

use std::path::Path;

/// Maximum length of a kernel-visible BPF object name, including the
/// terminating NUL (`BPF_OBJ_NAME_LEN`).
pub const BPF_OBJ_NAME_LEN: usize = 16;

/// An open BPF map descriptor.
///
/// Only meaningful while the owning [`crate::PinnedMap`] is open; the
/// handle that produced it is responsible for closing it exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapFd(i32);

impl MapFd {
    /// Wraps a raw descriptor value.
    #[must_use]
    pub fn new(fd: i32) -> Self {
        Self(fd)
    }

    /// Returns the raw descriptor value.
    #[must_use]
    pub fn raw(self) -> i32 {
        self.0
    }
}

/// Direct kernel interface used for single-key map operations.
///
/// Implemented by [`SysKernel`] for real kernels and by
/// [`crate::testing::MockKernel`] in tests.
pub trait MapKernel: Send + Sync {
    /// Ensures the BPF filesystem is mounted.
    ///
    /// Returns `Ok(true)` if this call performed the mount and `Ok(false)`
    /// if it was already mounted. Idempotent.
    ///
    /// # Errors
    ///
    /// Fails if the mount state cannot be determined or the mount itself
    /// fails.
    fn ensure_mounted(&self) -> Result<bool, KernelError>;

    /// Opens a map descriptor from a filesystem pin (`BPF_OBJ_GET`).
    ///
    /// # Errors
    ///
    /// Fails if the pin does not exist or cannot be opened.
    fn open_pin(&self, path: &Path) -> Result<MapFd, KernelError>;

    /// Looks up the value for `key` (`BPF_MAP_LOOKUP_ELEM`).
    ///
    /// `value_size` must be the map's exact value size; the returned buffer
    /// has that length. `key` must be the map's exact key size.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::KeyNotFound`] if the key is absent, or a
    /// syscall error otherwise.
    fn lookup_elem(&self, fd: MapFd, key: &[u8], value_size: usize) -> Result<Vec<u8>, KernelError>;

    /// Inserts or overwrites the entry for `key` (`BPF_MAP_UPDATE_ELEM`
    /// with `BPF_ANY`).
    ///
    /// # Errors
    ///
    /// Fails if the kernel rejects the update.
    fn update_elem(&self, fd: MapFd, key: &[u8], value: &[u8]) -> Result<(), KernelError>;

    /// Releases a descriptor previously returned by
    /// [`open_pin`](Self::open_pin).
    ///
    /// # Errors
    ///
    /// Fails if the underlying close fails.
    fn close(&self, fd: MapFd) -> Result<(), KernelError>;
}
