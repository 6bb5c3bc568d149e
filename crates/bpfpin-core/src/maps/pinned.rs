//! Pinned map handles and existence reconciliation.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::kernel::{KernelError, MapFd, MapKernel};
use crate::tool::{self, CreateMapRequest, MapAdmin};

use super::repin::{repin_by_name, RepinOutcome};
use super::{DeleteOutcome, MapError, MapParams};

/// A handle to a kernel map reachable through a filesystem pin.
///
/// Created unopened by [`MapContext::pinned_map`](super::MapContext::pinned_map).
/// [`ensure_exists`](Self::ensure_exists) binds it to a kernel object and
/// must succeed before any entry operation; [`close`](Self::close) returns
/// it to the unopened state. A handle has a single logical owner and does
/// no internal locking.
pub struct PinnedMap {
    params: MapParams,
    repinning_enabled: bool,
    kernel: Arc<dyn MapKernel>,
    admin: Arc<dyn MapAdmin>,
    per_cpu: bool,
    fd: Option<MapFd>,
}

impl PinnedMap {
    pub(super) fn new(
        params: MapParams,
        repinning_enabled: bool,
        kernel: Arc<dyn MapKernel>,
        admin: Arc<dyn MapAdmin>,
    ) -> Self {
        let per_cpu = params.is_per_cpu();
        Self {
            params,
            repinning_enabled,
            kernel,
            admin,
            per_cpu,
            fd: None,
        }
    }

    /// The kernel-visible (versioned) name.
    #[must_use]
    pub fn name(&self) -> String {
        self.params.versioned_name()
    }

    /// The path the map is (to be) pinned at.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        PathBuf::from(self.params.versioned_filename())
    }

    /// The identity this handle was built from.
    #[must_use]
    pub fn params(&self) -> &MapParams {
        &self.params
    }

    /// Whether the handle currently holds an open descriptor.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.fd.is_some()
    }

    /// The open map descriptor.
    ///
    /// # Errors
    ///
    /// [`MapError::NotOpen`] if [`ensure_exists`](Self::ensure_exists) has
    /// not succeeded since construction or the last close. That is a
    /// contract violation by the caller, not an environmental condition.
    pub fn map_fd(&self) -> Result<MapFd, MapError> {
        self.fd.ok_or_else(|| MapError::NotOpen { name: self.name() })
    }

    /// Guarantees the map exists in the kernel, is pinned at
    /// [`path`](Self::path), and this handle holds an open descriptor.
    ///
    /// Idempotent: returns immediately with no side effects when already
    /// open, and is safe to retry after environmental failures. When the
    /// pin is missing and repinning is enabled, a live kernel map with the
    /// versioned name is recovered by pinning it anew; otherwise the map
    /// is created through the administrative interface.
    ///
    /// # Errors
    ///
    /// Propagates mount, directory-creation, stat, repin, creation, and
    /// open failures. A stat failure other than not-found aborts without
    /// attempting creation, as does any repin failure other than the
    /// name simply not being listed.
    pub fn ensure_exists(&mut self) -> Result<(), MapError> {
        if self.fd.is_some() {
            return Ok(());
        }

        self.kernel.ensure_mounted()?;

        let path = self.path();
        if let Some(parent) = path.parent() {
            ensure_pin_dir(parent).map_err(|source| MapError::PinDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut exists = match fs::metadata(&path) {
            Ok(_) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(source) => return Err(MapError::Stat { path, source }),
        };

        if !exists && self.repinning_enabled {
            let name = self.name();
            tracing::info!(
                "pin {} missing, searching the kernel registry for map {}",
                path.display(),
                name
            );
            match repin_by_name(self.admin.as_ref(), &name, &path)? {
                RepinOutcome::Repinned { id } => {
                    tracing::info!("repinned map {} (id {}) at {}", name, id, path.display());
                    exists = true;
                }
                RepinOutcome::NotFound => {
                    tracing::debug!("no live map named {}", name);
                }
            }
        }

        if !exists {
            tracing::debug!("pin {} does not exist, creating the map", path.display());
            let name = self.name();
            self.admin.create_map(&CreateMapRequest {
                pin: &path,
                kernel_type: &self.params.kernel_type,
                key_size: self.params.key_size,
                value_size: self.params.value_size,
                max_entries: self.params.max_entries,
                name: &name,
                flags: self.params.flags,
            })?;
        }

        let fd = self.kernel.open_pin(&path)?;
        self.fd = Some(fd);
        tracing::info!(
            "loaded map file descriptor {} for {}",
            fd.raw(),
            path.display()
        );
        Ok(())
    }

    /// Closes the descriptor and returns the handle to the unopened state.
    ///
    /// Idempotent and safe to call on a never-opened handle. The stored
    /// descriptor is cleared even when the underlying close fails, so the
    /// handle never retains an invalid descriptor.
    ///
    /// # Errors
    ///
    /// Propagates a failure from closing the descriptor.
    pub fn close(&mut self) -> Result<(), MapError> {
        if let Some(fd) = self.fd.take() {
            self.kernel.close(fd)?;
        }
        Ok(())
    }

    /// Looks up the value for `key` with a direct kernel call.
    ///
    /// # Errors
    ///
    /// [`MapError::PerCpuUnsupported`] on per-CPU maps regardless of
    /// state, [`MapError::NotOpen`] on an unopened handle,
    /// [`MapError::BadKeySize`] on a key of the wrong length,
    /// [`MapError::KeyNotFound`] when the entry is absent, and kernel
    /// failures otherwise.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>, MapError> {
        let fd = self.require_direct_access()?;
        self.check_key(key)?;
        match self
            .kernel
            .lookup_elem(fd, key, self.params.value_size as usize)
        {
            Ok(value) => Ok(value),
            Err(KernelError::KeyNotFound) => Err(MapError::KeyNotFound { name: self.name() }),
            Err(e) => Err(e.into()),
        }
    }

    /// Inserts or overwrites the entry for `key` with a direct kernel
    /// call.
    ///
    /// # Errors
    ///
    /// As for [`get`](Self::get), plus [`MapError::BadValueSize`] on a
    /// value of the wrong length.
    pub fn update(&self, key: &[u8], value: &[u8]) -> Result<(), MapError> {
        let fd = self.require_direct_access()?;
        self.check_key(key)?;
        if value.len() != self.params.value_size as usize {
            return Err(MapError::BadValueSize {
                name: self.name(),
                expected: self.params.value_size,
                got: value.len(),
            });
        }
        self.kernel.update_elem(fd, key, value)?;
        Ok(())
    }

    /// Deletes the entry for `key` through the administrative interface.
    ///
    /// An entry that was already absent is reported as
    /// [`DeleteOutcome::AlreadyAbsent`], distinguished from genuine tool
    /// failure by the tool's diagnostic output.
    ///
    /// # Errors
    ///
    /// [`MapError::NotOpen`] on an unopened handle,
    /// [`MapError::BadKeySize`] on a key of the wrong length, and tool
    /// failures (with captured diagnostics) otherwise.
    pub fn delete(&self, key: &[u8]) -> Result<DeleteOutcome, MapError> {
        self.map_fd()?;
        self.check_key(key)?;
        tracing::debug!("deleting key {:?} from map {}", key, self.name());
        match self.admin.delete_entry(&self.path(), key) {
            Ok(()) => Ok(DeleteOutcome::Deleted),
            Err(e) if e.indicates_absent_key() => {
                tracing::debug!("key {:?} was already absent from {}", key, self.name());
                Ok(DeleteOutcome::AlreadyAbsent)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Iterates all entries via the administrative JSON dump, invoking
    /// `visit` once per record in the order the dump produced them.
    ///
    /// # Errors
    ///
    /// [`MapError::NotOpen`] on an unopened handle, tool failures from
    /// the dump itself, and [`MapError::DumpParse`] when the document is
    /// malformed (no record is visited) or a record's bytes cannot be
    /// decoded (the error names the failing record).
    pub fn iter<F>(&self, mut visit: F) -> Result<(), MapError>
    where
        F: FnMut(&[u8], &[u8]),
    {
        self.map_fd()?;
        let path = self.path();
        let doc = self.admin.dump_map(&path)?;
        let entries = tool::parse_dump_document(&doc).map_err(|e| MapError::DumpParse {
            path: path.clone(),
            detail: format!("invalid JSON: {e}"),
        })?;

        for (index, entry) in entries.iter().enumerate() {
            let key = tool::decode_byte_strings(&entry.key).map_err(|e| MapError::DumpParse {
                path: path.clone(),
                detail: format!("record {index} key: {e}"),
            })?;
            let value = tool::decode_byte_strings(&entry.value).map_err(|e| MapError::DumpParse {
                path: path.clone(),
                detail: format!("record {index} value: {e}"),
            })?;
            visit(&key, &value);
        }

        Ok(())
    }

    fn require_direct_access(&self) -> Result<MapFd, MapError> {
        if self.per_cpu {
            // Per-CPU values are an array of per-core slices; reading one
            // through the single-value path would truncate silently.
            return Err(MapError::PerCpuUnsupported { name: self.name() });
        }
        self.map_fd()
    }

    fn check_key(&self, key: &[u8]) -> Result<(), MapError> {
        if key.len() != self.params.key_size as usize {
            return Err(MapError::BadKeySize {
                name: self.name(),
                expected: self.params.key_size,
                got: key.len(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for PinnedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinnedMap")
            .field("name", &self.name())
            .field("path", &self.path())
            .field("open", &self.is_open())
            .field("per_cpu", &self.per_cpu)
            .finish_non_exhaustive()
    }
}

/// Creates the pin parent directory (mode 0700 where supported).
fn ensure_pin_dir(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}
