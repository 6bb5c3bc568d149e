//! Testing utilities for the map manager.
//!
//! Mock implementations of the two transport seams with call accounting,
//! used by this crate's own tests and usable by downstream integration
//! tests. Pins are plain files in a caller-chosen directory, so the
//! reconciler's stat/create/open sequence runs unchanged against a
//! tempdir.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::kernel::{KernelError, MapFd, MapKernel};
use crate::tool::{CreateMapRequest, MapAdmin, MapMeta, ToolError};

/// Mock direct-kernel transport.
///
/// `open_pin` succeeds only when the pin path exists as a file, handing
/// out ascending descriptor values; element storage is one in-memory
/// table shared by all descriptors.
#[derive(Debug, Default)]
pub struct MockKernel {
    state: Mutex<KernelState>,
}

#[derive(Debug, Default)]
struct KernelState {
    next_fd: i32,
    open_calls: usize,
    mount_calls: usize,
    closed: Vec<i32>,
    entries: HashMap<Vec<u8>, Vec<u8>>,
}

impl MockKernel {
    /// Creates an empty mock with no stored entries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `ensure_mounted` calls observed.
    #[must_use]
    pub fn mount_calls(&self) -> usize {
        self.state.lock().mount_calls
    }

    /// Number of `open_pin` calls that succeeded.
    #[must_use]
    pub fn open_calls(&self) -> usize {
        self.state.lock().open_calls
    }

    /// Descriptors passed to `close`, in order.
    #[must_use]
    pub fn closed(&self) -> Vec<i32> {
        self.state.lock().closed.clone()
    }

    /// The stored value for `key`, if any.
    #[must_use]
    pub fn entry(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.state.lock().entries.get(key).cloned()
    }
}

impl MapKernel for MockKernel {
    fn ensure_mounted(&self) -> Result<bool, KernelError> {
        self.state.lock().mount_calls += 1;
        Ok(false)
    }

    fn open_pin(&self, path: &Path) -> Result<MapFd, KernelError> {
        if !path.is_file() {
            return Err(KernelError::OpenPin {
                path: path.to_path_buf(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        let mut state = self.state.lock();
        state.open_calls += 1;
        state.next_fd += 1;
        Ok(MapFd::new(100 + state.next_fd))
    }

    fn lookup_elem(
        &self,
        _fd: MapFd,
        key: &[u8],
        value_size: usize,
    ) -> Result<Vec<u8>, KernelError> {
        let state = self.state.lock();
        match state.entries.get(key) {
            Some(value) => {
                let mut out = value.clone();
                out.resize(value_size, 0);
                Ok(out)
            }
            None => Err(KernelError::KeyNotFound),
        }
    }

    fn update_elem(&self, _fd: MapFd, key: &[u8], value: &[u8]) -> Result<(), KernelError> {
        self.state
            .lock()
            .entries
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn close(&self, fd: MapFd) -> Result<(), KernelError> {
        self.state.lock().closed.push(fd.raw());
        Ok(())
    }
}

/// Mock administrative transport.
///
/// `create_map` and `pin_by_id` materialize the pin as an empty file; the
/// registry listing, dump document, and delete behavior are configurable.
#[derive(Debug, Default)]
pub struct MockAdmin {
    state: Mutex<AdminState>,
}

#[derive(Debug, Default)]
struct AdminState {
    registry: Vec<MapMeta>,
    dump_document: Vec<u8>,
    delete_diagnostics: Option<String>,
    list_fails: bool,
    create_calls: usize,
    pins: Vec<(u32, PathBuf)>,
    deleted_keys: Vec<Vec<u8>>,
}

impl MockAdmin {
    /// Creates a mock with an empty registry and an empty dump document.
    #[must_use]
    pub fn new() -> Self {
        let admin = Self::default();
        admin.state.lock().dump_document = b"[]".to_vec();
        admin
    }

    /// Sets the registry listing returned by `list_maps`.
    pub fn set_registry(&self, maps: Vec<MapMeta>) {
        self.state.lock().registry = maps;
    }

    /// Sets the JSON document returned by `dump_map`.
    pub fn set_dump_document(&self, doc: impl Into<Vec<u8>>) {
        self.state.lock().dump_document = doc.into();
    }

    /// Makes every `delete_entry` call fail with the given diagnostics.
    pub fn fail_delete_with(&self, diagnostics: impl Into<String>) {
        self.state.lock().delete_diagnostics = Some(diagnostics.into());
    }

    /// Makes `list_maps` fail.
    pub fn fail_list(&self) {
        self.state.lock().list_fails = true;
    }

    /// Number of `create_map` calls observed.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.state.lock().create_calls
    }

    /// `(id, path)` pairs passed to `pin_by_id`, in order.
    #[must_use]
    pub fn pins(&self) -> Vec<(u32, PathBuf)> {
        self.state.lock().pins.clone()
    }

    /// Keys passed to successful `delete_entry` calls, in order.
    #[must_use]
    pub fn deleted_keys(&self) -> Vec<Vec<u8>> {
        self.state.lock().deleted_keys.clone()
    }
}

fn touch(pin: &Path) -> Result<(), ToolError> {
    fs::write(pin, b"").map_err(|source| ToolError::Launch {
        program: "mock".to_string(),
        source,
    })
}

impl MapAdmin for MockAdmin {
    fn create_map(&self, req: &CreateMapRequest<'_>) -> Result<(), ToolError> {
        self.state.lock().create_calls += 1;
        touch(req.pin)
    }

    fn dump_map(&self, _pin: &Path) -> Result<Vec<u8>, ToolError> {
        Ok(self.state.lock().dump_document.clone())
    }

    fn delete_entry(&self, pin: &Path, key: &[u8]) -> Result<(), ToolError> {
        let mut state = self.state.lock();
        if let Some(diagnostics) = &state.delete_diagnostics {
            return Err(ToolError::Failed {
                context: format!("map delete {} key {key:?}", pin.display()),
                program: "mock".to_string(),
                status: "exit status: 255".to_string(),
                diagnostics: diagnostics.clone(),
            });
        }
        state.deleted_keys.push(key.to_vec());
        Ok(())
    }

    fn list_maps(&self) -> Result<Vec<MapMeta>, ToolError> {
        let state = self.state.lock();
        if state.list_fails {
            return Err(ToolError::Failed {
                context: "map list".to_string(),
                program: "mock".to_string(),
                status: "exit status: 1".to_string(),
                diagnostics: "mock registry failure".to_string(),
            });
        }
        Ok(state.registry.clone())
    }

    fn pin_by_id(&self, id: u32, pin: &Path) -> Result<(), ToolError> {
        touch(pin)?;
        self.state.lock().pins.push((id, pin.to_path_buf()));
        Ok(())
    }
}
