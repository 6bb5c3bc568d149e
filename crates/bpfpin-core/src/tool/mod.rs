//! External administrative transport for bulk and registry operations.
//!
//! Keyed deletion, whole-map dumps, registry listings, and map
//! creation/pinning go through an external `bpftool` process rather than
//! direct syscalls. The two transports are deliberately kept apart: this
//! one speaks the tool's JSON and textual byte encodings, while
//! [`crate::kernel`] moves raw binary buffers. Invocations are synchronous
//! blocking calls with no timeout and no retries; callers needing bounded
//! latency wrap them externally.

mod bpftool;
mod dump;
mod error;

pub use bpftool::{dump_args, Bpftool};
pub use dump::{decode_byte_strings, parse_dump_document, ByteDecodeError, DumpEntry};
pub use error::ToolError;

use std::path::Path;

use serde::Deserialize;

/// A live kernel map as reported by the registry listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MapMeta {
    /// Kernel object id.
    pub id: u32,
    /// Kernel-visible object name; unnamed maps report an empty string.
    #[serde(default)]
    pub name: String,
}

/// Parameters for creating and pinning a new kernel map.
#[derive(Debug, Clone)]
pub struct CreateMapRequest<'a> {
    /// Pin path for the new map.
    pub pin: &'a Path,
    /// Kernel map type tag, e.g. `hash`.
    pub kernel_type: &'a str,
    /// Key size in bytes.
    pub key_size: u32,
    /// Value size in bytes.
    pub value_size: u32,
    /// Maximum number of entries.
    pub max_entries: u32,
    /// Kernel-visible (versioned) object name.
    pub name: &'a str,
    /// Map creation flags.
    pub flags: u32,
}

/// Administrative interface over kernel maps.
///
/// Implemented by [`Bpftool`] for real systems and by
/// [`crate::testing::MockAdmin`] in tests.
pub trait MapAdmin: Send + Sync {
    /// Creates a new kernel map and pins it at the request's pin path.
    ///
    /// # Errors
    ///
    /// Fails if the tool cannot be launched or rejects the request
    /// (including unsupported type/size combinations); the error carries
    /// the tool's diagnostic output.
    fn create_map(&self, req: &CreateMapRequest<'_>) -> Result<(), ToolError>;

    /// Dumps the whole map pinned at `pin`, returning the raw JSON
    /// document.
    ///
    /// # Errors
    ///
    /// Fails if the tool cannot be launched or exits unsuccessfully.
    fn dump_map(&self, pin: &Path) -> Result<Vec<u8>, ToolError>;

    /// Deletes the entry for `key` from the map pinned at `pin`.
    ///
    /// # Errors
    ///
    /// Fails if the tool cannot be launched or exits unsuccessfully; a
    /// failure whose diagnostics satisfy
    /// [`ToolError::indicates_absent_key`] means the entry did not exist.
    fn delete_entry(&self, pin: &Path, key: &[u8]) -> Result<(), ToolError>;

    /// Lists all live maps in the kernel registry.
    ///
    /// # Errors
    ///
    /// Fails if the tool cannot be launched, exits unsuccessfully, or
    /// produces malformed JSON.
    fn list_maps(&self) -> Result<Vec<MapMeta>, ToolError>;

    /// Pins the live map with kernel object id `id` at `pin`.
    ///
    /// # Errors
    ///
    /// Fails if the tool cannot be launched or exits unsuccessfully.
    fn pin_by_id(&self, id: u32, pin: &Path) -> Result<(), ToolError>;
}
