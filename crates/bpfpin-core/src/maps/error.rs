//! Map manager error types.
//!
//! The taxonomy matters more than the variants: configuration errors are
//! caught before any kernel interaction, usage errors are caller defects
//! that must not be retried, environment errors may be retried after
//! remediation, and not-found outcomes are distinguished from failure so
//! they can drive fallback logic.

use std::path::PathBuf;

use crate::kernel::KernelError;
use crate::tool::ToolError;

/// Errors from pinned-map operations.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// The kernel-visible name exceeds the object-name limit after
    /// version suffixing. Detected at handle construction, before any
    /// kernel interaction.
    #[error("map name too long after versioning: {name:?} (limit {limit} including NUL)")]
    NameTooLong {
        /// The offending versioned name.
        name: String,
        /// The kernel's object-name limit.
        limit: usize,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// An entry operation was attempted on an unopened handle. A contract
    /// violation: `ensure_exists` must succeed before any entry operation.
    #[error("map {name} is not open; ensure_exists() must succeed first")]
    NotOpen {
        /// Versioned map name.
        name: String,
    },

    /// Direct entry operations on per-CPU maps are not implemented; the
    /// per-CPU value layout (one slot per core) would need multiplied
    /// buffers, and guessing it would misread data silently.
    #[error("per-CPU entry operations are not implemented (map {name})")]
    PerCpuUnsupported {
        /// Versioned map name.
        name: String,
    },

    /// Key length does not match the map identity.
    #[error("map {name} key size mismatch: expected {expected} bytes, got {got}")]
    BadKeySize {
        /// Versioned map name.
        name: String,
        /// Key size from the identity.
        expected: u32,
        /// Length of the key actually supplied.
        got: usize,
    },

    /// Value length does not match the map identity.
    #[error("map {name} value size mismatch: expected {expected} bytes, got {got}")]
    BadValueSize {
        /// Versioned map name.
        name: String,
        /// Value size from the identity.
        expected: u32,
        /// Length of the value actually supplied.
        got: usize,
    },

    /// Creating the pin parent directory failed.
    #[error("failed to create pin directory {path}: {source}")]
    PinDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// Stat on the pin path failed with something other than not-found.
    /// Creation is not attempted in this case; the pin may exist but be
    /// unreachable, and creating over it could orphan a live map.
    #[error("failed to stat pin {path}: {source}")]
    Stat {
        /// Pin path that could not be inspected.
        path: PathBuf,
        /// Underlying OS error.
        source: std::io::Error,
    },

    /// No entry exists for the requested key.
    #[error("no entry for the given key in map {name}")]
    KeyNotFound {
        /// Versioned map name.
        name: String,
    },

    /// A dump document could not be parsed, naming the failing record.
    #[error("cannot parse dump of map {path}: {detail}")]
    DumpParse {
        /// Pin path the dump was taken from.
        path: PathBuf,
        /// What failed, including the record index for decode failures.
        detail: String,
    },

    /// Direct kernel transport failure.
    #[error("kernel transport: {0}")]
    Kernel(#[from] KernelError),

    /// External tool failure with captured diagnostics.
    #[error("map tool: {0}")]
    Tool(#[from] ToolError),
}

impl MapError {
    /// True for caller defects (misuse of the handle) that should never
    /// be retried.
    #[must_use]
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            MapError::NotOpen { .. }
                | MapError::PerCpuUnsupported { .. }
                | MapError::BadKeySize { .. }
                | MapError::BadValueSize { .. }
        )
    }

    /// True for the distinguished key-absent outcome.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            MapError::KeyNotFound { .. } => true,
            MapError::Kernel(k) => k.is_key_not_found(),
            _ => false,
        }
    }
}
