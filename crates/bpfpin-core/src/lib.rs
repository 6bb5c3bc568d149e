//! # `BpfPin` Core
//!
//! Lifecycle management for pinned BPF maps: kernel-resident key/value
//! tables shared between a user-space control plane and in-kernel programs.
//!
//! This crate provides:
//! - **Map identity**: static description of a map (type, sizes, capacity,
//!   schema version) and the versioned name/path derivation that lets
//!   incompatible schema generations coexist
//! - **Pinned handles**: [`PinnedMap`], a handle bound to a filesystem pin
//!   and an open kernel descriptor
//! - **Existence reconciliation**: [`PinnedMap::ensure_exists`] reconciles
//!   the in-process handle, the filesystem pin, and the kernel's own map
//!   registry, creating or re-pinning as needed
//! - **Entry operations**: get/update via direct `bpf(2)` calls,
//!   delete/iterate via the `bpftool` administrative interface
//!
//! ## Design Principles
//!
//! 1. **Idempotent reconciliation** - `ensure_exists` is safe to call
//!    repeatedly and survives control-plane restarts
//! 2. **Two transports, kept apart** - single-key operations use raw
//!    syscalls, bulk/admin operations shell out to `bpftool`; the two have
//!    genuinely different data encodings and are not unified
//! 3. **No retries, no locks** - every failure surfaces to the caller with
//!    the captured diagnostics; each handle has a single logical owner
//!
//! ## Example
//!
//! ```rust,ignore
//! use bpfpin_core::{MapConfig, MapContext, MapParams};
//!
//! let ctx = MapContext::new(MapConfig::default());
//! let mut map = ctx.pinned_map(MapParams {
//!     filename: "/sys/fs/bpf/tc/globals/flow_stats".to_string(),
//!     kernel_type: "hash".to_string(),
//!     key_size: 8,
//!     value_size: 16,
//!     max_entries: 512_000,
//!     name: "flow_stats".to_string(),
//!     flags: 0,
//!     version: 2,
//! })?;
//!
//! map.ensure_exists()?;
//! map.update(&key, &value)?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)] // Selectively allowed in the syscall module with justification
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod kernel;
pub mod maps;
pub mod testing;
pub mod tool;

// Re-export key types
pub use maps::{DeleteOutcome, MapConfig, MapContext, MapError, MapParams, PinnedMap};

/// Result type for map operations
pub type Result<T> = std::result::Result<T, maps::MapError>;
