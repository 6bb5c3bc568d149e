//! Pinned map lifecycle management.
//!
//! A kernel map has three sources of truth that can drift apart across
//! control-plane restarts: the in-process handle, the filesystem pin, and
//! the kernel's own registry of live objects. This module reconciles them.
//!
//! ## Handle State Machine
//!
//! ```text
//! Unopened --ensure_exists()--> Opened --close()--> Unopened
//! ```
//!
//! `Opened` is the only state from which entry operations are permitted.
//! Attempting one from `Unopened` is a caller defect, reported as the
//! distinguished usage error [`MapError::NotOpen`] rather than retried.
//!
//! ## Schema Versions
//!
//! A schema version > 1 suffixes both the kernel-visible name and the pin
//! path with the decimal version, so incompatible generations of "the
//! same" map coexist on disk and in the kernel during migration. Versions
//! 0 and 1 leave both unsuffixed.

mod context;
mod error;
mod params;
mod pinned;
mod repin;

pub use context::{MapConfig, MapConfigBuilder, MapContext};
pub use error::MapError;
pub use params::MapParams;
pub use pinned::PinnedMap;

/// Outcome of a keyed delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The entry existed and was deleted.
    Deleted,
    /// The entry was already absent. A distinguished success, not a
    /// failure.
    AlreadyAbsent,
}
