//! Recovery of orphaned kernel maps by registry lookup.
//!
//! A control-plane restart can leave a live kernel map without its
//! filesystem pin. When repinning is enabled, the reconciler searches the
//! kernel's registry of live objects by versioned name and binds a fresh
//! pin to the surviving map instead of creating a duplicate.

use std::path::Path;

use crate::tool::MapAdmin;

use super::MapError;

/// Result of a repin search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RepinOutcome {
    /// A live map with the requested name was found and pinned.
    Repinned {
        /// Kernel object id of the map that was pinned.
        id: u32,
    },
    /// No live map carries the requested name.
    NotFound,
}

/// Searches the kernel registry for a live map named exactly `name` and,
/// if found, pins it at `pin`.
///
/// The registry is not expected to contain duplicate names; if it does,
/// the first match wins. Listing or pinning failures propagate as-is so
/// the caller never falls through to creating a map the lookup could not
/// definitively rule out.
pub(super) fn repin_by_name(
    admin: &dyn MapAdmin,
    name: &str,
    pin: &Path,
) -> Result<RepinOutcome, MapError> {
    let maps = admin.list_maps()?;
    tracing::debug!("kernel registry lists {} live maps", maps.len());

    for meta in maps {
        if meta.name == name {
            admin.pin_by_id(meta.id, pin)?;
            return Ok(RepinOutcome::Repinned { id: meta.id });
        }
    }

    Ok(RepinOutcome::NotFound)
}
