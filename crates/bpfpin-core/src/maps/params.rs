//! Map identities and versioned naming.

use crate::kernel::BPF_OBJ_NAME_LEN;

use super::MapError;

/// Static description of a kernel map. Immutable after construction.
///
/// Pass to [`MapContext::pinned_map`](super::MapContext::pinned_map) to
/// obtain a handle; the identity itself has no side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapParams {
    /// Base pin path (absolute).
    pub filename: String,
    /// Kernel map type tag understood by the map-creation interface,
    /// e.g. `hash` or `percpu_hash`.
    pub kernel_type: String,
    /// Key size in bytes.
    pub key_size: u32,
    /// Value size in bytes.
    pub value_size: u32,
    /// Maximum number of entries.
    pub max_entries: u32,
    /// Kernel-visible object name, before version suffixing.
    pub name: String,
    /// Map creation flags.
    pub flags: u32,
    /// Schema version. Generations > 1 get a numeric suffix so
    /// incompatible layouts can coexist during migration.
    pub version: u32,
}

fn versioned(base: &str, version: u32) -> String {
    if version <= 1 {
        base.to_string()
    } else {
        format!("{base}{version}")
    }
}

impl MapParams {
    /// Kernel-visible name with the schema-version suffix applied.
    #[must_use]
    pub fn versioned_name(&self) -> String {
        versioned(&self.name, self.version)
    }

    /// Pin path with the schema-version suffix applied.
    #[must_use]
    pub fn versioned_filename(&self) -> String {
        versioned(&self.filename, self.version)
    }

    /// Whether the kernel type stores one value slot per CPU.
    #[must_use]
    pub fn is_per_cpu(&self) -> bool {
        self.kernel_type.contains("percpu")
    }

    /// Checks the invariants that must hold before any kernel interaction.
    pub(super) fn validate(&self) -> Result<(), MapError> {
        let versioned_name = self.versioned_name();
        if versioned_name.len() >= BPF_OBJ_NAME_LEN {
            return Err(MapError::NameTooLong {
                name: versioned_name,
                limit: BPF_OBJ_NAME_LEN,
            });
        }
        Ok(())
    }
}
