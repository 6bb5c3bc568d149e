//! Manager configuration and handle construction.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::kernel::{MapKernel, SysKernel};
use crate::tool::{Bpftool, MapAdmin};

use super::{MapError, MapParams, PinnedMap};

/// Configuration for a map manager.
#[derive(Debug, Clone)]
pub struct MapConfig {
    /// Recover orphaned kernel objects by registry lookup when their pin
    /// is missing (e.g. after a control-plane restart that lost the pin
    /// but not the map).
    pub repinning_enabled: bool,

    /// Mount point of the BPF filesystem.
    pub bpffs_root: PathBuf,

    /// Administrative tool binary, a `PATH` name or an absolute path.
    pub bpftool: PathBuf,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            repinning_enabled: false,
            bpffs_root: PathBuf::from("/sys/fs/bpf"),
            bpftool: PathBuf::from("bpftool"),
        }
    }
}

impl MapConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> MapConfigBuilder {
        MapConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), MapError> {
        if self.bpffs_root.as_os_str().is_empty() {
            return Err(MapError::InvalidConfig(
                "bpffs_root cannot be empty".to_string(),
            ));
        }
        if !self.bpffs_root.is_absolute() {
            return Err(MapError::InvalidConfig(
                "bpffs_root must be an absolute path".to_string(),
            ));
        }
        if self.bpftool.as_os_str().is_empty() {
            return Err(MapError::InvalidConfig(
                "bpftool cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for [`MapConfig`].
#[derive(Debug, Default)]
pub struct MapConfigBuilder {
    repinning_enabled: Option<bool>,
    bpffs_root: Option<PathBuf>,
    bpftool: Option<PathBuf>,
}

impl MapConfigBuilder {
    /// Enables or disables repinning of orphaned kernel objects.
    #[must_use]
    pub fn repinning_enabled(mut self, enabled: bool) -> Self {
        self.repinning_enabled = Some(enabled);
        self
    }

    /// Sets the BPF filesystem mount point.
    #[must_use]
    pub fn bpffs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.bpffs_root = Some(root.into());
        self
    }

    /// Sets the administrative tool binary.
    #[must_use]
    pub fn bpftool(mut self, program: impl Into<PathBuf>) -> Self {
        self.bpftool = Some(program.into());
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<MapConfig, MapError> {
        let defaults = MapConfig::default();
        let config = MapConfig {
            repinning_enabled: self.repinning_enabled.unwrap_or(defaults.repinning_enabled),
            bpffs_root: self.bpffs_root.unwrap_or(defaults.bpffs_root),
            bpftool: self.bpftool.unwrap_or(defaults.bpftool),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Constructs pinned-map handles and owns the transports they share.
///
/// Handles built by the same context share its repinning policy; managers
/// with different policies can coexist in one process.
pub struct MapContext {
    config: MapConfig,
    kernel: Arc<dyn MapKernel>,
    admin: Arc<dyn MapAdmin>,
}

impl MapContext {
    /// Creates a manager with the real transports (direct syscalls plus
    /// the configured tool binary).
    #[must_use]
    pub fn new(config: MapConfig) -> Self {
        let kernel = Arc::new(SysKernel::new(config.bpffs_root.clone()));
        let admin = Arc::new(Bpftool::new(config.bpftool.clone()));
        Self {
            config,
            kernel,
            admin,
        }
    }

    /// Creates a manager with caller-supplied transports.
    #[must_use]
    pub fn with_transports(
        config: MapConfig,
        kernel: Arc<dyn MapKernel>,
        admin: Arc<dyn MapAdmin>,
    ) -> Self {
        Self {
            config,
            kernel,
            admin,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Builds an unopened handle for `params`.
    ///
    /// # Errors
    ///
    /// Fails eagerly with [`MapError::NameTooLong`] if the versioned name
    /// would exceed the kernel's object-name limit.
    pub fn pinned_map(&self, params: MapParams) -> Result<PinnedMap, MapError> {
        params.validate()?;
        Ok(PinnedMap::new(
            params,
            self.config.repinning_enabled,
            Arc::clone(&self.kernel),
            Arc::clone(&self.admin),
        ))
    }
}

impl fmt::Debug for MapContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
