//! Configuration for stripestore
//!
//! Library-wide limits live in [`Config`]; everything that describes one
//! unit (its volumes and striping) lives in [`UnitConfig`].

use std::path::{Path, PathBuf};

use crate::volume::OpenMode;

/// Library-wide configuration for a [`Registry`](crate::Registry)
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Registry Limits
    // -------------------------------------------------------------------------
    /// Number of unit slots; valid unit ids are `0..max_units`
    pub max_units: u32,

    /// Upper bound on the number of volumes a single unit may stripe over
    pub max_volumes_per_unit: u32,

    // -------------------------------------------------------------------------
    // Unit Defaults
    // -------------------------------------------------------------------------
    /// Stripe size used when a unit does not specify one (in bytes)
    pub default_stripe_size: u64,

    /// Size of the reserved TOC region at the start of every unit (in bytes)
    pub default_toc_region_size: u64,

    // -------------------------------------------------------------------------
    // Failure Policy
    // -------------------------------------------------------------------------
    /// Exit status a binary should use when initialization fails fatally
    pub fatal_exit_code: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_units: 256,
            max_volumes_per_unit: 8,
            default_stripe_size: 64 * 1024,     // 64 KB
            default_toc_region_size: 64 * 1024, // 64 KB
            fatal_exit_code: 1,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the number of unit slots
    pub fn max_units(mut self, count: u32) -> Self {
        self.config.max_units = count;
        self
    }

    /// Set the maximum number of volumes per unit
    pub fn max_volumes_per_unit(mut self, count: u32) -> Self {
        self.config.max_volumes_per_unit = count;
        self
    }

    /// Set the default stripe size (in bytes)
    pub fn default_stripe_size(mut self, size: u64) -> Self {
        self.config.default_stripe_size = size;
        self
    }

    /// Set the default reserved TOC region size (in bytes)
    pub fn default_toc_region_size(mut self, size: u64) -> Self {
        self.config.default_toc_region_size = size;
        self
    }

    /// Set the exit status used for fatal initialization failures
    pub fn fatal_exit_code(mut self, code: i32) -> Self {
        self.config.fatal_exit_code = code;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// Configuration of a single unit, supplied when it is opened
#[derive(Debug, Clone, Default)]
pub struct UnitConfig {
    /// Backing files, in volume-index order
    pub volume_paths: Vec<PathBuf>,

    /// Expected number of volumes; must match `volume_paths` when given
    pub volume_count: Option<u32>,

    /// Bytes per stripe; falls back to `Config::default_stripe_size`
    pub stripe_size: Option<u64>,

    /// Reserved TOC region; falls back to `Config::default_toc_region_size`
    pub toc_region_size: Option<u64>,

    /// Whether existing volume contents are kept or truncated
    pub mode: OpenMode,
}

impl UnitConfig {
    /// Create a new unit config builder
    pub fn builder() -> UnitConfigBuilder {
        UnitConfigBuilder::default()
    }

    /// A single-volume unit backed by `path`
    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self::builder().volume(path).build()
    }

    /// Stripe size after applying library defaults
    pub fn effective_stripe_size(&self, config: &Config) -> u64 {
        self.stripe_size.unwrap_or(config.default_stripe_size)
    }

    /// TOC region size after applying library defaults
    pub fn effective_toc_region_size(&self, config: &Config) -> u64 {
        self.toc_region_size.unwrap_or(config.default_toc_region_size)
    }
}

/// Builder for UnitConfig
#[derive(Default)]
pub struct UnitConfigBuilder {
    config: UnitConfig,
}

impl UnitConfigBuilder {
    /// Append one backing volume
    pub fn volume(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.volume_paths.push(path.into());
        self
    }

    /// Append several backing volumes
    pub fn volumes<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.config
            .volume_paths
            .extend(paths.into_iter().map(Into::into));
        self
    }

    /// One volume per directory, named `{dir}/{basename}.{unit_id}`
    pub fn striped<I, P>(mut self, dirs: I, basename: &str, unit_id: u32) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for dir in dirs {
            let path = dir.as_ref().join(format!("{}.{}", basename, unit_id));
            self.config.volume_paths.push(path);
        }
        self
    }

    /// Declare the expected volume count
    pub fn volume_count(mut self, count: u32) -> Self {
        self.config.volume_count = Some(count);
        self
    }

    /// Set the stripe size (in bytes)
    pub fn stripe_size(mut self, size: u64) -> Self {
        self.config.stripe_size = Some(size);
        self
    }

    /// Set the reserved TOC region size (in bytes)
    pub fn toc_region_size(mut self, size: u64) -> Self {
        self.config.toc_region_size = Some(size);
        self
    }

    /// Set the open mode
    pub fn mode(mut self, mode: OpenMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn build(self) -> UnitConfig {
        self.config
    }
}
