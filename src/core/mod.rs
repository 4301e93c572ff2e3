//! Core module - configuration, validation, and package building

pub mod builder;
pub mod config;
pub mod fs;
pub mod license;
pub mod validate;

pub use builder::{create_package, BuildError, BuildOptions, BuildSummary, PackageBuilder};
pub use config::{load_config, ConfigError, RawConfig};
pub use fs::{FileSystem, LocalFs, MemoryFs};
pub use license::{LicenseCatalog, LicenseError};
pub use validate::{validate, Layout, PackageConfig, ValidationError};
