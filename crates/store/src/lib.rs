//! Blueprint persistence: validated identifiers, a checksummed compressed
//! binary file format, a schema-upgrade chain, ranked sources, and the
//! caching repository.

pub mod atomic_write;
mod error;
pub mod file_format;
mod id;
mod repository;
pub mod source;
pub mod upgrade;

pub use error::StoreError;
pub use id::{BlueprintId, BINARY_EXT, DEFAULT_NAMESPACE, GENERATED_SUBDIR, TEXT_EXT};
pub use repository::BlueprintRepository;
pub use source::{DevSource, DiskSource, PackSource, Source};
pub use upgrade::{build_upgrade_registry, SchemaUpgrader, UpgradeRegistry, UpgradeStep};
