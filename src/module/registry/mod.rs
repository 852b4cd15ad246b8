//! Module registry and discovery
//!
//! Handles archive discovery, descriptor extraction, staged updates and the
//! lifecycle registry of loaded modules.

pub mod archive;
pub mod descriptor;
pub mod discovery;
pub mod lifecycle;
pub mod properties;
pub mod staging;

pub use archive::ModuleArchive;
pub use descriptor::{read_descriptor, ModuleDescriptor, DEFAULT_DESCRIPTOR_NAME};
pub use discovery::ModuleDiscovery;
pub use lifecycle::{ModuleRegistry, SharedModule};
pub use properties::Properties;
pub use staging::apply_staged_updates;
