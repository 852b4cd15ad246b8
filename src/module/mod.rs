//! Module system for module-host
//!
//! Discovers module archives in a directory, validates their descriptors,
//! loads each module's code, constructs and enables it, and disables every
//! module exactly once at shutdown.
//!
//! ## Architecture
//!
//! - **Registry**: archive discovery, descriptor extraction, staged updates and
//!   the ordered lifecycle registry
//! - **Validation**: descriptor checks before any code is loaded
//! - **Loader**: code sources (native libraries or an in-process entry point
//!   table), declaration verification, construction and enable
//! - **Shutdown**: the one-shot hook disabling modules in load order
//! - **Manager**: the all-or-nothing initialization state machine

pub mod loader;
pub mod manager;
pub mod registry;
pub mod shutdown;
pub mod traits;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;

pub use loader::{
    CodeImage, CodeSource, EntryPointTable, LoadedModule, ModuleLoader, NativeCodeSource,
};
pub use manager::ModuleManager;
pub use registry::{ModuleArchive, ModuleDescriptor, ModuleRegistry, Properties, SharedModule};
pub use shutdown::{ShutdownCoordinator, ShutdownHook, ShutdownReport};
pub use traits::{
    ManagerState, Module, ModuleConstructor, ModuleDeclaration, ModuleError, CORE_VERSION,
    MODULE_ABI_VERSION, RUSTC_VERSION,
};
