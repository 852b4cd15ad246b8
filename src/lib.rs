//! Module Host - runtime module loading for Rust applications
//!
//! Scans a directory for module archives, reads each archive's
//! `module.properties` descriptor, loads the module's code, constructs and
//! enables it, and disables every loaded module exactly once at shutdown.
//!
//! ## Design Principles
//!
//! 1. **All-or-nothing initialization**: one bad archive fails the whole
//!    startup and leaves nothing enabled
//! 2. **No global state**: the [`ModuleManager`] is an explicit context object
//! 3. **Failure isolation on shutdown**: one module failing to disable never
//!    stops the others
//!
//! ## Example
//!
//! ```rust,no_run
//! use module_host::{ModuleManager, ModuleManagerConfig};
//!
//! let mut manager = ModuleManager::new(ModuleManagerConfig::with_modules_dir("modules"));
//! manager.init()?;
//! for name in manager.module_names() {
//!     println!("loaded {}", name);
//! }
//! manager.shutdown();
//! # Ok::<(), module_host::ModuleError>(())
//! ```

pub mod config;
pub mod module;
pub mod utils;

pub use config::{LoggingConfig, ModuleManagerConfig, ShutdownConfig};
pub use module::{
    EntryPointTable, ManagerState, Module, ModuleArchive, ModuleDeclaration, ModuleDescriptor,
    ModuleError, ModuleManager, ShutdownHook, ShutdownReport,
};
