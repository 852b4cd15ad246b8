//! Module system traits and interfaces
//!
//! Defines the capability contract every loaded module satisfies, the
//! declaration a module library exports under its entry-point symbol, and the
//! error taxonomy of the module system.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::module::registry::archive::ModuleArchive;
use crate::module::registry::descriptor::ModuleDescriptor;

/// ABI revision of [`ModuleDeclaration`] and the [`Module`] trait.
///
/// Bumped whenever the layout of the declaration or the trait changes.
pub const MODULE_ABI_VERSION: u32 = 1;

/// Version of this crate, embedded in every declaration built against it
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// `rustc --version` of the compiler that built this crate
///
/// Trait objects and descriptors only share a layout under the same compiler.
pub const RUSTC_VERSION: &str = env!("MODULE_HOST_RUSTC_VERSION");

/// Module trait that all modules must implement
///
/// Implemented by module libraries (or by code registered in an
/// [`EntryPointTable`](crate::module::loader::EntryPointTable)). The manager
/// never knows the concrete type; it only talks to modules through this trait.
pub trait Module: Send {
    /// Descriptor this module was constructed with
    fn descriptor(&self) -> &ModuleDescriptor;

    /// Archive the module was loaded from
    fn archive(&self) -> &ModuleArchive;

    /// Called exactly once, right after construction and before registration.
    ///
    /// An error (or a panic) aborts loading: the module is never registered.
    fn on_enable(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called exactly once at shutdown, in registration order.
    fn on_disable(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Module name (registry key)
    fn name(&self) -> &str {
        self.descriptor().name()
    }

    /// Module version
    fn version(&self) -> &str {
        self.descriptor().version()
    }

    /// Module author
    fn author(&self) -> &str {
        self.descriptor().author()
    }
}

/// Constructor shape every module exposes: (archive handle, descriptor).
pub type ModuleConstructor =
    fn(ModuleArchive, ModuleDescriptor) -> anyhow::Result<Box<dyn Module>>;

/// Declaration exported by a module library under its `main` symbol
///
/// Use [`declare_module!`](crate::declare_module) to produce one.
/// `abi_version` stays the first field so a host can read it from a library
/// built against any other revision.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ModuleDeclaration {
    /// ABI revision the module was built for
    pub abi_version: u32,
    /// Compiler that built the module
    pub rustc_version: &'static str,
    /// `CARGO_PKG_VERSION` of the module-host crate the module was built against
    pub core_version: &'static str,
    /// Entry point constructor
    pub constructor: ModuleConstructor,
}

impl ModuleDeclaration {
    /// Declaration for the running host build
    pub const fn new(constructor: ModuleConstructor) -> Self {
        Self {
            abi_version: MODULE_ABI_VERSION,
            rustc_version: RUSTC_VERSION,
            core_version: CORE_VERSION,
            constructor,
        }
    }
}

/// Export a [`ModuleDeclaration`] from a module library.
///
/// The symbol name is what the module's descriptor declares as `main`.
///
/// ```rust,ignore
/// module_host::declare_module!(ECHO_MODULE, EchoModule::create);
/// ```
#[macro_export]
macro_rules! declare_module {
    ($symbol:ident, $constructor:path) => {
        #[no_mangle]
        #[allow(non_upper_case_globals)]
        pub static $symbol: $crate::module::ModuleDeclaration =
            $crate::module::ModuleDeclaration::new($constructor);
    };
}

/// Module manager lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManagerState {
    /// `init()` has not been called
    Uninitialized,
    /// Archives are being scanned and loaded
    Initializing,
    /// Every discovered module is loaded and enabled
    Ready,
    /// Initialization aborted; the manager holds no modules
    Failed,
}

/// Module system errors
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Invalid module descriptor in {archive}: {reason}")]
    InvalidDescriptor { archive: String, reason: String },

    #[error("Invalid module {entry_point} in {archive}: {reason}")]
    InvalidModule {
        archive: String,
        entry_point: String,
        reason: String,
    },

    #[error("Failed to load module {archive}: {reason}")]
    ModuleLoadError {
        archive: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },

    #[error("Module manager is already initialized")]
    AlreadyInitialized,
}

impl ModuleError {
    pub(crate) fn invalid_descriptor(archive: &ModuleArchive, reason: impl Into<String>) -> Self {
        ModuleError::InvalidDescriptor {
            archive: archive.file_name(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_module(
        archive: &ModuleArchive,
        entry_point: &str,
        reason: impl Into<String>,
    ) -> Self {
        ModuleError::InvalidModule {
            archive: archive.file_name(),
            entry_point: entry_point.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn load_error(archive: &ModuleArchive, reason: impl Into<String>) -> Self {
        ModuleError::ModuleLoadError {
            archive: archive.file_name(),
            reason: reason.into(),
            source: None,
        }
    }

    pub(crate) fn load_error_with<E>(
        archive: &ModuleArchive,
        reason: impl Into<String>,
        source: E,
    ) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        ModuleError::ModuleLoadError {
            archive: archive.file_name(),
            reason: reason.into(),
            source: Some(source.into()),
        }
    }
}

/// Render a caught panic payload for logs and errors
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_carries_host_versions() {
        fn never(_: ModuleArchive, _: ModuleDescriptor) -> anyhow::Result<Box<dyn Module>> {
            anyhow::bail!("not constructible")
        }

        let decl = ModuleDeclaration::new(never);
        assert_eq!(decl.abi_version, MODULE_ABI_VERSION);
        assert_eq!(decl.core_version, CORE_VERSION);
        assert_eq!(decl.rustc_version, RUSTC_VERSION);
        assert!(RUSTC_VERSION.starts_with("rustc "), "{}", RUSTC_VERSION);
    }

    #[test]
    fn test_error_messages_name_archive() {
        let archive = ModuleArchive::new("/tmp/modules/foo.zip");
        let err = ModuleError::invalid_descriptor(&archive, "missing required key `version`");
        let msg = err.to_string();
        assert!(msg.contains("foo.zip"));
        assert!(msg.contains("version"));

        let err =
            ModuleError::load_error_with(&archive, "constructor failed", anyhow::anyhow!("boom"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
