//! Module loader implementation
//!
//! Makes an archive's code resident, resolves and verifies its entry point,
//! constructs the module and enables it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::module::registry::archive::ModuleArchive;
use crate::module::registry::descriptor::ModuleDescriptor;
use crate::module::traits::{
    panic_message, Module, ModuleDeclaration, ModuleError, CORE_VERSION, MODULE_ABI_VERSION,
    RUSTC_VERSION,
};

/// Where module code comes from
///
/// `open` creates the per-archive loading context; after it returns, the
/// archive's code is resident in the process.
pub trait CodeSource: Send + Sync {
    fn open(
        &self,
        archive: &ModuleArchive,
        descriptor: &ModuleDescriptor,
    ) -> Result<Box<dyn CodeImage>, ModuleError>;
}

/// Per-archive loading context owning the module's code
pub trait CodeImage: Send {
    /// Resolve an exported module declaration by name
    fn resolve(&self, entry_point: &str) -> Option<ModuleDeclaration>;

    /// Release the code. Nothing may reference it afterwards.
    fn unload(self: Box<Self>) -> Result<(), ModuleError>;
}

/// A constructed, enabled module together with the code image backing it
pub struct LoadedModule {
    // Field order matters: the module must drop before its code.
    module: Box<dyn Module>,
    image: Box<dyn CodeImage>,
    disabled: bool,
}

impl std::fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModule")
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}

impl LoadedModule {
    pub(crate) fn new(module: Box<dyn Module>, image: Box<dyn CodeImage>) -> Self {
        Self {
            module,
            image,
            disabled: false,
        }
    }

    /// Whether `on_disable` has been called. A disabled module receives no
    /// further calls.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub(crate) fn mark_disabled(&mut self) {
        self.disabled = true;
    }

    /// The module instance
    pub fn module(&self) -> &dyn Module {
        self.module.as_ref()
    }

    /// The module instance, mutably
    pub fn module_mut(&mut self) -> &mut dyn Module {
        self.module.as_mut()
    }

    /// Descriptor of the module
    pub fn descriptor(&self) -> &ModuleDescriptor {
        self.module.descriptor()
    }

    /// Drop the module and release its code image
    ///
    /// Reserved: the manager keeps modules resident for the life of the
    /// process and never calls this.
    pub fn unload(self) -> Result<(), ModuleError> {
        let LoadedModule { module, image, .. } = self;
        drop(module);
        image.unload()
    }
}

/// Module loader for loading and enabling modules
#[derive(Clone)]
pub struct ModuleLoader {
    source: Arc<dyn CodeSource>,
}

impl ModuleLoader {
    /// Create a loader backed by `source`
    pub fn new(source: Arc<dyn CodeSource>) -> Self {
        Self { source }
    }

    /// Load, verify, construct and enable the module described by `descriptor`
    pub fn load(
        &self,
        archive: &ModuleArchive,
        descriptor: &ModuleDescriptor,
    ) -> Result<LoadedModule, ModuleError> {
        let start = Instant::now();
        info!(
            "Loading module {} v{} from {}",
            descriptor.name(),
            descriptor.version(),
            archive.file_name()
        );

        let image = self.source.open(archive, descriptor)?;

        let entry_point = descriptor.main();
        let declaration = image.resolve(entry_point).ok_or_else(|| {
            ModuleError::load_error(
                archive,
                format!("entry point `{}` not found", entry_point),
            )
        })?;

        Self::verify_declaration(archive, entry_point, &declaration)?;

        let constructor = declaration.constructor;
        let constructed = panic::catch_unwind(AssertUnwindSafe(|| {
            constructor(archive.clone(), descriptor.clone())
        }));
        let mut module = match constructed {
            Ok(Ok(module)) => module,
            Ok(Err(e)) => {
                return Err(ModuleError::load_error_with(
                    archive,
                    format!("failed to construct `{}`", entry_point),
                    e,
                ))
            }
            Err(payload) => {
                return Err(ModuleError::load_error(
                    archive,
                    format!(
                        "constructor of `{}` panicked: {}",
                        entry_point,
                        panic_message(payload.as_ref())
                    ),
                ))
            }
        };

        if module.descriptor().name() != descriptor.name() {
            return Err(ModuleError::invalid_module(
                archive,
                entry_point,
                format!(
                    "constructed module reports name `{}`, descriptor declares `{}`",
                    module.descriptor().name(),
                    descriptor.name()
                ),
            ));
        }
        debug!("Constructed module {} from `{}`", descriptor.name(), entry_point);

        let enabled = panic::catch_unwind(AssertUnwindSafe(|| module.on_enable()));
        match enabled {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(ModuleError::load_error_with(
                    archive,
                    format!("failed to enable module {}", descriptor.name()),
                    e,
                ))
            }
            Err(payload) => {
                return Err(ModuleError::load_error(
                    archive,
                    format!(
                        "module {} panicked while enabling: {}",
                        descriptor.name(),
                        panic_message(payload.as_ref())
                    ),
                ))
            }
        }

        info!(
            "Module {} v{} enabled ({}ms)",
            descriptor.name(),
            descriptor.version(),
            start.elapsed().as_millis()
        );
        Ok(LoadedModule::new(module, image))
    }

    /// Check that a resolved declaration was built for this host
    fn verify_declaration(
        archive: &ModuleArchive,
        entry_point: &str,
        declaration: &ModuleDeclaration,
    ) -> Result<(), ModuleError> {
        if declaration.abi_version != MODULE_ABI_VERSION {
            return Err(ModuleError::invalid_module(
                archive,
                entry_point,
                format!(
                    "module ABI version {} does not match host ABI version {}",
                    declaration.abi_version, MODULE_ABI_VERSION
                ),
            ));
        }

        if declaration.rustc_version != RUSTC_VERSION {
            return Err(ModuleError::invalid_module(
                archive,
                entry_point,
                format!(
                    "module built with {}, host built with {}",
                    declaration.rustc_version, RUSTC_VERSION
                ),
            ));
        }

        if !Self::is_compatible_core(declaration.core_version) {
            return Err(ModuleError::invalid_module(
                archive,
                entry_point,
                format!(
                    "module built against module-host {}, host is {}",
                    declaration.core_version, CORE_VERSION
                ),
            ));
        }

        Ok(())
    }

    /// Same major.minor as the running host
    fn is_compatible_core(version: &str) -> bool {
        fn major_minor(v: &str) -> Option<(&str, &str)> {
            let mut parts = v.split('.');
            Some((parts.next()?, parts.next()?))
        }

        match (major_minor(version), major_minor(CORE_VERSION)) {
            (Some(module), Some(host)) => module == host,
            _ => false,
        }
    }
}
