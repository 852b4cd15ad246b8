//! Module manager for orchestrating all modules
//!
//! Drives initialization (staged updates, discovery, descriptor validation,
//! loading, registration), owns the lifecycle registry and installs the
//! shutdown hook once every module is up.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error, info};

use crate::config::ModuleManagerConfig;
use crate::module::loader::{CodeSource, ModuleLoader, NativeCodeSource};
use crate::module::registry::lifecycle::{lock_module_for_call, ModuleCallScope};
use crate::module::registry::{
    apply_staged_updates, read_descriptor, ModuleDescriptor, ModuleDiscovery, ModuleRegistry,
};
use crate::module::shutdown::{
    disable_all, lock_registry, ShutdownCoordinator, ShutdownHook, ShutdownReport,
};
use crate::module::traits::{ManagerState, Module, ModuleError};

/// Module manager coordinates all loaded modules
///
/// An explicitly constructed context object: create one per modules
/// directory and call [`init`](Self::init) once.
pub struct ModuleManager {
    config: ModuleManagerConfig,
    loader: ModuleLoader,
    /// Shared with the shutdown hook
    registry: Arc<Mutex<ModuleRegistry>>,
    state: ManagerState,
    hook: Option<ShutdownHook>,
}

impl ModuleManager {
    /// Create a manager loading native module libraries
    pub fn new(config: ModuleManagerConfig) -> Self {
        let source = Arc::new(NativeCodeSource::new(&config.cache_dir));
        Self::with_code_source(config, source)
    }

    /// Create a manager resolving entry points through `source`
    pub fn with_code_source(config: ModuleManagerConfig, source: Arc<dyn CodeSource>) -> Self {
        Self {
            config,
            loader: ModuleLoader::new(source),
            registry: Arc::new(Mutex::new(ModuleRegistry::new())),
            state: ManagerState::Uninitialized,
            hook: None,
        }
    }

    /// Discover, load and enable every module, then install the shutdown hook
    ///
    /// All-or-nothing: on the first fatal error every module enabled so far is
    /// disabled again, the registry is cleared and the manager ends up
    /// [`ManagerState::Failed`] without a hook.
    pub fn init(&mut self) -> Result<(), ModuleError> {
        if self.state != ManagerState::Uninitialized {
            return Err(ModuleError::AlreadyInitialized);
        }
        self.state = ManagerState::Initializing;

        let start = Instant::now();
        info!("Initializing module manager from {:?}", self.config.modules_dir);

        if let Err(e) = self.load_all() {
            error!("Module initialization failed: {}", e);
            self.rollback();
            self.state = ManagerState::Failed;
            return Err(e);
        }

        self.hook = Some(ShutdownCoordinator::install(
            Arc::clone(&self.registry),
            &self.config.shutdown,
        ));
        self.state = ManagerState::Ready;

        info!(
            "Loaded {} modules ({}ms)",
            self.len(),
            start.elapsed().as_millis()
        );
        Ok(())
    }

    fn load_all(&self) -> Result<(), ModuleError> {
        let config = &self.config;

        if let Some(update_dir) = &config.update_dir {
            let applied = apply_staged_updates(
                &config.modules_dir,
                update_dir,
                &config.archive_extension,
                &config.descriptor_name,
            );
            if applied > 0 {
                info!("Applied {} staged module updates", applied);
            }
        }

        let archives = ModuleDiscovery::new(&config.modules_dir, &config.archive_extension)
            .discover_archives();
        debug!("Found {} module archives", archives.len());

        for archive in archives {
            let Some(properties) = read_descriptor(&archive, &config.descriptor_name) else {
                debug!("Skipping {}: no {}", archive.file_name(), config.descriptor_name);
                continue;
            };

            let descriptor = ModuleDescriptor::from_properties(&properties, &archive)?;
            if lock_registry(&self.registry).contains(descriptor.name()) {
                return Err(ModuleError::invalid_descriptor(
                    &archive,
                    format!("duplicate module name `{}`", descriptor.name()),
                ));
            }

            let loaded = self.loader.load(&archive, &descriptor)?;
            lock_registry(&self.registry).put(descriptor.name(), loaded);
        }

        Ok(())
    }

    /// Undo a partial initialization
    fn rollback(&self) {
        let entries = lock_registry(&self.registry).drain();
        if entries.is_empty() {
            return;
        }

        info!("Rolling back {} enabled modules", entries.len());
        disable_all(entries);
    }

    /// Current lifecycle state
    pub fn state(&self) -> ManagerState {
        self.state
    }

    /// Directory scanned for archives
    pub fn modules_dir(&self) -> &Path {
        &self.config.modules_dir
    }

    /// Configuration the manager was created with
    pub fn config(&self) -> &ModuleManagerConfig {
        &self.config
    }

    /// Number of loaded modules
    pub fn len(&self) -> usize {
        lock_registry(&self.registry).len()
    }

    /// Check if no module is loaded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loaded module names, in load order
    pub fn module_names(&self) -> Vec<String> {
        lock_registry(&self.registry)
            .names()
            .map(str::to_string)
            .collect()
    }

    /// Descriptors of the loaded modules, in load order
    pub fn descriptors(&self) -> Vec<ModuleDescriptor> {
        lock_registry(&self.registry).descriptors().cloned().collect()
    }

    /// Check if a module is loaded
    pub fn is_loaded(&self, name: &str) -> bool {
        lock_registry(&self.registry).contains(name)
    }

    /// Run `f` against a loaded module
    ///
    /// The registry is not locked while `f` runs, so `f` may query the manager
    /// or reach other modules. Returns `None` if the module is not loaded, was
    /// already disabled, or is the one a nested call is running in.
    pub fn with_module<R>(&self, name: &str, f: impl FnOnce(&mut dyn Module) -> R) -> Option<R> {
        let shared = lock_registry(&self.registry).get(name)?;
        let mut loaded = lock_module_for_call(&shared)?;
        if loaded.is_disabled() {
            return None;
        }

        let _scope = ModuleCallScope::enter();
        Some(f(loaded.module_mut()))
    }

    /// The installed shutdown hook (only after a successful init)
    pub fn shutdown_hook(&self) -> Option<ShutdownHook> {
        self.hook.clone()
    }

    /// Trigger the shutdown hook now
    ///
    /// Returns `None` if no hook is installed, it already fired, or this is
    /// called from inside [`with_module`](Self::with_module).
    pub fn shutdown(&self) -> Option<ShutdownReport> {
        self.hook.as_ref().and_then(ShutdownHook::trigger)
    }
}

impl Drop for ModuleManager {
    fn drop(&mut self) {
        if let Some(hook) = &self.hook {
            hook.trigger();
        }
    }
}
