//! Lifecycle registry
//!
//! Ordered name -> module mapping. Insertion order is the shutdown order.
//!
//! Each module sits behind its own lock so callers can work with one module
//! without holding the registry. Descriptors are copied out at registration
//! and can be read without touching the module at all.

use std::cell::Cell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use crate::module::loader::LoadedModule;
use crate::module::registry::descriptor::ModuleDescriptor;

/// A registered module, shared between the registry and in-flight calls
pub type SharedModule = Arc<Mutex<LoadedModule>>;

struct Entry {
    name: String,
    descriptor: ModuleDescriptor,
    module: SharedModule,
}

/// Registry of loaded modules, in load order
#[derive(Default)]
pub struct ModuleRegistry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a module under `name`
    ///
    /// Replacing an existing name keeps the original position and returns the
    /// replaced module.
    pub fn put(&mut self, name: impl Into<String>, module: LoadedModule) -> Option<SharedModule> {
        let name = name.into();
        let descriptor = module.descriptor().clone();
        let module = Arc::new(Mutex::new(module));

        match self.index.get(&name) {
            Some(&pos) => {
                let entry = &mut self.entries[pos];
                entry.descriptor = descriptor;
                Some(std::mem::replace(&mut entry.module, module))
            }
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push(Entry {
                    name,
                    descriptor,
                    module,
                });
                None
            }
        }
    }

    /// Get a handle to a module by name
    pub fn get(&self, name: &str) -> Option<SharedModule> {
        self.index
            .get(name)
            .map(|&pos| Arc::clone(&self.entries[pos].module))
    }

    /// Descriptor of a registered module
    pub fn descriptor(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.index.get(name).map(|&pos| &self.entries[pos].descriptor)
    }

    /// Check if a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registered names, in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Descriptors, in insertion order
    pub fn descriptors(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    /// Module handles in insertion order. Each call starts a fresh pass.
    pub fn iter(&self) -> impl Iterator<Item = &SharedModule> {
        self.entries.iter().map(|e| &e.module)
    }

    /// Number of registered modules
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove everything, in insertion order
    ///
    /// Used by the shutdown pass and by rollback: once drained, a module can
    /// no longer be looked up.
    pub(crate) fn drain(&mut self) -> Vec<(String, SharedModule)> {
        self.index.clear();
        self.entries.drain(..).map(|e| (e.name, e.module)).collect()
    }
}

thread_local! {
    static MODULE_CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as running module code until dropped
pub(crate) struct ModuleCallScope(());

impl ModuleCallScope {
    pub(crate) fn enter() -> Self {
        MODULE_CALL_DEPTH.with(|depth| depth.set(depth.get() + 1));
        ModuleCallScope(())
    }

    /// Check if the current thread is inside a module call
    pub(crate) fn active() -> bool {
        MODULE_CALL_DEPTH.with(|depth| depth.get() > 0)
    }
}

impl Drop for ModuleCallScope {
    fn drop(&mut self) {
        MODULE_CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Lock a module, recovering it if a holder panicked
pub(crate) fn lock_module(module: &Mutex<LoadedModule>) -> MutexGuard<'_, LoadedModule> {
    module.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Lock a module unless that would block a thread already inside a module call
///
/// A nested call may be asking for the module it is running in; blocking there
/// would never return.
pub(crate) fn lock_module_for_call(
    module: &Mutex<LoadedModule>,
) -> Option<MutexGuard<'_, LoadedModule>> {
    if !ModuleCallScope::active() {
        return Some(lock_module(module));
    }
    match module.try_lock() {
        Ok(guard) => Some(guard),
        Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
        Err(TryLockError::WouldBlock) => None,
    }
}
