//! In-process entry point table
//!
//! Code source for modules compiled into the host: entry points are looked up
//! by name in a table the host fills at startup, instead of in a shared
//! library shipped inside the archive.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::module::loader::loader::{CodeImage, CodeSource};
use crate::module::registry::archive::ModuleArchive;
use crate::module::registry::descriptor::ModuleDescriptor;
use crate::module::traits::{ModuleDeclaration, ModuleError};

/// Table of module declarations linked into the host
#[derive(Clone, Default)]
pub struct EntryPointTable {
    entries: Arc<HashMap<String, ModuleDeclaration>>,
}

impl EntryPointTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declaration under `entry_point`
    pub fn register(&mut self, entry_point: impl Into<String>, declaration: ModuleDeclaration) {
        Arc::make_mut(&mut self.entries).insert(entry_point.into(), declaration);
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, entry_point: impl Into<String>, declaration: ModuleDeclaration) -> Self {
        self.register(entry_point, declaration);
        self
    }

    /// Check if an entry point is registered
    pub fn contains(&self, entry_point: &str) -> bool {
        self.entries.contains_key(entry_point)
    }

    /// Number of registered entry points
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CodeSource for EntryPointTable {
    fn open(
        &self,
        archive: &ModuleArchive,
        descriptor: &ModuleDescriptor,
    ) -> Result<Box<dyn CodeImage>, ModuleError> {
        debug!(
            "Resolving module {} from {} against the entry point table",
            descriptor.name(),
            archive.file_name()
        );
        Ok(Box::new(TableImage {
            entries: Arc::clone(&self.entries),
        }))
    }
}

/// Code image for table entries: the code is part of the host binary
struct TableImage {
    entries: Arc<HashMap<String, ModuleDeclaration>>,
}

impl CodeImage for TableImage {
    fn resolve(&self, entry_point: &str) -> Option<ModuleDeclaration> {
        self.entries.get(entry_point).copied()
    }

    fn unload(self: Box<Self>) -> Result<(), ModuleError> {
        Ok(())
    }
}
