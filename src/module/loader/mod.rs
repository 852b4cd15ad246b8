//! Module loading system
//!
//! Handles dynamic module loading, contract verification, construction and
//! enabling.

pub mod loader;
pub mod native;
pub mod table;

pub use loader::{CodeImage, CodeSource, LoadedModule, ModuleLoader};
pub use native::NativeCodeSource;
pub use table::EntryPointTable;
