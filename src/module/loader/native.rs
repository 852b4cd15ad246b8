//! Native library code source
//!
//! Extracts the module's shared library from its archive into a private
//! per-archive directory and opens it with `libloading`. Entry points are
//! exported statics of type [`ModuleDeclaration`].
//!
//! On Unix the extracted copy is unlinked as soon as it is mapped. Elsewhere
//! the directory lives until [`CodeImage::unload`], and whatever a previous
//! process left behind is purged on the next start.

use libloading::Library;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::module::loader::loader::{CodeImage, CodeSource};
use crate::module::registry::archive::ModuleArchive;
use crate::module::registry::descriptor::ModuleDescriptor;
use crate::module::traits::{ModuleDeclaration, ModuleError};

/// Loads module code from shared libraries packaged in archives
pub struct NativeCodeSource {
    /// Where per-archive loading contexts are created
    cache_dir: PathBuf,
    purge: Once,
}

impl NativeCodeSource {
    /// Create a native code source extracting libraries under `cache_dir`
    pub fn new<P: AsRef<Path>>(cache_dir: P) -> Self {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
            purge: Once::new(),
        }
    }

    /// Remove loading contexts left in the cache by earlier runs
    ///
    /// Directories whose library is still mapped (Windows) cannot be removed
    /// and are skipped.
    fn purge_stale_contexts(&self) {
        let Ok(entries) = fs::read_dir(&self.cache_dir) else {
            return;
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() || !is_context_dir_name(&entry.file_name()) {
                continue;
            }
            match fs::remove_dir_all(&path) {
                Ok(()) => removed += 1,
                Err(e) => debug!("Keeping loading context {:?}: {}", path, e),
            }
        }
        if removed > 0 {
            debug!("Removed {} stale loading contexts from {:?}", removed, self.cache_dir);
        }
    }

    /// Directory holding the per-archive loading contexts
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn library_entry(
        archive: &ModuleArchive,
        descriptor: &ModuleDescriptor,
    ) -> Result<String, ModuleError> {
        if let Some(library) = descriptor.library() {
            return Ok(library.to_string());
        }

        archive
            .find_library()
            .map_err(|e| {
                ModuleError::load_error_with(archive, "failed to list archive entries", e)
            })?
            .ok_or_else(|| {
                ModuleError::load_error(
                    archive,
                    format!(
                        "no .{} library found in archive",
                        std::env::consts::DLL_EXTENSION
                    ),
                )
            })
    }
}

impl CodeSource for NativeCodeSource {
    fn open(
        &self,
        archive: &ModuleArchive,
        descriptor: &ModuleDescriptor,
    ) -> Result<Box<dyn CodeImage>, ModuleError> {
        self.purge.call_once(|| self.purge_stale_contexts());

        let entry = Self::library_entry(archive, descriptor)?;
        let bytes = archive
            .read_entry(&entry)
            .map_err(|e| {
                ModuleError::load_error_with(archive, format!("failed to read {}", entry), e)
            })?
            .ok_or_else(|| {
                ModuleError::load_error(archive, format!("library entry {} not found", entry))
            })?;

        let context_dir = self
            .cache_dir
            .join(format!("{}-{}", descriptor.name(), Uuid::new_v4()));
        fs::create_dir_all(&context_dir).map_err(|e| {
            ModuleError::load_error_with(
                archive,
                format!("failed to create loading context {:?}", context_dir),
                e,
            )
        })?;

        let file_name = Path::new(&entry)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| entry.clone().into());
        let library_path = context_dir.join(file_name);
        fs::write(&library_path, &bytes).map_err(|e| {
            ModuleError::load_error_with(
                archive,
                format!("failed to extract library to {:?}", library_path),
                e,
            )
        })?;
        debug!("Extracted {} from {} to {:?}", entry, archive.file_name(), library_path);

        // SAFETY: loading runs the library's initializers. Modules run with
        // full process trust; that is the contract of dropping an archive into
        // the modules directory.
        let library = unsafe { Library::new(&library_path) }.map_err(|e| {
            let _ = fs::remove_dir_all(&context_dir);
            ModuleError::load_error_with(
                archive,
                format!("failed to load library {}", entry),
                e,
            )
        })?;

        // the mapping outlives the file
        #[cfg(unix)]
        remove_context(&context_dir);

        Ok(Box::new(NativeImage {
            library: Some(library),
            context_dir,
        }))
    }
}

/// A loaded shared library and the directory it was extracted to
struct NativeImage {
    library: Option<Library>,
    context_dir: PathBuf,
}

impl CodeImage for NativeImage {
    fn resolve(&self, entry_point: &str) -> Option<ModuleDeclaration> {
        let library = self.library.as_ref()?;

        // SAFETY: the symbol is declared by `declare_module!` as a
        // `ModuleDeclaration` static; the ABI and core version fields are
        // checked by the loader before the constructor is called.
        unsafe {
            let symbol = library
                .get::<*const ModuleDeclaration>(entry_point.as_bytes())
                .ok()?;
            let declaration = *symbol;
            if declaration.is_null() {
                return None;
            }
            Some(*declaration)
        }
    }

    fn unload(mut self: Box<Self>) -> Result<(), ModuleError> {
        if let Some(library) = self.library.take() {
            library.close().map_err(|e| ModuleError::ModuleLoadError {
                archive: self.context_dir.display().to_string(),
                reason: "failed to close library".to_string(),
                source: Some(Box::new(e)),
            })?;
        }
        remove_context(&self.context_dir);
        Ok(())
    }
}

fn remove_context(context_dir: &Path) {
    match fs::remove_dir_all(context_dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove loading context {:?}: {}", context_dir, e),
    }
}

/// `<module name>-<uuid>`, as created by [`NativeCodeSource::open`]
fn is_context_dir_name(name: &OsStr) -> bool {
    const SUFFIX_LEN: usize = 37;

    let Some(name) = name.to_str() else {
        return false;
    };
    if name.len() <= SUFFIX_LEN || !name.is_char_boundary(name.len() - SUFFIX_LEN) {
        return false;
    }
    let suffix = &name[name.len() - SUFFIX_LEN..];
    suffix.starts_with('-') && Uuid::parse_str(&suffix[1..]).is_ok()
}

impl Drop for NativeImage {
    fn drop(&mut self) {
        // Module code stays resident for the rest of the process unless
        // explicitly unloaded.
        if let Some(library) = self.library.take() {
            std::mem::forget(library);
        }
    }
}
