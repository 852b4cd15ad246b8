//! Module discovery
//!
//! Scans the modules directory for candidate archives.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::module::registry::archive::ModuleArchive;

/// Module discovery scanner
pub struct ModuleDiscovery {
    /// Directory to scan for module archives
    modules_dir: PathBuf,
    /// Archive file extension, without the leading dot
    extension: String,
}

impl ModuleDiscovery {
    /// Create a new module discovery scanner
    pub fn new<P: AsRef<Path>>(modules_dir: P, extension: &str) -> Self {
        Self {
            modules_dir: modules_dir.as_ref().to_path_buf(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    /// Directory being scanned
    pub fn modules_dir(&self) -> &Path {
        &self.modules_dir
    }

    /// Discover candidate archives, sorted by file name
    ///
    /// A missing directory is created and yields nothing. Filesystem failures
    /// are logged and yield nothing; they never fail the caller.
    pub fn discover_archives(&self) -> Vec<ModuleArchive> {
        info!("Discovering module archives in {:?}", self.modules_dir);

        if !self.modules_dir.exists() {
            debug!("Modules directory does not exist, creating: {:?}", self.modules_dir);
            if let Err(e) = fs::create_dir_all(&self.modules_dir) {
                warn!("Failed to create modules directory {:?}: {}", self.modules_dir, e);
            }
            return Vec::new();
        }

        let entries = match fs::read_dir(&self.modules_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read modules directory {:?}: {}", self.modules_dir, e);
                return Vec::new();
            }
        };

        let suffix = format!(".{}", self.extension);
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    warn!("Failed to read directory entry: {}", e);
                    None
                }
            })
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .map(|n| n.to_string_lossy().ends_with(&suffix))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        info!("Discovered {} module archives", paths.len());
        paths.into_iter().map(ModuleArchive::new).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_directory_is_created() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("modules");

        let archives = ModuleDiscovery::new(&dir, "zip").discover_archives();
        assert!(archives.is_empty());
        assert!(dir.is_dir());
    }

    #[test]
    fn test_filters_by_extension_and_kind() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path();
        fs::write(dir.join("b.zip"), b"").unwrap();
        fs::write(dir.join("a.zip"), b"").unwrap();
        fs::write(dir.join("notes.txt"), b"").unwrap();
        fs::write(dir.join("zip"), b"").unwrap();
        fs::create_dir(dir.join("dir.zip")).unwrap();

        let archives = ModuleDiscovery::new(dir, ".zip").discover_archives();
        let names: Vec<String> = archives.iter().map(|a| a.file_name()).collect();
        assert_eq!(names, vec!["a.zip", "b.zip"]);
    }

    #[test]
    fn test_path_is_a_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("modules");
        fs::write(&file, b"").unwrap();

        // read_dir on a regular file fails: downgraded to no candidates
        assert!(ModuleDiscovery::new(&file, "zip").discover_archives().is_empty());
    }
}
