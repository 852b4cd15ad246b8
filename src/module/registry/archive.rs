//! Module archive handle
//!
//! A module archive is a ZIP container holding the module descriptor and the
//! module's native library.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use zip::result::ZipError;
use zip::ZipArchive;

/// Handle to a module archive on disk
///
/// Cheap to clone; every loaded module keeps one for its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleArchive {
    path: PathBuf,
}

impl ModuleArchive {
    /// Create a handle for the archive at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the archive file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of the archive, used to identify it in logs and errors
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    fn open(&self) -> io::Result<ZipArchive<File>> {
        let file = File::open(&self.path)?;
        ZipArchive::new(file).map_err(zip_to_io)
    }

    /// Read a whole entry. Returns `Ok(None)` if the archive has no such entry.
    pub fn read_entry(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        let mut zip = self.open()?;
        let mut entry = match zip.by_name(name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(zip_to_io(e)),
        };

        let mut contents = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut contents)?;
        Ok(Some(contents))
    }

    /// Names of all entries, in archive order
    pub fn entry_names(&self) -> io::Result<Vec<String>> {
        let zip = self.open()?;
        Ok(zip.file_names().map(str::to_string).collect())
    }

    /// First entry that looks like a native library for this platform
    pub fn find_library(&self) -> io::Result<Option<String>> {
        let suffix = format!(".{}", std::env::consts::DLL_EXTENSION);
        let mut names = self.entry_names()?;
        names.sort();
        Ok(names.into_iter().find(|n| n.ends_with(&suffix)))
    }
}

fn zip_to_io(e: ZipError) -> io::Error {
    match e {
        ZipError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::FileOptions;

    fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, data) in entries {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_read_existing_and_missing_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("foo.zip");
        write_zip(&path, &[("module.properties", b"name=foo\n")]);

        let archive = ModuleArchive::new(&path);
        assert_eq!(archive.file_name(), "foo.zip");
        assert_eq!(
            archive.read_entry("module.properties").unwrap(),
            Some(b"name=foo\n".to_vec())
        );
        assert_eq!(archive.read_entry("missing.txt").unwrap(), None);
    }

    #[test]
    fn test_not_a_zip_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.zip");
        std::fs::write(&path, b"definitely not a zip").unwrap();

        let archive = ModuleArchive::new(&path);
        assert!(archive.read_entry("module.properties").is_err());
    }

    #[test]
    fn test_find_library() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lib.zip");
        let lib_name = format!("libfoo.{}", std::env::consts::DLL_EXTENSION);
        write_zip(
            &path,
            &[("module.properties", b""), (lib_name.as_str(), b"\x7fELF")],
        );

        let archive = ModuleArchive::new(&path);
        assert_eq!(archive.find_library().unwrap(), Some(lib_name));
    }
}
