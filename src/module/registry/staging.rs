//! Staged module updates
//!
//! Archives dropped into the update directory replace the installed archive
//! declaring the same module name before the modules directory is scanned.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::module::registry::archive::ModuleArchive;
use crate::module::registry::descriptor::{read_descriptor, ModuleDescriptor};
use crate::module::registry::discovery::ModuleDiscovery;

/// Apply staged updates from `update_dir` to `modules_dir`
///
/// Only archives whose descriptor names an installed module are moved; the
/// rest stay staged. Failures are logged and skipped. Returns the number of
/// modules updated.
pub fn apply_staged_updates(
    modules_dir: &Path,
    update_dir: &Path,
    extension: &str,
    descriptor_name: &str,
) -> usize {
    let staged = ModuleDiscovery::new(update_dir, extension).discover_archives();
    if staged.is_empty() {
        return 0;
    }

    let installed: HashMap<String, PathBuf> = ModuleDiscovery::new(modules_dir, extension)
        .discover_archives()
        .into_iter()
        .filter_map(|archive| {
            let descriptor = describe(&archive, descriptor_name)?;
            Some((descriptor.name().to_string(), archive.path().to_path_buf()))
        })
        .collect();

    let mut applied = 0;
    for update in staged {
        let Some(descriptor) = describe(&update, descriptor_name) else {
            debug!("Staged archive {} has no valid descriptor, skipping", update.file_name());
            continue;
        };
        let (name, version) = (descriptor.name(), descriptor.version());
        let Some(outdated) = installed.get(name) else {
            debug!("Staged module {} is not installed, leaving it staged", name);
            continue;
        };

        match replace_archive(outdated, &update, modules_dir) {
            Ok(()) => {
                info!("Updated module {} to version v{}", name, version);
                applied += 1;
            }
            Err(e) => warn!("Failed to apply staged update {}: {}", update.file_name(), e),
        }
    }

    applied
}

fn describe(archive: &ModuleArchive, descriptor_name: &str) -> Option<ModuleDescriptor> {
    let props = read_descriptor(archive, descriptor_name)?;
    ModuleDescriptor::from_properties(&props, archive).ok()
}

fn replace_archive(
    outdated: &Path,
    update: &ModuleArchive,
    modules_dir: &Path,
) -> std::io::Result<()> {
    fs::remove_file(outdated)?;
    let target = modules_dir.join(update.file_name());
    if fs::rename(update.path(), &target).is_err() {
        // rename fails across filesystems
        fs::copy(update.path(), &target)?;
        fs::remove_file(update.path())?;
    }
    Ok(())
}
