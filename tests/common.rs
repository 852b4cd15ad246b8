//! Shared fixtures for module system integration tests
//!
//! Recording modules record their lifecycle calls in a process-wide log, so tests
//! using them run under `#[serial]`.

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use zip::write::FileOptions;

use module_host::module::MODULE_ABI_VERSION;
use module_host::{
    EntryPointTable, Module, ModuleArchive, ModuleDeclaration, ModuleDescriptor, ModuleManager,
    ModuleManagerConfig,
};

static EVENTS: Mutex<Vec<String>> = Mutex::new(Vec::new());

fn record(event: String) {
    EVENTS.lock().unwrap().push(event);
}

/// Lifecycle events recorded since the last reset
pub fn events() -> Vec<String> {
    EVENTS.lock().unwrap().clone()
}

pub fn reset_events() {
    EVENTS.lock().unwrap().clear();
}

/// Count of recorded events equal to `event`
pub fn count(event: &str) -> usize {
    events().iter().filter(|e| *e == event).count()
}

/// Module recording its lifecycle; misbehaves when its name starts with
/// `fail-enable`, `fail-disable` or `panic-disable`.
pub struct RecordingModule {
    archive: ModuleArchive,
    descriptor: ModuleDescriptor,
}

impl RecordingModule {
    pub fn create(
        archive: ModuleArchive,
        descriptor: ModuleDescriptor,
    ) -> anyhow::Result<Box<dyn Module>> {
        record(format!("construct:{}", descriptor.name()));
        Ok(Box::new(Self {
            archive,
            descriptor,
        }))
    }
}

impl Module for RecordingModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn archive(&self) -> &ModuleArchive {
        &self.archive
    }

    fn on_enable(&mut self) -> anyhow::Result<()> {
        record(format!("enable:{}", self.name()));
        if self.name().starts_with("fail-enable") {
            anyhow::bail!("{} refuses to enable", self.name());
        }
        Ok(())
    }

    fn on_disable(&mut self) -> anyhow::Result<()> {
        record(format!("disable:{}", self.name()));
        if self.name().starts_with("fail-disable") {
            anyhow::bail!("{} refuses to disable", self.name());
        }
        if self.name().starts_with("panic-disable") {
            panic!("{} panicked while disabling", self.name());
        }
        Ok(())
    }
}

/// Entry point table with `Foo` (valid) and `Stale` (built for another ABI)
pub fn entry_points() -> EntryPointTable {
    let mut stale = ModuleDeclaration::new(RecordingModule::create);
    stale.abi_version = MODULE_ABI_VERSION + 1;

    EntryPointTable::new()
        .with("Foo", ModuleDeclaration::new(RecordingModule::create))
        .with("Stale", stale)
}

/// Descriptor text with the five required keys
pub fn descriptor_text(main: &str, name: &str, version: &str) -> String {
    format!(
        "main={}\nname={}\nversion={}\nauthor=A\ndescription=d\n",
        main, name, version
    )
}

/// Test fixture with isolated directories
pub struct ModuleTestFixture {
    /// Keeps the directories alive
    pub temp_dir: TempDir,
    pub modules_dir: PathBuf,
    pub update_dir: PathBuf,
}

impl ModuleTestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let modules_dir = temp_dir.path().join("modules");
        let update_dir = temp_dir.path().join("update");
        std::fs::create_dir_all(&modules_dir).unwrap();
        std::fs::create_dir_all(&update_dir).unwrap();
        Self {
            temp_dir,
            modules_dir,
            update_dir,
        }
    }

    pub fn config(&self) -> ModuleManagerConfig {
        let mut config = ModuleManagerConfig::with_modules_dir(&self.modules_dir);
        config.cache_dir = self.temp_dir.path().join("cache");
        config.shutdown.listen_for_signals = false;
        config
    }

    /// Manager resolving entry points through [`entry_points`]
    pub fn manager(&self) -> ModuleManager {
        self.manager_with(self.config())
    }

    pub fn manager_with(&self, config: ModuleManagerConfig) -> ModuleManager {
        ModuleManager::with_code_source(config, Arc::new(entry_points()))
    }

    /// Add an archive to the modules directory
    pub fn add_archive(&self, file_name: &str, descriptor: Option<&str>) -> PathBuf {
        let path = self.modules_dir.join(file_name);
        write_archive(&path, descriptor, &[]);
        path
    }

    /// Stage an archive in the update directory
    pub fn stage_archive(&self, file_name: &str, descriptor: &str) -> PathBuf {
        let path = self.update_dir.join(file_name);
        write_archive(&path, Some(descriptor), &[]);
        path
    }
}

/// Write a ZIP archive with an optional `module.properties` and extra entries
pub fn write_archive(path: &Path, descriptor: Option<&str>, extra: &[(&str, &[u8])]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    if let Some(text) = descriptor {
        zip.start_file("module.properties", FileOptions::default())
            .unwrap();
        zip.write_all(text.as_bytes()).unwrap();
    }
    for (name, data) in extra {
        zip.start_file(*name, FileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}
