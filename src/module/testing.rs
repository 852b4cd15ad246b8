//! Test helpers shared by the module system unit tests

use std::cell::RefCell;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use zip::write::FileOptions;

use crate::module::loader::{CodeSource, EntryPointTable, LoadedModule};
use crate::module::registry::archive::ModuleArchive;
use crate::module::registry::descriptor::ModuleDescriptor;
use crate::module::traits::{Module, ModuleDeclaration};

thread_local! {
    static EVENTS: RefCell<Vec<String>> = RefCell::new(Vec::new());
}

fn record(event: String) {
    EVENTS.with(|events| events.borrow_mut().push(event));
}

/// Lifecycle events recorded by recording modules on this thread
pub fn recorded_events() -> Vec<String> {
    EVENTS.with(|events| events.borrow().clone())
}

pub fn reset_recorded_events() {
    EVENTS.with(|events| events.borrow_mut().clear());
}

/// Module recording its lifecycle calls.
///
/// Behaviour is picked by name prefix: `fail-enable`, `panic-enable`,
/// `fail-disable` and `panic-disable`.
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
            anyhow::bail!("refusing to enable");
        }
        if self.name().starts_with("panic-enable") {
            panic!("panicked in on_enable");
        }
        Ok(())
    }

    fn on_disable(&mut self) -> anyhow::Result<()> {
        record(format!("disable:{}", self.name()));
        if self.name().starts_with("fail-disable") {
            anyhow::bail!("refusing to disable");
        }
        if self.name().starts_with("panic-disable") {
            panic!("panicked in on_disable");
        }
        Ok(())
    }
}

pub fn descriptor(name: &str, main: &str) -> ModuleDescriptor {
    ModuleDescriptor::new(main, name, "1.0", "A", "d", Vec::new())
}

pub fn recording_table() -> EntryPointTable {
    EntryPointTable::new().with("RecordingModule", ModuleDeclaration::new(RecordingModule::create))
}

/// Construct an enabled recording module wrapped as a registry entry
pub fn loaded_recording(name: &str) -> LoadedModule {
    let archive = ModuleArchive::new(format!("{}.zip", name));
    let descriptor = descriptor(name, "RecordingModule");
    let table = recording_table();
    let image = table.open(&archive, &descriptor).expect("table image");
    let module = RecordingModule::create(archive, descriptor).expect("recording module");
    LoadedModule::new(module, image)
}

/// Write a ZIP archive with an optional descriptor and extra entries
pub fn write_archive(path: &Path, descriptor: Option<&str>, extra: &[(&str, &[u8])]) {
    let file = File::create(path).expect("create archive");
    let mut zip = zip::ZipWriter::new(file);
    if let Some(text) = descriptor {
        zip.start_file("module.properties", FileOptions::default())
            .expect("start descriptor");
        zip.write_all(text.as_bytes()).expect("write descriptor");
    }
    for (name, data) in extra {
        zip.start_file(*name, FileOptions::default()).expect("start entry");
        zip.write_all(data).expect("write entry");
    }
    zip.finish().expect("finish archive");
}

/// Descriptor text for a recording module
pub fn recording_descriptor_text(name: &str) -> String {
    format!(
        "main=RecordingModule\nname={}\nversion=1.0\nauthor=A\ndescription=d\n",
        name
    )
}
