//! Echo module
//!
//! Logs its lifecycle calls. Build as a cdylib and zip the library together
//! with `module.properties` to get a loadable archive.

use std::time::Instant;
use tracing::info;

use module_host::{declare_module, Module, ModuleArchive, ModuleDescriptor};

pub struct EchoModule {
    archive: ModuleArchive,
    descriptor: ModuleDescriptor,
    enabled_at: Option<Instant>,
}

impl EchoModule {
    pub fn create(
        archive: ModuleArchive,
        descriptor: ModuleDescriptor,
    ) -> anyhow::Result<Box<dyn Module>> {
        Ok(Box::new(Self {
            archive,
            descriptor,
            enabled_at: None,
        }))
    }
}

impl Module for EchoModule {
    fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    fn archive(&self) -> &ModuleArchive {
        &self.archive
    }

    fn on_enable(&mut self) -> anyhow::Result<()> {
        self.enabled_at = Some(Instant::now());
        info!(
            "echo: enabled {} v{} from {}",
            self.name(),
            self.version(),
            self.archive.file_name()
        );
        Ok(())
    }

    fn on_disable(&mut self) -> anyhow::Result<()> {
        let uptime = self.enabled_at.map(|t| t.elapsed()).unwrap_or_default();
        info!("echo: disabled {} after {:?}", self.name(), uptime);
        Ok(())
    }
}

declare_module!(ECHO_MODULE, EchoModule::create);
