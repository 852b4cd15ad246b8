//! Module descriptor extraction and construction
//!
//! Reads the descriptor entry embedded in a module archive and builds an
//! immutable [`ModuleDescriptor`] from it.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::module::registry::archive::ModuleArchive;
use crate::module::registry::properties::Properties;
use crate::module::traits::ModuleError;
use crate::module::validation::DescriptorValidator;

/// Default name of the descriptor entry inside an archive
pub const DEFAULT_DESCRIPTOR_NAME: &str = "module.properties";

/// Validated module metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    main: String,
    name: String,
    version: String,
    author: String,
    description: String,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    library: Option<String>,
}

impl ModuleDescriptor {
    /// Create a descriptor from already-validated parts
    pub fn new(
        main: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        author: impl Into<String>,
        description: impl Into<String>,
        dependencies: Vec<String>,
    ) -> Self {
        Self {
            main: main.into(),
            name: name.into(),
            version: version.into(),
            author: author.into(),
            description: description.into(),
            dependencies,
            library: None,
        }
    }

    /// Set the library entry the module code lives in
    pub fn with_library(mut self, library: impl Into<String>) -> Self {
        self.library = Some(library.into());
        self
    }

    /// Validate parsed properties and build a descriptor
    pub fn from_properties(
        props: &Properties,
        archive: &ModuleArchive,
    ) -> Result<Self, ModuleError> {
        DescriptorValidator::new().validate(props, archive)?;

        // validated above, so every required key is present
        let field = |key: &str| unquote(props.get(key).unwrap_or_default()).to_string();

        let dependencies = props
            .get("dependencies")
            .map(|deps| split_dependencies(unquote(deps)))
            .unwrap_or_default();

        let library = props
            .get("library")
            .map(|l| unquote(l).to_string())
            .filter(|l| !l.is_empty());

        Ok(Self {
            main: field("main"),
            name: field("name"),
            version: field("version"),
            author: field("author"),
            description: field("description"),
            dependencies,
            library,
        })
    }

    /// Entry point (exported declaration symbol)
    pub fn main(&self) -> &str {
        &self.main
    }

    /// Module name (unique key)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Module version
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Module author
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared dependency names, in declaration order. Informational only.
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Archive entry holding the module library, if declared
    pub fn library(&self) -> Option<&str> {
        self.library.as_deref()
    }
}

/// Read the descriptor entry of an archive
///
/// `None` means "not a module": the entry is absent, or the archive could not
/// be read (logged).
pub fn read_descriptor(archive: &ModuleArchive, descriptor_name: &str) -> Option<Properties> {
    match archive.read_entry(descriptor_name) {
        Ok(Some(bytes)) => {
            let text = String::from_utf8_lossy(&bytes);
            Some(Properties::parse(&text))
        }
        Ok(None) => {
            debug!(
                "No {} in {}, not a module",
                descriptor_name,
                archive.file_name()
            );
            None
        }
        Err(e) => {
            warn!(
                "Failed to read {} from {}: {}",
                descriptor_name,
                archive.file_name(),
                e
            );
            None
        }
    }
}

/// Strip one pair of surrounding double quotes
fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .filter(|v| !v.is_empty())
        .unwrap_or(value)
}

fn split_dependencies(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}
