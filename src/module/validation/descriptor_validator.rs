//! Descriptor validation
//!
//! Checks parsed descriptor properties before a [`ModuleDescriptor`] is built.
//!
//! [`ModuleDescriptor`]: crate::module::registry::descriptor::ModuleDescriptor

use tracing::debug;

use crate::module::registry::archive::ModuleArchive;
use crate::module::registry::properties::Properties;
use crate::module::traits::ModuleError;

/// Keys every descriptor must declare, checked in this order
pub const REQUIRED_KEYS: [&str; 5] = ["main", "name", "version", "author", "description"];

/// Descriptor validator
pub struct DescriptorValidator {
    required_keys: &'static [&'static str],
}

impl DescriptorValidator {
    /// Create a new descriptor validator
    pub fn new() -> Self {
        Self {
            required_keys: &REQUIRED_KEYS,
        }
    }

    /// Validate descriptor properties read from `archive`
    ///
    /// Fails on the first missing required key, or on an unusable module name.
    pub fn validate(&self, props: &Properties, archive: &ModuleArchive) -> Result<(), ModuleError> {
        for key in self.required_keys {
            if !props.contains_key(key) {
                return Err(ModuleError::invalid_descriptor(
                    archive,
                    format!("missing required key `{}`", key),
                ));
            }
        }

        let name = props.get("name").unwrap_or_default().trim_matches('"');
        if !Self::is_valid_name(name) {
            return Err(ModuleError::invalid_descriptor(
                archive,
                format!("invalid module name `{}` (must be non-empty without whitespace)", name),
            ));
        }

        debug!("Descriptor validated for module {} ({})", name, archive.file_name());
        Ok(())
    }

    /// Module names are registry keys: non-empty, no whitespace
    #[inline]
    fn is_valid_name(name: &str) -> bool {
        !name.is_empty() && !name.chars().any(char::is_whitespace)
    }
}

impl Default for DescriptorValidator {
    fn default() -> Self {
        Self::new()
    }
}
