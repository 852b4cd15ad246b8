//! Module validation framework
//!
//! Validates descriptor metadata before any module code is loaded.

pub mod descriptor_validator;

pub use descriptor_validator::{DescriptorValidator, REQUIRED_KEYS};
