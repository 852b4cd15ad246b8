//! Utility modules shared by the module system and the host binary

pub mod env;
pub mod error;
pub mod logging;
pub mod signal;

// Re-export commonly used items
pub use env::{env_bool, env_opt};
pub use error::log_error;
pub use logging::{init_logging, init_logging_from_config};
#[cfg(feature = "json-logging")]
pub use logging::init_json_logging;
pub use signal::{wait_for_shutdown_signal, ShutdownSignal, ShutdownSignals};
