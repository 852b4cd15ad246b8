//! Error handling utilities for graceful degradation

use tracing::warn;

/// Execute an operation and log errors without failing
///
/// Returns `Some(T)` on success, `None` on error (after logging).
/// Used for non-critical steps such as disabling a module at shutdown,
/// where one failure must not stop the rest.
///
/// # Example
/// ```rust,ignore
/// use module_host::utils::log_error;
///
/// let result = log_error(|| std::fs::remove_dir_all(&dir), "Failed to remove cache");
/// ```
pub fn log_error<F, T, E>(operation: F, context: &str) -> Option<T>
where
    F: FnOnce() -> Result<T, E>,
    E: std::fmt::Display,
{
    match operation() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("{}: {}", context, e);
            None
        }
    }
}
