//! Environment variable utilities

/// Get environment variable as Option
///
/// Returns `Some(value)` if set, `None` if not set or not valid unicode.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get environment variable as boolean
///
/// Returns `true` if value is "true", "1", "yes", "on" (case-insensitive).
/// Returns `false` otherwise or if not set.
pub fn env_bool(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
        .unwrap_or(false)
}
