//! Environment variable utilities for credential loading.

/// Get an optional environment variable, treating blank values as unset.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse a boolean environment variable.
///
/// Returns `true` if the value is "1" or "true" (case-insensitive).
pub fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}
