//! Credential masking for diagnostics.

const FULL_MASK: &str = "***";
const REDACTED: &str = "[redacted]";

/// Keeps the first `visible` characters and replaces the rest with `*`.
///
/// Secrets no longer than `visible` are replaced entirely by `***`. A secret
/// that would still be readable in its mask (one made of `*`) becomes
/// `[redacted]`.
pub(crate) fn mask_secret(secret: &str, visible: usize) -> String {
    let len = secret.chars().count();
    let masked = if len <= visible {
        FULL_MASK.to_string()
    } else {
        let prefix: String = secret.chars().take(visible).collect();
        format!("{}{}", prefix, "*".repeat(len - visible))
    };
    if masked.contains(secret) {
        return REDACTED.to_string();
    }
    masked
}
