//! Argument validation helpers
//!
//! Every SDK operation checks its required arguments with these helpers
//! before sending anything over the wire.

use std::sync::LazyLock;

use crate::error::ArgumentError;

/// Regex pattern for validating handles (space handles, user handles)
static HANDLE_PATTERN: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new("^[a-zA-Z0-9][a-zA-Z0-9_-]*$").expect("Invalid regex pattern")
});

/// Fail with [`ArgumentError::Missing`] when `value` is empty or blank
///
/// # Examples
///
/// ```
/// use datalayer_common::require_non_empty;
///
/// assert!(require_non_empty("pod_name", "jupyter-abc").is_ok());
/// assert!(require_non_empty("pod_name", "").is_err());
/// assert!(require_non_empty("pod_name", "   ").is_err());
/// ```
pub fn require_non_empty(name: &'static str, value: &str) -> Result<(), ArgumentError> {
    if value.trim().is_empty() {
        Err(ArgumentError::Missing(name))
    } else {
        Ok(())
    }
}

/// Like [`require_non_empty`], and additionally reject values that would
/// escape a single URL path segment
///
/// # Examples
///
/// ```
/// use datalayer_common::require_path_segment;
///
/// assert!(require_path_segment("uid", "01HRQ8ZK").is_ok());
/// assert!(require_path_segment("uid", "../admin").is_err());
/// ```
pub fn require_path_segment(name: &'static str, value: &str) -> Result<(), ArgumentError> {
    require_non_empty(name, value)?;
    if value.contains(['/', '?', '#']) || value == "." || value == ".." {
        return Err(ArgumentError::invalid(
            name,
            format!("'{}' is not a valid identifier", value),
        ));
    }
    Ok(())
}

/// Fail with [`ArgumentError::Invalid`] unless `value` is strictly positive
pub fn require_positive(name: &'static str, value: f64) -> Result<(), ArgumentError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ArgumentError::invalid(name, "must be a positive number"))
    }
}

/// Validate a handle contains only allowed characters
///
/// Allowed characters: alphanumeric, underscore, hyphen; must not start
/// with a separator.
///
/// # Examples
///
/// ```
/// use datalayer_common::is_valid_handle;
///
/// assert!(is_valid_handle("my-space"));
/// assert!(is_valid_handle("space_01"));
/// assert!(!is_valid_handle("-leading"));
/// assert!(!is_valid_handle("with spaces"));
/// ```
pub fn is_valid_handle(handle: &str) -> bool {
    HANDLE_PATTERN.is_match(handle)
}
