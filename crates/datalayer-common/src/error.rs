//! Argument errors raised before any request leaves the client

/// Invalid or missing caller-supplied arguments
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl ArgumentError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ArgumentError::Invalid {
            name,
            reason: reason.into(),
        }
    }

    /// Name of the offending argument
    pub fn argument(&self) -> &'static str {
        match self {
            ArgumentError::Missing(name) => name,
            ArgumentError::Invalid { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ArgumentError::Missing("pod_name");
        assert_eq!(err.to_string(), "pod_name is required");

        let err = ArgumentError::invalid("credits_limit", "must be positive");
        assert_eq!(err.to_string(), "invalid credits_limit: must be positive");
        assert_eq!(err.argument(), "credits_limit");
    }
}
