//! Datalayer Common - Shared types, validation, and utilities
//!
//! This crate provides the foundational pieces used across the Datalayer SDK:
//! - Argument errors and validation helpers
//! - JWT claim decoding for token expiry checks
//! - Platform services and their API base paths
//! - Common constants

pub mod error;
pub mod token;
pub mod validation;

// Re-exports for convenience
pub use error::ArgumentError;
pub use token::TokenClaims;
pub use validation::{
    is_valid_handle, require_non_empty, require_path_segment, require_positive,
};

/// Default Datalayer run URL
pub const DEFAULT_RUN_URL: &str = "https://prod1.datalayer.run";

/// Environment variable holding the run URL
pub const ENV_RUN_URL: &str = "DATALAYER_RUN_URL";

/// Environment variable holding the API token
pub const ENV_TOKEN: &str = "DATALAYER_TOKEN";

/// Platform services exposing a REST API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Iam,
    Runtimes,
    Spacer,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Iam => "iam",
            Service::Runtimes => "runtimes",
            Service::Spacer => "spacer",
        }
    }

    /// Versioned base path of the service, e.g. `/api/iam/v1`
    pub fn base_path(&self) -> &'static str {
        match self {
            Service::Iam => "/api/iam/v1",
            Service::Runtimes => "/api/runtimes/v1",
            Service::Spacer => "/api/spacer/v1",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Service {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iam" => Ok(Service::Iam),
            "runtimes" => Ok(Service::Runtimes),
            "spacer" => Ok(Service::Spacer),
            _ => Err(format!("Invalid service: {}", s)),
        }
    }
}

/// Join a base URL and a path, normalizing the slash between them
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
