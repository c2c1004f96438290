// API path constants for the Datalayer services

pub mod api_path {
    // IAM
    pub const IAM_LOGIN: &str = "/api/iam/v1/login";
    pub const IAM_LOGOUT: &str = "/api/iam/v1/logout";
    pub const IAM_WHOAMI: &str = "/api/iam/v1/whoami";
    pub const IAM_ME: &str = "/api/iam/v1/me";
    pub const IAM_CREDITS: &str = "/api/iam/v1/usage/credits";
    pub const IAM_TOKENS: &str = "/api/iam/v1/tokens";

    // Runtimes
    pub const ENVIRONMENTS: &str = "/api/runtimes/v1/environments";
    pub const RUNTIMES: &str = "/api/runtimes/v1/runtimes";

    // Runtime snapshots
    pub const RUNTIME_SNAPSHOTS: &str = "/api/runtimes/v1/runtime-snapshots";
    pub const RUNTIME_SNAPSHOTS_UPLOAD: &str = "/api/runtimes/v1/runtime-snapshots/upload";

    // Spacer
    pub const SPACES: &str = "/api/spacer/v1/spaces";
    pub const MY_SPACES: &str = "/api/spacer/v1/spaces/users/me";
    pub const NOTEBOOKS: &str = "/api/spacer/v1/notebooks";
    pub const DOCUMENTS: &str = "/api/spacer/v1/lexicals";
    pub const ITEMS: &str = "/api/spacer/v1/items";
}

/// Notebook flavor sent when creating notebooks
pub const NOTEBOOK_TYPE_JUPYTER: &str = "jupyter";

/// Document flavor sent when creating documents
pub const DOCUMENT_TYPE_LEXICAL: &str = "lexical";

/// Variant of user-issued API tokens
pub const TOKEN_VARIANT_USER: &str = "user_token";

/// Default snapshot archive format
pub const SNAPSHOT_FORMAT: &str = "tar.gz";
