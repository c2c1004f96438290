// DatalayerClient - facade for the IAM, Runtimes, and Spacer APIs

mod iam;
mod runtimes;
mod snapshots;
mod spacer;

use std::sync::Arc;

use datalayer_client::{DatalayerHttpClient, MemoryUploadStore, UploadStore};
use datalayer_common::{Service, join_url};
use moka::sync::Cache;

use crate::{Result, config::DatalayerClientConfig, model::Environment};

/// Typed client for the Datalayer platform.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct DatalayerClient {
    http: DatalayerHttpClient,
    config: DatalayerClientConfig,
    environments: Cache<String, Arc<Vec<Environment>>>,
    upload_store: Arc<dyn UploadStore>,
}

impl DatalayerClient {
    /// Create a client, logging in up front when credentials are configured
    /// and no token is given.
    pub async fn new(config: DatalayerClientConfig) -> Result<Self> {
        let http = DatalayerHttpClient::new(config.http_config()).await?;
        Ok(Self::with_http(http, config))
    }

    /// Create a client for `run_url` authenticating with an existing token
    pub fn from_token(run_url: &str, token: &str) -> Result<Self> {
        datalayer_common::require_non_empty("token", token)?;
        let config = DatalayerClientConfig {
            run_urls: vec![run_url.to_string()],
            token: Some(token.to_string()),
            ..Default::default()
        };
        let http = DatalayerHttpClient::new_without_login(config.http_config())?;
        Ok(Self::with_http(http, config))
    }

    /// Create a client for `run_url` logging in with a handle and password
    pub async fn from_credentials(run_url: &str, handle: &str, password: &str) -> Result<Self> {
        datalayer_common::require_non_empty("handle", handle)?;
        datalayer_common::require_non_empty("password", password)?;
        let config = DatalayerClientConfig {
            run_urls: vec![run_url.to_string()],
            handle: handle.to_string(),
            password: password.to_string(),
            ..Default::default()
        };
        Self::new(config).await
    }

    fn with_http(http: DatalayerHttpClient, config: DatalayerClientConfig) -> Self {
        let environments = Cache::builder()
            .max_capacity(16)
            .time_to_live(config.environments_ttl)
            .build();

        Self {
            http,
            config,
            environments,
            upload_store: Arc::new(MemoryUploadStore::new()),
        }
    }

    /// Remember unfinished snapshot uploads in `store` instead of in memory
    pub fn with_upload_store(mut self, store: Arc<dyn UploadStore>) -> Self {
        self.upload_store = store;
        self
    }

    pub fn config(&self) -> &DatalayerClientConfig {
        &self.config
    }

    /// Underlying HTTP transport
    pub fn http(&self) -> &DatalayerHttpClient {
        &self.http
    }

    /// Run URL requests currently go to
    pub fn run_url(&self) -> String {
        self.http.current_server()
    }

    /// Base URL of a platform service on the current run URL
    pub fn service_url(&self, service: Service) -> String {
        join_url(&self.run_url(), service.base_path())
    }

    /// Token currently used for requests, if any
    pub fn token(&self) -> Option<String> {
        self.http.token()
    }
}
