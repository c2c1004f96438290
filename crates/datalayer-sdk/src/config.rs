// Configuration for DatalayerClient

use std::time::Duration;

use datalayer_client::{HttpClientConfig, PollPolicy};
use datalayer_common::DEFAULT_RUN_URL;

/// Configuration for the Datalayer client
#[derive(Clone, Debug)]
pub struct DatalayerClientConfig {
    /// Run URLs (e.g. ["https://prod1.datalayer.run"])
    pub run_urls: Vec<String>,
    /// API token
    pub token: Option<String>,
    /// Handle for login
    pub handle: String,
    /// Password for login
    pub password: String,
    /// Connection timeout in milliseconds (default: 5000)
    pub connect_timeout_ms: u64,
    /// Read timeout in milliseconds (default: 30000)
    pub read_timeout_ms: u64,
    /// How long the environment list is cached (default: 5 minutes)
    pub environments_ttl: Duration,
    /// Wait policy for snapshot deletion
    pub snapshot_deletion: PollPolicy,
    /// PATCH size for snapshot uploads in bytes
    pub upload_chunk_size: usize,
}

impl Default for DatalayerClientConfig {
    fn default() -> Self {
        Self {
            run_urls: vec![DEFAULT_RUN_URL.to_string()],
            token: None,
            handle: String::new(),
            password: String::new(),
            connect_timeout_ms: 5000,
            read_timeout_ms: 30000,
            environments_ttl: Duration::from_secs(300),
            snapshot_deletion: PollPolicy::default(),
            upload_chunk_size: datalayer_client::tus::DEFAULT_CHUNK_SIZE,
        }
    }
}

impl DatalayerClientConfig {
    pub(crate) fn http_config(&self) -> HttpClientConfig {
        let mut http_config = HttpClientConfig::with_run_urls(self.run_urls.clone())
            .with_credentials(&self.handle, &self.password)
            .with_timeouts(self.connect_timeout_ms, self.read_timeout_ms);
        http_config.token = self.token.clone();
        http_config
    }
}
